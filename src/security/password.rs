//! Admin password checking.

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Compares candidate passwords against the configured hash.
#[derive(Clone)]
pub struct PasswordVerifier {
    expected: String,
}

impl PasswordVerifier {
    /// `expected_hash` is a hex SHA-256 digest, any case.
    pub fn new(expected_hash: &str) -> Self {
        Self {
            expected: expected_hash.trim().to_ascii_lowercase(),
        }
    }

    /// Hashes `candidate` and compares digests in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        let actual = hash_password(candidate);
        constant_time_eq(actual.as_bytes(), self.expected.as_bytes())
    }
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordVerifier(<redacted>)")
    }
}
