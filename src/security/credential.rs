//! Signed admin credentials.
//!
//! Tokens are HS256 JWTs carrying `role`, `iat` and `exp`. Expiry is
//! absolute: there is no refresh, the holder logs in again.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only role admitted to protected routes.
pub const ADMIN_ROLE: &str = "admin";

/// Payload stored in the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Why a credential was not accepted.
///
/// Callers only ever see one generic denial; these variants feed logs and
/// metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no credential presented")]
    Missing,
    #[error("credential is malformed")]
    Malformed,
    #[error("credential signature does not verify")]
    BadSignature,
    #[error("credential has expired")]
    Expired,
    #[error("credential role '{0}' is not admin")]
    WrongRole(String),
    #[error("credential verification timed out")]
    Timeout,
    #[error("credential processing failed: {0}")]
    Internal(String),
}

impl CredentialError {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CredentialError::Missing => "missing",
            CredentialError::Malformed => "malformed",
            CredentialError::BadSignature => "bad_signature",
            CredentialError::Expired => "expired",
            CredentialError::WrongRole(_) => "wrong_role",
            CredentialError::Timeout => "timeout",
            CredentialError::Internal(_) => "internal",
        }
    }
}

/// A freshly signed credential.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub claims: Claims,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies admin credentials with one shared secret.
#[derive(Clone)]
pub struct CredentialSigner {
    keys: Arc<Keys>,
    ttl: Duration,
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner").field("ttl", &self.ttl).finish()
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CredentialSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue an admin credential valid from now for the configured lifetime.
    pub fn issue(&self) -> Result<IssuedCredential, CredentialError> {
        let iat = unix_now();
        let claims = Claims {
            role: ADMIN_ROLE.to_string(),
            iat,
            exp: iat + self.ttl.as_secs(),
        };
        let token = self.sign(&claims)?;
        Ok(IssuedCredential { token, claims })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &Claims) -> Result<String, CredentialError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(|e| CredentialError::Internal(e.to_string()))
    }

    /// Check signature, expiry and role.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let data = decode::<Claims>(token, &self.keys.decoding, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => CredentialError::Expired,
                ErrorKind::InvalidSignature => CredentialError::BadSignature,
                ErrorKind::Crypto(_) => CredentialError::Internal(err.to_string()),
                _ => CredentialError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.exp <= unix_now() {
            return Err(CredentialError::Expired);
        }
        if claims.role != ADMIN_ROLE {
            return Err(CredentialError::WrongRole(claims.role));
        }
        Ok(claims)
    }

    /// Verify on the blocking pool, giving up after `deadline`.
    pub async fn verify_within(&self, token: String, deadline: Duration) -> Result<Claims, CredentialError> {
        let signer = self.clone();
        check_within(deadline, move || signer.verify(&token)).await
    }
}

/// Run a blocking credential check under `deadline`.
///
/// A verdict that arrives at or after the deadline is a timeout, whatever
/// it says.
pub async fn check_within<F>(deadline: Duration, check: F) -> Result<Claims, CredentialError>
where
    F: FnOnce() -> Result<Claims, CredentialError> + Send + 'static,
{
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(check);
    match tokio::time::timeout(deadline, task).await {
        Ok(_) if started.elapsed() >= deadline => Err(CredentialError::Timeout),
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(CredentialError::Internal(join.to_string())),
        Err(_) => Err(CredentialError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes-long";
    const TWO_HOURS: Duration = Duration::from_secs(7200);

    fn signer() -> CredentialSigner {
        CredentialSigner::new(SECRET, TWO_HOURS)
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let issued = signer.issue().unwrap();
        assert_eq!(issued.claims.role, "admin");
        assert_eq!(issued.claims.exp - issued.claims.iat, 7200);

        let claims = signer.verify(&issued.token).unwrap();
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn test_wrong_role_rejected() {
        let signer = signer();
        let now = unix_now();
        let token = signer
            .sign(&Claims {
                role: "coach".into(),
                iat: now,
                exp: now + 3600,
            })
            .unwrap();
        assert_eq!(
            signer.verify(&token),
            Err(CredentialError::WrongRole("coach".into()))
        );
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = CredentialSigner::new("another-secret-that-is-also-32-bytes-long", TWO_HOURS);
        let token = other.issue().unwrap().token;
        assert_eq!(signer().verify(&token), Err(CredentialError::BadSignature));
    }

    #[test]
    fn test_expired_rejected() {
        let signer = signer();
        let now = unix_now();
        let token = signer
            .sign(&Claims {
                role: ADMIN_ROLE.into(),
                iat: now - 7300,
                exp: now - 100,
            })
            .unwrap();
        assert_eq!(signer.verify(&token), Err(CredentialError::Expired));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(signer().verify("not.a.jwt"), Err(CredentialError::Malformed));
        assert_eq!(signer().verify(""), Err(CredentialError::Malformed));
    }

    #[tokio::test]
    async fn test_verify_within_deadline() {
        let signer = signer();
        let token = signer.issue().unwrap().token;
        let claims = signer
            .verify_within(token, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(claims.role, ADMIN_ROLE);
    }

    #[tokio::test]
    async fn test_slow_check_times_out() {
        let claims = signer().issue().unwrap().claims;
        let result = check_within(Duration::from_millis(20), move || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(claims)
        })
        .await;
        assert_eq!(result, Err(CredentialError::Timeout));
    }

    #[tokio::test]
    async fn test_zero_deadline_always_times_out() {
        let signer = signer();
        let token = signer.issue().unwrap().token;
        let result = signer.verify_within(token, Duration::ZERO).await;
        assert_eq!(result, Err(CredentialError::Timeout));
    }

    #[tokio::test]
    async fn test_panicking_check_is_internal() {
        let result = check_within(Duration::from_secs(1), || panic!("verifier crashed")).await;
        assert!(matches!(result, Err(CredentialError::Internal(_))));
    }
}
