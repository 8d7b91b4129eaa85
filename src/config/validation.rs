//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, limits > 0)
//! - Check route prefixes are well formed
//! - Check secret shape (length, hex digest)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatekeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{GatekeeperConfig, Secrets};
use crate::routing::matcher::{Matcher, PathPrefixMatcher};

/// Minimum accepted HMAC key length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }
    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::new(
            "upstream.address",
            format!("invalid host:port '{}'", config.upstream.address),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be > 0"));
    }
    if config.timeouts.verify_ms == 0 {
        errors.push(ValidationError::new("timeouts.verify_ms", "must be > 0"));
    }

    let rl = &config.rate_limit;
    if rl.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
    }
    if rl.window_secs == 0 {
        errors.push(ValidationError::new("rate_limit.window_secs", "must be > 0"));
    }
    if rl.max_entries == 0 {
        errors.push(ValidationError::new("rate_limit.max_entries", "must be > 0"));
    }
    if rl.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.sweep_interval_secs", "must be > 0"));
    }

    let lt = &config.login_throttle;
    if lt.max_attempts == 0 {
        errors.push(ValidationError::new("login_throttle.max_attempts", "must be > 0"));
    }
    if lt.window_secs == 0 {
        errors.push(ValidationError::new("login_throttle.window_secs", "must be > 0"));
    }
    if lt.max_entries == 0 {
        errors.push(ValidationError::new("login_throttle.max_entries", "must be > 0"));
    }

    let access = &config.access;
    for (field, value) in [
        ("access.api_prefix", &access.api_prefix),
        ("access.auth_path", &access.auth_path),
        ("access.login_path", &access.login_path),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }
    for prefix in &access.protected_prefixes {
        if !prefix.starts_with('/') || prefix.len() < 2 {
            errors.push(ValidationError::new(
                "access.protected_prefixes",
                format!("'{}' must start with '/' and name a path", prefix),
            ));
        }
        if PathPrefixMatcher::new(prefix.as_str()).matches(&access.login_path) {
            errors.push(ValidationError::new(
                "access.login_path",
                format!("login page is inside protected prefix '{}'", prefix),
            ));
        }
    }
    if access.token_ttl_secs == 0 {
        errors.push(ValidationError::new("access.token_ttl_secs", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check startup secrets.
pub fn validate_secrets(secrets: &Secrets) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if secrets.jwt_secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "JWT_SECRET",
            format!("must be at least {} bytes", MIN_SECRET_LEN),
        ));
    }
    let hash = &secrets.admin_password_hash;
    if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        errors.push(ValidationError::new(
            "ADMIN_PASSWORD_HASH",
            "must be a 64-character hex SHA-256 digest",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatekeeperConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatekeeperConfig::default();
        config.rate_limit.window_secs = 0;
        config.login_throttle.max_attempts = 0;
        config.access.api_prefix = "api".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_login_page_cannot_be_protected() {
        let mut config = GatekeeperConfig::default();
        config.access.login_path = "/admin/login".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "access.login_path");
    }

    #[test]
    fn test_login_page_beside_protected_prefix_is_allowed() {
        let mut config = GatekeeperConfig::default();
        config.access.login_path = "/administer-login".to_string();
        assert!(validate_config(&config).is_ok());

        config.access.login_path = "/admin".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "access.login_path");
    }

    #[test]
    fn test_upstream_must_be_host_port() {
        let mut config = GatekeeperConfig::default();
        config.upstream.address = "http://site:3000/".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "upstream.address");
    }

    #[test]
    fn test_short_secret_rejected() {
        let secrets = Secrets {
            jwt_secret: "short".to_string(),
            admin_password_hash: "0".repeat(64),
        };
        let errors = validate_secrets(&secrets).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "JWT_SECRET");
    }
}
