//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files.
//! Secrets are never read from the file; see [`Secrets`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Deployment environment (controls the `Secure` cookie attribute).
    pub environment: Environment,

    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Site renderer that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// General API rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Login attempt throttling.
    pub login_throttle: LoginThrottleConfig,

    /// Route classification and protected-area policy.
    pub access: AccessConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            max_body_size: 1024 * 1024,
        }
    }
}

/// Upstream (site renderer) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Upper bound on one upstream round trip, in seconds.
    pub upstream_secs: u64,

    /// Upper bound on a single credential verification, in milliseconds.
    pub verify_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
            verify_ms: 250,
        }
    }
}

/// Fixed-window rate limiting for API routes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Upper bound on tracked client keys.
    pub max_entries: usize,

    /// Interval between sweeps of expired windows, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 50,
            window_secs: 60,
            max_entries: 100_000,
            sweep_interval_secs: 60,
        }
    }
}

/// Fixed-window throttle on the login endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginThrottleConfig {
    /// Login attempts allowed per client within one window.
    pub max_attempts: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Upper bound on tracked client keys.
    pub max_entries: usize,
}

impl Default for LoginThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 15 * 60,
            max_entries: 100_000,
        }
    }
}

/// What the access guard does with a request that fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DenialPolicy {
    /// Let the request reach the page, which checks `/api/auth/session` itself.
    #[default]
    ClientHandled,
    /// Redirect to the login page and clear the credential cookie.
    Redirect,
}

/// Where the login endpoint hands the credential to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialTransport {
    /// HTTP-only cookie only.
    #[default]
    Cookie,
    /// Cookie, plus the raw token in the response body for bearer clients.
    Bearer,
}

/// Route classification and credential settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Prefix of routes subject to the general rate limiter.
    pub api_prefix: String,

    /// Exact path of the login endpoint.
    pub auth_path: String,

    /// Prefixes that require an admin credential.
    pub protected_prefixes: Vec<String>,

    /// Redirect target in redirect mode.
    pub login_path: String,

    /// Denial policy for protected pages.
    pub denial_policy: DenialPolicy,

    /// Credential delivery mode.
    pub transport: CredentialTransport,

    /// Credential lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            auth_path: "/api/auth".to_string(),
            protected_prefixes: vec!["/admin".to_string(), "/api/admin".to_string()],
            login_path: "/login".to_string(),
            denial_policy: DenialPolicy::default(),
            transport: CredentialTransport::default(),
            token_ttl_secs: 2 * 60 * 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Startup secrets, read from the process environment.
#[derive(Clone)]
pub struct Secrets {
    /// HMAC key for signing credentials.
    pub jwt_secret: String,

    /// Hex SHA-256 of the admin password.
    pub admin_password_hash: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("admin_password_hash", &"<redacted>")
            .finish()
    }
}
