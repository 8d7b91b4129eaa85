//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)          process environment (.env)
//!     → loader.rs (parse & deserialize)     → loader.rs (JWT_SECRET, ADMIN_PASSWORD_HASH)
//!     → validation.rs (semantic checks)     → validation.rs (secret shape)
//!     → GatekeeperConfig                    → Secrets
//!     → GatekeeperState built once at startup, shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets never live in the config file
//! - Any loading error is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_secrets, resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    AccessConfig, CredentialTransport, DenialPolicy, Environment, GatekeeperConfig,
    ListenerConfig, LoginThrottleConfig, ObservabilityConfig, RateLimitConfig, Secrets,
    TimeoutConfig, UpstreamConfig,
};
