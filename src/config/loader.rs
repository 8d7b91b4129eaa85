//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{GatekeeperConfig, Secrets};
use crate::config::validation::{validate_config, validate_secrets, ValidationError};

/// Environment variable holding the credential signing key.
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";

/// Environment variable holding the admin password hash.
pub const ADMIN_PASSWORD_HASH_VAR: &str = "ADMIN_PASSWORD_HASH";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Settings that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
}

/// Effective configuration: the file (or defaults), then overrides, then a
/// single validation pass over the result.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<GatekeeperConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml::from_str::<GatekeeperConfig>(&fs::read_to_string(path)?)?,
        None => GatekeeperConfig::default(),
    };
    if let Some(bind) = overrides.bind_address {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    resolve_config(Some(path), ConfigOverrides::default())
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatekeeperConfig, ConfigError> {
    let config: GatekeeperConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read startup secrets from the process environment.
///
/// Both secrets are mandatory; their absence is fatal at startup.
pub fn load_secrets() -> Result<Secrets, ConfigError> {
    secrets_from(|name| std::env::var(name).ok())
}

/// Build secrets from an arbitrary variable lookup.
pub fn secrets_from<F>(lookup: F) -> Result<Secrets, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let jwt_secret = lookup(JWT_SECRET_VAR)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingEnv(JWT_SECRET_VAR))?;
    let admin_password_hash = lookup(ADMIN_PASSWORD_HASH_VAR)
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingEnv(ADMIN_PASSWORD_HASH_VAR))?;

    let secrets = Secrets {
        jwt_secret,
        admin_password_hash,
    };
    validate_secrets(&secrets).map_err(ConfigError::Validation)?;
    Ok(secrets)
}
