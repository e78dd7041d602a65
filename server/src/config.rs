//! Configuration for the authentication service

use config::{Config, Environment};
use serde::Deserialize;

/// Environment variable prefix, e.g. `HEALTHBRIDGE_ACCESS_SECRET`.
const ENV_PREFIX: &str = "HEALTHBRIDGE";

const DEFAULT_ACCESS_TTL_SECS: i64 = 86_400; // 1 day
const DEFAULT_REFRESH_TTL_SECS: i64 = 604_800; // 7 days

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Source(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Process-wide settings, read once at startup and passed by reference to
/// every component. Both token secrets are required; startup fails without
/// them.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_source(env: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("bind_addr", "0.0.0.0:5000")?
            .set_default("access_secret", "")?
            .set_default("refresh_secret", "")?
            .set_default("access_ttl_secs", DEFAULT_ACCESS_TTL_SECS)?
            .set_default("refresh_ttl_secs", DEFAULT_REFRESH_TTL_SECS)?
            .add_source(env)
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "access token secret must be set ({ENV_PREFIX}_ACCESS_SECRET)"
            )));
        }
        if self.refresh_secret.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "refresh token secret must be set ({ENV_PREFIX}_REFRESH_SECRET)"
            )));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::Invalid(
                "access and refresh token secrets must differ".to_string(),
            ));
        }
        if self.access_ttl_secs <= 0 || self.refresh_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(
                "token lifetimes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}_{k}"), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn loads_with_defaults() {
        let config = ServerConfig::from_source(env_with(&[
            ("ACCESS_SECRET", "access-secret"),
            ("REFRESH_SECRET", "refresh-secret"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.access_ttl_secs, DEFAULT_ACCESS_TTL_SECS);
        assert_eq!(config.refresh_ttl_secs, DEFAULT_REFRESH_TTL_SECS);
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = ServerConfig::from_source(env_with(&[("ACCESS_SECRET", "only-one")]))
            .unwrap_err();
        assert!(err.to_string().contains("REFRESH_SECRET"));
    }

    #[test]
    fn equal_secrets_are_rejected() {
        let err = ServerConfig::from_source(env_with(&[
            ("ACCESS_SECRET", "same"),
            ("REFRESH_SECRET", "same"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn ttl_overrides_are_parsed() {
        let config = ServerConfig::from_source(env_with(&[
            ("ACCESS_SECRET", "a"),
            ("REFRESH_SECRET", "b"),
            ("ACCESS_TTL_SECS", "900"),
            ("REFRESH_TTL_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.access_ttl_secs, 900);
        assert_eq!(config.refresh_ttl_secs, 3600);
    }
}
