//! # Configuration Management
//!
//! Process-level settings for the seeder, read from `SECRET_SEEDER_*`
//! environment variables. Per-invocation inputs arrive with the event and
//! live in [`crate::invocation`] instead.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `SECRET_SEEDER_REGION` | SDK default chain | AWS region for the store client |
//! | `SECRET_SEEDER_SM_ENDPOINT` | none | Secrets Manager endpoint override (e.g. LocalStack) |
//! | `SECRET_SEEDER_CALL_TIMEOUT_SECS` | `10` | Bound on each store call |
//! | `SECRET_SEEDER_STRICT_TAGGING` | `false` | Fail the pass when tagging fails |
//! | `SECRET_SEEDER_LOG_LEVEL` | `info` | Filter used when `RUST_LOG` is unset |
//! | `SECRET_SEEDER_LOG_JSON` | `false` | Emit JSON log lines |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::errors::{Result, SeederError};
use crate::secrets::{GatewayOptions, TagFailurePolicy};

const ENV_PREFIX: &str = "SECRET_SEEDER_";

/// Seeder process configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SeederConfig {
    /// AWS region; `None` defers to the SDK's provider chain
    pub region: Option<String>,

    /// Secrets Manager endpoint override
    pub secrets_endpoint: Option<String>,

    #[validate(range(
        min = 1,
        max = 300,
        message = "Call timeout must be between 1 and 300 seconds"
    ))]
    pub call_timeout_secs: u64,

    /// Fail instead of warn when tagging a new secret fails
    pub strict_tagging: bool,

    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    pub log_json: bool,
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self {
            region: None,
            secrets_endpoint: None,
            call_timeout_secs: 10,
            strict_tagging: false,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl SeederConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `lookup` receives full variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };
        let defaults = Self::default();

        let call_timeout_secs = match var("CALL_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                SeederError::config(format!("Invalid CALL_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => defaults.call_timeout_secs,
        };

        let config = Self {
            region: var("REGION"),
            secrets_endpoint: var("SM_ENDPOINT"),
            call_timeout_secs,
            strict_tagging: parse_flag("STRICT_TAGGING", var("STRICT_TAGGING"))?,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_flag("LOG_JSON", var("LOG_JSON"))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SeederError::from)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Gateway settings derived from this configuration
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            call_timeout: self.call_timeout(),
            tag_failure_policy: if self.strict_tagging {
                TagFailurePolicy::Fail
            } else {
                TagFailurePolicy::Warn
            },
        }
    }
}

fn parse_flag(name: &str, raw: Option<String>) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => {
            Err(SeederError::config(format!("Invalid {} '{}': expected a boolean", name, v)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = SeederConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.region.is_none());
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert_eq!(config.gateway_options().tag_failure_policy, TagFailurePolicy::Warn);
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
    }

    #[test]
    fn test_config_from_vars() {
        let config = SeederConfig::from_lookup(lookup(&[
            ("SECRET_SEEDER_REGION", "eu-west-1"),
            ("SECRET_SEEDER_SM_ENDPOINT", "http://localhost:4566"),
            ("SECRET_SEEDER_CALL_TIMEOUT_SECS", "3"),
            ("SECRET_SEEDER_STRICT_TAGGING", "true"),
            ("SECRET_SEEDER_LOG_JSON", "1"),
        ]))
        .unwrap();

        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.secrets_endpoint.as_deref(), Some("http://localhost:4566"));
        let options = config.gateway_options();
        assert_eq!(options.call_timeout, Duration::from_secs(3));
        assert_eq!(options.tag_failure_policy, TagFailurePolicy::Fail);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_values() {
        let err =
            SeederConfig::from_lookup(lookup(&[("SECRET_SEEDER_CALL_TIMEOUT_SECS", "soon")]))
                .unwrap_err();
        assert!(matches!(err, SeederError::Config(_)));

        let err = SeederConfig::from_lookup(lookup(&[("SECRET_SEEDER_CALL_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("Call timeout"));

        let err = SeederConfig::from_lookup(lookup(&[("SECRET_SEEDER_STRICT_TAGGING", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("STRICT_TAGGING"));
    }
}
