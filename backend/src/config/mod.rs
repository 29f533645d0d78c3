//! Service configuration.
//!
//! [`Config`] is a plain value handed to whatever needs it; nothing reads
//! settings from ambient state. It can be built from the environment (after
//! loading `.env`) or from a JSON file with the same field names.
//!
//! ```bash
//! SHEETHOOK_DEBUG=true
//! SHEETHOOK_CONTEXT_SHEET=Context
//! SHEETHOOK_EPICS_SHEET=Epics
//! SHEETHOOK_CACHE_TTL_SECS=21600
//! SHEETHOOK_WEBHOOK_ATTEMPTS=3
//! SHEETHOOK_WEBHOOK_RETRY_DELAY_MS=1000
//! SHEETHOOK_WEBHOOK_TIMEOUT_MS=10000
//! SHEETHOOK_WEBHOOK_EPICS=https://hooks.example.com/epics
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::api::logs::log_info;
use crate::error::ConfigError;

const ENV_PREFIX: &str = "SHEETHOOK_";
const WEBHOOK_PREFIX: &str = "SHEETHOOK_WEBHOOK_";

/// Context tree lifetime in the cache: 6 hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 21_600;

/// Webhook operation used by the Epics pipeline.
pub const EPICS_OPERATION: &str = "epics";

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Emit non-forced debug messages.
    pub debug: bool,
    /// Sheet whose edits rebuild the context tree.
    pub context_sheet: String,
    /// Sheet whose edits may fire the webhook.
    pub epics_sheet: String,
    /// Lifetime of cached context trees.
    pub cache_ttl_secs: u64,
    /// Total delivery attempts per payload.
    pub webhook_attempts: u32,
    /// Pause between delivery attempts.
    pub webhook_retry_delay_ms: u64,
    /// Per-attempt request timeout.
    pub webhook_timeout_ms: u64,
    /// Operation name (lowercase) to webhook URL.
    pub webhooks: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            context_sheet: "Context".to_string(),
            epics_sheet: "Epics".to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            webhook_attempts: 3,
            webhook_retry_delay_ms: 1000,
            webhook_timeout_ms: 10_000,
            webhooks: HashMap::new(),
        }
    }
}

impl Config {
    /// Build from process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs; unrelated names are ignored.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (name, value) in vars {
            if let Some(op) = name.strip_prefix(WEBHOOK_PREFIX) {
                match op {
                    "ATTEMPTS" => config.webhook_attempts = parse_var(&name, &value)?,
                    "RETRY_DELAY_MS" => config.webhook_retry_delay_ms = parse_var(&name, &value)?,
                    "TIMEOUT_MS" => config.webhook_timeout_ms = parse_var(&name, &value)?,
                    _ if !op.is_empty() && !value.is_empty() => {
                        config.webhooks.insert(op.to_lowercase(), value);
                    }
                    _ => {}
                }
                continue;
            }

            match name.strip_prefix(ENV_PREFIX) {
                Some("DEBUG") => config.debug = parse_flag(&name, &value)?,
                Some("CONTEXT_SHEET") => config.context_sheet = value,
                Some("EPICS_SHEET") => config.epics_sheet = value,
                Some("CACHE_TTL_SECS") => config.cache_ttl_secs = parse_var(&name, &value)?,
                _ => {}
            }
        }

        config.validate()
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.webhooks = config
            .webhooks
            .into_iter()
            .map(|(op, url)| (op.to_lowercase(), url))
            .collect();
        config.validate()
    }

    /// Reject settings no loader may produce.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.webhook_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var: "webhook_attempts".to_string(),
                value: "0".to_string(),
            });
        }
        if self.webhook_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "webhook_timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(self)
    }

    /// Webhook URL for an operation, if one is configured.
    pub fn webhook_url(&self, operation: &str) -> Option<&str> {
        self.webhooks
            .get(&operation.to_lowercase())
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Log `message` when debugging is on, or unconditionally with `force`.
    pub fn log(&self, message: impl Into<String>, force: bool) {
        if self.debug || force {
            log_info(message);
        }
    }

    /// Register a webhook URL for an operation.
    pub fn with_webhook(mut self, operation: &str, url: impl Into<String>) -> Self {
        self.webhooks.insert(operation.to_lowercase(), url.into());
        self
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cache_ttl_secs, 21_600);
        assert_eq!(config.context_sheet, "Context");
        assert_eq!(config.epics_sheet, "Epics");
        assert!(config.webhook_url(EPICS_OPERATION).is_none());
    }

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(vars(&[
            ("SHEETHOOK_DEBUG", "true"),
            ("SHEETHOOK_EPICS_SHEET", "Backlog"),
            ("SHEETHOOK_CACHE_TTL_SECS", "60"),
            ("SHEETHOOK_WEBHOOK_ATTEMPTS", "5"),
            ("SHEETHOOK_WEBHOOK_EPICS", "https://hooks.example.com/epics"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.epics_sheet, "Backlog");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.webhook_attempts, 5);
        assert_eq!(config.webhook_url("epics"), Some("https://hooks.example.com/epics"));
        assert_eq!(config.webhook_url("EPICS"), Some("https://hooks.example.com/epics"));
        assert_eq!(config.webhooks.len(), 1);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_vars(vars(&[("SHEETHOOK_CACHE_TTL_SECS", "six hours")])).unwrap_err();
        assert!(err.to_string().contains("SHEETHOOK_CACHE_TTL_SECS"));

        assert!(Config::from_vars(vars(&[("SHEETHOOK_DEBUG", "maybe")])).is_err());
        assert!(Config::from_vars(vars(&[("SHEETHOOK_WEBHOOK_ATTEMPTS", "0")])).is_err());
        assert!(Config::from_vars(vars(&[("SHEETHOOK_WEBHOOK_TIMEOUT_MS", "0")])).is_err());
    }

    #[test]
    fn test_empty_webhook_is_unset() {
        let config = Config::default().with_webhook("epics", "");
        assert!(config.webhook_url("epics").is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"debug": true, "webhooks": {{"Epics": "http://localhost:9000/hook"}}}}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
        assert_eq!(config.webhook_url("epics"), Some("http://localhost:9000/hook"));
    }

    #[test]
    fn test_from_file_rejects_zero_attempts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"webhook_attempts": 0}}"#).unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "webhook_attempts"));
    }

    #[test]
    fn test_timeout_from_vars() {
        let config = Config::from_vars(vars(&[("SHEETHOOK_WEBHOOK_TIMEOUT_MS", "250")])).unwrap();
        assert_eq!(config.webhook_timeout_ms, 250);
        assert_eq!(Config::default().webhook_timeout_ms, 10_000);
    }
}
