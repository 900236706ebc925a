//! Configuration for the handoff, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! ttl_ms = 300000
//!
//! [store]
//! path = "notification_actions.json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::gateway::DEFAULT_TTL_MS;

pub const DEFAULT_SLOT_FILE: &str = "notification_actions.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandoffConfig {
    /// Age in milliseconds at which a pending action is no longer delivered.
    pub ttl_ms: u64,

    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Location of the slot file.
    pub path: PathBuf,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SLOT_FILE),
        }
    }
}

impl HandoffConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The configured TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_ms == 0 {
            return Err(ConfigError::Invalid("ttl_ms must be greater than zero".into()));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store.path must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = HandoffConfig::from_toml_str("").unwrap();
        assert_eq!(config, HandoffConfig::default());
        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.store.path, PathBuf::from(DEFAULT_SLOT_FILE));
    }

    #[test]
    fn overrides_are_applied() {
        let config = HandoffConfig::from_toml_str(
            r#"
            ttl_ms = 60000
            [store]
            path = "/var/lib/reminders/slot.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.ttl(), Duration::from_secs(60));
        assert_eq!(config.store.path, PathBuf::from("/var/lib/reminders/slot.json"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        assert!(matches!(
            HandoffConfig::from_toml_str("ttl_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            HandoffConfig::from_toml_str("ttl = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HandoffConfig::load("/nonexistent/handoff.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/handoff.toml"));
    }
}
