use std::path::Path;
use std::time::Duration;

use rix_kv::PoolConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::keys::DEFAULT_NAMESPACE;

/// Repository configuration.
///
/// Every field has a default, so a TOML document only needs the keys it
/// wants to override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Prefix for every key the repository writes.
    pub namespace: String,
    /// Readings per transaction in batch deletion.
    pub batch_size: usize,
    /// Pooled connections available to concurrent operations.
    pub max_connections: usize,
    /// How long an operation waits for a pooled connection.
    pub acquire_timeout_ms: u64,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            batch_size: 1000,
            max_connections: 16,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl RepoConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid {
                field: "namespace",
                reason: "must not be empty".into(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                field: "max_connections",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }
}
