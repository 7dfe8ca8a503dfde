//! Run configuration.
//!
//! Settings that label what a run leaves behind in the document. The
//! adjustments themselves live in [`crate::recipe::Recipe`].
//!
//! ```toml
//! history_name = "Knife retouch"
//! group_name = "Knife"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a [`RetouchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetouchConfig {
    /// Label of the single undo entry a run produces.
    pub history_name: String,
    /// Name given to the created group; the host's default when unset.
    pub group_name: Option<String>,
}

impl Default for RetouchConfig {
    fn default() -> Self {
        Self {
            history_name: "Knife retouch".to_string(),
            group_name: None,
        }
    }
}

impl RetouchConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.history_name.trim().is_empty() {
            return Err(ConfigError::Invalid("history_name must not be empty".into()));
        }
        if matches!(&self.group_name, Some(name) if name.trim().is_empty()) {
            return Err(ConfigError::Invalid("group_name must not be empty when set".into()));
        }
        Ok(())
    }
}
