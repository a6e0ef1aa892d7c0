//! Bridge configuration

use crate::writer::DEFAULT_BLOCK_SIZE;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The contents are not valid TOML for [`BridgeConfig`]
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Options applied to every VM the bridge creates.
///
/// ```toml
/// open_stdlib = true
/// extension = "host"
/// dump_block_size = 512
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Open the Lua standard libraries on creation
    pub open_stdlib: bool,

    /// Global name of the bridge extension library. `None` or an empty
    /// name leaves it unopened.
    pub extension: Option<String>,

    /// Minimum growth step of the bytecode dump buffer
    pub dump_block_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            open_stdlib: true,
            extension: Some("host".to_string()),
            dump_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Extension name to open, if any
    pub fn extension_name(&self) -> Option<&str> {
        self.extension.as_deref().filter(|name| !name.is_empty())
    }

    /// A configuration without standard libraries or extension
    pub fn bare() -> Self {
        Self {
            open_stdlib: false,
            extension: None,
            ..Default::default()
        }
    }
}
