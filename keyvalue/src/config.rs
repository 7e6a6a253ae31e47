//! Configuration for opening a [`Kv`](crate::Kv).

use std::path::Path;

use common::BackendConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of keys deleted per transaction by [`Kv::clear`](crate::Kv::clear).
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

fn default_divisor() -> String {
    ".".to_string()
}

fn default_delimiter() -> String {
    ":".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Namespacing and batching options for a root facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvOptions {
    /// Scope path the root facade starts in. Empty means unscoped.
    #[serde(default)]
    pub scope: Vec<String>,

    /// Joins scope segments into one namespace token.
    #[serde(default = "default_divisor")]
    pub divisor: String,

    /// Separates the namespace token from the logical key.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Maximum number of deletes per transaction when clearing a range.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for KvOptions {
    fn default() -> Self {
        Self {
            scope: Vec::new(),
            divisor: default_divisor(),
            delimiter: default_delimiter(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Configuration for [`Kv::open`](crate::Kv::open).
///
/// # Example
///
/// ```toml
/// [backend]
/// type = "File"
/// path = "/var/lib/app/store.json"
///
/// [options]
/// scope = ["app"]
/// chunk_size = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend to open.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Options for the root facade.
    #[serde(default)]
    pub options: KvOptions,
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::InvalidConfiguration(format!("Failed to parse config: {}", e)))
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfiguration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }
}
