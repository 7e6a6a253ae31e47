//! Backend configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Selects and configures the backend a key-value store runs on.
///
/// # Example
///
/// ```toml
/// [backend]
/// type = "File"
/// path = "/var/lib/app/store.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BackendConfig {
    /// Volatile ordered map; data is lost on drop.
    #[default]
    InMemory,
    /// Single JSON document on the local filesystem.
    File(FileBackendConfig),
    /// SlateDB over an object store. Requires the `slatedb` feature.
    SlateDb(SlateDbBackendConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBackendConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlateDbBackendConfig {
    /// Path prefix for the database inside the object store.
    pub path: String,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Optional SlateDB settings file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    Local(LocalObjectStoreConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectStoreConfig {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_in_memory() {
        assert_eq!(BackendConfig::default(), BackendConfig::InMemory);
    }

    #[test]
    fn should_deserialize_file_config() {
        // given
        let json = r#"{"type": "File", "path": "/tmp/store.json"}"#;

        // when
        let config: BackendConfig = serde_json::from_str(json).unwrap();

        // then
        assert_eq!(
            config,
            BackendConfig::File(FileBackendConfig {
                path: PathBuf::from("/tmp/store.json"),
            })
        );
    }

    #[test]
    fn should_default_slatedb_object_store_to_in_memory() {
        // given
        let json = r#"{"type": "SlateDb", "path": "db"}"#;

        // when
        let config: BackendConfig = serde_json::from_str(json).unwrap();

        // then
        assert_eq!(
            config,
            BackendConfig::SlateDb(SlateDbBackendConfig {
                path: "db".to_string(),
                object_store: ObjectStoreConfig::InMemory,
                settings_path: None,
            })
        );
    }
}
