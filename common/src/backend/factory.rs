//! Backend factory for creating backend instances from configuration.

use std::sync::Arc;

use super::config::BackendConfig;
use super::file::FileBackend;
use super::in_memory::MemoryBackend;
use super::{Backend, BackendResult};

/// Creates a backend based on the provided configuration.
///
/// # Errors
///
/// Returns an error if the backend cannot be opened, or if the configuration
/// names SlateDB and the `slatedb` feature is not enabled.
pub async fn create_backend(config: &BackendConfig) -> BackendResult<Arc<dyn Backend>> {
    match config {
        BackendConfig::InMemory => Ok(Arc::new(MemoryBackend::new())),
        BackendConfig::File(file_config) => {
            let backend = FileBackend::open(&file_config.path).await?;
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "slatedb")]
        BackendConfig::SlateDb(slate_config) => {
            let backend = slatedb_backend::create_slatedb_backend(slate_config).await?;
            Ok(Arc::new(backend))
        }
        #[cfg(not(feature = "slatedb"))]
        BackendConfig::SlateDb(_) => Err(super::BackendError::Storage(
            "SlateDB backend requested but the `slatedb` feature is not enabled".to_string(),
        )),
    }
}

#[cfg(feature = "slatedb")]
mod slatedb_backend {
    use std::sync::Arc;

    use slatedb::DbBuilder;
    use slatedb::config::Settings;
    use slatedb::object_store::{self, ObjectStore};

    use super::super::config::{ObjectStoreConfig, SlateDbBackendConfig};
    use super::super::slate::SlateDbBackend;
    use super::super::{BackendError, BackendResult};

    /// Creates an object store from configuration without initializing SlateDB.
    pub(super) fn create_object_store(
        config: &ObjectStoreConfig,
    ) -> BackendResult<Arc<dyn ObjectStore>> {
        match config {
            ObjectStoreConfig::InMemory => Ok(Arc::new(object_store::memory::InMemory::new())),
            ObjectStoreConfig::Local(local_config) => {
                std::fs::create_dir_all(&local_config.path).map_err(|e| {
                    BackendError::Storage(format!(
                        "Failed to create storage directory '{}': {}",
                        local_config.path, e
                    ))
                })?;
                let store =
                    object_store::local::LocalFileSystem::new_with_prefix(&local_config.path)
                        .map_err(|e| {
                            BackendError::Storage(format!(
                                "Failed to create local filesystem store: {}",
                                e
                            ))
                        })?;
                Ok(Arc::new(store))
            }
        }
    }

    pub(super) async fn create_slatedb_backend(
        config: &SlateDbBackendConfig,
    ) -> BackendResult<SlateDbBackend> {
        let object_store = create_object_store(&config.object_store)?;

        let settings = match &config.settings_path {
            Some(path) => Settings::from_file(path).map_err(|e| {
                BackendError::Storage(format!(
                    "Failed to load SlateDB settings from {}: {}",
                    path, e
                ))
            })?,
            None => Settings::load().unwrap_or_default(),
        };

        let db = DbBuilder::new(config.path.clone(), object_store)
            .with_settings(settings)
            .build()
            .await
            .map_err(|e| BackendError::Storage(format!("Failed to create SlateDB: {}", e)))?;

        Ok(SlateDbBackend::new(Arc::new(db)))
    }
}
