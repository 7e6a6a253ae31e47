//! A persistent backend storing one flat text document on disk.
//!
//! The document is a JSON object mapping keys to values, rewritten whole on
//! every write batch. Enumeration goes through an unordered hash map, so scans
//! filter with [`scan_match`] and sort the matches before applying the limit.
//! Keys and values must be UTF-8 text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{
    Backend, BackendError, BackendResult, BufferedIterator, Record, RecordIterator, WriteOp,
};
use crate::{ScanBounds, scan_match};

type Document = HashMap<String, String>;

/// Backend persisting a single JSON document.
///
/// A write batch is applied to a copy of the document, written to a sibling
/// temporary file and renamed over the original. The in-memory copy is only
/// replaced once the rename succeeds, so a failed batch leaves both the file
/// and readers untouched.
pub struct FileBackend {
    path: PathBuf,
    data: RwLock<Document>,
}

impl FileBackend {
    /// Opens the document at `path`, starting empty if the file does not exist.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BackendError::Storage(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let data = match tokio::fs::read(&path).await {
            Ok(contents) => serde_json::from_slice::<Document>(&contents).map_err(|e| {
                BackendError::Storage(format!(
                    "Failed to parse store file '{}': {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => {
                return Err(BackendError::Storage(format!(
                    "Failed to read store file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Returns the path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path the next document is written to before the rename.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, document: &Document) -> BackendResult<()> {
        let contents = serde_json::to_vec(document)
            .map_err(|e| BackendError::Internal(format!("Failed to encode store file: {}", e)))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, contents).await.map_err(|e| {
            BackendError::Storage(format!("Failed to write '{}': {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            BackendError::Storage(format!(
                "Failed to replace '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

fn to_text(bytes: &Bytes, what: &str) -> BackendResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| BackendError::Storage(format!("file backend requires UTF-8 {}", what)))
}

#[async_trait]
impl Backend for FileBackend {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn gets(&self, keys: &[Bytes]) -> BackendResult<Vec<Option<Bytes>>> {
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .map(|key| {
                std::str::from_utf8(key)
                    .ok()
                    .and_then(|key| data.get(key))
                    .map(|value| Bytes::from(value.clone()))
            })
            .collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn has_keys(&self, keys: &[Bytes]) -> BackendResult<Vec<bool>> {
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .map(|key| std::str::from_utf8(key).is_ok_and(|key| data.contains_key(key)))
            .collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_entries(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn RecordIterator + Send + 'static>> {
        if bounds.is_empty() {
            return Ok(Box::new(BufferedIterator::empty()));
        }

        let data = self.data.read().await;
        let mut records: Vec<Record> = data
            .iter()
            .filter(|(key, _)| scan_match(key.as_bytes(), bounds))
            .map(|(key, value)| {
                Record::new(Bytes::from(key.clone()), Bytes::from(value.clone()))
            })
            .collect();
        drop(data);

        records.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(limit) = bounds.limit {
            records.truncate(limit);
        }
        Ok(Box::new(BufferedIterator::new(records)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<WriteOp>) -> BackendResult<()> {
        let mut data = self.data.write().await;

        let mut next = data.clone();
        for op in &ops {
            match op {
                WriteOp::Put(record) => {
                    next.insert(
                        to_text(&record.key, "keys")?,
                        to_text(&record.value, "values")?,
                    );
                }
                WriteOp::Delete(key) => {
                    if let Ok(key) = std::str::from_utf8(key) {
                        next.remove(key);
                    }
                }
            }
        }

        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}
