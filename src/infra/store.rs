//! Persistence store implementations.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs;
use tracing::debug;

use super::error::InfraError;
use crate::runtime::{PersistedRecord, PersistenceStore, StoreError};

/// Process-local store. Records do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, PersistedRecord>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.records.contains_key(content_id)
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn store_state(&self, content_id: &str, record: PersistedRecord) -> Result<(), StoreError> {
        self.records.insert(content_id.to_string(), record);
        Ok(())
    }

    async fn get_state(&self, content_id: &str) -> Result<PersistedRecord, StoreError> {
        self.records
            .get(content_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(content_id))
    }

    async fn delete_state(&self, content_id: &str) -> Result<(), StoreError> {
        self.records.remove(content_id);
        Ok(())
    }
}

/// One JSON file per record under a root directory.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// reader never sees a half-written record.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

const RECORD_EXTENSION: &str = "json";

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if necessary.
    pub fn new(root: PathBuf) -> Result<Self, InfraError> {
        if let Err(source) = std::fs::create_dir_all(&root) {
            return Err(InfraError::StoreDirectory { path: root, source });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Content ids of every stored record, sorted.
    pub async fn content_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await.map_err(unavailable)?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unavailable)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if is_valid_key(stem) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn resolve(&self, content_id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_key(content_id) {
            return Err(StoreError::invalid_key(content_id));
        }
        Ok(self.root.join(format!("{content_id}.{RECORD_EXTENSION}")))
    }
}

#[async_trait]
impl PersistenceStore for FileStore {
    async fn store_state(&self, content_id: &str, record: PersistedRecord) -> Result<(), StoreError> {
        let path = self.resolve(content_id)?;
        let payload = serde_json::to_vec_pretty(&record)
            .map_err(|err| StoreError::corrupt(format!("failed to encode record: {err}")))?;

        let root = self.root.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&root, &target, &payload))
            .await
            .map_err(|err| StoreError::unavailable(format!("record write task failed: {err}")))?
            .map_err(unavailable)?;
        debug!(content_id, path = %path.display(), "record stored");
        Ok(())
    }

    async fn get_state(&self, content_id: &str) -> Result<PersistedRecord, StoreError> {
        let path = self.resolve(content_id)?;
        let payload = match fs::read(&path).await {
            Ok(payload) => payload,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::not_found(content_id));
            }
            Err(err) => return Err(unavailable(err)),
        };
        serde_json::from_slice(&payload)
            .map_err(|err| StoreError::corrupt(format!("{}: {err}", path.display())))
    }

    async fn delete_state(&self, content_id: &str) -> Result<(), StoreError> {
        let path = self.resolve(content_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(unavailable(err)),
        }
    }
}

/// Stage `payload` in a temporary file under `root`, then move it over `target`.
/// The staging file is removed if any step fails.
fn write_atomically(root: &Path, target: &Path, payload: &[u8]) -> std::io::Result<()> {
    let mut staging = tempfile::Builder::new()
        .prefix(".record-")
        .suffix(".tmp")
        .tempfile_in(root)?;
    staging.write_all(payload)?;
    staging.as_file().sync_all()?;
    staging.persist(target).map_err(|err| err.error)?;
    Ok(())
}

/// Content ids become file names, so only a conservative alphabet is allowed.
fn is_valid_key(content_id: &str) -> bool {
    !content_id.is_empty()
        && content_id.len() <= 128
        && content_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn unavailable(err: std::io::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}
