use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Durable form of one view, keyed by content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub view_type_id: String,
    pub serialized_state: String,
    pub message_descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no record for content `{content_id}`")]
    NotFound { content_id: String },
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    #[error("stored record is corrupt: {message}")]
    Corrupt { message: String },
    #[error("content id `{content_id}` cannot be used as a key")]
    InvalidKey { content_id: String },
}

impl StoreError {
    pub fn not_found(content_id: impl Into<String>) -> Self {
        Self::NotFound {
            content_id: content_id.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub fn invalid_key(content_id: impl Into<String>) -> Self {
        Self::InvalidKey {
            content_id: content_id.into(),
        }
    }
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn store_state(&self, content_id: &str, record: PersistedRecord) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when nothing is stored, which is
    /// distinct from the store being unreachable.
    async fn get_state(&self, content_id: &str) -> Result<PersistedRecord, StoreError>;

    /// Deleting a missing record succeeds.
    async fn delete_state(&self, content_id: &str) -> Result<(), StoreError>;
}
