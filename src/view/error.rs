use thiserror::Error;

use crate::domain::DomainError;
use crate::pipeline::PipelineError;
use crate::runtime::{ConnectorError, StoreError};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("view has not been sent yet")]
    NotSent,
    #[error("no view is resident or persisted for content `{content_id}`")]
    ViewNotFound { content_id: String },
    #[error("control `{control_id}` belongs to generation {found}, current generation is {current}")]
    StaleControl {
        control_id: String,
        found: u64,
        current: u64,
    },
    #[error("control `{control_id}` is not part of the current render")]
    UnknownControl { control_id: String },
    #[error("control id `{control_id}` is malformed")]
    InvalidControlId { control_id: String },
    #[error("content `{content_id}` holds a `{found}` view, expected `{expected}`")]
    TypeMismatch {
        content_id: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),
    #[error("persistence error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("handler failed: {0}")]
    Handler(String),
}

impl ViewError {
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    pub fn not_found(content_id: impl Into<String>) -> Self {
        Self::ViewNotFound {
            content_id: content_id.into(),
        }
    }

    /// Programming mistakes that should surface loudly rather than degrade.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ViewError::NotSent
                | ViewError::StaleControl { .. }
                | ViewError::UnknownControl { .. }
                | ViewError::InvalidControlId { .. }
                | ViewError::TypeMismatch { .. }
                | ViewError::Pipeline(_)
        )
    }
}
