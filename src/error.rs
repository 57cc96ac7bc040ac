use thiserror::Error;

use crate::{
    config::LoadError,
    infra::error::InfraError,
    runtime::{RuntimeError, StoreError},
    view::ViewError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Validation(_) => 2,
            AppError::Runtime(_) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_failures_exit_with_usage_status() {
        let err = AppError::from(LoadError::Invalid {
            key: "store.backend",
            reason: "unknown".into(),
        });
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "invalid configuration for `store.backend`: unknown"
        );
    }

    #[test]
    fn runtime_errors_pass_through_transparently() {
        let err = AppError::from(RuntimeError::MissingConnector);
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), RuntimeError::MissingConnector.to_string());
    }
}
