use thiserror::Error;

use super::registry::RegistrationKind;

/// Failures while assembling a [`super::ViewRuntime`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("a persistence store is required but none was configured")]
    MissingPersistence,
    #[error("a connector is required but none was configured")]
    MissingConnector,
    #[error("{kind} `{name}` is registered twice")]
    DuplicateRegistration { kind: RegistrationKind, name: String },
}
