use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("option `{name}` is a {found}, expected {expected}")]
    OptionKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("message descriptor is invalid: {message}")]
    Descriptor { message: String },
}

impl DomainError {
    pub fn option_kind(name: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::OptionKind {
            name: name.into(),
            expected,
            found,
        }
    }

    pub fn descriptor(message: impl Into<String>) -> Self {
        Self::Descriptor {
            message: message.into(),
        }
    }
}
