//! Inbound interaction model shared by the runtime and host applications.

pub mod error;
pub mod event;
pub mod handle;
pub mod interaction;
pub mod options;

pub use error::DomainError;
pub use event::{CommandKind, InboundEvent};
pub use handle::{EditTarget, MessageHandle, Webhook};
pub use interaction::{INTERACTION_TOKEN_TTL, Interaction};
pub use options::{CommandOption, CommandOptions, OptionKind, OptionValue};
