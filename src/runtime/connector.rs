use async_trait::async_trait;
use thiserror::Error;
use vellum_content::MessageContent;

pub use crate::domain::handle::{EditTarget, Webhook};
use crate::domain::{Interaction, MessageHandle};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("message `{message_id}` does not exist on the remote side")]
    NotFound { message_id: String },
    #[error("remote side rejected the request: {message}")]
    Rejected { message: String },
    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl ConnectorError {
    pub fn not_found(message_id: impl Into<String>) -> Self {
        Self::NotFound {
            message_id: message_id.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Transport to the remote messaging service.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn send_to_channel(
        &self,
        channel_id: &str,
        content: &MessageContent,
    ) -> Result<MessageHandle, ConnectorError>;

    async fn reply_to_interaction(
        &self,
        interaction: &Interaction,
        content: &MessageContent,
    ) -> Result<MessageHandle, ConnectorError>;

    /// Update the message `interaction` was raised on as the interaction's
    /// response. Returns `false` if the interaction can no longer be used
    /// that way, in which case the caller edits the message instead.
    async fn try_update(
        &self,
        interaction: &Interaction,
        content: &MessageContent,
    ) -> Result<bool, ConnectorError>;

    async fn edit_message(&self, target: &EditTarget, content: &MessageContent) -> Result<(), ConnectorError>;

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), ConnectorError>;

    async fn fetch_message(&self, handle: &MessageHandle) -> Result<MessageContent, ConnectorError>;

    /// Ephemeral notice to the user behind `interaction`.
    async fn notify(&self, interaction: &Interaction, text: &str) -> Result<(), ConnectorError>;

    fn interaction_token<'a>(&self, interaction: &'a Interaction) -> &'a str {
        &interaction.token
    }

    /// Webhook through which replies to `interaction` can be modified.
    fn interaction_webhook(&self, interaction: &Interaction) -> Webhook {
        Webhook {
            application_id: interaction.application_id.clone(),
            token: self.interaction_token(interaction).to_string(),
        }
    }
}
