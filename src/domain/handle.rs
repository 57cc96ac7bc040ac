//! Where a view's message lives and how it can be edited.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;
use super::interaction::{Interaction, token_is_fresh};

/// Credentials that allow editing an interaction reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub application_id: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageHandle {
    /// A plain channel message, editable indefinitely.
    Direct {
        channel_id: String,
        message_id: String,
    },
    /// A reply to an interaction, editable through its token while fresh.
    InteractionReply {
        channel_id: String,
        message_id: String,
        application_id: String,
        token: String,
        interaction_id: u64,
        #[serde(with = "time::serde::rfc3339")]
        issued_at: OffsetDateTime,
    },
}

/// Resolved route for an out-of-interaction edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Webhook { webhook: Webhook, message_id: String },
    Channel { channel_id: String, message_id: String },
}

impl MessageHandle {
    pub fn direct(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self::Direct {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }

    pub fn reply(interaction: &Interaction, webhook: Webhook, message_id: impl Into<String>) -> Self {
        Self::InteractionReply {
            channel_id: interaction.channel_id.clone(),
            message_id: message_id.into(),
            application_id: webhook.application_id,
            token: webhook.token,
            interaction_id: interaction.id,
            issued_at: interaction.created_at,
        }
    }

    pub fn message_id(&self) -> &str {
        match self {
            MessageHandle::Direct { message_id, .. }
            | MessageHandle::InteractionReply { message_id, .. } => message_id,
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            MessageHandle::Direct { channel_id, .. }
            | MessageHandle::InteractionReply { channel_id, .. } => channel_id,
        }
    }

    pub fn webhook(&self) -> Option<Webhook> {
        match self {
            MessageHandle::Direct { .. } => None,
            MessageHandle::InteractionReply {
                application_id,
                token,
                ..
            } => Some(Webhook {
                application_id: application_id.clone(),
                token: token.clone(),
            }),
        }
    }

    /// Route an edit made outside any interaction. Expired tokens fall back
    /// to the channel message.
    pub fn edit_target(&self, now: OffsetDateTime) -> EditTarget {
        match self {
            MessageHandle::InteractionReply {
                message_id,
                application_id,
                token,
                issued_at,
                ..
            } if token_is_fresh(*issued_at, now) => EditTarget::Webhook {
                webhook: Webhook {
                    application_id: application_id.clone(),
                    token: token.clone(),
                },
                message_id: message_id.clone(),
            },
            other => EditTarget::Channel {
                channel_id: other.channel_id().to_string(),
                message_id: other.message_id().to_string(),
            },
        }
    }

    /// Adopt the token of a newer interaction against the same message.
    ///
    /// Returns `true` when the handle changed. Interactions whose id is not
    /// greater than the recorded one are ignored, so a late arrival never
    /// reverts to an older token.
    pub fn refresh(&mut self, interaction: &Interaction, webhook: Webhook) -> bool {
        match self {
            MessageHandle::Direct { .. } => false,
            MessageHandle::InteractionReply {
                application_id,
                token,
                interaction_id,
                issued_at,
                ..
            } => {
                if interaction.id <= *interaction_id {
                    return false;
                }
                *application_id = webhook.application_id;
                *token = webhook.token;
                *interaction_id = interaction.id;
                *issued_at = interaction.created_at;
                true
            }
        }
    }

    pub fn to_descriptor(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_descriptor(raw: &str) -> Result<Self, DomainError> {
        serde_json::from_str(raw).map_err(|err| DomainError::descriptor(err.to_string()))
    }
}
