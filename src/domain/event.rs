use serde::{Deserialize, Serialize};

use super::interaction::Interaction;
use super::options::CommandOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Chat,
    User,
    Message,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Chat => "chat",
            CommandKind::User => "user",
            CommandKind::Message => "message",
        }
    }
}

/// Everything the runtime can be asked to handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    Command {
        kind: CommandKind,
        name: String,
        #[serde(default)]
        options: CommandOptions,
        /// Target user or message id for context-menu commands.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        interaction: Interaction,
    },
    Component {
        message_id: String,
        custom_id: String,
        #[serde(default)]
        values: Vec<String>,
        interaction: Interaction,
    },
    ModalSubmit {
        custom_id: String,
        #[serde(default)]
        fields: Vec<(String, String)>,
        interaction: Interaction,
    },
}

impl InboundEvent {
    pub fn interaction(&self) -> &Interaction {
        match self {
            InboundEvent::Command { interaction, .. }
            | InboundEvent::Component { interaction, .. }
            | InboundEvent::ModalSubmit { interaction, .. } => interaction,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Command { .. } => "command",
            InboundEvent::Component { .. } => "component",
            InboundEvent::ModalSubmit { .. } => "modal_submit",
        }
    }

    /// Command name, component custom id or modal custom id.
    pub fn target_name(&self) -> &str {
        match self {
            InboundEvent::Command { name, .. } => name,
            InboundEvent::Component { custom_id, .. } | InboundEvent::ModalSubmit { custom_id, .. } => {
                custom_id
            }
        }
    }
}
