//! In-process connector that keeps messages in memory.
//!
//! Stands in for the remote service in the demo binary and in tests: every
//! call is recorded, and the stored messages can be altered to simulate a
//! remote side that drifted from what the runtime committed.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;
use vellum_content::MessageContent;

use crate::domain::{Interaction, MessageHandle};
use crate::runtime::{Connector, ConnectorError, EditTarget};
use crate::sync::lock_or_recover;

const SOURCE: &str = "infra::loopback";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorCall {
    Send { channel_id: String, message_id: String },
    Reply { interaction_id: u64, message_id: String },
    Update { interaction_id: u64, message_id: String },
    Edit { target: EditTarget },
    Delete { message_id: String },
    Fetch { message_id: String },
    Notify { interaction_id: u64, text: String },
}

#[derive(Debug, Clone)]
struct StoredMessage {
    channel_id: String,
    content: MessageContent,
}

#[derive(Debug)]
pub struct LoopbackConnector {
    messages: DashMap<String, StoredMessage>,
    calls: Mutex<Vec<ConnectorCall>>,
    accept_updates: AtomicBool,
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self {
            messages: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            accept_updates: AtomicBool::new(true),
        }
    }
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// When disabled, `try_update` declines and commits fall back to edits.
    pub fn set_accept_updates(&self, accept: bool) {
        self.accept_updates.store(accept, Ordering::SeqCst);
    }

    pub fn message(&self, message_id: &str) -> Option<MessageContent> {
        self.messages
            .get(message_id)
            .map(|entry| entry.content.clone())
    }

    pub fn channel_of(&self, message_id: &str) -> Option<String> {
        self.messages
            .get(message_id)
            .map(|entry| entry.channel_id.clone())
    }

    /// Overwrite what the remote side shows for `message_id`.
    pub fn set_remote(&self, message_id: &str, content: MessageContent) -> bool {
        match self.messages.get_mut(message_id) {
            Some(mut entry) => {
                entry.content = content;
                true
            }
            None => false,
        }
    }

    /// Forget `message_id` as if it was deleted remotely.
    pub fn remove_remote(&self, message_id: &str) -> bool {
        self.messages.remove(message_id).is_some()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn calls(&self) -> Vec<ConnectorCall> {
        lock_or_recover(&self.calls, SOURCE, "calls").clone()
    }

    pub fn take_calls(&self) -> Vec<ConnectorCall> {
        std::mem::take(&mut *lock_or_recover(&self.calls, SOURCE, "take_calls"))
    }

    fn record(&self, call: ConnectorCall) {
        debug!(call = ?call, "loopback call");
        lock_or_recover(&self.calls, SOURCE, "record").push(call);
    }

    fn store(&self, channel_id: &str, content: &MessageContent) -> String {
        let message_id = Uuid::new_v4().simple().to_string();
        self.messages.insert(
            message_id.clone(),
            StoredMessage {
                channel_id: channel_id.to_string(),
                content: content.clone(),
            },
        );
        message_id
    }

    fn overwrite(&self, message_id: &str, content: &MessageContent) -> Result<(), ConnectorError> {
        let mut entry = self
            .messages
            .get_mut(message_id)
            .ok_or_else(|| ConnectorError::not_found(message_id))?;
        entry.content = content.clone();
        Ok(())
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn send_to_channel(
        &self,
        channel_id: &str,
        content: &MessageContent,
    ) -> Result<MessageHandle, ConnectorError> {
        let message_id = self.store(channel_id, content);
        self.record(ConnectorCall::Send {
            channel_id: channel_id.to_string(),
            message_id: message_id.clone(),
        });
        Ok(MessageHandle::direct(channel_id, message_id))
    }

    async fn reply_to_interaction(
        &self,
        interaction: &Interaction,
        content: &MessageContent,
    ) -> Result<MessageHandle, ConnectorError> {
        let message_id = self.store(&interaction.channel_id, content);
        self.record(ConnectorCall::Reply {
            interaction_id: interaction.id,
            message_id: message_id.clone(),
        });
        Ok(MessageHandle::reply(
            interaction,
            self.interaction_webhook(interaction),
            message_id,
        ))
    }

    async fn try_update(
        &self,
        interaction: &Interaction,
        content: &MessageContent,
    ) -> Result<bool, ConnectorError> {
        if !self.accept_updates.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let Some(message_id) = interaction.message_id.as_deref() else {
            return Ok(false);
        };
        if !self.messages.contains_key(message_id) {
            return Ok(false);
        }
        self.overwrite(message_id, content)?;
        self.record(ConnectorCall::Update {
            interaction_id: interaction.id,
            message_id: message_id.to_string(),
        });
        Ok(true)
    }

    async fn edit_message(&self, target: &EditTarget, content: &MessageContent) -> Result<(), ConnectorError> {
        let message_id = match target {
            EditTarget::Webhook { message_id, .. } | EditTarget::Channel { message_id, .. } => message_id,
        };
        self.overwrite(message_id, content)?;
        self.record(ConnectorCall::Edit {
            target: target.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, handle: &MessageHandle) -> Result<(), ConnectorError> {
        self.record(ConnectorCall::Delete {
            message_id: handle.message_id().to_string(),
        });
        self.messages
            .remove(handle.message_id())
            .map(|_| ())
            .ok_or_else(|| ConnectorError::not_found(handle.message_id()))
    }

    async fn fetch_message(&self, handle: &MessageHandle) -> Result<MessageContent, ConnectorError> {
        self.record(ConnectorCall::Fetch {
            message_id: handle.message_id().to_string(),
        });
        self.message(handle.message_id())
            .ok_or_else(|| ConnectorError::not_found(handle.message_id()))
    }

    async fn notify(&self, interaction: &Interaction, text: &str) -> Result<(), ConnectorError> {
        self.record(ConnectorCall::Notify {
            interaction_id: interaction.id,
            text: text.to_string(),
        });
        Ok(())
    }
}
