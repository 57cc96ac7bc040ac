use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;

use super::connector::{Connector, ConnectorError};
use super::store::{PersistedRecord, PersistenceStore};
use crate::domain::{Interaction, MessageHandle};
use crate::view::{LiveView, ViewError};

pub(crate) enum SendTarget<'a> {
    Channel(&'a str),
    Reply(&'a Interaction),
}

/// Moves rendered frames to the remote side and records the result.
#[derive(Clone)]
pub(crate) struct Committer {
    connector: Arc<dyn Connector>,
    store: Arc<dyn PersistenceStore>,
}

impl Committer {
    pub(crate) fn new(connector: Arc<dyn Connector>, store: Arc<dyn PersistenceStore>) -> Self {
        Self { connector, store }
    }

    pub(crate) async fn send(
        &self,
        view: &mut dyn LiveView,
        target: SendTarget<'_>,
    ) -> Result<MessageHandle, ViewError> {
        let content = view.render_frame().await?;
        let handle = match target {
            SendTarget::Channel(channel_id) => self.connector.send_to_channel(channel_id, &content).await?,
            SendTarget::Reply(interaction) => {
                self.connector
                    .reply_to_interaction(interaction, &content)
                    .await?
            }
        };
        view.confirm_frame();
        view.attach(handle.clone());
        self.persist(view).await?;
        debug!(
            view = view.view_type_id(),
            content_id = handle.message_id(),
            "view sent"
        );
        Ok(handle)
    }

    /// Re-render and push the frame to the existing message.
    ///
    /// With an interaction, the update is first offered as that
    /// interaction's response; otherwise, or if that is refused, the message
    /// is edited through its handle.
    pub(crate) async fn update(
        &self,
        view: &mut dyn LiveView,
        interaction: Option<&Interaction>,
    ) -> Result<(), ViewError> {
        let handle = view.message().cloned().ok_or(ViewError::NotSent)?;
        let content = view.render_frame().await?;

        let delivered = match interaction {
            Some(interaction) => self.connector.try_update(interaction, &content).await?,
            None => false,
        };
        if !delivered {
            let target = handle.edit_target(OffsetDateTime::now_utc());
            self.connector.edit_message(&target, &content).await?;
        }

        view.confirm_frame();
        self.persist(view).await?;
        debug!(
            view = view.view_type_id(),
            content_id = handle.message_id(),
            generation = view.generation(),
            via_interaction = delivered,
            "view updated"
        );
        Ok(())
    }

    pub(crate) async fn persist(&self, view: &dyn LiveView) -> Result<(), ViewError> {
        let handle = view.message().ok_or(ViewError::NotSent)?;
        let record = PersistedRecord {
            view_type_id: view.view_type_id().to_string(),
            serialized_state: view.serialize_state()?,
            message_descriptor: handle.to_descriptor()?,
        };
        self.store.store_state(handle.message_id(), record).await?;
        Ok(())
    }

    /// Drop both the record and the remote message. A message that is
    /// already gone counts as deleted.
    pub(crate) async fn discard(&self, handle: &MessageHandle) -> Result<(), ViewError> {
        self.store.delete_state(handle.message_id()).await?;
        match self.connector.delete_message(handle).await {
            Ok(()) | Err(ConnectorError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
