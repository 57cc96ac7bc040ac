use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vellum_content::MessageContent;

use super::View;
use super::arena::HandlerArena;
use super::error::ViewError;
use super::frame::{HandlerContext, HandlerOutcome};
use crate::domain::{Interaction, MessageHandle};
use crate::runtime::Connector;

/// What the runtime must do after a handler ran.
pub enum Followup {
    Idle,
    Commit,
    Transition(Box<dyn LiveView>),
}

/// A view instance: props, current state, message handle, and bound handlers.
pub struct ViewInstance<V: View> {
    props: Arc<V>,
    state: V::State,
    message: Option<MessageHandle>,
    arena: HandlerArena<V>,
}

impl<V: View> ViewInstance<V> {
    pub fn new(props: V) -> Self {
        let state = props.initial_state();
        Self {
            props: Arc::new(props),
            state,
            message: None,
            arena: HandlerArena::default(),
        }
    }

    /// Rebuild an instance from a persisted record.
    pub fn restore(props: V, state: V::State, generation: u64, message: MessageHandle) -> Self {
        Self {
            props: Arc::new(props),
            state,
            message: Some(message),
            arena: HandlerArena::at(generation),
        }
    }

    pub fn props(&self) -> &V {
        &self.props
    }

    pub fn state(&self) -> &V::State {
        &self.state
    }

    /// Replace the state. Takes effect on the next commit.
    pub fn set_state(&mut self, state: V::State) {
        self.state = state;
    }
}

/// Type-erased view, as held by the runtime's cache.
#[async_trait]
pub trait LiveView: Send + Sync + 'static {
    fn view_type_id(&self) -> &'static str;

    fn message(&self) -> Option<&MessageHandle>;

    fn message_mut(&mut self) -> Option<&mut MessageHandle>;

    fn attach(&mut self, handle: MessageHandle);

    /// Take over `previous`'s message, continuing its handler generations so
    /// ids minted by `previous` can never resolve here.
    fn adopt(&mut self, previous: &dyn LiveView);

    /// Generation of the committed handler table.
    fn generation(&self) -> u64;

    /// Render and stage a new handler generation.
    async fn render_frame(&mut self) -> Result<MessageContent, ViewError>;

    /// The staged frame reached the remote side.
    fn confirm_frame(&mut self);

    /// Render under the committed generation, keeping existing ids valid.
    async fn rearm(&mut self) -> Result<MessageContent, ViewError>;

    async fn invoke(
        &mut self,
        control_id: &str,
        values: Vec<String>,
        interaction: &Interaction,
        connector: Arc<dyn Connector>,
    ) -> Result<Followup, ViewError>;

    fn serialize_state(&self) -> Result<String, ViewError>;

    async fn before_evict(&self) -> Result<(), ViewError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[async_trait]
impl<V: View> LiveView for ViewInstance<V> {
    fn view_type_id(&self) -> &'static str {
        V::TYPE_ID
    }

    fn message(&self) -> Option<&MessageHandle> {
        self.message.as_ref()
    }

    fn message_mut(&mut self) -> Option<&mut MessageHandle> {
        self.message.as_mut()
    }

    fn attach(&mut self, handle: MessageHandle) {
        self.message = Some(handle);
    }

    fn adopt(&mut self, previous: &dyn LiveView) {
        self.message = previous.message().cloned();
        self.arena = HandlerArena::at(previous.generation());
    }

    fn generation(&self) -> u64 {
        self.arena.generation()
    }

    async fn render_frame(&mut self) -> Result<MessageContent, ViewError> {
        let frame = self.props.render(&self.state).await?;
        Ok(self.arena.stage(frame))
    }

    fn confirm_frame(&mut self) {
        self.arena.promote();
    }

    async fn rearm(&mut self) -> Result<MessageContent, ViewError> {
        let frame = self.props.render(&self.state).await?;
        Ok(self.arena.arm(frame))
    }

    async fn invoke(
        &mut self,
        control_id: &str,
        values: Vec<String>,
        interaction: &Interaction,
        connector: Arc<dyn Connector>,
    ) -> Result<Followup, ViewError> {
        let Some(handler) = self.arena.lookup(control_id)? else {
            debug!(view = V::TYPE_ID, control_id, "control has no handler");
            return Ok(Followup::Idle);
        };

        let context = HandlerContext {
            props: Arc::clone(&self.props),
            state: self.state.clone(),
            interaction: interaction.clone(),
            values,
            connector,
        };

        match handler(context).await? {
            HandlerOutcome::Unchanged => Ok(Followup::Idle),
            HandlerOutcome::SetState(state) => {
                self.state = state;
                Ok(Followup::Commit)
            }
            HandlerOutcome::Transition(next) => Ok(Followup::Transition(next)),
        }
    }

    fn serialize_state(&self) -> Result<String, ViewError> {
        self.props.serialize_state(&self.state, self.arena.generation())
    }

    async fn before_evict(&self) -> Result<(), ViewError> {
        self.props.before_evict(&self.state).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
