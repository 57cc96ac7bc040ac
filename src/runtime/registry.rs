//! Targets that inbound events can be routed to.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::ViewRuntime;
use super::error::RuntimeError;
use super::store::PersistedRecord;
use crate::domain::{CommandKind, CommandOptions, Interaction, MessageHandle};
use crate::view::{LiveView, Restored, View, ViewError, ViewInstance};

pub struct CommandContext {
    pub runtime: ViewRuntime,
    pub interaction: Interaction,
    pub options: CommandOptions,
    /// Target user or message id for context-menu commands.
    pub target: Option<String>,
}

pub struct ModalContext {
    pub runtime: ViewRuntime,
    pub interaction: Interaction,
    pub custom_id: String,
    pub fields: Vec<(String, String)>,
}

impl ModalContext {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: CommandContext) -> Result<(), ViewError>;
}

#[async_trait]
pub trait ModalHandler: Send + Sync {
    async fn handle(&self, ctx: ModalContext) -> Result<(), ViewError>;
}

/// Rebuilds one view type from its persisted record.
pub trait ViewFactory: Send + Sync {
    fn type_id(&self) -> &'static str;

    /// `Ok(None)` means the record was written by an obsolete schema.
    fn restore(
        &self,
        record: &PersistedRecord,
        handle: MessageHandle,
    ) -> Result<Option<Box<dyn LiveView>>, ViewError>;
}

pub struct PageFactory<V>(PhantomData<fn() -> V>);

impl<V> Default for PageFactory<V> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<V: View> ViewFactory for PageFactory<V> {
    fn type_id(&self) -> &'static str {
        V::TYPE_ID
    }

    fn restore(
        &self,
        record: &PersistedRecord,
        handle: MessageHandle,
    ) -> Result<Option<Box<dyn LiveView>>, ViewError> {
        match V::deserialize_state(&record.serialized_state)? {
            Restored::Current {
                props,
                state,
                generation,
            } => Ok(Some(Box::new(ViewInstance::restore(
                props, state, generation, handle,
            )))),
            Restored::Obsolete { found } => {
                tracing::debug!(
                    view = V::TYPE_ID,
                    found,
                    expected = V::SCHEMA_VERSION,
                    "persisted view schema is obsolete"
                );
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    ChatCommand,
    UserCommand,
    MessageCommand,
    Page,
    Modal,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationKind::ChatCommand => "chat command",
            RegistrationKind::UserCommand => "user command",
            RegistrationKind::MessageCommand => "message command",
            RegistrationKind::Page => "page",
            RegistrationKind::Modal => "modal",
        }
    }

    fn command(kind: CommandKind) -> Self {
        match kind {
            CommandKind::Chat => RegistrationKind::ChatCommand,
            CommandKind::User => RegistrationKind::UserCommand,
            CommandKind::Message => RegistrationKind::MessageCommand,
        }
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the host wants the runtime to route to.
pub enum Registration {
    ChatCommand {
        name: String,
        handler: Arc<dyn CommandHandler>,
    },
    UserCommand {
        name: String,
        handler: Arc<dyn CommandHandler>,
    },
    MessageCommand {
        name: String,
        handler: Arc<dyn CommandHandler>,
    },
    Page(Arc<dyn ViewFactory>),
    Modal {
        custom_id: String,
        handler: Arc<dyn ModalHandler>,
    },
}

impl Registration {
    pub fn command(kind: CommandKind, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        let name = name.into();
        match kind {
            CommandKind::Chat => Registration::ChatCommand { name, handler },
            CommandKind::User => Registration::UserCommand { name, handler },
            CommandKind::Message => Registration::MessageCommand { name, handler },
        }
    }

    pub fn page<V: View>() -> Self {
        Registration::Page(Arc::new(PageFactory::<V>::default()))
    }

    pub fn modal(custom_id: impl Into<String>, handler: Arc<dyn ModalHandler>) -> Self {
        Registration::Modal {
            custom_id: custom_id.into(),
            handler,
        }
    }

    pub fn kind(&self) -> RegistrationKind {
        match self {
            Registration::ChatCommand { .. } => RegistrationKind::ChatCommand,
            Registration::UserCommand { .. } => RegistrationKind::UserCommand,
            Registration::MessageCommand { .. } => RegistrationKind::MessageCommand,
            Registration::Page(_) => RegistrationKind::Page,
            Registration::Modal { .. } => RegistrationKind::Modal,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Registration::ChatCommand { name, .. }
            | Registration::UserCommand { name, .. }
            | Registration::MessageCommand { name, .. } => name,
            Registration::Page(factory) => factory.type_id(),
            Registration::Modal { custom_id, .. } => custom_id,
        }
    }
}

/// Lookup tables built once while the runtime is assembled.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<(RegistrationKind, String), Arc<dyn CommandHandler>>,
    pages: HashMap<&'static str, Arc<dyn ViewFactory>>,
    modals: HashMap<String, Arc<dyn ModalHandler>>,
}

impl Registry {
    pub fn insert(&mut self, registration: Registration) -> Result<(), RuntimeError> {
        let kind = registration.kind();
        let duplicate = |name: &str| RuntimeError::DuplicateRegistration {
            kind,
            name: name.to_string(),
        };

        match registration {
            Registration::ChatCommand { name, handler }
            | Registration::UserCommand { name, handler }
            | Registration::MessageCommand { name, handler } => {
                let key = (kind, name);
                if self.commands.contains_key(&key) {
                    return Err(duplicate(&key.1));
                }
                self.commands.insert(key, handler);
            }
            Registration::Page(factory) => {
                let type_id = factory.type_id();
                if self.pages.contains_key(type_id) {
                    return Err(duplicate(type_id));
                }
                self.pages.insert(type_id, factory);
            }
            Registration::Modal { custom_id, handler } => {
                if self.modals.contains_key(&custom_id) {
                    return Err(duplicate(&custom_id));
                }
                self.modals.insert(custom_id, handler);
            }
        }
        Ok(())
    }

    pub fn command(&self, kind: CommandKind, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands
            .get(&(RegistrationKind::command(kind), name.to_string()))
            .cloned()
    }

    pub fn page(&self, type_id: &str) -> Option<Arc<dyn ViewFactory>> {
        self.pages.get(type_id).cloned()
    }

    pub fn modal(&self, custom_id: &str) -> Option<Arc<dyn ModalHandler>> {
        self.modals.get(custom_id).cloned()
    }

    pub fn has_page(&self, type_id: &str) -> bool {
        self.pages.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.pages.len() + self.modals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _ctx: CommandContext) -> Result<(), ViewError> {
            Ok(())
        }
    }

    #[test]
    fn same_name_in_different_kinds_is_allowed() {
        let mut registry = Registry::default();
        registry
            .insert(Registration::command(CommandKind::Chat, "inspect", Arc::new(Noop)))
            .unwrap();
        registry
            .insert(Registration::command(CommandKind::Message, "inspect", Arc::new(Noop)))
            .unwrap();

        assert!(registry.command(CommandKind::Chat, "inspect").is_some());
        assert!(registry.command(CommandKind::User, "inspect").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = Registry::default();
        registry
            .insert(Registration::command(CommandKind::User, "wave", Arc::new(Noop)))
            .unwrap();
        let err = registry
            .insert(Registration::command(CommandKind::User, "wave", Arc::new(Noop)))
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::DuplicateRegistration {
                kind: RegistrationKind::UserCommand,
                name: "wave".into()
            }
        );
        assert_eq!(err.to_string(), "user command `wave` is registered twice");
    }
}
