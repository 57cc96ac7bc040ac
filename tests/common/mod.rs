#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use time::OffsetDateTime;
use vellum::content::{Component, MessageContent};
use vellum::domain::{InboundEvent, Interaction};
use vellum::infra::loopback::LoopbackConnector;
use vellum::infra::store::MemoryStore;
use vellum::runtime::{Dispatch, RuntimeConfig, ViewRuntime, ViewRuntimeBuilder};
use vellum::view::ViewError;

pub const CHANNEL: &str = "general";

/// A runtime wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub runtime: ViewRuntime,
    pub connector: Arc<LoopbackConnector>,
    pub store: Arc<MemoryStore>,
    next_interaction: AtomicU64,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(configure: impl FnOnce(ViewRuntimeBuilder) -> ViewRuntimeBuilder) -> Self {
        Self::with_config(RuntimeConfig::default(), configure)
    }

    pub fn with_config(
        config: RuntimeConfig,
        configure: impl FnOnce(ViewRuntimeBuilder) -> ViewRuntimeBuilder,
    ) -> Self {
        let connector = Arc::new(LoopbackConnector::new());
        let store = Arc::new(MemoryStore::default());
        let builder = vellum::demo::install(
            ViewRuntime::builder()
                .connector(connector.clone())
                .store(store.clone())
                .config(config),
        );
        let runtime = configure(builder).build().expect("runtime should build");
        Self {
            runtime,
            connector,
            store,
            next_interaction: AtomicU64::new(1_000),
        }
    }

    pub fn interaction(&self, message_id: Option<&str>) -> Interaction {
        self.interaction_at(message_id, OffsetDateTime::now_utc())
    }

    pub fn interaction_at(&self, message_id: Option<&str>, created_at: OffsetDateTime) -> Interaction {
        let id = self.next_interaction.fetch_add(1, Ordering::SeqCst);
        Interaction {
            id,
            application_id: "app".into(),
            token: format!("token-{id}"),
            channel_id: CHANNEL.into(),
            user_id: "user-1".into(),
            message_id: message_id.map(str::to_string),
            created_at,
        }
    }

    pub fn live(&self, message_id: &str) -> MessageContent {
        self.connector
            .message(message_id)
            .expect("message should exist remotely")
    }

    /// Custom id of the button labelled `label` on the live message.
    pub fn control(&self, message_id: &str, label: &str) -> String {
        control_id(&self.live(message_id), label)
    }

    pub fn component_event(&self, message_id: &str, custom_id: String, values: Vec<String>) -> InboundEvent {
        InboundEvent::Component {
            message_id: message_id.to_string(),
            custom_id,
            values,
            interaction: self.interaction(Some(message_id)),
        }
    }

    pub async fn click(&self, message_id: &str, label: &str) -> Result<Dispatch, ViewError> {
        let custom_id = self.control(message_id, label);
        self.runtime
            .handle_event(self.component_event(message_id, custom_id, Vec::new()))
            .await
    }

    pub async fn select(&self, message_id: &str, value: &str) -> Result<Dispatch, ViewError> {
        let custom_id = self
            .live(message_id)
            .components_flat()
            .find_map(|component| match component {
                Component::StringSelect { custom_id, .. } => Some(custom_id.clone()),
                _ => None,
            })
            .expect("message should carry a select menu");
        self.runtime
            .handle_event(self.component_event(message_id, custom_id, vec![value.to_string()]))
            .await
    }

    /// Let spawned eviction hooks run.
    pub async fn settle(&self) {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn control_id(content: &MessageContent, label: &str) -> String {
    content
        .components_flat()
        .find_map(|component| match component {
            Component::Button {
                custom_id: Some(id),
                label: found,
                ..
            } if found == label => Some(id.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no `{label}` button on the message"))
}

/// Count shown by a rendered counter.
pub fn count(content: &MessageContent) -> String {
    content.embeds[0]
        .description
        .clone()
        .expect("counter embed has a description")
}
