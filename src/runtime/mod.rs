//! The view runtime: residency, rehydration, dispatch and commits.
//!
//! Views live in an [`ExpiringCache`] keyed by content id (the remote message
//! id). A cache miss rehydrates the view from the [`PersistenceStore`] and
//! checks the live message for drift before any event is applied to it.

mod commit;
mod config;
mod connector;
mod error;
mod registry;
mod store;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub use config::{DEFAULT_CACHE_TTL, DEFAULT_STALE_NOTICE, RuntimeConfig};
pub use connector::{Connector, ConnectorError, EditTarget, Webhook};
pub use error::RuntimeError;
pub use registry::{
    CommandContext, CommandHandler, ModalContext, ModalHandler, PageFactory, Registration,
    RegistrationKind, Registry, ViewFactory,
};
pub use store::{PersistedRecord, PersistenceStore, StoreError};

use self::commit::{Committer, SendTarget};
use crate::cache::{EvictionCause, EvictionHook, ExpiringCache, HookError, Lease};
use crate::domain::{CommandKind, InboundEvent, Interaction, MessageHandle};
use crate::infra::store::MemoryStore;
use crate::pipeline::{Interceptor, MiddlewarePipeline, Next};
use crate::view::{Drift, Followup, LiveView, View, ViewError, ViewInstance, diff};

/// A resident view. Each dispatch holds the lock for its handler and commit.
pub type SharedView = Arc<Mutex<Box<dyn LiveView>>>;

/// A resident view checked out for one operation; it stays in memory until
/// the lease is dropped.
type Checkout = Lease<String, SharedView>;

/// How an inbound event was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and left the view unchanged.
    Handled,
    /// A handler changed state and the new frame was committed.
    Committed,
    /// A handler replaced the view with another one.
    Transitioned,
    /// The live message had drifted; it was re-committed and the event dropped.
    Refreshed,
    /// No target exists for the event.
    Dropped,
    /// An interceptor stopped the event before it reached a target.
    Intercepted,
}

impl Dispatch {
    pub fn as_str(self) -> &'static str {
        match self {
            Dispatch::Handled => "handled",
            Dispatch::Committed => "committed",
            Dispatch::Transitioned => "transitioned",
            Dispatch::Refreshed => "refreshed",
            Dispatch::Dropped => "dropped",
            Dispatch::Intercepted => "intercepted",
        }
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    connector: Arc<dyn Connector>,
    store: Arc<dyn PersistenceStore>,
    committer: Committer,
    cache: ExpiringCache<String, SharedView>,
    pipeline: MiddlewarePipeline<InboundEvent, ViewError>,
    registry: Registry,
}

struct Loaded {
    lease: Checkout,
    drift: Option<Drift>,
}

#[derive(Clone)]
pub struct ViewRuntime {
    inner: Arc<RuntimeInner>,
}

impl ViewRuntime {
    pub fn builder() -> ViewRuntimeBuilder {
        ViewRuntimeBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.inner.connector)
    }

    /// Content ids currently held in memory.
    pub fn resident(&self) -> Vec<String> {
        self.inner.cache.keys()
    }

    pub fn is_resident(&self, content_id: &str) -> bool {
        self.inner.cache.has(content_id)
    }

    /// Drop a view from memory. Its persisted record is kept.
    pub fn evict(&self, content_id: &str) -> bool {
        self.inner.cache.delete(content_id)
    }

    /// Render `props` into a new message in `channel_id`.
    #[instrument(skip_all, fields(view = V::TYPE_ID, channel_id = %channel_id))]
    pub async fn send<V: View>(&self, channel_id: &str, props: V) -> Result<MessageHandle, ViewError> {
        self.launch::<V>(ViewInstance::new(props), SendTarget::Channel(channel_id))
            .await
    }

    /// Render `props` as the response to `interaction`.
    #[instrument(skip_all, fields(view = V::TYPE_ID, interaction_id = interaction.id))]
    pub async fn reply<V: View>(&self, interaction: &Interaction, props: V) -> Result<MessageHandle, ViewError> {
        self.launch::<V>(ViewInstance::new(props), SendTarget::Reply(interaction))
            .await
    }

    async fn launch<V: View>(
        &self,
        instance: ViewInstance<V>,
        target: SendTarget<'_>,
    ) -> Result<MessageHandle, ViewError> {
        if !self.inner.registry.has_page(V::TYPE_ID) {
            warn!(
                view = V::TYPE_ID,
                "view type is not registered as a page; it cannot be rehydrated after eviction"
            );
        }
        let mut view: Box<dyn LiveView> = Box::new(instance);
        let handle = self.inner.committer.send(&mut *view, target).await?;
        self.inner
            .cache
            .set(handle.message_id().to_string(), Arc::new(Mutex::new(view)));
        Ok(handle)
    }

    /// Replace the state of the `V` shown in `content_id` and commit it.
    #[instrument(skip_all, fields(view = V::TYPE_ID, content_id = %content_id))]
    pub async fn update<V: View>(&self, content_id: &str, state: V::State) -> Result<(), ViewError> {
        let lease = self
            .checkout(content_id)
            .await?
            .ok_or_else(|| ViewError::not_found(content_id))?;

        let mut view = lease.value().lock().await;
        let found = view.view_type_id();
        let instance = view
            .as_any_mut()
            .downcast_mut::<ViewInstance<V>>()
            .ok_or_else(|| ViewError::TypeMismatch {
                content_id: content_id.to_string(),
                expected: V::TYPE_ID,
                found,
            })?;
        instance.set_state(state);
        self.inner.committer.update(&mut **view, None).await?;
        Ok(())
    }

    /// The view for `content_id`, from memory or rehydrated from the store.
    ///
    /// A rehydrated view whose message drifted is re-committed before it is
    /// returned.
    pub async fn resolve(&self, content_id: &str) -> Result<Option<SharedView>, ViewError> {
        Ok(self
            .checkout(content_id)
            .await?
            .map(|lease| Arc::clone(lease.value())))
    }

    async fn checkout(&self, content_id: &str) -> Result<Option<Checkout>, ViewError> {
        match self.load(content_id).await? {
            None => Ok(None),
            Some(Loaded { lease, drift: None }) => Ok(Some(lease)),
            Some(Loaded {
                lease,
                drift: Some(drift),
            }) => {
                self.repair(content_id, lease.value(), None, &drift).await?;
                Ok(Some(lease))
            }
        }
    }

    /// Route `event` through the interceptors to its target.
    #[instrument(skip_all, fields(event = event.kind(), addressed_to = event.target_name()))]
    pub async fn handle_event(&self, event: InboundEvent) -> Result<Dispatch, ViewError> {
        let started = Instant::now();
        let result = self
            .inner
            .pipeline
            .execute(&event, |event| self.dispatch(event))
            .await;
        histogram!("vellum_dispatch_ms", "event" => event.kind())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let dispatch = result?.unwrap_or(Dispatch::Intercepted);
        counter!(
            "vellum_dispatch_total",
            "event" => event.kind(),
            "outcome" => dispatch.as_str()
        )
        .increment(1);
        Ok(dispatch)
    }

    async fn dispatch(&self, event: &InboundEvent) -> Result<Dispatch, ViewError> {
        match event {
            InboundEvent::Command {
                kind,
                name,
                options,
                target,
                interaction,
            } => {
                let Some(handler) = self.inner.registry.command(*kind, name) else {
                    debug!(kind = kind.as_str(), command = %name, "no command registered, dropping event");
                    return Ok(Dispatch::Dropped);
                };
                handler
                    .handle(CommandContext {
                        runtime: self.clone(),
                        interaction: interaction.clone(),
                        options: options.clone(),
                        target: target.clone(),
                    })
                    .await?;
                Ok(Dispatch::Handled)
            }
            InboundEvent::Component {
                message_id,
                custom_id,
                values,
                interaction,
            } => {
                self.handle_component(message_id, custom_id, values.clone(), interaction)
                    .await
            }
            InboundEvent::ModalSubmit {
                custom_id,
                fields,
                interaction,
            } => {
                let Some(handler) = self.inner.registry.modal(custom_id) else {
                    debug!(custom_id = %custom_id, "no modal registered, dropping event");
                    return Ok(Dispatch::Dropped);
                };
                handler
                    .handle(ModalContext {
                        runtime: self.clone(),
                        interaction: interaction.clone(),
                        custom_id: custom_id.clone(),
                        fields: fields.clone(),
                    })
                    .await?;
                Ok(Dispatch::Handled)
            }
        }
    }

    /// Apply a control interaction to the view behind `content_id`.
    #[instrument(skip_all, fields(content_id = %content_id, control_id = %control_id))]
    pub async fn handle_component(
        &self,
        content_id: &str,
        control_id: &str,
        values: Vec<String>,
        interaction: &Interaction,
    ) -> Result<Dispatch, ViewError> {
        let Some(Loaded { lease, drift }) = self.load(content_id).await? else {
            debug!("no view behind control, dropping event");
            return Ok(Dispatch::Dropped);
        };

        if let Some(drift) = drift {
            self.repair(content_id, lease.value(), Some(interaction), &drift)
                .await?;
            if let Err(err) = self
                .inner
                .connector
                .notify(interaction, &self.inner.config.stale_notice)
                .await
            {
                warn!(error = %err, "failed to send stale view notice");
            }
            return Ok(Dispatch::Refreshed);
        }

        let mut view = lease.value().lock().await;

        let webhook = self.inner.connector.interaction_webhook(interaction);
        let refreshed = view
            .message_mut()
            .is_some_and(|handle| handle.refresh(interaction, webhook));
        if refreshed {
            self.inner.committer.persist(&**view).await?;
            debug!(interaction_id = interaction.id, "interaction token refreshed");
        }

        let followup = view
            .invoke(control_id, values, interaction, self.connector())
            .await?;
        let dispatch = match followup {
            Followup::Idle => Dispatch::Handled,
            Followup::Commit => {
                self.inner
                    .committer
                    .update(&mut **view, Some(interaction))
                    .await?;
                Dispatch::Committed
            }
            Followup::Transition(mut next) => {
                next.adopt(&**view);
                debug!(
                    from = view.view_type_id(),
                    to = next.view_type_id(),
                    "view transition"
                );
                *view = next;
                self.inner
                    .committer
                    .update(&mut **view, Some(interaction))
                    .await?;
                Dispatch::Transitioned
            }
        };
        Ok(dispatch)
    }

    /// Persist every resident view, then empty the cache.
    pub async fn shutdown(&self) -> usize {
        let mut persisted = 0;
        for (content_id, cell) in self.inner.cache.snapshot() {
            let view = cell.lock().await;
            match self.inner.committer.persist(&**view).await {
                Ok(()) => persisted += 1,
                Err(err) => warn!(content_id = %content_id, error = %err, "failed to persist view on shutdown"),
            }
        }
        let evicted = self.inner.cache.clear();
        info!(persisted, evicted, "view runtime shut down");
        persisted
    }

    async fn load(&self, content_id: &str) -> Result<Option<Loaded>, ViewError> {
        if let Some(lease) = self.inner.cache.lease(content_id) {
            return Ok(Some(Loaded { lease, drift: None }));
        }

        let Some(mut view) = self.rehydrate(content_id).await? else {
            return Ok(None);
        };
        let handle = view.message().cloned().ok_or(ViewError::NotSent)?;
        let rendered = view.rearm().await?;
        let live = match self.inner.connector.fetch_message(&handle).await {
            Ok(live) => live,
            Err(ConnectorError::NotFound { .. }) => {
                info!(content_id, "message is gone, discarding its record");
                self.inner.store.delete_state(content_id).await?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let drift = diff(&live, &rendered);

        let cell: SharedView = Arc::new(Mutex::new(view));
        let lease = self
            .inner
            .cache
            .lease_or_insert(content_id.to_string(), Arc::clone(&cell));
        if !Arc::ptr_eq(lease.value(), &cell) {
            // Another task rehydrated the same id first and owns any repair.
            return Ok(Some(Loaded { lease, drift: None }));
        }
        Ok(Some(Loaded { lease, drift }))
    }

    async fn rehydrate(&self, content_id: &str) -> Result<Option<Box<dyn LiveView>>, ViewError> {
        let record = match self.inner.store.get_state(content_id).await {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                debug!(content_id, "no persisted view");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let handle = MessageHandle::from_descriptor(&record.message_descriptor)?;

        let Some(factory) = self.inner.registry.page(&record.view_type_id) else {
            warn!(
                content_id,
                view_type_id = %record.view_type_id,
                "persisted view type is not registered"
            );
            return Ok(None);
        };

        match factory.restore(&record, handle.clone())? {
            Some(view) => {
                counter!("vellum_view_rehydrated_total").increment(1);
                debug!(content_id, view = view.view_type_id(), "view rehydrated");
                Ok(Some(view))
            }
            None => {
                info!(
                    content_id,
                    view_type_id = %record.view_type_id,
                    "discarding view persisted with an obsolete schema"
                );
                counter!("vellum_view_discarded_total").increment(1);
                self.inner.committer.discard(&handle).await?;
                Ok(None)
            }
        }
    }

    async fn repair(
        &self,
        content_id: &str,
        cell: &SharedView,
        interaction: Option<&Interaction>,
        drift: &Drift,
    ) -> Result<(), ViewError> {
        warn!(content_id, drift = %drift, "live message drifted from its persisted view");
        counter!("vellum_view_drift_total").increment(1);
        let mut view = cell.lock().await;
        self.inner.committer.update(&mut **view, interaction).await
    }
}

/// Runs a view's pre-eviction hook when the cache lets go of it.
struct EvictView;

#[async_trait]
impl EvictionHook<String, SharedView> for EvictView {
    async fn on_evict(&self, content_id: String, view: SharedView, cause: EvictionCause) -> Result<(), HookError> {
        let view = view.lock().await;
        debug!(content_id = %content_id, view = view.view_type_id(), cause = %cause, "view left memory");
        view.before_evict().await?;
        Ok(())
    }
}

/// First link of every pipeline.
struct TraceEvents;

#[async_trait]
impl Interceptor<InboundEvent, ViewError> for TraceEvents {
    async fn intercept(
        &self,
        event: &InboundEvent,
        next: Next<'_, '_, InboundEvent, ViewError>,
    ) -> Result<(), ViewError> {
        let interaction = event.interaction();
        debug!(
            event = event.kind(),
            addressed_to = event.target_name(),
            interaction_id = interaction.id,
            user_id = %interaction.user_id,
            "dispatching event"
        );
        let result = next.run().await;
        if let Err(err) = &result {
            warn!(event = event.kind(), error = %err, "event dispatch failed");
        }
        result
    }
}

#[derive(Default)]
pub struct ViewRuntimeBuilder {
    connector: Option<Arc<dyn Connector>>,
    store: Option<Arc<dyn PersistenceStore>>,
    config: RuntimeConfig,
    interceptors: Vec<Arc<dyn Interceptor<InboundEvent, ViewError>>>,
    registrations: Vec<Registration>,
}

impl ViewRuntimeBuilder {
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Append an interceptor. They run in the order they were added.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor<InboundEvent, ViewError>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn register(mut self, registration: Registration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn page<V: View>(self) -> Self {
        self.register(Registration::page::<V>())
    }

    pub fn command(self, kind: CommandKind, name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.register(Registration::command(kind, name, handler))
    }

    pub fn modal(self, custom_id: impl Into<String>, handler: Arc<dyn ModalHandler>) -> Self {
        self.register(Registration::modal(custom_id, handler))
    }

    pub fn build(self) -> Result<ViewRuntime, RuntimeError> {
        let store = match self.store {
            Some(store) => store,
            None if self.config.persistence_required => return Err(RuntimeError::MissingPersistence),
            None => {
                warn!("no persistence store configured, views will not survive eviction or restart");
                Arc::new(MemoryStore::default())
            }
        };
        let connector = self.connector.ok_or(RuntimeError::MissingConnector)?;

        let mut registry = Registry::default();
        for registration in self.registrations {
            registry.insert(registration)?;
        }

        let mut pipeline = MiddlewarePipeline::new();
        pipeline.push(Arc::new(TraceEvents));
        for interceptor in self.interceptors {
            pipeline.push(interceptor);
        }

        let cache = ExpiringCache::with_hook(self.config.cache_ttl, Arc::new(EvictView));
        let committer = Committer::new(Arc::clone(&connector), Arc::clone(&store));

        Ok(ViewRuntime {
            inner: Arc::new(RuntimeInner {
                config: self.config,
                connector,
                store,
                committer,
                cache,
                pipeline,
                registry,
            }),
        })
    }
}
