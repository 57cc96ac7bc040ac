mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{CHANNEL, Harness};
use vellum::demo::{COUNTER_COMMAND, Counter};
use vellum::domain::{CommandKind, CommandOptions, InboundEvent};
use vellum::infra::loopback::LoopbackConnector;
use vellum::pipeline::{Interceptor, Next};
use vellum::runtime::{
    Dispatch, ModalContext, ModalHandler, RegistrationKind, RuntimeConfig, RuntimeError,
    ViewRuntime,
};
use vellum::view::ViewError;

/// Records the order in which it was entered and left.
struct Journal {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Interceptor<InboundEvent, ViewError> for Journal {
    async fn intercept(
        &self,
        _event: &InboundEvent,
        next: Next<'_, '_, InboundEvent, ViewError>,
    ) -> Result<(), ViewError> {
        self.log.lock().unwrap().push(format!("{}:before", self.name));
        let result = next.run().await;
        self.log.lock().unwrap().push(format!("{}:after", self.name));
        result
    }
}

/// Swallows events from one user.
struct Denylist {
    user_id: &'static str,
}

#[async_trait]
impl Interceptor<InboundEvent, ViewError> for Denylist {
    async fn intercept(
        &self,
        event: &InboundEvent,
        next: Next<'_, '_, InboundEvent, ViewError>,
    ) -> Result<(), ViewError> {
        if event.interaction().user_id == self.user_id {
            return Ok(());
        }
        next.run().await
    }
}

struct Reject;

#[async_trait]
impl Interceptor<InboundEvent, ViewError> for Reject {
    async fn intercept(
        &self,
        _event: &InboundEvent,
        _next: Next<'_, '_, InboundEvent, ViewError>,
    ) -> Result<(), ViewError> {
        Err(ViewError::handler("rejected by policy"))
    }
}

struct RunTwice;

#[async_trait]
impl Interceptor<InboundEvent, ViewError> for RunTwice {
    async fn intercept(
        &self,
        _event: &InboundEvent,
        next: Next<'_, '_, InboundEvent, ViewError>,
    ) -> Result<(), ViewError> {
        next.run().await?;
        next.run().await
    }
}

struct Feedback {
    received: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ModalHandler for Feedback {
    async fn handle(&self, ctx: ModalContext) -> Result<(), ViewError> {
        let text = ctx.field("text").unwrap_or_default().to_string();
        self.received.lock().unwrap().push(text);
        Ok(())
    }
}

fn command_event(harness: &Harness) -> InboundEvent {
    InboundEvent::Command {
        kind: CommandKind::Chat,
        name: COUNTER_COMMAND.into(),
        options: CommandOptions::default(),
        target: None,
        interaction: harness.interaction(None),
    }
}

#[tokio::test]
async fn interceptors_wrap_dispatch_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(|builder| {
        builder
            .interceptor(Arc::new(Journal {
                name: "outer",
                log: log.clone(),
            }))
            .interceptor(Arc::new(Journal {
                name: "inner",
                log: log.clone(),
            }))
    });

    let dispatch = harness.runtime.handle_event(command_event(&harness)).await.unwrap();

    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(
        *log.lock().unwrap(),
        ["outer:before", "inner:before", "inner:after", "outer:after"]
    );
    assert_eq!(harness.connector.message_count(), 1);
}

#[tokio::test]
async fn short_circuited_events_never_reach_their_target() {
    let harness = Harness::with(|builder| builder.interceptor(Arc::new(Denylist { user_id: "user-1" })));

    let dispatch = harness.runtime.handle_event(command_event(&harness)).await.unwrap();

    assert_eq!(dispatch, Dispatch::Intercepted);
    assert_eq!(harness.connector.message_count(), 0);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn interceptor_errors_abort_dispatch() {
    let harness = Harness::with(|builder| builder.interceptor(Arc::new(Reject)));

    let err = harness
        .runtime
        .handle_event(command_event(&harness))
        .await
        .expect_err("interceptor rejects");

    assert_eq!(err.to_string(), "handler failed: rejected by policy");
    assert_eq!(harness.connector.message_count(), 0);
}

#[tokio::test]
async fn running_a_continuation_twice_is_an_error() {
    let harness = Harness::with(|builder| builder.interceptor(Arc::new(RunTwice)));

    let err = harness
        .runtime
        .handle_event(command_event(&harness))
        .await
        .expect_err("continuation reuse is rejected");

    assert!(matches!(err, ViewError::Pipeline(_)));
    assert!(err.is_usage());
    assert_eq!(harness.connector.message_count(), 1);
}

#[tokio::test]
async fn modal_submissions_reach_their_handler() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let harness = Harness::with(|builder| {
        builder.modal(
            "feedback",
            Arc::new(Feedback {
                received: received.clone(),
            }),
        )
    });

    let dispatch = harness
        .runtime
        .handle_event(InboundEvent::ModalSubmit {
            custom_id: "feedback".into(),
            fields: vec![("text".into(), "more buttons".into())],
            interaction: harness.interaction(None),
        })
        .await
        .unwrap();
    assert_eq!(dispatch, Dispatch::Handled);
    assert_eq!(*received.lock().unwrap(), ["more buttons"]);

    let dispatch = harness
        .runtime
        .handle_event(InboundEvent::ModalSubmit {
            custom_id: "survey".into(),
            fields: Vec::new(),
            interaction: harness.interaction(None),
        })
        .await
        .unwrap();
    assert_eq!(dispatch, Dispatch::Dropped);
}

#[tokio::test]
async fn unknown_commands_are_dropped() {
    let harness = Harness::new();
    let dispatch = harness
        .runtime
        .handle_event(InboundEvent::Command {
            kind: CommandKind::User,
            name: COUNTER_COMMAND.into(),
            options: CommandOptions::default(),
            target: Some("user-9".into()),
            interaction: harness.interaction(None),
        })
        .await
        .unwrap();
    assert_eq!(dispatch, Dispatch::Dropped);
}

#[test]
fn duplicate_registrations_are_rejected() {
    let err = vellum::demo::install(
        ViewRuntime::builder().connector(Arc::new(LoopbackConnector::new())),
    )
    .page::<Counter>()
    .config(RuntimeConfig {
        persistence_required: false,
        ..RuntimeConfig::default()
    })
    .build()
    .err()
    .expect("counter page is registered twice");

    assert_eq!(
        err,
        RuntimeError::DuplicateRegistration {
            kind: RegistrationKind::Page,
            name: "demo.counter".into(),
        }
    );
}

#[test]
fn builder_requires_its_collaborators() {
    let err = ViewRuntime::builder()
        .connector(Arc::new(LoopbackConnector::new()))
        .build()
        .err()
        .expect("persistence is required by default");
    assert_eq!(err, RuntimeError::MissingPersistence);

    let err = ViewRuntime::builder()
        .config(RuntimeConfig {
            persistence_required: false,
            ..RuntimeConfig::default()
        })
        .build()
        .err()
        .expect("connector is always required");
    assert_eq!(err, RuntimeError::MissingConnector);
}

#[tokio::test]
async fn optional_persistence_falls_back_to_memory() {
    let runtime = vellum::demo::install(
        ViewRuntime::builder()
            .connector(Arc::new(LoopbackConnector::new()))
            .config(RuntimeConfig {
                persistence_required: false,
                ..RuntimeConfig::default()
            }),
    )
    .build()
    .expect("memory store is used");

    let handle = runtime.send(CHANNEL, Counter::new("Votes")).await.unwrap();
    runtime.evict(handle.message_id());
    assert!(runtime.resolve(handle.message_id()).await.unwrap().is_some());
}
