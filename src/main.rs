use std::{
    process,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use time::OffsetDateTime;
use tracing::{Dispatch as TraceDispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vellum::{
    config::{self, StoreBackend},
    content::MessageContent,
    demo::{self, COUNTER_COMMAND},
    domain::{CommandKind, CommandOption, CommandOptions, InboundEvent, Interaction, OptionValue},
    error::AppError,
    infra::{
        loopback::{ConnectorCall, LoopbackConnector},
        store::{FileStore, MemoryStore},
        telemetry,
    },
    runtime::{PersistenceStore, RuntimeConfig, ViewRuntime},
};

const DEMO_APPLICATION_ID: &str = "vellum-demo";
const DEMO_USER_ID: &str = "demo-user";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = TraceDispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Demo(config::DemoArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Demo(args) => run_demo(settings, args).await,
        config::Command::Inspect(args) => run_inspect(settings, args).await,
    }
}

fn open_store(settings: &config::StoreSettings) -> Result<Arc<dyn PersistenceStore>, AppError> {
    match settings.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::default())),
        StoreBackend::File => {
            let store = FileStore::new(settings.directory.clone())?;
            Ok(Arc::new(store))
        }
    }
}

/// Issues interactions the way the remote service would: ids increase.
struct InteractionSource {
    channel_id: String,
    next_id: AtomicU64,
}

impl InteractionSource {
    fn new(channel_id: &str) -> Self {
        let seed = u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default();
        Self {
            channel_id: channel_id.to_string(),
            next_id: AtomicU64::new(seed << 22),
        }
    }

    fn issue(&self, message_id: Option<&str>) -> Interaction {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Interaction {
            id,
            application_id: DEMO_APPLICATION_ID.to_string(),
            token: format!("token-{id}"),
            channel_id: self.channel_id.clone(),
            user_id: DEMO_USER_ID.to_string(),
            message_id: message_id.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

fn control_id(content: &MessageContent, label: &str) -> Result<String, AppError> {
    content
        .components_flat()
        .find_map(|component| match component {
            vellum::content::Component::Button {
                custom_id: Some(id),
                label: found,
                ..
            } if found == label => Some(id.clone()),
            _ => None,
        })
        .ok_or_else(|| AppError::unexpected(format!("no `{label}` control on the message")))
}

async fn run_demo(settings: config::Settings, args: config::DemoArgs) -> Result<(), AppError> {
    let connector = Arc::new(LoopbackConnector::new());
    let store = open_store(&settings.store)?;
    let runtime = demo::install(
        ViewRuntime::builder()
            .connector(connector.clone())
            .store(store)
            .config(RuntimeConfig::from(&settings.runtime)),
    )
    .build()?;

    let interactions = InteractionSource::new(&args.channel);
    let outcome = runtime
        .handle_event(InboundEvent::Command {
            kind: CommandKind::Chat,
            name: COUNTER_COMMAND.to_string(),
            options: CommandOptions::new(vec![CommandOption::new(
                "title",
                OptionValue::String("Demo counter".to_string()),
            )]),
            target: None,
            interaction: interactions.issue(None),
        })
        .await?;
    info!(target = "vellum::demo", outcome = outcome.as_str(), "counter command");

    let message_id = connector
        .take_calls()
        .into_iter()
        .find_map(|call| match call {
            ConnectorCall::Reply { message_id, .. } => Some(message_id),
            _ => None,
        })
        .ok_or_else(|| AppError::unexpected("counter command produced no reply"))?;

    for _ in 0..args.clicks {
        click(&runtime, &connector, &interactions, &message_id, "+").await?;
    }

    // Force the next click to go through the store.
    runtime.evict(&message_id);
    info!(target = "vellum::demo", content_id = %message_id, "view evicted");
    click(&runtime, &connector, &interactions, &message_id, "Finish").await?;

    let final_message = connector
        .message(&message_id)
        .ok_or_else(|| AppError::unexpected("demo message disappeared"))?;
    let rendered = serde_json::to_string_pretty(&final_message)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{rendered}");

    let persisted = runtime.shutdown().await;
    info!(target = "vellum::demo", persisted, "demo finished");
    Ok(())
}

async fn click(
    runtime: &ViewRuntime,
    connector: &LoopbackConnector,
    interactions: &InteractionSource,
    message_id: &str,
    label: &str,
) -> Result<(), AppError> {
    let content = connector
        .message(message_id)
        .ok_or_else(|| AppError::unexpected(format!("message {message_id} is missing")))?;
    let custom_id = control_id(&content, label)?;
    let outcome = runtime
        .handle_event(InboundEvent::Component {
            message_id: message_id.to_string(),
            custom_id,
            values: Vec::new(),
            interaction: interactions.issue(Some(message_id)),
        })
        .await?;
    info!(target = "vellum::demo", control = label, outcome = outcome.as_str(), "click");
    Ok(())
}

async fn run_inspect(settings: config::Settings, args: config::InspectArgs) -> Result<(), AppError> {
    if settings.store.backend != StoreBackend::File {
        return Err(AppError::validation(
            "inspect reads the file backend; set store.backend = \"file\"",
        ));
    }
    let store = FileStore::new(settings.store.directory.clone())?;

    match args.content_id {
        Some(content_id) => {
            let record = store.get_state(&content_id).await?;
            let rendered = serde_json::to_string_pretty(&record)
                .map_err(|err| AppError::unexpected(err.to_string()))?;
            println!("{rendered}");
        }
        None => {
            let ids = store.content_ids().await?;
            info!(target = "vellum::inspect", count = ids.len(), root = %store.root().display(), "listing records");
            for content_id in ids {
                let record = store.get_state(&content_id).await?;
                println!("{content_id}\t{}", record.view_type_id);
            }
        }
    }
    Ok(())
}
