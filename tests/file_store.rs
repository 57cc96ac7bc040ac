use std::sync::Arc;

use tempfile::tempdir;
use time::OffsetDateTime;
use vellum::demo::{self, Counter};
use vellum::domain::{InboundEvent, Interaction};
use vellum::infra::error::InfraError;
use vellum::infra::loopback::LoopbackConnector;
use vellum::infra::store::FileStore;
use vellum::runtime::{Dispatch, PersistedRecord, PersistenceStore, StoreError, ViewRuntime};

fn runtime(connector: &Arc<LoopbackConnector>, store: FileStore) -> ViewRuntime {
    demo::install(
        ViewRuntime::builder()
            .connector(connector.clone())
            .store(Arc::new(store)),
    )
    .build()
    .expect("runtime should build")
}

fn plus_event(connector: &LoopbackConnector, message_id: &str, id: u64) -> InboundEvent {
    let content = connector.message(message_id).expect("message exists");
    let custom_id = content
        .components_flat()
        .nth(1)
        .and_then(|component| component.custom_id())
        .expect("plus button")
        .to_string();
    InboundEvent::Component {
        message_id: message_id.to_string(),
        custom_id,
        values: Vec::new(),
        interaction: Interaction {
            id,
            application_id: "app".into(),
            token: format!("token-{id}"),
            channel_id: "general".into(),
            user_id: "user-1".into(),
            message_id: Some(message_id.to_string()),
            created_at: OffsetDateTime::now_utc(),
        },
    }
}

#[tokio::test]
async fn views_survive_a_runtime_restart() {
    let dir = tempdir().expect("temp dir");
    let connector = Arc::new(LoopbackConnector::new());

    let first = runtime(&connector, FileStore::new(dir.path().to_path_buf()).unwrap());
    let handle = first.send("general", Counter::new("Votes")).await.unwrap();
    let id = handle.message_id().to_string();
    first
        .handle_event(plus_event(&connector, &id, 10))
        .await
        .unwrap();
    first.shutdown().await;
    drop(first);

    let store = FileStore::new(dir.path().to_path_buf()).unwrap();
    assert_eq!(store.content_ids().await.unwrap(), vec![id.clone()]);

    let second = runtime(&connector, store);
    assert!(!second.is_resident(&id));
    let dispatch = second
        .handle_event(plus_event(&connector, &id, 11))
        .await
        .unwrap();
    assert_eq!(dispatch, Dispatch::Committed);

    let live = connector.message(&id).unwrap();
    assert_eq!(live.embeds[0].description.as_deref(), Some("2"));
}

#[tokio::test]
async fn file_store_rejects_unsafe_keys_and_reports_corruption() {
    let dir = tempdir().expect("temp dir");
    let store = FileStore::new(dir.path().join("views")).unwrap();
    let record = PersistedRecord {
        view_type_id: "demo.counter".into(),
        serialized_state: "{}".into(),
        message_descriptor: "{}".into(),
    };

    assert!(matches!(
        store.store_state("../escape", record.clone()).await,
        Err(StoreError::InvalidKey { .. })
    ));
    assert!(matches!(
        store.get_state("absent").await,
        Err(StoreError::NotFound { .. })
    ));

    store.store_state("good", record.clone()).await.unwrap();
    assert_eq!(store.get_state("good").await.unwrap(), record);

    std::fs::write(store.root().join("bad.json"), b"not json").unwrap();
    assert!(matches!(
        store.get_state("bad").await,
        Err(StoreError::Corrupt { .. })
    ));
    assert_eq!(store.content_ids().await.unwrap(), ["bad", "good"]);

    store.delete_state("good").await.unwrap();
    store.delete_state("good").await.unwrap();
    assert_eq!(store.content_ids().await.unwrap(), ["bad"]);
}

#[tokio::test]
async fn overwrites_leave_no_staging_files_behind() {
    let dir = tempdir().expect("temp dir");
    let store = FileStore::new(dir.path().to_path_buf()).unwrap();
    let record = |state: &str| PersistedRecord {
        view_type_id: "demo.counter".into(),
        serialized_state: state.into(),
        message_descriptor: "{}".into(),
    };

    for state in ["one", "two", "three"] {
        store.store_state("42", record(state)).await.unwrap();
    }
    assert_eq!(store.get_state("42").await.unwrap(), record("three"));

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["42.json"]);
}

#[test]
fn opening_a_store_under_a_file_fails() {
    let dir = tempdir().expect("temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").unwrap();

    let err = FileStore::new(blocker.join("views")).unwrap_err();
    assert!(matches!(err, InfraError::StoreDirectory { .. }));
    assert!(err.to_string().contains("blocker"));
}
