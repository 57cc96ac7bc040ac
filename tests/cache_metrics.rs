mod common;

use std::collections::HashSet;

use common::{CHANNEL, Harness};
use metrics_util::debugging::DebuggingRecorder;
use serial_test::serial;
use vellum::content::MessageContent;
use vellum::demo::Counter;
use vellum::infra::telemetry;
use vellum::runtime::PersistenceStore;

#[tokio::test]
#[serial]
async fn runtime_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let harness = Harness::new();

    // Resident hit plus dispatch timing.
    let kept = harness
        .runtime
        .send(CHANNEL, Counter::new("Kept"))
        .await
        .unwrap();
    harness.click(kept.message_id(), "+").await.unwrap();

    // Miss, eviction and rehydration.
    harness.runtime.evict(kept.message_id());
    harness.click(kept.message_id(), "+").await.unwrap();

    // Drift repair.
    let drifted = harness
        .runtime
        .send(CHANNEL, Counter::new("Drifted"))
        .await
        .unwrap();
    let plus = harness.control(drifted.message_id(), "+");
    harness.runtime.evict(drifted.message_id());
    harness
        .connector
        .set_remote(drifted.message_id(), MessageContent::text("edited"));
    harness
        .runtime
        .handle_event(harness.component_event(drifted.message_id(), plus, Vec::new()))
        .await
        .unwrap();

    // Obsolete schema.
    let obsolete = harness
        .runtime
        .send(CHANNEL, Counter::new("Obsolete"))
        .await
        .unwrap();
    let plus = harness.control(obsolete.message_id(), "+");
    let mut record = harness.store.get_state(obsolete.message_id()).await.unwrap();
    record.serialized_state = record
        .serialized_state
        .replacen("\"version\":1", "\"version\":0", 1);
    harness
        .store
        .store_state(obsolete.message_id(), record)
        .await
        .unwrap();
    harness.runtime.evict(obsolete.message_id());
    harness
        .runtime
        .handle_event(harness.component_event(obsolete.message_id(), plus, Vec::new()))
        .await
        .unwrap();

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "vellum_cache_hit_total",
        "vellum_cache_miss_total",
        "vellum_cache_evict_total",
        "vellum_view_rehydrated_total",
        "vellum_view_drift_total",
        "vellum_view_discarded_total",
        "vellum_dispatch_total",
        "vellum_dispatch_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
