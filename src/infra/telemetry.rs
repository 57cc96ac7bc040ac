use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "vellum_cache_hit_total",
            Unit::Count,
            "Total number of resident view lookups that found the view."
        );
        describe_counter!(
            "vellum_cache_miss_total",
            Unit::Count,
            "Total number of resident view lookups that missed."
        );
        describe_counter!(
            "vellum_cache_evict_total",
            Unit::Count,
            "Total number of views that left memory, labelled by cause."
        );
        describe_counter!(
            "vellum_view_rehydrated_total",
            Unit::Count,
            "Total number of views rebuilt from the persistence store."
        );
        describe_counter!(
            "vellum_view_drift_total",
            Unit::Count,
            "Total number of rehydrated views whose live message had drifted."
        );
        describe_counter!(
            "vellum_view_discarded_total",
            Unit::Count,
            "Total number of persisted views discarded for an obsolete schema."
        );
        describe_counter!(
            "vellum_dispatch_total",
            Unit::Count,
            "Total number of inbound events dispatched, labelled by outcome."
        );
        describe_histogram!(
            "vellum_dispatch_ms",
            Unit::Milliseconds,
            "Inbound event dispatch latency in milliseconds."
        );
    });
}
