use std::time::Duration;

use crate::config::RuntimeSettings;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_STALE_NOTICE: &str = "This view was out of date and has been refreshed.";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Idle time after which a view leaves memory.
    pub cache_ttl: Duration,
    /// Refuse to build without a persistence store.
    pub persistence_required: bool,
    /// Sent to the user whose interaction hit a drifted view.
    pub stale_notice: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            persistence_required: true,
            stale_notice: DEFAULT_STALE_NOTICE.to_string(),
        }
    }
}

impl From<&RuntimeSettings> for RuntimeConfig {
    fn from(settings: &RuntimeSettings) -> Self {
        Self {
            cache_ttl: settings.cache_ttl,
            persistence_required: settings.persistence_required,
            stale_notice: settings.stale_notice.clone(),
        }
    }
}
