//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::runtime::{DEFAULT_CACHE_TTL, DEFAULT_STALE_NOTICE};

mod cli;

pub use cli::{CliArgs, Command, DemoArgs, InspectArgs, RuntimeOverrides, StoreOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vellum";
const ENV_PREFIX: &str = "VELLUM";
const DEFAULT_STORE_DIR: &str = "data/views";
const MIN_CACHE_TTL_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub runtime: RuntimeSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub cache_ttl: Duration,
    pub persistence_required: bool,
    pub stale_notice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            other => Err(format!("unknown backend `{other}`, expected memory or file")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub directory: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Demo(args)) => raw.apply_runtime_overrides(&args.overrides),
        Some(Command::Inspect(args)) => raw.apply_store_overrides(&args.store),
        None => {}
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    runtime: RawRuntimeSettings,
    store: RawStoreSettings,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(ttl) = overrides.cache_ttl_ms {
            self.runtime.cache_ttl_ms = Some(ttl);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_store_overrides(&overrides.store);
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(backend) = overrides.store_backend.as_ref() {
            self.store.backend = Some(backend.clone());
        }
        if let Some(directory) = overrides.store_directory.as_ref() {
            self.store.directory = Some(directory.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            runtime,
            store,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let runtime = build_runtime_settings(runtime)?;
        let store = build_store_settings(store)?;

        Ok(Self {
            logging,
            runtime,
            store,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_runtime_settings(runtime: RawRuntimeSettings) -> Result<RuntimeSettings, LoadError> {
    let cache_ttl = match runtime.cache_ttl_ms {
        Some(ms) if ms < MIN_CACHE_TTL_MS => {
            return Err(LoadError::invalid(
                "runtime.cache_ttl_ms",
                format!("must be at least {MIN_CACHE_TTL_MS}"),
            ));
        }
        Some(ms) => Duration::from_millis(ms),
        None => DEFAULT_CACHE_TTL,
    };

    let stale_notice = match runtime.stale_notice {
        Some(notice) if notice.trim().is_empty() => {
            return Err(LoadError::invalid(
                "runtime.stale_notice",
                "must not be empty",
            ));
        }
        Some(notice) => notice.trim().to_string(),
        None => DEFAULT_STALE_NOTICE.to_string(),
    };

    Ok(RuntimeSettings {
        cache_ttl,
        persistence_required: runtime.persistence_required.unwrap_or(true),
        stale_notice,
    })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let backend = match store.backend {
        Some(value) => StoreBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("store.backend", reason))?,
        None => StoreBackend::File,
    };

    let directory = store
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "store.directory",
            "path must not be empty",
        ));
    }

    Ok(StoreSettings { backend, directory })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRuntimeSettings {
    cache_ttl_ms: Option<u64>,
    persistence_required: Option<bool>,
    stale_notice: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests;
