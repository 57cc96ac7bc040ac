use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the vellum binary.
#[derive(Debug, Parser)]
#[command(name = "vellum", version, about = "Durable interactive view runtime")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VELLUM_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive a scripted session against the in-process connector.
    Demo(DemoArgs),
    /// Print persisted view records.
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    /// Channel the demo view is sent to.
    #[arg(long, default_value = "demo")]
    pub channel: String,

    /// Number of simulated clicks on the increment control.
    #[arg(long, default_value_t = 3)]
    pub clicks: u32,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            overrides: RuntimeOverrides::default(),
            channel: "demo".to_string(),
            clicks: 3,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Override the idle time, in milliseconds, before a view leaves memory.
    #[arg(long = "cache-ttl-ms", value_name = "MILLIS")]
    pub cache_ttl_ms: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the persistence backend (memory|file).
    #[arg(long = "store-backend", value_name = "BACKEND")]
    pub store_backend: Option<String>,

    /// Override the directory used by the file backend.
    #[arg(long = "store-directory", value_name = "PATH")]
    pub store_directory: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Content id to print; every record is listed when omitted.
    #[arg(value_name = "CONTENT_ID")]
    pub content_id: Option<String>,
}
