use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::scenarios::{SchemaUrls, Suite};

use super::defaults::{DEFAULT_BASE_URL, DEFAULT_MANIFEST_DIR, DEFAULT_SUBMIT_PAUSE};
use super::parsers::{parse_base_url, parse_bool_env, parse_duration_arg, parse_positive_usize};
use super::types::{OutputFormat, PositiveUsize, StoreKind};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Latency and availability monitor for the schematic manifest API: fires batches of concurrent calls per scenario and records duration and status counts."
)]
pub struct ApimonArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (sets log level to debug unless overridden by APIMON_LOG/RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env, global = true)]
    pub no_color: bool,

    /// Path to config file (TOML/JSON). Defaults to ./apimon.toml or ./apimon.json if present.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run monitoring suites and record one row per scenario
    Run(RunArgs),
    /// Print the scenario catalog
    List(ListArgs),
    /// Print rows already recorded in the results store
    Rows(RowsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Results store backend
    #[arg(long = "store", value_enum, default_value_t = StoreKind::Sqlite)]
    pub store: StoreKind,

    /// Results file (defaults to latency.db for sqlite, latency.csv for csv)
    #[arg(long = "store-path")]
    pub store_path: Option<PathBuf>,
}

impl StoreArgs {
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| super::defaults::default_store_path(self.store))
    }
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Suite to run (repeatable; all suites when omitted)
    #[arg(long = "suite", value_enum)]
    pub suites: Vec<Suite>,

    /// Concurrent calls per batch
    #[arg(long, short = 'c', default_value = "1", value_parser = parse_positive_usize)]
    pub concurrency: PositiveUsize,

    /// Base URL of the API (endpoint paths are appended)
    #[arg(long = "base-url", default_value = DEFAULT_BASE_URL, value_parser = parse_base_url)]
    pub base_url: String,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Directory holding the manifests uploaded by validate/submit scenarios
    #[arg(long = "manifest-dir", default_value = DEFAULT_MANIFEST_DIR)]
    pub manifest_dir: PathBuf,

    /// Per-request timeout (supports ms/s/m/h); no timeout when omitted
    #[arg(long, value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// Pause after each submit scenario (supports ms/s/m/h)
    #[arg(long = "submit-pause", default_value = DEFAULT_SUBMIT_PAUSE, value_parser = parse_duration_arg)]
    pub submit_pause: Duration,

    /// Output format for recorded rows
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Data model URLs; only settable from the config file
    #[arg(skip)]
    pub schemas: SchemaUrls,
}

impl RunArgs {
    /// Selected suites in catalog order without duplicates; every suite when
    /// none were selected.
    #[must_use]
    pub fn selected_suites(&self) -> Vec<Suite> {
        if self.suites.is_empty() {
            return Suite::ALL.to_vec();
        }
        Suite::ALL
            .into_iter()
            .filter(|suite| self.suites.contains(suite))
            .collect()
    }
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct RowsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}
