use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::parse_base_url;
use crate::args::{OutputFormat, PositiveUsize, RunArgs, StoreArgs};
use crate::error::{AppError, AppResult, ConfigError};

use super::types::{ConfigFile, DurationValue};

/// Applies configuration values to `run` arguments. Values given explicitly
/// on the command line win.
///
/// # Errors
///
/// Returns an error when a config value is out of range or malformed.
pub fn apply_run_config(
    args: &mut RunArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "suites")
        && let Some(suites) = config.suites.as_ref()
    {
        args.suites.clone_from(suites);
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    if !is_cli(matches, "base_url")
        && let Some(base_url) = config.base_url.as_deref()
    {
        args.base_url = parse_base_url(base_url)
            .map_err(|err| AppError::config(ConfigError::InvalidBaseUrl { source: err }))?;
    }

    if !is_cli(matches, "manifest_dir")
        && let Some(dir) = config.manifest_dir.as_ref()
    {
        args.manifest_dir.clone_from(dir);
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = Some(to_duration(timeout, "timeout")?);
    }

    if !is_cli(matches, "submit_pause")
        && let Some(pause) = config.submit_pause.as_ref()
    {
        args.submit_pause = to_duration(pause, "submit_pause")?;
    }

    if let Some(schemas) = config.schemas.as_ref() {
        args.schemas = schemas.clone();
    }

    apply_store_config(&mut args.store, &mut args.output, matches, config);
    Ok(())
}

/// Applies the `[store]` section and `output` key shared by `run` and `rows`.
pub fn apply_store_config(
    store: &mut StoreArgs,
    output: &mut OutputFormat,
    matches: &ArgMatches,
    config: &ConfigFile,
) {
    if !is_cli(matches, "output")
        && let Some(format) = config.output
    {
        *output = format;
    }

    let Some(section) = config.store.as_ref() else {
        return;
    };
    if !is_cli(matches, "store")
        && let Some(kind) = section.kind
    {
        store.store = kind;
    }
    if !is_cli(matches, "store_path")
        && let Some(path) = section.path.as_ref()
    {
        store.store_path = Some(path.clone());
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_usize(value: usize, field: &'static str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive { field, source: err })
    })
}

fn to_duration(value: &DurationValue, field: &'static str) -> AppResult<std::time::Duration> {
    value
        .to_duration()
        .map_err(|err| AppError::config(ConfigError::InvalidDuration { field, source: err }))
}
