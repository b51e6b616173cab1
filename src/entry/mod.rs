use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::info;

use crate::args::{
    ApimonArgs, Command, DEFAULT_BASE_URL, DEFAULT_MANIFEST_DIR, ListArgs, RowsArgs, RunArgs,
    StoreArgs, StoreKind,
};
use crate::batch::BatchRunner;
use crate::config::types::ConfigFile;
use crate::config::{apply_run_config, apply_store_config, load_config};
use crate::error::{AppError, AppResult, ValidationError};
use crate::http::{BearerToken, ReqwestDispatcher, build_client};
use crate::scenarios::{CatalogContext, Monitor, Suite, suite_scenarios};
use crate::store::{CsvStore, Recorder, ResultStore, SqliteStore};
use crate::system::summary_output::{catalog_lines, failure_lines, row_lines};

/// Parses the process arguments and runs the selected command to completion.
///
/// # Errors
///
/// Returns an error when arguments or config are invalid, the results store
/// cannot be opened, or any scenario failed.
pub fn run() -> AppResult<()> {
    let matches = ApimonArgs::command().get_matches();
    let args = ApimonArgs::from_arg_matches(&matches)?;

    crate::system::logger::init_logging(args.verbose, args.no_color);

    let config = load_config(args.config.as_deref())?.unwrap_or_default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches, &config))
}

async fn run_async(args: ApimonArgs, matches: &ArgMatches, config: &ConfigFile) -> AppResult<()> {
    let sub_matches = matches.subcommand().map_or(matches, |(_, sub)| sub);
    match args.command {
        Command::Run(mut run) => {
            apply_run_config(&mut run, sub_matches, config)?;
            run_monitor(&run).await
        }
        Command::List(list) => list_catalog(&list, config),
        Command::Rows(mut rows) => {
            apply_store_config(&mut rows.store, &mut rows.output, sub_matches, config);
            print_rows(&rows).await
        }
    }
}

async fn run_monitor(args: &RunArgs) -> AppResult<()> {
    let token = BearerToken::from_env()?;
    let client = build_client(args.timeout)?;
    let store = open_store(&args.store).await?;
    let monitor = Monitor::new(
        BatchRunner::new(Arc::new(ReqwestDispatcher::new(client))),
        Recorder::new(store),
        args.concurrency,
    );

    let ctx = CatalogContext {
        base_url: args.base_url.clone(),
        manifest_dir: args.manifest_dir.clone(),
        schemas: args.schemas.clone(),
        token,
        submit_pause: args.submit_pause,
    };
    let plan: Vec<_> = args
        .selected_suites()
        .into_iter()
        .map(|suite| (suite, suite_scenarios(suite, &ctx)))
        .collect();
    info!(
        base_url = %args.base_url,
        concurrency = args.concurrency.get(),
        store = args.store.store.as_str(),
        suites = plan.len(),
        "Starting monitoring run"
    );

    let reports = monitor.run_suites(plan).await?;
    for report in &reports {
        for line in row_lines(&report.rows, args.output)? {
            println!("{}", line);
        }
    }

    let failures = failure_lines(&reports);
    for line in &failures {
        eprintln!("{}", line);
    }
    if !failures.is_empty() {
        return Err(AppError::validation(ValidationError::ScenariosFailed {
            failed: failures.len(),
        }));
    }
    Ok(())
}

fn list_catalog(args: &ListArgs, config: &ConfigFile) -> AppResult<()> {
    let ctx = CatalogContext {
        base_url: config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        manifest_dir: config
            .manifest_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_DIR)),
        schemas: config.schemas.clone().unwrap_or_default(),
        token: None,
        submit_pause: std::time::Duration::ZERO,
    };
    let scenarios: Vec<_> = Suite::ALL
        .into_iter()
        .flat_map(|suite| suite_scenarios(suite, &ctx))
        .collect();
    for line in catalog_lines(&scenarios, args.output)? {
        println!("{}", line);
    }
    Ok(())
}

async fn print_rows(args: &RowsArgs) -> AppResult<()> {
    let store = open_store(&args.store).await?;
    let rows = store.rows().await?;
    for line in row_lines(&rows, args.output)? {
        println!("{}", line);
    }
    Ok(())
}

async fn open_store(args: &StoreArgs) -> AppResult<Arc<dyn ResultStore>> {
    let path = args.resolved_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    info!(store = args.store.as_str(), path = %path.display(), "Opening results store");
    let store: Arc<dyn ResultStore> = match args.store {
        StoreKind::Sqlite => Arc::new(SqliteStore::open(&path).await?),
        StoreKind::Csv => Arc::new(CsvStore::new(path)),
    };
    Ok(store)
}
