use serde_json::json;

use crate::args::OutputFormat;
use crate::batch::StatusBucket;
use crate::error::AppResult;
use crate::http::CallKind;
use crate::scenarios::{Scenario, SuiteReport};
use crate::store::ResultRow;

/// One line per row: human readable for `text`, a JSON object for `json`.
///
/// # Errors
///
/// Returns an error when a row cannot be serialized.
pub(crate) fn row_lines(rows: &[ResultRow], format: OutputFormat) -> AppResult<Vec<String>> {
    match format {
        OutputFormat::Text => Ok(rows.iter().map(row_text).collect()),
        OutputFormat::Json => rows
            .iter()
            .map(|row| serde_json::to_string(row).map_err(Into::into))
            .collect(),
    }
}

fn row_text(row: &ResultRow) -> String {
    let counts = StatusBucket::ALL
        .iter()
        .map(|bucket| format!("{}={}", bucket.label(), row.histogram.count(*bucket)))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} concurrency={} latency={}s {} | {}",
        row.display_start_time(),
        row.metadata.endpoint,
        row.concurrency,
        row.latency,
        counts,
        row.metadata.description
    )
}

/// Catalog listing used by `apimon list`.
///
/// # Errors
///
/// Returns an error when an entry cannot be serialized.
pub(crate) fn catalog_lines(
    scenarios: &[Scenario],
    format: OutputFormat,
) -> AppResult<Vec<String>> {
    let mut lines = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let method = match scenario.spec.kind() {
            CallKind::Get => "GET",
            CallKind::PostManifest { .. } => "POST",
        };
        match format {
            OutputFormat::Text => lines.push(format!(
                "{:<9} {:<32} {:<4} {:<26} {:<5} {}",
                scenario.suite.as_str(),
                scenario.name,
                method,
                scenario.metadata.endpoint,
                if scenario.authenticated { "auth" } else { "-" },
                scenario.metadata.description
            )),
            OutputFormat::Json => lines.push(serde_json::to_string(&json!({
                "suite": scenario.suite,
                "name": scenario.name,
                "method": method,
                "url": scenario.spec.url(),
                "authenticated": scenario.authenticated,
                "metadata": scenario.metadata,
            }))?),
        }
    }
    Ok(lines)
}

/// Lines naming each failed scenario; empty when every scenario recorded.
pub(crate) fn failure_lines(reports: &[SuiteReport]) -> Vec<String> {
    reports
        .iter()
        .flat_map(|report| report.failures.iter())
        .map(|failure| {
            format!(
                "FAILED {}/{}: {}",
                failure.suite.as_str(),
                failure.scenario,
                failure.error
            )
        })
        .collect()
}
