use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::batch::{Latency, StatusBucket, StatusHistogram};
use crate::error::{AppError, AppResult, StoreError};
use crate::http::flag_text;

use super::{ResultRow, ResultStore, ScenarioMetadata};

/// Results table kept as a CSV file, one line per measurement.
///
/// The header is written only when the file is new or empty, so the file can
/// be opened in a spreadsheet at any point.
pub struct CsvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Endpoint")]
    endpoint: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Test start time")]
    started_at: String,
    #[serde(rename = "Number of concurrent request")]
    concurrency: u64,
    #[serde(rename = "Latency")]
    latency: String,
    #[serde(rename = "200")]
    ok: u64,
    #[serde(rename = "500")]
    internal_server_error: u64,
    #[serde(rename = "503")]
    service_unavailable: u64,
    #[serde(rename = "504")]
    gateway_timeout: u64,
    #[serde(rename = "other")]
    other: u64,
    #[serde(rename = "Data schema")]
    data_schema: Option<String>,
    #[serde(rename = "Number of rows")]
    num_rows: Option<u64>,
    #[serde(rename = "Data type")]
    data_type: Option<String>,
    #[serde(rename = "Output format")]
    output_format: Option<String>,
    #[serde(rename = "Restrict rules")]
    restrict_rules: Option<String>,
    #[serde(rename = "Manifest record type")]
    manifest_record_type: Option<String>,
    #[serde(rename = "Asset view")]
    asset_view: Option<String>,
}

impl CsvStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn needs_header(&self) -> AppResult<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() == 0),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(unavailable("inspect csv results file", err)),
        }
    }

    /// Read-path filesystem failure; writes surface as `Unavailable`.
    fn file_error(&self, source: io::Error) -> AppError {
        AppError::store(StoreError::File {
            path: self.path.clone(),
            source,
        })
    }

    fn malformed(&self, line: usize, reason: String) -> AppError {
        AppError::store(StoreError::MalformedRow {
            path: self.path.clone(),
            line,
            reason,
        })
    }
}

#[async_trait]
impl ResultStore for CsvStore {
    async fn append(&self, row: &ResultRow) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let write_header = self.needs_header().await?;
        let line = encode_line(&CsvRecord::from(row), write_header)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| unavailable("open csv results file", err))?;
        file.write_all(&line)
            .await
            .map_err(|err| unavailable("append csv result row", err))?;
        file.flush()
            .await
            .map_err(|err| unavailable("flush csv results file", err))?;
        Ok(())
    }

    async fn rows(&self) -> AppResult<Vec<ResultRow>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.file_error(err)),
        };

        let mut reader = csv::ReaderBuilder::new().from_reader(bytes.as_slice());
        let mut rows = Vec::new();
        for record in reader.deserialize::<CsvRecord>() {
            let record = record.map_err(|err| {
                let line = err
                    .position()
                    .and_then(|pos| usize::try_from(pos.line()).ok())
                    .unwrap_or(0);
                self.malformed(line, err.to_string())
            })?;
            let line = rows.len().saturating_add(2);
            let row = record
                .into_result_row()
                .map_err(|reason| self.malformed(line, reason))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

fn encode_line(record: &CsvRecord, write_header: bool) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(Vec::new());
    writer
        .serialize(record)
        .map_err(|err| unavailable("encode csv result row", err))?;
    writer
        .into_inner()
        .map_err(|err| unavailable("flush csv result row", err.into_error()))
}

fn unavailable<E>(context: &'static str, err: E) -> AppError
where
    E: std::error::Error + Send + Sync + 'static,
{
    AppError::store(StoreError::Unavailable {
        context,
        source: Box::new(err),
    })
}

impl From<&ResultRow> for CsvRecord {
    fn from(row: &ResultRow) -> Self {
        let meta = &row.metadata;
        let histogram = &row.histogram;
        Self {
            endpoint: meta.endpoint.clone(),
            description: meta.description.clone(),
            started_at: row.started_at.to_rfc3339(),
            concurrency: row.concurrency,
            latency: row.latency.to_string(),
            ok: histogram.count(StatusBucket::Ok),
            internal_server_error: histogram.count(StatusBucket::InternalServerError),
            service_unavailable: histogram.count(StatusBucket::ServiceUnavailable),
            gateway_timeout: histogram.count(StatusBucket::GatewayTimeout),
            other: histogram.count(StatusBucket::Other),
            data_schema: meta.data_schema.clone(),
            num_rows: meta.num_rows,
            data_type: meta.data_type.clone(),
            output_format: meta.output_format.clone(),
            restrict_rules: meta.restrict_rules.map(|flag| flag_text(flag).to_owned()),
            manifest_record_type: meta.manifest_record_type.clone(),
            asset_view: meta.asset_view.clone(),
        }
    }
}

impl CsvRecord {
    fn into_result_row(self) -> Result<ResultRow, String> {
        let started_at = DateTime::parse_from_rfc3339(&self.started_at)
            .map_err(|err| format!("bad test start time '{}': {}", self.started_at, err))?;
        let latency = parse_latency(&self.latency)?;
        let restrict_rules = match self.restrict_rules.as_deref() {
            None => None,
            Some(value) if value.eq_ignore_ascii_case("true") => Some(true),
            Some(value) if value.eq_ignore_ascii_case("false") => Some(false),
            Some(value) => return Err(format!("bad restrict rules flag '{}'", value)),
        };

        Ok(ResultRow {
            metadata: ScenarioMetadata {
                endpoint: self.endpoint,
                description: self.description,
                data_schema: self.data_schema,
                num_rows: self.num_rows,
                data_type: self.data_type,
                output_format: self.output_format,
                restrict_rules,
                manifest_record_type: self.manifest_record_type,
                asset_view: self.asset_view,
            },
            started_at,
            concurrency: self.concurrency,
            latency,
            histogram: StatusHistogram::from_counts(
                self.ok,
                self.internal_server_error,
                self.service_unavailable,
                self.gateway_timeout,
                self.other,
            ),
        })
    }
}

fn parse_latency(value: &str) -> Result<Latency, String> {
    let seconds = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("bad latency '{}': {}", value, err))?;
    Latency::from_secs_f64(seconds).ok_or_else(|| format!("bad latency '{}'", value))
}
