use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use tokio_rusqlite::Connection;

use crate::batch::{Latency, StatusHistogram};
use crate::error::{AppError, AppResult, StoreError};

use super::{ResultRow, ResultStore, ScenarioMetadata};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS latency_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint TEXT NOT NULL,
    description TEXT NOT NULL,
    test_start_time TEXT NOT NULL,
    concurrent_requests INTEGER NOT NULL,
    latency_seconds REAL NOT NULL,
    status_200 INTEGER NOT NULL,
    status_500 INTEGER NOT NULL,
    status_503 INTEGER NOT NULL,
    status_504 INTEGER NOT NULL,
    status_other INTEGER NOT NULL,
    data_schema TEXT,
    num_rows INTEGER,
    data_type TEXT,
    output_format TEXT,
    restrict_rules INTEGER,
    manifest_record_type TEXT,
    asset_view TEXT
);
CREATE INDEX IF NOT EXISTS idx_latency_results_endpoint ON latency_results(endpoint);";

const INSERT_ROW: &str = "INSERT INTO latency_results (
    endpoint, description, test_start_time, concurrent_requests, latency_seconds,
    status_200, status_500, status_503, status_504, status_other,
    data_schema, num_rows, data_type, output_format, restrict_rules,
    manifest_record_type, asset_view
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)";

const SELECT_ROWS: &str = "SELECT
    id, endpoint, description, test_start_time, concurrent_requests, latency_seconds,
    status_200, status_500, status_503, status_504, status_other,
    data_schema, num_rows, data_type, output_format, restrict_rules,
    manifest_record_type, asset_view
FROM latency_results ORDER BY id";

/// Results table in a local SQLite database.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the database and ensures the results table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the database cannot be opened
    /// or initialized.
    pub async fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|err| unavailable("open sqlite results db", err))?;
        conn.call(|conn| {
            conn.execute_batch(CREATE_TABLE)?;
            Ok(())
        })
        .await
        .map_err(|err| unavailable("initialize sqlite results db", err))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn append(&self, row: &ResultRow) -> AppResult<()> {
        let row = row.clone();
        self.conn
            .call(move |conn| {
                let [ok, internal, unavailable_count, gateway, other] =
                    histogram_columns(&row.histogram);
                conn.execute(
                    INSERT_ROW,
                    rusqlite::params![
                        row.metadata.endpoint,
                        row.metadata.description,
                        row.started_at.to_rfc3339(),
                        clamp_i64(row.concurrency),
                        row.latency.as_secs_f64(),
                        ok,
                        internal,
                        unavailable_count,
                        gateway,
                        other,
                        row.metadata.data_schema,
                        row.metadata.num_rows.map(clamp_i64),
                        row.metadata.data_type,
                        row.metadata.output_format,
                        row.metadata.restrict_rules,
                        row.metadata.manifest_record_type,
                        row.metadata.asset_view,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|err| unavailable("append sqlite result row", err))
    }

    async fn rows(&self) -> AppResult<Vec<ResultRow>> {
        let stored = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(SELECT_ROWS)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(StoredRow {
                            id: row.get(0)?,
                            endpoint: row.get(1)?,
                            description: row.get(2)?,
                            started_at: row.get(3)?,
                            concurrency: row.get(4)?,
                            latency_seconds: row.get(5)?,
                            counts: [
                                row.get(6)?,
                                row.get(7)?,
                                row.get(8)?,
                                row.get(9)?,
                                row.get(10)?,
                            ],
                            data_schema: row.get(11)?,
                            num_rows: row.get(12)?,
                            data_type: row.get(13)?,
                            output_format: row.get(14)?,
                            restrict_rules: row.get(15)?,
                            manifest_record_type: row.get(16)?,
                            asset_view: row.get(17)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .map_err(|err| unavailable("read sqlite result rows", err))?;

        stored
            .into_iter()
            .map(|row| row.into_result_row(&self.path))
            .collect()
    }
}

struct StoredRow {
    id: i64,
    endpoint: String,
    description: String,
    started_at: String,
    concurrency: i64,
    latency_seconds: f64,
    counts: [i64; 5],
    data_schema: Option<String>,
    num_rows: Option<i64>,
    data_type: Option<String>,
    output_format: Option<String>,
    restrict_rules: Option<bool>,
    manifest_record_type: Option<String>,
    asset_view: Option<String>,
}

impl StoredRow {
    fn into_result_row(self, path: &Path) -> AppResult<ResultRow> {
        let line = usize::try_from(self.id).unwrap_or(usize::MAX);
        let malformed = |reason: String| {
            AppError::store(StoreError::MalformedRow {
                path: path.to_path_buf(),
                line,
                reason,
            })
        };
        let unsigned = |value: i64, column: &str| {
            u64::try_from(value)
                .map_err(|err| malformed(format!("{} is negative ({}): {}", column, value, err)))
        };

        let started_at = DateTime::parse_from_rfc3339(&self.started_at)
            .map_err(|err| malformed(format!("bad test_start_time: {}", err)))?;
        let latency = Latency::from_secs_f64(self.latency_seconds)
            .ok_or_else(|| malformed(format!("bad latency {}", self.latency_seconds)))?;
        let [ok, internal, unavailable_count, gateway, other] = self.counts;
        let histogram = StatusHistogram::from_counts(
            unsigned(ok, "status_200")?,
            unsigned(internal, "status_500")?,
            unsigned(unavailable_count, "status_503")?,
            unsigned(gateway, "status_504")?,
            unsigned(other, "status_other")?,
        );
        let num_rows = match self.num_rows {
            Some(value) => Some(unsigned(value, "num_rows")?),
            None => None,
        };

        Ok(ResultRow {
            metadata: ScenarioMetadata {
                endpoint: self.endpoint,
                description: self.description,
                data_schema: self.data_schema,
                num_rows,
                data_type: self.data_type,
                output_format: self.output_format,
                restrict_rules: self.restrict_rules,
                manifest_record_type: self.manifest_record_type,
                asset_view: self.asset_view,
            },
            started_at,
            concurrency: unsigned(self.concurrency, "concurrent_requests")?,
            latency,
            histogram,
        })
    }
}

fn histogram_columns(histogram: &StatusHistogram) -> [i64; 5] {
    crate::batch::StatusBucket::ALL.map(|bucket| clamp_i64(histogram.count(bucket)))
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
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
