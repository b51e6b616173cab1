//! Result rows and the append-only stores they are written to.
mod csv_file;
mod recorder;
mod row;
mod sqlite;


use async_trait::async_trait;

use crate::error::AppResult;

pub use csv_file::CsvStore;
pub use recorder::Recorder;
pub use row::{ResultRow, ScenarioMetadata};
pub use sqlite::SqliteStore;

/// Narrow write interface to the results table.
///
/// Rows are only ever added. Implementations must not rewrite or reorder rows
/// that are already stored.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StoreError`] when the store cannot take the write.
    async fn append(&self, row: &ResultRow) -> AppResult<()>;

    /// Reads every stored row in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be read or holds a malformed row.
    async fn rows(&self) -> AppResult<Vec<ResultRow>>;
}
