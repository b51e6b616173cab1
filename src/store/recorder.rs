use std::sync::Arc;

use tracing::{error, info};

use crate::batch::BatchResult;
use crate::error::AppResult;

use super::{ResultRow, ResultStore, ScenarioMetadata};

/// Turns batch measurements into rows and appends them to a store.
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn ResultStore>,
}

impl Recorder {
    #[must_use]
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// Builds the row for `batch` and appends it with a single write.
    ///
    /// A failed write is logged here and handed back; the measurement is not
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns the store error when the append fails.
    pub async fn record(
        &self,
        batch: &BatchResult,
        metadata: ScenarioMetadata,
    ) -> AppResult<ResultRow> {
        let row = ResultRow::from_batch(batch, metadata);
        if let Err(err) = self.store.append(&row).await {
            error!(
                endpoint = %row.metadata.endpoint,
                description = %row.metadata.description,
                "Failed to record result, measurement lost: {}",
                err
            );
            return Err(err);
        }
        info!(
            endpoint = %row.metadata.endpoint,
            latency = %row.latency,
            "Recorded result"
        );
        Ok(row)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }
}
