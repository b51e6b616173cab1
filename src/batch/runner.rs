use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::args::PositiveUsize;
use crate::error::{AppError, AppResult, HttpError};
use crate::http::{Dispatch, RequestSpec};

use super::{BatchResult, Latency, StatusHistogram};

/// Fans a spec out to `concurrency` simultaneous dispatches and aggregates
/// the outcomes.
#[derive(Clone)]
pub struct BatchRunner {
    dispatcher: Arc<dyn Dispatch>,
}

impl BatchRunner {
    #[must_use]
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    /// Runs one batch.
    ///
    /// Every call gets its own task; results are folded into the histogram in
    /// completion order by this function alone. HTTP statuses of any kind are
    /// counted. The first transport failure aborts the in-flight peers and is
    /// returned instead of a partial result.
    ///
    /// The runner enforces no deadline of its own: a call that never finishes
    /// holds the batch open.
    ///
    /// # Errors
    ///
    /// Returns the first dispatch error, or [`HttpError::DispatchTask`] when a
    /// dispatch task panicked.
    pub async fn run_batch(
        &self,
        spec: &Arc<RequestSpec>,
        concurrency: PositiveUsize,
    ) -> AppResult<BatchResult> {
        let started_at = Local::now().fixed_offset();
        let timer = Instant::now();

        let mut tasks = JoinSet::new();
        for _ in 0..concurrency.get() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let spec = Arc::clone(spec);
            tasks.spawn(async move { dispatcher.dispatch(&spec).await });
        }

        let mut histogram = StatusHistogram::default();
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    tasks.abort_all();
                    error!(url = spec.url(), "Dispatch task failed: {}", err);
                    return Err(AppError::http(HttpError::DispatchTask { source: err }));
                }
            };
            match outcome {
                Ok(status) => {
                    let bucket = histogram.record(status);
                    debug!(url = spec.url(), status, bucket = bucket.label(), "Status code");
                }
                Err(err) => {
                    tasks.abort_all();
                    error!(url = spec.url(), "Batch aborted: {}", err);
                    return Err(err);
                }
            }
        }

        let elapsed = Latency::from_duration(timer.elapsed());
        info!(
            url = spec.url(),
            concurrency = concurrency.get(),
            "Batch finished in {}s",
            elapsed
        );
        Ok(BatchResult::new(started_at, elapsed, histogram, concurrency))
    }
}
