use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::args::PositiveUsize;
use crate::error::{AppError, AppResult, HttpError};
use crate::http::{Dispatch, RequestSpec};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::http(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn concurrency(value: usize) -> AppResult<PositiveUsize> {
    Ok(PositiveUsize::try_from(value)?)
}

fn spec() -> Arc<RequestSpec> {
    Arc::new(RequestSpec::get("http://localhost/v1/storage/assets/tables"))
}

fn transport_failure() -> AppError {
    let url = "not a url";
    match reqwest::Client::new().get(url).build() {
        Err(source) => AppError::http(HttpError::Transport {
            url: url.to_owned(),
            source,
        }),
        Ok(_) => AppError::http("expected request build to fail"),
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Status(u16),
    Transport,
    Hang,
}

/// Hands out scripted outcomes in call order; falls back to 200.
struct ScriptedDispatcher {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedDispatcher {
    fn new(steps: &[Step]) -> Self {
        Self {
            steps: Mutex::new(steps.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dispatch for ScriptedDispatcher {
    async fn dispatch(&self, _spec: &RequestSpec) -> AppResult<u16> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .map_err(|err| AppError::http(format!("script lock poisoned: {}", err)))?
            .pop_front()
            .unwrap_or(Step::Status(200));
        match step {
            Step::Status(status) => Ok(status),
            Step::Transport => Err(transport_failure()),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(200)
            }
        }
    }
}

fn runner(dispatcher: &Arc<ScriptedDispatcher>) -> BatchRunner {
    let dispatcher: Arc<dyn Dispatch> = Arc::clone(dispatcher) as Arc<dyn Dispatch>;
    BatchRunner::new(dispatcher)
}

fn expect_counts(histogram: &StatusHistogram, expected: [u64; 5]) -> AppResult<()> {
    for (bucket, want) in StatusBucket::ALL.iter().zip(expected) {
        let got = histogram.count(*bucket);
        if got != want {
            return Err(AppError::http(format!(
                "bucket {} expected {}, got {}",
                bucket.label(),
                want,
                got
            )));
        }
    }
    Ok(())
}

#[test]
fn all_ok_batches_count_every_call_as_200() -> AppResult<()> {
    run_async_test(async {
        for size in 1..=50usize {
            let dispatcher = Arc::new(ScriptedDispatcher::new(&[]));
            let result = runner(&dispatcher)
                .run_batch(&spec(), concurrency(size)?)
                .await?;
            let calls = u64::try_from(size).map_err(|err| AppError::http(err.to_string()))?;
            expect_counts(result.histogram(), [calls, 0, 0, 0, 0])?;
            if result.histogram().total() != calls {
                return Err(AppError::http(format!("total mismatch for {}", size)));
            }
            if dispatcher.calls() != size {
                return Err(AppError::http(format!(
                    "expected {} dispatches, got {}",
                    size,
                    dispatcher.calls()
                )));
            }
            if result.concurrency().get() != size {
                return Err(AppError::http("concurrency not carried into the result"));
            }
        }
        Ok(())
    })
}

#[test]
fn mixed_statuses_fill_matching_buckets() -> AppResult<()> {
    run_async_test(async {
        let steps = [
            Step::Status(200),
            Step::Status(200),
            Step::Status(500),
            Step::Status(200),
        ];
        let dispatcher = Arc::new(ScriptedDispatcher::new(&steps));
        let result = runner(&dispatcher).run_batch(&spec(), concurrency(4)?).await?;
        expect_counts(result.histogram(), [3, 1, 0, 0, 0])
    })
}

#[test]
fn unlisted_status_lands_in_other() -> AppResult<()> {
    run_async_test(async {
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[Step::Status(429)]));
        let result = runner(&dispatcher).run_batch(&spec(), concurrency(1)?).await?;
        expect_counts(result.histogram(), [0, 0, 0, 0, 1])
    })
}

#[test]
fn every_named_bucket_is_reachable() -> AppResult<()> {
    run_async_test(async {
        let steps = [
            Step::Status(504),
            Step::Status(503),
            Step::Status(500),
            Step::Status(404),
            Step::Status(200),
            Step::Status(302),
        ];
        let dispatcher = Arc::new(ScriptedDispatcher::new(&steps));
        let result = runner(&dispatcher).run_batch(&spec(), concurrency(6)?).await?;
        expect_counts(result.histogram(), [1, 1, 1, 1, 2])?;
        if result.histogram().total() != 6 {
            return Err(AppError::http("histogram total must equal concurrency"));
        }
        Ok(())
    })
}

#[test]
fn transport_error_aborts_the_batch() -> AppResult<()> {
    run_async_test(async {
        let steps = [Step::Status(200), Step::Transport, Step::Status(200)];
        let dispatcher = Arc::new(ScriptedDispatcher::new(&steps));
        match runner(&dispatcher).run_batch(&spec(), concurrency(3)?).await {
            Err(err) if err.is_transport() => Ok(()),
            Err(err) => Err(AppError::http(format!("unexpected error: {}", err))),
            Ok(result) => Err(AppError::http(format!(
                "expected failure, got {:?}",
                result.histogram()
            ))),
        }
    })
}

#[test]
fn transport_error_does_not_wait_for_hung_peers() -> AppResult<()> {
    run_async_test(async {
        let steps = [Step::Hang, Step::Hang, Step::Transport];
        let dispatcher = Arc::new(ScriptedDispatcher::new(&steps));
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            runner(&dispatcher).run_batch(&spec(), concurrency(3)?),
        )
        .await
        .map_err(|err| AppError::http(format!("batch waited on hung calls: {}", err)))?;
        if outcome.is_ok() {
            return Err(AppError::http("expected the batch to fail"));
        }
        Ok(())
    })
}

#[test]
fn panicking_dispatch_surfaces_as_task_error() -> AppResult<()> {
    struct Panics;

    #[async_trait]
    impl Dispatch for Panics {
        async fn dispatch(&self, spec: &RequestSpec) -> AppResult<u16> {
            std::panic::panic_any(format!("no status for {}", spec.url()))
        }
    }

    run_async_test(async {
        let runner = BatchRunner::new(Arc::new(Panics));
        match runner.run_batch(&spec(), concurrency(2)?).await {
            Err(AppError::Http(HttpError::DispatchTask { .. })) => Ok(()),
            Err(err) => Err(AppError::http(format!("unexpected error: {}", err))),
            Ok(_) => Err(AppError::http("expected a task failure")),
        }
    })
}

#[test]
fn batches_sharing_a_dispatcher_keep_separate_histograms() -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| AppError::http(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(async {
        let dispatcher = Arc::new(ScriptedDispatcher::new(&[]));
        let shared = runner(&dispatcher);
        let first = shared.clone();
        let second = shared.clone();
        let left = tokio::spawn(async move { first.run_batch(&spec(), concurrency(7)?).await });
        let right = tokio::spawn(async move { second.run_batch(&spec(), concurrency(13)?).await });
        let left = left.await??;
        let right = right.await??;
        expect_counts(left.histogram(), [7, 0, 0, 0, 0])?;
        expect_counts(right.histogram(), [13, 0, 0, 0, 0])?;
        if dispatcher.calls() != 20 {
            return Err(AppError::http("expected 20 dispatches across both batches"));
        }
        Ok(())
    })
}

#[test]
fn classify_defaults_unknown_codes_to_other() -> AppResult<()> {
    for status in [0u16, 100, 201, 204, 301, 400, 401, 404, 429, 502, 599, 999] {
        if StatusBucket::classify(status) != StatusBucket::Other {
            return Err(AppError::http(format!("{} should be other", status)));
        }
    }
    let labels: Vec<&str> = StatusBucket::ALL.iter().map(|bucket| bucket.label()).collect();
    if labels != ["200", "500", "503", "504", "other"] {
        return Err(AppError::http(format!("unexpected labels {:?}", labels)));
    }
    Ok(())
}

#[test]
fn latency_rounds_to_hundredths() -> AppResult<()> {
    let cases = [
        (Duration::from_millis(0), "0.00"),
        (Duration::from_millis(4), "0.00"),
        (Duration::from_millis(5), "0.01"),
        (Duration::from_millis(1234), "1.23"),
        (Duration::from_millis(1235), "1.24"),
        (Duration::from_millis(61_999), "62.00"),
    ];
    for (duration, expected) in cases {
        let rendered = Latency::from_duration(duration).to_string();
        if rendered != expected {
            return Err(AppError::http(format!(
                "{:?} rendered as {}, expected {}",
                duration, rendered, expected
            )));
        }
    }
    Ok(())
}

#[test]
fn latency_survives_float_storage() -> AppResult<()> {
    for centis in [0u64, 1, 99, 123, 4567, 100_000] {
        let latency = Latency::from_centis(centis);
        let restored = Latency::from_secs_f64(latency.as_secs_f64())
            .ok_or_else(|| AppError::http("latency did not parse back"))?;
        if restored != latency {
            return Err(AppError::http(format!(
                "{} came back as {}",
                latency, restored
            )));
        }
    }
    if Latency::from_secs_f64(-1.0).is_some() {
        return Err(AppError::http("negative latency accepted"));
    }
    Ok(())
}
