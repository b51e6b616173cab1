use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::args::PositiveUsize;
use crate::batch::BatchRunner;
use crate::error::{AppError, AppResult};
use crate::store::{Recorder, ResultRow};

use super::{Scenario, Suite};

/// A scenario whose batch or row write failed; its measurement is lost.
#[derive(Debug)]
pub struct ScenarioFailure {
    pub suite: Suite,
    pub scenario: &'static str,
    pub error: AppError,
}

/// Outcome of one suite: rows recorded in run order plus the failures.
#[derive(Debug)]
pub struct SuiteReport {
    pub suite: Suite,
    pub rows: Vec<ResultRow>,
    pub failures: Vec<ScenarioFailure>,
}

/// Runs suites against one dispatcher and one results store.
#[derive(Clone)]
pub struct Monitor {
    runner: BatchRunner,
    recorder: Recorder,
    concurrency: PositiveUsize,
}

impl Monitor {
    #[must_use]
    pub const fn new(runner: BatchRunner, recorder: Recorder, concurrency: PositiveUsize) -> Self {
        Self {
            runner,
            recorder,
            concurrency,
        }
    }

    /// Runs the scenarios of one suite strictly in order.
    ///
    /// A failed scenario is logged and reported; the rest of the suite still
    /// runs.
    pub async fn run_suite(&self, suite: Suite, scenarios: Vec<Scenario>) -> SuiteReport {
        info!(suite = suite.as_str(), scenarios = scenarios.len(), "Monitoring suite");
        let mut report = SuiteReport {
            suite,
            rows: Vec::with_capacity(scenarios.len()),
            failures: Vec::new(),
        };

        for scenario in scenarios {
            match self.run_scenario(&scenario).await {
                Ok(row) => report.rows.push(row),
                Err(err) => {
                    error!(
                        suite = suite.as_str(),
                        scenario = scenario.name,
                        "Scenario failed: {}",
                        err
                    );
                    report.failures.push(ScenarioFailure {
                        suite,
                        scenario: scenario.name,
                        error: err,
                    });
                }
            }
            if let Some(pause) = scenario.pause_after {
                pause_between(pause).await;
            }
        }
        report
    }

    async fn run_scenario(&self, scenario: &Scenario) -> AppResult<ResultRow> {
        let batch = self
            .runner
            .run_batch(&scenario.spec, self.concurrency)
            .await?;
        self.recorder
            .record(&batch, scenario.metadata.clone())
            .await
    }

    /// Runs every suite as its own task; scenarios inside a suite stay
    /// sequential. Reports come back in the order the suites were given.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Join`] when a suite task panics.
    pub async fn run_suites(&self, plan: Vec<(Suite, Vec<Scenario>)>) -> AppResult<Vec<SuiteReport>> {
        let order: Vec<Suite> = plan.iter().map(|(suite, _)| *suite).collect();
        let mut tasks = JoinSet::new();
        for (suite, scenarios) in plan {
            let monitor = self.clone();
            tasks.spawn(async move { monitor.run_suite(suite, scenarios).await });
        }

        let mut reports = Vec::with_capacity(order.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => {
                    tasks.abort_all();
                    return Err(AppError::from(err));
                }
            }
        }
        reports.sort_by_key(|report| {
            order
                .iter()
                .position(|suite| *suite == report.suite)
                .unwrap_or(usize::MAX)
        });
        Ok(reports)
    }
}

async fn pause_between(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}
