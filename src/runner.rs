//! Run orchestration.
//!
//! A [`Runner`] owns everything a run needs and the counter used to tell
//! runs apart in the logs. Runs take `&mut self`, so two runs of the same
//! runner can never overlap.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::error::{CleanerError, Result};
use crate::openstack::ManagerFactory;
use crate::planner::{explain, CleanupPlan, ExecutionResult, PlanBuilder, PlanExecutor};
use crate::tracking::Tracker;

/// Outcome of a completed run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Run cycle number, starting at 1.
    pub run: u64,
    /// Whether deletions were only reported.
    pub dry_run: bool,
    /// One plan per cleanup configuration.
    pub plans: Vec<CleanupPlan>,
    /// Human readable explanation of the plans.
    pub explanation: String,
    /// Deletion counts. All zero in a dry run.
    pub execution: ExecutionResult,
}

impl RunSummary {
    /// Returns the number of items marked for deletion across all plans.
    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.plans.iter().map(CleanupPlan::marked_count).sum()
    }

    /// Returns the number of items spared across all plans.
    #[must_use]
    pub fn spared_count(&self) -> usize {
        self.plans.iter().map(CleanupPlan::spared_count).sum()
    }
}

/// Runs cleanups once or on a period.
pub struct Runner {
    configuration: Configuration,
    factory: Arc<dyn ManagerFactory>,
    tracker: Arc<dyn Tracker>,
    run_count: u64,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("cleanups", &self.configuration.cleanups.len())
            .field("tracker", &self.tracker.backend_type())
            .field("run_count", &self.run_count)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        configuration: Configuration,
        factory: Arc<dyn ManagerFactory>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Self {
            configuration,
            factory,
            tracker,
            run_count: 0,
        }
    }

    /// Returns the number of runs started so far.
    #[must_use]
    pub const fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Performs a single run: plan, explain, and delete unless `dry_run`.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails. Nothing is deleted in that case.
    /// Failed deletions are counted in the summary, not returned.
    pub async fn run_once(&mut self, dry_run: bool) -> Result<RunSummary> {
        self.run_count += 1;
        let run = self.run_count;
        info!("Starting run cycle {run}{}", if dry_run { " (dry run)" } else { "" });

        let plans = PlanBuilder::new(self.factory.as_ref(), self.tracker.as_ref())
            .with_dry_run(dry_run)
            .build(&self.configuration.cleanups)
            .await
            .inspect_err(|e| error!("Run cycle {run} aborted: {e}"))?;

        let explanation = explain(&plans, dry_run);
        info!("Run cycle {run} plan:\n{explanation}");

        let execution = if dry_run {
            ExecutionResult::default()
        } else {
            PlanExecutor::new(self.configuration.general.max_simultaneous_deletes)
                .execute(&plans)
                .await
        };

        info!("Finished run cycle {run}");
        Ok(RunSummary {
            run,
            dry_run,
            plans,
            explanation,
            execution,
        })
    }

    /// Runs every `period` until `shutdown` completes.
    ///
    /// The first run starts immediately. A run that is still going when the
    /// next tick is due causes that tick to be skipped. A failed run is
    /// logged and the next run goes ahead as scheduled.
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is zero.
    pub async fn run_periodically<F>(
        &mut self,
        period: Duration,
        dry_run: bool,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if period.is_zero() {
            return Err(CleanerError::internal("Run period must be greater than zero"));
        }

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutting down after {} run(s)", self.run_count);
                    return Ok(());
                }
                _ = interval.tick() => {
                    match self.run_once(dry_run).await {
                        Ok(summary) => debug!(
                            "Run cycle {} done: {}",
                            summary.run, summary.execution
                        ),
                        Err(e) => warn!(
                            "Run cycle {} failed, next run in {period:?}: {e}",
                            self.run_count
                        ),
                    }
                }
            }
        }
    }
}
