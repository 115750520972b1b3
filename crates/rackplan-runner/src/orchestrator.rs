//! Parallel solving of partitions.
//!
//! One task per partition. A semaphore sized to the worker count bounds
//! how many solve calls run at once; each solve call is synchronous and
//! CPU bound, so it runs on the blocking pool. Results are collected in
//! completion order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use rackplan_constraint::Instance;
use rackplan_solver::{InstanceSolver, Parameters, SolveOutcome};

use crate::error::{RunnerError, RunnerResult};

/// Outcome of the solve call of one partition.
#[derive(Debug, Clone)]
pub struct PartitionOutcome {
    pub partition: usize,
    pub outcome: SolveOutcome,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    workers: usize,
    fail_fast: bool,
}

impl Orchestrator {
    /// An orchestrator running at most `workers` solve calls at once.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            fail_fast: false,
        }
    }

    /// Return at the first failure instead of draining the other tasks.
    ///
    /// Tasks still waiting for a worker are aborted. Solve calls already
    /// running on the blocking pool cannot be interrupted: they run to
    /// their end in the background and their outcome is discarded.
    pub fn fail_fast(mut self, yes: bool) -> Self {
        self.fail_fast = yes;
        self
    }

    /// Same orchestrator with another worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Solve every instance. Partition numbers are the positions in
    /// `instances`.
    ///
    /// On failure, the first error observed is returned once every task
    /// has completed (or right away with fail-fast).
    pub async fn solve_all(
        &self,
        solver: Arc<dyn InstanceSolver>,
        params: Arc<Parameters>,
        instances: Vec<Instance>,
    ) -> RunnerResult<Vec<PartitionOutcome>> {
        let nb = instances.len();
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (partition, instance) in instances.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let solver = Arc::clone(&solver);
            let params = Arc::clone(&params);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|e| RunnerError::TaskFailed {
                    partition,
                    reason: e.to_string(),
                })?;
                debug!(
                    partition,
                    nodes = instance.model().mapping().nb_nodes(),
                    vms = instance.model().mapping().nb_vms(),
                    "partition solve started"
                );
                let solved = tokio::task::spawn_blocking(move || solver.solve(&params, instance)).await;
                let result: RunnerResult<PartitionOutcome> = match solved {
                    Ok(Ok(outcome)) => {
                        debug!(
                            partition,
                            solved = outcome.plan.is_some(),
                            ms = outcome.statistics.solving_ms,
                            "partition solve finished"
                        );
                        Ok(PartitionOutcome { partition, outcome })
                    }
                    Ok(Err(source)) => Err(RunnerError::Solver { partition, source }),
                    Err(join) => Err(RunnerError::TaskFailed {
                        partition,
                        reason: join.to_string(),
                    }),
                };
                result
            });
        }

        let mut outcomes = Vec::with_capacity(nb);
        let mut failure: Option<RunnerError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| RunnerError::Pool(e.to_string())).and_then(|r| r);
            match result {
                Ok(o) => outcomes.push(o),
                Err(e) => {
                    error!(error = %e, "partition failed");
                    if self.fail_fast {
                        tasks.abort_all();
                        return Err(e);
                    }
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }
}
