//! The solving boundary.

use rackplan_constraint::Instance;
use rackplan_plan::Plan;

use crate::error::SolverResult;
use crate::params::Parameters;
use crate::stats::SolvingStatistics;

/// Result of a solve call that ran to its end.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    /// The computed plan, `None` when the instance has no solution (or
    /// none was found in time).
    pub plan: Option<Plan>,
    pub statistics: SolvingStatistics,
}

/// Computes a reconfiguration plan for an instance.
///
/// Implementations must only reference elements of the instance's model
/// in the plans they return. Each call gets its own instance, so a solver
/// can be shared between worker threads.
pub trait InstanceSolver: Send + Sync {
    fn solve(&self, params: &Parameters, instance: Instance) -> SolverResult<SolveOutcome>;
}
