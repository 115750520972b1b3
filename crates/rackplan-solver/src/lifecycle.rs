//! Lifecycle solver: a small, non-optimizing reference solver.
//!
//! It drives every VM and node named by a state constraint to its
//! expected state with lifecycle actions, picks hosts that honour the
//! ban/fence/quarantine restrictions (booting an offline node when no
//! online node fits), moves running VMs off forbidden hosts, then checks
//! every constraint on the resulting model. Any violation left means "no
//! solution"; there is no search and no backtracking.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use rackplan_constraint::{Constraint, Instance, Objective};
use rackplan_model::{Model, NodeId, NodeState, VmId, VmState, VmStateKind};
use rackplan_plan::{
    Action, ActionDurations, ActionKind, BootNode, BootVm, KillVm, MigrateVm, Operation,
    Plan, PlanError, ResumeVm, ShutdownNode, ShutdownVm, SuspendVm,
};
use tracing::{debug, trace};

use crate::error::{SolverError, SolverResult};
use crate::params::Parameters;
use crate::solver::{InstanceSolver, SolveOutcome};
use crate::stats::{SolutionStatistics, SolvingStatistics};

/// Bandwidth given to the migrations the solver emits, in Mb/s.
pub const MIGRATION_BANDWIDTH: u32 = 1000;

#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleSolver;

impl LifecycleSolver {
    pub fn new() -> Self {
        Self
    }
}

/// Why a layout stopped before producing a plan.
#[derive(Debug)]
enum Halt {
    Unsat(String),
    Timeout,
    Error(SolverError),
}

impl From<SolverError> for Halt {
    fn from(e: SolverError) -> Self {
        Halt::Error(e)
    }
}

impl From<PlanError> for Halt {
    fn from(e: PlanError) -> Self {
        Halt::Error(e.into())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Goals ─────────────────────────────────────────────────────────

/// What the constraints ask for, gathered per element.
#[derive(Debug, Default)]
struct Goals {
    vm_targets: BTreeMap<VmId, VmStateKind>,
    node_targets: BTreeMap<NodeId, NodeState>,
    banned: BTreeMap<VmId, BTreeSet<NodeId>>,
    fenced: BTreeMap<VmId, BTreeSet<NodeId>>,
    quarantined: BTreeSet<NodeId>,
}

impl Goals {
    fn collect(instance: &Instance) -> Result<Self, Halt> {
        let mut g = Goals::default();
        for c in instance.constraints() {
            match c {
                Constraint::Running(c) => g.target_vm(c.vm, VmStateKind::Running)?,
                Constraint::Sleeping(c) => g.target_vm(c.vm, VmStateKind::Sleeping)?,
                Constraint::Ready(c) => g.target_vm(c.vm, VmStateKind::Ready)?,
                Constraint::Killed(c) => g.target_vm(c.vm, VmStateKind::Killed)?,
                Constraint::Online(c) => g.target_node(c.node, NodeState::Online)?,
                Constraint::Offline(c) => g.target_node(c.node, NodeState::Offline)?,
                Constraint::Ban(c) => g.banned.entry(c.vm).or_default().extend(c.nodes.iter().copied()),
                Constraint::Fence(c) => {
                    let allowed = g.fenced.entry(c.vm).or_insert_with(|| c.nodes.clone());
                    allowed.retain(|n| c.nodes.contains(n));
                }
                Constraint::Quarantine(c) => {
                    g.quarantined.insert(c.node);
                }
                _ => {}
            }
        }
        Ok(g)
    }

    fn target_vm(&mut self, vm: VmId, st: VmStateKind) -> Result<(), Halt> {
        match self.vm_targets.insert(vm, st) {
            Some(prev) if prev != st => Err(Halt::Unsat(format!("{vm} must be both {prev} and {st}"))),
            _ => Ok(()),
        }
    }

    fn target_node(&mut self, n: NodeId, st: NodeState) -> Result<(), Halt> {
        match self.node_targets.insert(n, st) {
            Some(prev) if prev != st => Err(Halt::Unsat(format!("{n} must be both {prev} and {st}"))),
            _ => Ok(()),
        }
    }

    /// Whether the VM may be on the node. Quarantine only forbids arrivals.
    fn allows(&self, vm: VmId, n: NodeId, arriving: bool) -> bool {
        !self.banned.get(&vm).is_some_and(|b| b.contains(&n))
            && self.fenced.get(&vm).is_none_or(|f| f.contains(&n))
            && !(arriving && self.quarantined.contains(&n))
            && self.node_targets.get(&n) != Some(&NodeState::Offline)
    }

    /// VMs the solver has to act on.
    fn managed_vms(&self, mo: &Model, repair: bool) -> usize {
        let m = mo.mapping();
        if !repair {
            return m.nb_vms();
        }
        m.all_vms()
            .filter(|vm| {
                let st = m.vm_state(*vm);
                let misplaced = st.and_then(|s| s.host()).is_some_and(|h| !self.allows(*vm, h, false));
                let retarget = self
                    .vm_targets
                    .get(vm)
                    .is_some_and(|t| st.map(|s| s.kind()) != Some(*t));
                misplaced || retarget
            })
            .count()
    }
}

// ── Layout ────────────────────────────────────────────────────────

/// Emits actions one after the other, tracking when each element becomes
/// available.
struct Layout<'g> {
    goals: &'g Goals,
    durations: ActionDurations,
    current: Model,
    plan: Plan,
    vm_ready_at: BTreeMap<VmId, u32>,
    node_up_at: BTreeMap<NodeId, u32>,
    node_busy_until: BTreeMap<NodeId, u32>,
    decisions: u64,
    deadline: Option<Instant>,
}

impl<'g> Layout<'g> {
    fn new(goals: &'g Goals, origin: &Model, durations: ActionDurations, deadline: Option<Instant>) -> Self {
        Self {
            goals,
            durations,
            current: origin.clone(),
            plan: Plan::new(origin.clone()),
            vm_ready_at: BTreeMap::new(),
            node_up_at: BTreeMap::new(),
            node_busy_until: BTreeMap::new(),
            decisions: 0,
            deadline,
        }
    }

    fn check_deadline(&self) -> Result<(), Halt> {
        match self.deadline {
            Some(d) if Instant::now() > d => Err(Halt::Timeout),
            _ => Ok(()),
        }
    }

    fn run(&mut self, instance: &Instance) -> Result<(), Halt> {
        let goals = self.goals;

        for (&n, &st) in &goals.node_targets {
            match (self.current.mapping().node_state(n), st) {
                (None, _) => return Err(Halt::Unsat(format!("{n} is not managed by this instance"))),
                (Some(NodeState::Offline), NodeState::Online) => {
                    self.emit(Operation::BootNode(BootNode { node: n }))?;
                }
                _ => {}
            }
        }

        for (&vm, &target) in &goals.vm_targets {
            self.check_deadline()?;
            self.drive(vm, target)?;
        }

        let running: Vec<VmId> = self.current.mapping().running_vms().collect();
        for vm in running {
            self.check_deadline()?;
            let Some(host) = self.current.mapping().vm_location(vm) else {
                continue;
            };
            if !goals.allows(vm, host, false) {
                self.evacuate(vm, host)?;
            }
        }

        for (&n, &st) in &goals.node_targets {
            if st == NodeState::Offline && self.current.mapping().is_online(n) {
                self.shut_down(n)?;
            }
        }

        let violated = instance.unsatisfied(&self.current).next();
        if let Some(c) = violated {
            return Err(Halt::Unsat(format!("{c} is violated")));
        }
        Ok(())
    }

    /// Move a VM through the lifecycle until it reaches the target state.
    fn drive(&mut self, vm: VmId, target: VmStateKind) -> Result<(), Halt> {
        use VmStateKind as K;
        loop {
            let Some(state) = self.current.mapping().vm_state(vm) else {
                return match target {
                    K::Killed => Ok(()),
                    _ => Err(SolverError::UnmanagedVm(vm).into()),
                };
            };
            let op = match (state, target) {
                (_, K::Init) => return Err(Halt::Unsat(format!("{vm} cannot go back to init"))),
                (_, K::Killed) => Operation::KillVm(KillVm {
                    vm,
                    host: state.host(),
                }),
                (VmState::Ready, K::Ready)
                | (VmState::Running(_), K::Running)
                | (VmState::Sleeping(_), K::Sleeping) => return Ok(()),
                (VmState::Ready, K::Running | K::Sleeping) => {
                    let dst = self.choose_host(vm, None)?;
                    Operation::BootVm(BootVm { vm, dst })
                }
                (VmState::Running(n), K::Sleeping) => Operation::SuspendVm(SuspendVm { vm, src: n, dst: n }),
                (VmState::Running(n), K::Ready) => Operation::ShutdownVm(ShutdownVm { vm, node: n }),
                (VmState::Sleeping(n), K::Running | K::Ready) => {
                    let dst = if self.goals.allows(vm, n, false) {
                        n
                    } else {
                        self.choose_host(vm, Some(n))?
                    };
                    Operation::ResumeVm(ResumeVm { vm, src: n, dst })
                }
            };
            self.emit(op)?;
        }
    }

    /// Migrate a running VM away from its host.
    fn evacuate(&mut self, vm: VmId, host: NodeId) -> Result<(), Halt> {
        let dst = self.choose_host(vm, Some(host))?;
        self.emit(Operation::MigrateVm(MigrateVm {
            vm,
            src: host,
            dst,
            bandwidth: MIGRATION_BANDWIDTH,
        }))
        .map(|_| ())
    }

    fn shut_down(&mut self, n: NodeId) -> Result<(), Halt> {
        if self.current.mapping().sleeping_vms_on(n).next().is_some() {
            return Err(Halt::Unsat(format!("{n} hosts sleeping VMs and must go offline")));
        }
        let running: Vec<VmId> = self.current.mapping().running_vms_on(n).collect();
        for vm in running {
            self.evacuate(vm, n)?;
        }
        self.emit(Operation::ShutdownNode(ShutdownNode { node: n }))
            .map(|_| ())
    }

    /// Least loaded online node that may receive the VM, or the first
    /// offline one, booted for the occasion.
    fn choose_host(&mut self, vm: VmId, exclude: Option<NodeId>) -> Result<NodeId, Halt> {
        let goals = self.goals;
        let m = self.current.mapping();
        let fits = |n: &NodeId| Some(*n) != exclude && goals.allows(vm, *n, true);

        let online = m
            .online_nodes()
            .filter(fits)
            .min_by_key(|n| (m.nb_running_vms_on(*n), *n));
        if let Some(n) = online {
            return Ok(n);
        }
        let Some(n) = m.offline_nodes().find(fits) else {
            return Err(Halt::Unsat(format!("no node can host {vm}")));
        };
        debug!(node = %n, %vm, "booting a node to host a VM");
        self.emit(Operation::BootNode(BootNode { node: n }))?;
        Ok(n)
    }

    /// Lay out the operation as soon as its elements are available,
    /// apply it, and record it.
    fn emit(&mut self, op: Operation) -> Result<u32, Halt> {
        let mut start = op.vm().and_then(|vm| self.vm_ready_at.get(&vm).copied()).unwrap_or(0);
        for n in op.nodes() {
            start = start.max(self.node_up_at.get(&n).copied().unwrap_or(0));
        }
        if let Operation::ShutdownNode(s) = &op {
            start = start.max(self.node_busy_until.get(&s.node).copied().unwrap_or(0));
        }

        let probe = Action::new(start, start, op)?;
        let d = self.durations.evaluate(&probe);
        let a = Action::new(start, start.saturating_add(d), probe.operation().clone())?;
        if !a.apply(&mut self.current) {
            return Err(SolverError::Internal(format!("{a} is not applicable")).into());
        }
        let end = a.end();
        if let Some(vm) = a.operation().vm() {
            self.vm_ready_at.insert(vm, end);
        }
        for n in a.operation().nodes() {
            let busy = self.node_busy_until.entry(n).or_insert(0);
            *busy = (*busy).max(end);
        }
        if let Operation::BootNode(b) = a.operation() {
            self.node_up_at.insert(b.node, end);
        }
        trace!(action = %a, "action laid out");
        let shown = a.to_string();
        if !self.plan.add(a) {
            return Err(SolverError::Internal(format!("{shown} rejected by the plan")).into());
        }
        self.decisions += 1;
        Ok(end)
    }
}

fn objective_value(plan: &Plan, objective: Objective) -> i64 {
    match objective {
        Objective::MinMttr => plan.iter().map(|a| i64::from(a.end())).sum(),
        Objective::MinMigrations => plan
            .iter()
            .filter(|a| a.kind() == ActionKind::MigrateVm)
            .count() as i64,
    }
}

impl InstanceSolver for LifecycleSolver {
    fn solve(&self, params: &Parameters, instance: Instance) -> SolverResult<SolveOutcome> {
        let started = Instant::now();
        let mo = instance.model();
        let mut stats = SolvingStatistics::new(
            params.clone(),
            mo.mapping().nb_nodes(),
            mo.mapping().nb_vms(),
            instance.constraints().len(),
        );
        instance.validate()?;
        let deadline = (params.time_limit_secs > 0)
            .then(|| started + Duration::from_secs(params.time_limit_secs));
        debug!(
            nodes = stats.nb_nodes,
            vms = stats.nb_vms,
            constraints = stats.nb_constraints,
            "lifecycle solve started"
        );

        let goals = Goals::collect(&instance);
        stats.core_build_ms = millis(started.elapsed());

        let result = goals.and_then(|goals| {
            let spe = Instant::now();
            let durations = params.durations.to_action_durations();
            let mut layout = Layout::new(&goals, instance.model(), durations, deadline);
            stats.nb_managed_vms = goals.managed_vms(instance.model(), params.repair);
            stats.specialization_ms = millis(spe.elapsed());
            let r = layout.run(&instance);
            stats.search_nodes = layout.decisions;
            r.map(|()| layout.plan)
        });
        stats.solving_ms = millis(started.elapsed());

        let plan = match result {
            Ok(plan) => {
                let value = objective_value(&plan, instance.objective());
                stats.solutions.push(SolutionStatistics {
                    nodes: stats.search_nodes,
                    backtracks: 0,
                    time_ms: stats.solving_ms,
                    objective: params.optimize.then_some(value),
                });
                debug!(actions = plan.len(), duration = plan.duration(), "lifecycle solve succeeded");
                Some(plan)
            }
            Err(Halt::Unsat(reason)) => {
                debug!(%reason, "no solution");
                None
            }
            Err(Halt::Timeout) => {
                debug!(limit_secs = params.time_limit_secs, "time limit reached");
                stats.hit_timeout = true;
                None
            }
            Err(Halt::Error(e)) => return Err(e),
        };
        Ok(SolveOutcome {
            plan,
            statistics: stats,
        })
    }
}
