//! Actions — timed operations moving VMs and nodes between states.
//!
//! Every operation declares the state transition of the element it
//! governs and checks that transition's precondition before touching the
//! model. `apply` checks every precondition (the operation's and those of
//! its hook events) up front, so a refused action never leaves a
//! half-applied model behind.

use std::fmt;

use rackplan_model::{Mapping, Model, NodeId, NodeState, VmId, VmState, VmStateKind};

use crate::error::{PlanError, PlanResult};
use crate::event::{Event, Hook};
use crate::visitor::ActionVisitor;

// ── Operations ────────────────────────────────────────────────────

/// Set the amount of a resource a running VM consumes on its host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allocate {
    pub vm: VmId,
    pub host: NodeId,
    pub resource: String,
    pub amount: u32,
}

/// Bring an offline node online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BootNode {
    pub node: NodeId,
}

/// Start a ready VM on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BootVm {
    pub vm: VmId,
    pub dst: NodeId,
}

/// Materialize a VM: init to ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ForgeVm {
    pub vm: VmId,
}

/// Terminate a VM. Without a host, the VM is expected to be ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KillVm {
    pub vm: VmId,
    pub host: Option<NodeId>,
}

/// Live-migrate a running VM between two distinct online nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MigrateVm {
    pub vm: VmId,
    pub src: NodeId,
    pub dst: NodeId,
    pub bandwidth: u32,
}

/// Resume a sleeping VM, possibly on another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResumeVm {
    pub vm: VmId,
    pub src: NodeId,
    pub dst: NodeId,
}

/// Turn an empty online node off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShutdownNode {
    pub node: NodeId,
}

/// Stop a running VM, leaving it ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShutdownVm {
    pub vm: VmId,
    pub node: NodeId,
}

/// Suspend a running VM to disk, possibly on another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuspendVm {
    pub vm: VmId,
    pub src: NodeId,
    pub dst: NodeId,
}

/// The closed set of operations an action can perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    Allocate(Allocate),
    BootNode(BootNode),
    BootVm(BootVm),
    ForgeVm(ForgeVm),
    KillVm(KillVm),
    MigrateVm(MigrateVm),
    ResumeVm(ResumeVm),
    ShutdownNode(ShutdownNode),
    ShutdownVm(ShutdownVm),
    SuspendVm(SuspendVm),
}

/// Tag of an operation, used wherever only the variant matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Allocate,
    BootNode,
    BootVm,
    ForgeVm,
    KillVm,
    MigrateVm,
    ResumeVm,
    ShutdownNode,
    ShutdownVm,
    SuspendVm,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::Allocate,
        ActionKind::BootNode,
        ActionKind::BootVm,
        ActionKind::ForgeVm,
        ActionKind::KillVm,
        ActionKind::MigrateVm,
        ActionKind::ResumeVm,
        ActionKind::ShutdownNode,
        ActionKind::ShutdownVm,
        ActionKind::SuspendVm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Allocate => "allocate",
            ActionKind::BootNode => "bootNode",
            ActionKind::BootVm => "boot",
            ActionKind::ForgeVm => "forge",
            ActionKind::KillVm => "kill",
            ActionKind::MigrateVm => "migrate",
            ActionKind::ResumeVm => "resume",
            ActionKind::ShutdownNode => "shutdownNode",
            ActionKind::ShutdownVm => "shutdown",
            ActionKind::SuspendVm => "suspend",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `current → next` lifecycle transition of the VM an operation governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmTransition {
    pub vm: VmId,
    pub current: VmStateKind,
    pub next: VmStateKind,
}

/// `current → next` transition of the node an operation governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTransition {
    pub node: NodeId,
    pub current: NodeState,
    pub next: NodeState,
}

impl Operation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Operation::Allocate(_) => ActionKind::Allocate,
            Operation::BootNode(_) => ActionKind::BootNode,
            Operation::BootVm(_) => ActionKind::BootVm,
            Operation::ForgeVm(_) => ActionKind::ForgeVm,
            Operation::KillVm(_) => ActionKind::KillVm,
            Operation::MigrateVm(_) => ActionKind::MigrateVm,
            Operation::ResumeVm(_) => ActionKind::ResumeVm,
            Operation::ShutdownNode(_) => ActionKind::ShutdownNode,
            Operation::ShutdownVm(_) => ActionKind::ShutdownVm,
            Operation::SuspendVm(_) => ActionKind::SuspendVm,
        }
    }

    /// The VM whose lifecycle the operation changes, if any.
    pub fn vm_transition(&self) -> Option<VmTransition> {
        use VmStateKind::*;
        let (vm, current, next) = match self {
            Operation::BootVm(op) => (op.vm, Ready, Running),
            Operation::ForgeVm(op) => (op.vm, Init, Ready),
            Operation::KillVm(op) => {
                let current = if op.host.is_some() { Running } else { Ready };
                (op.vm, current, Killed)
            }
            Operation::MigrateVm(op) => (op.vm, Running, Running),
            Operation::ResumeVm(op) => (op.vm, Sleeping, Running),
            Operation::ShutdownVm(op) => (op.vm, Running, Ready),
            Operation::SuspendVm(op) => (op.vm, Running, Sleeping),
            Operation::Allocate(_) | Operation::BootNode(_) | Operation::ShutdownNode(_) => {
                return None;
            }
        };
        Some(VmTransition { vm, current, next })
    }

    /// The node whose state the operation changes, if any.
    pub fn node_transition(&self) -> Option<NodeTransition> {
        match self {
            Operation::BootNode(op) => Some(NodeTransition {
                node: op.node,
                current: NodeState::Offline,
                next: NodeState::Online,
            }),
            Operation::ShutdownNode(op) => Some(NodeTransition {
                node: op.node,
                current: NodeState::Online,
                next: NodeState::Offline,
            }),
            _ => None,
        }
    }

    /// The VM the operation is about, transition or not.
    pub fn vm(&self) -> Option<VmId> {
        match self {
            Operation::Allocate(op) => Some(op.vm),
            _ => self.vm_transition().map(|t| t.vm),
        }
    }

    /// Every node the operation references.
    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Operation::Allocate(op) => vec![op.host],
            Operation::BootNode(op) => vec![op.node],
            Operation::BootVm(op) => vec![op.dst],
            Operation::ForgeVm(_) => Vec::new(),
            Operation::KillVm(op) => op.host.into_iter().collect(),
            Operation::MigrateVm(op) => vec![op.src, op.dst],
            Operation::ResumeVm(op) => vec![op.src, op.dst],
            Operation::ShutdownNode(op) => vec![op.node],
            Operation::ShutdownVm(op) => vec![op.node],
            Operation::SuspendVm(op) => vec![op.src, op.dst],
        }
    }

    /// Whether the precondition of the operation holds on the model.
    pub fn is_applicable(&self, mo: &Model) -> bool {
        let m: &Mapping = mo.mapping();
        match self {
            Operation::Allocate(op) => {
                m.vm_state(op.vm) == Some(VmState::Running(op.host))
                    && mo.resource(&op.resource).is_some()
            }
            Operation::BootNode(op) => m.is_offline(op.node),
            Operation::BootVm(op) => m.is_ready(op.vm) && m.is_online(op.dst),
            Operation::ForgeVm(op) => !m.contains_vm(op.vm),
            Operation::KillVm(op) => match (op.host, m.vm_state(op.vm)) {
                (Some(h), Some(VmState::Running(n) | VmState::Sleeping(n))) => h == n,
                (None, Some(VmState::Ready)) => true,
                _ => false,
            },
            Operation::MigrateVm(op) => {
                op.src != op.dst
                    && m.vm_state(op.vm) == Some(VmState::Running(op.src))
                    && m.is_online(op.src)
                    && m.is_online(op.dst)
            }
            Operation::ResumeVm(op) => {
                m.vm_state(op.vm) == Some(VmState::Sleeping(op.src)) && m.is_online(op.dst)
            }
            Operation::ShutdownNode(op) => m.is_online(op.node) && !m.hosts_vms(op.node),
            Operation::ShutdownVm(op) => m.vm_state(op.vm) == Some(VmState::Running(op.node)),
            Operation::SuspendVm(op) => {
                m.vm_state(op.vm) == Some(VmState::Running(op.src)) && m.is_online(op.dst)
            }
        }
    }

    /// Perform the mutation. Only called once the precondition holds.
    fn commit(&self, mo: &mut Model) -> bool {
        match self {
            Operation::Allocate(op) => match mo.resource_mut(&op.resource) {
                Ok(rc) => {
                    rc.set_consumption(op.vm, op.amount);
                    true
                }
                Err(_) => false,
            },
            Operation::BootNode(op) => mo.mapping_mut().add_online_node(op.node).is_ok(),
            Operation::BootVm(op) => mo.mapping_mut().add_running_vm(op.vm, op.dst).is_ok(),
            Operation::ForgeVm(op) => mo.mapping_mut().add_ready_vm(op.vm).is_ok(),
            Operation::KillVm(op) => mo.mapping_mut().remove_vm(op.vm).is_ok(),
            Operation::MigrateVm(op) => mo.mapping_mut().add_running_vm(op.vm, op.dst).is_ok(),
            Operation::ResumeVm(op) => mo.mapping_mut().add_running_vm(op.vm, op.dst).is_ok(),
            Operation::ShutdownNode(op) => mo.mapping_mut().add_offline_node(op.node).is_ok(),
            Operation::ShutdownVm(op) => mo.mapping_mut().add_ready_vm(op.vm).is_ok(),
            Operation::SuspendVm(op) => mo.mapping_mut().add_sleeping_vm(op.vm, op.dst).is_ok(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Allocate(op) => write!(
                f,
                "allocate(vm={}, on={}, rc={}, amount={})",
                op.vm, op.host, op.resource, op.amount
            ),
            Operation::BootNode(op) => write!(f, "bootNode(node={})", op.node),
            Operation::BootVm(op) => write!(f, "boot(vm={}, on={})", op.vm, op.dst),
            Operation::ForgeVm(op) => write!(f, "forge(vm={})", op.vm),
            Operation::KillVm(op) => match op.host {
                Some(h) => write!(f, "kill(vm={}, on={})", op.vm, h),
                None => write!(f, "kill(vm={})", op.vm),
            },
            Operation::MigrateVm(op) => write!(
                f,
                "migrate(vm={}, from={}, to={}, bw={})",
                op.vm, op.src, op.dst, op.bandwidth
            ),
            Operation::ResumeVm(op) => {
                write!(f, "resume(vm={}, from={}, to={})", op.vm, op.src, op.dst)
            }
            Operation::ShutdownNode(op) => write!(f, "shutdownNode(node={})", op.node),
            Operation::ShutdownVm(op) => write!(f, "shutdown(vm={}, on={})", op.vm, op.node),
            Operation::SuspendVm(op) => {
                write!(f, "suspend(vm={}, from={}, to={})", op.vm, op.src, op.dst)
            }
        }
    }
}

// ── Action ────────────────────────────────────────────────────────

/// An operation scheduled on a `[start, end]` window, with the events of
/// its pre and post hooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    start: u32,
    end: u32,
    op: Operation,
    pre: Vec<Event>,
    post: Vec<Event>,
}

impl Action {
    pub fn new(start: u32, end: u32, op: Operation) -> PlanResult<Self> {
        if start > end {
            return Err(PlanError::InvalidWindow { start, end });
        }
        Ok(Self {
            start,
            end,
            op,
            pre: Vec::new(),
            post: Vec::new(),
        })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn kind(&self) -> ActionKind {
        self.op.kind()
    }

    /// Whether the two windows share some time.
    pub fn overlaps(&self, other: &Action) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Register an event on a hook. Returns `false` if already registered.
    pub fn add_event(&mut self, hook: Hook, ev: Event) -> bool {
        let events = match hook {
            Hook::Pre => &mut self.pre,
            Hook::Post => &mut self.post,
        };
        if events.contains(&ev) {
            return false;
        }
        events.push(ev);
        true
    }

    /// Builder form of [`Action::add_event`].
    pub fn with_event(mut self, hook: Hook, ev: Event) -> Self {
        self.add_event(hook, ev);
        self
    }

    pub fn events(&self, hook: Hook) -> &[Event] {
        match hook {
            Hook::Pre => &self.pre,
            Hook::Post => &self.post,
        }
    }

    /// Whether [`Action::apply`] would succeed on the model.
    pub fn is_applicable(&self, mo: &Model) -> bool {
        self.op.is_applicable(mo)
            && self.pre.iter().all(|e| e.is_applicable(mo))
            && self.post.iter().all(|e| e.is_applicable(mo))
    }

    /// Apply the pre events, the operation, then the post events.
    ///
    /// Returns `false` without touching the model when any precondition
    /// fails. Hook events only need their resource to be attached, which
    /// no operation changes, so checking them against the initial model
    /// is exact.
    pub fn apply(&self, mo: &mut Model) -> bool {
        if !self.is_applicable(mo) {
            return false;
        }
        let mut ok = true;
        for ev in &self.pre {
            ok &= ev.apply(mo);
        }
        ok &= self.op.commit(mo);
        for ev in &self.post {
            ok &= ev.apply(mo);
        }
        ok
    }

    pub fn accept<V: ActionVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.op {
            Operation::Allocate(op) => visitor.visit_allocate(self, op),
            Operation::BootNode(op) => visitor.visit_boot_node(self, op),
            Operation::BootVm(op) => visitor.visit_boot_vm(self, op),
            Operation::ForgeVm(op) => visitor.visit_forge_vm(self, op),
            Operation::KillVm(op) => visitor.visit_kill_vm(self, op),
            Operation::MigrateVm(op) => visitor.visit_migrate_vm(self, op),
            Operation::ResumeVm(op) => visitor.visit_resume_vm(self, op),
            Operation::ShutdownNode(op) => visitor.visit_shutdown_node(self, op),
            Operation::ShutdownVm(op) => visitor.visit_shutdown_vm(self, op),
            Operation::SuspendVm(op) => visitor.visit_suspend_vm(self, op),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.start, self.end, self.op)?;
        for (hook, events) in [(Hook::Pre, &self.pre), (Hook::Post, &self.post)] {
            if events.is_empty() {
                continue;
            }
            write!(f, " @{hook}=[")?;
            for (i, ev) in events.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{ev}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

// ── Constructors ──────────────────────────────────────────────────

impl Action {
    pub fn allocate(
        vm: VmId,
        host: NodeId,
        resource: impl Into<String>,
        amount: u32,
        start: u32,
        end: u32,
    ) -> PlanResult<Self> {
        let op = Allocate {
            vm,
            host,
            resource: resource.into(),
            amount,
        };
        Self::new(start, end, Operation::Allocate(op))
    }

    pub fn boot_node(node: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::BootNode(BootNode { node }))
    }

    pub fn boot_vm(vm: VmId, dst: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::BootVm(BootVm { vm, dst }))
    }

    pub fn forge_vm(vm: VmId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::ForgeVm(ForgeVm { vm }))
    }

    pub fn kill_vm(vm: VmId, host: Option<NodeId>, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::KillVm(KillVm { vm, host }))
    }

    pub fn migrate_vm(
        vm: VmId,
        src: NodeId,
        dst: NodeId,
        bandwidth: u32,
        start: u32,
        end: u32,
    ) -> PlanResult<Self> {
        let op = MigrateVm {
            vm,
            src,
            dst,
            bandwidth,
        };
        Self::new(start, end, Operation::MigrateVm(op))
    }

    pub fn resume_vm(vm: VmId, src: NodeId, dst: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::ResumeVm(ResumeVm { vm, src, dst }))
    }

    pub fn shutdown_node(node: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::ShutdownNode(ShutdownNode { node }))
    }

    pub fn shutdown_vm(vm: VmId, node: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::ShutdownVm(ShutdownVm { vm, node }))
    }

    pub fn suspend_vm(vm: VmId, src: NodeId, dst: NodeId, start: u32, end: u32) -> PlanResult<Self> {
        Self::new(start, end, Operation::SuspendVm(SuspendVm { vm, src, dst }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AllocateEvent;
    use rackplan_model::ShareableResource;

    /// Two online nodes, one offline node, one VM running on the first
    /// node, one sleeping on the second, one ready.
    fn fixture() -> (Model, [NodeId; 3], [VmId; 4]) {
        let mut mo = Model::new();
        let n0 = mo.new_node();
        let n1 = mo.new_node();
        let n2 = mo.new_node();
        let (v0, v1, v2, v3) = (mo.new_vm(), mo.new_vm(), mo.new_vm(), mo.new_vm());
        let m = mo.mapping_mut();
        m.add_online_node(n0).unwrap();
        m.add_online_node(n1).unwrap();
        m.add_offline_node(n2).unwrap();
        m.add_running_vm(v0, n0).unwrap();
        m.add_sleeping_vm(v1, n1).unwrap();
        m.add_ready_vm(v2).unwrap();
        mo.attach(ShareableResource::new("cpu")).unwrap();
        (mo, [n0, n1, n2], [v0, v1, v2, v3])
    }

    fn refused(a: Action) {
        let (mut mo, _, _) = fixture();
        let before = mo.clone();
        assert!(!a.apply(&mut mo), "{a} should be refused");
        assert_eq!(mo, before, "{a} mutated the model");
    }

    #[test]
    fn refused_actions_leave_the_model_untouched() {
        let (_, [n0, n1, n2], [v0, v1, v2, v3]) = fixture();
        refused(Action::allocate(v0, n1, "cpu", 2, 0, 1).unwrap());
        refused(Action::allocate(v0, n0, "mem", 2, 0, 1).unwrap());
        refused(Action::boot_node(n0, 0, 1).unwrap());
        refused(Action::boot_vm(v0, n1, 0, 1).unwrap());
        refused(Action::boot_vm(v2, n2, 0, 1).unwrap());
        refused(Action::forge_vm(v0, 0, 1).unwrap());
        refused(Action::kill_vm(v0, Some(n1), 0, 1).unwrap());
        refused(Action::kill_vm(v0, None, 0, 1).unwrap());
        refused(Action::kill_vm(v3, None, 0, 1).unwrap());
        refused(Action::migrate_vm(v0, n0, n2, 10, 0, 1).unwrap());
        refused(Action::migrate_vm(v1, n1, n0, 10, 0, 1).unwrap());
        refused(Action::resume_vm(v0, n0, n1, 0, 1).unwrap());
        refused(Action::resume_vm(v1, n1, n2, 0, 1).unwrap());
        refused(Action::shutdown_node(n0, 0, 1).unwrap());
        refused(Action::shutdown_node(n2, 0, 1).unwrap());
        refused(Action::shutdown_vm(v1, n1, 0, 1).unwrap());
        refused(Action::suspend_vm(v2, n0, n0, 0, 1).unwrap());
        refused(Action::suspend_vm(v0, n0, n2, 0, 1).unwrap());
    }

    #[test]
    fn failing_hook_event_blocks_the_whole_action() {
        let (_, [_, n1, _], [_, v1, _, _]) = fixture();
        let a = Action::resume_vm(v1, n1, n1, 0, 3)
            .unwrap()
            .with_event(Hook::Pre, Event::Allocate(AllocateEvent::new(v1, "cpu", 2)))
            .with_event(Hook::Post, Event::Allocate(AllocateEvent::new(v1, "gpu", 1)));
        refused(a);
    }

    #[test]
    fn hook_events_apply_around_the_operation() {
        let (mut mo, [_, n1, _], [_, v1, _, _]) = fixture();
        let a = Action::resume_vm(v1, n1, n1, 0, 3)
            .unwrap()
            .with_event(Hook::Post, Event::Allocate(AllocateEvent::new(v1, "cpu", 2)));
        assert!(a.apply(&mut mo));
        assert!(mo.mapping().is_running(v1));
        assert_eq!(mo.resource("cpu").map(|rc| rc.consumption(v1)), Some(2));
    }

    #[test]
    fn add_event_rejects_duplicates() {
        let mut a = Action::forge_vm(VmId(0), 0, 1).unwrap();
        let ev = Event::Allocate(AllocateEvent::new(VmId(0), "cpu", 1));
        assert!(a.add_event(Hook::Pre, ev.clone()));
        assert!(!a.add_event(Hook::Pre, ev.clone()));
        assert!(a.add_event(Hook::Post, ev));
    }

    #[test]
    fn boot_node_applies_once() {
        let (mut mo, [_, _, n2], _) = fixture();
        let a = Action::boot_node(n2, 0, 5).unwrap();
        assert!(a.apply(&mut mo));
        assert!(mo.mapping().is_online(n2));

        let after = mo.clone();
        assert!(!a.apply(&mut mo));
        assert_eq!(mo, after);
    }

    #[test]
    fn shutdown_node_requires_empty_node() {
        let (mut mo, [n0, _, _], [v0, _, _, _]) = fixture();
        assert!(!Action::shutdown_node(n0, 0, 1).unwrap().apply(&mut mo));
        assert!(Action::kill_vm(v0, Some(n0), 0, 1).unwrap().apply(&mut mo));
        assert!(Action::shutdown_node(n0, 1, 2).unwrap().apply(&mut mo));
        assert!(mo.mapping().is_offline(n0));
    }

    #[test]
    fn migrate_to_the_same_node_is_refused() {
        let (mut mo, [n0, n1, _], [v0, _, _, _]) = fixture();
        let before = mo.clone();
        assert!(!Action::migrate_vm(v0, n0, n0, 100, 0, 2).unwrap().apply(&mut mo));
        assert_eq!(mo, before);

        assert!(Action::migrate_vm(v0, n0, n1, 100, 0, 2).unwrap().apply(&mut mo));
        assert_eq!(mo.mapping().vm_location(v0), Some(n1));
    }

    #[test]
    fn lifecycle_round_trip() {
        let mut mo = Model::new();
        let n = mo.new_node();
        let m = mo.new_node();
        let vm = mo.new_vm();
        mo.mapping_mut().add_online_node(n).unwrap();
        mo.mapping_mut().add_online_node(m).unwrap();

        // Out of order: resume before the VM ever slept.
        let resume = Action::resume_vm(vm, m, n, 6, 7).unwrap();
        let before = mo.clone();
        assert!(!resume.apply(&mut mo));
        assert_eq!(mo, before);

        assert!(Action::forge_vm(vm, 0, 1).unwrap().apply(&mut mo));
        assert_eq!(mo.mapping().vm_state(vm), Some(VmState::Ready));

        assert!(!resume.apply(&mut mo));

        assert!(Action::boot_vm(vm, n, 1, 3).unwrap().apply(&mut mo));
        assert_eq!(mo.mapping().vm_state(vm), Some(VmState::Running(n)));

        let before = mo.clone();
        assert!(!resume.apply(&mut mo));
        assert_eq!(mo, before);

        assert!(Action::suspend_vm(vm, n, m, 3, 6).unwrap().apply(&mut mo));
        assert_eq!(mo.mapping().vm_state(vm), Some(VmState::Sleeping(m)));

        assert!(resume.apply(&mut mo));
        assert_eq!(mo.mapping().vm_state(vm), Some(VmState::Running(n)));
    }

    #[test]
    fn transitions_describe_each_variant() {
        let a = Action::kill_vm(VmId(1), None, 0, 1).unwrap();
        let t = a.operation().vm_transition().unwrap();
        assert_eq!((t.current, t.next), (VmStateKind::Ready, VmStateKind::Killed));

        let a = Action::shutdown_node(NodeId(0), 0, 1).unwrap();
        assert!(a.operation().vm_transition().is_none());
        let t = a.operation().node_transition().unwrap();
        assert_eq!((t.current, t.next), (NodeState::Online, NodeState::Offline));
    }

    #[test]
    fn window_must_be_ordered() {
        assert_eq!(
            Action::boot_node(NodeId(0), 5, 2),
            Err(PlanError::InvalidWindow { start: 5, end: 2 })
        );
    }

    #[test]
    fn display_shows_window_operation_and_hooks() {
        let a = Action::boot_vm(VmId(1), NodeId(2), 3, 5)
            .unwrap()
            .with_event(Hook::Post, Event::Allocate(AllocateEvent::new(VmId(1), "cpu", 4)));
        assert_eq!(
            a.to_string(),
            "3:5 boot(vm=vm#1, on=node#2) @post=[allocate(vm=vm#1, rc=cpu, amount=4)]"
        );
    }
}
