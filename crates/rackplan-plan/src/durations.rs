//! Per-kind action durations and transition counts, both computed by
//! visiting actions.

use std::collections::BTreeMap;
use std::fmt;

use crate::action::{
    Action, ActionKind, Allocate, BootNode, BootVm, ForgeVm, KillVm, MigrateVm, ResumeVm,
    ShutdownNode, ShutdownVm, SuspendVm,
};
use crate::event::{AllocateEvent, Hook};
use crate::plan::Plan;
use crate::visitor::ActionVisitor;

/// Duration, in seconds, of each kind of action.
///
/// A solver uses it to size the window of every action it emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDurations {
    durations: BTreeMap<ActionKind, u32>,
    fallback: u32,
}

impl Default for ActionDurations {
    fn default() -> Self {
        let durations = [
            (ActionKind::Allocate, 1),
            (ActionKind::BootNode, 6),
            (ActionKind::BootVm, 3),
            (ActionKind::ForgeVm, 1),
            (ActionKind::KillVm, 1),
            (ActionKind::MigrateVm, 5),
            (ActionKind::ResumeVm, 4),
            (ActionKind::ShutdownNode, 6),
            (ActionKind::ShutdownVm, 2),
            (ActionKind::SuspendVm, 4),
        ]
        .into_iter()
        .collect();
        Self {
            durations,
            fallback: 1,
        }
    }
}

impl ActionDurations {
    pub fn set(&mut self, kind: ActionKind, seconds: u32) -> &mut Self {
        self.durations.insert(kind, seconds);
        self
    }

    pub fn get(&self, kind: ActionKind) -> u32 {
        self.durations.get(&kind).copied().unwrap_or(self.fallback)
    }

    /// Expected duration of an action with the given operation.
    pub fn evaluate(&mut self, a: &Action) -> u32 {
        a.accept(self)
    }
}

impl ActionVisitor for ActionDurations {
    type Output = u32;

    fn visit_allocate(&mut self, _: &Action, _: &Allocate) -> u32 {
        self.get(ActionKind::Allocate)
    }

    fn visit_boot_node(&mut self, _: &Action, _: &BootNode) -> u32 {
        self.get(ActionKind::BootNode)
    }

    fn visit_boot_vm(&mut self, _: &Action, _: &BootVm) -> u32 {
        self.get(ActionKind::BootVm)
    }

    fn visit_forge_vm(&mut self, _: &Action, _: &ForgeVm) -> u32 {
        self.get(ActionKind::ForgeVm)
    }

    fn visit_kill_vm(&mut self, _: &Action, _: &KillVm) -> u32 {
        self.get(ActionKind::KillVm)
    }

    fn visit_migrate_vm(&mut self, _: &Action, _: &MigrateVm) -> u32 {
        self.get(ActionKind::MigrateVm)
    }

    fn visit_resume_vm(&mut self, _: &Action, op: &ResumeVm) -> u32 {
        // A remote resume moves the image first.
        let base = self.get(ActionKind::ResumeVm);
        if op.src == op.dst {
            base
        } else {
            base + self.get(ActionKind::MigrateVm)
        }
    }

    fn visit_shutdown_node(&mut self, _: &Action, _: &ShutdownNode) -> u32 {
        self.get(ActionKind::ShutdownNode)
    }

    fn visit_shutdown_vm(&mut self, _: &Action, _: &ShutdownVm) -> u32 {
        self.get(ActionKind::ShutdownVm)
    }

    fn visit_suspend_vm(&mut self, _: &Action, op: &SuspendVm) -> u32 {
        let base = self.get(ActionKind::SuspendVm);
        if op.src == op.dst {
            base
        } else {
            base + self.get(ActionKind::MigrateVm)
        }
    }

    fn visit_allocate_event(&mut self, _: &AllocateEvent) -> u32 {
        0
    }
}

/// Counts the actions of each kind, and the hook events, of the plans
/// it visits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionCounter {
    counts: BTreeMap<ActionKind, usize>,
    events: usize,
}

impl TransitionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_plan(&mut self, plan: &Plan) {
        for a in plan.iter() {
            a.accept(self);
            for hook in [Hook::Pre, Hook::Post] {
                for ev in a.events(hook) {
                    ev.accept(self);
                }
            }
        }
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn events(&self) -> usize {
        self.events
    }

    fn bump(&mut self, kind: ActionKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }
}

impl ActionVisitor for TransitionCounter {
    type Output = ();

    fn visit_allocate(&mut self, _: &Action, _: &Allocate) {
        self.bump(ActionKind::Allocate);
    }

    fn visit_boot_node(&mut self, _: &Action, _: &BootNode) {
        self.bump(ActionKind::BootNode);
    }

    fn visit_boot_vm(&mut self, _: &Action, _: &BootVm) {
        self.bump(ActionKind::BootVm);
    }

    fn visit_forge_vm(&mut self, _: &Action, _: &ForgeVm) {
        self.bump(ActionKind::ForgeVm);
    }

    fn visit_kill_vm(&mut self, _: &Action, _: &KillVm) {
        self.bump(ActionKind::KillVm);
    }

    fn visit_migrate_vm(&mut self, _: &Action, _: &MigrateVm) {
        self.bump(ActionKind::MigrateVm);
    }

    fn visit_resume_vm(&mut self, _: &Action, _: &ResumeVm) {
        self.bump(ActionKind::ResumeVm);
    }

    fn visit_shutdown_node(&mut self, _: &Action, _: &ShutdownNode) {
        self.bump(ActionKind::ShutdownNode);
    }

    fn visit_shutdown_vm(&mut self, _: &Action, _: &ShutdownVm) {
        self.bump(ActionKind::ShutdownVm);
    }

    fn visit_suspend_vm(&mut self, _: &Action, _: &SuspendVm) {
        self.bump(ActionKind::SuspendVm);
    }

    fn visit_allocate_event(&mut self, _: &AllocateEvent) {
        self.events += 1;
    }
}

impl fmt::Display for TransitionCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, n) in &self.counts {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{kind}: {n}")?;
            first = false;
        }
        if first {
            write!(f, "no action")?;
        }
        Ok(())
    }
}
