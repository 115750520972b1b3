//! Double dispatch over the closed action set.
//!
//! A consumer needing per-variant logic implements [`ActionVisitor`] and
//! hands itself to [`Action::accept`](crate::Action::accept); the action
//! calls back the method matching its operation.

use crate::action::{
    Action, Allocate, BootNode, BootVm, ForgeVm, KillVm, MigrateVm, ResumeVm, ShutdownNode,
    ShutdownVm, SuspendVm,
};
use crate::event::AllocateEvent;

pub trait ActionVisitor {
    type Output;

    fn visit_allocate(&mut self, a: &Action, op: &Allocate) -> Self::Output;
    fn visit_boot_node(&mut self, a: &Action, op: &BootNode) -> Self::Output;
    fn visit_boot_vm(&mut self, a: &Action, op: &BootVm) -> Self::Output;
    fn visit_forge_vm(&mut self, a: &Action, op: &ForgeVm) -> Self::Output;
    fn visit_kill_vm(&mut self, a: &Action, op: &KillVm) -> Self::Output;
    fn visit_migrate_vm(&mut self, a: &Action, op: &MigrateVm) -> Self::Output;
    fn visit_resume_vm(&mut self, a: &Action, op: &ResumeVm) -> Self::Output;
    fn visit_shutdown_node(&mut self, a: &Action, op: &ShutdownNode) -> Self::Output;
    fn visit_shutdown_vm(&mut self, a: &Action, op: &ShutdownVm) -> Self::Output;
    fn visit_suspend_vm(&mut self, a: &Action, op: &SuspendVm) -> Self::Output;

    fn visit_allocate_event(&mut self, ev: &AllocateEvent) -> Self::Output;
}
