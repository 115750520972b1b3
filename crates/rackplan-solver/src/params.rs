//! Solving parameters.

use serde::{Deserialize, Serialize};

use rackplan_plan::{ActionDurations, ActionKind};

/// Parameters shared by every solve call of a planning request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Time limit of a single solve call in seconds, 0 for none.
    pub time_limit_secs: u64,
    /// Keep searching for better plans after the first one.
    pub optimize: bool,
    /// Only manage the VMs involved in a violated constraint.
    pub repair: bool,
    pub durations: DurationSettings,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            time_limit_secs: 0,
            optimize: false,
            repair: false,
            durations: DurationSettings::default(),
        }
    }
}

/// Duration of each kind of action, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationSettings {
    pub allocate: u32,
    pub boot_node: u32,
    pub boot_vm: u32,
    pub forge_vm: u32,
    pub kill_vm: u32,
    pub migrate_vm: u32,
    pub resume_vm: u32,
    pub shutdown_node: u32,
    pub shutdown_vm: u32,
    pub suspend_vm: u32,
}

impl Default for DurationSettings {
    fn default() -> Self {
        let d = ActionDurations::default();
        Self {
            allocate: d.get(ActionKind::Allocate),
            boot_node: d.get(ActionKind::BootNode),
            boot_vm: d.get(ActionKind::BootVm),
            forge_vm: d.get(ActionKind::ForgeVm),
            kill_vm: d.get(ActionKind::KillVm),
            migrate_vm: d.get(ActionKind::MigrateVm),
            resume_vm: d.get(ActionKind::ResumeVm),
            shutdown_node: d.get(ActionKind::ShutdownNode),
            shutdown_vm: d.get(ActionKind::ShutdownVm),
            suspend_vm: d.get(ActionKind::SuspendVm),
        }
    }
}

impl DurationSettings {
    pub fn to_action_durations(&self) -> ActionDurations {
        let mut d = ActionDurations::default();
        d.set(ActionKind::Allocate, self.allocate)
            .set(ActionKind::BootNode, self.boot_node)
            .set(ActionKind::BootVm, self.boot_vm)
            .set(ActionKind::ForgeVm, self.forge_vm)
            .set(ActionKind::KillVm, self.kill_vm)
            .set(ActionKind::MigrateVm, self.migrate_vm)
            .set(ActionKind::ResumeVm, self.resume_vm)
            .set(ActionKind::ShutdownNode, self.shutdown_node)
            .set(ActionKind::ShutdownVm, self.shutdown_vm)
            .set(ActionKind::SuspendVm, self.suspend_vm);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let p: Parameters =
            serde_json::from_str(r#"{"optimize": true, "durations": {"boot_vm": 9}}"#).unwrap();
        assert!(p.optimize);
        assert_eq!(p.time_limit_secs, 0);
        let d = p.durations.to_action_durations();
        assert_eq!(d.get(ActionKind::BootVm), 9);
        assert_eq!(d.get(ActionKind::BootNode), DurationSettings::default().boot_node);
    }
}
