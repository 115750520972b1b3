//! The constraint sum type and the capability every constraint offers.

use std::collections::BTreeSet;
use std::fmt;

use rackplan_model::{Model, NodeId, VmId};

use crate::capacity::{MaxOnline, RunningCapacity};
use crate::group::{Among, Gather, Lonely, Seq, Split, SplitAmong, Spread};
use crate::kind::ConstraintKind;
use crate::node::{Offline, Online, Overbook, Quarantine};
use crate::vm::{Ban, Fence, Killed, Preserve, Ready, Root, Running, Sleeping};

/// What the planning core needs to know about a constraint.
pub trait SatConstraint {
    fn kind(&self) -> ConstraintKind;

    /// VMs the constraint talks about.
    fn involved_vms(&self) -> BTreeSet<VmId>;

    /// Nodes the constraint talks about.
    fn involved_nodes(&self) -> BTreeSet<NodeId>;

    /// `true` when the restriction holds during the whole reconfiguration,
    /// `false` when it only holds at its end.
    fn is_continuous(&self) -> bool;

    /// Discrete check of the restriction on a single model.
    fn is_satisfied(&self, mo: &Model) -> bool;
}

/// A placement constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Among(Among),
    Ban(Ban),
    Fence(Fence),
    Gather(Gather),
    Killed(Killed),
    Lonely(Lonely),
    MaxOnline(MaxOnline),
    Offline(Offline),
    Online(Online),
    Overbook(Overbook),
    Preserve(Preserve),
    Quarantine(Quarantine),
    Ready(Ready),
    Root(Root),
    Running(Running),
    RunningCapacity(RunningCapacity),
    Seq(Seq),
    Sleeping(Sleeping),
    Split(Split),
    SplitAmong(SplitAmong),
    Spread(Spread),
}

/// Forward to the wrapped constraint.
macro_rules! dispatch {
    ($self:expr, $c:ident => $e:expr) => {
        match $self {
            Constraint::Among($c) => $e,
            Constraint::Ban($c) => $e,
            Constraint::Fence($c) => $e,
            Constraint::Gather($c) => $e,
            Constraint::Killed($c) => $e,
            Constraint::Lonely($c) => $e,
            Constraint::MaxOnline($c) => $e,
            Constraint::Offline($c) => $e,
            Constraint::Online($c) => $e,
            Constraint::Overbook($c) => $e,
            Constraint::Preserve($c) => $e,
            Constraint::Quarantine($c) => $e,
            Constraint::Ready($c) => $e,
            Constraint::Root($c) => $e,
            Constraint::Running($c) => $e,
            Constraint::RunningCapacity($c) => $e,
            Constraint::Seq($c) => $e,
            Constraint::Sleeping($c) => $e,
            Constraint::Split($c) => $e,
            Constraint::SplitAmong($c) => $e,
            Constraint::Spread($c) => $e,
        }
    };
}

impl SatConstraint for Constraint {
    fn kind(&self) -> ConstraintKind {
        dispatch!(self, c => c.kind())
    }

    fn involved_vms(&self) -> BTreeSet<VmId> {
        dispatch!(self, c => c.involved_vms())
    }

    fn involved_nodes(&self) -> BTreeSet<NodeId> {
        dispatch!(self, c => c.involved_nodes())
    }

    fn is_continuous(&self) -> bool {
        dispatch!(self, c => c.is_continuous())
    }

    fn is_satisfied(&self, mo: &Model) -> bool {
        dispatch!(self, c => c.is_satisfied(mo))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, c => fmt::Display::fmt(c, f))
    }
}

macro_rules! impl_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Constraint {
                fn from(c: $variant) -> Self {
                    Constraint::$variant(c)
                }
            }
        )*
    };
}

impl_from!(
    Among,
    Ban,
    Fence,
    Gather,
    Killed,
    Lonely,
    MaxOnline,
    Offline,
    Online,
    Overbook,
    Preserve,
    Quarantine,
    Ready,
    Root,
    Running,
    RunningCapacity,
    Seq,
    Sleeping,
    Split,
    SplitAmong,
    Spread,
);

// ── Formatting helpers ────────────────────────────────────────────

pub(crate) fn fmt_set<T: fmt::Display>(f: &mut fmt::Formatter<'_>, set: &BTreeSet<T>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, e) in set.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{e}")?;
    }
    write!(f, "}}")
}

pub(crate) fn fmt_groups<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    groups: &[BTreeSet<T>],
) -> fmt::Result {
    write!(f, "[")?;
    for (i, g) in groups.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        fmt_set(f, g)?;
    }
    write!(f, "]")
}

/// Close a constraint rendering with its restriction.
pub(crate) fn fmt_restriction(f: &mut fmt::Formatter<'_>, continuous: bool) -> fmt::Result {
    if continuous {
        write!(f, ", continuous)")
    } else {
        write!(f, ", discrete)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_forwards_to_the_variant() {
        let c: Constraint = Gather::new([VmId(1), VmId(0)]).into();
        assert_eq!(c.kind(), ConstraintKind::Gather);
        assert_eq!(c.involved_vms(), BTreeSet::from([VmId(0), VmId(1)]));
        assert!(c.involved_nodes().is_empty());
        assert!(!c.is_continuous());
        assert_eq!(c.to_string(), "gather(vms={vm#0, vm#1}, discrete)");
    }

    #[test]
    fn split_among_renders_both_partitions() {
        let c: Constraint = SplitAmong::new(
            vec![BTreeSet::from([VmId(0)]), BTreeSet::from([VmId(1)])],
            vec![BTreeSet::from([NodeId(0)]), BTreeSet::from([NodeId(1)])],
        )
        .into();
        assert_eq!(
            c.to_string(),
            "splitAmong(vms=[{vm#0}, {vm#1}], nodes=[{node#0}, {node#1}], discrete)"
        );
    }
}
