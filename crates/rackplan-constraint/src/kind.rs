//! Constraint kind tags.

use std::fmt;

/// Runtime type of a constraint, used to dispatch per-kind logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
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
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 21] = [
        ConstraintKind::Among,
        ConstraintKind::Ban,
        ConstraintKind::Fence,
        ConstraintKind::Gather,
        ConstraintKind::Killed,
        ConstraintKind::Lonely,
        ConstraintKind::MaxOnline,
        ConstraintKind::Offline,
        ConstraintKind::Online,
        ConstraintKind::Overbook,
        ConstraintKind::Preserve,
        ConstraintKind::Quarantine,
        ConstraintKind::Ready,
        ConstraintKind::Root,
        ConstraintKind::Running,
        ConstraintKind::RunningCapacity,
        ConstraintKind::Seq,
        ConstraintKind::Sleeping,
        ConstraintKind::Split,
        ConstraintKind::SplitAmong,
        ConstraintKind::Spread,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Among => "among",
            ConstraintKind::Ban => "ban",
            ConstraintKind::Fence => "fence",
            ConstraintKind::Gather => "gather",
            ConstraintKind::Killed => "killed",
            ConstraintKind::Lonely => "lonely",
            ConstraintKind::MaxOnline => "maxOnline",
            ConstraintKind::Offline => "offline",
            ConstraintKind::Online => "online",
            ConstraintKind::Overbook => "overbook",
            ConstraintKind::Preserve => "preserve",
            ConstraintKind::Quarantine => "quarantine",
            ConstraintKind::Ready => "ready",
            ConstraintKind::Root => "root",
            ConstraintKind::Running => "running",
            ConstraintKind::RunningCapacity => "runningCapacity",
            ConstraintKind::Seq => "seq",
            ConstraintKind::Sleeping => "sleeping",
            ConstraintKind::Split => "split",
            ConstraintKind::SplitAmong => "splitAmong",
            ConstraintKind::Spread => "spread",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
