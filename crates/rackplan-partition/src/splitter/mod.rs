//! Constraint splitters.
//!
//! A splitter projects one kind of constraint onto the partitions its
//! elements touch. The registry dispatches on the constraint's kind;
//! splitting a constraint of an unregistered kind fails the whole split.

mod anchored;
mod capacity;
mod group;

use std::collections::HashMap;
use std::fmt;

use rackplan_constraint::{Constraint, ConstraintKind, SatConstraint};
use tracing::trace;

use crate::error::{SplitError, SplitResult};
use crate::index::PartitionIndex;

pub use anchored::{BanSplitter, FenceSplitter, NodeAnchoredSplitter, VmAnchoredSplitter};
pub use capacity::CapacitySplitter;
pub use group::{
    AmongSplitter, SeqSplitter, SingleGroupSplitter, SplitAmongSplitter, SplitSplitter,
    SpreadSplitter,
};

/// Take the wrapped constraint out of the expected variant.
macro_rules! expect_variant {
    ($cstr:expr, $variant:ident) => {
        match $cstr {
            rackplan_constraint::Constraint::$variant(c) => c,
            other => {
                return Err($crate::error::SplitError::Mismatch {
                    expected: rackplan_constraint::ConstraintKind::$variant,
                    constraint: other.to_string(),
                });
            }
        }
    };
}
pub(crate) use expect_variant;

/// The constraints each partition receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitOutput {
    parts: Vec<Vec<Constraint>>,
}

impl SplitOutput {
    pub fn new(nb_partitions: usize) -> Self {
        Self {
            parts: vec![Vec::new(); nb_partitions],
        }
    }

    /// Hand a constraint to a partition. Unknown partitions are ignored.
    pub fn assign(&mut self, p: usize, c: Constraint) {
        match self.parts.get_mut(p) {
            Some(part) => part.push(c),
            None => trace!(partition = p, constraint = %c, "no such partition"),
        }
    }

    pub fn partition(&self, p: usize) -> &[Constraint] {
        self.parts.get(p).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn into_parts(self) -> Vec<Vec<Constraint>> {
        self.parts
    }
}

/// Projects one kind of constraint onto partitions.
pub trait ConstraintSplitter: Send + Sync {
    /// Kind of the constraints this splitter handles.
    fn kind(&self) -> ConstraintKind;

    /// Add the projection of `cstr` to every partition it matters to.
    fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()>;
}

/// One splitter per constraint kind.
pub struct SplitterRegistry {
    splitters: HashMap<ConstraintKind, Box<dyn ConstraintSplitter>>,
}

impl SplitterRegistry {
    /// A registry without any splitter.
    pub fn empty() -> Self {
        Self {
            splitters: HashMap::new(),
        }
    }

    /// Register a splitter, replacing the one for the same kind.
    pub fn register(&mut self, s: Box<dyn ConstraintSplitter>) -> Option<Box<dyn ConstraintSplitter>> {
        self.splitters.insert(s.kind(), s)
    }

    pub fn unregister(&mut self, kind: ConstraintKind) -> Option<Box<dyn ConstraintSplitter>> {
        self.splitters.remove(&kind)
    }

    pub fn get(&self, kind: ConstraintKind) -> Option<&dyn ConstraintSplitter> {
        self.splitters.get(&kind).map(Box::as_ref)
    }

    pub fn is_registered(&self, kind: ConstraintKind) -> bool {
        self.splitters.contains_key(&kind)
    }

    /// Split a single constraint.
    pub fn split(&self, cstr: &Constraint, index: &PartitionIndex, out: &mut SplitOutput) -> SplitResult<()> {
        let kind = cstr.kind();
        let splitter = self.get(kind).ok_or(SplitError::Unregistered(kind))?;
        splitter.split(cstr, index, out)
    }

    /// Split every constraint, in order.
    pub fn split_all(&self, cstrs: &[Constraint], index: &PartitionIndex) -> SplitResult<SplitOutput> {
        let mut out = SplitOutput::new(index.nb_partitions());
        for c in cstrs {
            self.split(c, index, &mut out)?;
        }
        Ok(out)
    }
}

impl Default for SplitterRegistry {
    /// A registry with a splitter for every constraint kind.
    fn default() -> Self {
        use ConstraintKind as K;
        let mut r = Self::empty();
        r.register(Box::new(BanSplitter));
        r.register(Box::new(FenceSplitter));
        for kind in [K::Preserve, K::Root, K::Running, K::Ready, K::Sleeping, K::Killed] {
            r.register(Box::new(VmAnchoredSplitter::new(kind)));
        }
        for kind in [K::Online, K::Offline, K::Quarantine, K::Overbook] {
            r.register(Box::new(NodeAnchoredSplitter::new(kind)));
        }
        r.register(Box::new(AmongSplitter));
        r.register(Box::new(SplitSplitter));
        r.register(Box::new(SplitAmongSplitter));
        r.register(Box::new(SpreadSplitter));
        r.register(Box::new(SingleGroupSplitter::new(K::Gather)));
        r.register(Box::new(SingleGroupSplitter::new(K::Lonely)));
        r.register(Box::new(SeqSplitter));
        r.register(Box::new(CapacitySplitter::new(K::MaxOnline)));
        r.register(Box::new(CapacitySplitter::new(K::RunningCapacity)));
        r
    }
}

impl fmt::Debug for SplitterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<ConstraintKind> = self.splitters.keys().copied().collect();
        kinds.sort();
        f.debug_struct("SplitterRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeSet;

    use rackplan_model::{Mapping, NodeId, VmId};

    use crate::index::PartitionIndex;

    /// Two partitions: {node#0, node#1} and {node#2, node#3}, with vm#i
    /// running on node#(i / 2) for i < 8, plus ready vm#8.
    pub fn two_partitions() -> PartitionIndex {
        let mut m = Mapping::new();
        for n in 0..4 {
            m.add_online_node(NodeId(n)).unwrap();
        }
        for v in 0..8 {
            m.add_running_vm(VmId(v), NodeId(v / 2)).unwrap();
        }
        m.add_ready_vm(VmId(8)).unwrap();
        let groups = vec![
            BTreeSet::from([NodeId(0), NodeId(1)]),
            BTreeSet::from([NodeId(2), NodeId(3)]),
        ];
        PartitionIndex::build(&m, groups).unwrap()
    }

    pub fn vms(ids: &[u32]) -> BTreeSet<VmId> {
        ids.iter().map(|i| VmId(*i)).collect()
    }

    pub fn nodes(ids: &[u32]) -> BTreeSet<NodeId> {
        ids.iter().map(|i| NodeId(*i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use rackplan_constraint::{Running, Seq};
    use rackplan_model::VmId;

    #[test]
    fn default_registry_covers_every_kind() {
        let r = SplitterRegistry::default();
        for kind in ConstraintKind::ALL {
            assert!(r.is_registered(kind), "{kind} has no splitter");
        }
    }

    #[test]
    fn unregistered_kind_fails_the_split() {
        let idx = two_partitions();
        let mut r = SplitterRegistry::default();
        r.unregister(ConstraintKind::Running);
        let cstrs = vec![Running { vm: VmId(0) }.into()];
        assert_eq!(
            r.split_all(&cstrs, &idx).unwrap_err(),
            SplitError::Unregistered(ConstraintKind::Running)
        );
    }

    #[test]
    fn constraints_are_routed_in_order() {
        let idx = two_partitions();
        let cstrs: Vec<Constraint> = vec![
            Running { vm: VmId(5) }.into(),
            Running { vm: VmId(0) }.into(),
            Seq { vms: vec![VmId(1), VmId(2)] }.into(),
        ];
        let out = SplitterRegistry::default().split_all(&cstrs, &idx).unwrap();
        assert_eq!(out.partition(0), &[cstrs[1].clone(), cstrs[2].clone()]);
        assert_eq!(out.partition(1), &[cstrs[0].clone()]);
        assert!(out.partition(7).is_empty());
    }

    #[test]
    fn splitter_rejects_foreign_variants() {
        let idx = two_partitions();
        let mut out = SplitOutput::new(2);
        let err = BanSplitter
            .split(&Running { vm: VmId(0) }.into(), &idx, &mut out)
            .unwrap_err();
        assert!(matches!(err, SplitError::Mismatch { expected: ConstraintKind::Ban, .. }));
    }
}
