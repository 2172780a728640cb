//! Comparer registry and the segment hold graph they share

use super::comparer::Comparer;
use super::graph::HoldGraph;
use crate::errors::{EseError, EseResult};
use crate::features::execution_record::RecordTree;
use crate::features::hold_graph::domain::StepOutcome;
use crate::features::write_site::WriteSiteGraph;
use crate::shared::models::{ExecRecordId, ProgramPoint, SegmentId};
use crate::shared::ports::{PathSource, PathView};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Scheduler {
    comparers: BTreeMap<ProgramPoint, Comparer>,
    hold: HoldGraph,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn point(tree: &RecordTree, record: ExecRecordId) -> EseResult<ProgramPoint> {
        Ok(tree.get(record)?.point.clone())
    }

    fn existing(&self, point: &ProgramPoint, record: ExecRecordId) -> EseResult<&Comparer> {
        self.comparers
            .get(point)
            .ok_or_else(|| EseError::unknown("comparer for record", record.0))
    }

    pub fn add_lineage(&mut self, parent: SegmentId, child: SegmentId) {
        self.hold.add_lineage_edge(parent, child);
    }

    pub fn retire_segment(&mut self, segment: SegmentId) {
        self.hold.retire(segment);
    }

    pub fn notify_new(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        let point = Self::point(tree, record)?;
        self.comparers
            .entry(point)
            .or_default()
            .notify_new(record, tree, &mut self.hold, out)
    }

    pub fn notify_executed(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        let point = Self::point(tree, record)?;
        self.comparers
            .entry(point)
            .or_default()
            .notify_executed(record, tree, &mut self.hold, out)
    }

    pub fn notify_terminated(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        graph: &WriteSiteGraph,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        let point = Self::point(tree, record)?;
        self.comparers
            .entry(point)
            .or_default()
            .notify_terminated(record, tree, &mut self.hold, graph, out)
    }

    pub fn notify_reterminated(
        &mut self,
        record: ExecRecordId,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<()> {
        let point = Self::point(tree, record)?;
        self.comparers
            .get_mut(&point)
            .ok_or_else(|| EseError::unknown("comparer for record", record.0))?
            .notify_reterminated(record, tree, graph)
    }

    pub fn check_path(
        &self,
        record: ExecRecordId,
        view: &dyn PathView,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<Option<ExecRecordId>> {
        let point = Self::point(tree, record)?;
        match self.comparers.get(&point) {
            Some(comparer) => comparer.check_path(record, view, tree, graph),
            None => Ok(None),
        }
    }

    pub fn check_terminated(
        &self,
        terminated: ExecRecordId,
        paths: &dyn PathSource,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<Vec<ExecRecordId>> {
        let point = Self::point(tree, terminated)?;
        self.existing(&point, terminated)?
            .check_terminated(terminated, paths, tree, graph)
    }

    pub fn prune(
        &mut self,
        terminated: ExecRecordId,
        victim: ExecRecordId,
        tree: &mut RecordTree,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        let point = Self::point(tree, victim)?;
        self.comparers
            .get_mut(&point)
            .ok_or_else(|| EseError::unknown("comparer for record", victim.0))?
            .prune(terminated, victim, tree, &mut self.hold, out)
    }

    pub fn is_released(&self, record: ExecRecordId, tree: &RecordTree) -> EseResult<bool> {
        let point = Self::point(tree, record)?;
        Ok(self
            .comparers
            .get(&point)
            .is_some_and(|c| c.is_released(record)))
    }

    pub fn is_held(&self, record: ExecRecordId, tree: &RecordTree) -> EseResult<bool> {
        let point = Self::point(tree, record)?;
        Ok(self.comparers.get(&point).is_some_and(|c| c.is_held(record)))
    }

    pub fn hold_graph(&self) -> &HoldGraph {
        &self.hold
    }

    pub fn comparer_count(&self) -> usize {
        self.comparers.len()
    }

    pub fn cached_records(&self) -> usize {
        self.comparers.values().map(|c| c.cache().len()).sum()
    }

    pub fn comparer(&self, point: &ProgramPoint) -> Option<&Comparer> {
        self.comparers.get(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::execution_record::RecordSeed;
    use crate::shared::models::{BlockId, FunctionId, InstLocation, PathId, RecordId};

    fn seed(path: u32) -> RecordSeed {
        RecordSeed {
            static_record: RecordId(0),
            point: ProgramPoint::new(InstLocation::new(FunctionId(0), BlockId(1), 0), vec![]),
            constraints: Vec::new(),
            path: Some(PathId(path)),
            in_exit_function: false,
        }
    }

    fn root_seed() -> RecordSeed {
        RecordSeed {
            point: ProgramPoint::new(InstLocation::new(FunctionId(0), BlockId(0), 0), vec![]),
            ..seed(0)
        }
    }

    #[test]
    fn test_sibling_waits_on_executed_record_at_same_point() {
        let mut tree = RecordTree::new();
        let mut sched = Scheduler::new();
        let mut out = StepOutcome::default();

        let root = tree.create(None, root_seed()).unwrap().id;
        sched.notify_new(root, &mut tree, &mut out).unwrap();
        sched.notify_executed(root, &mut tree, &mut out).unwrap();
        tree.mark_shared(root).unwrap();

        let left = tree.create(Some(root), seed(0)).unwrap();
        sched.add_lineage(SegmentId(0), tree.get(left.id).unwrap().current_segment);
        let right = tree.create(Some(root), seed(1)).unwrap();
        sched.add_lineage(SegmentId(0), tree.get(right.id).unwrap().current_segment);

        sched.notify_new(left.id, &mut tree, &mut out).unwrap();
        sched.notify_new(right.id, &mut tree, &mut out).unwrap();
        assert!(out.holds.is_empty(), "nothing pending at the fork point yet");

        sched.notify_executed(left.id, &mut tree, &mut out).unwrap();
        assert!(sched.is_held(right.id, &tree).unwrap());
        assert_eq!(out.holds.iter().copied().collect::<Vec<_>>(), vec![PathId(1)]);
        assert_eq!(tree.get(right.id).unwrap().holder, Some(left.id));
        assert!(sched.hold_graph().is_acyclic());
    }

    #[test]
    fn test_termination_releases_waiters() {
        let graph = WriteSiteGraph::new();
        let mut tree = RecordTree::new();
        let mut sched = Scheduler::new();
        let mut out = StepOutcome::default();

        let root = tree.create(None, root_seed()).unwrap().id;
        sched.notify_new(root, &mut tree, &mut out).unwrap();
        sched.notify_executed(root, &mut tree, &mut out).unwrap();
        tree.mark_shared(root).unwrap();
        let left = tree.create(Some(root), seed(0)).unwrap().id;
        let right = tree.create(Some(root), seed(1)).unwrap().id;
        sched.notify_new(left, &mut tree, &mut out).unwrap();
        sched.notify_new(right, &mut tree, &mut out).unwrap();
        sched.notify_executed(left, &mut tree, &mut out).unwrap();

        tree.get_mut(left).unwrap().state = crate::features::execution_record::RecordState::Terminated;
        let mut out = StepOutcome::default();
        sched.notify_terminated(left, &mut tree, &graph, &mut out).unwrap();

        assert!(sched.is_released(right, &tree).unwrap());
        assert_eq!(out.newly_released, vec![right]);
        assert_eq!(tree.get(right).unwrap().holder, None);
        assert_eq!(sched.hold_graph().edge_count(), 0);
        assert_eq!(sched.cached_records(), 1);
    }

    #[test]
    fn test_executing_held_record_is_rejected() {
        let mut tree = RecordTree::new();
        let mut sched = Scheduler::new();
        let mut out = StepOutcome::default();

        let root = tree.create(None, root_seed()).unwrap().id;
        sched.notify_new(root, &mut tree, &mut out).unwrap();
        sched.notify_executed(root, &mut tree, &mut out).unwrap();
        tree.mark_shared(root).unwrap();
        let left = tree.create(Some(root), seed(0)).unwrap().id;
        let right = tree.create(Some(root), seed(1)).unwrap().id;
        sched.notify_new(left, &mut tree, &mut out).unwrap();
        sched.notify_new(right, &mut tree, &mut out).unwrap();
        sched.notify_executed(left, &mut tree, &mut out).unwrap();

        let err = sched.notify_executed(right, &mut tree, &mut out).unwrap_err();
        assert!(matches!(err, EseError::InvalidTransition { from: "held", .. }));
    }
}
