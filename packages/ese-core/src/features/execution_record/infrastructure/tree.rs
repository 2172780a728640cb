//! Execution record tree
//!
//! Mirrors the live execution tree. Termination sweeps backward from the
//! children's live reads (and, when needed, the record's branch read) along
//! write-site predecessors, consuming write-sites the record produced
//! itself. What is left over is the record's live read set.

use super::live_constraints::live_constraints;
use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::ControlDependence;
use crate::features::execution_record::domain::{ExecRecord, LiveSet, RecordState};
use crate::features::write_site::{WriteShadow, WriteSiteGraph};
use crate::shared::models::{
    ExecRecordId, ExprRef, PathId, ProgramPoint, RecordId, SegmentId, WriteSiteId,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};

/// Everything a new record captures from its path
#[derive(Debug, Clone)]
pub struct RecordSeed {
    pub static_record: RecordId,
    pub point: ProgramPoint,
    pub constraints: Vec<ExprRef>,
    pub path: Option<PathId>,
    pub in_exit_function: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRecord {
    pub id: ExecRecordId,
    /// Lineage edge to insert when the parent was forked
    pub lineage: Option<(SegmentId, SegmentId)>,
}

#[derive(Debug)]
pub struct RecordTree {
    records: Vec<ExecRecord>,
    next_segment: u32,
    /// Active records per segment
    segment_active: FxHashMap<SegmentId, u32>,
    /// Segments whose records are all done, not yet taken
    retired: Vec<SegmentId>,
}

impl RecordTree {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_segment: 0,
            segment_active: FxHashMap::default(),
            retired: Vec::new(),
        }
    }

    pub fn get(&self, id: ExecRecordId) -> EseResult<&ExecRecord> {
        self.records
            .get(id.index())
            .ok_or_else(|| EseError::unknown("execution record", id.0))
    }

    pub fn get_mut(&mut self, id: ExecRecordId) -> EseResult<&mut ExecRecord> {
        self.records
            .get_mut(id.index())
            .ok_or_else(|| EseError::unknown("execution record", id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn segment_count(&self) -> u32 {
        self.next_segment
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════════

    /// Creates a record under `parent`
    ///
    /// Roots open a segment of their own. Otherwise segments are inherited,
    /// and a forked parent opens a fresh segment for the child.
    pub fn create(&mut self, parent: Option<ExecRecordId>, seed: RecordSeed) -> EseResult<NewRecord> {
        let id = ExecRecordId::from_index(self.records.len());
        let mut lineage = None;

        let (segments, current) = match parent {
            None => {
                let fresh = self.fresh_segment();
                (BTreeSet::from([fresh]), fresh)
            }
            Some(p) => {
                let (shared, prev_segment, mut segments) = {
                    let prev = self.get(p)?;
                    if !prev.is_active() {
                        return Err(EseError::InvalidTransition {
                            record: p,
                            from: prev.state.as_str(),
                            to: "parent",
                        });
                    }
                    (prev.shared, prev.current_segment, prev.segments.clone())
                };
                let current = if shared {
                    let fresh = self.fresh_segment();
                    segments.insert(fresh);
                    lineage = Some((prev_segment, fresh));
                    fresh
                } else {
                    prev_segment
                };
                (segments, current)
            }
        };

        let mut record = ExecRecord::new(id, seed.static_record, seed.point, seed.constraints, current);
        record.segments = segments;
        record.parent = parent;
        record.path = seed.path;
        record.in_exit_function = seed.in_exit_function;
        self.records.push(record);
        *self.segment_active.entry(current).or_default() += 1;

        if let Some(p) = parent {
            self.get_mut(p)?.children.insert(id);
        }
        trace!(record = %id, parent = ?parent, segment = %current, "record created");
        Ok(NewRecord { id, lineage })
    }

    fn fresh_segment(&mut self) -> SegmentId {
        let id = SegmentId(self.next_segment);
        self.next_segment += 1;
        id
    }

    /// Segments that lost their last active record since the previous call
    pub fn take_retired(&mut self) -> Vec<SegmentId> {
        std::mem::take(&mut self.retired)
    }

    fn finish_record(&mut self, id: ExecRecordId, state: RecordState) -> EseResult<()> {
        let rec = self.get_mut(id)?;
        rec.state = state;
        let segment = rec.current_segment;
        if let Some(active) = self.segment_active.get_mut(&segment) {
            *active -= 1;
            if *active == 0 {
                self.segment_active.remove(&segment);
                self.retired.push(segment);
            }
        }
        Ok(())
    }

    pub fn attach_write(&mut self, record: ExecRecordId, site: WriteSiteId) -> EseResult<()> {
        if !self.get_mut(record)?.writes.insert(site) {
            return Err(EseError::DuplicateWriteSite { site, record });
        }
        Ok(())
    }

    pub fn mark_shared(&mut self, record: ExecRecordId) -> EseResult<()> {
        self.get_mut(record)?.shared = true;
        Ok(())
    }

    /// A live path is now positioned at `record`
    pub fn enter(&mut self, record: ExecRecordId) -> EseResult<()> {
        self.get_mut(record)?.occupants += 1;
        Ok(())
    }

    /// A live path moved on from `record` or was dropped; returns the
    /// remaining occupants
    pub fn leave(&mut self, record: ExecRecordId) -> EseResult<u32> {
        let rec = self.get_mut(record)?;
        rec.occupants = rec.occupants.checked_sub(1).ok_or(EseError::InvalidTransition {
            record,
            from: "unoccupied",
            to: "left",
        })?;
        Ok(rec.occupants)
    }

    pub fn all_children_done(&self, record: ExecRecordId) -> EseResult<bool> {
        for c in &self.get(record)?.children {
            if !self.get(*c)?.state.is_done() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Termination
    // ═══════════════════════════════════════════════════════════════════════

    /// Backward sweep over the write-site graph
    pub fn compute_live_set(
        &self,
        id: ExecRecordId,
        graph: &WriteSiteGraph,
        cd: &ControlDependence,
    ) -> EseResult<LiveSet> {
        let rec = self.get(id)?;
        let mut live = LiveSet::default();
        let mut worklist: Vec<WriteSiteId> = Vec::new();
        let mut children_have_reads = false;

        for c in &rec.children {
            let child = self.get(*c)?;
            children_have_reads |= !child.live_reads.is_empty();
            worklist.extend(child.live_reads.iter().copied());
            live.controls.extend(child.live_controls.iter().copied());
        }

        if let Some(branch) = rec.branch_read {
            let complete = cd.is_group_complete(rec.static_record)?;
            if !complete
                || (children_have_reads && rec.is_exit_control)
                || live.controls.contains(&branch)
            {
                live.provisional = !complete;
                live.controls.remove(&branch);
                worklist.push(branch);
            }
        }

        let mut seen: FxHashSet<WriteSiteId> = FxHashSet::default();
        let mut consumed_own = false;
        while let Some(n) = worklist.pop() {
            if !seen.insert(n) {
                continue;
            }
            let site = graph.get(n)?;
            if site.owner == id {
                consumed_own = true;
                worklist.extend(site.preds.iter().copied());
            } else {
                live.reads.insert(n);
            }
        }

        if consumed_own {
            live.controls.extend(rec.regular_control);
        }
        Ok(live)
    }

    pub fn terminate(
        &mut self,
        id: ExecRecordId,
        graph: &WriteSiteGraph,
        cd: &mut ControlDependence,
    ) -> EseResult<()> {
        let state = self.get(id)?.state;
        if state != RecordState::Active {
            return Err(EseError::InvalidTransition {
                record: id,
                from: state.as_str(),
                to: "terminated",
            });
        }
        if self.get(id)?.is_occupied() {
            return Err(EseError::InvalidTransition {
                record: id,
                from: "occupied",
                to: "terminated",
            });
        }
        if !self.all_children_done(id)? {
            return Err(EseError::InvalidTransition {
                record: id,
                from: "active with running children",
                to: "terminated",
            });
        }

        let live = self.compute_live_set(id, graph, cd)?;
        self.store_live_set(id, live, graph, cd)?;
        self.finish_record(id, RecordState::Terminated)?;

        let rec = self.get(id)?;
        debug!(
            record = %id,
            live_reads = rec.live_reads.len(),
            live_controls = rec.live_controls.len(),
            provisional = rec.provisional,
            "record terminated"
        );
        Ok(())
    }

    /// Terminates `start` and every ancestor whose children are all done
    ///
    /// Stops at the first record a live path still occupies.
    pub fn terminate_chain(
        &mut self,
        start: ExecRecordId,
        graph: &WriteSiteGraph,
        cd: &mut ControlDependence,
    ) -> EseResult<Vec<ExecRecordId>> {
        let mut terminated = Vec::new();
        let mut cur = Some(start);
        while let Some(id) = cur {
            let rec = self.get(id)?;
            if !rec.is_active() || rec.is_occupied() || !self.all_children_done(id)? {
                break;
            }
            self.terminate(id, graph, cd)?;
            terminated.push(id);
            cur = self.get(id)?.parent;
        }
        Ok(terminated)
    }

    /// Unions `live` into the record's live set; true if it grew
    fn store_live_set(
        &mut self,
        id: ExecRecordId,
        live: LiveSet,
        graph: &WriteSiteGraph,
        cd: &mut ControlDependence,
    ) -> EseResult<bool> {
        let rec = self.get_mut(id)?;
        let before = (rec.live_reads.len(), rec.live_controls.len());

        if !rec.in_exit_function {
            rec.live_reads.extend(live.reads);
        }
        rec.live_controls.extend(live.controls);
        rec.provisional = live.provisional;
        rec.live_constraints = live_constraints(
            &rec.constraints,
            rec.live_reads.iter().map(|s| graph.site(*s).location),
        );

        let grew = before != (rec.live_reads.len(), rec.live_controls.len());
        if live.provisional {
            let static_record = rec.static_record;
            cd.add_source(static_record, id)?;
        }
        Ok(grew)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Pruning and reterminate
    // ═══════════════════════════════════════════════════════════════════════

    /// Marks `victim` pruned against the terminated record `by` and copies
    /// `by`'s live reads into it through the victim path's shadow
    pub fn prune(
        &mut self,
        victim: ExecRecordId,
        by: ExecRecordId,
        shadow: WriteShadow,
        graph: &mut WriteSiteGraph,
    ) -> EseResult<()> {
        let state = self.get(victim)?.state;
        if state != RecordState::Active {
            return Err(EseError::InvalidTransition {
                record: victim,
                from: state.as_str(),
                to: "pruned",
            });
        }
        let source = self.get(by)?.state;
        if source != RecordState::Terminated {
            return Err(EseError::InvalidTransition {
                record: by,
                from: source.as_str(),
                to: "prune source",
            });
        }

        self.finish_record(victim, RecordState::Pruned)?;
        let rec = self.get_mut(victim)?;
        rec.path = None;
        rec.holder = None;
        rec.copy_source = Some(shadow);
        rec.pruned_by = Some(by);
        self.get_mut(by)?.pruned_set.insert(victim);

        self.copy_live_reads(by, victim, graph)?;
        debug!(record = %victim, equivalent = %by, "record pruned");
        Ok(())
    }

    /// Resolves every live location of `from` in the pruned record's shadow;
    /// true if the pruned record's live set grew
    fn copy_live_reads(
        &mut self,
        from: ExecRecordId,
        into: ExecRecordId,
        graph: &mut WriteSiteGraph,
    ) -> EseResult<bool> {
        let source = self.get(from)?;
        let sites: Vec<WriteSiteId> = source.live_reads.iter().copied().collect();
        let has_controls = !source.live_controls.is_empty();

        let mut shadow = self
            .get_mut(into)?
            .copy_source
            .take()
            .ok_or_else(|| EseError::unknown("copy source", into.0))?;

        let mut copied = BTreeSet::new();
        let mut created = Vec::new();
        let mut result = Ok(());
        for site in sites {
            let location = graph.site(site).location;
            match graph.resolve(&mut shadow, location) {
                Ok(resolved) => {
                    copied.extend(resolved.sites);
                    created.extend(resolved.created);
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.get_mut(into)?.copy_source = Some(shadow);
        result?;

        for site in created {
            let owner = graph.site(site).owner;
            self.attach_write(owner, site)?;
        }

        let rec = self.get_mut(into)?;
        let before = (rec.live_reads.len(), rec.live_controls.len());
        rec.live_reads.extend(copied);
        if has_controls {
            // A pruned root has nothing controlling it
            rec.live_controls.extend(rec.regular_control);
        }
        Ok(before != (rec.live_reads.len(), rec.live_controls.len()))
    }

    /// Recomputes live sets from `start` up the parent chain
    ///
    /// Live sets only grow. Records pruned against a refreshed record get a
    /// fresh copy, and their parents are reterminated in turn. Returns every
    /// refreshed record so its cache entry can be moved.
    pub fn reterminate(
        &mut self,
        start: ExecRecordId,
        graph: &mut WriteSiteGraph,
        cd: &mut ControlDependence,
    ) -> EseResult<Vec<ExecRecordId>> {
        let mut refreshed = Vec::new();
        let mut worklist: VecDeque<(ExecRecordId, bool)> = VecDeque::from([(start, true)]);

        while let Some((first, forced)) = worklist.pop_front() {
            let mut cur = Some(first);
            let mut force = forced;
            while let Some(id) = cur {
                if !self.get(id)?.is_terminated() {
                    break;
                }
                let live = self.compute_live_set(id, graph, cd)?;
                let grew = self.store_live_set(id, live, graph, cd)?;
                if !grew && !force {
                    break;
                }
                refreshed.push(id);
                force = false;

                let pruned: Vec<ExecRecordId> = self.get(id)?.pruned_set.iter().copied().collect();
                for p in pruned {
                    if self.copy_live_reads(id, p, graph)? {
                        if let Some(parent) = self.get(p)?.parent {
                            worklist.push_back((parent, false));
                        }
                    }
                }

                if !grew {
                    break;
                }
                cur = self.get(id)?.parent;
            }
        }

        debug!(start = %start, refreshed = refreshed.len(), "reterminated");
        Ok(refreshed)
    }
}
