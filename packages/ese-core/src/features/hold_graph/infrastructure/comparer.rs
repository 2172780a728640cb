//! Per program point record comparer
//!
//! Every record at one program point is in exactly one of five sets:
//!
//! | set        | meaning                                              |
//! |------------|------------------------------------------------------|
//! | pending    | executed, subtree still running                      |
//! | held       | unexecuted, waiting for a pending record to finish   |
//! | released   | unexecuted, free to run and to be cache-checked      |
//! | terminated | cached                                               |
//! | pruned     | equivalent to a terminated record                    |
//!
//! A new record prefers to wait on a pending record at the same point:
//! once that record terminates, the waiter can be compared against it
//! instead of being explored.

use super::graph::HoldGraph;
use crate::errors::{EseError, EseResult};
use crate::features::execution_record::RecordTree;
use crate::features::hold_graph::domain::StepOutcome;
use crate::features::live_set_cache::{is_equivalent, LiveSetCache};
use crate::features::write_site::WriteSiteGraph;
use crate::shared::models::{ExecRecordId, PathId};
use crate::shared::ports::{PathSource, PathView};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Comparer {
    pending: BTreeSet<ExecRecordId>,
    held: BTreeSet<ExecRecordId>,
    released: BTreeSet<ExecRecordId>,
    terminated: BTreeSet<ExecRecordId>,
    pruned: BTreeSet<ExecRecordId>,
    cache: LiveSetCache,
}

fn path_of(tree: &RecordTree, record: ExecRecordId) -> EseResult<PathId> {
    tree.get(record)?.path.ok_or(EseError::InvalidTransition {
        record,
        from: "executed",
        to: "scheduled",
    })
}

fn attempt_hold(
    tree: &mut RecordTree,
    hold: &mut HoldGraph,
    waiter: ExecRecordId,
    target: ExecRecordId,
) -> EseResult<bool> {
    let waiter_seg = tree.get(waiter)?.current_segment;
    let target_seg = tree.get(target)?.current_segment;
    if !hold.attempt_hold(waiter_seg, target_seg) {
        return Ok(false);
    }
    tree.get_mut(waiter)?.holder = Some(target);
    debug!(waiter = %waiter, holder = %target, "hold");
    Ok(true)
}

fn unhold(tree: &mut RecordTree, hold: &mut HoldGraph, waiter: ExecRecordId) -> EseResult<()> {
    let rec = tree.get_mut(waiter)?;
    let waiter_seg = rec.current_segment;
    let Some(holder) = rec.holder.take() else {
        return Err(EseError::InvalidTransition {
            record: waiter,
            from: "released",
            to: "released",
        });
    };
    let holder_seg = tree.get(holder)?.current_segment;
    hold.release(waiter_seg, holder_seg)
}

impl Comparer {
    pub fn new() -> Self {
        Self::default()
    }

    fn tracks(&self, record: ExecRecordId) -> bool {
        self.pending.contains(&record)
            || self.held.contains(&record)
            || self.released.contains(&record)
            || self.terminated.contains(&record)
            || self.pruned.contains(&record)
    }

    /// Holds the new record on a pending record, or releases it
    pub fn notify_new(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        hold: &mut HoldGraph,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        if self.tracks(record) {
            return Err(EseError::InvalidTransition {
                record,
                from: "tracked",
                to: "new",
            });
        }
        for &target in &self.pending {
            if attempt_hold(tree, hold, record, target)? {
                self.held.insert(record);
                out.holds.insert(path_of(tree, record)?);
                return Ok(());
            }
        }
        self.released.insert(record);
        Ok(())
    }

    /// The record's first instruction ran; released records try to wait on it
    pub fn notify_executed(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        hold: &mut HoldGraph,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        if !self.released.remove(&record) {
            let from = if self.held.contains(&record) { "held" } else { "untracked" };
            return Err(EseError::InvalidTransition {
                record,
                from,
                to: "executed",
            });
        }
        let rec = tree.get_mut(record)?;
        rec.executed = true;
        rec.path = None;
        self.pending.insert(record);

        let waiting: Vec<ExecRecordId> = self.released.iter().copied().collect();
        for waiter in waiting {
            if attempt_hold(tree, hold, waiter, record)? {
                self.released.remove(&waiter);
                self.held.insert(waiter);
                out.holds.insert(path_of(tree, waiter)?);
            }
        }
        Ok(())
    }

    /// Caches a terminated record and frees whatever it was holding up
    pub fn notify_terminated(
        &mut self,
        record: ExecRecordId,
        tree: &mut RecordTree,
        hold: &mut HoldGraph,
        graph: &WriteSiteGraph,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        if self.pending.remove(&record) {
            let waiters: Vec<ExecRecordId> = self
                .held
                .iter()
                .copied()
                .filter(|w| tree.get(*w).is_ok_and(|r| r.holder == Some(record)))
                .collect();
            for waiter in waiters {
                unhold(tree, hold, waiter)?;
                let mut rehomed = false;
                for &target in &self.pending {
                    if attempt_hold(tree, hold, waiter, target)? {
                        rehomed = true;
                        break;
                    }
                }
                if !rehomed {
                    self.held.remove(&waiter);
                    self.released.insert(waiter);
                    out.releases.insert(path_of(tree, waiter)?);
                    out.newly_released.push(waiter);
                    debug!(record = %waiter, "released");
                }
            }
        } else if self.released.remove(&record) {
            tree.get_mut(record)?.path = None;
        } else if self.held.remove(&record) {
            out.releases.insert(path_of(tree, record)?);
            unhold(tree, hold, record)?;
            tree.get_mut(record)?.path = None;
        } else {
            return Err(EseError::InvalidTransition {
                record,
                from: "untracked",
                to: "terminated",
            });
        }

        self.cache.insert(record, tree, graph)?;
        self.terminated.insert(record);
        Ok(())
    }

    pub fn notify_reterminated(
        &mut self,
        record: ExecRecordId,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<()> {
        if !self.terminated.contains(&record) {
            return Err(EseError::InvalidTransition {
                record,
                from: "uncached",
                to: "reterminated",
            });
        }
        self.cache.readd(record, tree, graph)?;
        Ok(())
    }

    /// Cache lookup for a released record's path
    pub fn check_path(
        &self,
        record: ExecRecordId,
        view: &dyn PathView,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<Option<ExecRecordId>> {
        if !self.released.contains(&record) {
            return Ok(None);
        }
        self.cache.lookup(view, tree, graph)
    }

    /// Held and released records equivalent to a just-terminated record
    pub fn check_terminated(
        &self,
        terminated: ExecRecordId,
        paths: &dyn PathSource,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<Vec<ExecRecordId>> {
        let trec = tree.get(terminated)?;
        let mut equivalent = Vec::new();
        for &candidate in self.held.iter().chain(self.released.iter()) {
            let path = path_of(tree, candidate)?;
            let view = paths
                .path(path)
                .ok_or_else(|| EseError::unknown("path", path.0))?;
            if is_equivalent(trec, view, graph) {
                equivalent.push(candidate);
            }
        }
        Ok(equivalent)
    }

    /// Scheduling side of a prune; the record tree does the rest
    pub fn prune(
        &mut self,
        terminated: ExecRecordId,
        victim: ExecRecordId,
        tree: &mut RecordTree,
        hold: &mut HoldGraph,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        if !self.terminated.contains(&terminated) {
            return Err(EseError::InvalidTransition {
                record: terminated,
                from: "uncached",
                to: "prune source",
            });
        }
        let path = path_of(tree, victim)?;
        if self.held.remove(&victim) {
            unhold(tree, hold, victim)?;
            out.releases.insert(path);
        } else if !self.released.remove(&victim) {
            return Err(EseError::InvalidTransition {
                record: victim,
                from: "untracked",
                to: "pruned",
            });
        }

        self.pruned.insert(victim);
        out.prunes.insert(path);
        if let Some(parent) = tree.get(victim)?.parent {
            out.to_terminate.insert(parent);
        }
        Ok(())
    }

    pub fn is_released(&self, record: ExecRecordId) -> bool {
        self.released.contains(&record)
    }

    pub fn is_held(&self, record: ExecRecordId) -> bool {
        self.held.contains(&record)
    }

    pub fn cache(&self) -> &LiveSetCache {
        &self.cache
    }

    /// Set sizes: pending, held, released, terminated, pruned
    pub fn counts(&self) -> [usize; 5] {
        [
            self.pending.len(),
            self.held.len(),
            self.released.len(),
            self.terminated.len(),
            self.pruned.len(),
        ]
    }
}
