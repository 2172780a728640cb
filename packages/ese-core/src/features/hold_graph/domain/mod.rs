//! Scheduler outcome types

use crate::shared::models::{ExecRecordId, PathId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Scheduling changes the executor has to apply
///
/// Held paths must not be stepped until released; pruned paths must be
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerEvents {
    pub held: BTreeSet<PathId>,
    pub released: BTreeSet<PathId>,
    pub pruned: BTreeSet<PathId>,
}

impl SchedulerEvents {
    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.released.is_empty() && self.pruned.is_empty()
    }

    /// Folds a later batch into this one
    pub fn merge(&mut self, later: SchedulerEvents) {
        for path in later.held {
            if !self.released.remove(&path) {
                self.held.insert(path);
            }
        }
        for path in later.released {
            if !self.held.remove(&path) {
                self.released.insert(path);
            }
        }
        for path in later.pruned {
            self.held.remove(&path);
            self.released.remove(&path);
            self.pruned.insert(path);
        }
    }
}

/// Raw effects collected while handling one step
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub holds: BTreeSet<PathId>,
    pub releases: BTreeSet<PathId>,
    pub prunes: BTreeSet<PathId>,
    /// Parents of pruned records, to be terminated if their children are done
    pub to_terminate: BTreeSet<ExecRecordId>,
    /// Records moved from held to released by a holder's termination
    pub newly_released: Vec<ExecRecordId>,
}
