//! Control group: one SCC of the record control graph

use crate::shared::models::{GroupId, RecordId};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ControlGroup {
    pub id: GroupId,
    pub members: Vec<RecordId>,
    pub succs: BTreeSet<GroupId>,
    pub preds: BTreeSet<GroupId>,
    /// Set once every member is covered and every successor group completed.
    /// Never reset.
    pub completed: bool,
}

impl ControlGroup {
    pub fn new(id: GroupId, members: Vec<RecordId>) -> Self {
        Self {
            id,
            members,
            succs: BTreeSet::new(),
            preds: BTreeSet::new(),
            completed: false,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        self.members.len() > 1
    }
}
