//! Per-path stack of open predicate records
//!
//! The top of the stack is the predicate the current record is control
//! dependent on. A predicate is popped when the path reaches its immediate
//! postdominator in the same calling context.

use super::tree::RecordTree;
use crate::errors::EseResult;
use crate::features::record_partition::{PostDominator, RecordSet};
use crate::shared::models::ExecRecordId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlStack {
    open: Vec<ExecRecordId>,
}

impl ControlStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top(&self) -> Option<ExecRecordId> {
        self.open.last().copied()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Moves the stack from `prev` to `new` and sets `new`'s regular control
    pub fn update(
        &mut self,
        prev: ExecRecordId,
        new: ExecRecordId,
        tree: &mut RecordTree,
        records: &RecordSet,
    ) -> EseResult<()> {
        let prev_rec = tree.get(prev)?;
        let prev_static = records.get(prev_rec.static_record)?;
        let prev_is_return = prev_static.is_return();

        if prev_static.is_predicate() {
            if prev_static.ipostdom == PostDominator::SuperExit {
                self.open.clear();
                tree.get_mut(prev)?.is_exit_control = true;
            } else {
                if let Some(top) = self.top() {
                    let top_rec = tree.get(top)?;
                    let top_static = records.get(top_rec.static_record)?;
                    if top_static.ipostdom == prev_static.ipostdom
                        && top_rec.point.callers == prev_rec.point.callers
                    {
                        self.open.pop();
                    }
                }
                self.open.push(prev);
            }
        }

        let prev_callers = tree.get(prev)?.point.callers.clone();
        while let Some(top) = self.top() {
            let top_rec = tree.get(top)?;
            let new_rec = tree.get(new)?;
            let ipostdom = records.get(top_rec.static_record)?.ipostdom;

            let reached = ipostdom == PostDominator::Record(new_rec.static_record)
                && top_rec.point.callers == new_rec.point.callers;
            let returned = prev_is_return
                && ipostdom == PostDominator::Exit
                && top_rec.point.callers == prev_callers;
            if !(reached || returned) {
                break;
            }
            self.open.pop();
        }

        let control = match self.top() {
            Some(top) => tree.get(top)?.branch_read,
            None => None,
        };
        tree.get_mut(new)?.regular_control = control;
        Ok(())
    }
}
