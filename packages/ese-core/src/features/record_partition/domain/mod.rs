//! Static record model

use crate::errors::{EseError, EseResult};
use crate::shared::models::{BlockId, ExecRecordId, FunctionId, GroupId, InstLocation, RecordId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Classification by boundary instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Only PHI instructions
    Phi,
    /// Ends with a call
    Call,
    /// Ends with a conditional branch or switch
    Predicate,
    /// Ends with a return
    Return,
    /// Ends with an unreachable terminator
    Unreachable,
    /// Anything else (falls through or branches unconditionally)
    Straight,
}

/// Immediate postdominator of a record, resolved past synthetic nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostDominator {
    #[default]
    Unknown,
    Record(RecordId),
    Exit,
    SuperExit,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub id: RecordId,
    pub function: FunctionId,
    pub block: BlockId,
    /// Instruction index range `[start, end)` within the block
    pub start: u32,
    pub end: u32,
    pub kind: RecordKind,

    pub succs: BTreeSet<RecordId>,
    pub preds: BTreeSet<RecordId>,

    // Filled by control-dependence analysis
    pub control_succs: BTreeSet<RecordId>,
    pub control_preds: BTreeSet<RecordId>,
    pub group: Option<GroupId>,
    pub ipostdom: PostDominator,
    /// Some path through this record's control decisions may halt the program
    pub controls_exit: bool,

    // Runtime
    pub covered: bool,
    /// Terminated execution records whose live set assumed this record's
    /// group was incomplete
    pub sources: BTreeSet<ExecRecordId>,
}

impl Record {
    pub fn new(
        id: RecordId,
        function: FunctionId,
        block: BlockId,
        start: u32,
        end: u32,
        kind: RecordKind,
    ) -> Self {
        Self {
            id,
            function,
            block,
            start,
            end,
            kind,
            succs: BTreeSet::new(),
            preds: BTreeSet::new(),
            control_succs: BTreeSet::new(),
            control_preds: BTreeSet::new(),
            group: None,
            ipostdom: PostDominator::Unknown,
            controls_exit: false,
            covered: false,
            sources: BTreeSet::new(),
        }
    }

    pub fn first_inst(&self) -> InstLocation {
        InstLocation::new(self.function, self.block, self.start)
    }

    pub fn last_inst(&self) -> InstLocation {
        InstLocation::new(self.function, self.block, self.end - 1)
    }

    pub fn contains(&self, loc: InstLocation) -> bool {
        loc.function == self.function
            && loc.block == self.block
            && (self.start..self.end).contains(&loc.index)
    }

    pub fn is_phi(&self) -> bool {
        self.kind == RecordKind::Phi
    }

    pub fn is_call(&self) -> bool {
        self.kind == RecordKind::Call
    }

    pub fn is_predicate(&self) -> bool {
        self.kind == RecordKind::Predicate
    }

    pub fn is_return(&self) -> bool {
        self.kind == RecordKind::Return
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}:{}[{}..{}])",
            self.id, self.function, self.block, self.start, self.end
        )
    }
}

/// Arena of all static records of a program
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    starts: FxHashMap<InstLocation, RecordId>,
    entries: FxHashMap<FunctionId, RecordId>,
    by_function: FxHashMap<FunctionId, Vec<RecordId>>,
    by_block: FxHashMap<(FunctionId, BlockId), Vec<RecordId>>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        function: FunctionId,
        block: BlockId,
        start: u32,
        end: u32,
        kind: RecordKind,
    ) -> RecordId {
        let id = RecordId::from_index(self.records.len());
        let record = Record::new(id, function, block, start, end, kind);
        self.starts.insert(record.first_inst(), id);
        self.by_function.entry(function).or_default().push(id);
        self.by_block.entry((function, block)).or_default().push(id);
        self.records.push(record);
        id
    }

    pub(crate) fn set_entry(&mut self, function: FunctionId, record: RecordId) {
        self.entries.insert(function, record);
    }

    pub(crate) fn link(&mut self, from: RecordId, to: RecordId) {
        self.records[from.index()].succs.insert(to);
        self.records[to.index()].preds.insert(from);
    }

    pub(crate) fn link_control(&mut self, from: RecordId, to: RecordId) {
        self.records[from.index()].control_succs.insert(to);
        self.records[to.index()].control_preds.insert(from);
    }

    pub fn get(&self, id: RecordId) -> EseResult<&Record> {
        self.records
            .get(id.index())
            .ok_or_else(|| EseError::unknown("record", id.0))
    }

    pub fn get_mut(&mut self, id: RecordId) -> EseResult<&mut Record> {
        self.records
            .get_mut(id.index())
            .ok_or_else(|| EseError::unknown("record", id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record whose first instruction is `loc`
    pub fn starting_at(&self, loc: InstLocation) -> Option<RecordId> {
        self.starts.get(&loc).copied()
    }

    pub fn containing(&self, loc: InstLocation) -> Option<RecordId> {
        self.by_block
            .get(&(loc.function, loc.block))?
            .iter()
            .copied()
            .find(|id| self.records[id.index()].contains(loc))
    }

    pub fn entry(&self, function: FunctionId) -> Option<RecordId> {
        self.entries.get(&function).copied()
    }

    pub fn function_records(&self, function: FunctionId) -> &[RecordId] {
        self.by_function
            .get(&function)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Records of one block in instruction order
    pub fn block_records(&self, function: FunctionId, block: BlockId) -> &[RecordId] {
        self.by_block
            .get(&(function, block))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
