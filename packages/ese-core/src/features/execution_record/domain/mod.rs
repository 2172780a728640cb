//! Execution record model

use crate::features::write_site::WriteShadow;
use crate::shared::models::{
    ExecRecordId, ExprRef, PathId, ProgramPoint, RecordId, SegmentId, WriteSiteId,
};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Active,
    Terminated,
    /// Superseded by an equivalent terminated record
    Pruned,
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Active => "active",
            RecordState::Terminated => "terminated",
            RecordState::Pruned => "pruned",
        }
    }

    /// Terminated or pruned: nothing below it will run again
    pub fn is_done(&self) -> bool {
        !matches!(self, RecordState::Active)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of one path: the unit of termination and comparison
#[derive(Debug, Clone)]
pub struct ExecRecord {
    pub id: ExecRecordId,
    pub static_record: RecordId,
    /// Program point at creation; also the comparer key
    pub point: ProgramPoint,
    /// Index of the innermost stack frame
    pub frame: u32,
    /// Path constraints at creation
    pub constraints: Vec<ExprRef>,
    pub in_exit_function: bool,

    // Control
    /// Condition read of the record's conditional branch or switch
    pub branch_read: Option<WriteSiteId>,
    /// Branch read of the record this one is control dependent on
    pub regular_control: Option<WriteSiteId>,
    /// A predicate whose immediate postdominator is super-exit
    pub is_exit_control: bool,

    // Lifecycle
    pub state: RecordState,
    /// Forked: more than one path continues from this record
    pub shared: bool,
    pub executed: bool,
    /// Path still positioned at this record (unexecuted frontier)
    pub path: Option<PathId>,
    /// Live paths whose current record this is; never terminated while
    /// non-zero
    pub occupants: u32,
    /// Record this one's segment waits on
    pub holder: Option<ExecRecordId>,

    // Fork lineage
    pub segments: BTreeSet<SegmentId>,
    pub current_segment: SegmentId,

    // Tree
    pub parent: Option<ExecRecordId>,
    pub children: BTreeSet<ExecRecordId>,
    pub writes: BTreeSet<WriteSiteId>,

    // Live set, filled on termination
    pub live_reads: BTreeSet<WriteSiteId>,
    pub live_controls: BTreeSet<WriteSiteId>,
    /// Sorted and deduplicated
    pub live_constraints: Vec<ExprRef>,
    /// Live set assumed an incomplete control group
    pub provisional: bool,

    // Pruning
    /// Records pruned against this one
    pub pruned_set: BTreeSet<ExecRecordId>,
    /// Shadow of the pruned path, kept to repeat the live-read copy
    pub copy_source: Option<WriteShadow>,
    /// Terminated record this one was pruned against
    pub pruned_by: Option<ExecRecordId>,
}

impl ExecRecord {
    pub fn new(
        id: ExecRecordId,
        static_record: RecordId,
        point: ProgramPoint,
        constraints: Vec<ExprRef>,
        segment: SegmentId,
    ) -> Self {
        Self {
            id,
            static_record,
            frame: point.depth() as u32,
            point,
            constraints,
            in_exit_function: false,
            branch_read: None,
            regular_control: None,
            is_exit_control: false,
            state: RecordState::Active,
            shared: false,
            executed: false,
            path: None,
            occupants: 0,
            holder: None,
            segments: BTreeSet::from([segment]),
            current_segment: segment,
            parent: None,
            children: BTreeSet::new(),
            writes: BTreeSet::new(),
            live_reads: BTreeSet::new(),
            live_controls: BTreeSet::new(),
            live_constraints: Vec::new(),
            provisional: false,
            pruned_set: BTreeSet::new(),
            copy_source: None,
            pruned_by: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == RecordState::Active
    }

    pub fn is_terminated(&self) -> bool {
        self.state == RecordState::Terminated
    }

    pub fn is_pruned(&self) -> bool {
        self.state == RecordState::Pruned
    }

    pub fn is_occupied(&self) -> bool {
        self.occupants > 0
    }

    /// Terminated and no longer depending on an open control group
    pub fn is_final(&self) -> bool {
        self.is_terminated() && !self.provisional
    }
}

impl fmt::Display for ExecRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{} at {} {}]",
            self.id, self.static_record, self.point, self.state
        )
    }
}

/// Live facts computed by one termination sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSet {
    pub reads: BTreeSet<WriteSiteId>,
    pub controls: BTreeSet<WriteSiteId>,
    /// The branch read was kept because the group was incomplete
    pub provisional: bool,
}
