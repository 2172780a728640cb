//! Write-site model

use crate::shared::models::{
    AllocKey, ExecRecordId, ExprRef, Location, ObjectSnapshot, WriteSiteId, OPAQUE_VALUE_HASH,
};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteSiteKind {
    /// Register of a stack frame
    Stack { frame: u32, reg: u32, value: ExprRef },
    /// One byte at a concrete offset; supersedes earlier writes of the byte
    HeapByte {
        alloc: AllocKey,
        offset: u64,
        value: ExprRef,
    },
    /// Write at a symbolic offset; may alias any byte of the object
    HeapObject {
        alloc: AllocKey,
        snapshot: ObjectSnapshot,
    },
    /// First use of one concrete byte of a symbolic array
    ArrayByte { alloc: AllocKey, offset: u64 },
    /// First symbolic-offset use of a symbolic array
    Array { alloc: AllocKey },
}

impl WriteSiteKind {
    pub fn location(&self) -> Location {
        match *self {
            WriteSiteKind::Stack { frame, reg, .. } => Location::Stack { frame, reg },
            WriteSiteKind::HeapByte { alloc, offset, .. } => Location::HeapByte { alloc, offset },
            WriteSiteKind::HeapObject { alloc, .. } => Location::HeapObject { alloc },
            WriteSiteKind::ArrayByte { alloc, offset } => Location::ArrayByte { alloc, offset },
            WriteSiteKind::Array { alloc } => Location::Array { alloc },
        }
    }

    /// Hash of the written value; opaque kinds share one sentinel
    pub fn value_hash(&self) -> u64 {
        match self {
            WriteSiteKind::Stack { value, .. } | WriteSiteKind::HeapByte { value, .. } => {
                value.structural_hash()
            }
            _ => OPAQUE_VALUE_HASH,
        }
    }

    pub fn is_materialization(&self) -> bool {
        matches!(
            self,
            WriteSiteKind::ArrayByte { .. } | WriteSiteKind::Array { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct WriteSite {
    pub id: WriteSiteId,
    /// Execution record that performed the write
    pub owner: ExecRecordId,
    pub kind: WriteSiteKind,
    pub location: Location,
    pub loc_hash: u64,
    pub val_hash: u64,
    pub preds: Vec<WriteSiteId>,
}

impl fmt::Display for WriteSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} by {}", self.id, self.location, self.owner)
    }
}

/// Write-sites read since the last write of the current step
#[derive(Debug, Clone, Default)]
pub struct PendingReads {
    reads: BTreeSet<WriteSiteId>,
}

impl PendingReads {
    pub fn insert(&mut self, site: WriteSiteId) {
        self.reads.insert(site);
    }

    pub fn extend(&mut self, sites: impl IntoIterator<Item = WriteSiteId>) {
        self.reads.extend(sites);
    }

    /// Predecessors for the next write; leaves the set empty
    pub fn take(&mut self) -> Vec<WriteSiteId> {
        std::mem::take(&mut self.reads).into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.reads.clear();
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    pub fn contains(&self, site: WriteSiteId) -> bool {
        self.reads.contains(&site)
    }
}
