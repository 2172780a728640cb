//! Memory access descriptors reported by the executor

use crate::shared::models::{AllocKey, ExprRef, ObjectSnapshot, WriteSiteId};

/// One read performed by the instruction being stepped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadDescriptor {
    /// Register of the given stack frame
    ///
    /// When the stepped instruction is a conditional branch or switch, this
    /// read becomes the record's branch read.
    Stack { frame: u32, reg: u32 },
    /// `width` bytes starting at a concrete offset
    HeapConcrete {
        alloc: AllocKey,
        offset: u64,
        width: u64,
    },
    /// Symbolic offset: may touch any byte of the object
    HeapSymbolic { alloc: AllocKey },
    /// Byte of a symbolic input array at a concrete index
    ArrayConcrete { alloc: AllocKey, offset: u64 },
    /// Symbolic index into a symbolic input array
    ArraySymbolic { alloc: AllocKey },
}

/// One write performed by the instruction being stepped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDescriptor {
    Stack {
        frame: u32,
        reg: u32,
        value: ExprRef,
    },
    /// Bytes written from `offset` onwards
    HeapConcrete {
        alloc: AllocKey,
        offset: u64,
        bytes: Vec<ExprRef>,
    },
    /// Symbolic offset: the whole object after the write
    HeapSymbolic {
        alloc: AllocKey,
        snapshot: ObjectSnapshot,
    },
}

impl WriteDescriptor {
    pub fn alloc(&self) -> Option<AllocKey> {
        match self {
            WriteDescriptor::Stack { .. } => None,
            WriteDescriptor::HeapConcrete { alloc, .. }
            | WriteDescriptor::HeapSymbolic { alloc, .. } => Some(*alloc),
        }
    }
}

/// Write-sites created for one write
///
/// Empty when the target object is constant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSiteHandle {
    pub sites: Vec<WriteSiteId>,
}

impl WriteSiteHandle {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }
}

impl From<Vec<WriteSiteId>> for WriteSiteHandle {
    fn from(sites: Vec<WriteSiteId>) -> Self {
        Self { sites }
    }
}
