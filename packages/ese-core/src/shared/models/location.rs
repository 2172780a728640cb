//! Allocation keys and location signatures

use super::expr::ExprRef;
use super::ids::AllocSiteId;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Value signature of locations whose value is not hashed directly
/// (symbolic-offset heap objects and array materializations)
pub const OPAQUE_VALUE_HASH: u64 = 1;

/// Allocation identity: the allocating instruction plus how many times the
/// path has executed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocKey {
    pub site: AllocSiteId,
    pub iteration: u32,
}

impl AllocKey {
    pub fn new(site: u32, iteration: u32) -> Self {
        Self {
            site: AllocSiteId(site),
            iteration,
        }
    }
}

impl fmt::Display for AllocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.site, self.iteration)
    }
}

/// Structural location signature
///
/// Variant order is the canonical live-set order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    Stack { frame: u32, reg: u32 },
    HeapByte { alloc: AllocKey, offset: u64 },
    HeapObject { alloc: AllocKey },
    ArrayByte { alloc: AllocKey, offset: u64 },
    Array { alloc: AllocKey },
}

impl Location {
    pub fn signature(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn alloc(&self) -> Option<AllocKey> {
        match *self {
            Location::Stack { .. } => None,
            Location::HeapByte { alloc, .. }
            | Location::HeapObject { alloc }
            | Location::ArrayByte { alloc, .. }
            | Location::Array { alloc } => Some(alloc),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Stack { frame, reg } => write!(f, "stack[{frame}].%{reg}"),
            Location::HeapByte { alloc, offset } => write!(f, "heap[{alloc}]+{offset}"),
            Location::HeapObject { alloc } => write!(f, "heap[{alloc}]+?"),
            Location::ArrayByte { alloc, offset } => write!(f, "array[{alloc}]+{offset}"),
            Location::Array { alloc } => write!(f, "array[{alloc}]+?"),
        }
    }
}

/// boost-style hash combine
#[inline]
pub fn hash_combine(seed: &mut u64, value: u64) {
    *seed ^= value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// Byte contents of a heap object at the time of a symbolic-offset write
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectSnapshot {
    bytes: Vec<ExprRef>,
}

impl ObjectSnapshot {
    pub fn new(bytes: Vec<ExprRef>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[ExprRef] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
