//! Per-path shadow memory
//!
//! Maps each location of one path to the write-site that last wrote it.
//! Cloned when the path forks; write-site ids stay shared between the copies.

use crate::errors::{EseError, EseResult};
use crate::shared::models::{AllocKey, ExecRecordId, WriteSiteId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct ObjectShadow {
    bytes: BTreeMap<u64, WriteSiteId>,
    symbolic: Vec<WriteSiteId>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteShadow {
    stack: FxHashMap<(u32, u32), WriteSiteId>,
    objects: FxHashMap<AllocKey, ObjectShadow>,
    array_bytes: FxHashMap<(AllocKey, u64), WriteSiteId>,
    arrays: FxHashMap<AllocKey, WriteSiteId>,
    /// Execution record that created each symbolic array
    alloc_owners: FxHashMap<AllocKey, ExecRecordId>,
    constant_allocs: FxHashSet<AllocKey>,
}

impl WriteShadow {
    pub fn new() -> Self {
        Self::default()
    }

    // ── stack ─────────────────────────────────────────────────────────────

    pub fn stack_cell(&self, frame: u32, reg: u32) -> Option<WriteSiteId> {
        self.stack.get(&(frame, reg)).copied()
    }

    pub(crate) fn set_stack_cell(&mut self, frame: u32, reg: u32, site: WriteSiteId) {
        self.stack.insert((frame, reg), site);
    }

    // ── heap ──────────────────────────────────────────────────────────────

    pub fn mark_constant(&mut self, alloc: AllocKey) {
        self.constant_allocs.insert(alloc);
    }

    pub fn is_constant(&self, alloc: AllocKey) -> bool {
        self.constant_allocs.contains(&alloc)
    }

    pub fn heap_byte(&self, alloc: AllocKey, offset: u64) -> Option<WriteSiteId> {
        self.objects.get(&alloc)?.bytes.get(&offset).copied()
    }

    pub fn symbolic_writes(&self, alloc: AllocKey) -> &[WriteSiteId] {
        self.objects
            .get(&alloc)
            .map(|o| o.symbolic.as_slice())
            .unwrap_or(&[])
    }

    /// The byte's write-site plus every symbolic-offset write that may alias it
    pub fn concrete_read(&self, alloc: AllocKey, offset: u64) -> Vec<WriteSiteId> {
        if self.is_constant(alloc) {
            return Vec::new();
        }
        let Some(object) = self.objects.get(&alloc) else {
            return Vec::new();
        };
        object
            .bytes
            .get(&offset)
            .copied()
            .into_iter()
            .chain(object.symbolic.iter().copied())
            .collect()
    }

    /// Every write on the object
    pub fn symbolic_read(&self, alloc: AllocKey) -> Vec<WriteSiteId> {
        if self.is_constant(alloc) {
            return Vec::new();
        }
        let Some(object) = self.objects.get(&alloc) else {
            return Vec::new();
        };
        object
            .bytes
            .values()
            .copied()
            .chain(object.symbolic.iter().copied())
            .collect()
    }

    pub(crate) fn set_heap_byte(&mut self, alloc: AllocKey, offset: u64, site: WriteSiteId) {
        self.objects.entry(alloc).or_default().bytes.insert(offset, site);
    }

    pub(crate) fn push_symbolic_write(&mut self, alloc: AllocKey, site: WriteSiteId) {
        self.objects.entry(alloc).or_default().symbolic.push(site);
    }

    /// Forgets a freed object
    pub fn release_object(&mut self, alloc: AllocKey) {
        self.objects.remove(&alloc);
    }

    // ── symbolic arrays ───────────────────────────────────────────────────

    pub fn register_array(&mut self, alloc: AllocKey, owner: ExecRecordId) {
        self.alloc_owners.insert(alloc, owner);
    }

    pub fn array_owner(&self, alloc: AllocKey) -> EseResult<ExecRecordId> {
        self.alloc_owners
            .get(&alloc)
            .copied()
            .ok_or(EseError::UnregisteredAllocation(alloc))
    }

    pub fn array_byte(&self, alloc: AllocKey, offset: u64) -> Option<WriteSiteId> {
        self.array_bytes.get(&(alloc, offset)).copied()
    }

    pub fn array(&self, alloc: AllocKey) -> Option<WriteSiteId> {
        self.arrays.get(&alloc).copied()
    }

    pub(crate) fn set_array_byte(&mut self, alloc: AllocKey, offset: u64, site: WriteSiteId) {
        self.array_bytes.insert((alloc, offset), site);
    }

    pub(crate) fn set_array(&mut self, alloc: AllocKey, site: WriteSiteId) {
        self.arrays.insert(alloc, site);
    }
}
