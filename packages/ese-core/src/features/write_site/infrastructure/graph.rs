//! Write-site arena and the write/read operations the interpreter reports
//!
//! Every write consumes the step's pending reads as its predecessors.
//! Concrete-offset heap writes replace the byte's previous write-site;
//! symbolic-offset writes accumulate. Array materializations have no
//! predecessors and are created once per path and location.

use super::shadow::WriteShadow;
use crate::errors::{EseError, EseResult};
use crate::features::write_site::domain::{PendingReads, WriteSite, WriteSiteKind};
use crate::shared::models::{
    AllocKey, ExecRecordId, ExprRef, Location, ObjectSnapshot, WriteSiteId,
};
#[cfg(feature = "trace")]
use tracing::trace;

/// Write-sites found for one location, and the materializations created
/// while looking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub sites: Vec<WriteSiteId>,
    pub created: Vec<WriteSiteId>,
}

#[derive(Debug, Default)]
pub struct WriteSiteGraph {
    sites: Vec<WriteSite>,
}

impl WriteSiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, owner: ExecRecordId, kind: WriteSiteKind, preds: Vec<WriteSiteId>) -> WriteSiteId {
        let id = WriteSiteId::from_index(self.sites.len());
        let location = kind.location();
        let site = WriteSite {
            id,
            owner,
            loc_hash: location.signature(),
            val_hash: kind.value_hash(),
            location,
            kind,
            preds,
        };
        #[cfg(feature = "trace")]
        trace!(site = %site, preds = site.preds.len(), "write-site");
        self.sites.push(site);
        id
    }

    pub fn get(&self, id: WriteSiteId) -> EseResult<&WriteSite> {
        self.sites
            .get(id.index())
            .ok_or_else(|| EseError::unknown("write-site", id.0))
    }

    /// Ids are only minted by this arena
    pub fn site(&self, id: WriteSiteId) -> &WriteSite {
        &self.sites[id.index()]
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stack_write(
        &mut self,
        owner: ExecRecordId,
        shadow: &mut WriteShadow,
        reads: &mut PendingReads,
        frame: u32,
        reg: u32,
        value: ExprRef,
    ) -> WriteSiteId {
        let id = self.add(owner, WriteSiteKind::Stack { frame, reg, value }, reads.take());
        shadow.set_stack_cell(frame, reg, id);
        id
    }

    /// One write-site per byte, all with the same predecessors
    pub fn heap_write_concrete(
        &mut self,
        owner: ExecRecordId,
        shadow: &mut WriteShadow,
        reads: &mut PendingReads,
        alloc: AllocKey,
        offset: u64,
        bytes: Vec<ExprRef>,
    ) -> Vec<WriteSiteId> {
        if shadow.is_constant(alloc) {
            return Vec::new();
        }
        let preds = reads.take();
        let mut ids = Vec::with_capacity(bytes.len());
        for (i, value) in bytes.into_iter().enumerate() {
            let offset = offset + i as u64;
            let kind = WriteSiteKind::HeapByte {
                alloc,
                offset,
                value,
            };
            let id = self.add(owner, kind, preds.clone());
            shadow.set_heap_byte(alloc, offset, id);
            ids.push(id);
        }
        ids
    }

    pub fn heap_write_symbolic(
        &mut self,
        owner: ExecRecordId,
        shadow: &mut WriteShadow,
        reads: &mut PendingReads,
        alloc: AllocKey,
        snapshot: ObjectSnapshot,
    ) -> Option<WriteSiteId> {
        if shadow.is_constant(alloc) {
            return None;
        }
        let id = self.add(owner, WriteSiteKind::HeapObject { alloc, snapshot }, reads.take());
        shadow.push_symbolic_write(alloc, id);
        Some(id)
    }

    /// Returns the site and whether it was created by this call
    pub fn array_materialize_concrete(
        &mut self,
        shadow: &mut WriteShadow,
        alloc: AllocKey,
        offset: u64,
    ) -> EseResult<(WriteSiteId, bool)> {
        if let Some(id) = shadow.array_byte(alloc, offset) {
            return Ok((id, false));
        }
        let owner = shadow.array_owner(alloc)?;
        let id = self.add(owner, WriteSiteKind::ArrayByte { alloc, offset }, Vec::new());
        shadow.set_array_byte(alloc, offset, id);
        Ok((id, true))
    }

    pub fn array_materialize_symbolic(
        &mut self,
        shadow: &mut WriteShadow,
        alloc: AllocKey,
    ) -> EseResult<(WriteSiteId, bool)> {
        if let Some(id) = shadow.array(alloc) {
            return Ok((id, false));
        }
        let owner = shadow.array_owner(alloc)?;
        let id = self.add(owner, WriteSiteKind::Array { alloc }, Vec::new());
        shadow.set_array(alloc, id);
        Ok((id, true))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Location resolution
    // ═══════════════════════════════════════════════════════════════════════

    /// Write-sites currently holding `location` in the path behind `shadow`
    ///
    /// Locations the path never wrote resolve to nothing; their value
    /// predates tracking.
    pub fn resolve(&mut self, shadow: &mut WriteShadow, location: Location) -> EseResult<Resolved> {
        let mut out = Resolved::default();
        match location {
            Location::Stack { frame, reg } => out.sites.extend(shadow.stack_cell(frame, reg)),
            Location::HeapByte { alloc, offset } => {
                out.sites.extend(shadow.heap_byte(alloc, offset))
            }
            Location::HeapObject { alloc } => {
                out.sites.extend_from_slice(shadow.symbolic_writes(alloc))
            }
            Location::ArrayByte { alloc, offset } => {
                let (id, created) = self.array_materialize_concrete(shadow, alloc, offset)?;
                out.sites.push(id);
                if created {
                    out.created.push(id);
                }
            }
            Location::Array { alloc } => {
                let (id, created) = self.array_materialize_symbolic(shadow, alloc)?;
                out.sites.push(id);
                if created {
                    out.created.push(id);
                }
            }
        }
        Ok(out)
    }
}
