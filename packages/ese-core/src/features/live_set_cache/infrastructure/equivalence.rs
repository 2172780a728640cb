//! Live-set hashing and exact comparison against a running path
//!
//! Hashes only narrow the candidates. Equivalence is decided by comparing
//! every live value with what the path holds right now.

use crate::features::execution_record::{live_constraints, ExecRecord};
use crate::features::live_set_cache::domain::LiveSetKey;
use crate::features::write_site::{WriteSiteGraph, WriteSiteKind};
use crate::shared::models::{hash_combine, ExprRef, Location, OPAQUE_VALUE_HASH};
use crate::shared::ports::PathView;
use std::collections::BTreeMap;

/// Distinct live locations in canonical order, with the record's key
pub fn record_key(record: &ExecRecord, graph: &WriteSiteGraph) -> (Vec<Location>, LiveSetKey) {
    let mut values: BTreeMap<Location, u64> = BTreeMap::new();
    for id in &record.live_reads {
        let site = graph.site(*id);
        values.entry(site.location).or_insert(site.val_hash);
    }

    let mut loc_hash = 0;
    let mut val_hash = 0;
    for (location, value) in &values {
        hash_combine(&mut loc_hash, location.signature());
        hash_combine(&mut val_hash, *value);
    }
    combine_constraints(&mut val_hash, &record.live_constraints);

    let locations = values.into_keys().collect();
    (locations, LiveSetKey { loc_hash, val_hash })
}

/// Value hash of `locations` in the path's current state
///
/// `None` when a location cannot be read, e.g. a frame the path does not
/// have or an object it freed.
pub fn path_value_hash(locations: &[Location], view: &dyn PathView) -> Option<u64> {
    let depth = view.stack_depth();
    let mut val_hash = 0;
    for location in locations {
        let h = match *location {
            Location::Stack { frame, reg } => {
                if frame >= depth {
                    return None;
                }
                view.stack_value(frame, reg).map_or(0, |v| v.structural_hash())
            }
            Location::HeapByte { alloc, offset } => view.read_byte(alloc, offset)?.structural_hash(),
            Location::HeapObject { .. } | Location::ArrayByte { .. } | Location::Array { .. } => {
                OPAQUE_VALUE_HASH
            }
        };
        hash_combine(&mut val_hash, h);
    }

    let constraints = live_constraints(view.constraints(), locations.iter().copied());
    combine_constraints(&mut val_hash, &constraints);
    Some(val_hash)
}

fn combine_constraints(seed: &mut u64, constraints: &[ExprRef]) {
    for c in constraints {
        hash_combine(seed, c.structural_hash());
    }
}

/// Exact comparison of a terminated record with a path
///
/// Order: position, stack cells, constraints, heap bytes, object snapshots.
pub fn is_equivalent(record: &ExecRecord, view: &dyn PathView, graph: &WriteSiteGraph) -> bool {
    if record.point.inst != view.pc() || record.point.callers != view.call_string() {
        return false;
    }

    let sites: Vec<&WriteSiteKind> = record
        .live_reads
        .iter()
        .map(|id| &graph.site(*id).kind)
        .collect();

    for kind in &sites {
        if let WriteSiteKind::Stack { frame, reg, value } = kind {
            if view.stack_value(*frame, *reg).as_ref() != Some(value) {
                return false;
            }
        }
    }

    let path_constraints = live_constraints(
        view.constraints(),
        record.live_reads.iter().map(|id| graph.site(*id).location),
    );
    if path_constraints != record.live_constraints {
        return false;
    }

    for kind in &sites {
        if let WriteSiteKind::HeapByte { alloc, offset, value } = kind {
            if view.read_byte(*alloc, *offset).as_ref() != Some(value) {
                return false;
            }
        }
    }

    sites.iter().all(|kind| match kind {
        WriteSiteKind::HeapObject { alloc, snapshot } => {
            view.object_snapshot(*alloc).as_ref() == Some(snapshot)
        }
        _ => true,
    })
}
