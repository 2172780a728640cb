//! Two-level live-set cache
//!
//! Terminated records are bucketed by the hash of their live locations, then
//! by the hash of their live values. A lookup rehashes each bucket's
//! locations against the path's current state and compares only the records
//! under a matching value hash.

use super::equivalence::{is_equivalent, path_value_hash, record_key};
use crate::errors::{EseError, EseResult};
use crate::features::execution_record::RecordTree;
use crate::features::live_set_cache::domain::{Bucket, LiveSetKey};
use crate::features::write_site::WriteSiteGraph;
use crate::shared::models::ExecRecordId;
use crate::shared::ports::PathView;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Default)]
pub struct LiveSetCache {
    buckets: BTreeMap<u64, Bucket>,
    keys: FxHashMap<ExecRecordId, LiveSetKey>,
}

impl LiveSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a terminated record, moving it if it is already cached
    pub fn insert(
        &mut self,
        record: ExecRecordId,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<LiveSetKey> {
        let rec = tree.get(record)?;
        if !rec.is_terminated() {
            return Err(EseError::InvalidTransition {
                record,
                from: rec.state.as_str(),
                to: "cached",
            });
        }

        self.detach(record);
        let (locations, key) = record_key(rec, graph);
        self.buckets
            .entry(key.loc_hash)
            .or_insert_with(|| Bucket::new(locations))
            .entries
            .entry(key.val_hash)
            .or_default()
            .insert(record);
        self.keys.insert(record, key);
        trace!(record = %record, key = %key, "cached");
        Ok(key)
    }

    /// Moves a cached record after its live set changed
    pub fn readd(
        &mut self,
        record: ExecRecordId,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<LiveSetKey> {
        if !self.keys.contains_key(&record) {
            return Err(EseError::UnregisteredLocation {
                record,
                location: "live-set cache entry".to_string(),
            });
        }
        self.insert(record, tree, graph)
    }

    fn detach(&mut self, record: ExecRecordId) {
        let Some(key) = self.keys.remove(&record) else {
            return;
        };
        if let Some(bucket) = self.buckets.get_mut(&key.loc_hash) {
            if let Some(entry) = bucket.entries.get_mut(&key.val_hash) {
                entry.remove(&record);
                if entry.is_empty() {
                    bucket.entries.remove(&key.val_hash);
                }
            }
        }
    }

    /// First cached record equivalent to the path, if any
    pub fn lookup(
        &self,
        view: &dyn PathView,
        tree: &RecordTree,
        graph: &WriteSiteGraph,
    ) -> EseResult<Option<ExecRecordId>> {
        for bucket in self.buckets.values() {
            let Some(val_hash) = path_value_hash(&bucket.locations, view) else {
                continue;
            };
            let Some(candidates) = bucket.entries.get(&val_hash) else {
                continue;
            };
            for id in candidates {
                if is_equivalent(tree.get(*id)?, view, graph) {
                    return Ok(Some(*id));
                }
            }
        }
        Ok(None)
    }

    pub fn contains(&self, record: ExecRecordId) -> bool {
        self.keys.contains_key(&record)
    }

    pub fn key_of(&self, record: ExecRecordId) -> Option<LiveSetKey> {
        self.keys.get(&record).copied()
    }

    /// Cached and no longer provisional
    pub fn is_final(&self, record: ExecRecordId, tree: &RecordTree) -> EseResult<bool> {
        Ok(self.contains(record) && tree.get(record)?.is_final())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
