//! Live-set cache model

use crate::shared::models::{ExecRecordId, Location};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::fmt;

/// Where a terminated record sits in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveSetKey {
    /// Hash of the sorted live locations; selects the bucket
    pub loc_hash: u64,
    /// Hash of the live values and live constraints; selects the entry
    pub val_hash: u64,
}

impl fmt::Display for LiveSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}/{:016x}", self.loc_hash, self.val_hash)
    }
}

/// Records sharing one live location list
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Sorted, distinct; taken from the first record inserted
    pub locations: Vec<Location>,
    pub entries: FxHashMap<u64, BTreeSet<ExecRecordId>>,
}

impl Bucket {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            locations,
            entries: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeSet::is_empty)
    }
}
