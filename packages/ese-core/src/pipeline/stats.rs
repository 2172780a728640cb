//! Counters snapshot for reporting

use crate::features::control_dependence::AnalysisStats;
use serde::Serialize;

/// Eliminator statistics
///
/// Kept whether or not prometheus metrics are enabled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EseStats {
    /// Static analysis summary
    pub analysis: AnalysisStats,

    pub records_created: u64,
    pub records_terminated: u64,
    pub records_reterminated: u64,
    pub records_pruned: u64,
    pub forks: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub holds: u64,
    pub releases: u64,
    pub groups_completed: u64,

    // Sizes at snapshot time
    pub cached_records: usize,
    pub comparers: usize,
    pub write_sites: usize,
    pub segments: u32,
    pub hold_edges: usize,
    pub held_paths: usize,
    pub live_paths: usize,
}

impl EseStats {
    pub fn prune_rate(&self) -> f64 {
        if self.records_created > 0 {
            self.records_pruned as f64 / self.records_created as f64
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
