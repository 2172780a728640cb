//! Prometheus metrics for the eliminator

use crate::errors::EseResult;
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};

#[derive(Clone)]
pub struct EseMetrics {
    pub records_created: IntCounter,
    pub records_terminated: IntCounter,
    pub records_reterminated: IntCounter,
    pub records_pruned: IntCounter,
    pub forks: IntCounter,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub holds: IntCounter,
    pub releases: IntCounter,
    pub groups_completed: IntCounter,
    pub cached_records: IntGauge,
    pub held_paths: IntGauge,
}

impl EseMetrics {
    pub fn new(registry: &Registry) -> EseResult<Self> {
        Ok(Self {
            records_created: register_int_counter_with_registry!(
                Opts::new("ese_records_created_total", "Execution records created"),
                registry
            )?,
            records_terminated: register_int_counter_with_registry!(
                Opts::new("ese_records_terminated_total", "Execution records terminated"),
                registry
            )?,
            records_reterminated: register_int_counter_with_registry!(
                Opts::new(
                    "ese_records_reterminated_total",
                    "Live sets recomputed after a control group completed"
                ),
                registry
            )?,
            records_pruned: register_int_counter_with_registry!(
                Opts::new("ese_records_pruned_total", "Execution records pruned as equivalent"),
                registry
            )?,
            forks: register_int_counter_with_registry!(
                Opts::new("ese_forks_total", "Path forks"),
                registry
            )?,
            cache_hits: register_int_counter_with_registry!(
                Opts::new("ese_cache_hits_total", "Live-set cache hits"),
                registry
            )?,
            cache_misses: register_int_counter_with_registry!(
                Opts::new("ese_cache_misses_total", "Live-set cache misses"),
                registry
            )?,
            holds: register_int_counter_with_registry!(
                Opts::new("ese_holds_total", "Paths held on a pending record"),
                registry
            )?,
            releases: register_int_counter_with_registry!(
                Opts::new("ese_releases_total", "Held paths released"),
                registry
            )?,
            groups_completed: register_int_counter_with_registry!(
                Opts::new("ese_groups_completed_total", "Control groups completed"),
                registry
            )?,
            cached_records: register_int_gauge_with_registry!(
                Opts::new("ese_cached_records", "Terminated records in the live-set cache"),
                registry
            )?,
            held_paths: register_int_gauge_with_registry!(
                Opts::new("ese_held_paths", "Paths currently held"),
                registry
            )?,
        })
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.cache_hits.get() as f64;
        let total = hits + self.cache_misses.get() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once_per_registry() {
        let registry = Registry::new();
        let metrics = EseMetrics::new(&registry).unwrap();
        metrics.cache_hits.inc();
        metrics.cache_misses.inc_by(3);
        assert!((metrics.hit_rate() - 0.25).abs() < f64::EPSILON);

        assert!(EseMetrics::new(&registry).is_err());
        assert!(EseMetrics::new(&Registry::new()).is_ok());
    }
}
