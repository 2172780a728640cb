//! Orchestration
//!
//! - `eliminator`  : executor-facing facade tying every feature together
//! - `descriptors` : read/write reports from the executor
//! - `metrics`     : prometheus counters
//! - `stats`       : serializable snapshot of the same counters

pub mod descriptors;
pub mod eliminator;
pub mod metrics;
pub mod stats;

pub use crate::features::hold_graph::SchedulerEvents;
pub use descriptors::{ReadDescriptor, WriteDescriptor, WriteSiteHandle};
pub use eliminator::EquivalentStateEliminator;
pub use metrics::EseMetrics;
pub use stats::EseStats;
