//! Feature modules, leaves first
//!
//! record_partition → control_dependence → write_site → execution_record →
//! live_set_cache, with hold_graph scheduling when execution records may be
//! checked against the cache.

pub mod control_dependence;
pub mod execution_record;
pub mod hold_graph;
pub mod live_set_cache;
pub mod record_partition;
pub mod write_site;
