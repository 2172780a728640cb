//! Hold graph and scheduling
//!
//! Decides when an unexecuted record may run and when it may be compared
//! against the cache. Records wait ("hold") on pending records at the same
//! program point through edges between fork segments; the segment graph is
//! kept acyclic so no two paths wait on each other forever.

pub mod domain;
pub mod infrastructure;

pub use domain::{SchedulerEvents, StepOutcome};
pub use infrastructure::{Comparer, HoldGraph, Scheduler};
