//! Record partitioning
//!
//! Splits every function into maximal straight-line slices ("records"),
//! cutting after each call and at each PHI/non-PHI transition, and links
//! them into an intraprocedural successor graph.

pub mod domain;
pub mod infrastructure;

pub use domain::{PostDominator, Record, RecordKind, RecordSet};
pub use infrastructure::RecordPartitioner;
