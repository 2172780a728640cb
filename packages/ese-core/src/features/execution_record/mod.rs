//! Execution records
//!
//! The runtime tree of records mirroring the execution tree. A record
//! terminates once its children are done; termination computes the live
//! set other paths are compared against.

pub mod domain;
pub mod infrastructure;

pub use domain::{ExecRecord, LiveSet, RecordState};
pub use infrastructure::{live_constraints, ControlStack, NewRecord, RecordSeed, RecordTree};
