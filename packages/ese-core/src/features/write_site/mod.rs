//! Write-site graph
//!
//! One node per observable write, with predecessor edges to the write-sites
//! read while producing it. Nodes are never mutated after creation; a path's
//! shadow memory maps each location to the write-site currently holding it.

pub mod domain;
pub mod infrastructure;

pub use domain::{PendingReads, WriteSite, WriteSiteKind};
pub use infrastructure::{Resolved, WriteShadow, WriteSiteGraph};
