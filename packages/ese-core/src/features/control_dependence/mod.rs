//! Control-dependence analysis
//!
//! Per function: augmented CFG → postdominator tree (reverse graph, rooted at
//! super-exit) → postdominance frontier → control-dependence edges → ACDG.
//! Then interprocedural stitching, SCC collapsing into control groups, and
//! incremental group completion as coverage grows.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AnalysisStats, ControlDependence, CoverOutcome};
pub use domain::{CdArena, CdNode, CdNodeKind, ControlGroup};
pub use infrastructure::acfg::AugmentedCfg;
