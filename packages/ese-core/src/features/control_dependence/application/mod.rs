pub mod analyzer;

pub use analyzer::{AnalysisStats, ControlDependence, CoverOutcome};
