/*
 * ESE Core - Equivalent-State Elimination for symbolic execution
 *
 * Feature-First Architecture:
 * - shared/      : Program IR, expressions, locations, typed handles
 * - features/    : Vertical slices (record_partition → control_dependence →
 *                  write_site → execution_record → live_set_cache → hold_graph)
 * - pipeline/    : Orchestration (EquivalentStateEliminator) and metrics
 * - config/      : YAML/preset configuration
 *
 * Single-threaded: every callback runs inline with one interpreter step.
 */

#![allow(clippy::new_without_default)] // Arenas are built from analysis input
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::too_many_arguments)] // Sweep helpers thread several arenas
#![allow(clippy::upper_case_acronyms)] // ACFG, ACDG naming

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (static analysis and runtime layers)
pub mod features;

/// Orchestration facade consumed by the executor
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{EseConfig, Preset};
pub use errors::{ErrorClass, EseError, EseResult};
pub use pipeline::{
    EquivalentStateEliminator, EseMetrics, EseStats, ReadDescriptor, SchedulerEvents,
    WriteDescriptor, WriteSiteHandle,
};
pub use shared::models::{
    AllocKey, AllocSiteId, ExecRecordId, Expr, ExprRef, FunctionId, InstLocation, Instruction,
    Location, ObjectSnapshot, PathId, Program, RecordId, SegmentId, WriteSiteId,
};
pub use shared::ports::{PathSource, PathView};
