//! Error types for ese-core
//!
//! Nothing here is a "normal" negative result: a failed cache lookup is
//! `Ok(None)`. Every variant reports broken input or bookkeeping, or a
//! failure of the embedding environment.

use crate::config::ConfigError;
use crate::shared::models::{AllocKey, ExecRecordId, RecordId, SegmentId, WriteSiteId};
use thiserror::Error;

/// Coarse classification so an embedding host can decide between aborting
/// the whole search and discarding the offending path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bug in the static analysis input or in ESE bookkeeping
    Structural,
    /// A location or allocation the cache expected to own is unknown
    Resource,
    /// Configuration, IO or metrics registry failure
    Environment,
}

#[derive(Debug, Error)]
pub enum EseError {
    // ── structural ────────────────────────────────────────────────────────
    #[error("Malformed record in function '{function}': {reason}")]
    MalformedRecord { function: String, reason: String },

    #[error("PHI record {record} in function '{function}' must have exactly one non-PHI successor, found {found}")]
    PhiSuccessor {
        function: String,
        record: RecordId,
        found: usize,
    },

    #[error("No immediate postdominator for {node} in function '{function}'")]
    MissingPostdominator { function: String, node: String },

    #[error("Control node {node} in function '{function}' has no control-dependence predecessor")]
    OrphanControlNode { function: String, node: String },

    #[error("Write-site {site} is already tracked by record {record}")]
    DuplicateWriteSite {
        site: WriteSiteId,
        record: ExecRecordId,
    },

    #[error("Unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("Record {record} cannot move from {from} to {to}")]
    InvalidTransition {
        record: ExecRecordId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Hold protocol violated between {waiter} and {target}: {reason}")]
    HoldProtocol {
        waiter: SegmentId,
        target: SegmentId,
        reason: String,
    },

    #[error("Path {0} is already tracked")]
    DuplicatePath(u32),

    // ── resource ──────────────────────────────────────────────────────────
    #[error("Location {location} of record {record} was never registered")]
    UnregisteredLocation {
        record: ExecRecordId,
        location: String,
    },

    #[error("Symbolic array {0} has no owning record")]
    UnregisteredAllocation(AllocKey),

    #[error("Access of {width} bytes at offset {offset} of {alloc} overflows the address space")]
    OffsetOverflow {
        alloc: AllocKey,
        offset: u64,
        width: u64,
    },

    // ── environment ───────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl EseError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EseError::MalformedRecord { .. }
            | EseError::PhiSuccessor { .. }
            | EseError::MissingPostdominator { .. }
            | EseError::OrphanControlNode { .. }
            | EseError::DuplicateWriteSite { .. }
            | EseError::UnknownHandle { .. }
            | EseError::InvalidTransition { .. }
            | EseError::HoldProtocol { .. }
            | EseError::DuplicatePath(_) => ErrorClass::Structural,
            EseError::UnregisteredLocation { .. }
            | EseError::UnregisteredAllocation(_)
            | EseError::OffsetOverflow { .. } => ErrorClass::Resource,
            EseError::Config(_) | EseError::Io(_) | EseError::Metrics(_) => {
                ErrorClass::Environment
            }
        }
    }

    /// Structural and resource errors mean pruning decisions can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        !matches!(self.class(), ErrorClass::Environment)
    }

    pub fn unknown(kind: &'static str, id: u32) -> Self {
        EseError::UnknownHandle { kind, id }
    }

    pub fn malformed(function: impl Into<String>, reason: impl Into<String>) -> Self {
        EseError::MalformedRecord {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

pub type EseResult<T> = std::result::Result<T, EseError>;
