//! Core data models shared by every feature
//!
//! - `ids`      : typed arena handles
//! - `program`  : the executor-neutral IR ESE partitions and analyzes
//! - `expr`     : observed values and path constraints
//! - `location` : allocation keys, location signatures, object snapshots

pub mod expr;
pub mod ids;
pub mod location;
pub mod program;

pub use expr::{ArrayRead, Expr, ExprRef, OpKind};
pub use ids::{
    AllocSiteId, BlockId, CdNodeId, ExecRecordId, FunctionId, GroupId, PathId, RecordId,
    SegmentId, WriteSiteId,
};
pub use location::{hash_combine, AllocKey, Location, ObjectSnapshot, OPAQUE_VALUE_HASH};
pub use program::{
    BasicBlock, Function, FunctionBuilder, Halting, InstLocation, Instruction, Program,
    ProgramBuilder, ProgramPoint,
};
