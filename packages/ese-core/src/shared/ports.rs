//! Executor-facing ports
//!
//! ESE reads a path's live registers, memory and constraints only through
//! these traits, and never mutates interpreter state.

use super::models::{AllocKey, ExprRef, InstLocation, ObjectSnapshot, PathId};

/// Read-only view of one symbolic-execution path
pub trait PathView {
    /// Instruction the path will execute next
    fn pc(&self) -> InstLocation;

    /// Call instructions of every frame below the current one, outermost first
    fn call_string(&self) -> Vec<InstLocation>;

    /// Number of stack frames
    fn stack_depth(&self) -> u32;

    /// Current value of a register; `None` if unset or the frame does not exist
    fn stack_value(&self, frame: u32, reg: u32) -> Option<ExprRef>;

    /// Current value of a heap byte; `None` if the object does not exist
    fn read_byte(&self, alloc: AllocKey, offset: u64) -> Option<ExprRef>;

    /// Full contents of a heap object; `None` if it does not exist
    fn object_snapshot(&self, alloc: AllocKey) -> Option<ObjectSnapshot>;

    /// Path constraints, in the order they were added
    fn constraints(&self) -> &[ExprRef];
}

/// Lookup of paths by handle, implemented by the executor's state set
pub trait PathSource {
    fn path(&self, id: PathId) -> Option<&dyn PathView>;
}
