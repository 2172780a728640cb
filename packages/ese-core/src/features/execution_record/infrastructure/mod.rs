pub mod control_stack;
pub mod live_constraints;
pub mod tree;

pub use control_stack::ControlStack;
pub use live_constraints::live_constraints;
pub use tree::{NewRecord, RecordSeed, RecordTree};
