pub mod cd_node;
pub mod control_group;

pub use cd_node::{CdArena, CdNode, CdNodeKind};
pub use control_group::ControlGroup;
