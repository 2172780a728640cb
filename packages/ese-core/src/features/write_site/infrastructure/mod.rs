pub mod graph;
pub mod shadow;

pub use graph::{Resolved, WriteSiteGraph};
pub use shadow::WriteShadow;
