pub mod comparer;
pub mod graph;
pub mod scheduler;

pub use comparer::Comparer;
pub use graph::HoldGraph;
pub use scheduler::Scheduler;
