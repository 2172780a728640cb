pub mod cache;
pub mod equivalence;

pub use cache::LiveSetCache;
pub use equivalence::{is_equivalent, path_value_hash, record_key};
