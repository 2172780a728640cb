//! Live-set cache
//!
//! Terminated records keyed by their live set. A lookup never reports a
//! match without comparing every live value against the path.

pub mod domain;
pub mod infrastructure;

pub use domain::{Bucket, LiveSetKey};
pub use infrastructure::{is_equivalent, LiveSetCache};
