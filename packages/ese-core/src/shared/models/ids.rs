//! Typed arena handles
//!
//! Every graph in ESE is an arena addressed by integer handles; edges are
//! index lists into the arena.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Function index in [`Program::functions`](super::Program)
    FunctionId,
    "f"
);
define_id!(
    /// Basic block index within a function
    BlockId,
    "bb"
);
define_id!(
    /// Static record (straight-line slice)
    RecordId,
    "r"
);
define_id!(
    /// Control group (SCC of the record control graph)
    GroupId,
    "g"
);
define_id!(
    /// Node of the augmented control-flow graph
    CdNodeId,
    "n"
);
define_id!(
    /// Runtime write-site
    WriteSiteId,
    "w"
);
define_id!(
    /// Runtime execution record
    ExecRecordId,
    "x"
);
define_id!(
    /// Hold-graph segment
    SegmentId,
    "s"
);
define_id!(
    /// Executor-assigned path handle
    PathId,
    "p"
);
define_id!(
    /// Allocation site (the instruction that allocates)
    AllocSiteId,
    "a"
);
