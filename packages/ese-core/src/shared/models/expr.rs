//! Observed values and path constraints
//!
//! The executor owns the real expression language. ESE only needs to compare
//! expressions structurally, hash them and find the symbolic array reads a
//! constraint depends on, so this is a deliberately small mirror of it.

use super::location::AllocKey;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type ExprRef = Arc<Expr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Not,
    Eq,
    Ne,
    Ult,
    Ule,
    Slt,
    Sle,
    Concat,
    Extract,
    ZExt,
    SExt,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    Constant { value: u64, width: u32 },
    /// Byte read of a symbolic array
    Read { array: AllocKey, index: ExprRef },
    Apply { op: OpKind, args: Vec<ExprRef> },
}

/// A symbolic array byte a constraint depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArrayRead {
    Concrete { array: AllocKey, offset: u64 },
    Symbolic { array: AllocKey },
}

impl Expr {
    pub fn constant(value: u64, width: u32) -> ExprRef {
        Arc::new(Expr::Constant { value, width })
    }

    pub fn byte(value: u8) -> ExprRef {
        Self::constant(u64::from(value), 8)
    }

    pub fn read(array: AllocKey, index: ExprRef) -> ExprRef {
        Arc::new(Expr::Read { array, index })
    }

    pub fn read_at(array: AllocKey, offset: u64) -> ExprRef {
        Self::read(array, Self::constant(offset, 32))
    }

    pub fn apply(op: OpKind, args: Vec<ExprRef>) -> ExprRef {
        Arc::new(Expr::Apply { op, args })
    }

    pub fn as_constant(&self) -> Option<u64> {
        match self {
            Expr::Constant { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn structural_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Every array read in the expression, including reads nested in indices
    pub fn array_reads(&self) -> Vec<ArrayRead> {
        let mut out = Vec::new();
        let mut stack: Vec<&Expr> = vec![self];
        while let Some(e) = stack.pop() {
            match e {
                Expr::Constant { .. } => {}
                Expr::Read { array, index } => {
                    match index.as_constant() {
                        Some(offset) => out.push(ArrayRead::Concrete {
                            array: *array,
                            offset,
                        }),
                        None => out.push(ArrayRead::Symbolic { array: *array }),
                    }
                    stack.push(index);
                }
                Expr::Apply { args, .. } => stack.extend(args.iter().map(|a| a.as_ref())),
            }
        }
        out
    }
}
