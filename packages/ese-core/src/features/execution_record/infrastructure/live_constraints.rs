//! Live constraint filtering
//!
//! A constraint is live when it reads a symbolic array byte at a live
//! concrete location, or any byte of an object or array that is live as a
//! whole.

use crate::shared::models::{AllocKey, ArrayRead, ExprRef, Location};
use std::collections::BTreeSet;

pub fn live_constraints(
    constraints: &[ExprRef],
    locations: impl IntoIterator<Item = Location>,
) -> Vec<ExprRef> {
    let mut bytes: BTreeSet<(AllocKey, u64)> = BTreeSet::new();
    let mut objects: BTreeSet<AllocKey> = BTreeSet::new();
    for loc in locations {
        match loc {
            Location::HeapByte { alloc, offset } | Location::ArrayByte { alloc, offset } => {
                bytes.insert((alloc, offset));
            }
            Location::HeapObject { alloc } | Location::Array { alloc } => {
                objects.insert(alloc);
            }
            Location::Stack { .. } => {}
        }
    }
    if bytes.is_empty() && objects.is_empty() {
        return Vec::new();
    }

    let live: BTreeSet<ExprRef> = constraints
        .iter()
        .filter(|c| {
            c.array_reads().into_iter().any(|r| match r {
                ArrayRead::Concrete { array, offset } => bytes.contains(&(array, offset)),
                ArrayRead::Symbolic { array } => objects.contains(&array),
            })
        })
        .cloned()
        .collect();
    live.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Expr, OpKind};

    fn lt(lhs: ExprRef, rhs: u64) -> ExprRef {
        Expr::apply(OpKind::Ult, vec![lhs, Expr::constant(rhs, 8)])
    }

    #[test]
    fn test_filters_by_live_bytes_and_objects() {
        let a = AllocKey::new(1, 0);
        let b = AllocKey::new(2, 0);
        let on_a0 = lt(Expr::read_at(a, 0), 10);
        let on_a1 = lt(Expr::read_at(a, 1), 10);
        let on_b_sym = lt(Expr::read(b, Expr::read_at(a, 3)), 4);
        let constraints = vec![on_a0.clone(), on_a1.clone(), on_b_sym.clone()];

        let live = live_constraints(
            &constraints,
            [Location::ArrayByte { alloc: a, offset: 0 }],
        );
        assert_eq!(live, vec![on_a0]);

        let live = live_constraints(&constraints, [Location::Array { alloc: b }]);
        assert_eq!(live, vec![on_b_sym]);
    }

    #[test]
    fn test_duplicates_collapse_and_order_is_canonical() {
        let a = AllocKey::new(1, 0);
        let c1 = lt(Expr::read_at(a, 0), 10);
        let c2 = lt(Expr::read_at(a, 0), 3);
        let forward = live_constraints(
            &[c1.clone(), c2.clone(), c1.clone()],
            [Location::Array { alloc: a }],
        );
        let backward = live_constraints(&[c2, c1], [Location::Array { alloc: a }]);
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn test_stack_only_live_set_has_no_constraints() {
        let a = AllocKey::new(1, 0);
        let live = live_constraints(
            &[lt(Expr::read_at(a, 0), 1)],
            [Location::Stack { frame: 0, reg: 0 }],
        );
        assert!(live.is_empty());
    }
}
