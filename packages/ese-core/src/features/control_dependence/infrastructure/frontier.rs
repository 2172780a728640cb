//! Control-dependence edges from the postdominance frontier
//!
//! Bottom-up over the postdominator tree:
//! - local: ACFG predecessors `y` of `x` with `ipostdom(y) != x`
//! - up   : frontier members `y` of each child `z` with `ipostdom(y) != x`
//!
//! `y` in the frontier of `x` means `x` is control dependent on `y`, recorded
//! as the PCG edge `y → x`.

use super::acfg::AugmentedCfg;
use crate::features::control_dependence::domain::CdArena;
use crate::shared::models::CdNodeId;
use rustc_hash::FxHashMap;
use std::collections::{BTreeSet, VecDeque};

pub fn compute_control_edges(acfg: &AugmentedCfg, arena: &mut CdArena) -> usize {
    // Breadth-first over the postdominator tree; reversed it visits children first
    let mut order = Vec::with_capacity(acfg.nodes.len());
    let mut queue = VecDeque::from([acfg.super_exit]);
    while let Some(n) = queue.pop_front() {
        order.push(n);
        queue.extend(arena.node(n).postdom_children.iter().copied());
    }

    let mut frontier: FxHashMap<CdNodeId, BTreeSet<CdNodeId>> = FxHashMap::default();
    for &x in order.iter().rev() {
        let node = arena.node(x);
        let mut fx = BTreeSet::new();

        for &y in &node.acfg_preds {
            if arena.node(y).ipostdom != Some(x) {
                fx.insert(y);
            }
        }
        for z in &node.postdom_children {
            if let Some(fz) = frontier.get(z) {
                for &y in fz {
                    if arena.node(y).ipostdom != Some(x) {
                        fx.insert(y);
                    }
                }
            }
        }
        frontier.insert(x, fx);
    }

    let mut edges = 0;
    for &y in &acfg.nodes {
        if let Some(fy) = frontier.get(&y) {
            for &x in fy {
                arena.add_pcg_edge(x, y);
                edges += 1;
            }
        }
    }
    edges
}
