//! Postdominator tree construction
//!
//! Lengauer–Tarjan ("simple" variant with path compression) over the reverse
//! ACFG rooted at super-exit. Both the DFS numbering and the path compression
//! are iterative, so deep graphs cannot overflow the stack.
//!
//! # References
//! - Lengauer, T. and Tarjan, R. E. "A Fast Algorithm for Finding Dominators
//!   in a Flowgraph" (1979)

use super::acfg::AugmentedCfg;
use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::domain::CdArena;
use crate::shared::models::CdNodeId;
use rustc_hash::FxHashMap;

const UNDEF: usize = usize::MAX;

/// Immediate dominators of a graph given as dense adjacency lists
///
/// Returns `None` for the root and for nodes unreachable from it.
pub fn immediate_dominators(
    root: usize,
    succs: &[Vec<usize>],
    preds: &[Vec<usize>],
) -> Vec<Option<usize>> {
    let n = succs.len();
    let mut dfnum = vec![UNDEF; n];
    let mut vertex: Vec<usize> = Vec::with_capacity(n);
    let mut parent = vec![UNDEF; n];

    dfnum[root] = 0;
    vertex.push(root);
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    while let Some(top) = stack.last_mut() {
        let v = top.0;
        if top.1 < succs[v].len() {
            let w = succs[v][top.1];
            top.1 += 1;
            if dfnum[w] == UNDEF {
                dfnum[w] = vertex.len();
                vertex.push(w);
                parent[w] = v;
                stack.push((w, 0));
            }
        } else {
            stack.pop();
        }
    }

    let mut semi = dfnum.clone();
    let mut label: Vec<usize> = (0..n).collect();
    let mut ancestor = vec![UNDEF; n];
    let mut idom = vec![UNDEF; n];
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in (1..vertex.len()).rev() {
        let w = vertex[i];
        for &v in &preds[w] {
            if dfnum[v] == UNDEF {
                continue;
            }
            let u = eval(v, &mut ancestor, &mut label, &semi);
            if semi[u] < semi[w] {
                semi[w] = semi[u];
            }
        }
        bucket[vertex[semi[w]]].push(w);

        let p = parent[w];
        ancestor[w] = p;
        for v in std::mem::take(&mut bucket[p]) {
            let u = eval(v, &mut ancestor, &mut label, &semi);
            idom[v] = if semi[u] < semi[v] { u } else { p };
        }
    }

    for &w in vertex.iter().skip(1) {
        if idom[w] != vertex[semi[w]] {
            idom[w] = idom[idom[w]];
        }
    }

    (0..n)
        .map(|v| {
            if v == root || dfnum[v] == UNDEF {
                None
            } else {
                Some(idom[v])
            }
        })
        .collect()
}

fn eval(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) -> usize {
    if ancestor[v] == UNDEF {
        return v;
    }
    compress(v, ancestor, label, semi);
    label[v]
}

fn compress(v: usize, ancestor: &mut [usize], label: &mut [usize], semi: &[usize]) {
    let mut path = Vec::new();
    let mut x = v;
    while ancestor[ancestor[x]] != UNDEF {
        path.push(x);
        x = ancestor[x];
    }
    // Nodes nearest the root first
    while let Some(x) = path.pop() {
        let a = ancestor[x];
        if semi[label[a]] < semi[label[x]] {
            label[x] = label[a];
        }
        ancestor[x] = ancestor[a];
    }
}

/// Fills `ipostdom` and `postdom_children` for every node of the function
///
/// Every node other than super-exit must have an immediate postdominator.
pub fn compute_postdominators(acfg: &AugmentedCfg, arena: &mut CdArena) -> EseResult<()> {
    let local: FxHashMap<CdNodeId, usize> = acfg
        .nodes
        .iter()
        .enumerate()
        .map(|(i, &n)| (n, i))
        .collect();

    // Reverse graph: successors are ACFG predecessors
    let mut rev_succs = vec![Vec::new(); acfg.nodes.len()];
    let mut rev_preds = vec![Vec::new(); acfg.nodes.len()];
    for (i, &n) in acfg.nodes.iter().enumerate() {
        let node = arena.node(n);
        rev_succs[i] = node.acfg_preds.iter().filter_map(|p| local.get(p).copied()).collect();
        rev_preds[i] = node.acfg_succs.iter().filter_map(|s| local.get(s).copied()).collect();
    }

    let idoms = immediate_dominators(local[&acfg.super_exit], &rev_succs, &rev_preds);

    for (i, idom) in idoms.into_iter().enumerate() {
        let n = acfg.nodes[i];
        match idom {
            Some(d) => arena.set_ipostdom(n, acfg.nodes[d]),
            None if n == acfg.super_exit => {}
            None => {
                return Err(EseError::MissingPostdominator {
                    function: acfg.name.clone(),
                    node: arena.kind(n).to_string(),
                })
            }
        }
    }
    Ok(())
}
