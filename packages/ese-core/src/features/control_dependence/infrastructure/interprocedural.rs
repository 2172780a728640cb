//! ACDG projection and interprocedural stitching
//!
//! The ACDG keeps entry, exit, return and record nodes. Control decided by
//! start is attributed to entry, and control decided by a return predicate to
//! the matching return node. Stitching then links call records to callee
//! entries and callee exits to caller return nodes (ICFG), and resolves
//! placeholder dependences to the concrete records behind them.

use super::acfg::{call_targets, AugmentedCfg};
use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::domain::{CdArena, CdNodeKind};
use crate::features::record_partition::{PostDominator, RecordSet};
use crate::shared::models::{CdNodeId, FunctionId, Program};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};
use tracing::trace;

/// Projects PCG edges onto ACDG nodes and records each record's resolved
/// immediate postdominator
pub fn build_acdg(acfg: &AugmentedCfg, arena: &mut CdArena, records: &mut RecordSet) -> EseResult<()> {
    let mut edges = Vec::new();
    for &n1 in &acfg.nodes {
        let k1 = arena.kind(n1);
        for &n2 in &arena.node(n1).pcg_succs {
            let k2 = arena.kind(n2);
            match k1 {
                _ if k1.is_acdg() && k2.is_acdg() => edges.push((n1, n2)),
                CdNodeKind::Start
                    if !matches!(k2, CdNodeKind::Entry | CdNodeKind::ReturnPredicate { .. }) =>
                {
                    edges.push((acfg.entry, n2))
                }
                CdNodeKind::ReturnPredicate { call }
                    if !matches!(k2, CdNodeKind::ReturnPredicate { .. }) =>
                {
                    if let Some(&ret) = acfg.return_nodes.get(&call) {
                        edges.push((ret, n2));
                    }
                }
                _ => {}
            }
        }
    }
    for (a, b) in edges {
        arena.add_acdg_edge(a, b);
    }

    for &n in &acfg.nodes {
        let CdNodeKind::Record { record, phi_pred } = arena.kind(n) else {
            continue;
        };
        if phi_pred.is_some() && records.get(record)?.ipostdom != PostDominator::Unknown {
            continue;
        }
        if let Some(ipdom) = arena.node(n).ipostdom {
            records.get_mut(record)?.ipostdom = resolve_postdominator(acfg, arena, ipdom);
        }
    }

    check_control_preds(acfg, arena)
}

/// Follows synthetic return nodes to the record they lead to
fn resolve_postdominator(acfg: &AugmentedCfg, arena: &CdArena, node: CdNodeId) -> PostDominator {
    let mut cur = node;
    for _ in 0..=acfg.nodes.len() {
        match arena.kind(cur) {
            CdNodeKind::Record { record, .. } => return PostDominator::Record(record),
            CdNodeKind::Exit => return PostDominator::Exit,
            CdNodeKind::SuperExit => return PostDominator::SuperExit,
            CdNodeKind::Start | CdNodeKind::Entry => return PostDominator::Unknown,
            CdNodeKind::Return { .. } | CdNodeKind::ReturnPredicate { .. } => {
                match arena
                    .node(cur)
                    .acfg_succs
                    .iter()
                    .copied()
                    .find(|&s| s != acfg.super_exit)
                {
                    Some(next) => cur = next,
                    None => return PostDominator::SuperExit,
                }
            }
        }
    }
    PostDominator::Unknown
}

/// Every record node reachable from start must be control dependent on something
fn check_control_preds(acfg: &AugmentedCfg, arena: &CdArena) -> EseResult<()> {
    for n in acfg.reachable(arena) {
        let node = arena.node(n);
        if matches!(node.kind, CdNodeKind::Record { .. }) && node.acdg_preds.is_empty() {
            return Err(EseError::OrphanControlNode {
                function: acfg.name.clone(),
                node: node.kind.to_string(),
            });
        }
    }
    Ok(())
}

/// Builds ICFG edges and the record-level control graph across functions
///
/// Returns the number of record control edges.
pub fn stitch(
    acfgs: &FxHashMap<FunctionId, AugmentedCfg>,
    arena: &mut CdArena,
    records: &mut RecordSet,
    program: &Program,
) -> EseResult<usize> {
    let mut icfg_edges = Vec::new();
    let mut placeholder_targets = BTreeSet::new();
    let mut control_edges = BTreeSet::new();

    let mut functions: Vec<&FunctionId> = acfgs.keys().collect();
    functions.sort();

    for f in functions {
        let acfg = &acfgs[f];
        for &n1 in &acfg.nodes {
            let node = arena.node(n1);
            for &n2 in &node.acdg_succs {
                icfg_edges.push((n1, n2));
                if let (Some(r1), Some(r2)) = (node.kind.record(), arena.kind(n2).record()) {
                    control_edges.insert((r1, r2));
                }
                if node.kind.is_placeholder() {
                    placeholder_targets.insert(n2);
                }
            }

            if let CdNodeKind::Record {
                record,
                phi_pred: None,
            } = node.kind
            {
                if !records.get(record)?.is_call() {
                    continue;
                }
                for callee in call_targets(program, records, record)? {
                    let Some(cacfg) = acfgs.get(&callee) else {
                        continue;
                    };
                    icfg_edges.push((n1, cacfg.entry));
                    if let Some(&ret) = acfg.return_nodes.get(&record) {
                        icfg_edges.push((cacfg.exit, ret));
                    }
                }
            }
        }
    }

    for (a, b) in icfg_edges {
        arena.add_icfg_edge(a, b);
    }

    // Records depending on a placeholder depend on the records behind it
    for m in placeholder_targets {
        let Some(rm) = arena.kind(m).record() else {
            continue;
        };
        let mut visited: FxHashSet<CdNodeId> = FxHashSet::default();
        let mut worklist: VecDeque<CdNodeId> = arena
            .node(m)
            .icfg_preds
            .iter()
            .copied()
            .filter(|&p| arena.kind(p).is_placeholder())
            .collect();
        visited.extend(worklist.iter().copied());

        while let Some(n) = worklist.pop_front() {
            for &p in &arena.node(n).icfg_preds {
                match arena.kind(p).record() {
                    Some(rp) => {
                        control_edges.insert((rp, rm));
                    }
                    None => {
                        if visited.insert(p) {
                            worklist.push_back(p);
                        }
                    }
                }
            }
        }
    }

    let count = control_edges.len();
    for (a, b) in control_edges {
        trace!(from = %a, to = %b, "control edge");
        records.link_control(a, b);
    }
    Ok(count)
}

/// Marks every record that transitively controls a must-halt call
pub fn propagate_controls_exit(records: &mut RecordSet) -> EseResult<usize> {
    let mut worklist: VecDeque<_> = records
        .iter()
        .filter(|r| r.controls_exit)
        .map(|r| r.id)
        .collect();
    let mut marked = worklist.len();

    while let Some(r) = worklist.pop_front() {
        let preds: Vec<_> = records.get(r)?.control_preds.iter().copied().collect();
        for p in preds {
            let pred = records.get_mut(p)?;
            if !pred.controls_exit {
                pred.controls_exit = true;
                marked += 1;
                worklist.push_back(p);
            }
        }
    }
    Ok(marked)
}
