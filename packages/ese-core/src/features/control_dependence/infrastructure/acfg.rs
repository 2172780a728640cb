//! Augmented control-flow graph (ACFG)
//!
//! Synthetic nodes per function:
//! - start      → entry, super-exit
//! - entry      → entry record
//! - exit       → super-exit
//! - super-exit : root of the postdominator tree
//!
//! Call records:
//! - must halt  : record → super-exit (no continuation)
//! - may halt   : record → retpred → {ret, super-exit}; ret → continuation
//! - returns    : record → ret → continuation
//!
//! Return and unreachable terminators flow to exit.

use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::domain::{CdArena, CdNodeKind};
use crate::features::record_partition::{RecordKind, RecordSet};
use crate::shared::models::{CdNodeId, Function, FunctionId, Halting, Instruction, Program, RecordId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct AugmentedCfg {
    pub function: FunctionId,
    pub name: String,
    pub start: CdNodeId,
    pub entry: CdNodeId,
    pub exit: CdNodeId,
    pub super_exit: CdNodeId,
    /// Every node of this function, synthetic ones included
    pub nodes: Vec<CdNodeId>,
    /// Non-PHI records
    pub record_nodes: FxHashMap<RecordId, CdNodeId>,
    /// (predecessor, PHI record) pairs
    pub phi_nodes: FxHashMap<(RecordId, RecordId), CdNodeId>,
    pub return_nodes: FxHashMap<RecordId, CdNodeId>,
    pub return_preds: FxHashMap<RecordId, CdNodeId>,
}

impl AugmentedCfg {
    pub fn build(
        function: &Function,
        program: &Program,
        records: &mut RecordSet,
        arena: &mut CdArena,
    ) -> EseResult<Self> {
        let f = function.id;
        let start = arena.add(f, CdNodeKind::Start);
        let entry = arena.add(f, CdNodeKind::Entry);
        let exit = arena.add(f, CdNodeKind::Exit);
        let super_exit = arena.add(f, CdNodeKind::SuperExit);

        let mut acfg = Self {
            function: f,
            name: function.name.clone(),
            start,
            entry,
            exit,
            super_exit,
            nodes: vec![start, entry, exit, super_exit],
            record_nodes: FxHashMap::default(),
            phi_nodes: FxHashMap::default(),
            return_nodes: FxHashMap::default(),
            return_preds: FxHashMap::default(),
        };

        arena.add_acfg_edge(start, entry);
        arena.add_acfg_edge(start, super_exit);
        arena.add_acfg_edge(exit, super_exit);

        let ids: Vec<RecordId> = records.function_records(f).to_vec();

        // Nodes first, edges second: edges may point at records created later
        for &rid in &ids {
            let record = records.get(rid)?;
            if record.is_phi() {
                for &pred in &record.preds {
                    let n = acfg.push(arena, CdNodeKind::Record {
                        record: rid,
                        phi_pred: Some(pred),
                    });
                    acfg.phi_nodes.insert((pred, rid), n);
                }
                continue;
            }

            let n = acfg.push(arena, CdNodeKind::Record {
                record: rid,
                phi_pred: None,
            });
            acfg.record_nodes.insert(rid, n);

            if record.is_call() {
                match call_halting(program, records, rid)? {
                    Halting::MustHalt => {}
                    Halting::MayHalt => {
                        let rp = acfg.push(arena, CdNodeKind::ReturnPredicate { call: rid });
                        let ret = acfg.push(arena, CdNodeKind::Return { call: rid });
                        acfg.return_preds.insert(rid, rp);
                        acfg.return_nodes.insert(rid, ret);
                    }
                    Halting::Returns => {
                        let ret = acfg.push(arena, CdNodeKind::Return { call: rid });
                        acfg.return_nodes.insert(rid, ret);
                    }
                }
            }
        }

        let entry_record = records
            .entry(f)
            .ok_or_else(|| EseError::malformed(&function.name, "function has no entry record"))?;
        let entry_node = *acfg.record_nodes.get(&entry_record).ok_or_else(|| {
            EseError::malformed(&function.name, "entry record cannot be a PHI record")
        })?;
        arena.add_acfg_edge(entry, entry_node);

        for &rid in &ids {
            acfg.add_record_edges(rid, program, records, arena)?;
        }

        Ok(acfg)
    }

    fn push(&mut self, arena: &mut CdArena, kind: CdNodeKind) -> CdNodeId {
        let n = arena.add(self.function, kind);
        self.nodes.push(n);
        n
    }

    fn add_record_edges(
        &self,
        rid: RecordId,
        program: &Program,
        records: &mut RecordSet,
        arena: &mut CdArena,
    ) -> EseResult<()> {
        let record = records.get(rid)?;
        let succs: Vec<RecordId> = record.succs.iter().copied().collect();
        let kind = record.kind;

        if kind == RecordKind::Phi {
            let non_phi: Vec<RecordId> = succs
                .iter()
                .copied()
                .filter(|s| records.get(*s).map(|r| !r.is_phi()).unwrap_or(false))
                .collect();
            if non_phi.len() != 1 || succs.len() != 1 {
                return Err(EseError::PhiSuccessor {
                    function: self.name.clone(),
                    record: rid,
                    found: non_phi.len(),
                });
            }
            let target = self.target(rid, non_phi[0], records)?;
            for (&(_, phi), &n) in &self.phi_nodes {
                if phi == rid {
                    arena.add_acfg_edge(n, target);
                }
            }
            return Ok(());
        }

        let node = self.record_nodes[&rid];
        let mut flow = node;

        if kind == RecordKind::Call {
            match call_halting(program, records, rid)? {
                Halting::MustHalt => {
                    arena.add_acfg_edge(node, self.super_exit);
                    records.get_mut(rid)?.controls_exit = true;
                    return Ok(());
                }
                Halting::MayHalt => {
                    let rp = self.return_preds[&rid];
                    let ret = self.return_nodes[&rid];
                    arena.add_acfg_edge(node, rp);
                    arena.add_acfg_edge(rp, ret);
                    arena.add_acfg_edge(rp, self.super_exit);
                    flow = ret;
                }
                Halting::Returns => {
                    let ret = self.return_nodes[&rid];
                    arena.add_acfg_edge(node, ret);
                    flow = ret;
                }
            }
        }

        if matches!(kind, RecordKind::Return | RecordKind::Unreachable) {
            arena.add_acfg_edge(flow, self.exit);
        }

        for s in succs {
            let target = self.target(rid, s, records)?;
            arena.add_acfg_edge(flow, target);
        }
        Ok(())
    }

    /// Node that control enters when flowing from `from` into `to`
    fn target(&self, from: RecordId, to: RecordId, records: &RecordSet) -> EseResult<CdNodeId> {
        let node = if records.get(to)?.is_phi() {
            self.phi_nodes.get(&(from, to))
        } else {
            self.record_nodes.get(&to)
        };
        node.copied().ok_or_else(|| {
            EseError::malformed(&self.name, format!("no ACFG node for edge {from} -> {to}"))
        })
    }

    /// Nodes reachable from start along ACFG edges
    pub fn reachable(&self, arena: &CdArena) -> FxHashSet<CdNodeId> {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([self.start]);
        seen.insert(self.start);
        while let Some(n) = queue.pop_front() {
            for &s in &arena.node(n).acfg_succs {
                if seen.insert(s) {
                    queue.push_back(s);
                }
            }
        }
        seen
    }
}

pub(crate) fn call_halting(
    program: &Program,
    records: &RecordSet,
    call: RecordId,
) -> EseResult<Halting> {
    let loc = records.get(call)?.last_inst();
    match program.instruction(loc) {
        Some(Instruction::Call { halting, .. }) => Ok(*halting),
        _ => Err(EseError::malformed(
            format!("{}", loc.function),
            format!("call record {call} does not end with a call"),
        )),
    }
}

pub(crate) fn call_targets(
    program: &Program,
    records: &RecordSet,
    call: RecordId,
) -> EseResult<Vec<FunctionId>> {
    let loc = records.get(call)?.last_inst();
    match program.instruction(loc) {
        Some(Instruction::Call { callees, .. }) => Ok(callees.clone()),
        _ => Ok(Vec::new()),
    }
}
