//! Control-dependence analyzer
//!
//! Owns every product of the static analysis: the record set, the ACFG arena,
//! the per-function ACFGs and the control groups. Coverage is the only
//! runtime input; it drives group completion.

use crate::config::EseConfig;
use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::domain::{CdArena, ControlGroup};
use crate::features::control_dependence::infrastructure::acfg::AugmentedCfg;
use crate::features::control_dependence::infrastructure::dot::{
    control_graph_dot, function_dot, EdgeFamily,
};
use crate::features::control_dependence::infrastructure::frontier::compute_control_edges;
use crate::features::control_dependence::infrastructure::groups::{build_groups, cover};
use crate::features::control_dependence::infrastructure::interprocedural::{
    build_acdg, propagate_controls_exit, stitch,
};
use crate::features::control_dependence::infrastructure::postdom::compute_postdominators;
use crate::features::record_partition::{Record, RecordPartitioner, RecordSet};
use crate::shared::models::{ExecRecordId, FunctionId, GroupId, Program, RecordId};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Counters collected while analyzing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub functions: usize,
    pub records: usize,
    pub cd_nodes: usize,
    pub pcg_edges: usize,
    pub control_edges: usize,
    pub groups: usize,
    pub cyclic_groups: usize,
    pub exit_controls: usize,
    pub completed_groups: usize,
}

/// What a newly covered record unlocked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverOutcome {
    /// Terminated execution records whose live sets assumed an open group
    pub sources: Vec<ExecRecordId>,
    pub completed: Vec<GroupId>,
}

#[derive(Debug)]
pub struct ControlDependence {
    records: RecordSet,
    arena: CdArena,
    acfgs: FxHashMap<FunctionId, AugmentedCfg>,
    groups: Vec<ControlGroup>,
    stats: AnalysisStats,
}

impl ControlDependence {
    pub fn analyze(program: &Program, config: &EseConfig) -> EseResult<Self> {
        let started = Instant::now();
        let mut records = RecordPartitioner::new(program).partition()?;
        let mut arena = CdArena::new();
        let mut acfgs = FxHashMap::default();
        let mut stats = AnalysisStats::default();

        for function in program.defined_functions() {
            let acfg = AugmentedCfg::build(function, program, &mut records, &mut arena)?;
            compute_postdominators(&acfg, &mut arena)?;
            stats.pcg_edges += compute_control_edges(&acfg, &mut arena);
            build_acdg(&acfg, &mut arena, &mut records)?;
            debug!(function = %function.name, nodes = acfg.nodes.len(), "Built ACDG");
            acfgs.insert(function.id, acfg);
        }

        stats.control_edges = stitch(&acfgs, &mut arena, &mut records, program)?;
        stats.exit_controls = propagate_controls_exit(&mut records)?;
        let groups = build_groups(&mut records)?;

        stats.functions = acfgs.len();
        stats.records = records.len();
        stats.cd_nodes = arena.len();
        stats.groups = groups.len();
        stats.cyclic_groups = groups.iter().filter(|g| g.is_cyclic()).count();

        let mut analysis = Self {
            records,
            arena,
            acfgs,
            groups,
            stats,
        };

        if config.cover_untracked_functions {
            for function in program.defined_functions().filter(|f| !f.track_coverage) {
                let ids = analysis.records.function_records(function.id).to_vec();
                for id in ids {
                    analysis.cover(id)?;
                }
            }
        }

        if config.write_control_graphs {
            analysis.write_dot(&config.graph_output_dir)?;
        }

        info!(
            functions = analysis.stats.functions,
            records = analysis.stats.records,
            groups = analysis.stats.groups,
            cyclic_groups = analysis.stats.cyclic_groups,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Control-dependence analysis complete"
        );
        Ok(analysis)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Coverage
    // ═══════════════════════════════════════════════════════════════════════

    /// Marks a record covered; completed groups hand back their sources
    pub fn cover(&mut self, record: RecordId) -> EseResult<CoverOutcome> {
        let (sources, completed) = cover(record, &mut self.records, &mut self.groups)?;
        self.stats.completed_groups += completed.len();
        Ok(CoverOutcome { sources, completed })
    }

    /// Registers a terminated execution record whose live set relied on the
    /// group of `record` still being open
    pub fn add_source(&mut self, record: RecordId, source: ExecRecordId) -> EseResult<()> {
        self.records.get_mut(record)?.sources.insert(source);
        Ok(())
    }

    pub fn is_group_complete(&self, record: RecordId) -> EseResult<bool> {
        Ok(self.group_of(record)?.is_some_and(|g| g.completed))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> EseResult<&Record> {
        self.records.get(id)
    }

    pub fn group(&self, id: GroupId) -> EseResult<&ControlGroup> {
        self.groups
            .get(id.index())
            .ok_or_else(|| EseError::unknown("group", id.0))
    }

    pub fn group_of(&self, record: RecordId) -> EseResult<Option<&ControlGroup>> {
        match self.records.get(record)?.group {
            Some(g) => self.group(g).map(Some),
            None => Ok(None),
        }
    }

    pub fn groups(&self) -> &[ControlGroup] {
        &self.groups
    }

    pub fn acfg(&self, function: FunctionId) -> Option<&AugmentedCfg> {
        self.acfgs.get(&function)
    }

    pub fn arena(&self) -> &CdArena {
        &self.arena
    }

    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    /// Writes `<function>.acfg.dot`, `<function>.acdg.dot` and `control.dot`
    pub fn write_dot(&self, dir: &Path) -> EseResult<()> {
        fs::create_dir_all(dir)?;
        for acfg in self.acfgs.values() {
            for family in [EdgeFamily::Acfg, EdgeFamily::Acdg] {
                let path = dir.join(format!("{}.{}.dot", acfg.name, family.file_suffix()));
                fs::write(path, function_dot(acfg, &self.arena, family))?;
            }
        }
        fs::write(dir.join("control.dot"), control_graph_dot(&self.records))?;
        debug!(dir = %dir.display(), "Wrote control graphs");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::record_partition::PostDominator;
    use crate::shared::models::{FunctionBuilder, Halting, Instruction, ProgramBuilder};

    fn analyze(program: &Program) -> ControlDependence {
        ControlDependence::analyze(program, &EseConfig::default()).unwrap()
    }

    fn branch() -> Instruction {
        Instruction::Branch { conditional: true }
    }

    fn jump() -> Instruction {
        Instruction::Branch { conditional: false }
    }

    #[test]
    fn test_diamond_arms_depend_on_predicate() {
        let program = ProgramBuilder::new()
            .function(
                FunctionBuilder::new("main")
                    .block(vec![Instruction::Other, branch()], &[1, 2])
                    .block(vec![jump()], &[3])
                    .block(vec![jump()], &[3])
                    .block(vec![Instruction::Return], &[]),
            )
            .build();
        let cd = analyze(&program);

        let preds = |r: u32| cd.record(RecordId(r)).unwrap().control_preds.clone();
        assert!(preds(1).contains(&RecordId(0)));
        assert!(preds(2).contains(&RecordId(0)));
        assert!(preds(3).is_empty(), "join point is not branch dependent");
        assert_eq!(
            cd.record(RecordId(0)).unwrap().ipostdom,
            PostDominator::Record(RecordId(3))
        );
        assert_eq!(cd.stats().groups, 4);
    }

    #[test]
    fn test_loop_group_completes_after_body() {
        let program = ProgramBuilder::new()
            .function(
                FunctionBuilder::new("main")
                    .block(vec![jump()], &[1])
                    .block(vec![Instruction::Other, branch()], &[2, 3])
                    .block(vec![jump()], &[1])
                    .block(vec![Instruction::Return], &[]),
            )
            .build();
        let mut cd = analyze(&program);

        let header = cd.record(RecordId(1)).unwrap();
        assert!(header.control_succs.contains(&RecordId(1)));
        assert!(header.control_succs.contains(&RecordId(2)));

        cd.add_source(RecordId(1), ExecRecordId(3)).unwrap();
        cd.cover(RecordId(1)).unwrap();
        assert!(!cd.is_group_complete(RecordId(1)).unwrap());

        let outcome = cd.cover(RecordId(2)).unwrap();
        assert!(cd.is_group_complete(RecordId(1)).unwrap());
        assert_eq!(outcome.sources, vec![ExecRecordId(3)]);
    }

    #[test]
    fn test_callee_records_depend_on_call_site() {
        let program = ProgramBuilder::new()
            .function(
                FunctionBuilder::new("main")
                    .block(vec![Instruction::call(vec![FunctionId(1)]), Instruction::Return], &[]),
            )
            .function(
                FunctionBuilder::new("f")
                    .block(vec![Instruction::Other, branch()], &[1, 2])
                    .block(vec![Instruction::Return], &[])
                    .block(vec![Instruction::Return], &[]),
            )
            .build();
        let cd = analyze(&program);

        let call = cd.records().entry(FunctionId(0)).unwrap();
        let callee_entry = cd.records().entry(FunctionId(1)).unwrap();
        assert!(cd.record(call).unwrap().is_call());
        assert!(cd
            .record(callee_entry)
            .unwrap()
            .control_preds
            .contains(&call));
    }

    #[test]
    fn test_must_halt_marks_exit_controls() {
        let program = ProgramBuilder::new()
            .function(
                FunctionBuilder::new("main")
                    .block(vec![Instruction::Other, branch()], &[1, 2])
                    .block(
                        vec![
                            Instruction::Call {
                                callees: vec![FunctionId(1)],
                                halting: Halting::MustHalt,
                            },
                            Instruction::Unreachable,
                        ],
                        &[],
                    )
                    .block(vec![Instruction::Return], &[]),
            )
            .declaration("exit")
            .build();
        let cd = analyze(&program);

        assert!(cd.record(RecordId(0)).unwrap().controls_exit);
        assert!(cd.record(RecordId(1)).unwrap().controls_exit);
        assert!(!cd.record(RecordId(3)).unwrap().controls_exit);
        assert_eq!(
            cd.record(RecordId(0)).unwrap().ipostdom,
            PostDominator::SuperExit
        );
    }

    #[test]
    fn test_infinite_loop_has_no_postdominator() {
        let program = ProgramBuilder::new()
            .function(FunctionBuilder::new("spin").block(vec![jump()], &[0]))
            .build();

        let err = ControlDependence::analyze(&program, &EseConfig::default()).unwrap_err();
        assert!(matches!(err, EseError::MissingPostdominator { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_untracked_functions_are_covered_up_front() {
        let program = ProgramBuilder::new()
            .function(FunctionBuilder::new("main").block(vec![Instruction::Return], &[]))
            .function(
                FunctionBuilder::new("memcpy")
                    .block(vec![Instruction::Return], &[])
                    .untracked(),
            )
            .build();
        let cd = analyze(&program);

        let untracked = cd.records().entry(FunctionId(1)).unwrap();
        let tracked = cd.records().entry(FunctionId(0)).unwrap();
        assert!(cd.record(untracked).unwrap().covered);
        assert!(cd.is_group_complete(untracked).unwrap());
        assert!(!cd.record(tracked).unwrap().covered);
    }
}
