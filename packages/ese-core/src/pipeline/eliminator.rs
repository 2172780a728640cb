//! Equivalent-state elimination facade
//!
//! The executor drives ESE through one object:
//!
//! ```text
//! start_path ─▶ begin_step ─▶ on_read / on_write / fork ─▶ end_step ─┐
//!                   ▲                                                │
//!                   └────────────────────────────────────────────────┘
//!                                  remove_path when a path dies
//! ```
//!
//! Every `end_step` may create records, terminate finished subtrees, prune
//! paths equivalent to a terminated record and hold or release paths. The
//! executor learns which paths to suspend, resume or drop from
//! [`EquivalentStateEliminator::drain_events`].

use super::descriptors::{ReadDescriptor, WriteDescriptor, WriteSiteHandle};
use super::metrics::EseMetrics;
use super::stats::EseStats;
use crate::config::{EseConfig, Validatable};
use crate::errors::{EseError, EseResult};
use crate::features::control_dependence::ControlDependence;
use crate::features::execution_record::{ControlStack, RecordSeed, RecordTree};
use crate::features::hold_graph::{Scheduler, SchedulerEvents, StepOutcome};
use crate::features::write_site::{PendingReads, WriteShadow, WriteSiteGraph};
use crate::shared::models::{
    AllocKey, ExecRecordId, FunctionId, InstLocation, PathId, Program, ProgramPoint, RecordId,
    WriteSiteId,
};
use crate::shared::ports::{PathSource, PathView};
use prometheus::Registry;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

#[cfg(feature = "trace")]
use tracing::trace;

/// Per-path bookkeeping
#[derive(Debug, Clone)]
struct PathContext {
    /// Record the path is executing, or about to execute
    current: ExecRecordId,
    shadow: WriteShadow,
    control: ControlStack,
    reads: PendingReads,
    /// Instruction being stepped
    stepping: Option<InstLocation>,
}

impl PathContext {
    fn new(current: ExecRecordId) -> Self {
        Self {
            current,
            shadow: WriteShadow::new(),
            control: ControlStack::new(),
            reads: PendingReads::default(),
            stepping: None,
        }
    }
}

fn context(paths: &FxHashMap<PathId, PathContext>, path: PathId) -> EseResult<&PathContext> {
    paths.get(&path).ok_or_else(|| EseError::unknown("path", path.0))
}

fn context_mut(
    paths: &mut FxHashMap<PathId, PathContext>,
    path: PathId,
) -> EseResult<&mut PathContext> {
    paths.get_mut(&path).ok_or_else(|| EseError::unknown("path", path.0))
}

fn view_of(paths: &dyn PathSource, path: PathId) -> EseResult<&dyn PathView> {
    paths.path(path).ok_or_else(|| EseError::unknown("path", path.0))
}

/// Byte offsets `offset..offset + width` of one access
fn byte_offsets(
    alloc: AllocKey,
    offset: u64,
    width: u64,
) -> EseResult<impl Iterator<Item = u64>> {
    if width > 0 && offset.checked_add(width - 1).is_none() {
        return Err(EseError::OffsetOverflow {
            alloc,
            offset,
            width,
        });
    }
    Ok((0..width).map(move |i| offset + i))
}

pub struct EquivalentStateEliminator {
    config: EseConfig,
    cd: ControlDependence,
    graph: WriteSiteGraph,
    tree: RecordTree,
    scheduler: Scheduler,
    exit_functions: FxHashSet<FunctionId>,
    paths: FxHashMap<PathId, PathContext>,
    held: BTreeSet<PathId>,
    events: SchedulerEvents,
    stats: EseStats,
    registry: Registry,
    metrics: Option<EseMetrics>,
}

impl EquivalentStateEliminator {
    /// Runs the static analysis and prepares an empty run
    pub fn new(program: &Program, config: EseConfig) -> EseResult<Self> {
        config.validate()?;
        let cd = ControlDependence::analyze(program, &config)?;

        let exit_functions: FxHashSet<FunctionId> = config
            .exit_functions
            .iter()
            .filter_map(|name| program.function_by_name(name))
            .map(|f| f.id)
            .collect();

        let registry = Registry::new();
        let metrics = if config.collect_metrics {
            Some(EseMetrics::new(&registry)?)
        } else {
            None
        };

        info!(
            records = cd.records().len(),
            exit_functions = exit_functions.len(),
            metrics = metrics.is_some(),
            "ESE ready"
        );

        Ok(Self {
            stats: EseStats {
                analysis: cd.stats().clone(),
                ..EseStats::default()
            },
            config,
            cd,
            graph: WriteSiteGraph::new(),
            tree: RecordTree::new(),
            scheduler: Scheduler::new(),
            exit_functions,
            paths: FxHashMap::default(),
            held: BTreeSet::new(),
            events: SchedulerEvents::default(),
            registry,
            metrics,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Path lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Registers the initial path and creates its root record
    pub fn start_path(&mut self, path: PathId, paths: &dyn PathSource) -> EseResult<ExecRecordId> {
        if self.paths.contains_key(&path) {
            return Err(EseError::DuplicatePath(path.0));
        }
        let view = view_of(paths, path)?;
        let seed = self.seed(path, view)?;
        let root = self.tree.create(None, seed)?.id;
        self.tree.enter(root)?;

        let mut out = StepOutcome::default();
        self.scheduler.notify_new(root, &mut self.tree, &mut out)?;
        self.paths.insert(path, PathContext::new(root));

        self.stats.records_created += 1;
        self.with_metrics(|m| m.records_created.inc());
        self.log_record("started", root);
        self.finish(out);
        Ok(root)
    }

    /// Remembers the instruction about to execute and drops stale reads
    pub fn begin_step(&mut self, path: PathId, paths: &dyn PathSource) -> EseResult<()> {
        let pc = view_of(paths, path)?.pc();
        let ctx = context_mut(&mut self.paths, path)?;
        ctx.reads.clear();
        ctx.stepping = Some(pc);
        Ok(())
    }

    pub fn on_read(&mut self, path: PathId, read: ReadDescriptor) -> EseResult<()> {
        #[cfg(feature = "trace")]
        trace!(path = %path, read = ?read, "read");

        let ctx = context_mut(&mut self.paths, path)?;
        match read {
            ReadDescriptor::Stack { frame, reg } => {
                let Some(site) = ctx.shadow.stack_cell(frame, reg) else {
                    return Ok(());
                };
                ctx.reads.insert(site);
                let branch = match ctx.stepping {
                    Some(pc) => self
                        .cd
                        .records()
                        .containing(pc)
                        .map(|id| self.cd.record(id))
                        .transpose()?
                        .is_some_and(|r| r.is_predicate() && r.last_inst() == pc),
                    None => false,
                };
                if branch {
                    self.tree.get_mut(ctx.current)?.branch_read = Some(site);
                }
            }
            ReadDescriptor::HeapConcrete {
                alloc,
                offset,
                width,
            } => {
                for byte in byte_offsets(alloc, offset, width)? {
                    let sites = ctx.shadow.concrete_read(alloc, byte);
                    ctx.reads.extend(sites);
                }
            }
            ReadDescriptor::HeapSymbolic { alloc } => {
                let sites = ctx.shadow.symbolic_read(alloc);
                ctx.reads.extend(sites);
            }
            ReadDescriptor::ArrayConcrete { alloc, offset } => {
                let (site, created) =
                    self.graph
                        .array_materialize_concrete(&mut ctx.shadow, alloc, offset)?;
                ctx.reads.insert(site);
                if created {
                    Self::attach_materialization(&mut self.tree, &self.graph, site)?;
                }
            }
            ReadDescriptor::ArraySymbolic { alloc } => {
                let (site, created) = self
                    .graph
                    .array_materialize_symbolic(&mut ctx.shadow, alloc)?;
                ctx.reads.insert(site);
                if created {
                    Self::attach_materialization(&mut self.tree, &self.graph, site)?;
                }
            }
        }
        Ok(())
    }

    fn attach_materialization(
        tree: &mut RecordTree,
        graph: &WriteSiteGraph,
        site: WriteSiteId,
    ) -> EseResult<()> {
        tree.attach_write(graph.site(site).owner, site)
    }

    /// Records a write; the reads since the previous write become its
    /// predecessors
    pub fn on_write(&mut self, path: PathId, write: WriteDescriptor) -> EseResult<WriteSiteHandle> {
        #[cfg(feature = "trace")]
        trace!(path = %path, alloc = ?write.alloc(), "write");

        if let WriteDescriptor::HeapConcrete {
            alloc,
            offset,
            bytes,
        } = &write
        {
            let _ = byte_offsets(*alloc, *offset, bytes.len() as u64)?;
        }

        let ctx = context_mut(&mut self.paths, path)?;
        let owner = ctx.current;
        let sites: Vec<WriteSiteId> = match write {
            WriteDescriptor::Stack { frame, reg, value } => vec![self.graph.stack_write(
                owner,
                &mut ctx.shadow,
                &mut ctx.reads,
                frame,
                reg,
                value,
            )],
            WriteDescriptor::HeapConcrete {
                alloc,
                offset,
                bytes,
            } => self.graph.heap_write_concrete(
                owner,
                &mut ctx.shadow,
                &mut ctx.reads,
                alloc,
                offset,
                bytes,
            ),
            WriteDescriptor::HeapSymbolic { alloc, snapshot } => self
                .graph
                .heap_write_symbolic(owner, &mut ctx.shadow, &mut ctx.reads, alloc, snapshot)
                .into_iter()
                .collect(),
        };
        for site in &sites {
            self.tree.attach_write(owner, *site)?;
        }
        Ok(WriteSiteHandle::from(sites))
    }

    /// Makes the current record the owner of a fresh symbolic input array
    pub fn register_symbolic_array(&mut self, path: PathId, alloc: AllocKey) -> EseResult<()> {
        let ctx = context_mut(&mut self.paths, path)?;
        ctx.shadow.register_array(alloc, ctx.current);
        Ok(())
    }

    /// Writes to a constant object are not tracked
    pub fn mark_constant(&mut self, path: PathId, alloc: AllocKey) -> EseResult<()> {
        context_mut(&mut self.paths, path)?.shadow.mark_constant(alloc);
        Ok(())
    }

    pub fn release_object(&mut self, path: PathId, alloc: AllocKey) -> EseResult<()> {
        context_mut(&mut self.paths, path)?.shadow.release_object(alloc);
        Ok(())
    }

    /// `child` continues from the middle of `parent`'s step
    pub fn fork(&mut self, parent: PathId, child: PathId) -> EseResult<()> {
        if self.paths.contains_key(&child) {
            return Err(EseError::DuplicatePath(child.0));
        }
        let ctx = context(&self.paths, parent)?.clone();
        let record = ctx.current;
        self.tree.mark_shared(record)?;
        self.tree.enter(record)?;
        self.paths.insert(child, ctx);

        self.stats.forks += 1;
        self.with_metrics(|m| m.forks.inc());
        if self.config.print_forks {
            info!(parent = %parent, child = %child, record = %record, "fork");
        } else {
            debug!(parent = %parent, child = %child, record = %record, "fork");
        }
        Ok(())
    }

    /// Finishes one instruction of `path`
    ///
    /// Order: mark the current record executed, open a record if the path
    /// entered a new one, check it against the cache, then terminate and
    /// compare until nothing changes.
    pub fn end_step(&mut self, path: PathId, paths: &dyn PathSource) -> EseResult<()> {
        let view = view_of(paths, path)?;
        let current = {
            let ctx = context_mut(&mut self.paths, path)?;
            ctx.reads.clear();
            ctx.stepping = None;
            ctx.current
        };

        let mut out = StepOutcome::default();
        if !self.tree.get(current)?.executed {
            self.scheduler
                .notify_executed(current, &mut self.tree, &mut out)?;
        }

        let pc = view.pc();
        let starts_record = self.cd.records().starting_at(pc).is_some();
        if starts_record || self.tree.get(current)?.shared {
            let created = self.open_record(path, view, starts_record)?;
            self.scheduler
                .notify_new(created, &mut self.tree, &mut out)?;
            self.check_released(created, view, &mut out)?;
        }

        self.cascade(&mut out, paths)?;
        self.finish(out);
        Ok(())
    }

    /// Drops a path the executor finished or killed
    ///
    /// Its current record terminates, along with every ancestor left without
    /// running children, unless a sibling forked in the same step still
    /// occupies it. Pruned paths are already gone.
    pub fn remove_path(&mut self, path: PathId, paths: &dyn PathSource) -> EseResult<()> {
        let Some(ctx) = self.paths.remove(&path) else {
            return Ok(());
        };
        self.tree.leave(ctx.current)?;
        let mut out = StepOutcome::default();
        out.to_terminate.insert(ctx.current);
        self.cascade(&mut out, paths)?;
        self.finish(out);

        self.held.remove(&path);
        self.events.held.remove(&path);
        self.events.released.remove(&path);
        self.with_metrics(|m| m.held_paths.set(self.held.len() as i64));
        debug!(path = %path, "path removed");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Record management
    // ═══════════════════════════════════════════════════════════════════════

    fn seed(&self, path: PathId, view: &dyn PathView) -> EseResult<RecordSeed> {
        let pc = view.pc();
        let static_record = self.cd.records().containing(pc).ok_or_else(|| {
            EseError::malformed(pc.function.to_string(), format!("no record contains {pc}"))
        })?;
        Ok(RecordSeed {
            static_record,
            point: ProgramPoint::new(pc, view.call_string()),
            constraints: view.constraints().to_vec(),
            path: Some(path),
            in_exit_function: self.exit_functions.contains(&pc.function),
        })
    }

    /// Creates the record `path` continues in and covers the one it left
    fn open_record(
        &mut self,
        path: PathId,
        view: &dyn PathView,
        starts_record: bool,
    ) -> EseResult<ExecRecordId> {
        let seed = self.seed(path, view)?;
        let prev = context(&self.paths, path)?.current;
        let created = self.tree.create(Some(prev), seed)?;
        self.tree.leave(prev)?;
        self.tree.enter(created.id)?;
        if let Some((from, to)) = created.lineage {
            self.scheduler.add_lineage(from, to);
        }

        let prev_static = self.tree.get(prev)?.static_record;
        self.coverage_updated(prev_static)?;

        let ctx = context_mut(&mut self.paths, path)?;
        if starts_record {
            ctx.control
                .update(prev, created.id, &mut self.tree, self.cd.records())?;
        } else {
            let control = self.tree.get(prev)?.regular_control;
            self.tree.get_mut(created.id)?.regular_control = control;
        }
        ctx.current = created.id;

        self.stats.records_created += 1;
        self.with_metrics(|m| m.records_created.inc());
        self.log_record("created", created.id);
        Ok(created.id)
    }

    /// Marks a static record covered and refreshes the live sets of every
    /// terminated record waiting on a group it completed
    pub fn coverage_updated(&mut self, record: RecordId) -> EseResult<()> {
        let outcome = self.cd.cover(record)?;
        if !outcome.completed.is_empty() {
            self.stats.groups_completed += outcome.completed.len() as u64;
            self.with_metrics(|m| m.groups_completed.inc_by(outcome.completed.len() as u64));
        }
        for source in outcome.sources {
            if !self.tree.get(source)?.is_terminated() {
                continue;
            }
            let refreshed = self
                .tree
                .reterminate(source, &mut self.graph, &mut self.cd)?;
            for id in refreshed {
                self.scheduler
                    .notify_reterminated(id, &self.tree, &self.graph)?;
                self.stats.records_reterminated += 1;
                self.with_metrics(|m| m.records_reterminated.inc());
            }
        }
        Ok(())
    }

    /// Current record of a tracked path
    pub fn current_record(&self, path: PathId) -> Option<ExecRecordId> {
        self.paths.get(&path).map(|ctx| ctx.current)
    }

    /// Cache lookup for a path's current record
    ///
    /// `None` when the record is not released or nothing equivalent is cached.
    pub fn check(&self, path: PathId, paths: &dyn PathSource) -> EseResult<Option<ExecRecordId>> {
        let record = context(&self.paths, path)?.current;
        let view = view_of(paths, path)?;
        self.scheduler
            .check_path(record, view, &self.tree, &self.graph)
    }

    /// Prunes `path` against the terminated record `equivalent`
    pub fn prune(
        &mut self,
        path: PathId,
        equivalent: ExecRecordId,
        paths: &dyn PathSource,
    ) -> EseResult<()> {
        let victim = context(&self.paths, path)?.current;
        let mut out = StepOutcome::default();
        self.prune_record(equivalent, victim, &mut out)?;
        self.cascade(&mut out, paths)?;
        self.finish(out);
        Ok(())
    }

    /// Terminates `record` and every ancestor left without running children
    ///
    /// Does nothing if `record` still has running children. A record some
    /// live path is still executing cannot be terminated.
    pub fn terminate_if_ready(
        &mut self,
        record: ExecRecordId,
        paths: &dyn PathSource,
    ) -> EseResult<Vec<ExecRecordId>> {
        if self.tree.get(record)?.is_occupied() {
            return Err(EseError::InvalidTransition {
                record,
                from: "occupied",
                to: "terminated",
            });
        }
        let mut out = StepOutcome::default();
        out.to_terminate.insert(record);
        let terminated = self.cascade(&mut out, paths)?;
        self.finish(out);
        Ok(terminated)
    }

    /// Terminates exactly `record`, without walking up or comparing
    pub fn notify_terminated(&mut self, record: ExecRecordId) -> EseResult<()> {
        let mut out = StepOutcome::default();
        self.terminate_one(record, &mut out)?;
        self.finish(out);
        Ok(())
    }

    /// Prunes `record` against `equivalent` without terminating its parent
    pub fn notify_pruned(&mut self, record: ExecRecordId, equivalent: ExecRecordId) -> EseResult<()> {
        let mut out = StepOutcome::default();
        self.prune_record(equivalent, record, &mut out)?;
        out.to_terminate.clear();
        self.finish(out);
        Ok(())
    }

    fn terminate_one(&mut self, record: ExecRecordId, out: &mut StepOutcome) -> EseResult<()> {
        self.tree.terminate(record, &self.graph, &mut self.cd)?;
        self.scheduler
            .notify_terminated(record, &mut self.tree, &self.graph, out)?;
        self.stats.records_terminated += 1;
        self.with_metrics(|m| m.records_terminated.inc());
        self.log_record("terminated", record);
        Ok(())
    }

    fn prune_record(
        &mut self,
        equivalent: ExecRecordId,
        victim: ExecRecordId,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        let path = self.tree.get(victim)?.path.ok_or(EseError::InvalidTransition {
            record: victim,
            from: "executed",
            to: "pruned",
        })?;
        self.scheduler
            .prune(equivalent, victim, &mut self.tree, out)?;
        let ctx = self
            .paths
            .remove(&path)
            .ok_or_else(|| EseError::unknown("path", path.0))?;
        self.tree.leave(ctx.current)?;
        self.tree
            .prune(victim, equivalent, ctx.shadow, &mut self.graph)?;

        self.stats.records_pruned += 1;
        self.with_metrics(|m| m.records_pruned.inc());
        self.log_record("pruned", victim);
        Ok(())
    }

    /// Looks a released record up in its comparer's cache and prunes on a hit
    fn check_released(
        &mut self,
        record: ExecRecordId,
        view: &dyn PathView,
        out: &mut StepOutcome,
    ) -> EseResult<()> {
        if !self.scheduler.is_released(record, &self.tree)? {
            return Ok(());
        }
        match self
            .scheduler
            .check_path(record, view, &self.tree, &self.graph)?
        {
            Some(equivalent) => {
                self.stats.cache_hits += 1;
                self.with_metrics(|m| m.cache_hits.inc());
                self.prune_record(equivalent, record, out)
            }
            None => {
                self.stats.cache_misses += 1;
                self.with_metrics(|m| m.cache_misses.inc());
                Ok(())
            }
        }
    }

    /// Terminates requested records and compares the rest against them
    /// until nothing changes; returns every record terminated
    fn cascade(
        &mut self,
        out: &mut StepOutcome,
        paths: &dyn PathSource,
    ) -> EseResult<Vec<ExecRecordId>> {
        let mut terminated = Vec::new();
        let mut compare: VecDeque<ExecRecordId> = VecDeque::new();

        loop {
            for record in std::mem::take(&mut out.to_terminate) {
                if !self.tree.get(record)?.is_active() {
                    continue;
                }
                let chain = self
                    .tree
                    .terminate_chain(record, &self.graph, &mut self.cd)?;
                for id in chain {
                    self.scheduler
                        .notify_terminated(id, &mut self.tree, &self.graph, out)?;
                    self.stats.records_terminated += 1;
                    self.with_metrics(|m| m.records_terminated.inc());
                    self.log_record("terminated", id);
                    compare.push_back(id);
                    terminated.push(id);
                }
            }

            if let Some(trec) = compare.pop_front() {
                let equivalent =
                    self.scheduler
                        .check_terminated(trec, paths, &self.tree, &self.graph)?;
                for victim in equivalent {
                    if self.scheduler.is_held(victim, &self.tree)?
                        || self.scheduler.is_released(victim, &self.tree)?
                    {
                        self.prune_record(trec, victim, out)?;
                    }
                }
                continue;
            }

            if let Some(record) = out.newly_released.pop() {
                let Some(path) = self.tree.get(record)?.path else {
                    continue;
                };
                if !self.paths.contains_key(&path) {
                    continue;
                }
                let view = view_of(paths, path)?;
                self.check_released(record, view, out)?;
                continue;
            }

            if out.to_terminate.is_empty() {
                break;
            }
        }
        Ok(terminated)
    }

    /// Nets one step's holds and releases into the pending events and
    /// drops finished segments from the hold graph
    fn finish(&mut self, out: StepOutcome) {
        for segment in self.tree.take_retired() {
            self.scheduler.retire_segment(segment);
        }

        let mut batch = SchedulerEvents::default();
        for path in out.holds.difference(&out.releases) {
            if self.held.insert(*path) {
                batch.held.insert(*path);
            }
        }
        for path in out.releases.difference(&out.holds) {
            if self.held.remove(path) {
                batch.released.insert(*path);
            }
        }
        for path in &out.prunes {
            self.held.remove(path);
            batch.held.remove(path);
            batch.released.remove(path);
            batch.pruned.insert(*path);
        }

        self.stats.holds += batch.held.len() as u64;
        self.stats.releases += batch.released.len() as u64;
        self.with_metrics(|m| {
            m.holds.inc_by(batch.held.len() as u64);
            m.releases.inc_by(batch.released.len() as u64);
            m.held_paths.set(self.held.len() as i64);
            m.cached_records.set(self.scheduler.cached_records() as i64);
        });
        self.events.merge(batch);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reporting
    // ═══════════════════════════════════════════════════════════════════════

    /// Hold, release and prune events since the last drain
    pub fn drain_events(&mut self) -> SchedulerEvents {
        std::mem::take(&mut self.events)
    }

    pub fn held_paths(&self) -> &BTreeSet<PathId> {
        &self.held
    }

    pub fn is_held(&self, path: PathId) -> bool {
        self.held.contains(&path)
    }

    pub fn live_paths(&self) -> usize {
        self.paths.len()
    }

    pub fn stats(&self) -> EseStats {
        EseStats {
            analysis: self.cd.stats().clone(),
            cached_records: self.scheduler.cached_records(),
            comparers: self.scheduler.comparer_count(),
            write_sites: self.graph.len(),
            segments: self.tree.segment_count(),
            hold_edges: self.scheduler.hold_graph().edge_count(),
            held_paths: self.held.len(),
            live_paths: self.paths.len(),
            ..self.stats.clone()
        }
    }

    pub fn metrics(&self) -> Option<&EseMetrics> {
        self.metrics.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn hold_graph_dot(&self) -> String {
        self.scheduler.hold_graph().to_dot()
    }

    pub fn analysis(&self) -> &ControlDependence {
        &self.cd
    }

    pub fn records(&self) -> &RecordTree {
        &self.tree
    }

    pub fn write_sites(&self) -> &WriteSiteGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &EseConfig {
        &self.config
    }

    fn with_metrics(&self, f: impl FnOnce(&EseMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    fn log_record(&self, event: &'static str, record: ExecRecordId) {
        let Ok(rec) = self.tree.get(record) else {
            return;
        };
        if self.config.print_records {
            info!(record = %record, point = %rec.point, segment = %rec.current_segment, "{event}");
        } else {
            debug!(record = %record, point = %rec.point, segment = %rec.current_segment, "{event}");
        }
    }
}
