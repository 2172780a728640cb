//! End-to-end scenarios driving the eliminator like an executor would
//!
//! Most scenarios run `join_branch_program`: path 0 takes the left arm,
//! path 1 is forked into the right arm, both write `y` and branch on it
//! after the join. The loop scenario runs `loop_program` with `i` counted
//! up on the stack.

mod common;

use common::{join_branch_program, loc, loop_program, MockPath, MockPaths};
use ese_core::shared::models::{AllocKey, Expr, InstLocation, PathId, Program};
use ese_core::{EquivalentStateEliminator, EseConfig, EseError, ReadDescriptor, WriteDescriptor};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

const P0: PathId = PathId(0);
const P1: PathId = PathId(1);

#[derive(Debug, Clone, Copy)]
enum Cell {
    Stack,
    Heap,
}

fn obj() -> AllocKey {
    AllocKey::new(1, 0)
}

fn write_y(cell: Cell, value: u8) -> WriteDescriptor {
    match cell {
        Cell::Stack => WriteDescriptor::Stack {
            frame: 0,
            reg: 2,
            value: Expr::byte(value),
        },
        Cell::Heap => WriteDescriptor::HeapConcrete {
            alloc: obj(),
            offset: 0,
            bytes: vec![Expr::byte(value)],
        },
    }
}

fn read_y(cell: Cell) -> ReadDescriptor {
    match cell {
        Cell::Stack => ReadDescriptor::Stack { frame: 0, reg: 2 },
        Cell::Heap => ReadDescriptor::HeapConcrete {
            alloc: obj(),
            offset: 0,
            width: 1,
        },
    }
}

fn read_i() -> ReadDescriptor {
    ReadDescriptor::Stack { frame: 0, reg: 1 }
}

fn write_i(value: u8) -> WriteDescriptor {
    WriteDescriptor::Stack {
        frame: 0,
        reg: 1,
        value: Expr::byte(value),
    }
}

fn paths(ids: &[PathId]) -> BTreeSet<PathId> {
    ids.iter().copied().collect()
}

struct Run {
    ese: EquivalentStateEliminator,
    paths: MockPaths,
}

impl Run {
    /// Path 0 at the entry of `program`
    fn started(program: &Program) -> Self {
        let ese = EquivalentStateEliminator::new(program, EseConfig::default()).unwrap();
        let mut run = Self {
            ese,
            paths: MockPaths::default(),
        };
        run.paths.insert(P0, MockPath::at(loc(0, 0)));
        run.ese.start_path(P0, &run.paths).unwrap();
        run
    }

    /// Path 0 at the entry, with `x` written and the fork done
    fn forked() -> Self {
        let mut run = Self::started(&join_branch_program());

        let x = WriteDescriptor::Stack {
            frame: 0,
            reg: 1,
            value: Expr::byte(1),
        };
        run.step(P0, vec![], vec![x], loc(0, 1));
        run.fork_at_branch(P0, P1);
        run
    }

    fn step(
        &mut self,
        path: PathId,
        reads: Vec<ReadDescriptor>,
        writes: Vec<WriteDescriptor>,
        next: InstLocation,
    ) {
        self.ese.begin_step(path, &self.paths).unwrap();
        for read in reads {
            self.ese.on_read(path, read).unwrap();
        }
        for write in writes {
            self.apply(path, &write);
            self.ese.on_write(path, write).unwrap();
        }
        self.paths.get_mut(path).pc = next;
        self.ese.end_step(path, &self.paths).unwrap();
    }

    fn apply(&mut self, path: PathId, write: &WriteDescriptor) {
        let state = self.paths.get_mut(path);
        match write {
            WriteDescriptor::Stack { frame, reg, value } => {
                state.stack.insert((*frame, *reg), value.clone());
            }
            WriteDescriptor::HeapConcrete {
                alloc,
                offset,
                bytes,
            } => {
                for (i, b) in bytes.iter().enumerate() {
                    state.heap.insert((*alloc, offset + i as u64), b.clone());
                }
            }
            WriteDescriptor::HeapSymbolic { .. } => {}
        }
    }

    /// Reads `x` in the branch of bb0 and forks `child` off `parent`
    /// without finishing the step
    fn fork_mid_branch(&mut self, parent: PathId, child: PathId) {
        self.ese.begin_step(parent, &self.paths).unwrap();
        self.ese
            .on_read(parent, ReadDescriptor::Stack { frame: 0, reg: 1 })
            .unwrap();
        self.ese.fork(parent, child).unwrap();

        let mut forked = self.paths.paths[&parent].clone();
        forked.pc = loc(2, 0);
        self.paths.insert(child, forked);
        self.paths.get_mut(parent).pc = loc(1, 0);
    }

    /// Branches on `x`; `parent` takes bb1, `child` bb2
    fn fork_at_branch(&mut self, parent: PathId, child: PathId) {
        self.fork_mid_branch(parent, child);

        self.ese.end_step(parent, &self.paths).unwrap();
        self.ese.end_step(child, &self.paths).unwrap();
    }

    /// Writes `y` in the arm and jumps to the join
    fn arm(&mut self, path: PathId, cell: Cell, value: u8) {
        let block = if path == P0 { 1 } else { 2 };
        self.step(path, vec![], vec![write_y(cell, value)], loc(block, 1));
        self.step(path, vec![], vec![], loc(3, 0));
    }

    /// `z = y; br z`, leaving through `exit`
    fn join(&mut self, path: PathId, cell: Cell, value: u8, exit: u32) {
        let z = WriteDescriptor::Stack {
            frame: 0,
            reg: 3,
            value: Expr::byte(value),
        };
        self.step(path, vec![read_y(cell)], vec![z], loc(3, 1));
        self.step(
            path,
            vec![ReadDescriptor::Stack { frame: 0, reg: 3 }],
            vec![],
            loc(exit, 0),
        );
    }

    fn remove(&mut self, path: PathId) {
        self.ese.remove_path(path, &self.paths).unwrap();
        self.paths.remove(path);
    }

    /// `loop_program` header: `br i` leaves through `next`
    fn header(&mut self, path: PathId, next: u32) {
        self.step(path, vec![], vec![], loc(1, 1));
        self.step(path, vec![read_i()], vec![], loc(next, 0));
    }

    /// `loop_program` body: `i = value`, back to the header
    fn body(&mut self, path: PathId, value: u8) {
        self.step(path, vec![read_i()], vec![write_i(value)], loc(1, 0));
    }

    /// Path 0 has run through the join; path 1 arrives while it is pending
    fn held_at_join(cell: Cell, left: u8, right: u8) -> Self {
        let mut run = Self::forked();
        run.arm(P0, cell, left);
        run.join(P0, cell, left, 4);
        run.arm(P1, cell, right);
        run
    }
}

#[test]
fn test_sibling_waits_on_pending_record_at_join() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 7);

    assert!(run.ese.is_held(P1));
    let events = run.ese.drain_events();
    assert_eq!(events.held, paths(&[P1]));
    assert!(events.released.is_empty());
    assert!(run.ese.scheduler().hold_graph().is_acyclic());
    assert_eq!(run.ese.scheduler().hold_graph().edge_count(), 3);
}

#[test]
fn test_equal_sibling_is_pruned_when_holder_terminates() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 7);
    run.ese.drain_events();

    run.remove(P0);

    let events = run.ese.drain_events();
    assert_eq!(events.pruned, paths(&[P1]));
    assert!(events.held.is_empty());
    assert!(events.released.is_empty());
    assert_eq!(run.ese.current_record(P1), None);
    assert!(run.ese.records().iter().all(|r| r.state.is_done()));

    let stats = run.ese.stats();
    assert_eq!(stats.records_created, 6);
    assert_eq!(stats.records_terminated, 5);
    assert_eq!(stats.records_pruned, 1);
    assert_eq!(stats.live_paths, 0);
    assert_eq!(stats.held_paths, 0);
    assert_eq!(stats.hold_edges, 0, "finished segments are retired");
}

#[test]
fn test_differing_live_value_releases_sibling() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 8);
    run.ese.drain_events();

    run.remove(P0);

    let events = run.ese.drain_events();
    assert_eq!(events.released, paths(&[P1]));
    assert!(events.pruned.is_empty());
    assert!(!run.ese.is_held(P1));
    assert!(run.ese.current_record(P1).is_some());
    assert_eq!(run.ese.check(P1, &run.paths).unwrap(), None);

    run.join(P1, Cell::Stack, 8, 5);
    run.remove(P1);
    assert!(run.ese.records().iter().all(|r| r.is_terminated()));
    assert_eq!(run.ese.stats().records_pruned, 0);
}

#[test]
fn test_dead_difference_does_not_prevent_pruning() {
    // Register 4 differs between the arms but nothing downstream reads it
    let mut run = Run::forked();
    let dead = |v: u8| WriteDescriptor::Stack {
        frame: 0,
        reg: 4,
        value: Expr::byte(v),
    };
    run.step(P0, vec![], vec![write_y(Cell::Stack, 7), dead(1)], loc(1, 1));
    run.step(P0, vec![], vec![], loc(3, 0));
    run.join(P0, Cell::Stack, 7, 4);
    run.step(P1, vec![], vec![write_y(Cell::Stack, 7), dead(2)], loc(2, 1));
    run.step(P1, vec![], vec![], loc(3, 0));
    run.ese.drain_events();

    run.remove(P0);

    assert_eq!(run.ese.drain_events().pruned, paths(&[P1]));
}

#[test]
fn test_late_arrival_hits_cache_through_heap_byte() {
    let mut run = Run::forked();
    run.arm(P0, Cell::Heap, 7);
    run.join(P0, Cell::Heap, 7, 4);
    run.remove(P0);
    run.ese.drain_events();

    run.arm(P1, Cell::Heap, 7);

    let events = run.ese.drain_events();
    assert_eq!(events.pruned, paths(&[P1]));
    assert!(events.held.is_empty());
    let stats = run.ese.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.records_pruned, 1);
    assert!(run.ese.records().iter().all(|r| r.state.is_done()));

    let pruned = run
        .ese
        .records()
        .iter()
        .find(|r| r.is_pruned())
        .expect("one pruned record");
    assert_eq!(pruned.point.inst, loc(3, 0));
    assert_eq!(pruned.live_reads.len(), 1, "live read copied from the equivalent record");
}

#[test]
fn test_late_arrival_with_other_heap_value_runs_on() {
    let mut run = Run::forked();
    run.arm(P0, Cell::Heap, 7);
    run.join(P0, Cell::Heap, 7, 4);
    run.remove(P0);
    run.ese.drain_events();

    run.arm(P1, Cell::Heap, 9);

    assert!(run.ese.drain_events().is_empty());
    let stats = run.ese.stats();
    assert_eq!(stats.cache_hits, 0);
    assert!(stats.cache_misses >= 1);
    assert!(run.ese.current_record(P1).is_some());
}

#[test]
fn test_group_completion_finalizes_provisional_record() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 8);
    run.remove(P0);

    let join = |ese: &EquivalentStateEliminator| {
        ese.records()
            .iter()
            .find(|r| r.point.inst == loc(3, 0) && r.is_terminated())
            .map(|r| (r.id, r.provisional, r.live_reads.clone()))
            .expect("terminated join record")
    };
    let (id, provisional, live_before) = join(&run.ese);
    assert!(provisional, "the join's arms have not been covered");
    assert_eq!(live_before.len(), 1);

    let records = run.ese.analysis().records();
    let left_exit = records.starting_at(loc(4, 0)).unwrap();
    let right_exit = records.starting_at(loc(5, 0)).unwrap();
    run.ese.coverage_updated(left_exit).unwrap();
    assert_eq!(run.ese.stats().records_reterminated, 0);
    run.ese.coverage_updated(right_exit).unwrap();

    let (after_id, provisional, live_after) = join(&run.ese);
    assert_eq!(after_id, id);
    assert!(!provisional);
    assert_eq!(live_after, live_before, "live sets never shrink");
    assert!(run.ese.records().get(id).unwrap().is_final());
    assert_eq!(run.ese.stats().records_reterminated, 1);
    assert!(run.ese.scheduler().cached_records() >= 3);
}

#[test]
fn test_held_path_cannot_step() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 7);

    run.ese.begin_step(P1, &run.paths).unwrap();
    let err = run.ese.end_step(P1, &run.paths).unwrap_err();
    assert!(matches!(err, EseError::InvalidTransition { from: "held", .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_duplicate_paths_are_rejected() {
    let mut run = Run::forked();

    let err = run.ese.start_path(P0, &run.paths).unwrap_err();
    assert!(matches!(err, EseError::DuplicatePath(0)));
    let err = run.ese.fork(P0, P1).unwrap_err();
    assert!(matches!(err, EseError::DuplicatePath(1)));
}

#[test]
fn test_symbolic_array_reads_materialize_once() {
    let mut run = Run::forked();
    let input = AllocKey::new(7, 0);

    let err = run
        .ese
        .on_read(P0, ReadDescriptor::ArrayConcrete { alloc: input, offset: 0 })
        .unwrap_err();
    assert!(matches!(err, EseError::UnregisteredAllocation(a) if a == input));

    run.ese.register_symbolic_array(P0, input).unwrap();
    let before = run.ese.write_sites().len();
    for _ in 0..2 {
        run.ese
            .on_read(P0, ReadDescriptor::ArrayConcrete { alloc: input, offset: 0 })
            .unwrap();
    }
    run.ese
        .on_read(P0, ReadDescriptor::ArraySymbolic { alloc: input })
        .unwrap();
    assert_eq!(run.ese.write_sites().len(), before + 2);

    let owner = run.ese.current_record(P0).unwrap();
    assert_eq!(run.ese.records().get(owner).unwrap().writes.len(), 2);
}

#[test]
fn test_constant_objects_are_not_tracked() {
    let mut run = Run::forked();
    run.ese.mark_constant(P0, obj()).unwrap();

    let handle = run.ese.on_write(P0, write_y(Cell::Heap, 3)).unwrap();
    assert!(handle.is_empty());
    let handle = run.ese.on_write(P0, write_y(Cell::Stack, 3)).unwrap();
    assert_eq!(handle.len(), 1);
}

#[test]
fn test_metrics_and_report_follow_the_run() {
    let mut run = Run::held_at_join(Cell::Stack, 7, 7);
    run.remove(P0);

    let metrics = run.ese.metrics().expect("standard preset collects metrics");
    assert_eq!(metrics.records_pruned.get(), 1);
    assert_eq!(metrics.holds.get(), 1);
    assert_eq!(metrics.held_paths.get(), 0);
    assert!(!run.ese.registry().gather().is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&run.ese.stats().to_json().unwrap()).unwrap();
    assert_eq!(json["records_pruned"], 1);
    assert_eq!(json["hold_edges"], 0);
    assert!(run.ese.hold_graph_dot().starts_with("digraph"));
}

#[test]
fn test_sibling_killed_during_fork_step_leaves_shared_record_running() {
    let mut run = Run::started(&join_branch_program());
    let x = WriteDescriptor::Stack {
        frame: 0,
        reg: 1,
        value: Expr::byte(1),
    };
    run.step(P0, vec![], vec![x], loc(0, 1));
    let root = run.ese.current_record(P0).unwrap();

    run.fork_mid_branch(P0, P1);
    run.remove(P1);

    let rec = run.ese.records().get(root).unwrap();
    assert!(rec.is_active(), "path 0 is still executing the branch");
    assert_eq!(rec.occupants, 1);
    assert_eq!(run.ese.scheduler().cached_records(), 0);
    assert_eq!(run.ese.stats().records_terminated, 0);

    run.ese.end_step(P0, &run.paths).unwrap();
    run.arm(P0, Cell::Stack, 7);
    run.join(P0, Cell::Stack, 7, 4);
    run.remove(P0);

    assert!(run.ese.records().iter().all(|r| r.is_terminated()));
    let stats = run.ese.stats();
    assert_eq!(stats.records_created, 4);
    assert_eq!(stats.records_terminated, 4);
    assert_eq!(stats.records_pruned, 0);
}

#[test]
fn test_record_of_running_path_cannot_be_terminated() {
    let mut run = Run::forked();
    let current = run.ese.current_record(P0).unwrap();

    let err = run.ese.terminate_if_ready(current, &run.paths).unwrap_err();
    assert!(matches!(err, EseError::InvalidTransition { from: "occupied", .. }));
    let err = run.ese.notify_terminated(current).unwrap_err();
    assert!(matches!(err, EseError::InvalidTransition { from: "occupied", .. }));
    assert!(run.ese.records().get(current).unwrap().is_active());
    assert_eq!(run.ese.scheduler().cached_records(), 0);

    // Both paths left the root; it waits for its children instead
    let root = run.ese.records().get(current).unwrap().parent.unwrap();
    assert!(run.ese.terminate_if_ready(root, &run.paths).unwrap().is_empty());

    run.arm(P0, Cell::Stack, 7);
    assert!(run.ese.current_record(P0).is_some());
}

#[test]
fn test_access_past_the_address_space_is_rejected() {
    let mut run = Run::forked();

    let err = run
        .ese
        .on_read(
            P0,
            ReadDescriptor::HeapConcrete {
                alloc: obj(),
                offset: u64::MAX,
                width: 2,
            },
        )
        .unwrap_err();
    assert!(matches!(err, EseError::OffsetOverflow { offset: u64::MAX, width: 2, .. }));
    run.ese
        .on_read(
            P0,
            ReadDescriptor::HeapConcrete {
                alloc: obj(),
                offset: u64::MAX,
                width: 1,
            },
        )
        .unwrap();

    let before = run.ese.write_sites().len();
    let err = run
        .ese
        .on_write(
            P0,
            WriteDescriptor::HeapConcrete {
                alloc: obj(),
                offset: u64::MAX - 1,
                bytes: vec![Expr::byte(1), Expr::byte(2), Expr::byte(3)],
            },
        )
        .unwrap_err();
    assert!(matches!(err, EseError::OffsetOverflow { .. }));
    assert_eq!(run.ese.write_sites().len(), before);
}

#[test]
fn test_loop_header_stays_provisional_until_body_is_covered() {
    let mut run = Run::started(&loop_program());

    // bb0 forks: path 0 starts with i = 0, path 1 with i = 1
    run.ese.begin_step(P0, &run.paths).unwrap();
    run.ese.fork(P0, P1).unwrap();
    let forked = run.paths.paths[&P0].clone();
    run.paths.insert(P1, forked);
    for (path, value) in [(P0, 0), (P1, 1)] {
        let write = write_i(value);
        run.apply(path, &write);
        run.ese.on_write(path, write).unwrap();
        run.paths.get_mut(path).pc = loc(1, 0);
    }
    run.ese.end_step(P0, &run.paths).unwrap();
    run.ese.end_step(P1, &run.paths).unwrap();
    let header = run.ese.current_record(P0).unwrap();

    // Path 0 leaves the loop at once; path 1 waits on its header
    run.header(P0, 3);
    assert!(run.ese.is_held(P1));
    assert_eq!(run.ese.drain_events().held, paths(&[P1]));
    run.remove(P0);
    assert_eq!(run.ese.drain_events().released, paths(&[P1]));

    let point = run.ese.records().get(header).unwrap().point.clone();
    let rec = run.ese.records().get(header).unwrap();
    assert!(rec.is_terminated());
    assert!(rec.provisional, "the body has not been covered");
    let live_before = rec.live_reads.clone();
    assert_eq!(live_before.len(), 1);
    let cache = run.ese.scheduler().comparer(&point).unwrap().cache();
    assert!(!cache.is_final(header, run.ese.records()).unwrap());
    let key_before = cache.key_of(header).unwrap();

    // First iteration covers the body, which completes the loop's group
    run.header(P1, 2);
    assert_eq!(run.ese.stats().records_reterminated, 0);
    run.body(P1, 2);

    let rec = run.ese.records().get(header).unwrap();
    assert!(rec.is_final());
    assert_eq!(rec.live_reads, live_before, "live sets never shrink");
    assert_eq!(run.ese.stats().records_reterminated, 1);
    let cache = run.ese.scheduler().comparer(&point).unwrap().cache();
    assert!(cache.is_final(header, run.ese.records()).unwrap());
    assert_eq!(cache.key_of(header), Some(key_before));

    // Two more iterations, then the exit matches path 0's exit record
    run.header(P1, 2);
    run.body(P1, 3);
    run.header(P1, 3);

    assert_eq!(run.ese.drain_events().pruned, paths(&[P1]));
    assert!(run.ese.current_record(P1).is_none());
    assert!(run.ese.records().iter().all(|r| r.state.is_done()));
    let stats = run.ese.stats();
    assert_eq!(stats.records_reterminated, 1);
    assert!(stats.cache_hits >= 1);
    assert_eq!(stats.records_pruned, 1);
}
