//! Control groups: SCCs of the record control graph
//!
//! Loops and recursion make control dependence cyclic. Each SCC becomes a
//! group; a group completes once every member is covered and every successor
//! group completed. Completion only flows toward predecessor groups, so a
//! worklist seeded with the group of a newly covered record reaches the
//! fixpoint.

use crate::errors::EseResult;
use crate::features::control_dependence::domain::ControlGroup;
use crate::features::record_partition::RecordSet;
use crate::shared::models::{ExecRecordId, GroupId, RecordId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

pub fn build_groups(records: &mut RecordSet) -> EseResult<Vec<ControlGroup>> {
    let mut graph: DiGraph<RecordId, ()> = DiGraph::with_capacity(records.len(), 0);
    let nodes: Vec<NodeIndex> = records.iter().map(|r| graph.add_node(r.id)).collect();
    for r in records.iter() {
        for s in &r.control_succs {
            graph.add_edge(nodes[r.id.index()], nodes[s.index()], ());
        }
    }

    let mut groups = Vec::new();
    for scc in tarjan_scc(&graph) {
        let id = GroupId::from_index(groups.len());
        let mut members: Vec<RecordId> = scc.into_iter().map(|n| graph[n]).collect();
        members.sort();
        for &m in &members {
            records.get_mut(m)?.group = Some(id);
        }
        groups.push(ControlGroup::new(id, members));
    }

    for r in records.iter() {
        let Some(g1) = r.group else { continue };
        for s in &r.control_succs {
            let Some(g2) = records.get(*s)?.group else {
                continue;
            };
            if g1 != g2 {
                groups[g1.index()].succs.insert(g2);
                groups[g2.index()].preds.insert(g1);
            }
        }
    }

    Ok(groups)
}

/// Marks `record` covered and propagates group completion
///
/// Returns the sources of every group that completed, in id order, and the
/// ids of those groups.
pub fn cover(
    record: RecordId,
    records: &mut RecordSet,
    groups: &mut [ControlGroup],
) -> EseResult<(Vec<ExecRecordId>, Vec<GroupId>)> {
    let rec = records.get_mut(record)?;
    if rec.covered {
        return Ok((Vec::new(), Vec::new()));
    }
    rec.covered = true;
    let Some(start) = rec.group else {
        return Ok((Vec::new(), Vec::new()));
    };

    let mut sources: BTreeSet<ExecRecordId> = BTreeSet::new();
    let mut completed = Vec::new();
    let mut worklist = VecDeque::from([start]);

    while let Some(g) = worklist.pop_front() {
        let group = &groups[g.index()];
        if group.completed {
            continue;
        }

        let mut all_covered = true;
        for &m in &group.members {
            if !records.get(m)?.covered {
                all_covered = false;
                break;
            }
        }
        if !all_covered || !group.succs.iter().all(|s| groups[s.index()].completed) {
            continue;
        }

        let group = &mut groups[g.index()];
        group.completed = true;
        completed.push(g);
        for &m in &group.members {
            sources.append(&mut records.get_mut(m)?.sources);
        }
        worklist.extend(group.preds.iter().copied());
        debug!(group = %g, members = group.members.len(), "Control group completed");
    }

    Ok((sources.into_iter().collect(), completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::record_partition::RecordKind;
    use crate::shared::models::{BlockId, FunctionId};

    /// Records 0..n in one function with the given control edges
    fn records_with_controls(n: usize, edges: &[(u32, u32)]) -> RecordSet {
        let mut records = RecordSet::new();
        for i in 0..n {
            records.push(FunctionId(0), BlockId(i as u32), 0, 1, RecordKind::Straight);
        }
        for &(a, b) in edges {
            records.link_control(RecordId(a), RecordId(b));
        }
        records
    }

    #[test]
    fn test_loop_forms_one_group() {
        // 0 controls 1, 1 and 2 control each other
        let mut records = records_with_controls(3, &[(0, 1), (1, 2), (2, 1)]);
        let groups = build_groups(&mut records).unwrap();

        assert_eq!(groups.len(), 2);
        let g1 = records.get(RecordId(1)).unwrap().group.unwrap();
        assert_eq!(records.get(RecordId(2)).unwrap().group, Some(g1));
        assert!(groups[g1.index()].is_cyclic());
        let g0 = records.get(RecordId(0)).unwrap().group.unwrap();
        assert!(groups[g0.index()].succs.contains(&g1));
        assert!(groups[g1.index()].preds.contains(&g0));
    }

    #[test]
    fn test_completion_waits_for_members_and_successors() {
        let mut records = records_with_controls(3, &[(0, 1), (1, 2), (2, 1)]);
        let mut groups = build_groups(&mut records).unwrap();
        let g0 = records.get(RecordId(0)).unwrap().group.unwrap();
        let g1 = records.get(RecordId(1)).unwrap().group.unwrap();

        records.get_mut(RecordId(0)).unwrap().sources.insert(ExecRecordId(7));

        let (sources, _) = cover(RecordId(0), &mut records, &mut groups).unwrap();
        assert!(sources.is_empty());
        assert!(!groups[g0.index()].completed, "successor group still open");

        cover(RecordId(1), &mut records, &mut groups).unwrap();
        assert!(!groups[g1.index()].completed);

        let (sources, completed) = cover(RecordId(2), &mut records, &mut groups).unwrap();
        assert_eq!(completed, vec![g1, g0]);
        assert_eq!(sources, vec![ExecRecordId(7)]);
        assert!(records.get(RecordId(0)).unwrap().sources.is_empty());
    }

    #[test]
    fn test_cover_twice_is_noop() {
        let mut records = records_with_controls(1, &[]);
        let mut groups = build_groups(&mut records).unwrap();

        let (_, completed) = cover(RecordId(0), &mut records, &mut groups).unwrap();
        assert_eq!(completed.len(), 1);
        let (_, completed) = cover(RecordId(0), &mut records, &mut groups).unwrap();
        assert!(completed.is_empty());
        assert!(groups[0].completed);
    }
}
