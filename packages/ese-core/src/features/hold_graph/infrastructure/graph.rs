//! Segment hold graph
//!
//! An edge `waiter → target` means the waiter segment is held until the
//! target segment terminates its pending record. Edges carry a
//! multiplicity: the same pair may be held several times and each hold is
//! released separately. Holds that would close a cycle are refused, so the
//! graph stays acyclic and every held path is eventually released.

use crate::errors::{EseError, EseResult};
use crate::shared::models::SegmentId;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction::{Incoming, Outgoing};
use tracing::trace;

#[derive(Debug, Default, Clone)]
pub struct HoldGraph {
    graph: DiGraphMap<SegmentId, u32>,
}

impl HoldGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `waiter → target` unless it would close a cycle
    ///
    /// An existing edge always succeeds and gains one more hold.
    pub fn attempt_hold(&mut self, waiter: SegmentId, target: SegmentId) -> bool {
        if waiter == target {
            return false;
        }
        if let Some(count) = self.graph.edge_weight_mut(waiter, target) {
            *count += 1;
            return true;
        }
        if self.reaches(target, waiter) {
            trace!(waiter = %waiter, target = %target, "hold refused");
            return false;
        }
        self.graph.add_edge(waiter, target, 1);
        true
    }

    /// Parent segment → segment opened by a fork below it
    pub fn add_lineage_edge(&mut self, parent: SegmentId, child: SegmentId) {
        match self.graph.edge_weight_mut(parent, child) {
            Some(count) => *count += 1,
            None => {
                self.graph.add_edge(parent, child, 1);
            }
        }
    }

    pub fn release(&mut self, waiter: SegmentId, target: SegmentId) -> EseResult<()> {
        let Some(count) = self.graph.edge_weight_mut(waiter, target) else {
            return Err(EseError::HoldProtocol {
                waiter,
                target,
                reason: "no such hold".to_string(),
            });
        };
        *count -= 1;
        if *count == 0 {
            self.graph.remove_edge(waiter, target);
        }
        Ok(())
    }

    /// Drops a segment whose records are all done
    ///
    /// Every predecessor is linked to every successor so reachability
    /// between the remaining segments is unchanged.
    pub fn retire(&mut self, segment: SegmentId) {
        if !self.graph.contains_node(segment) {
            return;
        }
        let preds: Vec<SegmentId> = self.graph.neighbors_directed(segment, Incoming).collect();
        let succs: Vec<SegmentId> = self.graph.neighbors_directed(segment, Outgoing).collect();
        self.graph.remove_node(segment);
        for &p in &preds {
            for &s in &succs {
                self.add_lineage_edge(p, s);
            }
        }
        trace!(segment = %segment, preds = preds.len(), succs = succs.len(), "segment retired");
    }

    pub fn contains_segment(&self, segment: SegmentId) -> bool {
        self.graph.contains_node(segment)
    }

    pub fn segment_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether `to` is reachable from `from` along hold or lineage edges
    pub fn reaches(&self, from: SegmentId, to: SegmentId) -> bool {
        self.graph.contains_node(from)
            && self.graph.contains_node(to)
            && has_path_connecting(&self.graph, from, to, None)
    }

    pub fn has_edge(&self, waiter: SegmentId, target: SegmentId) -> bool {
        self.graph.contains_edge(waiter, target)
    }

    pub fn multiplicity(&self, waiter: SegmentId, target: SegmentId) -> u32 {
        self.graph.edge_weight(waiter, target).copied().unwrap_or(0)
    }

    /// Every edge with its multiplicity, sorted
    pub fn edges(&self) -> Vec<(SegmentId, SegmentId, u32)> {
        let mut edges: Vec<_> = self
            .graph
            .all_edges()
            .map(|(waiter, target, count)| (waiter, target, *count))
            .collect();
        edges.sort();
        edges
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    /// Graphviz rendering with multiplicities as edge labels
    pub fn to_dot(&self) -> String {
        format!(
            "digraph {{\n{}}}\n",
            Dot::with_config(&self.graph, &[Config::GraphContentOnly])
        )
    }
}
