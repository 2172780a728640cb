//! Graphviz export of the analysis graphs

use super::acfg::AugmentedCfg;
use crate::features::control_dependence::domain::CdArena;
use crate::features::record_partition::RecordSet;
use crate::shared::models::{CdNodeId, RecordId};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFamily {
    Acfg,
    Acdg,
}

impl EdgeFamily {
    pub fn file_suffix(&self) -> &'static str {
        match self {
            EdgeFamily::Acfg => "acfg",
            EdgeFamily::Acdg => "acdg",
        }
    }
}

/// One function's ACFG or ACDG in DOT syntax
pub fn function_dot(acfg: &AugmentedCfg, arena: &CdArena, family: EdgeFamily) -> String {
    let mut graph: DiGraph<String, &'static str> = DiGraph::new();
    let mut index: FxHashMap<CdNodeId, NodeIndex> = FxHashMap::default();

    for &n in &acfg.nodes {
        let kind = arena.kind(n);
        if family == EdgeFamily::Acdg && !kind.is_acdg() {
            continue;
        }
        index.insert(n, graph.add_node(kind.to_string()));
    }

    for &n in &acfg.nodes {
        let Some(&from) = index.get(&n) else { continue };
        let node = arena.node(n);
        let succs = match family {
            EdgeFamily::Acfg => &node.acfg_succs,
            EdgeFamily::Acdg => &node.acdg_succs,
        };
        for s in succs {
            if let Some(&to) = index.get(s) {
                graph.add_edge(from, to, "");
            }
        }
    }

    render(&graph)
}

/// Record-level control graph of the whole program, one cluster per group
pub fn control_graph_dot(records: &RecordSet) -> String {
    let mut graph: DiGraph<String, &'static str> = DiGraph::new();
    let mut index: FxHashMap<RecordId, NodeIndex> = FxHashMap::default();

    for r in records.iter() {
        let label = match r.group {
            Some(g) => format!("{r} {g}"),
            None => r.to_string(),
        };
        index.insert(r.id, graph.add_node(label));
    }
    for r in records.iter() {
        for s in &r.control_succs {
            graph.add_edge(index[&r.id], index[s], "");
        }
    }

    render(&graph)
}

fn render(graph: &DiGraph<String, &'static str>) -> String {
    format!(
        "{}",
        Dot::with_attr_getters(
            graph,
            &[Config::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, _| "shape=box".to_string(),
        )
    )
}
