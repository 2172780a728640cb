//! Nodes of the augmented control-flow graph
//!
//! One arena holds the nodes of every function so interprocedural (ICFG)
//! edges can point across functions. Each node carries four edge families:
//! - `acfg`: augmented control flow
//! - `pcg` : raw control dependence from the postdominance frontier
//! - `acdg`: control dependence projected onto ACDG nodes
//! - `icfg`: ACDG plus call/return stitching

use crate::errors::{EseError, EseResult};
use crate::shared::models::{CdNodeId, FunctionId, RecordId};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdNodeKind {
    Start,
    Entry,
    Exit,
    SuperExit,
    /// Normal continuation of a call record
    Return { call: RecordId },
    /// Decision point of a call that may not return
    ReturnPredicate { call: RecordId },
    /// A record; PHI records get one node per incoming predecessor
    Record {
        record: RecordId,
        phi_pred: Option<RecordId>,
    },
}

impl CdNodeKind {
    /// Nodes kept in the control-dependence graph
    pub fn is_acdg(&self) -> bool {
        matches!(
            self,
            CdNodeKind::Entry | CdNodeKind::Exit | CdNodeKind::Return { .. } | CdNodeKind::Record { .. }
        )
    }

    /// Nodes standing in for control decided in another function
    pub fn is_placeholder(&self) -> bool {
        matches!(self, CdNodeKind::Entry | CdNodeKind::Return { .. })
    }

    pub fn record(&self) -> Option<RecordId> {
        match self {
            CdNodeKind::Record { record, .. } => Some(*record),
            _ => None,
        }
    }
}

impl fmt::Display for CdNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CdNodeKind::Start => write!(f, "start"),
            CdNodeKind::Entry => write!(f, "entry"),
            CdNodeKind::Exit => write!(f, "exit"),
            CdNodeKind::SuperExit => write!(f, "super-exit"),
            CdNodeKind::Return { call } => write!(f, "ret({call})"),
            CdNodeKind::ReturnPredicate { call } => write!(f, "retpred({call})"),
            CdNodeKind::Record {
                record,
                phi_pred: Some(pred),
            } => write!(f, "{record}<-{pred}"),
            CdNodeKind::Record { record, .. } => write!(f, "{record}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CdNode {
    pub id: CdNodeId,
    pub function: FunctionId,
    pub kind: CdNodeKind,
    pub acfg_succs: BTreeSet<CdNodeId>,
    pub acfg_preds: BTreeSet<CdNodeId>,
    pub pcg_succs: BTreeSet<CdNodeId>,
    pub acdg_succs: BTreeSet<CdNodeId>,
    pub acdg_preds: BTreeSet<CdNodeId>,
    pub icfg_succs: BTreeSet<CdNodeId>,
    pub icfg_preds: BTreeSet<CdNodeId>,
    pub ipostdom: Option<CdNodeId>,
    pub postdom_children: Vec<CdNodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct CdArena {
    nodes: Vec<CdNode>,
}

impl CdArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: FunctionId, kind: CdNodeKind) -> CdNodeId {
        let id = CdNodeId::from_index(self.nodes.len());
        self.nodes.push(CdNode {
            id,
            function,
            kind,
            acfg_succs: BTreeSet::new(),
            acfg_preds: BTreeSet::new(),
            pcg_succs: BTreeSet::new(),
            acdg_succs: BTreeSet::new(),
            acdg_preds: BTreeSet::new(),
            icfg_succs: BTreeSet::new(),
            icfg_preds: BTreeSet::new(),
            ipostdom: None,
            postdom_children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: CdNodeId) -> EseResult<&CdNode> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| EseError::unknown("control node", id.0))
    }

    /// Ids are only minted by `add`, so indexing cannot fail for ids from this arena
    pub fn node(&self, id: CdNodeId) -> &CdNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: CdNodeId) -> CdNodeKind {
        self.nodes[id.index()].kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_acfg_edge(&mut self, from: CdNodeId, to: CdNodeId) {
        self.nodes[from.index()].acfg_succs.insert(to);
        self.nodes[to.index()].acfg_preds.insert(from);
    }

    pub fn add_pcg_edge(&mut self, from: CdNodeId, to: CdNodeId) {
        self.nodes[from.index()].pcg_succs.insert(to);
    }

    pub fn add_acdg_edge(&mut self, from: CdNodeId, to: CdNodeId) {
        self.nodes[from.index()].acdg_succs.insert(to);
        self.nodes[to.index()].acdg_preds.insert(from);
    }

    pub fn add_icfg_edge(&mut self, from: CdNodeId, to: CdNodeId) {
        self.nodes[from.index()].icfg_succs.insert(to);
        self.nodes[to.index()].icfg_preds.insert(from);
    }

    pub fn set_ipostdom(&mut self, node: CdNodeId, ipostdom: CdNodeId) {
        self.nodes[node.index()].ipostdom = Some(ipostdom);
        self.nodes[ipostdom.index()].postdom_children.push(node);
    }
}
