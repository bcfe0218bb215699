// SPDX-License-Identifier: Apache-2.0

//! Nodes and patterns of the shared AND/XOR pattern graph.

use crate::ids::{ClassId, EdgeId, NodeId};
use crate::logic::TruthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fanin {
    pub node: NodeId,
    pub inverted: bool,
}

impl Fanin {
    pub fn negate(self) -> Self {
        Fanin {
            node: self.node,
            inverted: !self.inverted,
        }
    }

    /// Packed form used by the binary index: `node << 1 | inverted`.
    pub fn pack(self) -> u32 {
        (self.node.0 << 1) | self.inverted as u32
    }

    pub fn unpack(word: u32) -> Self {
        Fanin {
            node: NodeId(word >> 1),
            inverted: word & 1 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgNodeType {
    Input,
    And,
    Xor,
}

impl PgNodeType {
    pub fn tag(self) -> u32 {
        match self {
            PgNodeType::Input => 0,
            PgNodeType::And => 1,
            PgNodeType::Xor => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(PgNodeType::Input),
            1 => Some(PgNodeType::And),
            2 => Some(PgNodeType::Xor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgNode {
    Input { input_id: u32 },
    And([Fanin; 2]),
    /// Fanins of XOR nodes are never inverted; inversions move to the
    /// consumer.
    Xor([Fanin; 2]),
}

impl PgNode {
    pub fn node_type(&self) -> PgNodeType {
        match self {
            PgNode::Input { .. } => PgNodeType::Input,
            PgNode::And(_) => PgNodeType::And,
            PgNode::Xor(_) => PgNodeType::Xor,
        }
    }

    pub fn input_id(&self) -> Option<u32> {
        match self {
            PgNode::Input { input_id } => Some(*input_id),
            _ => None,
        }
    }

    pub fn fanins(&self) -> Option<&[Fanin; 2]> {
        match self {
            PgNode::Input { .. } => None,
            PgNode::And(f) | PgNode::Xor(f) => Some(f),
        }
    }
}

/// One pattern: the sub-DAG reachable from `root`, listed as edges in
/// depth-first order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternGraph {
    pub(crate) class_id: ClassId,
    pub(crate) input_count: u32,
    pub(crate) root: NodeId,
    pub(crate) root_inverted: bool,
    pub(crate) edges: Vec<EdgeId>,
}

impl PatternGraph {
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn input_count(&self) -> u32 {
        self.input_count
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_inverted(&self) -> bool {
        self.root_inverted
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }
}

/// Edge list of the sub-DAG under `root`, depth-first with both fanin edges
/// of a node listed before descending into them. Also returns the number of
/// pattern inputs (highest input id + 1).
pub(crate) fn collect_edges(nodes: &[PgNode], root: NodeId) -> (Vec<EdgeId>, u32) {
    let mut edges = Vec::new();
    let mut visited = vec![false; nodes.len()];
    let mut input_count = 0u32;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if visited[id.index()] {
            continue;
        }
        visited[id.index()] = true;
        match &nodes[id.index()] {
            PgNode::Input { input_id } => input_count = input_count.max(input_id + 1),
            PgNode::And(f) | PgNode::Xor(f) => {
                edges.push(EdgeId::new(id, 0));
                edges.push(EdgeId::new(id, 1));
                stack.push(f[1].node);
                stack.push(f[0].node);
            }
        }
    }
    (edges, input_count)
}

/// Evaluates the sub-DAG under `root` over `input_count` variables, without
/// the root inversion. Returns `None` if an input id is out of range.
pub(crate) fn evaluate(nodes: &[PgNode], root: NodeId, input_count: usize) -> Option<TruthTable> {
    let mut values: Vec<Option<TruthTable>> = vec![None; nodes.len()];
    // Fanins always precede their node, so one ascending pass suffices.
    for id in 0..=root.index() {
        let v = match &nodes[id] {
            PgNode::Input { input_id } => {
                let i = *input_id as usize;
                if i < input_count {
                    Some(TruthTable::var(input_count, i))
                } else {
                    None
                }
            }
            PgNode::And(f) | PgNode::Xor(f) => {
                let operand = |fanin: &Fanin| -> Option<TruthTable> {
                    let t = values[fanin.node.index()].as_ref()?;
                    Some(if fanin.inverted { t.complement() } else { t.clone() })
                };
                match (operand(&f[0]), operand(&f[1])) {
                    (Some(a), Some(b)) => Some(match nodes[id] {
                        PgNode::Xor(_) => a.xor(&b),
                        _ => a.and(&b),
                    }),
                    _ => None,
                }
            }
        };
        values[id] = v;
    }
    values[root.index()].take()
}
