// SPDX-License-Identifier: Apache-2.0

//! The finished cell library and its construction from a list of cells.

use std::collections::HashMap;

use crate::cell::{Cell, CellKind};
use crate::class::{seq_shape_index, Builtins, CellClass, CellGroup, BUF, CONST0, CONST1, INV};
use crate::classify::Classifier;
use crate::config::BuildOptions;
use crate::error::{Result, TechlibError};
use crate::ids::{CellId, ClassId, EdgeId, GroupId, NodeId, PatternId};
use crate::logic::TruthTable;
use crate::patgen::PatternGenerator;
use crate::pattern::{evaluate, PatternGraph, PgNode};
use crate::signature::{check_expr_depth, encode, Signature};

/// Read-only index over a technology library: cells, their NPN groups and
/// classes, and the shared pattern graph.
///
/// All lookups are table reads. Id arguments must come from this library;
/// an id out of range panics like a slice index.
#[derive(Debug, Clone, PartialEq)]
pub struct CellLibrary {
    pub(crate) name: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) cell_names: HashMap<String, CellId>,
    pub(crate) cell_groups: Vec<Option<GroupId>>,
    pub(crate) groups: Vec<CellGroup>,
    pub(crate) classes: Vec<CellClass>,
    pub(crate) builtins: Builtins,
    pub(crate) pg_nodes: Vec<PgNode>,
    pub(crate) patterns: Vec<PatternGraph>,
}

/// Result of [`build_index`].
#[derive(Debug)]
pub struct BuildReport {
    pub library: CellLibrary,
    /// Cells left out of the library, each as a `MalformedSignature` error.
    pub rejected: Vec<TechlibError>,
}

/// Classifies `cells` and builds the library index.
///
/// Cells whose function cannot be encoded are dropped before ids are
/// assigned and reported in [`BuildReport::rejected`]; the remaining cells
/// keep their relative order.
pub fn build_index(name: &str, cells: Vec<Cell>, options: &BuildOptions) -> Result<BuildReport> {
    options.validate()?;
    let mut rejected = Vec::new();
    let mut accepted: Vec<(Cell, Option<Signature>)> = Vec::with_capacity(cells.len());
    for cell in cells {
        if cell.kind() == CellKind::Fsm {
            match check_expr_depth(&cell) {
                Ok(()) => {
                    log::debug!("{}: FSM cell stored without a group", cell.name());
                    accepted.push((cell, None));
                }
                Err(e) => {
                    log::warn!("rejecting cell: {}", e);
                    rejected.push(e);
                }
            }
            continue;
        }
        match encode(&cell, options.max_inputs) {
            Ok(sig) => accepted.push((cell, Some(sig))),
            Err(e) => {
                log::warn!("rejecting cell: {}", e);
                rejected.push(e);
            }
        }
    }

    let mut classifier = Classifier::new(options.max_automorphisms)?;
    let mut lib_cells = Vec::with_capacity(accepted.len());
    let mut cell_groups = Vec::with_capacity(accepted.len());
    let mut cell_names = HashMap::with_capacity(accepted.len());
    for (i, (cell, sig)) in accepted.into_iter().enumerate() {
        let id = CellId::from_index(i);
        let group = match sig {
            Some(sig) => {
                let g = classifier.find_group(&sig)?;
                classifier.add_cell(g, id);
                Some(g)
            }
            None => None,
        };
        if cell_names.contains_key(cell.name()) {
            log::warn!("duplicate cell name '{}'; lookups return the first", cell.name());
        } else {
            cell_names.insert(cell.name().to_string(), id);
        }
        cell_groups.push(group);
        lib_cells.push(cell);
    }
    log::debug!(
        "classified {} cells into {} groups and {} classes",
        lib_cells.len(),
        classifier.groups().len(),
        classifier.classes().len()
    );

    let (groups, mut classes, builtins) = classifier.into_parts();
    let (pg_nodes, patterns) = if options.generate_patterns {
        PatternGenerator::run(&mut classes, options.max_pattern_inputs)?
    } else {
        (Vec::new(), Vec::new())
    };

    let library = CellLibrary {
        name: name.to_string(),
        cells: lib_cells,
        cell_names,
        cell_groups,
        groups,
        classes,
        builtins,
        pg_nodes,
        patterns,
    };
    log::info!(
        "built library '{}': {} cells ({} rejected), {} groups, {} classes, {} patterns, {} nodes",
        library.name,
        library.cell_count(),
        rejected.len(),
        library.group_count(),
        library.class_count(),
        library.pattern_count(),
        library.pg_node_count()
    );
    Ok(BuildReport { library, rejected })
}

impl CellLibrary {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// First cell with this name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.cell_names.get(name).copied()
    }

    /// Group of a cell; `None` for cells that are never classified (FSMs).
    pub fn cell_group(&self, id: CellId) -> Option<GroupId> {
        self.cell_groups[id.index()]
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, id: GroupId) -> &CellGroup {
        &self.groups[id.index()]
    }

    pub fn groups(&self) -> &[CellGroup] {
        &self.groups
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class(&self, id: ClassId) -> &CellClass {
        &self.classes[id.index()]
    }

    pub fn classes(&self) -> &[CellClass] {
        &self.classes
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn pattern(&self, id: PatternId) -> &PatternGraph {
        &self.patterns[id.index()]
    }

    pub fn patterns(&self) -> &[PatternGraph] {
        &self.patterns
    }

    pub fn class_patterns(&self, id: ClassId) -> &[PatternId] {
        &self.classes[id.index()].patterns
    }

    pub fn builtins(&self) -> Builtins {
        self.builtins
    }

    pub fn const0_func(&self) -> GroupId {
        self.builtins.logic_groups[CONST0]
    }

    pub fn const1_func(&self) -> GroupId {
        self.builtins.logic_groups[CONST1]
    }

    pub fn buf_func(&self) -> GroupId {
        self.builtins.logic_groups[BUF]
    }

    pub fn inv_func(&self) -> GroupId {
        self.builtins.logic_groups[INV]
    }

    /// Class of the flip-flop `Q = IQ` over `D, CK[, CLR][, PRE]`.
    pub fn simple_ff_class(&self, has_clear: bool, has_preset: bool) -> ClassId {
        self.builtins.ff_classes[seq_shape_index(has_clear, has_preset)]
    }

    /// Class of the latch `Q = IQ` over `D, EN[, CLR][, PRE]`.
    pub fn simple_latch_class(&self, has_clear: bool, has_preset: bool) -> ClassId {
        self.builtins.latch_classes[seq_shape_index(has_clear, has_preset)]
    }

    pub fn pg_node_count(&self) -> usize {
        self.pg_nodes.len()
    }

    pub fn pg_node(&self, id: NodeId) -> &PgNode {
        &self.pg_nodes[id.index()]
    }

    /// Number of input nodes; they occupy the first node ids.
    pub fn pg_max_input(&self) -> usize {
        self.pg_nodes
            .iter()
            .take_while(|n| matches!(n, PgNode::Input { .. }))
            .count()
    }

    pub fn pg_input_node(&self, input_id: usize) -> Option<NodeId> {
        (input_id < self.pg_max_input()).then(|| NodeId::from_index(input_id))
    }

    /// Two edge slots per node; the slots of input nodes are unused.
    pub fn pg_edge_count(&self) -> usize {
        2 * self.pg_nodes.len()
    }

    /// Node driving the edge, `None` for an unused slot.
    pub fn pg_edge_from(&self, edge: EdgeId) -> Option<NodeId> {
        self.pg_node(edge.node())
            .fanins()
            .map(|f| f[edge.pos()].node)
    }

    /// Node consuming the edge.
    pub fn pg_edge_to(&self, edge: EdgeId) -> NodeId {
        edge.node()
    }

    pub fn pg_edge_pos(&self, edge: EdgeId) -> usize {
        edge.pos()
    }

    pub fn pg_edge_inv(&self, edge: EdgeId) -> bool {
        self.pg_node(edge.node())
            .fanins()
            .map_or(false, |f| f[edge.pos()].inverted)
    }

    /// Function computed by a pattern over its own inputs, root inversion
    /// included.
    pub fn evaluate_pattern(&self, id: PatternId) -> Option<TruthTable> {
        let p = self.pattern(id);
        let v = evaluate(&self.pg_nodes, p.root, p.input_count as usize)?;
        Some(if p.root_inverted { v.complement() } else { v })
    }
}
