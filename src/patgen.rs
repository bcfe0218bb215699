// SPDX-License-Identifier: Apache-2.0

//! Decomposition of canonical class functions into shared AND/XOR patterns.
//!
//! Every eligible class (single-output combinational, no tristate, at least
//! two relevant inputs) gets one pattern per automorphism orbit of its
//! inputs: the orbit representative is the top-level Shannon split, and the
//! cofactors below it are decomposed recursively. Sub-functions are shared
//! across all classes through a cache keyed by their truth table, and nodes
//! are hash-consed on their (commutatively ordered) fanins.

use std::collections::HashMap;

use crate::cell::CellKind;
use crate::class::CellClass;
use crate::error::{Result, TechlibError};
use crate::ids::{ClassId, NodeId, PatternId};
use crate::logic::TruthTable;
use crate::npn::{matcher, NpnMap};
use crate::pattern::{collect_edges, evaluate, Fanin, PatternGraph, PgNode};
use crate::signature::Signature;

/// Canonical function of `class` if patterns should be generated for it,
/// shrunk to its highest relevant input.
pub(crate) fn pattern_function(class: &CellClass, max_inputs: usize) -> Option<TruthTable> {
    let repr = &class.repr;
    if repr.kind() != CellKind::Logic || repr.output_count() != 1 || !repr.has_no_tristate() {
        return None;
    }
    let f = repr.logic(0);
    let support = f.support();
    if support.len() < 2 {
        return None;
    }
    let k = support[support.len() - 1] + 1;
    if k > max_inputs {
        log::debug!(
            "{}: {} inputs exceed the pattern limit of {}",
            class.id,
            k,
            max_inputs
        );
        return None;
    }
    Some(f.shrink(k))
}

/// Largest-index member of every orbit of the support variables of `f`
/// under the automorphism group of `repr`, ascending.
///
/// The recorded `automorphisms` may be capped, so pairs they leave apart are
/// settled by asking the matcher for an automorphism moving one onto the
/// other.
pub(crate) fn orbit_representatives(
    repr: &Signature,
    f: &TruthTable,
    automorphisms: &[NpnMap],
) -> Vec<usize> {
    let n = f.input_count();
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut v: usize) -> usize {
        while parent[v] != v {
            parent[v] = parent[parent[v]];
            v = parent[v];
        }
        v
    }
    fn union(parent: &mut [usize], a: usize, b: usize) {
        let (ra, rb) = (find(parent, a), find(parent, b));
        if ra != rb {
            // Keep the larger index as the root.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent[lo] = hi;
        }
    }
    for a in automorphisms {
        for i in 0..n.min(a.input_count()) {
            let j = a.imap(i).dst as usize;
            if j < n {
                union(&mut parent, i, j);
            }
        }
    }
    let support = f.support();
    for (k, &i) in support.iter().enumerate() {
        for &j in &support[k + 1..] {
            if find(&mut parent, i) == find(&mut parent, j) {
                continue;
            }
            if matcher::automorphism_moving(repr, i, j).is_some() {
                union(&mut parent, i, j);
            }
        }
    }
    let mut reps: Vec<usize> = support.iter().map(|&v| find(&mut parent, v)).collect();
    reps.sort_unstable();
    reps.dedup();
    reps
}

pub(crate) struct PatternGenerator {
    nodes: Vec<PgNode>,
    node_hash: HashMap<PgNode, NodeId>,
    /// Keyed by the function shrunk to its highest relevant input and
    /// normalized to evaluate to 0 on the all-zero assignment.
    func_cache: HashMap<TruthTable, Fanin>,
    patterns: Vec<PatternGraph>,
}

impl PatternGenerator {
    pub(crate) fn new(input_count: usize) -> Self {
        let nodes: Vec<PgNode> = (0..input_count as u32)
            .map(|input_id| PgNode::Input { input_id })
            .collect();
        let node_hash = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (*n, NodeId::from_index(i)))
            .collect();
        PatternGenerator {
            nodes,
            node_hash,
            func_cache: HashMap::new(),
            patterns: Vec::new(),
        }
    }

    /// Generates the patterns of every eligible class, recording the pattern
    /// ids on the classes.
    pub(crate) fn run(
        classes: &mut [CellClass],
        max_inputs: usize,
    ) -> Result<(Vec<PgNode>, Vec<PatternGraph>)> {
        let eligible: Vec<(usize, TruthTable)> = classes
            .iter()
            .enumerate()
            .filter_map(|(i, c)| pattern_function(c, max_inputs).map(|f| (i, f)))
            .collect();
        let max_input = eligible
            .iter()
            .map(|(_, f)| f.input_count())
            .max()
            .unwrap_or(0);
        let mut gen = PatternGenerator::new(max_input);
        for (ci, f) in eligible {
            let class = &classes[ci];
            let reps = orbit_representatives(&class.repr, &f, &class.automorphisms);
            for x in reps {
                let root = gen.decompose_root(&f, x)?;
                let class = &mut classes[ci];
                let duplicate = class.patterns.iter().any(|p| {
                    let p = &gen.patterns[p.index()];
                    p.root == root.node && p.root_inverted == root.inverted
                });
                if duplicate {
                    log::debug!(
                        "{}: orbit of input {} reuses an existing pattern root",
                        class.id,
                        x
                    );
                    continue;
                }
                let pid = gen.register(class.id, &f, root)?;
                class.patterns.push(pid);
            }
        }
        log::debug!(
            "generated {} patterns over {} nodes",
            gen.patterns.len(),
            gen.nodes.len()
        );
        Ok((gen.nodes, gen.patterns))
    }

    fn decompose_root(&mut self, f: &TruthTable, x: usize) -> Result<Fanin> {
        let lit = Fanin {
            node: NodeId::from_index(x),
            inverted: false,
        };
        let root = self.combine(lit, &f.cofactor(x, false), &f.cofactor(x, true))?;
        let (key, inv) = normalize(f);
        self.func_cache
            .entry(key)
            .or_insert(if inv { root.negate() } else { root });
        Ok(root)
    }

    fn register(&mut self, class_id: ClassId, f: &TruthTable, root: Fanin) -> Result<PatternId> {
        let (edges, input_count) = collect_edges(&self.nodes, root.node);
        let value = evaluate(&self.nodes, root.node, f.input_count()).ok_or_else(|| {
            TechlibError::internal(format!(
                "pattern for {} references an input beyond {}",
                class_id,
                f.input_count()
            ))
        })?;
        let value = if root.inverted { value.complement() } else { value };
        if value != *f {
            return Err(TechlibError::internal(format!(
                "pattern for {} computes {:?} instead of {:?}",
                class_id, value, f
            )));
        }
        if input_count as usize != f.input_count() {
            return Err(TechlibError::internal(format!(
                "pattern for {} reaches {} of {} inputs",
                class_id,
                input_count,
                f.input_count()
            )));
        }
        let pid = PatternId::from_index(self.patterns.len());
        log::debug!(
            "{} for {}: root={} inv={} edges={}",
            pid,
            class_id,
            root.node,
            root.inverted,
            edges.len()
        );
        self.patterns.push(PatternGraph {
            class_id,
            input_count,
            root: root.node,
            root_inverted: root.inverted,
            edges,
        });
        Ok(pid)
    }

    /// Realizes `f = x ? f1 : f0` where `x` does not occur in `f0` or `f1`.
    fn combine(&mut self, x: Fanin, f0: &TruthTable, f1: &TruthTable) -> Result<Fanin> {
        if f0.is_const0() {
            let h = self.handle(f1)?;
            return Ok(self.mk_and(x, h));
        }
        if f1.is_const0() {
            let h = self.handle(f0)?;
            return Ok(self.mk_and(x.negate(), h));
        }
        if f0.is_const1() {
            let h = self.handle(f1)?;
            return Ok(self.mk_and(x, h.negate()).negate());
        }
        if f1.is_const1() {
            let h = self.handle(f0)?;
            return Ok(self.mk_and(x.negate(), h.negate()).negate());
        }
        if *f0 == f1.complement() {
            let h = self.handle(f0)?;
            return Ok(self.mk_xor(x, h));
        }
        let h1 = self.handle(f1)?;
        let h0 = self.handle(f0)?;
        let a = self.mk_and(x, h1);
        let b = self.mk_and(x.negate(), h0);
        Ok(self.mk_and(a.negate(), b.negate()).negate())
    }

    /// Node (with polarity) computing `g`, reusing a cached one if present.
    fn handle(&mut self, g: &TruthTable) -> Result<Fanin> {
        if g.is_const0() || g.is_const1() {
            return Err(TechlibError::internal(
                "constant sub-function in decomposition",
            ));
        }
        let support = g.support();
        if support.len() == 1 {
            return Ok(Fanin {
                node: NodeId::from_index(support[0]),
                inverted: g.get(0),
            });
        }
        let (key, inv) = normalize(g);
        if let Some(&h) = self.func_cache.get(&key) {
            return Ok(if inv { h.negate() } else { h });
        }
        let y = choose_split(g, &support);
        let lit = Fanin {
            node: NodeId::from_index(y),
            inverted: false,
        };
        let h = self.combine(lit, &g.cofactor(y, false), &g.cofactor(y, true))?;
        self.func_cache
            .insert(key, if inv { h.negate() } else { h });
        Ok(h)
    }

    fn mk_and(&mut self, a: Fanin, b: Fanin) -> Fanin {
        let mut fanins = [a, b];
        fanins.sort();
        Fanin {
            node: self.intern(PgNode::And(fanins)),
            inverted: false,
        }
    }

    fn mk_xor(&mut self, a: Fanin, b: Fanin) -> Fanin {
        let inverted = a.inverted ^ b.inverted;
        let mut fanins = [
            Fanin {
                node: a.node,
                inverted: false,
            },
            Fanin {
                node: b.node,
                inverted: false,
            },
        ];
        fanins.sort();
        Fanin {
            node: self.intern(PgNode::Xor(fanins)),
            inverted,
        }
    }

    fn intern(&mut self, node: PgNode) -> NodeId {
        if let Some(&id) = self.node_hash.get(&node) {
            return id;
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        self.node_hash.insert(node, id);
        id
    }
}

/// Cache key of `g` and whether the key is its complement.
fn normalize(g: &TruthTable) -> (TruthTable, bool) {
    let k = g.max_support().map_or(0, |v| v + 1);
    let key = g.shrink(k);
    if key.get(0) {
        (key.complement(), true)
    } else {
        (key, false)
    }
}

/// Prefers a variable with a constant cofactor, then one whose cofactors are
/// complementary, then the highest index.
fn choose_split(g: &TruthTable, support: &[usize]) -> usize {
    let mut best: Option<(u8, usize)> = None;
    for &v in support.iter().rev() {
        let c0 = g.cofactor(v, false);
        let c1 = g.cofactor(v, true);
        let score = if c0.is_const0() || c0.is_const1() || c1.is_const0() || c1.is_const1() {
            2
        } else if c0 == c1.complement() {
            1
        } else {
            0
        };
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, v));
        }
    }
    best.map_or(support[support.len() - 1], |(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;
    use crate::classify::Classifier;
    use crate::signature::encode;

    fn classify(formulas: &[(&str, &[&str])]) -> Vec<CellClass> {
        let mut c = Classifier::new(4096).unwrap();
        for (formula, inputs) in formulas {
            let mut b = CellBuilder::new("C", 1.0);
            for i in inputs.iter() {
                b = b.input(i);
            }
            let sig = encode(&b.output("Y", formula).build().unwrap(), 16).unwrap();
            c.find_group(&sig).unwrap();
        }
        let (_, classes, _) = c.into_parts();
        classes
    }

    #[test]
    fn test_builtins_get_no_patterns() {
        let mut classes = classify(&[]);
        let (nodes, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert!(nodes.is_empty());
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_xor2_single_node() {
        let mut classes = classify(&[("A ^ B", &["A", "B"])]);
        let (nodes, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.edges.len(), 2);
        assert!(matches!(nodes[p.root.index()], PgNode::Xor(_)));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_and3_reuses_and2_node() {
        let mut classes = classify(&[("A * B", &["A", "B"]), ("A * B * C", &["A", "B", "C"])]);
        let (nodes, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert_eq!(patterns.len(), 2);
        let and2_root = patterns[0].root;
        let and3_root = patterns[1].root;
        let fanins = nodes[and3_root.index()].fanins().unwrap();
        assert!(fanins.iter().any(|f| f.node == and2_root && !f.inverted));
    }

    #[test]
    fn test_one_pattern_per_orbit() {
        // a & (b | c): {b, c} form one orbit, a another.
        let mut classes = classify(&[("A * (B + C)", &["A", "B", "C"])]);
        let (nodes, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert_eq!(patterns.len(), 2);
        let f = pattern_function(&classes[12], 8).unwrap();
        for p in &patterns {
            let mut v = evaluate(&nodes, p.root, 3).unwrap();
            if p.root_inverted {
                v = v.complement();
            }
            assert_eq!(v, f);
        }
    }

    #[test]
    fn test_mux_decomposes() {
        let mut classes = classify(&[("S * B + !S * A", &["A", "B", "S"])]);
        let (_, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert!(!patterns.is_empty());
        assert_eq!(classes[12].patterns.len(), patterns.len());
    }

    #[test]
    fn test_pattern_input_limit() {
        let mut classes = classify(&[("A * B * C", &["A", "B", "C"])]);
        let (_, patterns) = PatternGenerator::run(&mut classes, 2).unwrap();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_orbits_of_and_or() {
        let classes = classify(&[("A * (B + C)", &["A", "B", "C"])]);
        let class = &classes[12];
        let f = pattern_function(class, 8).unwrap();
        assert_eq!(
            orbit_representatives(&class.repr, &f, &class.automorphisms),
            vec![0, 2]
        );
        // Without recorded maps the matcher still finds the B/C symmetry.
        assert_eq!(orbit_representatives(&class.repr, &f, &[]), vec![0, 2]);
    }

    #[test]
    fn test_capped_automorphisms_keep_a_single_orbit() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H"];
        let formula = names.join(" * ");
        let mut c = Classifier::new(16).unwrap();
        let mut b = CellBuilder::new("AND8", 1.0);
        for i in names {
            b = b.input(i);
        }
        let sig = encode(&b.output("Y", &formula).build().unwrap(), 16).unwrap();
        c.find_group(&sig).unwrap();
        let (_, mut classes, _) = c.into_parts();
        assert_eq!(classes[12].automorphisms.len(), 16);
        let (_, patterns) = PatternGenerator::run(&mut classes, 8).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(classes[12].patterns.len(), 1);
    }
}
