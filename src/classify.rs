// SPDX-License-Identifier: Apache-2.0

//! Classification of signatures into groups and NPN classes.
//!
//! Exact signatures are deduplicated by hashing. A new signature is matched
//! against the representatives of existing classes with the same invariants;
//! if none matches it founds a class whose representative is the signature
//! with its relevant pin inputs moved to the front.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::cell::CellKind;
use crate::class::{Builtins, CellClass, CellGroup};
use crate::error::{Result, TechlibError};
use crate::ids::{CellId, ClassId, GroupId};
use crate::logic::TruthTable;
use crate::npn::{matcher, InputMap, NpnMap};
use crate::signature::{SeqPinInfo, Signature};

/// Signatures of the seeded classes: const0, const1, buffer, inverter, then
/// the four flip-flop shapes and the four latch shapes in
// [`crate::class::seq_shape_index`] order.
static BUILTIN_TEMPLATES: Lazy<Vec<Signature>> = Lazy::new(|| {
    let mut v = Vec::with_capacity(12);
    let logic = |f: TruthTable| {
        let n = f.input_count();
        Signature::new(CellKind::Logic, n, 1, vec![f, TruthTable::const0(n)], (0, 0))
    };
    v.push(logic(TruthTable::const0(0)));
    v.push(logic(TruthTable::const1(0)));
    v.push(logic(TruthTable::var(1, 0)));
    v.push(logic(TruthTable::literal(1, 0, true)));
    for kind in [CellKind::FlipFlop, CellKind::Latch] {
        for index in 0..4 {
            v.push(seq_template(kind, index & 1 != 0, index & 2 != 0));
        }
    }
    v
});

/// Simple flip-flop or latch over pins `D, CK[, CLR][, PRE]` with `Q = IQ`.
fn seq_template(kind: CellKind, has_clear: bool, has_preset: bool) -> Signature {
    let pins = 2 + has_clear as usize + has_preset as usize;
    let n = pins + 2;
    let iq = pins;
    let mut next = 2;
    let mut optional = |present: bool| {
        if present {
            let t = TruthTable::var(n, next);
            next += 1;
            t
        } else {
            TruthTable::const0(n)
        }
    };
    let clear = optional(has_clear);
    let preset = optional(has_preset);
    Signature::new(
        kind,
        n,
        1,
        vec![
            TruthTable::var(n, iq),
            TruthTable::const0(n),
            TruthTable::var(n, 0),
            TruthTable::var(n, 1),
            TruthTable::const0(n),
            clear,
            preset,
        ],
        (0, 0),
    )
}

pub(crate) fn builtin_logic_template(index: usize) -> &'static Signature {
    &BUILTIN_TEMPLATES[index]
}

pub(crate) fn builtin_seq_template(kind: CellKind, shape: usize) -> &'static Signature {
    match kind {
        CellKind::Latch => &BUILTIN_TEMPLATES[8 + shape],
        _ => &BUILTIN_TEMPLATES[4 + shape],
    }
}

/// Invariants that NPN-equivalent signatures share.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClassKey {
    kind: CellKind,
    input_count: usize,
    output_count: usize,
    tie_break: (u8, u8),
    weights: Vec<usize>,
}

impl ClassKey {
    fn of(sig: &Signature) -> Self {
        let full = 1usize << sig.input_count();
        let exact = sig.input_count() <= 1;
        let weights = sig
            .tables()
            .iter()
            .enumerate()
            .map(|(t, table)| {
                let w = table.count_ones();
                if sig.flippable(t) && !exact {
                    std::cmp::min(w, full - w)
                } else {
                    w
                }
            })
            .collect();
        ClassKey {
            kind: sig.kind(),
            input_count: sig.input_count(),
            output_count: sig.output_count(),
            tie_break: sig.tie_break(),
            weights,
        }
    }
}

pub(crate) struct Classifier {
    groups: Vec<CellGroup>,
    classes: Vec<CellClass>,
    exact: HashMap<Signature, GroupId>,
    by_key: HashMap<ClassKey, Vec<ClassId>>,
    builtins: Builtins,
    max_automorphisms: usize,
}

impl Classifier {
    /// Creates a classifier with the built-in classes already seeded.
    pub(crate) fn new(max_automorphisms: usize) -> Result<Self> {
        let mut c = Classifier {
            groups: Vec::new(),
            classes: Vec::new(),
            exact: HashMap::new(),
            by_key: HashMap::new(),
            builtins: Builtins {
                logic_groups: [GroupId(0); 4],
                ff_classes: [ClassId(0); 4],
                latch_classes: [ClassId(0); 4],
            },
            max_automorphisms,
        };
        for (i, template) in BUILTIN_TEMPLATES.iter().enumerate() {
            let g = c.find_group(template)?;
            let class_id = c.groups[g.index()].class_id;
            match i {
                0..=3 => c.builtins.logic_groups[i] = g,
                4..=7 => c.builtins.ff_classes[i - 4] = class_id,
                _ => c.builtins.latch_classes[i - 8] = class_id,
            }
        }
        if c.classes.len() != BUILTIN_TEMPLATES.len() {
            return Err(TechlibError::internal(format!(
                "built-in templates produced {} classes",
                c.classes.len()
            )));
        }
        Ok(c)
    }

    pub(crate) fn groups(&self) -> &[CellGroup] {
        &self.groups
    }

    pub(crate) fn classes(&self) -> &[CellClass] {
        &self.classes
    }

    pub(crate) fn builtins(&self) -> Builtins {
        self.builtins
    }

    /// Returns the group of `sig`, creating the group and if needed its class.
    pub(crate) fn find_group(&mut self, sig: &Signature) -> Result<GroupId> {
        if let Some(&g) = self.exact.get(sig) {
            return Ok(g);
        }
        let key = ClassKey::of(sig);
        let found = self.by_key.get(&key).and_then(|candidates| {
            candidates.iter().find_map(|&cid| {
                matcher::find_map(&self.classes[cid.index()].repr, sig).map(|m| (cid, m))
            })
        });
        match found {
            Some((cid, map)) => self.new_group(cid, map, sig),
            None => self.new_class(sig, key),
        }
    }

    pub(crate) fn add_cell(&mut self, group: GroupId, cell: CellId) {
        self.groups[group.index()].cells.push(cell);
    }

    pub(crate) fn into_parts(self) -> (Vec<CellGroup>, Vec<CellClass>, Builtins) {
        (self.groups, self.classes, self.builtins)
    }

    fn new_class(&mut self, sig: &Signature, key: ClassKey) -> Result<GroupId> {
        let n = sig.input_count();
        let pins = sig.pin_input_count();
        let support = sig.support();
        let mut imap = vec![InputMap { dst: 0, inv: false }; n];
        let mut next = 0u32;
        for &v in support.iter().filter(|&&v| v < pins) {
            imap[v] = InputMap { dst: next, inv: false };
            next += 1;
        }
        for v in (0..pins).filter(|v| !support.contains(v)) {
            imap[v] = InputMap { dst: next, inv: false };
            next += 1;
        }
        for (v, m) in imap.iter_mut().enumerate().skip(pins) {
            *m = InputMap {
                dst: v as u32,
                inv: false,
            };
        }
        let compact = NpnMap::from_parts(imap, vec![false; sig.output_count()]);
        let repr = sig.apply(&compact);
        let automorphisms = matcher::automorphisms(&repr, self.max_automorphisms);
        if automorphisms.len() == self.max_automorphisms {
            log::warn!(
                "class of {:?} reached the automorphism limit of {}",
                repr,
                self.max_automorphisms
            );
        }

        let cid = ClassId::from_index(self.classes.len());
        log::debug!(
            "new {} repr={:?} automorphisms={}",
            cid,
            repr,
            automorphisms.len()
        );
        self.classes.push(CellClass {
            id: cid,
            repr,
            automorphisms,
            groups: Vec::new(),
            patterns: Vec::new(),
        });
        self.by_key.entry(key).or_default().push(cid);
        self.new_group(cid, compact.inverse(), sig)
    }

    fn new_group(&mut self, cid: ClassId, map: NpnMap, sig: &Signature) -> Result<GroupId> {
        let class = &self.classes[cid.index()];
        if map.input_count() != sig.input_count() || map.output_count() != sig.output_count() {
            return Err(TechlibError::internal(format!(
                "map {} does not fit signature {:?}",
                map, sig
            )));
        }
        if class.repr.apply(&map) != *sig {
            return Err(TechlibError::internal(format!(
                "map {} does not take {} to {:?}",
                map, cid, sig
            )));
        }
        let gid = GroupId::from_index(self.groups.len());
        self.groups.push(CellGroup {
            id: gid,
            class_id: cid,
            map,
            signature: sig.clone(),
            cells: Vec::new(),
            seq_pin_info: SeqPinInfo::from_signature(sig),
        });
        self.classes[cid.index()].groups.push(gid);
        self.exact.insert(sig.clone(), gid);
        Ok(gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellBuilder, SeqSpec};
    use crate::class::{seq_shape_index, BUF, CONST0, CONST1, INV};
    use crate::signature::encode;

    fn logic(formula: &str, inputs: &[&str]) -> Signature {
        let mut b = CellBuilder::new("C", 1.0);
        for i in inputs {
            b = b.input(i);
        }
        encode(&b.output("Y", formula).build().unwrap(), 16).unwrap()
    }

    #[test]
    fn test_builtins_are_seeded() {
        let c = Classifier::new(1024).unwrap();
        assert_eq!(c.classes().len(), 12);
        assert_eq!(c.groups().len(), 12);
        let b = c.builtins();
        assert_eq!(b.logic_groups, [GroupId(0), GroupId(1), GroupId(2), GroupId(3)]);
        assert_eq!(b.ff_classes, [ClassId(4), ClassId(5), ClassId(6), ClassId(7)]);
        assert_eq!(
            b.latch_classes,
            [ClassId(8), ClassId(9), ClassId(10), ClassId(11)]
        );
    }

    #[test]
    fn test_constants_and_literals_join_builtins() {
        let mut c = Classifier::new(1024).unwrap();
        let b = c.builtins();
        assert_eq!(c.find_group(&logic("0", &[])).unwrap(), b.logic_groups[CONST0]);
        assert_eq!(c.find_group(&logic("1", &[])).unwrap(), b.logic_groups[CONST1]);
        assert_eq!(c.find_group(&logic("A", &["A"])).unwrap(), b.logic_groups[BUF]);
        assert_eq!(c.find_group(&logic("!A", &["A"])).unwrap(), b.logic_groups[INV]);
    }

    #[test]
    fn test_idempotent_classification() {
        let mut c = Classifier::new(1024).unwrap();
        let s = logic("A * B + C", &["A", "B", "C"]);
        let g1 = c.find_group(&s).unwrap();
        let classes = c.classes().len();
        let g2 = c.find_group(&s).unwrap();
        assert_eq!(g1, g2);
        assert_eq!(c.classes().len(), classes);
        assert_eq!(c.groups().len(), 13);
    }

    #[test]
    fn test_npn_variants_share_a_class() {
        let mut c = Classifier::new(1024).unwrap();
        let g_and = c.find_group(&logic("A * B", &["A", "B"])).unwrap();
        let g_or = c.find_group(&logic("A + B", &["A", "B"])).unwrap();
        let g_nand = c.find_group(&logic("!(A * B)", &["A", "B"])).unwrap();
        let groups = c.groups();
        assert_ne!(g_and, g_or);
        assert_ne!(g_and, g_nand);
        assert_eq!(groups[g_and.index()].class_id, groups[g_or.index()].class_id);
        assert_eq!(groups[g_and.index()].class_id, groups[g_nand.index()].class_id);
        let class = &c.classes()[groups[g_or.index()].class_id.index()];
        for &g in &class.groups {
            let group = &groups[g.index()];
            assert_eq!(class.repr.apply(&group.map), group.signature);
        }
    }

    #[test]
    fn test_representative_is_support_compacted() {
        let mut c = Classifier::new(1024).unwrap();
        // Depends on B and C only.
        let g = c.find_group(&logic("B ^ C", &["A", "B", "C"])).unwrap();
        let class = &c.classes()[c.groups()[g.index()].class_id.index()];
        assert_eq!(class.repr.support(), vec![0, 1]);
    }

    #[test]
    fn test_flip_flop_joins_builtin_class() {
        let mut c = Classifier::new(1024).unwrap();
        let cell = CellBuilder::new("DFFRN", 4.0)
            .input("CK")
            .input("RN")
            .input("D")
            .output("Q", "IQ")
            .flip_flop(SeqSpec::new("D", "CK").with_clear("!RN"))
            .build()
            .unwrap();
        let g = c.find_group(&encode(&cell, 16).unwrap()).unwrap();
        let cid = c.groups()[g.index()].class_id;
        assert_eq!(cid, c.builtins().ff_classes[seq_shape_index(true, false)]);
    }
}
