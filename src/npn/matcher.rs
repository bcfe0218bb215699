// SPDX-License-Identifier: Apache-2.0

//! Search for NPN maps between two signatures of equal shape.
//!
//! The search assigns source inputs to destination inputs in ascending order,
//! trying destination positions in ascending order and the positive polarity
//! first, so the first map found is deterministic. Partial assignments are
//! pruned with single- and pairwise-cofactor weights; complete assignments
//! are confirmed by applying the map.
//!
//! Signatures with at most one input only match themselves under the
//! identity. State variables of sequential signatures stay in place and
//! sequential signatures never flip output polarity.

use crate::npn::{InputMap, NpnMap};
use crate::signature::Signature;

/// First map `m` with `src.apply(m) == dst`.
pub fn find_map(src: &Signature, dst: &Signature) -> Option<NpnMap> {
    let mut found = None;
    search(src, dst, None, &mut |m| {
        found = Some(m);
        false
    });
    found
}

/// Some automorphism of `sig` that sends pin input `from` to pin input `to`.
/// Unlike [`automorphisms`] this is never cut short by a cap, so orbits
/// computed from it are exact.
pub fn automorphism_moving(sig: &Signature, from: usize, to: usize) -> Option<NpnMap> {
    if from >= sig.pin_input_count() || to >= sig.pin_input_count() {
        return None;
    }
    let mut found = None;
    search(sig, sig, Some((from, to)), &mut |m| {
        found = Some(m);
        false
    });
    found
}

/// Non-identity maps taking `sig` to itself, at most `limit` of them.
pub fn automorphisms(sig: &Signature, limit: usize) -> Vec<NpnMap> {
    let mut out = Vec::new();
    if limit == 0 {
        return out;
    }
    search(sig, sig, None, &mut |m| {
        if !m.is_identity() {
            out.push(m);
        }
        out.len() < limit
    });
    out
}

fn same_shape(a: &Signature, b: &Signature) -> bool {
    a.kind() == b.kind()
        && a.input_count() == b.input_count()
        && a.output_count() == b.output_count()
        && a.tie_break() == b.tie_break()
        && a.tables().len() == b.tables().len()
}

/// Calls `visit` on every map from `src` to `dst` until it returns false.
/// `forced` restricts one source input to a single destination input.
fn search(
    src: &Signature,
    dst: &Signature,
    forced: Option<(usize, usize)>,
    visit: &mut dyn FnMut(NpnMap) -> bool,
) {
    if !same_shape(src, dst) {
        return;
    }
    let n = src.input_count();
    if n <= 1 {
        if src == dst && forced.map_or(true, |(i, j)| i == j) {
            visit(NpnMap::identity(n, src.output_count()));
        }
        return;
    }
    let flip_sets = match output_flip_candidates(src, dst) {
        Some(f) => f,
        None => return,
    };
    let ws = PairWeights::new(src);
    let wd = PairWeights::new(dst);
    for oflip in &flip_sets {
        let mut s = Search {
            src,
            dst,
            ws: &ws,
            wd: &wd,
            oflip,
            assign: vec![None; n],
            used: vec![false; n],
            pins: src.pin_input_count(),
            forced,
        };
        if !s.run(visit) {
            return;
        }
    }
}

/// Per-table output flips compatible with the table weights, with every
/// undetermined (half-weight) logic table tried both ways.
fn output_flip_candidates(src: &Signature, dst: &Signature) -> Option<Vec<Vec<bool>>> {
    let full = 1usize << src.input_count();
    let mut fixed = vec![false; src.tables().len()];
    let mut free = Vec::new();
    for (t, (a, b)) in src.tables().iter().zip(dst.tables()).enumerate() {
        let wa = a.count_ones();
        let wb = b.count_ones();
        if src.flippable(t) {
            if wa == wb {
                if 2 * wa == full {
                    free.push(t);
                }
            } else if wa == full - wb {
                fixed[t] = true;
            } else {
                return None;
            }
        } else if wa != wb {
            return None;
        }
    }
    let mut out = Vec::with_capacity(1 << free.len());
    for mask in 0..(1usize << free.len()) {
        let mut f = fixed.clone();
        for (k, &t) in free.iter().enumerate() {
            if (mask >> k) & 1 == 1 {
                f[t] = true;
            }
        }
        out.push(f);
    }
    Some(out)
}

/// For every table, the number of ones under each joint value of every pair
/// of inputs. The diagonal `(a, a)` holds single-input cofactor weights.
struct PairWeights {
    n: usize,
    tables: Vec<Vec<u32>>,
}

impl PairWeights {
    fn new(sig: &Signature) -> Self {
        let n = sig.input_count();
        let tables = sig
            .tables()
            .iter()
            .map(|t| {
                let mut w = vec![0u32; n * n * 4];
                for idx in 0..t.len() {
                    if !t.get(idx) {
                        continue;
                    }
                    for a in 0..n {
                        let va = (idx >> a) & 1;
                        for b in 0..n {
                            let vb = (idx >> b) & 1;
                            w[(a * n + b) * 4 + va * 2 + vb] += 1;
                        }
                    }
                }
                w
            })
            .collect();
        PairWeights { n, tables }
    }

    fn get(&self, t: usize, a: usize, b: usize, va: usize, vb: usize) -> u32 {
        self.tables[t][(a * self.n + b) * 4 + va * 2 + vb]
    }
}

struct Search<'a> {
    src: &'a Signature,
    dst: &'a Signature,
    ws: &'a PairWeights,
    wd: &'a PairWeights,
    oflip: &'a [bool],
    assign: Vec<Option<InputMap>>,
    used: Vec<bool>,
    pins: usize,
    forced: Option<(usize, usize)>,
}

impl<'a> Search<'a> {
    /// Returns false once `visit` asks to stop.
    fn run(&mut self, visit: &mut dyn FnMut(NpnMap) -> bool) -> bool {
        for v in self.pins..self.src.input_count() {
            if !self.consistent(v, v, false) {
                return true;
            }
            self.assign[v] = Some(InputMap {
                dst: v as u32,
                inv: false,
            });
            self.used[v] = true;
        }
        self.extend(0, visit)
    }

    fn extend(&mut self, i: usize, visit: &mut dyn FnMut(NpnMap) -> bool) -> bool {
        if i == self.pins {
            return self.leaf(visit);
        }
        for j in 0..self.pins {
            if self.used[j] || self.forced.map_or(false, |(fi, fj)| fi == i && fj != j) {
                continue;
            }
            for inv in [false, true] {
                if !self.consistent(i, j, inv) {
                    continue;
                }
                self.assign[i] = Some(InputMap { dst: j as u32, inv });
                self.used[j] = true;
                let keep_going = self.extend(i + 1, visit);
                self.assign[i] = None;
                self.used[j] = false;
                if !keep_going {
                    return false;
                }
            }
        }
        true
    }

    fn leaf(&self, visit: &mut dyn FnMut(NpnMap) -> bool) -> bool {
        let imap: Vec<InputMap> = self.assign.iter().flatten().copied().collect();
        let opol = self.oflip[..self.src.output_count()].to_vec();
        let map = NpnMap::from_parts(imap, opol);
        if self.src.apply(&map) == *self.dst {
            visit(map)
        } else {
            true
        }
    }

    /// Whether mapping source input `i` to destination `j` with polarity `p`
    /// agrees with the weights of every assignment made so far.
    fn consistent(&self, i: usize, j: usize, p: bool) -> bool {
        let n = self.src.input_count();
        let half = 1u32 << (n - 1);
        let quarter = 1u32 << (n - 2);
        let p = p as usize;
        for (t, &flip) in self.oflip.iter().enumerate() {
            for v in 0..2 {
                let mut ws = self.ws.get(t, i, i, v, v);
                if flip {
                    ws = half - ws;
                }
                if ws != self.wd.get(t, j, j, v ^ p, v ^ p) {
                    return false;
                }
            }
            for (k, m) in self.assign.iter().enumerate() {
                let m = match m {
                    Some(m) => m,
                    None => continue,
                };
                let l = m.dst as usize;
                let q = m.inv as usize;
                for va in 0..2 {
                    for vb in 0..2 {
                        let mut ws = self.ws.get(t, i, k, va, vb);
                        if flip {
                            ws = quarter - ws;
                        }
                        if ws != self.wd.get(t, j, l, va ^ p, vb ^ q) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;
    use crate::signature::encode;

    fn sig(formula: &str, inputs: &[&str]) -> Signature {
        let mut b = CellBuilder::new("C", 1.0);
        for i in inputs {
            b = b.input(i);
        }
        encode(&b.output("Y", formula).build().unwrap(), 16).unwrap()
    }

    #[test]
    fn test_and_matches_nor_with_flips() {
        let and2 = sig("A * B", &["A", "B"]);
        let nor2 = sig("!(A + B)", &["A", "B"]);
        let m = find_map(&and2, &nor2).unwrap();
        assert_eq!(and2.apply(&m), nor2);
        assert!(m.inputs().iter().all(|i| i.inv));
        assert!(!m.opol(0));
    }

    #[test]
    fn test_nand_needs_output_flip() {
        let and2 = sig("A * B", &["A", "B"]);
        let nand2 = sig("!(A * B)", &["A", "B"]);
        let m = find_map(&and2, &nand2).unwrap();
        assert!(m.opol(0));
        assert_eq!(and2.apply(&m), nand2);
    }

    #[test]
    fn test_permutation_found() {
        let f = sig("A * (B + C)", &["A", "B", "C"]);
        let g = sig("C * (A + B)", &["A", "B", "C"]);
        let m = find_map(&f, &g).unwrap();
        assert_eq!(f.apply(&m), g);
        assert_eq!(m.imap(0).dst, 2);
    }

    #[test]
    fn test_and_and_xor_do_not_match() {
        let and2 = sig("A * B", &["A", "B"]);
        let xor2 = sig("A ^ B", &["A", "B"]);
        assert!(find_map(&and2, &xor2).is_none());
    }

    #[test]
    fn test_single_input_identity_only() {
        let buf = sig("A", &["A"]);
        let inv = sig("!A", &["A"]);
        assert!(find_map(&buf, &inv).is_none());
        assert!(find_map(&buf, &buf).unwrap().is_identity());
        assert!(automorphisms(&inv, 100).is_empty());
    }

    #[test]
    fn test_automorphisms_of_and3() {
        let and3 = sig("A * B * C", &["A", "B", "C"]);
        let autos = automorphisms(&and3, 1000);
        // 3! permutations minus the identity.
        assert_eq!(autos.len(), 5);
        for a in &autos {
            assert_eq!(and3.apply(a), and3);
        }
    }

    #[test]
    fn test_automorphisms_of_xor2() {
        let xor2 = sig("A ^ B", &["A", "B"]);
        let autos = automorphisms(&xor2, 1000);
        // 2 permutations x 4 input polarities x 2 output polarities, of which
        // the odd input-negation counts need an output flip: 8 maps total.
        assert_eq!(autos.len(), 7);
        let mut sorted = autos.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), autos.len());
    }

    #[test]
    fn test_automorphism_moving() {
        let f = sig("A * (B + C)", &["A", "B", "C"]);
        let m = automorphism_moving(&f, 1, 2).unwrap();
        assert_eq!(m.imap(1).dst, 2);
        assert_eq!(f.apply(&m), f);
        assert!(automorphism_moving(&f, 0, 1).is_none());
        assert!(automorphism_moving(&f, 0, 3).is_none());
    }

    #[test]
    fn test_automorphism_moving_beyond_the_cap() {
        let names = ["A", "B", "C", "D", "E", "F"];
        let and6 = sig("A * B * C * D * E * F", &names);
        // A small cap only records maps that keep input 0 in place.
        assert!(automorphisms(&and6, 8).iter().all(|m| m.imap(0).dst == 0));
        let m = automorphism_moving(&and6, 0, 5).unwrap();
        assert_eq!(m.imap(0).dst, 5);
        assert_eq!(and6.apply(&m), and6);
    }

    #[test]
    fn test_automorphism_limit() {
        let and3 = sig("A * B * C", &["A", "B", "C"]);
        assert_eq!(automorphisms(&and3, 2).len(), 2);
    }
}
