// SPDX-License-Identifier: Apache-2.0

//! NPN maps over an arbitrary number of inputs and outputs.
//!
//! Semantics for transforming a function `f` into `g = apply(map, f)`:
//! - input `i` of `f` is driven by input `imap[i].dst` of `g`, complemented
//!   when `imap[i].inv` is set: `x[i] = y[imap[i].dst] XOR imap[i].inv`;
//! - output `o` of `g` is `f_o(x) XOR opol[o]`.
//!
//! A group's map takes its class's canonical signature to the group's own
//! signature, so `apply(group.map, class.repr) == group.signature`.

use std::fmt;

use crate::logic::TruthTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputMap {
    pub dst: u32,
    pub inv: bool,
}

impl InputMap {
    /// Packed form used by the binary index: `dst << 1 | inv`.
    pub fn pack(self) -> u32 {
        (self.dst << 1) | self.inv as u32
    }

    pub fn unpack(word: u32) -> Self {
        InputMap {
            dst: word >> 1,
            inv: word & 1 != 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpnMap {
    imap: Vec<InputMap>,
    opol: Vec<bool>,
}

impl NpnMap {
    pub fn identity(input_count: usize, output_count: usize) -> Self {
        NpnMap {
            imap: (0..input_count as u32)
                .map(|dst| InputMap { dst, inv: false })
                .collect(),
            opol: vec![false; output_count],
        }
    }

    /// Builds a map from parts, checking that the input part is a permutation.
    pub fn new(imap: Vec<InputMap>, opol: Vec<bool>) -> Result<Self, String> {
        let mut seen = vec![false; imap.len()];
        for (i, m) in imap.iter().enumerate() {
            let dst = m.dst as usize;
            if dst >= imap.len() {
                return Err(format!(
                    "input {} maps to {} but only {} inputs exist",
                    i,
                    dst,
                    imap.len()
                ));
            }
            if seen[dst] {
                return Err(format!("input position {} is targeted twice", dst));
            }
            seen[dst] = true;
        }
        Ok(NpnMap { imap, opol })
    }

    /// Builds a map whose input part is already known to be a permutation.
    pub(crate) fn from_parts(imap: Vec<InputMap>, opol: Vec<bool>) -> Self {
        debug_assert!(NpnMap::new(imap.clone(), opol.clone()).is_ok());
        NpnMap { imap, opol }
    }

    pub fn input_count(&self) -> usize {
        self.imap.len()
    }

    pub fn output_count(&self) -> usize {
        self.opol.len()
    }

    pub fn imap(&self, input: usize) -> InputMap {
        self.imap[input]
    }

    pub fn inputs(&self) -> &[InputMap] {
        &self.imap
    }

    pub fn opol(&self, output: usize) -> bool {
        self.opol[output]
    }

    pub fn outputs(&self) -> &[bool] {
        &self.opol
    }

    pub fn is_identity(&self) -> bool {
        self.imap
            .iter()
            .enumerate()
            .all(|(i, m)| m.dst as usize == i && !m.inv)
            && self.opol.iter().all(|&o| !o)
    }

    /// Returns `inv` such that `apply(inv, apply(self, f)) == f`.
    pub fn inverse(&self) -> NpnMap {
        let mut imap = vec![InputMap { dst: 0, inv: false }; self.imap.len()];
        for (i, m) in self.imap.iter().enumerate() {
            imap[m.dst as usize] = InputMap {
                dst: i as u32,
                inv: m.inv,
            };
        }
        NpnMap {
            imap,
            opol: self.opol.clone(),
        }
    }

    /// Map equivalent to applying `self` first and then `then`.
    pub fn compose(&self, then: &NpnMap) -> NpnMap {
        assert_eq!(self.imap.len(), then.imap.len(), "input count mismatch");
        assert_eq!(self.opol.len(), then.opol.len(), "output count mismatch");
        let imap = self
            .imap
            .iter()
            .map(|a| {
                let b = then.imap[a.dst as usize];
                InputMap {
                    dst: b.dst,
                    inv: a.inv ^ b.inv,
                }
            })
            .collect();
        let opol = self
            .opol
            .iter()
            .zip(then.opol.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        NpnMap { imap, opol }
    }

    /// Transforms one table; `flip` is the output polarity to apply to it.
    pub fn apply_table(&self, f: &TruthTable, flip: bool) -> TruthTable {
        assert_eq!(f.input_count(), self.imap.len(), "input count mismatch");
        TruthTable::from_fn(f.input_count(), |y| {
            let mut x = 0usize;
            for (i, m) in self.imap.iter().enumerate() {
                let bit = ((y >> m.dst) & 1 == 1) ^ m.inv;
                if bit {
                    x |= 1 << i;
                }
            }
            f.get(x) ^ flip
        })
    }
}

impl fmt::Display for NpnMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, m) in self.imap.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}->{}{}", i, if m.inv { "~" } else { "" }, m.dst)?;
        }
        write!(f, " |")?;
        for &o in &self.opol {
            write!(f, " {}", if o { "~" } else { "=" })?;
        }
        write!(f, "]")
    }
}
