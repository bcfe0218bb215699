// SPDX-License-Identifier: Apache-2.0

//! Dense truth tables over a fixed number of input variables.
//!
//! Bit `i` of the table holds the function value for the assignment in which
//! variable `v` takes the value `(i >> v) & 1`, so variable 0 is the least
//! significant position of the assignment index.

use std::fmt;

use bitvec::prelude::*;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TruthTable {
    input_count: usize,
    bits: BitVec<u64, Lsb0>,
}

impl TruthTable {
    pub fn const0(input_count: usize) -> Self {
        TruthTable {
            input_count,
            bits: bitvec![u64, Lsb0; 0; 1usize << input_count],
        }
    }

    pub fn const1(input_count: usize) -> Self {
        TruthTable {
            input_count,
            bits: bitvec![u64, Lsb0; 1; 1usize << input_count],
        }
    }

    /// Builds a table by evaluating `f` on every assignment index.
    pub fn from_fn(input_count: usize, f: impl Fn(usize) -> bool) -> Self {
        let bits: BitVec<u64, Lsb0> = (0..1usize << input_count).map(f).collect();
        TruthTable { input_count, bits }
    }

    /// Projection onto variable `var`.
    pub fn var(input_count: usize, var: usize) -> Self {
        assert!(
            var < input_count,
            "variable {} out of range for {}-input table",
            var,
            input_count
        );
        Self::from_fn(input_count, |i| (i >> var) & 1 == 1)
    }

    pub fn literal(input_count: usize, var: usize, negated: bool) -> Self {
        let t = Self::var(input_count, var);
        if negated { t.complement() } else { t }
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Number of assignments, `2^input_count`.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn get(&self, index: usize) -> bool {
        self.bits[index]
    }

    pub fn set(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    pub fn is_const0(&self) -> bool {
        self.bits.not_any()
    }

    pub fn is_const1(&self) -> bool {
        self.bits.all()
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn complement(&self) -> Self {
        TruthTable {
            input_count: self.input_count,
            bits: !self.bits.clone(),
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        assert_eq!(self.input_count, other.input_count, "input count mismatch");
        TruthTable {
            input_count: self.input_count,
            bits: self.bits.clone() & other.bits.as_bitslice(),
        }
    }

    pub fn or(&self, other: &Self) -> Self {
        assert_eq!(self.input_count, other.input_count, "input count mismatch");
        TruthTable {
            input_count: self.input_count,
            bits: self.bits.clone() | other.bits.as_bitslice(),
        }
    }

    pub fn xor(&self, other: &Self) -> Self {
        assert_eq!(self.input_count, other.input_count, "input count mismatch");
        TruthTable {
            input_count: self.input_count,
            bits: self.bits.clone() ^ other.bits.as_bitslice(),
        }
    }

    /// Shannon cofactor with `var` fixed to `value`. The result keeps the same
    /// input count; `var` becomes a don't-care.
    pub fn cofactor(&self, var: usize, value: bool) -> Self {
        let mask = 1usize << var;
        Self::from_fn(self.input_count, |i| {
            let j = if value { i | mask } else { i & !mask };
            self.get(j)
        })
    }

    pub fn depends_on(&self, var: usize) -> bool {
        let mask = 1usize << var;
        (0..self.len()).any(|i| i & mask == 0 && self.get(i) != self.get(i | mask))
    }

    /// Variables the function actually depends on, ascending.
    pub fn support(&self) -> Vec<usize> {
        (0..self.input_count)
            .filter(|&v| self.depends_on(v))
            .collect()
    }

    pub fn max_support(&self) -> Option<usize> {
        (0..self.input_count).rev().find(|&v| self.depends_on(v))
    }

    /// Restricts the table to its first `input_count` variables. Only
    /// meaningful when the dropped variables are outside the support.
    pub fn shrink(&self, input_count: usize) -> Self {
        assert!(input_count <= self.input_count);
        Self::from_fn(input_count, |i| self.get(i))
    }

    /// Adds don't-care variables above the current ones.
    pub fn extend(&self, input_count: usize) -> Self {
        assert!(input_count >= self.input_count);
        let mask = self.len() - 1;
        Self::from_fn(input_count, |i| self.get(i & mask))
    }

    /// Returns `(var, negated)` when the function is a single literal.
    pub fn as_literal(&self) -> Option<(usize, bool)> {
        let support = self.support();
        if support.len() != 1 {
            return None;
        }
        let var = support[0];
        // With a one-variable support the function is either x or !x.
        Some((var, self.get(0)))
    }

    /// Hexadecimal rendering, most significant assignment first.
    pub fn to_hex(&self) -> String {
        let digits = std::cmp::max(1, self.len() / 4);
        let mut s = String::with_capacity(digits);
        for d in (0..digits).rev() {
            let mut nibble = 0u32;
            for b in 0..4 {
                let i = d * 4 + b;
                if i < self.len() && self.get(i) {
                    nibble |= 1 << b;
                }
            }
            s.push(std::char::from_digit(nibble, 16).unwrap_or('?'));
        }
        s
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TruthTable({}, 0x{})", self.input_count, self.to_hex())
    }
}
