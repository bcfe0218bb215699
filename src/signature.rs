// SPDX-License-Identifier: Apache-2.0

//! Encoding of a cell's behaviour as one multi-output truth table.
//!
//! Table layout for a signature with `no` outputs (outputs then inouts):
//! `[logic_0 .. logic_no, tristate_0 .. tristate_no]`, followed for flip-flops
//! and latches by `[next_state, clock, clock2, clear, preset]`. Sequential
//! signatures carry two extra inputs for the state variables `IQ` and `IQN`.

use std::fmt;

use crate::cell::{Cell, CellKind};
use crate::error::{Result, TechlibError};
use crate::logic::{Expr, TruthTable, MAX_EXPR_DEPTH};
use crate::npn::NpnMap;

/// Number of sequential tables appended after the output tables.
pub const SEQ_TABLE_COUNT: usize = 5;

const NEXT_STATE: usize = 0;
const CLOCK: usize = 1;
const CLOCK2: usize = 2;
const CLEAR: usize = 3;
const PRESET: usize = 4;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    kind: CellKind,
    input_count: usize,
    output_count: usize,
    tables: Vec<TruthTable>,
    tie_break: (u8, u8),
}

impl Signature {
    /// Assembles a signature from its tables. Panics on a table count or size
    /// that does not fit the kind and dimensions.
    pub fn new(
        kind: CellKind,
        input_count: usize,
        output_count: usize,
        tables: Vec<TruthTable>,
        tie_break: (u8, u8),
    ) -> Self {
        let expected = 2 * output_count + if kind.is_sequential() { SEQ_TABLE_COUNT } else { 0 };
        assert_eq!(tables.len(), expected, "table count mismatch");
        assert!(
            tables.iter().all(|t| t.input_count() == input_count),
            "table input count mismatch"
        );
        Signature {
            kind,
            input_count,
            output_count,
            tables,
            tie_break,
        }
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn is_sequential(&self) -> bool {
        self.kind.is_sequential()
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Inputs that stand for cell pins, excluding the state variables.
    pub fn pin_input_count(&self) -> usize {
        if self.is_sequential() {
            self.input_count - 2
        } else {
            self.input_count
        }
    }

    pub fn tables(&self) -> &[TruthTable] {
        &self.tables
    }

    pub fn tie_break(&self) -> (u8, u8) {
        self.tie_break
    }

    pub fn logic(&self, opos: usize) -> &TruthTable {
        &self.tables[opos]
    }

    pub fn tristate(&self, opos: usize) -> &TruthTable {
        &self.tables[self.output_count + opos]
    }

    fn seq_table(&self, which: usize) -> Option<&TruthTable> {
        if self.is_sequential() {
            self.tables.get(2 * self.output_count + which)
        } else {
            None
        }
    }

    pub fn next_state(&self) -> Option<&TruthTable> {
        self.seq_table(NEXT_STATE)
    }

    pub fn clock(&self) -> Option<&TruthTable> {
        self.seq_table(CLOCK)
    }

    pub fn clock2(&self) -> Option<&TruthTable> {
        self.seq_table(CLOCK2)
    }

    pub fn clear(&self) -> Option<&TruthTable> {
        self.seq_table(CLEAR)
    }

    pub fn preset(&self) -> Option<&TruthTable> {
        self.seq_table(PRESET)
    }

    /// Whether table `t` may have its output polarity flipped by an NPN map.
    /// Only the logic outputs of combinational cells qualify.
    pub fn flippable(&self, t: usize) -> bool {
        !self.is_sequential() && t < self.output_count
    }

    /// Union of the supports of every table.
    pub fn support(&self) -> Vec<usize> {
        (0..self.input_count)
            .filter(|&v| self.tables.iter().any(|t| t.depends_on(v)))
            .collect()
    }

    /// True when every tristate table is constant 0.
    pub fn has_no_tristate(&self) -> bool {
        (0..self.output_count).all(|o| self.tristate(o).is_const0())
    }

    /// Applies `map`; `map.output_count()` must equal `output_count`.
    pub fn apply(&self, map: &NpnMap) -> Signature {
        assert_eq!(map.input_count(), self.input_count, "map input count mismatch");
        assert_eq!(map.output_count(), self.output_count, "map output count mismatch");
        let tables = self
            .tables
            .iter()
            .enumerate()
            .map(|(t, table)| {
                let flip = self.flippable(t) && map.opol(t);
                map.apply_table(table, flip)
            })
            .collect();
        Signature {
            kind: self.kind,
            input_count: self.input_count,
            output_count: self.output_count,
            tables,
            tie_break: self.tie_break,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signature({:?}, ni={}, no={}, [",
            self.kind, self.input_count, self.output_count
        )?;
        for (i, t) in self.tables.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "], tie={:?})", self.tie_break)
    }
}

fn table_of(cell: &Cell, expr: Option<&Expr>, input_count: usize) -> Result<TruthTable> {
    match expr {
        None => Ok(TruthTable::const0(input_count)),
        Some(e) => e
            .to_truth_table(input_count)
            .map_err(|reason| TechlibError::malformed(cell.name(), reason)),
    }
}

/// Rejects a cell carrying an expression nested deeper than the binary index
/// can hold.
pub(crate) fn check_expr_depth(cell: &Cell) -> Result<()> {
    let outputs = (0..cell.output_positions())
        .flat_map(|o| [cell.logic_expr(o), cell.tristate_expr(o)])
        .flatten();
    let seq = cell.sequential().into_iter().flat_map(|s| s.exprs());
    for e in outputs.chain(seq) {
        let depth = e.depth();
        if depth > MAX_EXPR_DEPTH {
            return Err(TechlibError::malformed(
                cell.name(),
                format!(
                    "expression nesting {} exceeds the limit of {}",
                    depth, MAX_EXPR_DEPTH
                ),
            ));
        }
    }
    Ok(())
}

/// Encodes `cell` into its signature. Fails when an expression is nested too
/// deeply or references a variable outside the declared pins, when a
/// flip-flop or latch lacks its sequential function, when a timing arc
/// references a missing pin, or when the signature would exceed `max_inputs`
/// inputs.
pub fn encode(cell: &Cell, max_inputs: usize) -> Result<Signature> {
    let kind = cell.kind();
    if kind == CellKind::Fsm {
        return Err(TechlibError::malformed(
            cell.name(),
            "FSM cells have no signature",
        ));
    }
    check_expr_depth(cell)?;
    let seq = if kind.is_sequential() {
        match cell.sequential() {
            Some(seq) => Some(seq),
            None => {
                return Err(TechlibError::malformed(
                    cell.name(),
                    "sequential cell without a sequential function",
                ))
            }
        }
    } else {
        None
    };
    let input_count = cell.input_positions() + if seq.is_some() { 2 } else { 0 };
    if input_count > max_inputs {
        return Err(TechlibError::malformed(
            cell.name(),
            format!("{} inputs exceed the limit of {}", input_count, max_inputs),
        ));
    }
    let output_count = cell.output_positions();
    for key in cell.timing_table().keys() {
        if key.input as usize >= cell.input_positions() || key.output as usize >= output_count {
            return Err(TechlibError::malformed(
                cell.name(),
                format!(
                    "timing arc ({}, {}) references a missing pin",
                    key.input, key.output
                ),
            ));
        }
    }

    let mut tables = Vec::with_capacity(2 * output_count + SEQ_TABLE_COUNT);
    for o in 0..output_count {
        tables.push(table_of(cell, cell.logic_expr(o), input_count)?);
    }
    for o in 0..output_count {
        tables.push(table_of(cell, cell.tristate_expr(o), input_count)?);
    }
    let mut tie_break = (0, 0);
    if let Some(seq) = seq {
        for e in seq.exprs() {
            tables.push(table_of(cell, Some(e), input_count)?);
        }
        tie_break = (seq.clear_preset_var1, seq.clear_preset_var2);
    }
    Ok(Signature {
        kind,
        input_count,
        output_count,
        tables,
        tie_break,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Positive,
    Negative,
}

/// Packed positions and senses of the special pins of a flip-flop or latch
/// group.
///
/// | bits  | field                                        |
/// |-------|----------------------------------------------|
/// | 0-4   | data pin position (31 = absent)              |
/// | 5-9   | clock / enable pin position                  |
/// | 10-11 | clock sense (0 none, 1 positive, 2 negative) |
/// | 12-16 | clear pin position                           |
/// | 17-18 | clear sense                                  |
/// | 19-23 | preset pin position                          |
/// | 24-25 | preset sense                                 |
/// | 26-30 | Q output position (31 = absent)              |
/// | 31    | Q is driven by `IQN`                         |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqPinInfo(pub u32);

const ABSENT: u32 = 31;

impl SeqPinInfo {
    pub fn from_signature(sig: &Signature) -> Option<SeqPinInfo> {
        if !sig.is_sequential() {
            return None;
        }
        let pins = sig.pin_input_count();
        let literal = |t: Option<&TruthTable>| -> Option<(u32, Sense)> {
            let (var, negated) = t?.as_literal()?;
            if var >= pins {
                return None;
            }
            let sense = if negated { Sense::Negative } else { Sense::Positive };
            Some((var as u32, sense))
        };
        let sensed = |v: Option<(u32, Sense)>| -> u32 {
            match v {
                None => ABSENT,
                Some((pos, Sense::Positive)) => pos | (1 << 5),
                Some((pos, Sense::Negative)) => pos | (2 << 5),
            }
        };

        let data = match literal(sig.next_state()) {
            Some((pos, Sense::Positive)) => pos,
            _ => ABSENT,
        };
        let iq = pins;
        let mut q = ABSENT;
        let mut q_inv = 0;
        for o in 0..sig.output_count() {
            if let Some((var, negated)) = sig.logic(o).as_literal() {
                if var == iq || var == iq + 1 {
                    q = o as u32;
                    // Q driven by IQN or by !IQ both read the inverted state.
                    q_inv = ((var == iq + 1) ^ negated) as u32;
                    break;
                }
            }
        }
        let mut word = data;
        word |= sensed(literal(sig.clock())) << 5;
        word |= sensed(literal(sig.clear())) << 12;
        word |= sensed(literal(sig.preset())) << 19;
        word |= q << 26;
        word |= q_inv << 31;
        Some(SeqPinInfo(word))
    }

    fn field(self, shift: u32) -> Option<(u32, Sense)> {
        let pos = (self.0 >> shift) & 0x1f;
        match (self.0 >> (shift + 5)) & 0x3 {
            1 => Some((pos, Sense::Positive)),
            2 => Some((pos, Sense::Negative)),
            _ => None,
        }
    }

    pub fn data_pos(self) -> Option<u32> {
        let pos = self.0 & 0x1f;
        if pos == ABSENT { None } else { Some(pos) }
    }

    pub fn clock(self) -> Option<(u32, Sense)> {
        self.field(5)
    }

    pub fn clear(self) -> Option<(u32, Sense)> {
        self.field(12)
    }

    pub fn preset(self) -> Option<(u32, Sense)> {
        self.field(19)
    }

    pub fn q_pos(self) -> Option<u32> {
        let pos = (self.0 >> 26) & 0x1f;
        if pos == ABSENT { None } else { Some(pos) }
    }

    pub fn q_inverted(self) -> bool {
        self.0 >> 31 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellBuilder, SeqSpec, Timing, TimingSense};
    use crate::npn::InputMap;

    #[test]
    fn test_encode_and2() {
        let cell = CellBuilder::new("AND2", 1.0)
            .input("A")
            .input("B")
            .output("Y", "A * B")
            .build()
            .unwrap();
        let sig = encode(&cell, 16).unwrap();
        assert_eq!(sig.input_count(), 2);
        assert_eq!(sig.output_count(), 1);
        assert_eq!(sig.tables().len(), 2);
        assert_eq!(sig.logic(0).to_hex(), "8");
        assert!(sig.tristate(0).is_const0());
        assert!(sig.flippable(0));
        assert!(!sig.flippable(1));
    }

    #[test]
    fn test_encode_flip_flop_adds_state_inputs() {
        let cell = CellBuilder::new("DFF", 3.0)
            .input("D")
            .input("CK")
            .output("Q", "IQ")
            .flip_flop(SeqSpec::new("D", "CK"))
            .build()
            .unwrap();
        let sig = encode(&cell, 16).unwrap();
        assert_eq!(sig.input_count(), 4);
        assert_eq!(sig.tables().len(), 2 + SEQ_TABLE_COUNT);
        assert_eq!(sig.next_state(), Some(&TruthTable::var(4, 0)));
        assert_eq!(sig.clock(), Some(&TruthTable::var(4, 1)));
        assert!(sig.clear().unwrap().is_const0());
        assert!(!sig.flippable(0));
    }

    #[test]
    fn test_out_of_range_variable_is_malformed() {
        let cell = CellBuilder::new("BAD", 1.0)
            .input("A")
            .output_expr("Y", Some(Expr::posi_literal(3)), None)
            .build()
            .unwrap();
        match encode(&cell, 16) {
            Err(TechlibError::MalformedSignature { cell, reason }) => {
                assert_eq!(cell, "BAD");
                assert!(reason.contains("out of range"), "{}", reason);
            }
            other => panic!("expected MalformedSignature, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_sequential_function_is_malformed() {
        let cell = CellBuilder::new("NOSEQ", 1.0)
            .input("D")
            .output("Q", "D")
            .kind(CellKind::FlipFlop)
            .build()
            .unwrap();
        assert!(matches!(
            encode(&cell, 16),
            Err(TechlibError::MalformedSignature { .. })
        ));
    }

    fn nested(levels: usize) -> Expr {
        let mut e = Expr::posi_literal(0);
        for _ in 0..levels {
            e = Expr::And(vec![e]);
        }
        e
    }

    #[test]
    fn test_deep_expression_is_malformed() {
        let deep = CellBuilder::new("DEEP", 1.0)
            .input("A")
            .output_expr("Y", Some(nested(MAX_EXPR_DEPTH + 1)), None)
            .build()
            .unwrap();
        match encode(&deep, 16) {
            Err(TechlibError::MalformedSignature { reason, .. }) => {
                assert!(reason.contains("nesting"), "{}", reason)
            }
            other => panic!("expected MalformedSignature, got {:?}", other),
        }
        let limit = CellBuilder::new("LIMIT", 1.0)
            .input("A")
            .output_expr("Y", Some(nested(MAX_EXPR_DEPTH)), None)
            .build()
            .unwrap();
        assert_eq!(encode(&limit, 16).unwrap().logic(0), &TruthTable::var(1, 0));
    }

    #[test]
    fn test_input_limit() {
        let mut b = CellBuilder::new("WIDE", 1.0);
        for i in 0..5 {
            b = b.input(&format!("I{}", i));
        }
        let cell = b.output("Y", "I0").build().unwrap();
        assert!(encode(&cell, 4).is_err());
        assert!(encode(&cell, 5).is_ok());
    }

    #[test]
    fn test_timing_pin_out_of_range() {
        let mut cell = CellBuilder::new("INV", 1.0)
            .input("A")
            .output("Y", "!A")
            .timing("A", "Y", &[TimingSense::NegativeUnate], Timing::default())
            .build()
            .unwrap();
        assert!(encode(&cell, 16).is_ok());
        cell.timing_table.insert(
            crate::cell::TimingKey {
                input: 4,
                output: 0,
                sense: TimingSense::PositiveUnate,
            },
            0,
        );
        assert!(encode(&cell, 16).is_err());
    }

    #[test]
    fn test_apply_only_flips_logic_outputs() {
        let cell = CellBuilder::new("TBUF", 1.0)
            .input("A")
            .input("EN")
            .output_with("Y", Some("A"), Some("!EN"), Default::default())
            .build()
            .unwrap();
        let sig = encode(&cell, 16).unwrap();
        let map = NpnMap::new(
            vec![InputMap { dst: 0, inv: false }, InputMap { dst: 1, inv: false }],
            vec![true],
        )
        .unwrap();
        let g = sig.apply(&map);
        assert_eq!(g.logic(0), &sig.logic(0).complement());
        assert_eq!(g.tristate(0), sig.tristate(0));
    }

    #[test]
    fn test_seq_pin_info() {
        let cell = CellBuilder::new("DFFRN", 4.0)
            .input("D")
            .input("CK")
            .input("RN")
            .output("QN", "IQN")
            .flip_flop(SeqSpec::new("D", "!CK").with_clear("!RN"))
            .build()
            .unwrap();
        let sig = encode(&cell, 16).unwrap();
        let info = SeqPinInfo::from_signature(&sig).unwrap();
        assert_eq!(info.data_pos(), Some(0));
        assert_eq!(info.clock(), Some((1, Sense::Negative)));
        assert_eq!(info.clear(), Some((2, Sense::Negative)));
        assert_eq!(info.preset(), None);
        assert_eq!(info.q_pos(), Some(0));
        assert!(info.q_inverted());
    }
}
