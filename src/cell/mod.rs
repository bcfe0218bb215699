// SPDX-License-Identifier: Apache-2.0

//! Immutable cell data model.
//!
//! Pin positions follow one convention throughout the crate: input positions
//! are the input pins followed by the inout pins, output positions are the
//! output pins followed by the inout pins. Expression variables use the input
//! positions, plus `IQ = inputs + inouts` and `IQN = IQ + 1` for the state of
//! flip-flops and latches.

pub mod builder;
pub mod pin;
pub mod timing;

pub use builder::{CellBuilder, SeqSpec};
pub use pin::{InputCaps, OutputLimits, Pin, PinDirection};
pub use timing::{Timing, TimingKey, TimingSense, TimingTable};

use crate::logic::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    Logic,
    FlipFlop,
    Latch,
    /// Reserved; stored but never classified.
    Fsm,
}

impl CellKind {
    pub fn tag(self) -> u8 {
        match self {
            CellKind::Logic => 0,
            CellKind::FlipFlop => 1,
            CellKind::Latch => 2,
            CellKind::Fsm => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CellKind::Logic),
            1 => Some(CellKind::FlipFlop),
            2 => Some(CellKind::Latch),
            3 => Some(CellKind::Fsm),
            _ => None,
        }
    }

    pub fn is_sequential(self) -> bool {
        matches!(self, CellKind::FlipFlop | CellKind::Latch)
    }
}

/// State update of a flip-flop or latch. For latches `next_state` is the
/// data input and `clock`/`clock2` are the enables.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqFunction {
    pub next_state: Expr,
    pub clock: Expr,
    pub clock2: Expr,
    pub clear: Expr,
    pub preset: Expr,
    pub clear_preset_var1: u8,
    pub clear_preset_var2: u8,
}

impl SeqFunction {
    pub fn has_clear(&self) -> bool {
        !self.clear.is_zero()
    }

    pub fn has_preset(&self) -> bool {
        !self.preset.is_zero()
    }

    pub(crate) fn exprs(&self) -> [&Expr; 5] {
        [
            &self.next_state,
            &self.clock,
            &self.clock2,
            &self.clear,
            &self.preset,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub(crate) name: String,
    pub(crate) area: f64,
    pub(crate) kind: CellKind,
    pub(crate) inputs: Vec<Pin>,
    pub(crate) outputs: Vec<Pin>,
    pub(crate) inouts: Vec<Pin>,
    pub(crate) internals: Vec<Pin>,
    pub(crate) bus_count: u32,
    pub(crate) bundle_count: u32,
    pub(crate) sequential: Option<SeqFunction>,
    pub(crate) timings: Vec<Timing>,
    pub(crate) timing_table: TimingTable,
}

impl Cell {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn is_logic(&self) -> bool {
        self.kind == CellKind::Logic
    }

    pub fn is_ff(&self) -> bool {
        self.kind == CellKind::FlipFlop
    }

    pub fn is_latch(&self) -> bool {
        self.kind == CellKind::Latch
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn inout_count(&self) -> usize {
        self.inouts.len()
    }

    pub fn internal_count(&self) -> usize {
        self.internals.len()
    }

    /// Inputs plus inouts.
    pub fn input_positions(&self) -> usize {
        self.inputs.len() + self.inouts.len()
    }

    /// Outputs plus inouts.
    pub fn output_positions(&self) -> usize {
        self.outputs.len() + self.inouts.len()
    }

    pub fn bus_count(&self) -> u32 {
        self.bus_count
    }

    pub fn bundle_count(&self) -> u32 {
        self.bundle_count
    }

    pub fn inputs(&self) -> &[Pin] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Pin] {
        &self.outputs
    }

    pub fn inouts(&self) -> &[Pin] {
        &self.inouts
    }

    pub fn internals(&self) -> &[Pin] {
        &self.internals
    }

    /// Pin at input position `pos` (inputs, then inouts).
    pub fn input(&self, pos: usize) -> Option<&Pin> {
        if pos < self.inputs.len() {
            self.inputs.get(pos)
        } else {
            self.inouts.get(pos - self.inputs.len())
        }
    }

    /// Pin at output position `pos` (outputs, then inouts).
    pub fn output(&self, pos: usize) -> Option<&Pin> {
        if pos < self.outputs.len() {
            self.outputs.get(pos)
        } else {
            self.inouts.get(pos - self.outputs.len())
        }
    }

    pub fn pin_by_name(&self, name: &str) -> Option<&Pin> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .chain(self.inouts.iter())
            .chain(self.internals.iter())
            .find(|p| p.name() == name)
    }

    pub fn logic_expr(&self, opos: usize) -> Option<&Expr> {
        self.output(opos).and_then(Pin::function)
    }

    pub fn tristate_expr(&self, opos: usize) -> Option<&Expr> {
        self.output(opos).and_then(Pin::three_state)
    }

    pub fn sequential(&self) -> Option<&SeqFunction> {
        self.sequential.as_ref()
    }

    pub fn timings(&self) -> &[Timing] {
        &self.timings
    }

    pub fn timing(&self, id: u32) -> Option<&Timing> {
        self.timings.get(id as usize)
    }

    pub fn timing_table(&self) -> &TimingTable {
        &self.timing_table
    }

    /// Arc ids registered for `(ipos, opos, sense)`; empty when there are none.
    pub fn timing_ids(&self, ipos: usize, opos: usize, sense: TimingSense) -> &[u32] {
        self.timing_table.get(&TimingKey {
            input: ipos as u32,
            output: opos as u32,
            sense,
        })
    }

    pub fn timing_arcs(
        &self,
        ipos: usize,
        opos: usize,
        sense: TimingSense,
    ) -> impl Iterator<Item = &Timing> + '_ {
        self.timing_ids(ipos, opos, sense)
            .iter()
            .filter_map(move |&id| self.timings.get(id as usize))
    }
}
