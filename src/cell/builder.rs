// SPDX-License-Identifier: Apache-2.0

//! Construction of [`Cell`] values from pin names and formula strings.
//!
//! Library readers hand over either formula text (parsed against the cell's
//! pin names at `build()` time) or already-built expressions.

use std::collections::HashMap;

use crate::cell::{
    Cell, CellKind, InputCaps, OutputLimits, Pin, SeqFunction, Timing, TimingKey, TimingSense,
    TimingTable,
};
use crate::logic::Expr;

/// Sequential behaviour described with formula text, as in a Liberty `ff` or
/// `latch` group.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqSpec {
    pub var1: String,
    pub var2: String,
    pub next_state: String,
    pub clock: String,
    pub clock2: Option<String>,
    pub clear: Option<String>,
    pub preset: Option<String>,
    pub clear_preset_var1: u8,
    pub clear_preset_var2: u8,
}

impl SeqSpec {
    pub fn new(next_state: &str, clock: &str) -> Self {
        SeqSpec {
            var1: "IQ".to_string(),
            var2: "IQN".to_string(),
            next_state: next_state.to_string(),
            clock: clock.to_string(),
            clock2: None,
            clear: None,
            preset: None,
            clear_preset_var1: 0,
            clear_preset_var2: 0,
        }
    }

    pub fn with_clear(mut self, clear: &str) -> Self {
        self.clear = Some(clear.to_string());
        self
    }

    pub fn with_preset(mut self, preset: &str) -> Self {
        self.preset = Some(preset.to_string());
        self
    }

    pub fn with_clock2(mut self, clock2: &str) -> Self {
        self.clock2 = Some(clock2.to_string());
        self
    }

    pub fn with_clear_preset_vars(mut self, var1: u8, var2: u8) -> Self {
        self.clear_preset_var1 = var1;
        self.clear_preset_var2 = var2;
        self
    }
}

#[derive(Debug, Clone)]
enum Formula {
    Text(String),
    Parsed(Expr),
}

#[derive(Debug, Clone)]
struct PendingOutput {
    name: String,
    caps: Option<InputCaps>,
    function: Option<Formula>,
    three_state: Option<Formula>,
    limits: OutputLimits,
}

#[derive(Debug, Clone)]
enum PendingSeq {
    Spec(SeqSpec),
    Exprs(SeqFunction),
}

#[derive(Debug, Clone)]
struct PendingTiming {
    input: String,
    output: String,
    senses: Vec<TimingSense>,
    timing: Timing,
}

#[derive(Debug, Clone)]
pub struct CellBuilder {
    name: String,
    area: f64,
    kind: CellKind,
    inputs: Vec<(String, InputCaps)>,
    outputs: Vec<PendingOutput>,
    inouts: Vec<PendingOutput>,
    internals: Vec<String>,
    bus_count: u32,
    bundle_count: u32,
    seq: Option<PendingSeq>,
    timings: Vec<PendingTiming>,
}

impl CellBuilder {
    pub fn new(name: &str, area: f64) -> Self {
        CellBuilder {
            name: name.to_string(),
            area,
            kind: CellKind::Logic,
            inputs: Vec::new(),
            outputs: Vec::new(),
            inouts: Vec::new(),
            internals: Vec::new(),
            bus_count: 0,
            bundle_count: 0,
            seq: None,
            timings: Vec::new(),
        }
    }

    pub fn input(self, name: &str) -> Self {
        self.input_with_caps(name, InputCaps::default())
    }

    pub fn input_with_caps(mut self, name: &str, caps: InputCaps) -> Self {
        self.inputs.push((name.to_string(), caps));
        self
    }

    /// Output pin with a logic function.
    pub fn output(self, name: &str, function: &str) -> Self {
        self.output_with(name, Some(function), None, OutputLimits::default())
    }

    pub fn output_with(
        mut self,
        name: &str,
        function: Option<&str>,
        three_state: Option<&str>,
        limits: OutputLimits,
    ) -> Self {
        self.outputs.push(PendingOutput {
            name: name.to_string(),
            caps: None,
            function: function.map(|s| Formula::Text(s.to_string())),
            three_state: three_state.map(|s| Formula::Text(s.to_string())),
            limits,
        });
        self
    }

    /// Output pin with expressions already numbered by pin position. They are
    /// not checked here; out-of-range variables surface when the cell is
    /// encoded.
    pub fn output_expr(
        mut self,
        name: &str,
        function: Option<Expr>,
        three_state: Option<Expr>,
    ) -> Self {
        self.outputs.push(PendingOutput {
            name: name.to_string(),
            caps: None,
            function: function.map(Formula::Parsed),
            three_state: three_state.map(Formula::Parsed),
            limits: OutputLimits::default(),
        });
        self
    }

    pub fn inout(
        mut self,
        name: &str,
        function: Option<&str>,
        three_state: Option<&str>,
        caps: InputCaps,
        limits: OutputLimits,
    ) -> Self {
        self.inouts.push(PendingOutput {
            name: name.to_string(),
            caps: Some(caps),
            function: function.map(|s| Formula::Text(s.to_string())),
            three_state: three_state.map(|s| Formula::Text(s.to_string())),
            limits,
        });
        self
    }

    pub fn internal(mut self, name: &str) -> Self {
        self.internals.push(name.to_string());
        self
    }

    pub fn bus_count(mut self, n: u32) -> Self {
        self.bus_count = n;
        self
    }

    pub fn bundle_count(mut self, n: u32) -> Self {
        self.bundle_count = n;
        self
    }

    /// Overrides the cell kind without attaching a sequential function.
    pub fn kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn flip_flop(mut self, spec: SeqSpec) -> Self {
        self.kind = CellKind::FlipFlop;
        self.seq = Some(PendingSeq::Spec(spec));
        self
    }

    pub fn latch(mut self, spec: SeqSpec) -> Self {
        self.kind = CellKind::Latch;
        self.seq = Some(PendingSeq::Spec(spec));
        self
    }

    /// Sequential function with pre-numbered expressions.
    pub fn sequential_exprs(mut self, kind: CellKind, seq: SeqFunction) -> Self {
        self.kind = kind;
        self.seq = Some(PendingSeq::Exprs(seq));
        self
    }

    /// Registers `timing` from input pin `input` to output pin `output` under
    /// every sense in `senses`; a non-unate arc lists both.
    pub fn timing(
        mut self,
        input: &str,
        output: &str,
        senses: &[TimingSense],
        timing: Timing,
    ) -> Self {
        self.timings.push(PendingTiming {
            input: input.to_string(),
            output: output.to_string(),
            senses: senses.to_vec(),
            timing,
        });
        self
    }

    pub fn build(self) -> Result<Cell, String> {
        let ni = self.inputs.len();
        let nio = self.inouts.len();

        let mut vars: HashMap<String, u32> = HashMap::new();
        let mut all_names: Vec<&str> = Vec::new();
        for (i, (name, _)) in self.inputs.iter().enumerate() {
            vars.insert(name.clone(), i as u32);
            all_names.push(name);
        }
        for (i, p) in self.inouts.iter().enumerate() {
            vars.insert(p.name.clone(), (ni + i) as u32);
            all_names.push(&p.name);
        }
        all_names.extend(self.outputs.iter().map(|p| p.name.as_str()));
        all_names.extend(self.internals.iter().map(String::as_str));
        let mut seen = std::collections::HashSet::new();
        for name in &all_names {
            if !seen.insert(*name) {
                return Err(format!("cell '{}': duplicate pin '{}'", self.name, name));
            }
        }
        if let Some(PendingSeq::Spec(spec)) = &self.seq {
            for (k, var) in [&spec.var1, &spec.var2].into_iter().enumerate() {
                if seen.contains(var.as_str()) {
                    return Err(format!(
                        "cell '{}': state variable '{}' clashes with a pin",
                        self.name, var
                    ));
                }
                vars.insert(var.clone(), (ni + nio + k) as u32);
            }
        }

        let cell_name = self.name.clone();
        let parse = |f: Formula| -> Result<Expr, String> {
            match f {
                Formula::Parsed(e) => Ok(e),
                Formula::Text(s) => Expr::parse(&s, |n| vars.get(n).copied())
                    .map_err(|e| format!("cell '{}': {}", cell_name, e)),
            }
        };
        let parse_opt = |f: Option<Formula>| f.map(&parse).transpose();

        let inputs = self
            .inputs
            .iter()
            .map(|(name, caps)| Pin::Input {
                name: name.clone(),
                caps: *caps,
            })
            .collect();
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for p in self.outputs.iter().cloned() {
            outputs.push(Pin::Output {
                name: p.name,
                function: parse_opt(p.function)?,
                three_state: parse_opt(p.three_state)?,
                limits: p.limits,
            });
        }
        let mut inouts = Vec::with_capacity(nio);
        for p in self.inouts.iter().cloned() {
            inouts.push(Pin::Inout {
                name: p.name,
                caps: p.caps.unwrap_or_default(),
                function: parse_opt(p.function)?,
                three_state: parse_opt(p.three_state)?,
                limits: p.limits,
            });
        }
        let internals = self
            .internals
            .iter()
            .map(|name| Pin::Internal { name: name.clone() })
            .collect();

        let sequential = match self.seq.clone() {
            None => None,
            Some(PendingSeq::Exprs(seq)) => Some(seq),
            Some(PendingSeq::Spec(spec)) => {
                let text = |s: &str| parse(Formula::Text(s.to_string()));
                let text_opt = |s: &Option<String>| match s {
                    Some(s) => text(s.as_str()),
                    None => Ok(Expr::Zero),
                };
                Some(SeqFunction {
                    next_state: text(spec.next_state.as_str())?,
                    clock: text(spec.clock.as_str())?,
                    clock2: text_opt(&spec.clock2)?,
                    clear: text_opt(&spec.clear)?,
                    preset: text_opt(&spec.preset)?,
                    clear_preset_var1: spec.clear_preset_var1,
                    clear_preset_var2: spec.clear_preset_var2,
                })
            }
        };

        let input_pos = |name: &str| -> Option<u32> {
            if let Some(i) = self.inputs.iter().position(|(n, _)| n == name) {
                return Some(i as u32);
            }
            self.inouts
                .iter()
                .position(|p| p.name == name)
                .map(|i| (ni + i) as u32)
        };
        let output_pos = |name: &str| -> Option<u32> {
            if let Some(i) = self.outputs.iter().position(|p| p.name == name) {
                return Some(i as u32);
            }
            self.inouts
                .iter()
                .position(|p| p.name == name)
                .map(|i| (self.outputs.len() + i) as u32)
        };
        let mut timings = Vec::with_capacity(self.timings.len());
        let mut timing_table = TimingTable::default();
        for t in &self.timings {
            let input = input_pos(&t.input).ok_or_else(|| {
                format!("cell '{}': timing from unknown input '{}'", self.name, t.input)
            })?;
            let output = output_pos(&t.output).ok_or_else(|| {
                format!("cell '{}': timing to unknown output '{}'", self.name, t.output)
            })?;
            let arc = timings.len() as u32;
            timings.push(t.timing);
            for &sense in &t.senses {
                timing_table.insert(TimingKey { input, output, sense }, arc);
            }
        }

        Ok(Cell {
            name: self.name.clone(),
            area: self.area,
            kind: self.kind,
            inputs,
            outputs,
            inouts,
            internals,
            bus_count: self.bus_count,
            bundle_count: self.bundle_count,
            sequential,
            timings,
            timing_table,
        })
    }
}
