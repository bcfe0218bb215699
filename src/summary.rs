// SPDX-License-Identifier: Apache-2.0

//! Statistics and a human-readable rendering of a [`CellLibrary`].

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::Serialize;

use crate::cell::{Cell, CellKind, Pin, TimingSense};
use crate::error::Result;
use crate::ids::PatternId;
use crate::library::CellLibrary;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LibrarySummary {
    pub name: String,
    pub cells: usize,
    pub groups: usize,
    pub classes: usize,
    pub logic_classes: usize,
    pub ff_classes: usize,
    pub latch_classes: usize,
    /// Number of classes by canonical input count.
    pub class_inputs: BTreeMap<usize, usize>,
    pub patterns: usize,
    pub pattern_nodes: usize,
}

impl LibrarySummary {
    pub fn of(library: &CellLibrary) -> Self {
        let mut class_inputs = BTreeMap::new();
        let (mut logic, mut ff, mut latch) = (0, 0, 0);
        for class in library.classes() {
            match class.repr().kind() {
                CellKind::FlipFlop => ff += 1,
                CellKind::Latch => latch += 1,
                _ => logic += 1,
            }
            *class_inputs.entry(class.repr().input_count()).or_insert(0) += 1;
        }
        LibrarySummary {
            name: library.name().to_string(),
            cells: library.cell_count(),
            groups: library.group_count(),
            classes: library.class_count(),
            logic_classes: logic,
            ff_classes: ff,
            latch_classes: latch,
            class_inputs,
            patterns: library.pattern_count(),
            pattern_nodes: library.pg_node_count(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn kind_name(kind: CellKind) -> &'static str {
    match kind {
        CellKind::Logic => "Combinational Logic",
        CellKind::FlipFlop => "Flip-Flop",
        CellKind::Latch => "Latch",
        CellKind::Fsm => "FSM",
    }
}

/// Renders every cell, group, class and pattern of `library`.
pub fn display_library(out: &mut impl Write, library: &CellLibrary) -> fmt::Result {
    for (i, cell) in library.cells().iter().enumerate() {
        writeln!(out, "Cell#{} ({}) : {}", i, cell.name(), kind_name(cell.kind()))?;
        display_cell(out, cell)?;
    }
    writeln!(out)?;

    for group in library.groups() {
        write!(
            out,
            "{} : class = {}, map = {}",
            group.id(),
            group.class_id(),
            group.map()
        )?;
        if let Some(info) = group.seq_pin_info() {
            write!(out, ", pin info = {:#010x}", info.0)?;
        }
        writeln!(out)?;
        let names: Vec<&str> = group
            .cells()
            .iter()
            .map(|&c| library.cell(c).name())
            .collect();
        writeln!(out, "  cells: {}", names.join(" "))?;
    }
    writeln!(out)?;

    for class in library.classes() {
        writeln!(out, "{} : {:?}", class.id(), class.repr())?;
        let groups: Vec<String> = class.groups().iter().map(|g| g.to_string()).collect();
        writeln!(out, "  groups: {}", groups.join(" "))?;
        for a in class.automorphisms() {
            writeln!(out, "  idmap: {}", a)?;
        }
    }
    writeln!(out)?;

    writeln!(
        out,
        "Pattern graph: {} nodes, {} inputs",
        library.pg_node_count(),
        library.pg_max_input()
    )?;
    for p in 0..library.pattern_count() {
        let pid = PatternId::from_index(p);
        let pat = library.pattern(pid);
        write!(
            out,
            "{} : {} inputs, {}{}, edges:",
            pid,
            pat.input_count(),
            if pat.root_inverted() { "!" } else { "" },
            pat.root()
        )?;
        for &e in pat.edges() {
            let from = library
                .pg_edge_from(e)
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            write!(
                out,
                " {}{}->{}.{}",
                if library.pg_edge_inv(e) { "!" } else { "" },
                from,
                e.node(),
                e.pos()
            )?;
        }
        writeln!(out, " ({})", pat.class_id())?;
    }
    Ok(())
}

fn display_cell(out: &mut impl Write, cell: &Cell) -> fmt::Result {
    writeln!(out, "  area = {}", cell.area())?;
    if let Some(seq) = cell.sequential() {
        let (data, clock, clock2) = if cell.is_latch() {
            ("Data In", "Enable", "Enable2")
        } else {
            ("Next State", "Clock", "Clock2")
        };
        writeln!(out, "  {:<19}= {}", data, seq.next_state)?;
        writeln!(out, "  {:<19}= {}", clock, seq.clock)?;
        if !seq.clock2.is_zero() {
            writeln!(out, "  {:<19}= {}", clock2, seq.clock2)?;
        }
        if seq.has_clear() {
            writeln!(out, "  Clear              = {}", seq.clear)?;
        }
        if seq.has_preset() {
            writeln!(out, "  Preset             = {}", seq.preset)?;
        }
        if seq.has_clear() && seq.has_preset() {
            writeln!(out, "  Clear Preset Var1  = {}", seq.clear_preset_var1)?;
            writeln!(out, "  Clear Preset Var2  = {}", seq.clear_preset_var2)?;
        }
    }
    for (pos, pin) in cell.inputs().iter().enumerate() {
        writeln!(out, "  Input#{}: {}", pos, pin.name())?;
        display_caps(out, pin)?;
    }
    for (pos, pin) in cell.outputs().iter().enumerate() {
        writeln!(out, "  Output#{}: {}", pos, pin.name())?;
        display_functions(out, pin)?;
        display_limits(out, pin)?;
    }
    for (pos, pin) in cell.inouts().iter().enumerate() {
        writeln!(out, "  Inout#{}: {}", pos, pin.name())?;
        display_functions(out, pin)?;
        display_caps(out, pin)?;
        display_limits(out, pin)?;
    }
    for (pos, pin) in cell.internals().iter().enumerate() {
        writeln!(out, "  Internal#{}: {}", pos, pin.name())?;
    }
    for ipos in 0..cell.input_positions() {
        for opos in 0..cell.output_positions() {
            for sense in [TimingSense::PositiveUnate, TimingSense::NegativeUnate] {
                for timing in cell.timing_arcs(ipos, opos, sense) {
                    let (iname, oname) = match (cell.input(ipos), cell.output(opos)) {
                        (Some(i), Some(o)) => (i.name(), o.name()),
                        _ => continue,
                    };
                    writeln!(out, "  Timing:")?;
                    writeln!(out, "    Input Pin       = {}", iname)?;
                    writeln!(out, "    Output Pin      = {}", oname)?;
                    writeln!(
                        out,
                        "    Sense           = {}",
                        match sense {
                            TimingSense::PositiveUnate => "positive unate",
                            TimingSense::NegativeUnate => "negative unate",
                        }
                    )?;
                    writeln!(out, "    Rise Intrinsic  = {}", timing.intrinsic_rise)?;
                    writeln!(out, "    Rise Resistance = {}", timing.rise_resistance)?;
                    writeln!(out, "    Fall Intrinsic  = {}", timing.intrinsic_fall)?;
                    writeln!(out, "    Fall Resistance = {}", timing.fall_resistance)?;
                }
            }
        }
    }
    Ok(())
}

fn display_functions(out: &mut impl Write, pin: &Pin) -> fmt::Result {
    if let Some(f) = pin.function() {
        writeln!(out, "    Logic            = {}", f)?;
        if let Some(t) = pin.three_state().filter(|t| !t.is_zero()) {
            writeln!(out, "    Tristate         = {}", t)?;
        }
    }
    Ok(())
}

fn display_caps(out: &mut impl Write, pin: &Pin) -> fmt::Result {
    if let Some(c) = pin.caps() {
        writeln!(out, "    Capacitance      = {}", c.capacitance)?;
        writeln!(out, "    Rise Capacitance = {}", c.rise_capacitance)?;
        writeln!(out, "    Fall Capacitance = {}", c.fall_capacitance)?;
    }
    Ok(())
}

fn display_limits(out: &mut impl Write, pin: &Pin) -> fmt::Result {
    if let Some(l) = pin.limits() {
        writeln!(out, "    Max Fanout       = {}", l.max_fanout)?;
        writeln!(out, "    Min Fanout       = {}", l.min_fanout)?;
        writeln!(out, "    Max Capacitance  = {}", l.max_capacitance)?;
        writeln!(out, "    Min Capacitance  = {}", l.min_capacitance)?;
        writeln!(out, "    Max Transition   = {}", l.max_transition)?;
        writeln!(out, "    Min Transition   = {}", l.min_transition)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::library::build_index;
    use crate::test_utils::sample_cells;

    #[test]
    fn test_summary_counts() {
        let lib = build_index("sample", sample_cells(), &BuildOptions::default())
            .unwrap()
            .library;
        let s = LibrarySummary::of(&lib);
        assert_eq!(s.cells, lib.cell_count());
        assert_eq!(s.logic_classes + s.ff_classes + s.latch_classes, s.classes);
        assert!(s.ff_classes >= 4);
        assert!(s.latch_classes >= 4);
        assert_eq!(s.class_inputs.values().sum::<usize>(), s.classes);
        let json = s.to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["name"], "sample");
        assert_eq!(v["patterns"], lib.pattern_count());
    }

    #[test]
    fn test_display_mentions_cells_and_timing() {
        let lib = build_index("sample", sample_cells(), &BuildOptions::default())
            .unwrap()
            .library;
        let mut text = String::new();
        display_library(&mut text, &lib).unwrap();
        assert!(text.contains("(NAND2_X1) : Combinational Logic"));
        assert!(text.contains("(DFF_X1) : Flip-Flop"));
        assert!(text.contains("Sense           = negative unate"));
        assert!(text.contains("Pattern graph:"));
    }
}
