// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use crate::cell::{Cell, Pin};
use crate::codec::bin_io::BinWriter;
use crate::codec::{expr_tag, HAS_LOGIC, HAS_TRISTATE};
use crate::error::{Result, TechlibError};
use crate::library::CellLibrary;
use crate::logic::Expr;
use crate::npn::NpnMap;
use crate::pattern::PgNode;

/// Writes `library` to `sink` in the binary index format.
pub fn dump<W: Write>(library: &CellLibrary, sink: W) -> Result<()> {
    let mut w = BinWriter::new(sink);
    w.str(library.name())?;
    w.count(library.cells.len())?;
    for cell in &library.cells {
        write_cell(&mut w, cell)?;
    }

    w.count(library.classes.len())?;
    w.count(library.groups.len())?;
    for group in &library.groups {
        w.u32(group.class_id.0)?;
        write_map(&mut w, &group.map)?;
        w.count(group.cells.len())?;
        for c in &group.cells {
            w.u32(c.0)?;
        }
    }
    for class in &library.classes {
        w.count(class.automorphisms.len())?;
        for a in &class.automorphisms {
            write_map(&mut w, a)?;
        }
        w.count(class.groups.len())?;
        for g in &class.groups {
            w.u32(g.0)?;
        }
    }

    let b = &library.builtins;
    for g in &b.logic_groups {
        w.u32(g.0)?;
    }
    for c in b.ff_classes.iter().chain(b.latch_classes.iter()) {
        w.u32(c.0)?;
    }

    w.count(library.pg_nodes.len())?;
    for node in &library.pg_nodes {
        let input_id = node.input_id().unwrap_or(0);
        w.u32((input_id << 2) | node.node_type().tag())?;
        match node.fanins() {
            Some(f) => {
                w.u32(f[0].pack())?;
                w.u32(f[1].pack())?;
            }
            None => {
                w.u32(0)?;
                w.u32(0)?;
            }
        }
    }
    w.count(library.patterns.len())?;
    for p in &library.patterns {
        w.u32((p.input_count << 1) | p.root_inverted as u32)?;
        w.count(p.edges.len())?;
        for e in &p.edges {
            w.u32(e.0)?;
        }
        w.u32(p.class_id.0)?;
    }
    w.flush()?;
    log::info!(
        "dumped library '{}': {} cells, {} groups, {} classes, {} patterns",
        library.name(),
        library.cells.len(),
        library.groups.len(),
        library.classes.len(),
        library.patterns.len()
    );
    Ok(())
}

fn write_cell<W: Write>(w: &mut BinWriter<W>, cell: &Cell) -> Result<()> {
    w.u8(cell.kind.tag())?;
    w.str(&cell.name)?;
    w.f64(cell.area)?;
    w.count(cell.inputs.len())?;
    w.count(cell.outputs.len())?;
    w.count(cell.inouts.len())?;
    w.u32(cell.bus_count)?;
    w.u32(cell.bundle_count)?;

    for o in 0..cell.output_positions() {
        let logic = cell.logic_expr(o);
        let tristate = cell.tristate_expr(o);
        let mut flags = 0;
        if logic.is_some() {
            flags |= HAS_LOGIC;
        }
        if tristate.is_some() {
            flags |= HAS_TRISTATE;
        }
        w.u8(flags)?;
        write_expr(w, logic.unwrap_or(&Expr::Zero))?;
        write_expr(w, tristate.unwrap_or(&Expr::Zero))?;
    }
    if cell.kind.is_sequential() {
        let seq = cell.sequential().ok_or_else(|| {
            TechlibError::internal(format!("{} has no sequential function", cell.name))
        })?;
        for e in seq.exprs() {
            write_expr(w, e)?;
        }
        w.u8(seq.clear_preset_var1)?;
        w.u8(seq.clear_preset_var2)?;
    }

    for pin in &cell.inputs {
        write_pin(w, pin)?;
    }
    for pin in &cell.outputs {
        write_pin(w, pin)?;
    }
    for pin in &cell.inouts {
        write_pin(w, pin)?;
    }

    w.count(cell.timings.len())?;
    for t in &cell.timings {
        w.f64s(&t.to_array())?;
    }
    for (key, arc) in cell.timing_table.entries() {
        w.u8(key.sense.tag())?;
        w.u32(key.input)?;
        w.u32(key.output)?;
        w.u32(arc)?;
    }
    w.u8(0)
}

fn write_pin<W: Write>(w: &mut BinWriter<W>, pin: &Pin) -> Result<()> {
    w.str(pin.name())?;
    if let Some(caps) = pin.caps() {
        w.f64s(&[caps.capacitance, caps.rise_capacitance, caps.fall_capacitance])?;
    }
    if let Some(limits) = pin.limits() {
        w.f64s(&limits.to_array())?;
    }
    Ok(())
}

fn write_expr<W: Write>(w: &mut BinWriter<W>, e: &Expr) -> Result<()> {
    w.u8(expr_tag(e))?;
    match e {
        Expr::Zero | Expr::One => Ok(()),
        Expr::Literal { var, .. } => w.u32(*var),
        Expr::And(children) | Expr::Or(children) | Expr::Xor(children) => {
            w.count(children.len())?;
            for c in children {
                write_expr(w, c)?;
            }
            Ok(())
        }
    }
}

pub(crate) fn write_map<W: Write>(w: &mut BinWriter<W>, map: &NpnMap) -> Result<()> {
    w.count(map.input_count())?;
    w.count(map.output_count())?;
    for m in map.inputs() {
        w.u32(m.pack())?;
    }
    for &inv in map.outputs() {
        w.u32(inv as u32)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn test_cell_layout_prefix() {
        let cell = CellBuilder::new("INV", 1.0)
            .input("A")
            .output("Y", "!A")
            .build()
            .unwrap();
        let mut buf = Vec::new();
        write_cell(&mut BinWriter::new(&mut buf), &cell).unwrap();
        // tag, name length, name
        assert_eq!(buf[0], 0);
        assert_eq!(&buf[1..5], &3u32.to_le_bytes());
        assert_eq!(&buf[5..8], b"INV");
        // area
        assert_eq!(&buf[8..16], &1.0f64.to_bits().to_le_bytes());
        // one output with logic: flags, then the negative literal of var 0
        let exprs = 16 + 5 * 4;
        assert_eq!(buf[exprs], HAS_LOGIC);
        assert_eq!(buf[exprs + 1], crate::codec::EXPR_NEGA);
        assert_eq!(&buf[exprs + 2..exprs + 6], &0u32.to_le_bytes());
        // empty timing stream terminator
        assert_eq!(*buf.last().unwrap(), 0);
    }

    #[test]
    fn test_map_layout() {
        let map = NpnMap::new(
            vec![
                crate::npn::InputMap { dst: 1, inv: true },
                crate::npn::InputMap { dst: 0, inv: false },
            ],
            vec![true],
        )
        .unwrap();
        let mut buf = Vec::new();
        write_map(&mut BinWriter::new(&mut buf), &map).unwrap();
        let words: Vec<u32> = buf
            .chunks(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, vec![2, 1, 3, 0, 1]);
    }
}
