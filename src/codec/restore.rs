// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};
use std::io::Read;

use crate::cell::{
    Cell, CellKind, InputCaps, OutputLimits, Pin, SeqFunction, Timing, TimingKey, TimingSense,
    TimingTable,
};
use crate::class::{Builtins, CellClass, CellGroup};
use crate::classify::{builtin_logic_template, builtin_seq_template};
use crate::codec::bin_io::BinReader;
use crate::codec::{
    EXPR_AND, EXPR_NEGA, EXPR_ONE, EXPR_OR, EXPR_POSI, EXPR_XOR, EXPR_ZERO, HAS_LOGIC,
    HAS_TRISTATE,
};
use crate::config::MAX_SIGNATURE_INPUTS;
use crate::error::{Result, TechlibError};
use crate::ids::{CellId, ClassId, EdgeId, GroupId, NodeId, PatternId};
use crate::library::CellLibrary;
use crate::logic::{Expr, MAX_EXPR_DEPTH};
use crate::npn::{InputMap, NpnMap};
use crate::patgen::pattern_function;
use crate::pattern::{collect_edges, evaluate, Fanin, PatternGraph, PgNode, PgNodeType};
use crate::signature::{encode, SeqPinInfo, Signature};

/// Reads a library from `source`, which must hold exactly one index.
pub fn restore<R: Read>(mut source: R) -> Result<CellLibrary> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    restore_from_bytes(&bytes)
}

pub fn restore_from_bytes(bytes: &[u8]) -> Result<CellLibrary> {
    let mut r = BinReader::new(bytes);
    let name = r.str("library name")?;
    let cell_count = r.count(1, "cell count")?;
    let mut cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        cells.push(read_cell(&mut r)?);
    }

    let class_count = r.count(8, "class count")?;
    let group_count = r.count(12, "group count")?;
    let mut groups = Vec::with_capacity(group_count);
    let mut group_offsets = Vec::with_capacity(group_count);
    for g in 0..group_count {
        group_offsets.push(r.offset());
        let class_id = ClassId::from_index(r.index(class_count, "group class")?);
        let map = read_map(&mut r)?;
        let n = r.count(4, "group cell count")?;
        let mut members = Vec::with_capacity(n);
        for _ in 0..n {
            members.push(CellId::from_index(r.index(cell_count, "group cell")?));
        }
        groups.push(RawGroup {
            id: GroupId::from_index(g),
            class_id,
            map,
            cells: members,
        });
    }
    let mut raw_classes = Vec::with_capacity(class_count);
    let mut class_offsets = Vec::with_capacity(class_count);
    for _ in 0..class_count {
        class_offsets.push(r.offset());
        let n = r.count(8, "automorphism count")?;
        let mut automorphisms = Vec::with_capacity(n);
        for _ in 0..n {
            automorphisms.push(read_map(&mut r)?);
        }
        let n = r.count(4, "class group count")?;
        let mut member_groups = Vec::with_capacity(n);
        for _ in 0..n {
            member_groups.push(GroupId::from_index(r.index(group_count, "class group")?));
        }
        raw_classes.push((automorphisms, member_groups));
    }

    let builtins_offset = r.offset();
    let mut builtins = Builtins {
        logic_groups: [GroupId(0); 4],
        ff_classes: [ClassId(0); 4],
        latch_classes: [ClassId(0); 4],
    };
    for g in builtins.logic_groups.iter_mut() {
        *g = GroupId::from_index(r.index(group_count, "built-in group")?);
    }
    for c in builtins
        .ff_classes
        .iter_mut()
        .chain(builtins.latch_classes.iter_mut())
    {
        *c = ClassId::from_index(r.index(class_count, "built-in class")?);
    }

    let node_count = r.count(12, "node count")?;
    let mut pg_nodes = Vec::with_capacity(node_count);
    for i in 0..node_count {
        pg_nodes.push(read_node(&mut r, i)?);
    }
    let pattern_count = r.count(12, "pattern count")?;
    let mut pattern_offsets = Vec::with_capacity(pattern_count);
    let mut patterns = Vec::with_capacity(pattern_count);
    for _ in 0..pattern_count {
        pattern_offsets.push(r.offset());
        let word = r.u32("pattern header")?;
        let n = r.count(4, "edge count")?;
        let mut edges = Vec::with_capacity(n);
        for _ in 0..n {
            edges.push(EdgeId(r.index(2 * node_count, "edge")? as u32));
        }
        let class_id = ClassId::from_index(r.index(class_count, "pattern class")?);
        let root = match edges.first() {
            Some(e) => e.node(),
            None => return Err(TechlibError::corrupt(r.offset(), "pattern without edges")),
        };
        patterns.push(PatternGraph {
            class_id,
            input_count: word >> 1,
            root,
            root_inverted: word & 1 != 0,
            edges,
        });
    }
    if !r.is_at_end() {
        return Err(TechlibError::corrupt(r.offset(), "trailing bytes after index"));
    }

    // Everything below is derived from the tables read above.
    let mut cell_names = HashMap::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        cell_names
            .entry(cell.name.clone())
            .or_insert_with(|| CellId::from_index(i));
    }

    let mut cell_groups: Vec<Option<GroupId>> = vec![None; cells.len()];
    for (g, at) in groups.iter().zip(&group_offsets) {
        for c in &g.cells {
            if cell_groups[c.index()].replace(g.id).is_some() {
                return Err(TechlibError::corrupt(
                    *at,
                    format!("{} belongs to more than one group", c),
                ));
            }
        }
    }

    let mut signatures = Vec::with_capacity(groups.len());
    for (g, &at) in groups.iter().zip(&group_offsets) {
        signatures.push(group_signature(g, &cells, &builtins, &raw_classes, at)?);
    }

    let mut classes = Vec::with_capacity(class_count);
    for (i, ((automorphisms, member_groups), &at)) in
        raw_classes.into_iter().zip(&class_offsets).enumerate()
    {
        let cid = ClassId::from_index(i);
        let g0 = member_groups
            .first()
            .ok_or_else(|| TechlibError::corrupt(at, format!("{} has no groups", cid)))?;
        let sig = &signatures[g0.index()];
        let map = &groups[g0.index()].map;
        check_map_fits(map, sig, at)?;
        let repr = sig.apply(&map.inverse());
        let mut seen_maps = HashSet::with_capacity(automorphisms.len());
        for a in &automorphisms {
            if !seen_maps.insert(a) {
                return Err(TechlibError::corrupt(
                    at,
                    format!("{} repeats automorphism {}", cid, a),
                ));
            }
            check_map_fits(a, &repr, at)?;
            if a.is_identity() || repr.apply(a) != repr {
                return Err(TechlibError::corrupt(
                    at,
                    format!("{} is not an automorphism of {}", a, cid),
                ));
            }
        }
        let mut seen_groups = HashSet::with_capacity(member_groups.len());
        for g in &member_groups {
            if !seen_groups.insert(*g) {
                return Err(TechlibError::corrupt(
                    at,
                    format!("{} lists {} twice", cid, g),
                ));
            }
            if groups[g.index()].class_id != cid {
                return Err(TechlibError::corrupt(
                    at,
                    format!("{} lists {} of another class", cid, g),
                ));
            }
        }
        classes.push(CellClass {
            id: cid,
            repr,
            automorphisms,
            groups: member_groups,
            patterns: Vec::new(),
        });
    }

    let mut checked_groups = Vec::with_capacity(groups.len());
    for ((g, sig), &at) in groups.into_iter().zip(signatures).zip(&group_offsets) {
        let class = &classes[g.class_id.index()];
        if !class.groups.contains(&g.id) {
            return Err(TechlibError::corrupt(
                at,
                format!("{} is missing from {}", g.id, g.class_id),
            ));
        }
        check_map_fits(&g.map, &sig, at)?;
        check_map_fits(&g.map, &class.repr, at)?;
        if class.repr.apply(&g.map) != sig {
            return Err(TechlibError::corrupt(
                at,
                format!("map of {} does not reach its signature", g.id),
            ));
        }
        checked_groups.push(CellGroup {
            id: g.id,
            class_id: g.class_id,
            map: g.map,
            seq_pin_info: SeqPinInfo::from_signature(&sig),
            signature: sig,
            cells: g.cells,
        });
    }
    let groups = checked_groups;

    for (i, (p, &at)) in patterns.iter().zip(&pattern_offsets).enumerate() {
        let (edges, input_count) = collect_edges(&pg_nodes, p.root);
        if edges != p.edges || input_count != p.input_count {
            return Err(TechlibError::corrupt(
                at,
                "pattern edges do not match the graph under its root",
            ));
        }
        let class = &mut classes[p.class_id.index()];
        let sound = pattern_function(class, usize::MAX)
            .filter(|f| f.input_count() == input_count as usize)
            .and_then(|f| {
                let mut v = evaluate(&pg_nodes, p.root, input_count as usize)?;
                if p.root_inverted {
                    v = v.complement();
                }
                Some(v == f)
            })
            .unwrap_or(false);
        if !sound {
            return Err(TechlibError::corrupt(
                at,
                format!("pattern does not compute the function of {}", p.class_id),
            ));
        }
        class.patterns.push(PatternId::from_index(i));
    }

    check_builtins(&builtins, &groups, &classes, builtins_offset)?;

    let library = CellLibrary {
        name,
        cells,
        cell_names,
        cell_groups,
        groups,
        classes,
        builtins,
        pg_nodes,
        patterns,
    };
    log::info!(
        "restored library '{}': {} cells, {} groups, {} classes, {} patterns",
        library.name(),
        library.cell_count(),
        library.group_count(),
        library.class_count(),
        library.pattern_count()
    );
    Ok(library)
}

struct RawGroup {
    id: GroupId,
    class_id: ClassId,
    map: NpnMap,
    cells: Vec<CellId>,
}

fn check_map_fits(map: &NpnMap, sig: &Signature, at: usize) -> Result<()> {
    if map.input_count() != sig.input_count() || map.output_count() != sig.output_count() {
        return Err(TechlibError::corrupt(
            at,
            format!(
                "map over {}x{} does not fit a signature over {}x{}",
                map.input_count(),
                map.output_count(),
                sig.input_count(),
                sig.output_count()
            ),
        ));
    }
    Ok(())
}

/// Signature of a group: that of its cells, or the template of an empty
/// built-in group.
fn group_signature(
    g: &RawGroup,
    cells: &[Cell],
    builtins: &Builtins,
    classes: &[(Vec<NpnMap>, Vec<GroupId>)],
    at: usize,
) -> Result<Signature> {
    if let Some((first, rest)) = g.cells.split_first() {
        let sig = encode(&cells[first.index()], MAX_SIGNATURE_INPUTS)
            .map_err(|e| TechlibError::corrupt(at, e.to_string()))?;
        for c in rest {
            let other = encode(&cells[c.index()], MAX_SIGNATURE_INPUTS)
                .map_err(|e| TechlibError::corrupt(at, e.to_string()))?;
            if other != sig {
                return Err(TechlibError::corrupt(
                    at,
                    format!("{} and {} of {} differ", first, c, g.id),
                ));
            }
        }
        return Ok(sig);
    }
    if let Some(i) = builtins.logic_groups.iter().position(|&b| b == g.id) {
        return Ok(builtin_logic_template(i).clone());
    }
    let seeded = |kind: CellKind, ids: &[ClassId; 4]| {
        ids.iter().position(|c| {
            classes
                .get(c.index())
                .and_then(|(_, gs)| gs.first())
                .map_or(false, |&first| first == g.id)
        })
        .map(|shape| builtin_seq_template(kind, shape).clone())
    };
    seeded(CellKind::FlipFlop, &builtins.ff_classes)
        .or_else(|| seeded(CellKind::Latch, &builtins.latch_classes))
        .ok_or_else(|| TechlibError::corrupt(at, format!("{} has no cells", g.id)))
}

fn check_builtins(
    builtins: &Builtins,
    groups: &[CellGroup],
    classes: &[CellClass],
    at: usize,
) -> Result<()> {
    for (i, g) in builtins.logic_groups.iter().enumerate() {
        if groups[g.index()].signature != *builtin_logic_template(i) {
            return Err(TechlibError::corrupt(
                at,
                format!("built-in group {} has the wrong function", g),
            ));
        }
    }
    for (kind, ids) in [
        (CellKind::FlipFlop, &builtins.ff_classes),
        (CellKind::Latch, &builtins.latch_classes),
    ] {
        for (shape, c) in ids.iter().enumerate() {
            let template = builtin_seq_template(kind, shape);
            let class = &classes[c.index()];
            let matches = class
                .groups
                .first()
                .map_or(false, |g| groups[g.index()].signature == *template);
            if !matches {
                return Err(TechlibError::corrupt(
                    at,
                    format!("built-in class {} has the wrong function", c),
                ));
            }
        }
    }
    Ok(())
}

fn read_cell(r: &mut BinReader<'_>) -> Result<Cell> {
    let at = r.offset();
    let tag = r.u8("cell type")?;
    let kind = CellKind::from_tag(tag)
        .ok_or_else(|| TechlibError::corrupt(at, format!("invalid cell type {}", tag)))?;
    let name = r.str("cell name")?;
    let area = r.f64("cell area")?;
    let ni = r.count(1, "input count")?;
    let no = r.count(1, "output count")?;
    let nio = r.count(1, "inout count")?;
    let bus_count = r.u32("bus count")?;
    let bundle_count = r.u32("bundle count")?;

    let mut functions = Vec::with_capacity(no + nio);
    for _ in 0..no + nio {
        let at = r.offset();
        let flags = r.u8("output flags")?;
        if flags & !(HAS_LOGIC | HAS_TRISTATE) != 0 {
            return Err(TechlibError::corrupt(
                at,
                format!("invalid output flags {:#x}", flags),
            ));
        }
        let logic = read_expr(r, 0)?;
        let tristate = read_expr(r, 0)?;
        functions.push((
            (flags & HAS_LOGIC != 0).then_some(logic),
            (flags & HAS_TRISTATE != 0).then_some(tristate),
        ));
    }
    let sequential = if kind.is_sequential() {
        Some(SeqFunction {
            next_state: read_expr(r, 0)?,
            clock: read_expr(r, 0)?,
            clock2: read_expr(r, 0)?,
            clear: read_expr(r, 0)?,
            preset: read_expr(r, 0)?,
            clear_preset_var1: r.u8("clear/preset tie-break")?,
            clear_preset_var2: r.u8("clear/preset tie-break")?,
        })
    } else {
        None
    };

    let mut inputs = Vec::with_capacity(ni);
    for _ in 0..ni {
        inputs.push(Pin::Input {
            name: r.str("pin name")?,
            caps: read_caps(r)?,
        });
    }
    let mut functions = functions.into_iter();
    let mut outputs = Vec::with_capacity(no);
    for (function, three_state) in functions.by_ref().take(no) {
        outputs.push(Pin::Output {
            name: r.str("pin name")?,
            function,
            three_state,
            limits: OutputLimits::from_array(r.f64_array("output limits")?),
        });
    }
    let mut inouts = Vec::with_capacity(nio);
    for (function, three_state) in functions {
        inouts.push(Pin::Inout {
            name: r.str("pin name")?,
            caps: read_caps(r)?,
            function,
            three_state,
            limits: OutputLimits::from_array(r.f64_array("output limits")?),
        });
    }

    let arc_count = r.count(48, "timing count")?;
    let mut timings = Vec::with_capacity(arc_count);
    for _ in 0..arc_count {
        timings.push(Timing::from_array(r.f64_array("timing")?));
    }
    let mut timing_table = TimingTable::default();
    loop {
        let at = r.offset();
        let tag = r.u8("timing sense")?;
        if tag == 0 {
            break;
        }
        let sense = TimingSense::from_tag(tag)
            .ok_or_else(|| TechlibError::corrupt(at, format!("invalid timing sense {}", tag)))?;
        let input = r.index(ni + nio, "timing input")? as u32;
        let output = r.index(no + nio, "timing output")? as u32;
        let arc = r.index(arc_count, "timing arc")? as u32;
        timing_table.insert(
            TimingKey {
                input,
                output,
                sense,
            },
            arc,
        );
    }

    Ok(Cell {
        name,
        area,
        kind,
        inputs,
        outputs,
        inouts,
        internals: Vec::new(),
        bus_count,
        bundle_count,
        sequential,
        timings,
        timing_table,
    })
}

fn read_caps(r: &mut BinReader<'_>) -> Result<InputCaps> {
    let [capacitance, rise_capacitance, fall_capacitance] = r.f64_array("pin capacitance")?;
    Ok(InputCaps {
        capacitance,
        rise_capacitance,
        fall_capacitance,
    })
}

fn read_expr(r: &mut BinReader<'_>, depth: usize) -> Result<Expr> {
    let at = r.offset();
    if depth > MAX_EXPR_DEPTH {
        return Err(TechlibError::corrupt(at, "expression nested too deeply"));
    }
    let tag = r.u8("expression tag")?;
    match tag {
        EXPR_ZERO => Ok(Expr::Zero),
        EXPR_ONE => Ok(Expr::One),
        EXPR_POSI => Ok(Expr::posi_literal(r.u32("literal")?)),
        EXPR_NEGA => Ok(Expr::nega_literal(r.u32("literal")?)),
        EXPR_AND | EXPR_OR | EXPR_XOR => {
            let n = r.count(1, "operand count")?;
            let mut children = Vec::with_capacity(n);
            for _ in 0..n {
                children.push(read_expr(r, depth + 1)?);
            }
            Ok(match tag {
                EXPR_AND => Expr::And(children),
                EXPR_OR => Expr::Or(children),
                _ => Expr::Xor(children),
            })
        }
        _ => Err(TechlibError::corrupt(
            at,
            format!("invalid expression tag {}", tag),
        )),
    }
}

fn read_map(r: &mut BinReader<'_>) -> Result<NpnMap> {
    let at = r.offset();
    let ni = r.count(4, "map input count")?;
    let no = r.count(4, "map output count")?;
    let mut imap = Vec::with_capacity(ni);
    for _ in 0..ni {
        imap.push(InputMap::unpack(r.u32("map input")?));
    }
    let mut opol = Vec::with_capacity(no);
    for _ in 0..no {
        opol.push(r.bool32("map output")?);
    }
    NpnMap::new(imap, opol).map_err(|reason| TechlibError::corrupt(at, reason))
}

fn read_node(r: &mut BinReader<'_>, index: usize) -> Result<PgNode> {
    let at = r.offset();
    let word = r.u32("node header")?;
    let f0 = r.u32("node fanin")?;
    let f1 = r.u32("node fanin")?;
    let node_type = PgNodeType::from_tag(word & 3)
        .ok_or_else(|| TechlibError::corrupt(at, format!("invalid node type {}", word & 3)))?;
    let fanin = |packed: u32| -> Result<Fanin> {
        let f = Fanin::unpack(packed);
        if f.node.index() >= index {
            return Err(TechlibError::corrupt(
                at,
                format!("{} does not precede its consumer {}", f.node, NodeId::from_index(index)),
            ));
        }
        Ok(f)
    };
    match node_type {
        PgNodeType::Input => {
            let input_id = word >> 2;
            if input_id as usize != index || f0 != 0 || f1 != 0 {
                return Err(TechlibError::corrupt(
                    at,
                    format!("malformed input node {}", input_id),
                ));
            }
            Ok(PgNode::Input { input_id })
        }
        PgNodeType::And => Ok(PgNode::And([fanin(f0)?, fanin(f1)?])),
        PgNodeType::Xor => {
            let fanins = [fanin(f0)?, fanin(f1)?];
            if fanins.iter().any(|f| f.inverted) {
                return Err(TechlibError::corrupt(at, "inverted XOR fanin"));
            }
            Ok(PgNode::Xor(fanins))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::dump;
    use crate::config::BuildOptions;
    use crate::library::build_index;
    use crate::test_utils::sample_cells;

    fn sample() -> CellLibrary {
        build_index("sample", sample_cells(), &BuildOptions::default())
            .unwrap()
            .library
    }

    fn redump(lib: &CellLibrary) -> Result<CellLibrary> {
        let mut bytes = Vec::new();
        dump(lib, &mut bytes).unwrap();
        restore_from_bytes(&bytes)
    }

    #[test]
    fn test_repeated_automorphism_is_corrupt() {
        let mut lib = sample();
        let class = lib
            .classes
            .iter_mut()
            .find(|c| !c.automorphisms.is_empty())
            .unwrap();
        let first = class.automorphisms[0].clone();
        class.automorphisms.push(first);
        match redump(&lib) {
            Err(TechlibError::CorruptIndex { reason, .. }) => {
                assert!(reason.contains("repeats automorphism"), "{}", reason)
            }
            other => panic!("expected corrupt index, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_group_listed_twice_is_corrupt() {
        let mut lib = sample();
        let class = lib.classes.iter_mut().find(|c| c.groups.len() >= 2).unwrap();
        let first = class.groups[0];
        class.groups.push(first);
        match redump(&lib) {
            Err(TechlibError::CorruptIndex { reason, .. }) => {
                assert!(reason.contains("twice"), "{}", reason)
            }
            other => panic!("expected corrupt index, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unmodified_sample_restores() {
        let lib = sample();
        assert_eq!(redump(&lib).unwrap(), lib);
    }
}
