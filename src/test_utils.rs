// SPDX-License-Identifier: Apache-2.0

//! Small hand-written cell libraries for tests and benchmarks.

use crate::cell::{Cell, CellBuilder, InputCaps, OutputLimits, SeqSpec, Timing, TimingSense};

fn finish(b: CellBuilder) -> Cell {
    b.build()
        .unwrap_or_else(|e| panic!("sample cell does not build: {}", e))
}

fn caps(c: f64) -> InputCaps {
    InputCaps {
        capacitance: c,
        rise_capacitance: c,
        fall_capacitance: c * 0.9,
    }
}

fn arc(delay: f64) -> Timing {
    Timing {
        intrinsic_rise: delay,
        intrinsic_fall: delay * 0.8,
        slope_rise: 0.0,
        slope_fall: 0.0,
        rise_resistance: 1.2,
        fall_resistance: 0.9,
    }
}

/// Combinational gate over inputs `A`, `B`, ... with one output `Y`.
pub fn gate(name: &str, area: f64, inputs: &[&str], function: &str) -> Cell {
    let mut b = CellBuilder::new(name, area);
    for i in inputs {
        b = b.input_with_caps(i, caps(0.002));
    }
    finish(b.output("Y", function))
}

/// A library exercising every kind of cell the index distinguishes.
pub fn sample_cells() -> Vec<Cell> {
    vec![
        finish(CellBuilder::new("TIELO", 0.5).output("Y", "0")),
        finish(CellBuilder::new("TIEHI", 0.5).output("Y", "1")),
        finish(
            CellBuilder::new("INV_X1", 1.0)
                .input_with_caps("A", caps(0.0016))
                .output_with(
                    "Y",
                    Some("!A"),
                    None,
                    OutputLimits {
                        max_fanout: 8.0,
                        max_capacitance: 0.06,
                        max_transition: 0.5,
                        ..OutputLimits::default()
                    },
                )
                .timing("A", "Y", &[TimingSense::NegativeUnate], arc(0.012)),
        ),
        finish(
            CellBuilder::new("BUF_X1", 1.0)
                .input_with_caps("A", caps(0.0009))
                .output("Y", "A")
                .timing("A", "Y", &[TimingSense::PositiveUnate], arc(0.03)),
        ),
        finish(
            CellBuilder::new("NAND2_X1", 1.3)
                .input_with_caps("A", caps(0.0016))
                .input_with_caps("B", caps(0.0017))
                .output("Y", "!(A * B)")
                .timing("A", "Y", &[TimingSense::NegativeUnate], arc(0.015))
                .timing("B", "Y", &[TimingSense::NegativeUnate], arc(0.017)),
        ),
        gate("AND2_X1", 1.5, &["A", "B"], "A * B"),
        gate("NOR2_X1", 1.3, &["A", "B"], "!(A + B)"),
        gate("OR3_X1", 1.8, &["A", "B", "C"], "A + B + C"),
        gate("AND3_X1", 1.8, &["A", "B", "C"], "A * B * C"),
        finish(
            CellBuilder::new("XOR2_X1", 2.2)
                .input_with_caps("A", caps(0.003))
                .input_with_caps("B", caps(0.003))
                .output("Y", "A ^ B")
                .timing(
                    "A",
                    "Y",
                    &[TimingSense::PositiveUnate, TimingSense::NegativeUnate],
                    arc(0.04),
                ),
        ),
        gate("XNOR2_X1", 2.2, &["A", "B"], "!(A ^ B)"),
        gate("AOI21_X1", 1.6, &["A1", "A2", "B"], "!(A1 * A2 + B)"),
        gate("OAI21_X1", 1.6, &["A1", "A2", "B"], "!((A1 + A2) * B)"),
        gate("MUX2_X1", 2.5, &["A", "B", "S"], "(S * B) + (!S * A)"),
        gate("MAJ3_X1", 2.6, &["A", "B", "C"], "A * B + B * C + A * C"),
        finish(
            CellBuilder::new("TBUF_X1", 2.0)
                .input("A")
                .input("EN")
                .output_with("Y", Some("A"), Some("!EN"), OutputLimits::default()),
        ),
        finish(
            CellBuilder::new("DFF_X1", 4.5)
                .input_with_caps("D", caps(0.001))
                .input_with_caps("CK", caps(0.0009))
                .output("Q", "IQ")
                .output("QN", "IQN")
                .flip_flop(SeqSpec::new("D", "CK"))
                .timing("CK", "Q", &[TimingSense::PositiveUnate], arc(0.08)),
        ),
        finish(
            CellBuilder::new("DFFR_X1", 5.3)
                .input("D")
                .input("CK")
                .input("RN")
                .output("Q", "IQ")
                .flip_flop(SeqSpec::new("D", "CK").with_clear("!RN")),
        ),
        finish(
            CellBuilder::new("DFFRS_X1", 6.1)
                .input("D")
                .input("CK")
                .input("RN")
                .input("SN")
                .output("Q", "IQ")
                .flip_flop(
                    SeqSpec::new("D", "CK")
                        .with_clear("!RN")
                        .with_preset("!SN")
                        .with_clear_preset_vars(1, 0),
                ),
        ),
        finish(
            CellBuilder::new("DLH_X1", 3.2)
                .input("D")
                .input("G")
                .output("Q", "IQ")
                .latch(SeqSpec::new("D", "G")),
        ),
        finish(
            CellBuilder::new("BIDI_X1", 3.0)
                .input("A")
                .input("OE")
                .inout(
                    "PAD",
                    Some("A"),
                    Some("!OE"),
                    caps(0.004),
                    OutputLimits::default(),
                )
                .output("Y", "PAD"),
        ),
    ]
}
