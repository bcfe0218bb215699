// SPDX-License-Identifier: Apache-2.0

use std::io::Seek;

use pretty_assertions::assert_eq;
use test_case::test_case;

use techlib::codec::{dump, restore, restore_from_bytes};
use techlib::logic::MAX_EXPR_DEPTH;
use techlib::test_utils::{gate, sample_cells};
use techlib::{build_index, BuildOptions, CellBuilder, CellKind, CellLibrary, Expr, TechlibError};

fn sample_library() -> CellLibrary {
    let _ = env_logger::builder().is_test(true).try_init();
    build_index("sample", sample_cells(), &BuildOptions::default())
        .unwrap()
        .library
}

fn dump_to_vec(lib: &CellLibrary) -> Vec<u8> {
    let mut bytes = Vec::new();
    dump(lib, &mut bytes).unwrap();
    bytes
}

#[test]
fn roundtrip_preserves_everything() {
    let lib = sample_library();
    let bytes = dump_to_vec(&lib);
    let back = restore(bytes.as_slice()).unwrap();
    assert_eq!(back, lib);
    // A second trip is byte-identical.
    assert_eq!(dump_to_vec(&back), bytes);
}

#[test]
fn roundtrip_through_a_file() {
    let lib = sample_library();
    let mut file = tempfile::tempfile().unwrap();
    dump(&lib, &mut file).unwrap();
    file.rewind().unwrap();
    let back = restore(&mut file).unwrap();
    assert_eq!(back.cell_count(), lib.cell_count());
    assert_eq!(back.class_count(), lib.class_count());
    assert_eq!(back, lib);
}

#[test]
fn roundtrip_without_patterns() {
    let options = BuildOptions {
        generate_patterns: false,
        ..BuildOptions::default()
    };
    let lib = build_index("bare", sample_cells(), &options).unwrap().library;
    let back = restore_from_bytes(&dump_to_vec(&lib)).unwrap();
    assert_eq!(back, lib);
}

#[test]
fn roundtrip_of_builtins_only() {
    let lib = build_index("empty", Vec::new(), &BuildOptions::default())
        .unwrap()
        .library;
    let back = restore_from_bytes(&dump_to_vec(&lib)).unwrap();
    assert_eq!(back, lib);
    assert_eq!(back.class_count(), 12);
}

#[test]
fn every_truncation_is_corrupt() {
    let lib = build_index(
        "small",
        vec![
            gate("NAND2", 1.0, &["A", "B"], "!(A * B)"),
            gate("XOR2", 2.0, &["A", "B"], "A ^ B"),
        ],
        &BuildOptions::default(),
    )
    .unwrap()
    .library;
    let bytes = dump_to_vec(&lib);
    for len in 0..bytes.len() {
        match restore_from_bytes(&bytes[..len]) {
            Err(TechlibError::CorruptIndex { offset, .. }) => {
                assert!(offset as usize <= len, "offset {} beyond {}", offset, len)
            }
            other => panic!("truncation at {} gave {:?}", len, other.map(|_| ())),
        }
    }
}

#[test]
fn trailing_bytes_are_corrupt() {
    let mut bytes = dump_to_vec(&sample_library());
    bytes.push(0);
    assert!(matches!(
        restore_from_bytes(&bytes),
        Err(TechlibError::CorruptIndex { .. })
    ));
}

/// Overwrites the last `u32` of the stream, which is the class id of the
/// last pattern.
#[test_case(u32::MAX ; "far out of range")]
#[test_case(1000 ; "just out of range")]
fn out_of_range_class_is_corrupt(value: u32) {
    let lib = sample_library();
    assert!(lib.pattern_count() > 0);
    let mut bytes = dump_to_vec(&lib);
    let at = bytes.len() - 4;
    bytes[at..].copy_from_slice(&value.to_le_bytes());
    match restore_from_bytes(&bytes) {
        Err(TechlibError::CorruptIndex { offset, .. }) => assert_eq!(offset as usize, at),
        other => panic!("expected corrupt index, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn wrong_pattern_class_is_corrupt() {
    let lib = sample_library();
    let mut bytes = dump_to_vec(&lib);
    let at = bytes.len() - 4;
    // Class 0 is const0, which no pattern can compute.
    bytes[at..].copy_from_slice(&0u32.to_le_bytes());
    assert!(matches!(
        restore_from_bytes(&bytes),
        Err(TechlibError::CorruptIndex { .. })
    ));
}

#[test]
fn bad_cell_type_is_corrupt() {
    let mut bytes = dump_to_vec(&sample_library());
    // name length + "sample" + cell count, then the first cell's type tag.
    let at = 4 + "sample".len() + 4;
    bytes[at] = 9;
    match restore_from_bytes(&bytes) {
        Err(TechlibError::CorruptIndex { offset, .. }) => assert_eq!(offset as usize, at),
        other => panic!("expected corrupt index, got {:?}", other.map(|_| ())),
    }
}

fn nested_and(levels: usize) -> Expr {
    let mut e = Expr::posi_literal(0);
    for _ in 0..levels {
        e = Expr::And(vec![e]);
    }
    e
}

/// Cells whose expressions the index could not store are rejected at build
/// time, so whatever is built always restores.
#[test_case(CellKind::Logic ; "logic cell")]
#[test_case(CellKind::Fsm ; "fsm cell")]
fn overly_nested_expression_never_reaches_the_index(kind: CellKind) {
    let make = |name: &str, levels: usize| {
        CellBuilder::new(name, 1.0)
            .input("A")
            .output_expr("Y", Some(nested_and(levels)), None)
            .kind(kind)
            .build()
            .unwrap()
    };
    let report = build_index(
        "deep",
        vec![make("DEEP", 300), make("AT_LIMIT", MAX_EXPR_DEPTH)],
        &BuildOptions::default(),
    )
    .unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert!(matches!(
        &report.rejected[0],
        TechlibError::MalformedSignature { cell, .. } if cell == "DEEP"
    ));
    let lib = report.library;
    assert_eq!(lib.cell_by_name("AT_LIMIT").map(|c| c.index()), Some(0));
    let back = restore_from_bytes(&dump_to_vec(&lib)).unwrap();
    assert_eq!(back, lib);
}
