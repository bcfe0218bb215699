// SPDX-License-Identifier: Apache-2.0

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use techlib::codec::{dump, restore};
use techlib::test_utils::{gate, sample_cells};
use techlib::{build_index, BuildOptions, Cell};

/// The sample library plus every 4-input AND/OR mix with some inputs
/// inverted, to give the classifier NPN variants to match.
fn wide_library() -> Vec<Cell> {
    let mut cells = sample_cells();
    let names = ["A", "B", "C", "D"];
    for mask in 0..16u32 {
        let lit = |i: usize| {
            if mask & (1 << i) != 0 {
                format!("!{}", names[i])
            } else {
                names[i].to_string()
            }
        };
        let f = format!("({} * {}) + ({} * {})", lit(0), lit(1), lit(2), lit(3));
        cells.push(gate(&format!("AO22_{}", mask), 2.0, &names, &f));
        let f = format!("({} + {}) * {} * {}", lit(0), lit(1), lit(2), lit(3));
        cells.push(gate(&format!("OA211_{}", mask), 2.0, &names, &f));
    }
    cells
}

fn build_index_benchmark(c: &mut Criterion) {
    let options = BuildOptions::default();
    c.bench_function("build_index_wide", |b| {
        b.iter_batched(
            wide_library,
            |cells| {
                let report = build_index("bench", cells, &options).unwrap();
                black_box(report.library.class_count());
            },
            BatchSize::SmallInput,
        )
    });

    let lib = build_index("bench", wide_library(), &options)
        .unwrap()
        .library;
    let mut bytes = Vec::new();
    dump(&lib, &mut bytes).unwrap();
    c.bench_function("dump", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(bytes.len());
            dump(&lib, &mut out).unwrap();
            black_box(out.len());
        })
    });
    c.bench_function("restore", |b| {
        b.iter(|| {
            let back = restore(Cursor::new(&bytes)).unwrap();
            black_box(back.pattern_count());
        })
    });
}

criterion_group!(benches, build_index_benchmark);
criterion_main!(benches);
