// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cadence_diff::{DiffInfo, DiffMode, compute_diff};
use cadence_dirty::ChangeRecorder;
use cadence_state::{ItemId, ItemTypeDef, Schema, State, Value};

fn schema() -> Schema {
    Schema::builder()
        .item_type(
            ItemTypeDef::new("units")
                .prop("hp", 100)
                .prop("x", 0.0)
                .prop("y", 0.0)
                .prop("name", ""),
        )
        .build()
        .unwrap()
}

/// `n` units in `prev`, and `now` with `dirty` of them moved.
fn snapshots(schema: &Schema, n: usize, dirty: usize) -> (State, State, ChangeRecorder) {
    let units = schema.type_id("units").unwrap();
    let x = schema.prop_id(units, "x").unwrap();
    let mut prev = State::new(schema);
    for i in 0..n {
        prev.insert_default(schema, units, ItemId::from(format!("u{i}")));
    }
    let mut now = prev.clone();
    let mut recorder = ChangeRecorder::new(schema);
    // Spread the dirty items across the whole range.
    let stride = (n / dirty.max(1)).max(1);
    for i in (0..n).step_by(stride).take(dirty) {
        let id = ItemId::from(format!("u{i}"));
        now.set(units, &id, x, Value::from(1.0));
        recorder.record(units, &id, x);
    }
    (prev, now, recorder)
}

fn bench_diff(c: &mut Criterion) {
    let schema = schema();
    let mut group = c.benchmark_group("cadence_diff");
    group.sample_size(50);

    for &(n, dirty) in &[(1_000_usize, 1_usize), (1_000, 100), (10_000, 10), (10_000, 1_000)] {
        let (prev, now, recorder) = snapshots(&schema, n, dirty);
        let mut diff = DiffInfo::new(&schema);
        let label = format!("n={n},dirty={dirty}");

        group.bench_with_input(BenchmarkId::new("recorded", &label), &(), |b, ()| {
            b.iter(|| {
                compute_diff(&schema, &now, &prev, &mut diff, DiffMode::Recorded(&recorder));
                black_box(diff.all_props_changed().len());
            });
        });
        group.bench_with_input(BenchmarkId::new("check_all", &label), &(), |b, ()| {
            b.iter(|| {
                compute_diff(&schema, &now, &prev, &mut diff, DiffMode::CheckAll);
                black_box(diff.all_props_changed().len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_diff);
criterion_main!(benches);
