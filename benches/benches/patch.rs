// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use cadence_patch::{Patch, combine_patches, get_patch, get_reverse_patch, make_minimal_patch};
use cadence_state::{ItemId, ItemTypeDef, Schema, State, Value};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn schema() -> Schema {
    Schema::builder()
        .item_type(ItemTypeDef::new("cells").prop("alive", false).prop("age", 0))
        .build()
        .unwrap()
}

/// A chain of `steps + 1` snapshots over an `n`-cell board where each step
/// toggles a sliding window of cells and removes one.
fn chain(schema: &Schema, n: usize, steps: usize) -> Vec<State> {
    let cells = schema.type_id("cells").unwrap();
    let alive = schema.prop_id(cells, "alive").unwrap();
    let age = schema.prop_id(cells, "age").unwrap();
    let mut state = State::new(schema);
    for i in 0..n {
        state.insert_default(schema, cells, ItemId::from(format!("c{i}")));
    }
    let mut out = vec![state.clone()];
    for step in 0..steps {
        for i in (step..n).step_by(7) {
            let id = format!("c{i}");
            let was = state.get(cells, &id, alive).and_then(Value::as_bool).unwrap_or_default();
            state.set(cells, &id, alive, Value::from(!was));
            state.set(cells, &id, age, Value::from(step as i64));
        }
        state.remove_item(cells, &format!("c{step}"));
        out.push(state.clone());
    }
    out
}

fn bench_patch(c: &mut Criterion) {
    let schema = schema();
    let mut group = c.benchmark_group("cadence_patch");
    group.sample_size(30);

    let states = chain(&schema, 2_000, 16);
    let patches: Vec<Patch> = states
        .windows(2)
        .map(|pair| get_patch(&schema, &pair[0], &pair[1]))
        .collect();

    group.bench_function("get_patch(n=2000)", |b| {
        b.iter(|| black_box(get_patch(&schema, &states[0], &states[1])));
    });
    group.bench_function("combine_patches(n=2000,len=16)", |b| {
        b.iter(|| black_box(combine_patches(&patches)));
    });
    group.bench_function("get_reverse_patch(n=2000)", |b| {
        b.iter(|| black_box(get_reverse_patch(&schema, &states[0], &patches[0])));
    });
    group.bench_function("make_minimal_patch(n=2000)", |b| {
        b.iter(|| black_box(make_minimal_patch(&schema, &states[1], &patches[0])));
    });

    group.finish();
}

criterion_group!(benches, bench_patch);
criterion_main!(benches);
