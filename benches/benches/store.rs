// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use cadence::{Check, Effect, ItemEffect, ItemTypeDef, Mutate, NewItem, Schema, Store, Value};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn store(n: usize, effects: usize) -> Store {
    let schema = Schema::builder()
        .item_type(ItemTypeDef::new("counters").prop("value", 0).prop("doubled", 0))
        .item_type(ItemTypeDef::new("totals").prop("sum", 0))
        .build()
        .unwrap();
    let mut store = Store::new(schema);
    for i in 0..n {
        store.add_item(NewItem::new("counters", format!("c{i}")));
    }
    store.add_item(NewItem::new("totals", "all"));

    store.start_item_effect(
        ItemEffect::new("counters", |change, ctx| {
            let doubled = change.new.as_i64().unwrap_or_default() * 2;
            ctx.set_state("counters.doubled", doubled, &change.id);
        })
        .prop("value"),
    );
    for _ in 0..effects {
        store.start_effect(
            Effect::new(|ctx| {
                let sum: i64 = ctx
                    .store()
                    .item_ids("counters")
                    .iter()
                    .filter_map(|id| ctx.get_value("counters.doubled", id)?.as_i64())
                    .sum();
                ctx.set_state("totals.sum", sum, "all");
            })
            .check(Check::new().item_type("counters").prop("doubled")),
        );
    }
    store.tick(Duration::ZERO);
    store
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("cadence_store");
    group.sample_size(30);

    const CASES: [(usize, usize, usize); 3] = [(100, 1, 1), (1_000, 10, 1), (1_000, 100, 8)];
    for (n, writes, effects) in CASES {
        group.bench_function(format!("tick(n={n},writes={writes},effects={effects})"), |b| {
            b.iter_batched(
                || {
                    let mut store = store(n, effects);
                    for i in 0..writes {
                        let id = format!("c{i}");
                        store.set_state("counters.value", Value::from(i as i64 + 1), &id);
                    }
                    store
                },
                |mut store| {
                    let report = store.tick(Duration::from_millis(16));
                    black_box(report);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.bench_function("idle_tick(n=1000)", |b| {
        let mut store = store(1_000, 1);
        let mut now = Duration::ZERO;
        b.iter(|| {
            now += Duration::from_millis(16);
            black_box(store.tick(now));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_store);
criterion_main!(benches);
