// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `cadence_diff` crate.
//!
//! Random write sequences are applied to a snapshot while being recorded,
//! and the recorded diff is checked for completeness and for the
//! added/changed exclusivity rule.

use cadence_diff::{DiffInfo, DiffMode, compute_diff};
use cadence_dirty::ChangeRecorder;
use cadence_state::{ItemId, ItemTypeDef, PropId, Schema, State, Value};
use proptest::prelude::*;

const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn schema() -> Schema {
    Schema::builder()
        .item_type(ItemTypeDef::new("units").prop("hp", 0).prop("x", 0).prop("y", 0))
        .item_type(ItemTypeDef::new("flags").prop("on", false))
        .build()
        .unwrap()
}

#[derive(Clone, Debug)]
enum Op {
    Set { ty: u16, id: usize, prop: u16, value: i64 },
    Add { ty: u16, id: usize },
    Remove { ty: u16, id: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..2_u16, 0..IDS.len(), 0..3_u16, -2..3_i64)
            .prop_map(|(ty, id, prop, value)| Op::Set { ty, id, prop, value }),
        1 => (0..2_u16, 0..IDS.len()).prop_map(|(ty, id)| Op::Add { ty, id }),
        1 => (0..2_u16, 0..IDS.len()).prop_map(|(ty, id)| Op::Remove { ty, id }),
    ]
}

/// Applies `ops` to `state` the way a store does, recording every write.
fn apply(schema: &Schema, state: &mut State, rec: &mut ChangeRecorder, ops: &[Op]) {
    for op in ops {
        match *op {
            Op::Set { ty, id, prop, value } => {
                let ty = schema.item_types().nth(ty as usize).unwrap();
                let prop = PropId::new(prop);
                if (prop.slot()) < schema.prop_count(ty) {
                    let id = ItemId::from(IDS[id]);
                    if state.set(ty, &id, prop, Value::from(value)).is_some() {
                        rec.record(ty, &id, prop);
                    }
                }
            }
            Op::Add { ty, id } => {
                let ty = schema.item_types().nth(ty as usize).unwrap();
                let id = ItemId::from(IDS[id]);
                state.insert_default(schema, ty, id.clone());
                rec.record_item(ty, &id);
                for prop in schema.props(ty) {
                    rec.record(ty, &id, prop);
                }
            }
            Op::Remove { ty, id } => {
                let ty = schema.item_types().nth(ty as usize).unwrap();
                let id = ItemId::from(IDS[id]);
                state.remove_item(ty, &id);
                rec.record_item(ty, &id);
            }
        }
    }
}

proptest! {
    #[test]
    fn recorded_diff_is_complete_and_exclusive(
        setup in prop::collection::vec(op(), 0..20),
        writes in prop::collection::vec(op(), 0..30),
    ) {
        let schema = schema();
        let mut prev = State::new(&schema);
        let mut scratch = ChangeRecorder::new(&schema);
        apply(&schema, &mut prev, &mut scratch, &setup);

        let mut now = prev.clone();
        let mut rec = ChangeRecorder::new(&schema);
        apply(&schema, &mut now, &mut rec, &writes);

        let mut diff = DiffInfo::new(&schema);
        compute_diff(&schema, &now, &prev, &mut diff, DiffMode::Recorded(&rec));

        for ty in schema.item_types() {
            for added in diff.items_added(ty) {
                prop_assert!(!diff.item_changed(ty, added));
                prop_assert!(!diff.item_removed(ty, added));
            }
            for (id, item) in now.of_type(ty).iter() {
                let Some(prev_item) = prev.item(ty, id) else {
                    prop_assert!(diff.item_added(ty, id));
                    continue;
                };
                for prop in schema.props(ty) {
                    let differs = item.get(prop) != prev_item.get(prop);
                    prop_assert_eq!(diff.prop_changed(ty, id, prop), differs);
                    if differs {
                        prop_assert!(rec.prop_dirty(ty, id, prop));
                        prop_assert!(diff.type_changed(ty));
                        prop_assert!(diff.type_prop_changed(ty, prop));
                        prop_assert!(diff.all_props_changed().contains(&(ty, prop)));
                        prop_assert!(diff.flat_prop_changed(schema.flat_prop(ty, prop)));
                    }
                }
            }
            for id in prev.of_type(ty).ids() {
                prop_assert_eq!(diff.item_removed(ty, id), !now.contains(ty, id));
            }
        }
    }

    #[test]
    fn recorded_and_check_all_agree_when_everything_is_recorded(
        setup in prop::collection::vec(op(), 0..20),
        writes in prop::collection::vec(op(), 0..30),
    ) {
        let schema = schema();
        let mut prev = State::new(&schema);
        let mut scratch = ChangeRecorder::new(&schema);
        apply(&schema, &mut prev, &mut scratch, &setup);
        let mut now = prev.clone();
        let mut rec = ChangeRecorder::new(&schema);
        apply(&schema, &mut now, &mut rec, &writes);

        let mut recorded = DiffInfo::new(&schema);
        compute_diff(&schema, &now, &prev, &mut recorded, DiffMode::Recorded(&rec));
        let mut full = DiffInfo::new(&schema);
        compute_diff(&schema, &now, &prev, &mut full, DiffMode::CheckAll);

        for ty in schema.item_types() {
            let mut a = recorded.items_changed(ty).to_vec();
            let mut b = full.items_changed(ty).to_vec();
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
            let mut a = recorded.items_added(ty).to_vec();
            let mut b = full.items_added(ty).to_vec();
            a.sort();
            b.sort();
            prop_assert_eq!(a, b);
            prop_assert_eq!(recorded.items_removed(ty).len(), full.items_removed(ty).len());
        }
    }
}

#[test]
fn diff_is_reused_across_generations() {
    let schema = schema();
    let units = schema.type_id("units").unwrap();
    let hp = schema.prop_id(units, "hp").unwrap();
    let a = ItemId::from("a");

    let mut prev = State::new(&schema);
    prev.insert_default(&schema, units, a.clone());
    let mut now = prev.clone();
    let mut rec = ChangeRecorder::new(&schema);
    let mut diff = DiffInfo::new(&schema);

    now.set(units, "a", hp, Value::from(3));
    rec.record(units, &a, hp);
    compute_diff(&schema, &now, &prev, &mut diff, DiffMode::Recorded(&rec));
    assert_eq!(diff.all_items_changed(), [(units, a.clone())]);

    prev.copy_from(&now);
    rec.reset();
    compute_diff(&schema, &now, &prev, &mut diff, DiffMode::Recorded(&rec));
    assert!(diff.is_empty());
    assert!(diff.all_items_changed().is_empty());
    assert!(!diff.prop_changed(units, "a", hp));
}
