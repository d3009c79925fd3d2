// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `cadence_dirty` crate.
//!
//! Random mark sequences are checked against a plain set model, and the
//! containment invariant (a marked property implies a marked item and type)
//! is checked after every generation.

use std::collections::BTreeSet;

use cadence_dirty::{BitSet, ChangeRecorder};
use cadence_state::{ItemId, ItemTypeId, PropId};
use proptest::prelude::*;

const TYPES: u16 = 3;
const IDS: [&str; 4] = ["a", "b", "c", "d"];

fn mark() -> impl Strategy<Value = (u16, usize, u16)> {
    (0..TYPES, 0..IDS.len(), 0..5_u16)
}

proptest! {
    #[test]
    fn bitset_matches_a_set_model(ops in prop::collection::vec((any::<bool>(), 0..300_usize), 0..64)) {
        let mut bits = BitSet::new();
        let mut model = BTreeSet::new();
        for (insert, index) in ops {
            if insert {
                prop_assert_eq!(bits.insert(index), model.insert(index));
            } else {
                prop_assert_eq!(bits.remove(index), model.remove(&index));
            }
        }
        prop_assert_eq!(bits.len(), model.len());
        prop_assert_eq!(bits.iter().collect::<Vec<_>>(), model.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn marked_props_imply_marked_items_and_types(
        generations in prop::collection::vec(prop::collection::vec(mark(), 0..20), 1..4)
    ) {
        let mut rec = ChangeRecorder::with_type_count(TYPES as usize);
        for marks in generations {
            rec.reset();
            let mut model = BTreeSet::new();
            for (ty, id, prop) in &marks {
                let id = ItemId::from(IDS[*id]);
                rec.record(ItemTypeId::new(*ty), &id, PropId::new(*prop));
                model.insert((*ty, id, *prop));
            }
            prop_assert_eq!(rec.something_changed(), !marks.is_empty());
            for ty in 0..TYPES {
                let ty_id = ItemTypeId::new(ty);
                for name in IDS {
                    for prop in 0..5 {
                        let marked = model.contains(&(ty, ItemId::from(name), prop));
                        prop_assert_eq!(rec.prop_dirty(ty_id, name, PropId::new(prop)), marked);
                        if marked {
                            prop_assert!(rec.item_dirty(ty_id, name));
                            prop_assert!(rec.type_dirty(ty_id));
                        }
                    }
                    let listed = rec.dirty_items(ty_id).iter().any(|i| i.as_str() == name);
                    prop_assert_eq!(listed, rec.item_dirty(ty_id, name));
                }
            }
        }
    }
}

#[test]
fn reset_on_fresh_recorder_is_harmless() {
    let mut rec = ChangeRecorder::default();
    rec.reset();
    assert!(!rec.something_changed());
    assert!(rec.dirty_items(ItemTypeId::new(2)).is_empty());
    assert!(!rec.type_dirty(ItemTypeId::new(2)));
}
