// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diff computation between two snapshots.

use cadence_dirty::ChangeRecorder;
use cadence_state::{ItemId, ItemState, ItemTypeId, Schema, State};

use crate::info::DiffInfo;

/// Which parts of the snapshots [`compute_diff`] looks at.
#[derive(Copy, Clone, Debug)]
pub enum DiffMode<'a> {
    /// Only the types, items, and properties marked in the recorder.
    ///
    /// Additions and removals must have been recorded at item level.
    Recorded(&'a ChangeRecorder),
    /// Every item and property of every type. Linear in the store size.
    CheckAll,
}

impl DiffMode<'_> {
    fn type_dirty(self, ty: ItemTypeId) -> bool {
        match self {
            Self::Recorded(rec) => rec.type_dirty(ty),
            Self::CheckAll => true,
        }
    }
}

/// Fills `diff` with the changes from `prev` to `now`.
///
/// `diff` is cleared first. For every type selected by `mode`:
///
/// - ids present in `prev` and absent from `now` are removed,
/// - ids present in `now` and absent from `prev` are added,
/// - every other selected id has its selected properties compared by value;
///   each difference is recorded once per item, type, and across all types.
///
/// # Example
///
/// ```
/// use cadence_diff::{DiffInfo, DiffMode, compute_diff};
/// use cadence_dirty::ChangeRecorder;
/// use cadence_state::{ItemId, ItemTypeDef, Schema, State, Value};
///
/// let schema = Schema::builder()
///     .item_type(ItemTypeDef::new("counters").prop("value", 0))
///     .build()
///     .unwrap();
/// let (counters, value) = schema.resolve_path("counters.value").unwrap();
/// let a = ItemId::from("a");
///
/// let mut prev = State::new(&schema);
/// prev.insert_default(&schema, counters, a.clone());
/// let mut now = prev.clone();
/// now.set(counters, "a", value, Value::from(5));
///
/// let mut recorder = ChangeRecorder::new(&schema);
/// recorder.record(counters, &a, value);
///
/// let mut diff = DiffInfo::new(&schema);
/// compute_diff(&schema, &now, &prev, &mut diff, DiffMode::Recorded(&recorder));
/// assert_eq!(diff.items_changed(counters), [a]);
/// assert_eq!(diff.props_changed(counters, "a"), [value]);
/// ```
pub fn compute_diff(
    schema: &Schema,
    now: &State,
    prev: &State,
    diff: &mut DiffInfo,
    mode: DiffMode<'_>,
) {
    diff.clear();
    diff.ensure_layout(schema);

    for ty in schema.item_types() {
        if !mode.type_dirty(ty) {
            continue;
        }
        let now_items = now.of_type(ty);
        let prev_items = prev.of_type(ty);

        match mode {
            DiffMode::CheckAll => {
                for id in prev_items.ids() {
                    if !now_items.contains(id) {
                        diff.push_removed(ty, id);
                    }
                }
                for id in now_items.ids() {
                    if !prev_items.contains(id) {
                        diff.push_added(ty, id);
                    }
                }
                for (id, item) in now_items.iter() {
                    let Some(prev_item) = prev_items.get(id) else {
                        continue;
                    };
                    for prop in schema.props(ty) {
                        if item.get(prop) != prev_item.get(prop) {
                            diff.push_prop_changed(ty, id, prop);
                        }
                    }
                }
            }
            DiffMode::Recorded(rec) => {
                let dirty = rec.dirty_items(ty);
                for id in dirty {
                    if prev_items.contains(id) && !now_items.contains(id) {
                        diff.push_removed(ty, id);
                    }
                }
                for id in dirty {
                    if now_items.contains(id) && !prev_items.contains(id) {
                        diff.push_added(ty, id);
                    }
                }
                for id in dirty {
                    let (Some(item), Some(prev_item)) = (now_items.get(id), prev_items.get(id))
                    else {
                        continue;
                    };
                    compare_recorded(rec, ty, id, item, prev_item, diff);
                }
            }
        }
    }
}

fn compare_recorded(
    rec: &ChangeRecorder,
    ty: ItemTypeId,
    id: &ItemId,
    item: &ItemState,
    prev_item: &ItemState,
    diff: &mut DiffInfo,
) {
    for prop in rec.dirty_props(ty, id) {
        if item.get(prop) != prev_item.get(prop) {
            diff.push_prop_changed(ty, id, prop);
        }
    }
}
