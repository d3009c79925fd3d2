// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building patches and diffs from snapshots.

use alloc::string::ToString;
use alloc::vec::Vec;

use cadence_diff::{DiffInfo, DiffMode, compute_diff};
use cadence_state::{ItemId, ItemState, ItemTypeId, Schema, State, StateMap};

use crate::types::{Diff, IdLists, Patch};

/// Returns the patch that turns `prev` into `new`.
///
/// Both snapshots are compared in full. Changed values are taken from
/// `new`; added items contribute every property that differs from their
/// type's default state.
///
/// ```rust
/// use cadence_patch::{apply_patch_here, get_patch};
/// use cadence_state::{ItemTypeDef, Schema, State, Value};
///
/// let schema = Schema::builder()
///     .item_type(ItemTypeDef::new("counters").prop("value", 0))
///     .build()
///     .unwrap();
/// let (counters, value) = schema.resolve_path("counters.value").unwrap();
///
/// let before = State::new(&schema);
/// let mut after = State::new(&schema);
/// after.insert_default(&schema, counters, "a".into());
/// after.set(counters, "a", value, Value::from(3));
///
/// let patch = get_patch(&schema, &before, &after);
/// assert_eq!(patch.added["counters"].len(), 1);
/// assert_eq!(patch.changed["counters"]["a"]["value"], Value::from(3));
///
/// let mut replayed = before.clone();
/// apply_patch_here(&schema, &mut replayed, &patch);
/// assert_eq!(replayed.to_state_map(&schema), after.to_state_map(&schema));
/// ```
#[must_use]
pub fn get_patch(schema: &Schema, prev: &State, new: &State) -> Patch {
    let info = full_diff(schema, prev, new);
    let mut patch = Patch::new();
    for &ty in info.item_types_changed() {
        let name = schema.type_name(ty);
        push_ids(&mut patch.added, name, info.items_added(ty));
        push_ids(&mut patch.removed, name, info.items_removed(ty));
        write_changed(schema, &info, ty, new, &mut patch.changed);
        for id in info.items_added(ty) {
            if let Some(item) = new.item(ty, id) {
                write_non_defaults(schema, ty, id, item, &mut patch.changed);
            }
        }
    }
    patch
}

/// Returns the diff from `prev` to `new`: the forward patch plus the values
/// it overwrites.
#[must_use]
pub fn get_diff(schema: &Schema, prev: &State, new: &State) -> Diff {
    let info = full_diff(schema, prev, new);
    let mut diff = Diff::new();
    for &ty in info.item_types_changed() {
        let name = schema.type_name(ty);
        push_ids(&mut diff.added, name, info.items_added(ty));
        push_ids(&mut diff.removed, name, info.items_removed(ty));
        write_changed(schema, &info, ty, new, &mut diff.changed_next);
        write_changed(schema, &info, ty, prev, &mut diff.changed_prev);
        for id in info.items_added(ty) {
            if let Some(item) = new.item(ty, id) {
                write_non_defaults(schema, ty, id, item, &mut diff.changed_next);
            }
        }
        for id in info.items_removed(ty) {
            if let Some(item) = prev.item(ty, id) {
                write_non_defaults(schema, ty, id, item, &mut diff.changed_prev);
            }
        }
    }
    diff
}

/// Returns the forward patch from `prev` to `new` and its inverse.
#[must_use]
pub fn get_patch_and_reversed(schema: &Schema, prev: &State, new: &State) -> (Patch, Patch) {
    crate::combine::get_patches_from_diff(&get_diff(schema, prev, new))
}

/// Returns the patch that makes `current` match a partial snapshot.
///
/// Only the item types present in `target` are touched: their items missing
/// from `target` are removed, new ones are added, and the listed
/// properties are written where they differ. Properties not listed keep
/// their current values.
#[must_use]
pub fn get_patch_to_partial(schema: &Schema, current: &State, target: &StateMap) -> Patch {
    let mut patch = Patch::new();
    for (type_name, items) in target {
        let Some(ty) = schema.type_id(type_name) else {
            tracing::warn!(item_type = %type_name, "unknown item type in partial state");
            continue;
        };
        let existing = current.of_type(ty);
        let removed: Vec<ItemId> = existing
            .ids()
            .iter()
            .filter(|id| !items.contains_key(id.as_str()))
            .cloned()
            .collect();
        push_ids(&mut patch.removed, type_name, &removed);

        let mut added = Vec::new();
        for (id, props) in items {
            let base = match existing.get(id) {
                Some(item) => item.clone(),
                None => {
                    added.push(id.clone());
                    schema.default_state(ty, id)
                }
            };
            for (prop_name, value) in props {
                let Some(prop) = schema.prop_id(ty, prop_name) else {
                    tracing::warn!(item_type = %type_name, prop = %prop_name, "unknown property in partial state");
                    continue;
                };
                if base.get(prop) != Some(value) {
                    patch.set(type_name, id, prop_name, value.clone());
                }
            }
        }
        push_ids(&mut patch.added, type_name, &added);
    }
    patch
}

fn full_diff(schema: &Schema, prev: &State, new: &State) -> DiffInfo {
    let mut info = DiffInfo::new(schema);
    compute_diff(schema, new, prev, &mut info, DiffMode::CheckAll);
    info
}

fn push_ids(lists: &mut IdLists, name: &str, ids: &[ItemId]) {
    if !ids.is_empty() {
        lists.entry(name.to_string()).or_default().extend_from_slice(ids);
    }
}

/// Writes the changed properties of `ty` with their values in `source`.
fn write_changed(
    schema: &Schema,
    info: &DiffInfo,
    ty: ItemTypeId,
    source: &State,
    out: &mut StateMap,
) {
    let name = schema.type_name(ty);
    for id in info.items_changed(ty) {
        let Some(item) = source.item(ty, id) else {
            continue;
        };
        let props = out
            .entry(name.to_string())
            .or_default()
            .entry(id.clone())
            .or_default();
        for &prop in info.props_changed(ty, id) {
            if let Some(value) = item.get(prop) {
                props.insert(schema.prop_name(ty, prop).to_string(), value.clone());
            }
        }
    }
}

/// Writes every property of `item` that differs from its default state.
fn write_non_defaults(
    schema: &Schema,
    ty: ItemTypeId,
    id: &ItemId,
    item: &ItemState,
    out: &mut StateMap,
) {
    let defaults = schema.default_state(ty, id);
    let mut props = item
        .iter()
        .filter(|(prop, value)| defaults.get(*prop) != Some(*value))
        .peekable();
    if props.peek().is_none() {
        return;
    }
    let entry = out
        .entry(schema.type_name(ty).to_string())
        .or_default()
        .entry(id.clone())
        .or_default();
    for (prop, value) in props {
        entry.insert(schema.prop_name(ty, prop).to_string(), value.clone());
    }
}
