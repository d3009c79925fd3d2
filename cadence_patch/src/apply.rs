// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replaying patches onto snapshots.

use alloc::string::ToString;
use alloc::vec::Vec;

use cadence_state::{ItemId, ItemTypeId, Schema, State};

use crate::capture::get_patch;
use crate::types::{IdLists, Patch, contains_id};

/// Applies `patch` to an in-memory snapshot.
///
/// Removals run first, then additions (with the default state, skipped for
/// ids that already exist), then property writes. An id that is both
/// removed and added is therefore reset to its defaults before its writes
/// land. Writes to missing items and unknown names are skipped.
pub fn apply_patch_here(schema: &Schema, state: &mut State, patch: &Patch) {
    for (name, ids) in &patch.removed {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        for id in ids {
            state.remove_item(ty, id);
        }
    }
    for (name, ids) in &patch.added {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        for id in ids {
            if !state.contains(ty, id) {
                state.insert_default(schema, ty, id.clone());
            }
        }
    }
    for (name, items) in &patch.changed {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        for (id, props) in items {
            for (prop_name, value) in props {
                match schema.prop_id(ty, prop_name) {
                    Some(prop) => {
                        state.set(ty, id, prop, value.clone());
                    }
                    None => {
                        tracing::warn!(item_type = %name, prop = %prop_name, "unknown property in patch");
                    }
                }
            }
        }
    }
}

/// Returns the patch that undoes `patch` when applied after it to `state`.
///
/// Only the snapshot and the forward patch are needed: the snapshot is
/// cloned, the patch replayed onto the clone, and the two compared.
#[must_use]
pub fn get_reverse_patch(schema: &Schema, state: &State, patch: &Patch) -> Patch {
    let mut next = state.clone();
    apply_patch_here(schema, &mut next, patch);
    get_patch(schema, &next, state)
}

/// Drops the parts of `patch` that would not change `current`.
///
/// Writes equal to the current value are dropped, as are additions of
/// items that already exist and removals of items that do not. Items being
/// reset (removed and added) keep all their writes.
#[must_use]
pub fn make_minimal_patch(schema: &Schema, current: &State, patch: &Patch) -> Patch {
    let mut out = Patch::new();

    for (name, ids) in &patch.removed {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        keep_ids(&mut out.removed, name, ids, |id| current.contains(ty, id));
    }
    for (name, ids) in &patch.added {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        keep_ids(&mut out.added, name, ids, |id| {
            !current.contains(ty, id) || contains_id(&patch.removed, name, id)
        });
    }
    for (name, items) in &patch.changed {
        let Some(ty) = lookup(schema, name) else {
            continue;
        };
        for (id, props) in items {
            let existing = if contains_id(&patch.removed, name, id) {
                None
            } else {
                current.item(ty, id)
            };
            for (prop_name, value) in props {
                let unchanged = existing
                    .zip(schema.prop_id(ty, prop_name))
                    .is_some_and(|(item, prop)| item.get(prop) == Some(value));
                if !unchanged {
                    out.set(name, id, prop_name, value.clone());
                }
            }
        }
    }
    out
}

fn keep_ids(out: &mut IdLists, name: &str, ids: &[ItemId], keep: impl Fn(&str) -> bool) {
    let kept: Vec<_> = ids.iter().filter(|id| keep(id.as_str())).cloned().collect();
    if !kept.is_empty() {
        out.insert(name.to_string(), kept);
    }
}

fn lookup(schema: &Schema, name: &str) -> Option<ItemTypeId> {
    let ty = schema.type_id(name);
    if ty.is_none() {
        tracing::warn!(item_type = %name, "unknown item type in patch");
    }
    ty
}
