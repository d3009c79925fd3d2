// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Patch`] and [`Diff`] records.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use cadence_state::{ItemId, PropsMap, StateMap, Value};
use serde::{Deserialize, Serialize};

/// Ordered item ids per item type name.
pub type IdLists = BTreeMap<String, Vec<ItemId>>;

/// A forward description of how to turn one snapshot into another.
///
/// - `removed`: ids to delete, per type.
/// - `added`: ids to create with their default state, per type.
/// - `changed`: property values to write afterwards, per type, id, and
///   property. Values for added items are the ones that differ from the
///   defaults.
///
/// Patches hold names, not ids, so they outlive any particular schema
/// layout and serialize without an envelope:
///
/// ```rust
/// use cadence_patch::Patch;
///
/// let json = r#"{"changed":{"counters":{"a":{"value":5}}},"added":{"counters":["b"]},"removed":{}}"#;
/// let patch: Patch = serde_json::from_str(json).unwrap();
/// assert_eq!(patch.added["counters"].len(), 1);
/// assert_eq!(serde_json::to_string(&patch).unwrap(), json);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patch {
    /// Property values to write, `type -> id -> prop -> value`.
    pub changed: StateMap,
    /// Ids to create, per type.
    pub added: IdLists,
    /// Ids to delete, per type.
    pub removed: IdLists,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if applying the patch does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lists_empty(&self.added) && lists_empty(&self.removed) && changes_empty(&self.changed)
    }

    /// Records a property write, replacing any earlier value.
    pub fn set(&mut self, item_type: &str, id: &ItemId, prop: &str, value: Value) {
        self.changed
            .entry(item_type.to_string())
            .or_default()
            .entry(id.clone())
            .or_default()
            .insert(prop.to_string(), value);
    }

    /// Returns the recorded writes of one item.
    #[must_use]
    pub fn changes_of(&self, item_type: &str, id: &str) -> Option<&PropsMap> {
        self.changed.get(item_type)?.get(id)
    }

    /// Returns `true` if the patch adds the item.
    #[must_use]
    pub fn adds(&self, item_type: &str, id: &str) -> bool {
        contains_id(&self.added, item_type, id)
    }

    /// Returns `true` if the patch removes the item.
    #[must_use]
    pub fn removes(&self, item_type: &str, id: &str) -> bool {
        contains_id(&self.removed, item_type, id)
    }
}

/// A patch together with the property values it overwrites.
///
/// `changed_prev` holds, for every item touched by `changed_next`, the
/// values before the change, and for every removed item its non-default
/// values. That is enough to build the inverse patch without the source
/// snapshot; see [`get_patches_from_diff`](crate::get_patches_from_diff).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Diff {
    /// Property values after the change.
    pub changed_next: StateMap,
    /// Property values before the change.
    pub changed_prev: StateMap,
    /// Ids created by the change, per type.
    pub added: IdLists,
    /// Ids deleted by the change, per type.
    pub removed: IdLists,
}

impl Diff {
    /// Creates an empty diff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the diff changes nothing in either direction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lists_empty(&self.added)
            && lists_empty(&self.removed)
            && changes_empty(&self.changed_next)
            && changes_empty(&self.changed_prev)
    }
}

fn lists_empty(lists: &IdLists) -> bool {
    lists.values().all(Vec::is_empty)
}

fn changes_empty(changes: &StateMap) -> bool {
    changes
        .values()
        .all(|items| items.values().all(BTreeMap::is_empty))
}

pub(crate) fn contains_id(lists: &IdLists, item_type: &str, id: &str) -> bool {
    lists
        .get(item_type)
        .is_some_and(|ids| ids.iter().any(|i| i.as_str() == id))
}
