// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! State snapshots.
//!
//! [`State`] is the dense, id-indexed form the store works on. [`StateMap`]
//! is the named, serializable form (`type -> id -> prop -> value`) used at
//! the edges: patches, partial snapshots, and tests.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::id::{ItemId, ItemTypeId, PropId};
use crate::schema::Schema;
use crate::value::Value;

/// Named property values of one item.
pub type PropsMap = BTreeMap<String, Value>;

/// Named property values of every item of one type, keyed by id.
pub type ItemsMap = BTreeMap<ItemId, PropsMap>;

/// Named state of several item types: `type -> id -> prop -> value`.
pub type StateMap = BTreeMap<String, ItemsMap>;

/// The property values of one item, indexed by [`PropId`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemState {
    values: SmallVec<[Value; 4]>,
}

impl ItemState {
    /// Creates an item state from values in [`PropId`] order.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Returns the number of properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the item has no properties.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a property value.
    #[must_use]
    #[inline]
    pub fn get(&self, prop: PropId) -> Option<&Value> {
        self.values.get(prop.slot())
    }

    /// Replaces a property value, returning the previous one.
    ///
    /// Returns `None` and stores nothing when `prop` is out of range.
    pub fn set(&mut self, prop: PropId, value: Value) -> Option<Value> {
        self.values
            .get_mut(prop.slot())
            .map(|slot| core::mem::replace(slot, value))
    }

    /// Iterates over `(PropId, value)` pairs.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (PropId, &Value)> + '_ {
        self.values.iter().enumerate().map(|(i, v)| {
            #[expect(clippy::cast_possible_truncation, reason = "prop count fits in u16")]
            let prop = PropId::new(i as u16);
            (prop, v)
        })
    }
}

/// Every item of one type: an id-keyed table plus the insertion order.
#[derive(Clone, Debug, Default)]
pub struct TypeState {
    items: HashMap<ItemId, ItemState>,
    order: Vec<ItemId>,
}

impl TypeState {
    /// Returns the number of items.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no items.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the item ids in insertion order.
    #[must_use]
    #[inline]
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Returns the first inserted id still present.
    #[must_use]
    pub fn first_id(&self) -> Option<&ItemId> {
        self.order.first()
    }

    /// Returns `true` if an item with `id` exists.
    #[must_use]
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Returns an item.
    #[must_use]
    #[inline]
    pub fn get(&self, id: &str) -> Option<&ItemState> {
        self.items.get(id)
    }

    /// Returns an item mutably.
    #[must_use]
    #[inline]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ItemState> {
        self.items.get_mut(id)
    }

    /// Inserts or replaces an item. A replaced item keeps its position.
    pub fn insert(&mut self, id: ItemId, state: ItemState) -> Option<ItemState> {
        let previous = self.items.insert(id.clone(), state);
        if previous.is_none() {
            self.order.push(id);
        }
        previous
    }

    /// Removes an item.
    pub fn remove(&mut self, id: &str) -> Option<ItemState> {
        let removed = self.items.remove(id)?;
        if let Some(pos) = self.order.iter().position(|o| o.as_str() == id) {
            self.order.remove(pos);
        }
        Some(removed)
    }

    /// Iterates over items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &ItemState)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id).map(|state| (id, state)))
    }

    /// Removes every item, keeping the allocations.
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
    }
}

/// A full snapshot: one [`TypeState`] per item type of a [`Schema`].
///
/// ```rust
/// use cadence_state::{ItemTypeDef, SchemaBuilder, State, Value};
///
/// let schema = SchemaBuilder::new()
///     .item_type(ItemTypeDef::new("counters").prop("value", 0))
///     .build()
///     .unwrap();
/// let (counters, value) = schema.resolve_path("counters.value").unwrap();
///
/// let mut state = State::new(&schema);
/// state.insert_default(&schema, counters, "a".into());
/// state.set(counters, "a", value, Value::from(3));
///
/// let mut prev = State::new(&schema);
/// prev.copy_from(&state);
/// assert_eq!(prev.get(counters, "a", value), Some(&Value::from(3)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct State {
    types: Vec<TypeState>,
}

impl State {
    /// Creates an empty snapshot with a slot for every type of `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self {
            types: (0..schema.type_count()).map(|_| TypeState::default()).collect(),
        }
    }

    /// Returns the number of type slots.
    #[must_use]
    #[inline]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Returns the items of one type.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is not a type of the schema this state was built for.
    #[must_use]
    #[inline]
    pub fn of_type(&self, ty: ItemTypeId) -> &TypeState {
        &self.types[ty.slot()]
    }

    /// Returns the items of one type mutably.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is not a type of the schema this state was built for.
    #[must_use]
    #[inline]
    pub fn of_type_mut(&mut self, ty: ItemTypeId) -> &mut TypeState {
        &mut self.types[ty.slot()]
    }

    /// Returns an item.
    #[must_use]
    pub fn item(&self, ty: ItemTypeId, id: &str) -> Option<&ItemState> {
        self.types.get(ty.slot())?.get(id)
    }

    /// Returns `true` if the item exists.
    #[must_use]
    pub fn contains(&self, ty: ItemTypeId, id: &str) -> bool {
        self.types.get(ty.slot()).is_some_and(|t| t.contains(id))
    }

    /// Returns one property of an item.
    #[must_use]
    pub fn get(&self, ty: ItemTypeId, id: &str, prop: PropId) -> Option<&Value> {
        self.item(ty, id)?.get(prop)
    }

    /// Sets one property of an existing item, returning the previous value.
    ///
    /// Returns `None` without storing anything when the item is missing.
    pub fn set(&mut self, ty: ItemTypeId, id: &str, prop: PropId, value: Value) -> Option<Value> {
        self.types.get_mut(ty.slot())?.get_mut(id)?.set(prop, value)
    }

    /// Inserts or replaces an item.
    pub fn insert_item(&mut self, ty: ItemTypeId, id: ItemId, state: ItemState) -> Option<ItemState> {
        self.types[ty.slot()].insert(id, state)
    }

    /// Inserts an item with the schema's default state for `id`.
    pub fn insert_default(&mut self, schema: &Schema, ty: ItemTypeId, id: ItemId) {
        let state = schema.default_state(ty, &id);
        self.insert_item(ty, id, state);
    }

    /// Removes an item.
    pub fn remove_item(&mut self, ty: ItemTypeId, id: &str) -> Option<ItemState> {
        self.types.get_mut(ty.slot())?.remove(id)
    }

    /// Overwrites this snapshot with `other`, reusing allocations.
    pub fn copy_from(&mut self, other: &Self) {
        self.types.clone_from(&other.types);
    }

    /// Converts to the named form, listing every property of every item.
    #[must_use]
    pub fn to_state_map(&self, schema: &Schema) -> StateMap {
        let mut out = StateMap::new();
        for ty in schema.item_types() {
            let items = self.of_type(ty);
            let entry = out.entry(schema.type_name(ty).to_string()).or_default();
            for (id, item) in items.iter() {
                let props = item
                    .iter()
                    .map(|(prop, value)| (schema.prop_name(ty, prop).to_string(), value.clone()))
                    .collect();
                entry.insert(id.clone(), props);
            }
        }
        out
    }

    /// Builds a snapshot from the named form.
    ///
    /// Items start from their default state, so properties missing from
    /// `map` keep their defaults. Unknown type and property names are skipped
    /// with a warning.
    #[must_use]
    pub fn from_state_map(schema: &Schema, map: &StateMap) -> Self {
        let mut state = Self::new(schema);
        for (type_name, items) in map {
            let Some(ty) = schema.type_id(type_name) else {
                tracing::warn!(item_type = %type_name, "unknown item type in state map");
                continue;
            };
            for (id, props) in items {
                let mut item = schema.default_state(ty, id);
                for (prop_name, value) in props {
                    match schema.prop_id(ty, prop_name) {
                        Some(prop) => {
                            item.set(prop, value.clone());
                        }
                        None => tracing::warn!(
                            item_type = %type_name,
                            prop = %prop_name,
                            "unknown property in state map"
                        ),
                    }
                }
                state.insert_item(ty, id.clone(), item);
            }
        }
        state
    }

    /// Extracts selected properties of every item of the selected types.
    ///
    /// `selection` lists `(type, props)` pairs. Unknown names are skipped
    /// with a warning.
    #[must_use]
    pub fn select(&self, schema: &Schema, selection: &[(&str, &[&str])]) -> StateMap {
        let mut out = StateMap::new();
        for (type_name, prop_names) in selection {
            let Some(ty) = schema.type_id(type_name) else {
                tracing::warn!(item_type = %type_name, "unknown item type in selection");
                continue;
            };
            let props: SmallVec<[(PropId, &str); 8]> = prop_names
                .iter()
                .filter_map(|name| {
                    let prop = schema.prop_id(ty, name);
                    if prop.is_none() {
                        tracing::warn!(item_type = %type_name, prop = %name, "unknown property in selection");
                    }
                    Some((prop?, *name))
                })
                .collect();
            let entry = out.entry((*type_name).to_string()).or_default();
            for (id, item) in self.of_type(ty).iter() {
                let values = props
                    .iter()
                    .filter_map(|(prop, name)| Some(((*name).to_string(), item.get(*prop)?.clone())))
                    .collect();
                entry.insert(id.clone(), values);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::schema::{ItemTypeDef, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
            .item_type(ItemTypeDef::new("counters").prop("value", 0).prop("step", 1))
            .item_type(ItemTypeDef::new("labels").prop("text", ""))
            .build()
            .unwrap()
    }

    #[test]
    fn insertion_order_survives_replace_and_remove() {
        let mut items = TypeState::default();
        items.insert("a".into(), ItemState::default());
        items.insert("b".into(), ItemState::default());
        items.insert("c".into(), ItemState::default());
        items.insert("a".into(), ItemState::from_values([Value::from(1)]));
        items.remove("b");
        let ids: Vec<&str> = items.ids().iter().map(ItemId::as_str).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(items.first_id().map(ItemId::as_str), Some("a"));
        assert!(items.remove("b").is_none());
    }

    #[test]
    fn set_on_missing_item_stores_nothing() {
        let schema = schema();
        let counters = schema.type_id("counters").unwrap();
        let mut state = State::new(&schema);
        assert!(state.set(counters, "ghost", PropId::new(0), Value::from(1)).is_none());
        assert!(!state.contains(counters, "ghost"));
    }

    #[test]
    fn state_map_fills_defaults_and_skips_unknown_names() {
        let schema = schema();
        let json = r#"{
            "counters": { "a": { "value": 4, "bogus": 1 } },
            "nope": { "x": {} }
        }"#;
        let map: StateMap = serde_json::from_str(json).unwrap();
        let state = State::from_state_map(&schema, &map);
        let counters = schema.type_id("counters").unwrap();
        assert_eq!(state.get(counters, "a", PropId::new(0)), Some(&Value::from(4)));
        assert_eq!(state.get(counters, "a", PropId::new(1)), Some(&Value::from(1)));

        let back = state.to_state_map(&schema);
        assert_eq!(back["counters"]["a"].len(), 2);
        assert!(back["labels"].is_empty());
    }

    #[test]
    fn select_keeps_only_requested_props() {
        let schema = schema();
        let counters = schema.type_id("counters").unwrap();
        let mut state = State::new(&schema);
        state.insert_default(&schema, counters, "a".into());
        let partial = state.select(&schema, &[("counters", &["step", "missing"])]);
        assert_eq!(partial.len(), 1);
        let props = &partial["counters"]["a"];
        assert_eq!(props.len(), 1);
        assert_eq!(props["step"], Value::from(1));
    }
}
