// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change recorder: which types, items, and properties were touched.

use alloc::vec::Vec;

use cadence_state::{ItemId, ItemTypeId, PropId, Schema};
use hashbrown::HashMap;

use crate::bits::BitSet;

#[derive(Clone, Debug, Default)]
struct ItemMarks {
    dirty: bool,
    props: BitSet,
}

#[derive(Clone, Debug, Default)]
struct TypeMarks {
    items: HashMap<ItemId, ItemMarks>,
    /// Ids marked since the last reset, in mark order.
    dirty_ids: Vec<ItemId>,
}

/// Records which item types, items, and properties changed in one
/// generation.
///
/// The recorder is a three-level structure: type, then item id, then
/// property. Marking a property also marks its item and type, and sets
/// [`something_changed`](Self::something_changed). [`reset`](Self::reset)
/// clears every mark in place and keeps the key space, so a recorder that
/// sees the same items every frame stops allocating.
///
/// Item ids are added on first mark, and type slots grow on demand, so a
/// recorder never misses a key that appeared after it was created.
///
/// # Example
///
/// ```
/// use cadence_dirty::ChangeRecorder;
/// use cadence_state::{ItemId, ItemTypeId, PropId};
///
/// let counters = ItemTypeId::new(0);
/// let value = PropId::new(0);
///
/// let mut recorder = ChangeRecorder::with_type_count(1);
/// recorder.record(counters, &ItemId::from("a"), value);
///
/// assert!(recorder.something_changed());
/// assert!(recorder.type_dirty(counters));
/// assert!(recorder.item_dirty(counters, "a"));
/// assert!(recorder.prop_dirty(counters, "a", value));
/// assert!(!recorder.item_dirty(counters, "b"));
///
/// recorder.reset();
/// assert!(!recorder.something_changed());
/// assert!(!recorder.prop_dirty(counters, "a", value));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ChangeRecorder {
    types: Vec<TypeMarks>,
    dirty_types: BitSet,
    dirty_type_list: Vec<ItemTypeId>,
    something_changed: bool,
    generation: u64,
}

impl ChangeRecorder {
    /// Creates a recorder with a slot for every type of `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self::with_type_count(schema.type_count())
    }

    /// Creates a recorder with `count` type slots.
    #[must_use]
    pub fn with_type_count(count: usize) -> Self {
        Self {
            types: (0..count).map(|_| TypeMarks::default()).collect(),
            dirty_types: BitSet::with_len(count),
            ..Self::default()
        }
    }

    /// Returns the current generation.
    ///
    /// The generation is incremented on every [`reset`](Self::reset).
    #[must_use]
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` if anything was marked since the last reset.
    #[must_use]
    #[inline]
    pub fn something_changed(&self) -> bool {
        self.something_changed
    }

    /// Marks an item type.
    pub fn record_type(&mut self, ty: ItemTypeId) {
        self.something_changed = true;
        if self.dirty_types.insert(ty.slot()) {
            self.dirty_type_list.push(ty);
        }
        if ty.slot() >= self.types.len() {
            self.types.resize_with(ty.slot() + 1, TypeMarks::default);
        }
    }

    /// Marks an item and its type.
    pub fn record_item(&mut self, ty: ItemTypeId, id: &ItemId) {
        self.item_marks(ty, id);
    }

    /// Marks a property, its item, and its type.
    pub fn record(&mut self, ty: ItemTypeId, id: &ItemId, prop: PropId) {
        self.item_marks(ty, id).props.insert(prop.slot());
    }

    fn item_marks(&mut self, ty: ItemTypeId, id: &ItemId) -> &mut ItemMarks {
        self.record_type(ty);
        let marks = &mut self.types[ty.slot()];
        let item = marks.items.entry(id.clone()).or_default();
        if !item.dirty {
            item.dirty = true;
            marks.dirty_ids.push(id.clone());
        }
        item
    }

    /// Returns `true` if the type was marked.
    #[must_use]
    #[inline]
    pub fn type_dirty(&self, ty: ItemTypeId) -> bool {
        self.dirty_types.contains(ty.slot())
    }

    /// Returns `true` if the item was marked.
    #[must_use]
    pub fn item_dirty(&self, ty: ItemTypeId, id: &str) -> bool {
        self.marks(ty, id).is_some_and(|m| m.dirty)
    }

    /// Returns `true` if the property was marked.
    #[must_use]
    pub fn prop_dirty(&self, ty: ItemTypeId, id: &str, prop: PropId) -> bool {
        self.marks(ty, id).is_some_and(|m| m.props.contains(prop.slot()))
    }

    /// Returns the marked types in mark order.
    #[must_use]
    #[inline]
    pub fn dirty_types(&self) -> &[ItemTypeId] {
        &self.dirty_type_list
    }

    /// Returns the marked items of a type in mark order.
    #[must_use]
    pub fn dirty_items(&self, ty: ItemTypeId) -> &[ItemId] {
        self.types
            .get(ty.slot())
            .map(|marks| marks.dirty_ids.as_slice())
            .unwrap_or_default()
    }

    /// Iterates over the marked properties of an item in [`PropId`] order.
    pub fn dirty_props(&self, ty: ItemTypeId, id: &str) -> impl Iterator<Item = PropId> + '_ {
        self.marks(ty, id)
            .into_iter()
            .flat_map(|m| m.props.iter())
            .map(prop_at)
    }

    fn marks(&self, ty: ItemTypeId, id: &str) -> Option<&ItemMarks> {
        self.types.get(ty.slot())?.items.get(id)
    }

    /// Clears every mark, keeping the key space and allocations.
    pub fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.something_changed = false;
        self.dirty_types.clear();
        self.dirty_type_list.clear();
        for marks in &mut self.types {
            for id in marks.dirty_ids.drain(..) {
                if let Some(item) = marks.items.get_mut(&id) {
                    item.dirty = false;
                    item.props.clear();
                }
            }
        }
    }

    /// Drops the key of an item that will not come back.
    ///
    /// Marks of the current generation are kept.
    pub fn forget_item(&mut self, ty: ItemTypeId, id: &str) {
        if let Some(marks) = self.types.get_mut(ty.slot())
            && marks.items.get(id).is_some_and(|m| !m.dirty)
        {
            marks.items.remove(id);
        }
    }

    /// Drops the key of an item even if it is marked. The type stays marked.
    pub fn discard_item(&mut self, ty: ItemTypeId, id: &str) {
        if let Some(marks) = self.types.get_mut(ty.slot()) {
            marks.items.remove(id);
        }
    }

    /// Returns the number of item keys held for a type, marked or not.
    #[must_use]
    pub fn key_count(&self, ty: ItemTypeId) -> usize {
        self.types.get(ty.slot()).map_or(0, |marks| marks.items.len())
    }
}

#[expect(clippy::cast_possible_truncation, reason = "marks come from PropIds")]
fn prop_at(slot: usize) -> PropId {
    PropId::new(slot as u16)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    const A: ItemTypeId = ItemTypeId::new(0);
    const B: ItemTypeId = ItemTypeId::new(1);

    #[test]
    fn marks_propagate_upward() {
        let mut rec = ChangeRecorder::with_type_count(2);
        rec.record(B, &"x".into(), PropId::new(3));
        assert!(rec.type_dirty(B));
        assert!(!rec.type_dirty(A));
        assert!(rec.item_dirty(B, "x"));
        assert_eq!(rec.dirty_props(B, "x").collect::<Vec<_>>(), [PropId::new(3)]);
        assert_eq!(rec.dirty_types(), [B]);
    }

    #[test]
    fn item_marks_without_props() {
        let mut rec = ChangeRecorder::with_type_count(1);
        rec.record_item(A, &"x".into());
        assert!(rec.item_dirty(A, "x"));
        assert_eq!(rec.dirty_props(A, "x").count(), 0);
        rec.record_type(A);
        assert_eq!(rec.dirty_types(), [A]);
    }

    #[test]
    fn dirty_items_keep_mark_order_and_dedupe() {
        let mut rec = ChangeRecorder::with_type_count(1);
        for id in ["c", "a", "c", "b", "a"] {
            rec.record(A, &id.into(), PropId::new(0));
        }
        let ids: Vec<&str> = rec.dirty_items(A).iter().map(ItemId::as_str).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn reset_keeps_keys_and_bumps_generation() {
        let mut rec = ChangeRecorder::with_type_count(1);
        rec.record(A, &"a".into(), PropId::new(0));
        rec.reset();
        assert_eq!(rec.generation(), 1);
        assert_eq!(rec.key_count(A), 1);
        assert!(rec.dirty_items(A).is_empty());
        assert!(rec.dirty_types().is_empty());

        rec.record(A, &"a".into(), PropId::new(1));
        assert!(!rec.prop_dirty(A, "a", PropId::new(0)));
        assert!(rec.prop_dirty(A, "a", PropId::new(1)));
    }

    #[test]
    fn type_slots_grow_on_demand() {
        let mut rec = ChangeRecorder::with_type_count(0);
        let far = ItemTypeId::new(9);
        rec.record(far, &"z".into(), PropId::new(0));
        assert!(rec.item_dirty(far, "z"));
        assert!(!rec.item_dirty(ItemTypeId::new(4), "z"));
    }

    #[test]
    fn forget_item_only_drops_clean_keys() {
        let mut rec = ChangeRecorder::with_type_count(1);
        rec.record(A, &"a".into(), PropId::new(0));
        rec.forget_item(A, "a");
        assert!(rec.item_dirty(A, "a"));
        rec.reset();
        rec.forget_item(A, "a");
        assert_eq!(rec.key_count(A), 0);
    }

    #[test]
    fn discard_item_drops_marked_keys() {
        let mut rec = ChangeRecorder::with_type_count(1);
        rec.record(A, &"a".into(), PropId::new(0));
        rec.discard_item(A, "a");
        assert_eq!(rec.key_count(A), 0);
        assert!(!rec.item_dirty(A, "a"));
        assert!(rec.type_dirty(A));
    }
}
