// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-generation change summary.

use alloc::vec::Vec;

use cadence_dirty::BitSet;
use cadence_state::{ItemId, ItemTypeId, PropId, Schema};
use hashbrown::{HashMap, HashSet};

/// Changed properties, as an ordered list with a membership mirror.
#[derive(Clone, Debug, Default)]
struct PropList {
    list: Vec<PropId>,
    bits: BitSet,
}

impl PropList {
    fn push(&mut self, prop: PropId) -> bool {
        let fresh = self.bits.insert(prop.slot());
        if fresh {
            self.list.push(prop);
        }
        fresh
    }

    fn clear(&mut self) {
        self.list.clear();
        self.bits.clear();
    }
}

#[derive(Clone, Debug, Default)]
struct TypeDiff {
    changed: Vec<ItemId>,
    added: Vec<ItemId>,
    removed: Vec<ItemId>,
    changed_set: HashSet<ItemId>,
    added_set: HashSet<ItemId>,
    removed_set: HashSet<ItemId>,
    item_props: HashMap<ItemId, PropList>,
    props: PropList,
}

impl TypeDiff {
    fn clear(&mut self) {
        // Only items changed in the last diff keep their property lists.
        let changed = &self.changed_set;
        self.item_props.retain(|id, _| changed.contains(id));
        for props in self.item_props.values_mut() {
            props.clear();
        }
        self.changed.clear();
        self.added.clear();
        self.removed.clear();
        self.changed_set.clear();
        self.added_set.clear();
        self.removed_set.clear();
        self.props.clear();
    }
}

/// What changed between a previous and a current snapshot.
///
/// Every category is kept as an ordered, de-duplicated list and as a
/// membership set, at item, type, and all-types granularity. The lists give
/// deterministic iteration; the sets give O(1) checks when matching effects.
///
/// An item listed as added or removed is never also listed as changed, and
/// carries no changed properties.
///
/// A `DiffInfo` is filled by [`compute_diff`](crate::compute_diff), which
/// clears it first and reuses its allocations.
#[derive(Clone, Debug, Default)]
pub struct DiffInfo {
    types: Vec<TypeDiff>,
    flat_offsets: Vec<usize>,
    types_changed: Vec<ItemTypeId>,
    types_changed_bits: BitSet,
    all_changed: Vec<(ItemTypeId, ItemId)>,
    all_added: Vec<(ItemTypeId, ItemId)>,
    all_removed: Vec<(ItemTypeId, ItemId)>,
    all_props: Vec<(ItemTypeId, PropId)>,
    all_props_bits: BitSet,
}

impl DiffInfo {
    /// Creates an empty diff laid out for `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        let mut info = Self::default();
        info.ensure_layout(schema);
        info
    }

    /// Makes sure there is a slot for every type of `schema`.
    pub(crate) fn ensure_layout(&mut self, schema: &Schema) {
        if self.types.len() < schema.type_count() {
            self.types.resize_with(schema.type_count(), TypeDiff::default);
        }
        if self.flat_offsets.len() != schema.type_count() {
            self.flat_offsets.clear();
            self.flat_offsets.extend(
                schema
                    .item_types()
                    .map(|ty| schema.flat_prop(ty, PropId::new(0))),
            );
        }
    }

    /// Empties every list and set, keeping allocations.
    pub fn clear(&mut self) {
        for ty in self.types_changed.drain(..) {
            if let Some(t) = self.types.get_mut(ty.slot()) {
                t.clear();
            }
        }
        self.types_changed_bits.clear();
        self.all_changed.clear();
        self.all_added.clear();
        self.all_removed.clear();
        self.all_props.clear();
        self.all_props_bits.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types_changed.is_empty()
    }

    fn touch_type(&mut self, ty: ItemTypeId) -> &mut TypeDiff {
        if self.types_changed_bits.insert(ty.slot()) {
            self.types_changed.push(ty);
        }
        if ty.slot() >= self.types.len() {
            self.types.resize_with(ty.slot() + 1, TypeDiff::default);
        }
        &mut self.types[ty.slot()]
    }

    pub(crate) fn push_added(&mut self, ty: ItemTypeId, id: &ItemId) {
        if self.touch_type(ty).added_set.insert(id.clone()) {
            self.types[ty.slot()].added.push(id.clone());
            self.all_added.push((ty, id.clone()));
        }
    }

    pub(crate) fn push_removed(&mut self, ty: ItemTypeId, id: &ItemId) {
        if self.touch_type(ty).removed_set.insert(id.clone()) {
            self.types[ty.slot()].removed.push(id.clone());
            self.all_removed.push((ty, id.clone()));
        }
    }

    pub(crate) fn push_prop_changed(&mut self, ty: ItemTypeId, id: &ItemId, prop: PropId) {
        let t = self.touch_type(ty);
        if t.changed_set.insert(id.clone()) {
            t.changed.push(id.clone());
            self.all_changed.push((ty, id.clone()));
        }
        let t = &mut self.types[ty.slot()];
        t.item_props.entry(id.clone()).or_default().push(prop);
        if t.props.push(prop) {
            let flat = self.flat_offsets.get(ty.slot()).copied().unwrap_or(0) + prop.slot();
            if self.all_props_bits.insert(flat) {
                self.all_props.push((ty, prop));
            }
        }
    }

    fn of_type(&self, ty: ItemTypeId) -> Option<&TypeDiff> {
        if self.types_changed_bits.contains(ty.slot()) {
            self.types.get(ty.slot())
        } else {
            None
        }
    }

    /// Returns the types with any change, addition, or removal, in the order
    /// they were first seen.
    #[must_use]
    #[inline]
    pub fn item_types_changed(&self) -> &[ItemTypeId] {
        &self.types_changed
    }

    /// Returns `true` if the type has any change, addition, or removal.
    #[must_use]
    #[inline]
    pub fn type_changed(&self, ty: ItemTypeId) -> bool {
        self.types_changed_bits.contains(ty.slot())
    }

    /// Returns the items of a type with at least one changed property.
    #[must_use]
    pub fn items_changed(&self, ty: ItemTypeId) -> &[ItemId] {
        self.of_type(ty).map(|t| t.changed.as_slice()).unwrap_or_default()
    }

    /// Returns the items of a type that were added.
    #[must_use]
    pub fn items_added(&self, ty: ItemTypeId) -> &[ItemId] {
        self.of_type(ty).map(|t| t.added.as_slice()).unwrap_or_default()
    }

    /// Returns the items of a type that were removed.
    #[must_use]
    pub fn items_removed(&self, ty: ItemTypeId) -> &[ItemId] {
        self.of_type(ty).map(|t| t.removed.as_slice()).unwrap_or_default()
    }

    /// Returns `true` if the item has at least one changed property.
    #[must_use]
    pub fn item_changed(&self, ty: ItemTypeId, id: &str) -> bool {
        self.of_type(ty).is_some_and(|t| t.changed_set.contains(id))
    }

    /// Returns `true` if the item was added.
    #[must_use]
    pub fn item_added(&self, ty: ItemTypeId, id: &str) -> bool {
        self.of_type(ty).is_some_and(|t| t.added_set.contains(id))
    }

    /// Returns `true` if the item was removed.
    #[must_use]
    pub fn item_removed(&self, ty: ItemTypeId, id: &str) -> bool {
        self.of_type(ty).is_some_and(|t| t.removed_set.contains(id))
    }

    /// Returns the changed properties of an item.
    #[must_use]
    pub fn props_changed(&self, ty: ItemTypeId, id: &str) -> &[PropId] {
        self.of_type(ty)
            .and_then(|t| t.item_props.get(id))
            .map(|p| p.list.as_slice())
            .unwrap_or_default()
    }

    /// Returns `true` if the property of the item changed.
    #[must_use]
    pub fn prop_changed(&self, ty: ItemTypeId, id: &str, prop: PropId) -> bool {
        self.of_type(ty)
            .and_then(|t| t.item_props.get(id))
            .is_some_and(|p| p.bits.contains(prop.slot()))
    }

    /// Returns the properties changed on any item of a type.
    #[must_use]
    pub fn type_props_changed(&self, ty: ItemTypeId) -> &[PropId] {
        self.of_type(ty).map(|t| t.props.list.as_slice()).unwrap_or_default()
    }

    /// Returns `true` if the property changed on any item of the type.
    #[must_use]
    pub fn type_prop_changed(&self, ty: ItemTypeId, prop: PropId) -> bool {
        self.of_type(ty).is_some_and(|t| t.props.bits.contains(prop.slot()))
    }

    /// Returns every changed item across all types.
    #[must_use]
    #[inline]
    pub fn all_items_changed(&self) -> &[(ItemTypeId, ItemId)] {
        &self.all_changed
    }

    /// Returns every added item across all types.
    #[must_use]
    #[inline]
    pub fn all_items_added(&self) -> &[(ItemTypeId, ItemId)] {
        &self.all_added
    }

    /// Returns every removed item across all types.
    #[must_use]
    #[inline]
    pub fn all_items_removed(&self) -> &[(ItemTypeId, ItemId)] {
        &self.all_removed
    }

    /// Returns every changed property across all types.
    #[must_use]
    #[inline]
    pub fn all_props_changed(&self) -> &[(ItemTypeId, PropId)] {
        &self.all_props
    }

    /// Returns `true` if the property changed on any item, looked up by the
    /// schema's flat property index.
    #[must_use]
    #[inline]
    pub fn flat_prop_changed(&self, flat: usize) -> bool {
        self.all_props_bits.contains(flat)
    }
}
