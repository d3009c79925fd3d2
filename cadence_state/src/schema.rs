// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item type schema.
//!
//! A [`Schema`] is built once, up front, by [`SchemaBuilder`]. It assigns
//! every item type an [`ItemTypeId`] and every property a per-type
//! [`PropId`] plus a flat index shared by all types, so change tracking can
//! use dense arrays instead of nested string maps.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::id::{ItemId, ItemTypeId, PropId};
use crate::refs::Refs;
use crate::state::ItemState;
use crate::value::Value;

/// Adjusts the default state of a freshly created item, given its id.
pub type StateFactory = Box<dyn Fn(&ItemId, &mut ItemState)>;

/// Builds the refs of a freshly created item from its id and initial state.
pub type RefsFactory = Box<dyn Fn(&ItemId, &ItemState) -> Refs>;

/// Error returned by [`SchemaBuilder::build`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Two item types share a name.
    DuplicateItemType(&'static str),
    /// One item type declares the same property twice.
    DuplicateProp {
        /// The item type.
        item_type: &'static str,
        /// The repeated property.
        prop: &'static str,
    },
    /// A type or property name is empty or contains a `.`.
    InvalidName(&'static str),
    /// More than `u16::MAX` item types were declared.
    TooManyItemTypes,
    /// An item type declares more than `u16::MAX` properties.
    TooManyProps(&'static str),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateItemType(name) => write!(f, "item type '{name}' is declared twice"),
            Self::DuplicateProp { item_type, prop } => {
                write!(f, "property '{prop}' is declared twice on '{item_type}'")
            }
            Self::InvalidName(name) => {
                write!(f, "'{name}' is not a valid name (empty or contains '.')")
            }
            Self::TooManyItemTypes => write!(f, "too many item types (max {})", u16::MAX),
            Self::TooManyProps(name) => {
                write!(f, "item type '{name}' has too many properties (max {})", u16::MAX)
            }
        }
    }
}

impl core::error::Error for SchemaError {}

/// Declaration of one item type, consumed by [`SchemaBuilder::item_type`].
///
/// ```rust
/// use cadence_state::{ItemTypeDef, PropId, Value};
///
/// let def = ItemTypeDef::new("characters")
///     .prop("hp", 10)
///     .prop("name", "")
///     .default_state(|id, state| {
///         state.set(PropId::new(1), Value::from(id.as_str()));
///     });
/// assert_eq!(def.name(), "characters");
/// ```
pub struct ItemTypeDef {
    name: &'static str,
    props: Vec<(&'static str, Value)>,
    state_factory: Option<StateFactory>,
    refs_factory: Option<RefsFactory>,
}

impl ItemTypeDef {
    /// Starts a declaration for the item type `name`.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            props: Vec::new(),
            state_factory: None,
            refs_factory: None,
        }
    }

    /// Returns the item type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declares a property with its default value.
    #[must_use]
    pub fn prop(mut self, name: &'static str, default: impl Into<Value>) -> Self {
        self.props.push((name, default.into()));
        self
    }

    /// Sets an id-dependent adjustment applied after the static defaults.
    #[must_use]
    pub fn default_state(mut self, factory: impl Fn(&ItemId, &mut ItemState) + 'static) -> Self {
        self.state_factory = Some(Box::new(factory));
        self
    }

    /// Sets the factory for the default refs of new items.
    #[must_use]
    pub fn default_refs(mut self, factory: impl Fn(&ItemId, &ItemState) -> Refs + 'static) -> Self {
        self.refs_factory = Some(Box::new(factory));
        self
    }
}

impl fmt::Debug for ItemTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemTypeDef")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("state_factory", &self.state_factory.is_some())
            .field("refs_factory", &self.refs_factory.is_some())
            .finish()
    }
}

/// Collects [`ItemTypeDef`]s and validates them into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: Vec<ItemTypeDef>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item type.
    #[must_use]
    pub fn item_type(mut self, def: ItemTypeDef) -> Self {
        self.types.push(def);
        self
    }

    /// Validates the declarations and assigns ids in declaration order.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.types.len() > usize::from(u16::MAX) {
            return Err(SchemaError::TooManyItemTypes);
        }
        let mut types = Vec::with_capacity(self.types.len());
        let mut by_name = HashMap::with_capacity(self.types.len());
        let mut flat_offset = 0;

        for (index, def) in self.types.into_iter().enumerate() {
            if !valid_name(def.name) {
                return Err(SchemaError::InvalidName(def.name));
            }
            if def.props.len() > usize::from(u16::MAX) {
                return Err(SchemaError::TooManyProps(def.name));
            }
            let id = type_at(index);
            if by_name.insert(def.name, id).is_some() {
                return Err(SchemaError::DuplicateItemType(def.name));
            }

            let mut prop_names = Vec::with_capacity(def.props.len());
            let mut props_by_name = HashMap::with_capacity(def.props.len());
            let mut defaults = Vec::with_capacity(def.props.len());
            for (prop_index, (prop, default)) in def.props.into_iter().enumerate() {
                if !valid_name(prop) {
                    return Err(SchemaError::InvalidName(prop));
                }
                let prop_id = prop_at(prop_index);
                if props_by_name.insert(prop, prop_id).is_some() {
                    return Err(SchemaError::DuplicateProp {
                        item_type: def.name,
                        prop,
                    });
                }
                prop_names.push(prop);
                defaults.push(default);
            }

            let prop_count = prop_names.len();
            types.push(ItemTypeInfo {
                name: def.name,
                prop_names,
                props_by_name,
                defaults: ItemState::from_values(defaults),
                flat_offset,
                state_factory: def.state_factory,
                refs_factory: def.refs_factory,
            });
            flat_offset += prop_count;
        }

        Ok(Schema {
            types,
            by_name,
            flat_prop_count: flat_offset,
        })
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.')
}

#[expect(clippy::cast_possible_truncation, reason = "type count is bounded at build time")]
fn type_at(slot: usize) -> ItemTypeId {
    ItemTypeId::new(slot as u16)
}

#[expect(clippy::cast_possible_truncation, reason = "prop count is bounded at build time")]
fn prop_at(slot: usize) -> PropId {
    PropId::new(slot as u16)
}

/// Registered information about one item type.
pub struct ItemTypeInfo {
    name: &'static str,
    prop_names: Vec<&'static str>,
    props_by_name: HashMap<&'static str, PropId>,
    defaults: ItemState,
    flat_offset: usize,
    state_factory: Option<StateFactory>,
    refs_factory: Option<RefsFactory>,
}

impl ItemTypeInfo {
    /// Returns the item type name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the property names, indexed by [`PropId`].
    #[must_use]
    #[inline]
    pub fn prop_names(&self) -> &[&'static str] {
        &self.prop_names
    }

    /// Returns the static default values.
    #[must_use]
    #[inline]
    pub fn static_defaults(&self) -> &ItemState {
        &self.defaults
    }
}

impl fmt::Debug for ItemTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemTypeInfo")
            .field("name", &self.name)
            .field("prop_names", &self.prop_names)
            .field("flat_offset", &self.flat_offset)
            .finish_non_exhaustive()
    }
}

/// The immutable set of item types known to a store.
///
/// Methods taking an [`ItemTypeId`] or [`PropId`] panic when handed an id
/// that did not come from this schema.
///
/// ```rust
/// use cadence_state::{ItemId, ItemTypeDef, SchemaBuilder, Value};
///
/// let schema = SchemaBuilder::new()
///     .item_type(ItemTypeDef::new("counters").prop("value", 0))
///     .item_type(ItemTypeDef::new("labels").prop("text", "").prop("value", 1))
///     .build()
///     .unwrap();
///
/// let (counters, value) = schema.resolve_path("counters.value").unwrap();
/// assert_eq!(schema.type_name(counters), "counters");
/// assert_eq!(schema.prop_name(counters, value), "value");
///
/// let labels = schema.type_id("labels").unwrap();
/// assert_eq!(schema.flat_prop_count(), 3);
/// assert_eq!(schema.flat_prop(labels, schema.prop_id(labels, "value").unwrap()), 2);
///
/// let state = schema.default_state(counters, &ItemId::from("a"));
/// assert_eq!(state.get(value), Some(&Value::from(0)));
/// ```
pub struct Schema {
    types: Vec<ItemTypeInfo>,
    by_name: HashMap<&'static str, ItemTypeId>,
    flat_prop_count: usize,
}

impl Schema {
    /// Starts a [`SchemaBuilder`].
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the number of item types.
    #[must_use]
    #[inline]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterates over all item type ids in declaration order.
    pub fn item_types(&self) -> impl ExactSizeIterator<Item = ItemTypeId> + '_ {
        (0..self.types.len()).map(type_at)
    }

    /// Looks up an item type by name.
    #[must_use]
    pub fn type_id(&self, name: &str) -> Option<ItemTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the registered information of an item type.
    #[must_use]
    #[inline]
    pub fn info(&self, ty: ItemTypeId) -> &ItemTypeInfo {
        &self.types[ty.slot()]
    }

    /// Returns the name of an item type.
    #[must_use]
    #[inline]
    pub fn type_name(&self, ty: ItemTypeId) -> &'static str {
        self.types[ty.slot()].name
    }

    /// Returns the number of properties of an item type.
    #[must_use]
    #[inline]
    pub fn prop_count(&self, ty: ItemTypeId) -> usize {
        self.types[ty.slot()].prop_names.len()
    }

    /// Iterates over the property ids of an item type.
    pub fn props(&self, ty: ItemTypeId) -> impl ExactSizeIterator<Item = PropId> + '_ {
        (0..self.prop_count(ty)).map(prop_at)
    }

    /// Looks up a property of an item type by name.
    #[must_use]
    pub fn prop_id(&self, ty: ItemTypeId, name: &str) -> Option<PropId> {
        self.types[ty.slot()].props_by_name.get(name).copied()
    }

    /// Returns the name of a property.
    #[must_use]
    #[inline]
    pub fn prop_name(&self, ty: ItemTypeId, prop: PropId) -> &'static str {
        self.types[ty.slot()].prop_names[prop.slot()]
    }

    /// Resolves a `"type.prop"` path.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Option<(ItemTypeId, PropId)> {
        let (type_name, prop_name) = path.split_once('.')?;
        let ty = self.type_id(type_name)?;
        Some((ty, self.prop_id(ty, prop_name)?))
    }

    /// Returns the index of a property among all properties of all types.
    #[must_use]
    #[inline]
    pub fn flat_prop(&self, ty: ItemTypeId, prop: PropId) -> usize {
        self.types[ty.slot()].flat_offset + prop.slot()
    }

    /// Returns the total number of properties across all types.
    #[must_use]
    #[inline]
    pub fn flat_prop_count(&self) -> usize {
        self.flat_prop_count
    }

    /// Builds the default state of a new item of type `ty` with id `id`.
    #[must_use]
    pub fn default_state(&self, ty: ItemTypeId, id: &ItemId) -> ItemState {
        let info = &self.types[ty.slot()];
        let mut state = info.defaults.clone();
        if let Some(factory) = &info.state_factory {
            factory(id, &mut state);
        }
        state
    }

    /// Builds the default refs of a new item from its initial state.
    #[must_use]
    pub fn default_refs(&self, ty: ItemTypeId, id: &ItemId, state: &ItemState) -> Refs {
        match &self.types[ty.slot()].refs_factory {
            Some(factory) => factory(id, state),
            None => Refs::empty(),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("types", &self.types)
            .field("flat_prop_count", &self.flat_prop_count)
            .finish_non_exhaustive()
    }
}
