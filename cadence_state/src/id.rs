// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identification types for item types, properties, and items.
//!
//! [`ItemTypeId`] and [`PropId`] are compact indices handed out by
//! [`SchemaBuilder`](crate::SchemaBuilder) at build time. [`ItemId`] is the
//! string identity of one item within its type.

use alloc::string::String;
use alloc::sync::Arc;
use core::borrow::Borrow;
use core::fmt;
use core::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Index of an item type within a [`Schema`](crate::Schema).
///
/// # Example
///
/// ```rust
/// use cadence_state::ItemTypeId;
///
/// let ty = ItemTypeId::new(3);
/// assert_eq!(ty.index(), 3);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemTypeId(u16);

impl ItemTypeId {
    /// Creates an item type ID from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Returns the index as a `usize`, for slot lookups.
    #[must_use]
    #[inline]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ItemTypeId").field(&self.0).finish()
    }
}

/// Index of a property within one item type.
///
/// Property IDs are scoped to their item type: `PropId(0)` of one type is
/// unrelated to `PropId(0)` of another. Use
/// [`Schema::flat_prop`](crate::Schema::flat_prop) for a workspace-wide index.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropId(u16);

impl PropId {
    /// Creates a property ID from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Returns the index as a `usize`, for slot lookups.
    #[must_use]
    #[inline]
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropId").field(&self.0).finish()
    }
}

/// The identity of one item within its item type.
///
/// Cloning is a reference-count bump, so ids can be stored in several
/// ordered lists and lookup tables at once.
///
/// ```rust
/// use cadence_state::ItemId;
///
/// let id = ItemId::from("walker");
/// assert_eq!(id.as_str(), "walker");
/// assert_eq!(id, ItemId::from(String::from("walker")));
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(Arc<str>);

impl ItemId {
    /// Creates an item id.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ItemId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&ItemId> for ItemId {
    fn from(id: &Self) -> Self {
        id.clone()
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::format;
    use hashbrown::HashMap;

    #[test]
    fn ids_expose_their_index() {
        assert_eq!(ItemTypeId::new(7).index(), 7);
        assert_eq!(ItemTypeId::new(7).slot(), 7);
        assert_eq!(PropId::new(2).slot(), 2);
        assert_eq!(format!("{:?}", PropId::new(2)), "PropId(2)");
    }

    #[test]
    fn item_id_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ItemId::from("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), None);
    }

    #[test]
    fn item_id_serializes_as_plain_string() {
        let id = ItemId::from("hero");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"hero\"");
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
