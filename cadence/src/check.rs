// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect checks: which changes wake an effect.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use cadence_diff::DiffInfo;
use cadence_state::{ItemId, ItemTypeId, PropId, Schema};
use smallvec::SmallVec;

use crate::error::UsageError;

/// One clause of an effect's check.
///
/// Each filter left empty matches anything. A clause matches a frame's
/// changes when some changed item passes every filter:
///
/// - `types`: the item's type is listed;
/// - `ids`: the item's id is listed;
/// - `props`: one of the item's changed properties is listed;
/// - `added_or_removed`: instead of property changes, the item was added
///   or removed (the `props` filter is then ignored).
///
/// ```rust
/// use cadence::Check;
///
/// let check = Check::new().item_type("counters").id("a").prop("value");
/// assert_eq!(check.prop_names(), ["value"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Check {
    types: Vec<String>,
    ids: Vec<ItemId>,
    props: Vec<String>,
    added_or_removed: bool,
}

impl Check {
    /// Creates a clause that matches any property change.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item type to the type filter.
    #[must_use]
    pub fn item_type(mut self, name: &str) -> Self {
        self.types.push(name.to_string());
        self
    }

    /// Adds an id to the id filter.
    #[must_use]
    pub fn id(mut self, id: impl Into<ItemId>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// Adds several ids to the id filter.
    #[must_use]
    pub fn ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ItemId>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Adds a property to the property filter.
    #[must_use]
    pub fn prop(mut self, name: &str) -> Self {
        self.props.push(name.to_string());
        self
    }

    /// Adds several properties to the property filter.
    #[must_use]
    pub fn props<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.props.extend(names.into_iter().map(ToString::to_string));
        self
    }

    /// Matches added or removed items instead of property changes.
    #[must_use]
    pub fn added_or_removed(mut self) -> Self {
        self.added_or_removed = true;
        self
    }

    /// Returns the type filter.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Returns the property filter.
    #[must_use]
    pub fn prop_names(&self) -> &[String] {
        &self.props
    }

    /// Returns the id filter.
    #[must_use]
    pub fn item_ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Returns `true` if the clause watches additions and removals.
    #[must_use]
    pub fn watches_added_or_removed(&self) -> bool {
        self.added_or_removed
    }
}

/// A [`Check`] with its names resolved against a schema.
///
/// `None` filters match anything; a `Some` filter that resolved to nothing
/// matches nothing.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolvedCheck {
    types: Option<SmallVec<[ItemTypeId; 2]>>,
    ids: Option<Vec<ItemId>>,
    props: Option<SmallVec<[(ItemTypeId, PropId); 4]>>,
    added_or_removed: bool,
}

impl ResolvedCheck {
    /// Resolves names, reporting and dropping the unknown ones.
    pub(crate) fn resolve(schema: &Schema, check: &Check) -> Self {
        let types = (!check.types.is_empty()).then(|| {
            check
                .types
                .iter()
                .filter_map(|name| {
                    let ty = schema.type_id(name);
                    if ty.is_none() {
                        UsageError::UnknownItemType(name.clone()).report();
                    }
                    ty
                })
                .collect::<SmallVec<[ItemTypeId; 2]>>()
        });
        let props = (!check.props.is_empty()).then(|| {
            let mut out: SmallVec<[(ItemTypeId, PropId); 4]> = SmallVec::new();
            for name in &check.props {
                let before = out.len();
                let candidates: SmallVec<[ItemTypeId; 8]> = match &types {
                    Some(types) => types.iter().copied().collect(),
                    None => schema.item_types().collect(),
                };
                for ty in candidates {
                    if let Some(prop) = schema.prop_id(ty, name) {
                        out.push((ty, prop));
                    }
                }
                if out.len() == before {
                    let item_type = match check.types.as_slice() {
                        [only] => only.clone(),
                        _ => "*".to_string(),
                    };
                    UsageError::UnknownProp {
                        item_type,
                        prop: name.clone(),
                    }
                    .report();
                }
            }
            out
        });
        Self {
            types,
            ids: (!check.ids.is_empty()).then(|| check.ids.clone()),
            props,
            added_or_removed: check.added_or_removed,
        }
    }

    fn id_passes(&self, id: &ItemId) -> bool {
        self.ids.as_ref().is_none_or(|ids| ids.contains(id))
    }

    /// Returns `true` if the changes in `diff` satisfy the clause.
    pub(crate) fn matches(&self, diff: &DiffInfo) -> bool {
        let types = match &self.types {
            Some(types) => types.as_slice(),
            None => diff.item_types_changed(),
        };
        for &ty in types {
            if !diff.type_changed(ty) {
                continue;
            }
            if self.added_or_removed {
                let mut lifecycle = diff.items_added(ty).iter().chain(diff.items_removed(ty));
                if lifecycle.any(|id| self.id_passes(id)) {
                    return true;
                }
                continue;
            }
            for id in diff.items_changed(ty) {
                if !self.id_passes(id) {
                    continue;
                }
                let Some(props) = &self.props else {
                    return true;
                };
                if diff
                    .props_changed(ty, id)
                    .iter()
                    .any(|&prop| props.contains(&(ty, prop)))
                {
                    return true;
                }
            }
        }
        false
    }
}

/// Returns `true` if any clause matches; an empty list always matches.
pub(crate) fn any_matches(checks: &[ResolvedCheck], diff: &DiffInfo) -> bool {
    checks.is_empty() || checks.iter().any(|check| check.matches(diff))
}
