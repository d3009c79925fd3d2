// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Usage errors.

use alloc::string::String;
use core::fmt;

/// A call the store could not carry out.
///
/// Usage errors never abort a frame: the offending operation is skipped
/// and the error is logged with [`UsageError::report`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsageError {
    /// A state path is not of the form `"type.prop"`.
    InvalidPath(String),
    /// No item type has this name.
    UnknownItemType(String),
    /// The item type has no property with this name.
    UnknownProp {
        /// The item type.
        item_type: String,
        /// The property name.
        prop: String,
    },
    /// No item of the type has this id.
    UnknownItem {
        /// The item type.
        item_type: String,
        /// The item id.
        id: String,
    },
    /// The item type has no items at all.
    NoItems(String),
    /// No step has this name.
    UnknownStep(String),
    /// No effect is registered under this id.
    UnknownEffect(String),
    /// The effect is registered but its body is running.
    EffectRunning(String),
    /// A rule set has no rule with this name.
    UnknownRule(String),
}

impl UsageError {
    /// Logs the error as a warning.
    pub fn report(&self) {
        tracing::warn!(error = %self, "skipping store operation");
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath(path) => write!(f, "'{path}' is not a 'type.prop' path"),
            Self::UnknownItemType(name) => write!(f, "unknown item type '{name}'"),
            Self::UnknownProp { item_type, prop } => {
                write!(f, "item type '{item_type}' has no property '{prop}'")
            }
            Self::UnknownItem { item_type, id } => {
                write!(f, "no '{item_type}' item with id '{id}'")
            }
            Self::NoItems(name) => write!(f, "item type '{name}' has no items"),
            Self::UnknownStep(name) => write!(f, "unknown step '{name}'"),
            Self::UnknownEffect(id) => write!(f, "no effect with id '{id}'"),
            Self::EffectRunning(id) => write!(f, "effect '{id}' is already running"),
            Self::UnknownRule(name) => write!(f, "no rule named '{name}'"),
        }
    }
}

impl core::error::Error for UsageError {}
