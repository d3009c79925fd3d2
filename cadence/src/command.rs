// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame command buffers.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use cadence_state::{ItemId, ItemTypeId, PropId, Refs, Value};

use crate::registry::Registration;

/// How a queued write computes its value.
pub(crate) enum Update {
    Value(Value),
    With(Box<dyn FnOnce(&Value) -> Value>),
}

/// A queued change to the store.
pub(crate) enum Command {
    SetProperty {
        ty: ItemTypeId,
        prop: PropId,
        /// `None` writes to the type's first item.
        id: Option<ItemId>,
        update: Update,
        /// Write to the type's first item when `id` is missing.
        fallback: bool,
    },
    AddItem {
        ty: ItemTypeId,
        id: ItemId,
        props: Vec<(PropId, Value)>,
        refs: Option<Refs>,
    },
    RemoveItem {
        ty: ItemTypeId,
        id: ItemId,
    },
    StartEffect(Registration),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetProperty { ty, prop, id, .. } => f
                .debug_struct("SetProperty")
                .field("ty", ty)
                .field("prop", prop)
                .field("id", id)
                .finish_non_exhaustive(),
            Self::AddItem { ty, id, props, .. } => f
                .debug_struct("AddItem")
                .field("ty", ty)
                .field("id", id)
                .field("props", props)
                .finish_non_exhaustive(),
            Self::RemoveItem { ty, id } => f
                .debug_struct("RemoveItem")
                .field("ty", ty)
                .field("id", id)
                .finish(),
            Self::StartEffect(registration) => {
                f.debug_tuple("StartEffect").field(&registration.id).finish()
            }
        }
    }
}

/// Commands waiting for the next flush, split by kind so each stage drains
/// its own buffer in FIFO order.
#[derive(Default)]
pub(crate) struct Commands {
    /// Effects that run once before being registered.
    pub(crate) at_start: Vec<Registration>,
    /// Start runs taken for the current pass and not yet run.
    pub(crate) start_queue: VecDeque<Registration>,
    pub(crate) effects: Vec<Registration>,
    pub(crate) items: Vec<Command>,
    pub(crate) sets: Vec<Command>,
}

impl Commands {
    pub(crate) fn push(&mut self, command: Command) {
        match command {
            Command::StartEffect(registration) => self.effects.push(registration),
            Command::AddItem { .. } | Command::RemoveItem { .. } => self.items.push(command),
            Command::SetProperty { .. } => self.sets.push(command),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.at_start.is_empty()
            && self.start_queue.is_empty()
            && self.effects.is_empty()
            && self.items.is_empty()
            && self.sets.is_empty()
    }

    /// Drops pending starts of an effect. Returns `true` if any existed.
    pub(crate) fn purge_effect(&mut self, id: &str) -> bool {
        let pending = |commands: &Self| {
            commands.at_start.len() + commands.start_queue.len() + commands.effects.len()
        };
        let before = pending(self);
        self.at_start.retain(|r| r.id.as_str() != id);
        self.start_queue.retain(|r| r.id.as_str() != id);
        self.effects.retain(|r| r.id.as_str() != id);
        before != pending(self)
    }

    /// Returns the last queued add (`Some(true)`) or remove (`Some(false)`)
    /// of an item.
    pub(crate) fn pending_lifecycle(&self, ty: ItemTypeId, id: &str) -> Option<bool> {
        self.items.iter().rev().find_map(|command| match command {
            Command::AddItem { ty: t, id: i, .. } if *t == ty && i.as_str() == id => Some(true),
            Command::RemoveItem { ty: t, id: i } if *t == ty && i.as_str() == id => Some(false),
            _ => None,
        })
    }
}

/// Splits `"type.prop"` into its halves.
pub(crate) fn split_path(path: &str) -> Option<(&str, &str)> {
    let (item_type, prop) = path.split_once('.')?;
    if item_type.is_empty() || prop.is_empty() || prop.contains('.') {
        return None;
    }
    Some((item_type, prop))
}
