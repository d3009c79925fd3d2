// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What a running effect can see and do.

use core::fmt;
use core::time::Duration;

use cadence_diff::DiffInfo;
use cadence_state::{ItemState, Refs, StateMap, Value};

use crate::effect::{Effect, EffectId, ItemEffect};
use crate::store::{Mutate, NewItem, Store};

/// Handed to an effect's body while it runs.
///
/// Reads go through [`store`](Self::store) or the shortcuts below; writes
/// go through [`Mutate`] and are queued like any other.
pub struct EffectContext<'a> {
    store: &'a mut Store,
    effect: EffectId,
    started: bool,
}

impl<'a> EffectContext<'a> {
    pub(crate) fn new(store: &'a mut Store, effect: EffectId, started: bool) -> Self {
        Self {
            store,
            effect,
            started,
        }
    }

    /// Returns the id of the running effect.
    #[must_use]
    pub fn effect_id(&self) -> &EffectId {
        &self.effect
    }

    /// Returns `true` if this is a `run_at_start` run rather than a reaction
    /// to changes.
    #[must_use]
    pub fn started(&self) -> bool {
        self.started
    }

    /// Returns the store, read-only.
    #[must_use]
    pub fn store(&self) -> &Store {
        self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut Store {
        self.store
    }

    /// Runs another registered effect now, against the current diff.
    pub fn run_effect_now(&mut self, id: &str) {
        self.store.run_effect_now(id);
    }

    /// Returns the changes the effect was matched against.
    #[must_use]
    pub fn diff_info(&self) -> &DiffInfo {
        self.store.diff_info()
    }

    /// Returns the duration of the current frame.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        self.store.frame_duration()
    }

    /// Returns an item's current state.
    #[must_use]
    pub fn get_state(&self, item_type: &str, id: &str) -> Option<&ItemState> {
        self.store.get_state(item_type, id)
    }

    /// Returns an item's state at the start of the frame.
    #[must_use]
    pub fn get_prev_state(&self, item_type: &str, id: &str) -> Option<&ItemState> {
        self.store.get_prev_state(item_type, id)
    }

    /// Returns the current state of the type's first item.
    #[must_use]
    pub fn get_first_state(&self, item_type: &str) -> Option<&ItemState> {
        self.store.get_first_state(item_type)
    }

    /// Returns one current property value of the type's first item.
    #[must_use]
    pub fn get_first_value(&self, path: &str) -> Option<&Value> {
        self.store.get_first_value(path)
    }

    /// Returns one current property value, addressed by `"type.prop"`.
    #[must_use]
    pub fn get_value(&self, path: &str, id: &str) -> Option<&Value> {
        self.store.get_value(path, id)
    }

    /// Returns one property value at the start of the frame.
    #[must_use]
    pub fn get_prev_value(&self, path: &str, id: &str) -> Option<&Value> {
        self.store.get_prev_value(path, id)
    }

    /// Returns an item's refs.
    #[must_use]
    pub fn get_refs(&self, item_type: &str, id: &str) -> Option<&Refs> {
        self.store.get_refs(item_type, id)
    }

    /// Returns an item's refs mutably.
    pub fn get_refs_mut(&mut self, item_type: &str, id: &str) -> Option<&mut Refs> {
        self.store.get_refs_mut(item_type, id)
    }
}

impl Mutate for EffectContext<'_> {
    fn set_state(&mut self, path: &str, value: impl Into<Value>, id: &str) {
        self.store.set_state(path, value, id);
    }

    fn set_first_state(&mut self, path: &str, value: impl Into<Value>) {
        self.store.set_first_state(path, value);
    }

    fn set_state_with(
        &mut self,
        path: &str,
        id: &str,
        update: impl FnOnce(&Value) -> Value + 'static,
    ) {
        self.store.set_state_with(path, id, update);
    }

    fn set_nested_state(&mut self, state: &StateMap) {
        self.store.set_nested_state(state);
    }

    fn add_item(&mut self, item: NewItem) {
        self.store.add_item(item);
    }

    fn remove_item(&mut self, item_type: &str, id: &str) {
        self.store.remove_item(item_type, id);
    }

    fn start_effect(&mut self, effect: Effect) -> EffectId {
        self.store.start_effect(effect)
    }

    fn start_item_effect(&mut self, effect: ItemEffect) -> EffectId {
        self.store.start_item_effect(effect)
    }

    fn stop_effect(&mut self, id: &str) {
        self.store.stop_effect(id);
    }

    fn on_next_tick(&mut self, callback: impl FnOnce(&mut Store) + 'static) {
        self.store.on_next_tick(callback);
    }
}

impl fmt::Debug for EffectContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("effect", &self.effect)
            .field("started", &self.started)
            .field("frame", &self.store.frame())
            .finish_non_exhaustive()
    }
}
