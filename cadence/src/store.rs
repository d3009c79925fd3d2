// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The store: state, refs, queued commands, and registered effects.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::time::Duration;

use cadence_diff::DiffInfo;
use cadence_dirty::RecorderPair;
use cadence_patch::{Patch, get_patch_to_partial};
use cadence_state::{
    ItemId, ItemState, ItemTypeId, PropId, PropsMap, Refs, Schema, State, StateMap, Value,
};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::check::{Check, ResolvedCheck};
use crate::command::{Command, Commands, Update, split_path};
use crate::config::StoreConfig;
use crate::context::EffectContext;
use crate::effect::{Effect, EffectId, ItemChange, ItemEffect};
use crate::error::UsageError;
use crate::frame::FrameClock;
use crate::registry::{Registration, Registry};

/// Callback queued with [`Mutate::on_next_tick`].
pub type NextTickFn = Box<dyn FnOnce(&mut Store)>;

/// Called when the store goes from idle to having work for a frame.
pub type FrameRequestFn = Box<dyn FnMut()>;

/// The write surface shared by [`Store`] and [`EffectContext`].
///
/// Every method queues a command for the next frame and returns at once;
/// the one exception is [`stop_effect`](Self::stop_effect), which takes
/// effect immediately. Before the first frame, items are added and removed
/// immediately too.
pub trait Mutate {
    /// Queues a write of `value` to `path` (`"type.prop"`) on item `id`.
    ///
    /// If `id` no longer exists when the write applies, the type's first item
    /// is written instead and a warning is logged.
    fn set_state(&mut self, path: &str, value: impl Into<Value>, id: &str);

    /// Queues a write of `value` to `path` on whichever item of the type is
    /// first when the write applies.
    fn set_first_state(&mut self, path: &str, value: impl Into<Value>);

    /// Queues a write computed from the value current when it applies.
    fn set_state_with(
        &mut self,
        path: &str,
        id: &str,
        update: impl FnOnce(&Value) -> Value + 'static,
    );

    /// Queues a write for every `type -> id -> prop -> value` entry.
    fn set_nested_state(&mut self, state: &StateMap);

    /// Queues the creation of an item.
    fn add_item(&mut self, item: NewItem);

    /// Queues the removal of an item.
    fn remove_item(&mut self, item_type: &str, id: &str);

    /// Queues the registration of an effect and returns its id.
    fn start_effect(&mut self, effect: Effect) -> EffectId;

    /// Queues the registration of an item effect and returns its id.
    fn start_item_effect(&mut self, effect: ItemEffect) -> EffectId;

    /// Unregisters an effect and drops its pending starts.
    fn stop_effect(&mut self, id: &str);

    /// Queues a callback for the end of the next frame.
    fn on_next_tick(&mut self, callback: impl FnOnce(&mut Store) + 'static);
}

/// An item to create with [`Mutate::add_item`].
///
/// ```rust
/// use cadence::{NewItem, Refs};
///
/// let item = NewItem::new("counters", "b").prop("value", 3).refs(Refs::new(0_u32));
/// assert_eq!(item.id().as_str(), "b");
/// ```
#[derive(Debug)]
pub struct NewItem {
    item_type: String,
    id: ItemId,
    props: Vec<(String, Value)>,
    refs: Option<Refs>,
}

impl NewItem {
    /// Starts an item of `item_type` with its default state.
    #[must_use]
    pub fn new(item_type: &str, id: impl Into<ItemId>) -> Self {
        Self {
            item_type: item_type.to_string(),
            id: id.into(),
            props: Vec::new(),
            refs: None,
        }
    }

    /// Overrides one initial property.
    #[must_use]
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.push((name.to_string(), value.into()));
        self
    }

    /// Overrides several initial properties.
    #[must_use]
    pub fn props(mut self, props: &PropsMap) -> Self {
        self.props
            .extend(props.iter().map(|(name, value)| (name.clone(), value.clone())));
        self
    }

    /// Supplies refs instead of the type's default refs.
    #[must_use]
    pub fn refs(mut self, refs: Refs) -> Self {
        self.refs = Some(refs);
        self
    }

    /// Returns the item type name.
    #[must_use]
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// Returns the id.
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }
}

/// Read access to one item.
#[derive(Clone, Copy, Debug)]
pub struct ItemView<'a> {
    /// The current state.
    pub state: &'a ItemState,
    /// The state at the start of the frame, or the current one for items
    /// added this frame.
    pub prev: &'a ItemState,
    /// The refs, if the item has any.
    pub refs: Option<&'a Refs>,
}

/// A frame-synchronized item store.
///
/// Writes are queued and applied once per frame by [`tick`](Self::tick),
/// which then runs the effects whose checks match what changed.
///
/// ```rust
/// use core::time::Duration;
/// use cadence::{Check, Effect, ItemTypeDef, Mutate, NewItem, Schema, Store, Value};
///
/// let schema = Schema::builder()
///     .item_type(ItemTypeDef::new("counters").prop("value", 0))
///     .build()
///     .unwrap();
/// let mut store = Store::new(schema);
/// store.add_item(NewItem::new("counters", "a"));
/// store.start_effect(
///     Effect::new(|ctx| {
///         let value = ctx.get_value("counters.value", "a").cloned();
///         assert_eq!(value, Some(Value::from(5)));
///     })
///     .check(Check::new().item_type("counters").prop("value")),
/// );
///
/// store.set_state("counters.value", 5, "a");
/// store.tick(Duration::ZERO);
/// assert_eq!(store.get_value("counters.value", "a"), Some(&Value::from(5)));
/// ```
pub struct Store {
    pub(crate) schema: Schema,
    pub(crate) config: StoreConfig,
    pub(crate) now: State,
    pub(crate) prev: State,
    pub(crate) refs: Vec<HashMap<ItemId, Refs>>,
    pub(crate) recorders: RecorderPair,
    pub(crate) diff: DiffInfo,
    pub(crate) commands: Commands,
    pub(crate) effects: Registry,
    pub(crate) next_tick: Vec<NextTickFn>,
    pub(crate) clock: FrameClock,
    /// Items removed during the current frame.
    pub(crate) removed: Vec<(ItemTypeId, ItemId)>,
    /// The `run_at_start` effect being run, and whether it was stopped.
    pub(crate) starting: Option<(EffectId, bool)>,
    frame_request: Option<FrameRequestFn>,
    frame_requested: bool,
    pub(crate) in_frame: bool,
    pub(crate) started: bool,
}

impl Store {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, StoreConfig::default())
    }

    /// Creates a store.
    #[must_use]
    pub fn with_config(schema: Schema, config: StoreConfig) -> Self {
        let now = State::new(&schema);
        let prev = State::new(&schema);
        let refs = (0..schema.type_count()).map(|_| HashMap::new()).collect();
        let recorders = RecorderPair::new(&schema);
        let diff = DiffInfo::new(&schema);
        Self {
            schema,
            config,
            now,
            prev,
            refs,
            recorders,
            diff,
            commands: Commands::default(),
            effects: Registry::default(),
            next_tick: Vec::new(),
            clock: FrameClock::default(),
            removed: Vec::new(),
            starting: None,
            frame_request: None,
            frame_requested: false,
            in_frame: false,
            started: false,
        }
    }

    /// Installs the hook called when the store needs a frame.
    pub fn set_frame_request(&mut self, hook: impl FnMut() + 'static) {
        self.frame_request = Some(Box::new(hook));
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.now
    }

    /// Returns the state at the start of the current or last frame.
    #[must_use]
    pub fn prev_state(&self) -> &State {
        &self.prev
    }

    /// Returns what the last diff found.
    #[must_use]
    pub fn diff_info(&self) -> &DiffInfo {
        &self.diff
    }

    /// Returns the number of frames processed so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    /// Returns the duration of the current or last frame.
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        self.clock.duration()
    }

    /// Returns the item type names in declaration order.
    pub fn item_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schema.item_types().map(|ty| self.schema.type_name(ty))
    }

    /// Returns the ids of one type's items in insertion order.
    #[must_use]
    pub fn item_ids(&self, item_type: &str) -> &[ItemId] {
        match self.schema.type_id(item_type) {
            Some(ty) => self.now.of_type(ty).ids(),
            None => &[],
        }
    }

    /// Returns the state a new item of this type and id would start with.
    #[must_use]
    pub fn default_state(&self, item_type: &str, id: &str) -> Option<ItemState> {
        let ty = self.schema.type_id(item_type)?;
        Some(self.schema.default_state(ty, &ItemId::new(id)))
    }

    /// Returns an item's current state.
    #[must_use]
    pub fn get_state(&self, item_type: &str, id: &str) -> Option<&ItemState> {
        self.now.item(self.schema.type_id(item_type)?, id)
    }

    /// Returns an item's state at the start of the frame, falling back to
    /// the current state for items added since.
    #[must_use]
    pub fn get_prev_state(&self, item_type: &str, id: &str) -> Option<&ItemState> {
        let ty = self.schema.type_id(item_type)?;
        self.prev.item(ty, id).or_else(|| self.now.item(ty, id))
    }

    /// Returns the id of the type's first item in insertion order.
    #[must_use]
    pub fn first_id(&self, item_type: &str) -> Option<&ItemId> {
        self.now.of_type(self.schema.type_id(item_type)?).first_id()
    }

    /// Returns the current state of the type's first item.
    #[must_use]
    pub fn get_first_state(&self, item_type: &str) -> Option<&ItemState> {
        self.get_state(item_type, self.first_id(item_type)?)
    }

    /// Returns the state of the type's first item at the start of the frame.
    #[must_use]
    pub fn get_first_prev_state(&self, item_type: &str) -> Option<&ItemState> {
        self.get_prev_state(item_type, self.first_id(item_type)?)
    }

    /// Returns one current property value of the type's first item.
    #[must_use]
    pub fn get_first_value(&self, path: &str) -> Option<&Value> {
        let (item_type, _) = split_path(path)?;
        self.get_value(path, self.first_id(item_type)?)
    }

    /// Returns one current property value, addressed by `"type.prop"`.
    #[must_use]
    pub fn get_value(&self, path: &str, id: &str) -> Option<&Value> {
        let (ty, prop) = self.schema.resolve_path(path)?;
        self.now.get(ty, id, prop)
    }

    /// Returns one property value at the start of the frame.
    #[must_use]
    pub fn get_prev_value(&self, path: &str, id: &str) -> Option<&Value> {
        let (ty, prop) = self.schema.resolve_path(path)?;
        self.prev.get(ty, id, prop).or_else(|| self.now.get(ty, id, prop))
    }

    /// Returns an item's refs.
    #[must_use]
    pub fn get_refs(&self, item_type: &str, id: &str) -> Option<&Refs> {
        let ty = self.schema.type_id(item_type)?;
        self.refs.get(ty.slot())?.get(id)
    }

    /// Returns the refs of the type's first item.
    #[must_use]
    pub fn get_first_refs(&self, item_type: &str) -> Option<&Refs> {
        self.get_refs(item_type, self.first_id(item_type)?)
    }

    /// Returns an item's refs mutably.
    pub fn get_refs_mut(&mut self, item_type: &str, id: &str) -> Option<&mut Refs> {
        let ty = self.schema.type_id(item_type)?;
        self.refs.get_mut(ty.slot())?.get_mut(id)
    }

    /// Returns an item's state, previous state, and refs together.
    #[must_use]
    pub fn get_item(&self, item_type: &str, id: &str) -> Option<ItemView<'_>> {
        let ty = self.schema.type_id(item_type)?;
        let state = self.now.item(ty, id)?;
        Some(ItemView {
            state,
            prev: self.prev.item(ty, id).unwrap_or(state),
            refs: self.refs.get(ty.slot()).and_then(|refs| refs.get(id)),
        })
    }

    /// Returns `true` if an add of the item is the last queued change to it.
    #[must_use]
    pub fn item_will_be_added(&self, item_type: &str, id: &str) -> bool {
        self.schema
            .type_id(item_type)
            .is_some_and(|ty| self.commands.pending_lifecycle(ty, id) == Some(true))
    }

    /// Returns `true` if a removal of the item is the last queued change to
    /// it.
    #[must_use]
    pub fn item_will_be_removed(&self, item_type: &str, id: &str) -> bool {
        self.schema
            .type_id(item_type)
            .is_some_and(|ty| self.commands.pending_lifecycle(ty, id) == Some(false))
    }

    /// Returns `true` if the item will exist once queued changes apply.
    #[must_use]
    pub fn item_will_exist(&self, item_type: &str, id: &str) -> bool {
        self.schema.type_id(item_type).is_some_and(|ty| {
            self.commands
                .pending_lifecycle(ty, id)
                .unwrap_or_else(|| self.now.contains(ty, id))
        })
    }

    /// Returns the selected properties of every item of the selected types.
    ///
    /// `selection` lists `(type, props)` pairs.
    #[must_use]
    pub fn partial_state(&self, selection: &[(&str, &[&str])]) -> StateMap {
        self.now.select(&self.schema, selection)
    }

    /// Queues the changes that make the current state match `target` for
    /// the item types `target` mentions.
    pub fn apply_state(&mut self, target: &StateMap) {
        let patch = get_patch_to_partial(&self.schema, &self.now, target);
        self.apply_patch(&patch);
    }

    /// Queues the removals, additions, and writes of a patch.
    ///
    /// Added items start with their patched properties. An item that is
    /// added but already exists (and is not being removed) only gets writes.
    pub fn apply_patch(&mut self, patch: &Patch) {
        for (item_type, ids) in &patch.removed {
            for id in ids {
                self.remove_item(item_type, id);
            }
        }
        let mut created: HashSet<(&str, &str)> = HashSet::new();
        for (item_type, ids) in &patch.added {
            for id in ids {
                if !patch.removes(item_type, id) && self.item_will_exist(item_type, id) {
                    continue;
                }
                let mut item = NewItem::new(item_type, id);
                if let Some(props) = patch.changes_of(item_type, id) {
                    item = item.props(props);
                }
                self.add_item(item);
                created.insert((item_type.as_str(), id.as_str()));
            }
        }
        for (item_type, items) in &patch.changed {
            let Some(ty) = report(self.type_id(item_type)) else {
                continue;
            };
            for (id, props) in items {
                if created.contains(&(item_type.as_str(), id.as_str())) {
                    continue;
                }
                for (prop_name, value) in props {
                    let Some(prop) = report(self.prop_id(ty, prop_name)) else {
                        continue;
                    };
                    self.push(Command::SetProperty {
                        ty,
                        prop,
                        id: Some(id.clone()),
                        update: Update::Value(value.clone()),
                        fallback: false,
                    });
                }
            }
        }
    }

    /// Runs a registered effect now, against the current diff.
    ///
    /// An effect cannot run inside its own body.
    pub fn run_effect_now(&mut self, id: &str) {
        report(self.try_run_effect(id));
    }

    pub(crate) fn try_run_effect(&mut self, id: &str) -> Result<(), UsageError> {
        if self.run_effect(id, false) {
            Ok(())
        } else if self.effects.contains(id) {
            Err(UsageError::EffectRunning(id.to_string()))
        } else {
            Err(UsageError::UnknownEffect(id.to_string()))
        }
    }

    /// Returns `true` if an effect is registered under `id`.
    #[must_use]
    pub fn has_effect(&self, id: &str) -> bool {
        self.effects.contains(id)
    }

    /// Returns the registered effect ids in registration order.
    #[must_use]
    pub fn effect_ids(&self) -> &[EffectId] {
        self.effects.ids()
    }

    /// Returns `true` if commands or callbacks are waiting for a frame.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.commands.is_empty() || !self.next_tick.is_empty()
    }

    pub(crate) fn type_id(&self, name: &str) -> Result<ItemTypeId, UsageError> {
        self.schema
            .type_id(name)
            .ok_or_else(|| UsageError::UnknownItemType(name.to_string()))
    }

    pub(crate) fn prop_id(&self, ty: ItemTypeId, name: &str) -> Result<PropId, UsageError> {
        self.schema
            .prop_id(ty, name)
            .ok_or_else(|| UsageError::UnknownProp {
                item_type: self.schema.type_name(ty).to_string(),
                prop: name.to_string(),
            })
    }

    fn resolve_path(&self, path: &str) -> Result<(ItemTypeId, PropId), UsageError> {
        let (item_type, prop) =
            split_path(path).ok_or_else(|| UsageError::InvalidPath(path.to_string()))?;
        let ty = self.type_id(item_type)?;
        Ok((ty, self.prop_id(ty, prop)?))
    }

    pub(crate) fn push(&mut self, command: Command) {
        self.commands.push(command);
        self.request_frame();
    }

    pub(crate) fn request_frame(&mut self) {
        if self.in_frame || self.frame_requested {
            return;
        }
        self.frame_requested = true;
        if let Some(hook) = &mut self.frame_request {
            hook();
        }
    }

    pub(crate) fn frame_started(&mut self) {
        self.in_frame = true;
        self.started = true;
        self.frame_requested = false;
    }

    /// Runs one effect's body. Returns `false` if it is not registered or
    /// is already running.
    pub(crate) fn run_effect(&mut self, id: &str, started: bool) -> bool {
        let Some(mut loan) = self.effects.lend(id) else {
            return false;
        };
        tracing::trace!(effect = %loan.id, "running effect");
        {
            let mut ctx = EffectContext::new(self, loan.id.clone(), started);
            (loan.run)(&mut ctx);
        }
        self.effects.give_back(loan);
        true
    }

    /// Runs a body that is not registered.
    pub(crate) fn run_detached(&mut self, mut effect: Effect) {
        let id = effect.id.clone().unwrap_or_else(|| self.effects.auto_id());
        let mut ctx = EffectContext::new(self, id, false);
        (effect.run)(&mut ctx);
    }

    /// Runs the queued `run_at_start` effects once, then queues their
    /// registration.
    ///
    /// Starts queued by a start run wait for the next pass. The rest stay in
    /// `commands` until they run, so a start run can still stop them.
    pub(crate) fn run_started_effects(&mut self) {
        let Commands {
            at_start,
            start_queue,
            ..
        } = &mut self.commands;
        start_queue.extend(at_start.drain(..));
        while let Some(mut registration) = self.commands.start_queue.pop_front() {
            self.starting = Some((registration.id.clone(), false));
            tracing::trace!(effect = %registration.id, "running effect at start");
            {
                let mut ctx = EffectContext::new(self, registration.id.clone(), true);
                (registration.run)(&mut ctx);
            }
            let stopped = self.starting.take().is_some_and(|(_, stopped)| stopped);
            if !stopped {
                self.commands.effects.push(registration);
            }
        }
    }

    pub(crate) fn flush_effects(&mut self) {
        for registration in core::mem::take(&mut self.commands.effects) {
            self.effects.insert(registration);
        }
    }

    pub(crate) fn flush_items(&mut self) {
        for command in core::mem::take(&mut self.commands.items) {
            match command {
                Command::AddItem { ty, id, props, refs } => self.apply_add(ty, id, props, refs),
                Command::RemoveItem { ty, id } => self.apply_remove(ty, id),
                Command::SetProperty { .. } | Command::StartEffect(_) => {}
            }
        }
    }

    pub(crate) fn flush_sets(&mut self) {
        for command in core::mem::take(&mut self.commands.sets) {
            if let Command::SetProperty {
                ty,
                prop,
                id,
                update,
                fallback,
            } = command
            {
                self.apply_set(ty, prop, id, update, fallback);
            }
        }
    }

    fn apply_add(
        &mut self,
        ty: ItemTypeId,
        id: ItemId,
        props: Vec<(PropId, Value)>,
        refs: Option<Refs>,
    ) {
        let mut state = self.schema.default_state(ty, &id);
        for (prop, value) in props {
            state.set(prop, value);
        }
        let slot = ty.slot();
        let existed = self.now.contains(ty, &id);
        if existed {
            tracing::debug!(
                item_type = self.schema.type_name(ty),
                id = %id,
                "item added twice, resetting its state"
            );
        }
        match refs {
            Some(refs) => {
                self.refs[slot].insert(id.clone(), refs);
            }
            None if !existed || !self.refs[slot].contains_key(&id) => {
                let refs = self.schema.default_refs(ty, &id, &state);
                self.refs[slot].insert(id.clone(), refs);
            }
            None => {}
        }
        self.now.insert_item(ty, id.clone(), state);
        self.recorders.record_item(ty, &id);
        for prop in self.schema.props(ty) {
            self.recorders.record(ty, &id, prop);
        }
    }

    fn apply_remove(&mut self, ty: ItemTypeId, id: ItemId) {
        if self.now.remove_item(ty, &id).is_none() {
            UsageError::UnknownItem {
                item_type: self.schema.type_name(ty).to_string(),
                id: id.to_string(),
            }
            .report();
            return;
        }
        if !self.in_frame {
            // Before the first frame there is nothing to diff against.
            self.refs[ty.slot()].remove(&id);
            self.recorders.discard_item(ty, &id);
            return;
        }
        self.recorders.record_item(ty, &id);
        // Refs of items the frame started with live until the frame ends.
        if !self.prev.contains(ty, &id) {
            self.refs[ty.slot()].remove(&id);
        }
        self.removed.push((ty, id));
    }

    fn apply_set(
        &mut self,
        ty: ItemTypeId,
        prop: PropId,
        id: Option<ItemId>,
        update: Update,
        fallback: bool,
    ) {
        let first = self.now.of_type(ty).first_id().cloned();
        let id = match (id, first) {
            (Some(id), _) if self.now.contains(ty, &id) => id,
            (None, Some(first)) => first,
            (None, None) => {
                UsageError::NoItems(self.schema.type_name(ty).to_string()).report();
                return;
            }
            (Some(id), first) => match first {
                Some(first) if fallback => {
                    tracing::warn!(
                        item_type = self.schema.type_name(ty),
                        id = %id,
                        fallback = %first,
                        "unknown item, writing to the first item instead"
                    );
                    first
                }
                Some(_) => {
                    UsageError::UnknownItem {
                        item_type: self.schema.type_name(ty).to_string(),
                        id: id.to_string(),
                    }
                    .report();
                    return;
                }
                None => {
                    UsageError::NoItems(self.schema.type_name(ty).to_string()).report();
                    return;
                }
            },
        };
        let Some(current) = self.now.get(ty, &id, prop) else {
            return;
        };
        let value = match update {
            Update::Value(value) => value,
            Update::With(update) => update(current),
        };
        if *current == value {
            return;
        }
        self.now.set(ty, &id, prop, value);
        self.recorders.record(ty, &id, prop);
    }

    /// Drops the refs and recorder keys of items removed this frame for good.
    ///
    /// Both recorders must already be reset.
    pub(crate) fn release_removed(&mut self) {
        for (ty, id) in core::mem::take(&mut self.removed) {
            if self.now.contains(ty, &id) {
                continue;
            }
            self.refs[ty.slot()].remove(&id);
            self.recorders.forget_item(ty, &id);
        }
    }

    /// Resolves an item effect into a plain effect that fans out per
    /// changed property.
    fn item_effect_body(&self, effect: ItemEffect, id: EffectId) -> Option<Effect> {
        let ty = report(self.type_id(&effect.item_type))?;
        let props: Option<SmallVec<[PropId; 4]>> = (!effect.props.is_empty()).then(|| {
            effect
                .props
                .iter()
                .filter_map(|name| self.schema.prop_id(ty, name))
                .collect()
        });
        let check = Check::new()
            .item_type(&effect.item_type)
            .ids(effect.ids.iter())
            .props(effect.props.iter().map(String::as_str));
        let ItemEffect {
            ids,
            becomes,
            phase,
            step,
            run_at_start,
            run: mut item_run,
            ..
        } = effect;
        let mut plain = Effect::new(move |ctx| {
            let changes = item_changes(ctx.store(), ty, &ids, props.as_deref(), ctx.started());
            for change in changes {
                if becomes.accepts(&change.new, &change.prev) {
                    item_run(&change, ctx);
                }
            }
        })
        .id(id)
        .check(check)
        .phase(phase);
        if let Some(step) = step {
            plain = plain.step(&step);
        }
        if run_at_start {
            plain = plain.run_at_start();
        }
        Some(plain)
    }
}

/// Collects the `(item, prop)` changes an item effect sees.
///
/// On a start run every current item and watched property is reported.
fn item_changes(
    store: &Store,
    ty: ItemTypeId,
    ids: &[ItemId],
    props: Option<&[PropId]>,
    started: bool,
) -> Vec<ItemChange> {
    let id_passes = |id: &ItemId| ids.is_empty() || ids.contains(id);
    let prop_passes = |prop: &PropId| props.is_none_or(|props| props.contains(prop));
    let mut out = Vec::new();
    let mut push = |id: &ItemId, prop: PropId| {
        let Some(new) = store.now.get(ty, id, prop) else {
            return;
        };
        let prev = store.prev.get(ty, id, prop).unwrap_or(new);
        out.push(ItemChange {
            id: id.clone(),
            prop: store.schema.prop_name(ty, prop),
            new: new.clone(),
            prev: prev.clone(),
        });
    };
    if started {
        for id in store.now.of_type(ty).ids().iter().filter(|&id| id_passes(id)) {
            for prop in store.schema.props(ty).filter(|prop| prop_passes(prop)) {
                push(id, prop);
            }
        }
    } else {
        for id in store.diff.items_changed(ty).iter().filter(|&id| id_passes(id)) {
            for prop in store.diff.props_changed(ty, id).iter().filter(|&prop| prop_passes(prop)) {
                push(id, *prop);
            }
        }
    }
    out
}

/// Logs a usage error and turns it into `None`.
pub(crate) fn report<T>(result: Result<T, UsageError>) -> Option<T> {
    result.map_err(|err| err.report()).ok()
}

impl Mutate for Store {
    fn set_state(&mut self, path: &str, value: impl Into<Value>, id: &str) {
        let Some((ty, prop)) = report(self.resolve_path(path)) else {
            return;
        };
        self.push(Command::SetProperty {
            ty,
            prop,
            id: Some(ItemId::new(id)),
            update: Update::Value(value.into()),
            fallback: true,
        });
    }

    fn set_first_state(&mut self, path: &str, value: impl Into<Value>) {
        let Some((ty, prop)) = report(self.resolve_path(path)) else {
            return;
        };
        self.push(Command::SetProperty {
            ty,
            prop,
            id: None,
            update: Update::Value(value.into()),
            fallback: true,
        });
    }

    fn set_state_with(
        &mut self,
        path: &str,
        id: &str,
        update: impl FnOnce(&Value) -> Value + 'static,
    ) {
        let Some((ty, prop)) = report(self.resolve_path(path)) else {
            return;
        };
        self.push(Command::SetProperty {
            ty,
            prop,
            id: Some(ItemId::new(id)),
            update: Update::With(Box::new(update)),
            fallback: true,
        });
    }

    fn set_nested_state(&mut self, state: &StateMap) {
        for (item_type, items) in state {
            let Some(ty) = report(self.type_id(item_type)) else {
                continue;
            };
            for (id, props) in items {
                for (prop_name, value) in props {
                    let Some(prop) = report(self.prop_id(ty, prop_name)) else {
                        continue;
                    };
                    self.push(Command::SetProperty {
                        ty,
                        prop,
                        id: Some(id.clone()),
                        update: Update::Value(value.clone()),
                        fallback: true,
                    });
                }
            }
        }
    }

    fn add_item(&mut self, item: NewItem) {
        let Some(ty) = report(self.type_id(&item.item_type)) else {
            return;
        };
        let props: Vec<(PropId, Value)> = item
            .props
            .into_iter()
            .filter_map(|(name, value)| Some((report(self.prop_id(ty, &name))?, value)))
            .collect();
        if self.started {
            self.push(Command::AddItem {
                ty,
                id: item.id,
                props,
                refs: item.refs,
            });
        } else {
            self.apply_add(ty, item.id, props, item.refs);
        }
    }

    fn remove_item(&mut self, item_type: &str, id: &str) {
        let Some(ty) = report(self.type_id(item_type)) else {
            return;
        };
        if self.started {
            self.push(Command::RemoveItem {
                ty,
                id: ItemId::new(id),
            });
        } else {
            self.apply_remove(ty, ItemId::new(id));
        }
    }

    fn start_effect(&mut self, effect: Effect) -> EffectId {
        let Effect {
            id,
            checks,
            phase,
            step,
            run_at_start,
            run,
        } = effect;
        let id = id.unwrap_or_else(|| self.effects.auto_id());
        let step = match step {
            None => self.config.default_step(),
            Some(name) => match self.config.step_index(&name) {
                Some(step) => step,
                None => {
                    UsageError::UnknownStep(name).report();
                    return id;
                }
            },
        };
        let checks = checks
            .iter()
            .map(|check| ResolvedCheck::resolve(&self.schema, check))
            .collect();
        let registration = Registration {
            id: id.clone(),
            checks,
            phase,
            step,
            run,
        };
        if run_at_start {
            self.commands.at_start.push(registration);
            self.request_frame();
        } else {
            self.push(Command::StartEffect(registration));
        }
        id
    }

    fn start_item_effect(&mut self, effect: ItemEffect) -> EffectId {
        let id = effect.id.clone().unwrap_or_else(|| self.effects.auto_id());
        if let Some(plain) = self.item_effect_body(effect, id.clone()) {
            self.start_effect(plain);
        }
        id
    }

    fn stop_effect(&mut self, id: &str) {
        let registered = self.effects.remove(id);
        let pending = self.commands.purge_effect(id);
        let starting = match &mut self.starting {
            Some((starting, stopped)) if starting.as_str() == id => {
                *stopped = true;
                true
            }
            _ => false,
        };
        if !(registered || pending || starting) {
            tracing::debug!(effect = id, "stopping an effect that is not running");
        }
    }

    fn on_next_tick(&mut self, callback: impl FnOnce(&mut Store) + 'static) {
        self.next_tick.push(Box::new(callback));
        self.request_frame();
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("frame", &self.clock.frame())
            .field("item_types", &self.schema.type_count())
            .field("effects", &self.effects.len())
            .field("pending_work", &self.has_pending_work())
            .finish_non_exhaustive()
    }
}

/// `"type.prop"` for log fields.
pub(crate) fn prop_path(schema: &Schema, ty: ItemTypeId, prop: PropId) -> String {
    format!("{}.{}", schema.type_name(ty), schema.prop_name(ty, prop))
}
