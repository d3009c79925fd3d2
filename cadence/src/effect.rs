// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect declarations.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;

use cadence_state::{ItemId, Value};

use crate::check::Check;
use crate::context::EffectContext;

/// The name of a registered effect.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(Arc<str>);

impl EffectId {
    /// Creates an id from a name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({:?})", &*self.0)
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EffectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EffectId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EffectId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// When in a step an effect runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Inside the step's fixed-point loop, before queued writes apply. Writes
    /// made here are seen by the same step.
    #[default]
    DuringStep,
    /// Once the step has settled.
    EndOfStep,
}

/// Body of an [`Effect`].
pub type EffectFn = Box<dyn FnMut(&mut EffectContext<'_>)>;

/// Body of an [`ItemEffect`], called once per matching property change.
pub type ItemEffectFn = Box<dyn FnMut(&ItemChange, &mut EffectContext<'_>)>;

/// A reaction to changes, registered with
/// [`Mutate::start_effect`](crate::Mutate::start_effect).
///
/// ```rust
/// use cadence::{Check, Effect, Phase};
///
/// let effect = Effect::new(|ctx| {
///     let _ = ctx.diff_info();
/// })
/// .id("log_counters")
/// .check(Check::new().item_type("counters"))
/// .phase(Phase::EndOfStep);
/// assert_eq!(effect.name(), Some("log_counters"));
/// ```
pub struct Effect {
    pub(crate) id: Option<EffectId>,
    pub(crate) checks: Vec<Check>,
    pub(crate) phase: Phase,
    pub(crate) step: Option<String>,
    pub(crate) run_at_start: bool,
    pub(crate) run: EffectFn,
}

impl Effect {
    /// Creates an effect that runs `run` on every change.
    #[must_use]
    pub fn new(run: impl FnMut(&mut EffectContext<'_>) + 'static) -> Self {
        Self {
            id: None,
            checks: Vec::new(),
            phase: Phase::default(),
            step: None,
            run_at_start: false,
            run: Box::new(run),
        }
    }

    /// Names the effect. Starting an effect under a name already in use
    /// replaces the old one.
    #[must_use]
    pub fn id(mut self, id: impl Into<EffectId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a check clause. The effect runs when any clause matches.
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Sets the phase, [`Phase::DuringStep`] if unset.
    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Sets the step, `"default"` if unset.
    #[must_use]
    pub fn step(mut self, step: &str) -> Self {
        self.step = Some(step.to_string());
        self
    }

    /// Runs the effect once, unconditionally, at the start of the next pass.
    #[must_use]
    pub fn run_at_start(mut self) -> Self {
        self.run_at_start = true;
        self
    }

    /// Returns the explicit name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.id.as_ref().map(EffectId::as_str)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("checks", &self.checks)
            .field("phase", &self.phase)
            .field("step", &self.step)
            .field("run_at_start", &self.run_at_start)
            .finish_non_exhaustive()
    }
}

/// Gate on the new value of an item effect's property.
#[derive(Default)]
pub enum Becomes {
    /// Any change.
    #[default]
    Any,
    /// Only changes to this value.
    Equals(Value),
    /// Only changes for which the predicate, given the new and the previous
    /// value, returns `true`.
    When(Box<dyn Fn(&Value, &Value) -> bool>),
}

impl Becomes {
    /// Returns `true` if a change from `prev` to `new` passes the gate.
    #[must_use]
    pub fn accepts(&self, new: &Value, prev: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Equals(value) => new == value,
            Self::When(predicate) => predicate(new, prev),
        }
    }
}

impl fmt::Debug for Becomes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::When(_) => f.write_str("When(..)"),
        }
    }
}

/// One property change delivered to an [`ItemEffect`].
#[derive(Clone, Debug, PartialEq)]
pub struct ItemChange {
    /// The item.
    pub id: ItemId,
    /// The property name.
    pub prop: &'static str,
    /// The value now.
    pub new: Value,
    /// The value at the start of the frame.
    pub prev: Value,
}

/// An effect on the properties of one item type, called once per changed
/// `(item, property)` pair.
///
/// ```rust
/// use cadence::{Becomes, ItemEffect, Value};
///
/// let effect = ItemEffect::new("doors", |change, _ctx| {
///     assert_eq!(change.new, Value::from(true));
/// })
/// .prop("open")
/// .becomes(Becomes::Equals(Value::from(true)));
/// assert_eq!(effect.item_type(), "doors");
/// ```
pub struct ItemEffect {
    pub(crate) id: Option<EffectId>,
    pub(crate) item_type: String,
    pub(crate) ids: Vec<ItemId>,
    pub(crate) props: Vec<String>,
    pub(crate) becomes: Becomes,
    pub(crate) phase: Phase,
    pub(crate) step: Option<String>,
    pub(crate) run_at_start: bool,
    pub(crate) run: ItemEffectFn,
}

impl ItemEffect {
    /// Creates an effect on every property of every item of `item_type`.
    #[must_use]
    pub fn new(
        item_type: &str,
        run: impl FnMut(&ItemChange, &mut EffectContext<'_>) + 'static,
    ) -> Self {
        Self {
            id: None,
            item_type: item_type.to_string(),
            ids: Vec::new(),
            props: Vec::new(),
            becomes: Becomes::Any,
            phase: Phase::default(),
            step: None,
            run_at_start: false,
            run: Box::new(run),
        }
    }

    /// Names the effect.
    #[must_use]
    pub fn id(mut self, id: impl Into<EffectId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Restricts the effect to one item; may be repeated.
    #[must_use]
    pub fn item(mut self, id: impl Into<ItemId>) -> Self {
        self.ids.push(id.into());
        self
    }

    /// Restricts the effect to one property; may be repeated.
    #[must_use]
    pub fn prop(mut self, name: &str) -> Self {
        self.props.push(name.to_string());
        self
    }

    /// Gates changes on their new value.
    #[must_use]
    pub fn becomes(mut self, becomes: Becomes) -> Self {
        self.becomes = becomes;
        self
    }

    /// Sets the phase, [`Phase::DuringStep`] if unset.
    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Sets the step, `"default"` if unset.
    #[must_use]
    pub fn step(mut self, step: &str) -> Self {
        self.step = Some(step.to_string());
        self
    }

    /// Runs the effect once at the start of the next pass, over every
    /// current item and property it watches.
    #[must_use]
    pub fn run_at_start(mut self) -> Self {
        self.run_at_start = true;
        self
    }

    /// Returns the watched item type.
    #[must_use]
    pub fn item_type(&self) -> &str {
        &self.item_type
    }
}

impl fmt::Debug for ItemEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemEffect")
            .field("id", &self.id)
            .field("item_type", &self.item_type)
            .field("ids", &self.ids)
            .field("props", &self.props)
            .field("becomes", &self.becomes)
            .field("phase", &self.phase)
            .field("step", &self.step)
            .field("run_at_start", &self.run_at_start)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn becomes_gates_on_new_value() {
        let one = Value::from(1);
        let two = Value::from(2);
        assert!(Becomes::Any.accepts(&one, &two));
        assert!(Becomes::Equals(one.clone()).accepts(&one, &two));
        assert!(!Becomes::Equals(one.clone()).accepts(&two, &one));
        let rising = Becomes::When(Box::new(|new, prev| new.as_i64() > prev.as_i64()));
        assert!(rising.accepts(&two, &one));
        assert!(!rising.accepts(&one, &two));
    }

    #[test]
    fn effects_derive_unless_told_otherwise() {
        assert_eq!(Effect::new(|_ctx| {}).phase, Phase::DuringStep);
        assert_eq!(ItemEffect::new("doors", |_change, _ctx| {}).phase, Phase::DuringStep);
        let subscriber = Effect::new(|_ctx| {}).phase(Phase::EndOfStep);
        assert_eq!(subscriber.phase, Phase::EndOfStep);
    }

    #[test]
    fn effect_ids_compare_by_name() {
        let a = EffectId::from("spin");
        assert_eq!(a, EffectId::from(String::from("spin")));
        assert_eq!(a.to_string(), "spin");
        assert_eq!(std::format!("{a:?}"), "EffectId(\"spin\")");
    }
}
