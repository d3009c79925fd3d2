// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named groups of effects started and stopped together.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::effect::{Effect, EffectId};
use crate::error::UsageError;
use crate::store::{Mutate, Store};

/// Builds a fresh [`Effect`] each time its rule starts.
pub type RuleFactory = Box<dyn Fn() -> Effect>;

/// A named group of effect factories.
///
/// Every rule's effect is registered as `<prefix><name>`, so a set can be
/// started and stopped as a unit without clashing with other effects.
///
/// ```rust
/// use cadence::{Check, Effect, RuleSet};
///
/// let rules = RuleSet::new("doors.")
///     .rule("log", || Effect::new(|_ctx| {}).check(Check::new().item_type("doors")));
/// assert_eq!(rules.effect_id("log").as_str(), "doors.log");
/// assert_eq!(rules.names().collect::<Vec<_>>(), ["log"]);
/// ```
pub struct RuleSet {
    prefix: String,
    rules: Vec<(String, RuleFactory)>,
}

impl RuleSet {
    /// Creates an empty set whose effect ids start with `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            rules: Vec::new(),
        }
    }

    /// Adds a rule, replacing any rule with the same name.
    #[must_use]
    pub fn rule(mut self, name: &str, factory: impl Fn() -> Effect + 'static) -> Self {
        self.rules.retain(|(other, _)| other != name);
        self.rules.push((name.to_string(), Box::new(factory)));
        self
    }

    /// Returns the rule names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the effect id a rule is registered under.
    #[must_use]
    pub fn effect_id(&self, name: &str) -> EffectId {
        EffectId::from(format!("{}{name}", self.prefix))
    }

    fn build(&self, name: &str) -> Option<Effect> {
        let Some((_, factory)) = self.rules.iter().find(|(other, _)| other == name) else {
            UsageError::UnknownRule(name.to_string()).report();
            return None;
        };
        Some(factory().id(self.effect_id(name)))
    }

    /// Starts one rule's effect.
    pub fn start(&self, target: &mut impl Mutate, name: &str) {
        if let Some(effect) = self.build(name) {
            target.start_effect(effect);
        }
    }

    /// Starts every rule's effect.
    pub fn start_all(&self, target: &mut impl Mutate) {
        for (name, _) in &self.rules {
            self.start(target, name);
        }
    }

    /// Stops one rule's effect.
    pub fn stop(&self, target: &mut impl Mutate, name: &str) {
        if !self.rules.iter().any(|(other, _)| other == name) {
            UsageError::UnknownRule(name.to_string()).report();
            return;
        }
        target.stop_effect(self.effect_id(name).as_str());
    }

    /// Stops every rule's effect.
    pub fn stop_all(&self, target: &mut impl Mutate) {
        for (name, _) in &self.rules {
            target.stop_effect(self.effect_id(name).as_str());
        }
    }

    /// Runs one rule now.
    ///
    /// A started rule runs its registered effect; otherwise a fresh effect
    /// is built and run once without being registered.
    pub fn run(&self, store: &mut Store, name: &str) {
        let id = self.effect_id(name);
        if store.has_effect(id.as_str()) {
            store.run_effect_now(id.as_str());
        } else if let Some(effect) = self.build(name) {
            store.run_detached(effect);
        }
    }

    /// Runs every rule now, in insertion order.
    pub fn run_all(&self, store: &mut Store) {
        for (name, _) in &self.rules {
            self.run(store, name);
        }
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("prefix", &self.prefix)
            .field("rules", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
