// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The effect registry.

use alloc::format;
use alloc::vec::Vec;

use cadence_diff::DiffInfo;
use hashbrown::HashMap;

use crate::check::{ResolvedCheck, any_matches};
use crate::effect::{EffectFn, EffectId, Phase};

/// A resolved effect waiting to be registered.
pub(crate) struct Registration {
    pub(crate) id: EffectId,
    pub(crate) checks: Vec<ResolvedCheck>,
    pub(crate) phase: Phase,
    pub(crate) step: usize,
    pub(crate) run: EffectFn,
}

struct Entry {
    serial: u64,
    checks: Vec<ResolvedCheck>,
    phase: Phase,
    step: usize,
    /// `None` while the effect is running.
    run: Option<EffectFn>,
}

/// A running effect's body, on loan from the registry.
pub(crate) struct Loan {
    pub(crate) id: EffectId,
    serial: u64,
    pub(crate) run: EffectFn,
}

/// Registered effects in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    order: Vec<EffectId>,
    entries: HashMap<EffectId, Entry>,
    next_serial: u64,
    next_auto: u64,
}

impl Registry {
    /// Returns a fresh `effect_<n>` id.
    pub(crate) fn auto_id(&mut self) -> EffectId {
        self.next_auto += 1;
        EffectId::from(format!("effect_{}", self.next_auto))
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn ids(&self) -> &[EffectId] {
        &self.order
    }

    /// Registers an effect, replacing any effect with the same id.
    pub(crate) fn insert(&mut self, registration: Registration) {
        self.remove(registration.id.as_str());
        self.next_serial += 1;
        self.order.push(registration.id.clone());
        self.entries.insert(
            registration.id,
            Entry {
                serial: self.next_serial,
                checks: registration.checks,
                phase: registration.phase,
                step: registration.step,
                run: Some(registration.run),
            },
        );
    }

    /// Unregisters an effect. Returns `false` if it was not registered.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.order.retain(|other| other.as_str() != id);
        true
    }

    /// Returns the ids of the effects of `step` and `phase` whose checks
    /// match `diff`, in registration order.
    pub(crate) fn matching(&self, step: usize, phase: Phase, diff: &DiffInfo) -> Vec<EffectId> {
        self.order
            .iter()
            .filter(|id| {
                self.entries.get(*id).is_some_and(|entry| {
                    entry.step == step && entry.phase == phase && any_matches(&entry.checks, diff)
                })
            })
            .cloned()
            .collect()
    }

    /// Takes an effect's body out for the duration of a call.
    pub(crate) fn lend(&mut self, id: &str) -> Option<Loan> {
        let (id, entry) = self.entries.get_key_value_mut(id)?;
        let run = entry.run.take()?;
        Some(Loan {
            id: id.clone(),
            serial: entry.serial,
            run,
        })
    }

    /// Puts a body back, unless its effect was stopped or replaced while
    /// it ran.
    pub(crate) fn give_back(&mut self, loan: Loan) {
        if let Some(entry) = self.entries.get_mut(loan.id.as_str())
            && entry.serial == loan.serial
        {
            entry.run = Some(loan.run);
        }
    }
}
