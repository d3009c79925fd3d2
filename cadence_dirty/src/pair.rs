// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two recorders advanced independently: per pass and per step.

use cadence_state::{ItemId, ItemTypeId, PropId, Schema};

use crate::recorder::ChangeRecorder;

/// A step recorder and a step-end recorder that see the same marks.
///
/// The step recorder is reset before every fixed-point pass, so it answers
/// "did the last pass change anything". The step-end recorder accumulates
/// across every pass of a frame and is reset once the frame is done.
///
/// # Example
///
/// ```
/// use cadence_dirty::RecorderPair;
/// use cadence_state::{ItemId, ItemTypeId, PropId};
///
/// let ty = ItemTypeId::new(0);
/// let id = ItemId::from("a");
/// let mut pair = RecorderPair::with_type_count(1);
///
/// pair.record(ty, &id, PropId::new(0));
/// pair.reset_step();
/// pair.record(ty, &id, PropId::new(1));
///
/// assert!(!pair.step().prop_dirty(ty, "a", PropId::new(0)));
/// assert!(pair.step_end().prop_dirty(ty, "a", PropId::new(0)));
/// assert!(pair.step_end().prop_dirty(ty, "a", PropId::new(1)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecorderPair {
    step: ChangeRecorder,
    step_end: ChangeRecorder,
}

impl RecorderPair {
    /// Creates a pair sized for `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self::with_type_count(schema.type_count())
    }

    /// Creates a pair with `count` type slots.
    #[must_use]
    pub fn with_type_count(count: usize) -> Self {
        Self {
            step: ChangeRecorder::with_type_count(count),
            step_end: ChangeRecorder::with_type_count(count),
        }
    }

    /// Returns the per-pass recorder.
    #[must_use]
    #[inline]
    pub fn step(&self) -> &ChangeRecorder {
        &self.step
    }

    /// Returns the accumulating recorder.
    #[must_use]
    #[inline]
    pub fn step_end(&self) -> &ChangeRecorder {
        &self.step_end
    }

    /// Marks a property in both recorders.
    pub fn record(&mut self, ty: ItemTypeId, id: &ItemId, prop: PropId) {
        self.step.record(ty, id, prop);
        self.step_end.record(ty, id, prop);
    }

    /// Marks an item in both recorders.
    pub fn record_item(&mut self, ty: ItemTypeId, id: &ItemId) {
        self.step.record_item(ty, id);
        self.step_end.record_item(ty, id);
    }

    /// Marks a type in both recorders.
    pub fn record_type(&mut self, ty: ItemTypeId) {
        self.step.record_type(ty);
        self.step_end.record_type(ty);
    }

    /// Resets the per-pass recorder.
    pub fn reset_step(&mut self) {
        self.step.reset();
    }

    /// Resets the accumulating recorder.
    pub fn reset_step_end(&mut self) {
        self.step_end.reset();
    }

    /// Drops an item key from both recorders.
    pub fn forget_item(&mut self, ty: ItemTypeId, id: &str) {
        self.step.forget_item(ty, id);
        self.step_end.forget_item(ty, id);
    }

    /// Drops an item key from both recorders, marked or not.
    pub fn discard_item(&mut self, ty: ItemTypeId, id: &str) {
        self.step.discard_item(ty, id);
        self.step_end.discard_item(ty, id);
    }
}
