// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame pipeline.

use alloc::vec::Vec;
use core::time::Duration;

use cadence_diff::{DiffMode, compute_diff};

use crate::config::{FrameRate, StoreConfig};
use crate::effect::Phase;
use crate::store::{Store, prop_path};

/// What one call to [`Store::tick`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// The frame number, counting from 1. Skipped calls report the last
    /// processed frame.
    pub frame: u64,
    /// Steps that ran.
    pub steps_run: usize,
    /// Fixed-point passes across all steps.
    pub passes: usize,
    /// A step did not settle within the pass bound, or steps were cut off.
    pub runaway: bool,
    /// Work is already queued for another frame.
    pub needs_next_frame: bool,
    /// The frame rate policy skipped this call.
    pub skipped: bool,
}

/// Frame counting and timing.
#[derive(Clone, Debug, Default)]
pub(crate) struct FrameClock {
    frame: u64,
    calls: u64,
    last_frame_at: Option<Duration>,
    duration: Duration,
}

impl FrameClock {
    pub(crate) fn frame(&self) -> u64 {
        self.frame
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    /// Counts a call and returns `true` if it should process a frame.
    fn admit(&mut self, now: Duration, config: &StoreConfig) -> bool {
        self.calls += 1;
        match config.frame_rate() {
            FrameRate::Full => true,
            FrameRate::Half => self.calls % 2 == 1,
            FrameRate::Auto => self.last_frame_at.is_none_or(|last| {
                now.saturating_sub(last) >= config.first_frame_duration() / 2
            }),
        }
    }

    fn advance(&mut self, now: Duration, config: &StoreConfig) {
        self.duration = match self.last_frame_at {
            Some(last) => now.saturating_sub(last),
            None => config.first_frame_duration(),
        };
        self.last_frame_at = Some(now);
        self.frame += 1;
    }
}

impl Store {
    /// Processes one frame.
    ///
    /// `now` is the host's monotonic clock; only differences between calls
    /// matter. In order:
    ///
    /// 1. The current state is copied to the previous state.
    /// 2. Each step runs its fixed-point loop: `run_at_start` effects, then
    ///    [`Phase::DuringStep`] effects whose checks match, then queued
    ///    effect registrations, item additions and removals, and writes. The
    ///    loop repeats while the pass changed something.
    /// 3. Each step ends with its [`Phase::EndOfStep`] effects, matched
    ///    against everything the frame changed so far.
    /// 4. Next-tick callbacks run and refs of removed items are dropped.
    pub fn tick(&mut self, now: Duration) -> FrameReport {
        if !self.clock.admit(now, &self.config) {
            return FrameReport {
                frame: self.clock.frame(),
                needs_next_frame: self.has_pending_work(),
                skipped: true,
                ..FrameReport::default()
            };
        }
        self.clock.advance(now, &self.config);
        let frame = self.clock.frame();
        let span = tracing::debug_span!("tick", frame);
        let _guard = span.enter();

        self.frame_started();
        self.prev.copy_from(&self.now);
        self.diff.clear();

        let mut report = FrameReport {
            frame,
            ..FrameReport::default()
        };
        let step_count = self.config.steps().len();
        for step in 0..step_count {
            if step >= self.config.max_steps() {
                tracing::warn!(
                    step = step + 1,
                    max_steps = self.config.max_steps(),
                    "tried to run step {}, skipping the remaining steps",
                    step + 1
                );
                report.runaway = true;
                break;
            }
            self.run_step(step, &mut report);
            report.steps_run += 1;
        }

        self.recorders.reset_step();
        self.recorders.reset_step_end();
        self.in_frame = false;
        for callback in core::mem::take(&mut self.next_tick) {
            callback(self);
        }
        self.release_removed();

        report.needs_next_frame = self.has_pending_work();
        if report.needs_next_frame {
            self.request_frame();
        }
        tracing::debug!(
            steps = report.steps_run,
            passes = report.passes,
            runaway = report.runaway,
            "frame done"
        );
        report
    }

    fn run_step(&mut self, step: usize, report: &mut FrameReport) {
        let max_passes = self.config.max_fixed_point_passes();
        let mut settled = false;
        for _ in 0..max_passes {
            self.recorders.reset_step();
            self.run_started_effects();
            self.run_effects(step, Phase::DuringStep);
            self.flush_effects();
            self.flush_items();
            self.flush_sets();
            compute_diff(
                &self.schema,
                &self.now,
                &self.prev,
                &mut self.diff,
                DiffMode::Recorded(self.recorders.step()),
            );
            report.passes += 1;
            if !self.recorders.step().something_changed() {
                settled = true;
                break;
            }
        }
        if !settled {
            let changed: Vec<_> = self
                .diff
                .all_props_changed()
                .iter()
                .map(|&(ty, prop)| prop_path(&self.schema, ty, prop))
                .collect();
            tracing::warn!(
                step = %self.config.steps()[step],
                passes = max_passes,
                changed = ?changed,
                "effects kept changing state, continuing with the last state"
            );
            report.runaway = true;
        }

        compute_diff(
            &self.schema,
            &self.now,
            &self.prev,
            &mut self.diff,
            DiffMode::Recorded(self.recorders.step_end()),
        );
        self.run_effects(step, Phase::EndOfStep);
    }

    fn run_effects(&mut self, step: usize, phase: Phase) {
        for id in self.effects.matching(step, phase, &self.diff) {
            self.run_effect(id.as_str(), false);
        }
    }
}
