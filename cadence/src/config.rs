// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Store configuration.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

/// Name of the step every store has.
pub const DEFAULT_STEP: &str = "default";

/// How often [`Store::tick`](crate::Store::tick) processes a frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum FrameRate {
    /// Every call processes a frame.
    #[default]
    Full,
    /// Every other call processes a frame.
    Half,
    /// A call is skipped when less than half of the nominal frame duration
    /// has passed since the last processed frame.
    Auto,
}

/// Configuration for a [`Store`](crate::Store).
///
/// ```rust
/// use cadence::{FrameRate, StoreConfig};
///
/// let config = StoreConfig::builder()
///     .steps(["input", "default", "physics"])
///     .max_fixed_point_passes(4)
///     .frame_rate(FrameRate::Half)
///     .build();
///
/// assert_eq!(config.steps(), ["input", "default", "physics"]);
/// assert_eq!(config.step_index("physics"), Some(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    steps: Vec<String>,
    max_fixed_point_passes: usize,
    max_steps: usize,
    first_frame_duration: Duration,
    frame_rate: FrameRate,
}

impl StoreConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }

    /// Returns the ordered step names.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Returns the position of a step.
    #[must_use]
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s == name)
    }

    /// Returns the position of the `"default"` step.
    #[must_use]
    pub fn default_step(&self) -> usize {
        self.step_index(DEFAULT_STEP).unwrap_or(0)
    }

    /// Returns how many passes one step may take to settle.
    #[must_use]
    pub fn max_fixed_point_passes(&self) -> usize {
        self.max_fixed_point_passes
    }

    /// Returns how many steps one frame may run.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Returns the duration reported for the first frame.
    #[must_use]
    pub fn first_frame_duration(&self) -> Duration {
        self.first_frame_duration
    }

    /// Returns the frame rate policy.
    #[must_use]
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            steps: vec![DEFAULT_STEP.to_string()],
            max_fixed_point_passes: 8,
            max_steps: 30,
            first_frame_duration: Duration::from_micros(16_667),
            frame_rate: FrameRate::Full,
        }
    }
}

/// Builder for [`StoreConfig`].
#[derive(Clone, Debug)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Creates a builder starting from [`StoreConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    /// Sets the ordered step names.
    ///
    /// `"default"` is appended if missing. Repeated names keep their first
    /// position.
    #[must_use]
    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for step in steps {
            let step = step.into();
            if !names.contains(&step) {
                names.push(step);
            }
        }
        if !names.iter().any(|s| s == DEFAULT_STEP) {
            names.push(DEFAULT_STEP.to_string());
        }
        self.config.steps = names;
        self
    }

    /// Sets how many passes one step may take to settle. At least one pass
    /// always runs.
    #[must_use]
    pub fn max_fixed_point_passes(mut self, passes: usize) -> Self {
        self.config.max_fixed_point_passes = passes.max(1);
        self
    }

    /// Sets how many steps one frame may run.
    #[must_use]
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.config.max_steps = steps;
        self
    }

    /// Sets the duration reported for the first frame.
    #[must_use]
    pub fn first_frame_duration(mut self, duration: Duration) -> Self {
        self.config.first_frame_duration = duration;
        self
    }

    /// Sets the frame rate policy.
    #[must_use]
    pub fn frame_rate(mut self, rate: FrameRate) -> Self {
        self.config.frame_rate = rate;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> StoreConfig {
        self.config
    }
}

impl Default for StoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
