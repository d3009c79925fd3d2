// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Diff: what changed between two snapshots.
//!
//! [`compute_diff`] compares a current and a previous [`State`] and fills a
//! [`DiffInfo`] with the added, removed, and changed items and properties.
//! In [`DiffMode::Recorded`] it only looks at what a
//! [`ChangeRecorder`] marked, which is how a store diffs every frame.
//! [`DiffMode::CheckAll`] compares everything and is meant for ad-hoc
//! comparisons of arbitrary snapshots.
//!
//! [`State`]: cadence_state::State
//! [`ChangeRecorder`]: cadence_dirty::ChangeRecorder
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod compute;
mod info;

pub use compute::{DiffMode, compute_diff};
pub use info::DiffInfo;
