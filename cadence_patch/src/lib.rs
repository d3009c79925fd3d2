// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Patch: serializable patches and diffs over state snapshots.
//!
//! A [`Patch`] lists ids to remove, ids to add, and property values to
//! write, keyed by item type and property *names*. A [`Diff`] additionally
//! remembers the values each write replaces, so it can be undone without
//! the snapshot it was taken from.
//!
//! - Capture: [`get_patch`], [`get_diff`], [`get_patch_and_reversed`],
//!   [`get_patch_to_partial`].
//! - Replay: [`apply_patch_here`], [`get_reverse_patch`],
//!   [`make_minimal_patch`].
//! - Algebra: [`combine_two_patches`], [`combine_patches`],
//!   [`remove_partial_patch`], [`get_diff_from_patches`],
//!   [`get_patches_from_diff`], [`combine_two_diffs`], [`combine_diffs`].
//!
//! Combining is associative: folding a list of patches left to right gives
//! a patch that, applied once, reaches the same snapshot as applying every
//! patch in turn.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod apply;
mod capture;
mod combine;
mod types;

pub use apply::{apply_patch_here, get_reverse_patch, make_minimal_patch};
pub use capture::{get_diff, get_patch, get_patch_and_reversed, get_patch_to_partial};
pub use combine::{
    combine_diffs, combine_patches, combine_two_diffs, combine_two_patches, get_diff_from_patches,
    get_patches_from_diff, remove_partial_patch,
};
pub use types::{Diff, IdLists, Patch};
