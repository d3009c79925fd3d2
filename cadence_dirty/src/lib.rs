// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence Dirty: change recording for an incremental item store.
//!
//! Every write to a Cadence store is recorded as a dirty mark at three
//! levels: item type, item id, and property. The diff engine later compares
//! only what was marked, so the cost of a frame follows the number of
//! writes rather than the size of the store.
//!
//! - **Recorders** ([`ChangeRecorder`]): one generation of marks with O(1)
//!   membership tests and mark-ordered iteration.
//! - **Recorder pairs** ([`RecorderPair`]): the per-pass and per-step
//!   recorders a scheduler keeps side by side.
//! - **Bitsets** ([`BitSet`]): the growable index set used for property and
//!   type marks.
//!
//! ## Quick Start
//!
//! ```rust
//! use cadence_dirty::ChangeRecorder;
//! use cadence_state::{ItemId, ItemTypeDef, Schema};
//!
//! let schema = Schema::builder()
//!     .item_type(ItemTypeDef::new("counters").prop("value", 0))
//!     .build()
//!     .unwrap();
//! let (counters, value) = schema.resolve_path("counters.value").unwrap();
//!
//! let mut recorder = ChangeRecorder::new(&schema);
//! recorder.record(counters, &ItemId::from("a"), value);
//!
//! for ty in recorder.dirty_types() {
//!     for id in recorder.dirty_items(*ty) {
//!         let props: Vec<_> = recorder.dirty_props(*ty, id).collect();
//!         assert_eq!(props, [value]);
//!     }
//! }
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod bits;
mod pair;
mod recorder;

pub use bits::{BitSet, BitSetIter};
pub use pair::RecorderPair;
pub use recorder::ChangeRecorder;
