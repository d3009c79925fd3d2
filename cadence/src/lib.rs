// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence: a frame-synchronized item store with change-driven effects.
//!
//! A [`Store`] holds items of the types declared in a [`Schema`]. Writes,
//! additions, and removals are queued and applied once per frame by
//! [`Store::tick`]. After each pass the store diffs what changed and runs
//! the effects whose [`Check`]s match:
//!
//! - [`Phase::DuringStep`] effects derive state, and are the default. They
//!   run inside the step's fixed-point loop, so their own writes are seen by
//!   the next pass.
//! - [`Phase::EndOfStep`] effects subscribe. They run once per step,
//!   against everything the frame changed so far.
//!
//! Steps are named in [`StoreConfig`] and run in order each frame.
//!
//! ## Quick start
//!
//! ```rust
//! use core::time::Duration;
//! use cadence::{ItemEffect, ItemTypeDef, Mutate, NewItem, Schema, Store, Value};
//!
//! let schema = Schema::builder()
//!     .item_type(ItemTypeDef::new("counters").prop("value", 0).prop("doubled", 0))
//!     .build()
//!     .unwrap();
//! let mut store = Store::new(schema);
//! store.add_item(NewItem::new("counters", "a"));
//!
//! store.start_item_effect(
//!     ItemEffect::new("counters", |change, ctx| {
//!         let doubled = change.new.as_i64().unwrap_or_default() * 2;
//!         ctx.set_state("counters.doubled", doubled, &change.id);
//!     })
//!     .prop("value"),
//! );
//!
//! store.set_state("counters.value", 21, "a");
//! store.tick(Duration::ZERO);
//! assert_eq!(store.get_value("counters.doubled", "a"), Some(&Value::from(42)));
//! ```
//!
//! Item and property ids are interned when the schema is built; the
//! change recorder and diff are flat arrays indexed by them.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod check;
mod command;
mod config;
mod context;
mod effect;
mod error;
mod frame;
mod registry;
mod rules;
mod store;

pub use check::Check;
pub use config::{DEFAULT_STEP, FrameRate, StoreConfig, StoreConfigBuilder};
pub use context::EffectContext;
pub use effect::{Becomes, Effect, EffectFn, EffectId, ItemChange, ItemEffect, ItemEffectFn, Phase};
pub use error::UsageError;
pub use frame::FrameReport;
pub use rules::{RuleFactory, RuleSet};
pub use store::{FrameRequestFn, ItemView, Mutate, NewItem, NextTickFn, Store};

pub use cadence_diff::DiffInfo;
pub use cadence_patch::{Diff, IdLists, Patch};
pub use cadence_state::{
    ItemId, ItemState, ItemTypeDef, ItemTypeId, ItemsMap, PropId, PropsMap, Refs, Schema,
    SchemaBuilder, SchemaError, State, StateMap, TypeState, Value,
};
