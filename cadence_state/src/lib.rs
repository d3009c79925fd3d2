// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cadence State: schema, values, and snapshots for an incremental item store.
//!
//! Everything a Cadence store holds is organised as **items** grouped by
//! **item type**. This crate provides the vocabulary shared by the other
//! Cadence crates:
//!
//! - **Schema** ([`Schema`], [`SchemaBuilder`], [`ItemTypeDef`]): the fixed
//!   set of item types, their properties and default factories, with compact
//!   ids ([`ItemTypeId`], [`PropId`]) assigned at build time.
//! - **Values** ([`Value`]): plain, serializable property data compared by
//!   structural equality.
//! - **Snapshots** ([`State`], [`TypeState`], [`ItemState`]): dense state
//!   indexed by those ids, plus the named [`StateMap`] form for the edges.
//! - **Refs** ([`Refs`]): type-erased per-item data that is never diffed.
//!
//! ## Quick Start
//!
//! ```rust
//! use cadence_state::{ItemTypeDef, Schema, State, Value};
//!
//! let schema = Schema::builder()
//!     .item_type(ItemTypeDef::new("counters").prop("value", 0).prop("label", ""))
//!     .build()
//!     .unwrap();
//!
//! let counters = schema.type_id("counters").unwrap();
//! let mut state = State::new(&schema);
//! state.insert_default(&schema, counters, "a".into());
//!
//! let (_, value) = schema.resolve_path("counters.value").unwrap();
//! state.set(counters, "a", value, Value::from(5));
//!
//! let named = state.to_state_map(&schema);
//! assert_eq!(named["counters"]["a"]["value"], Value::from(5));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod id;
mod refs;
mod schema;
mod state;
mod value;

pub use id::{ItemId, ItemTypeId, PropId};
pub use refs::Refs;
pub use schema::{
    ItemTypeDef, ItemTypeInfo, RefsFactory, Schema, SchemaBuilder, SchemaError, StateFactory,
};
pub use state::{ItemState, ItemsMap, PropsMap, State, StateMap, TypeState};
pub use value::Value;
