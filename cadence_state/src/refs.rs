// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased per-item auxiliary data.
//!
//! Refs hold things that belong to an item but must never be diffed or
//! serialized: handles, caches, callbacks. They live beside the item's
//! [`ItemState`](crate::ItemState) and are dropped when the item is removed.

use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

/// Type-erased refs record of one item.
///
/// ```rust
/// use cadence_state::Refs;
///
/// struct Handle(u32);
///
/// let mut refs = Refs::new(Handle(7));
/// assert!(refs.is::<Handle>());
/// assert_eq!(refs.downcast_ref::<Handle>().map(|h| h.0), Some(7));
///
/// if let Some(handle) = refs.downcast_mut::<Handle>() {
///     handle.0 = 8;
/// }
/// assert_eq!(refs.downcast_ref::<Handle>().map(|h| h.0), Some(8));
/// assert!(Refs::empty().is_empty());
/// ```
#[derive(Default)]
pub struct Refs {
    inner: Option<Box<dyn Any>>,
}

impl Refs {
    /// Creates refs holding `value`.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Some(Box::new(value)),
        }
    }

    /// Creates refs holding nothing.
    #[must_use]
    #[inline]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns the [`TypeId`] of the stored value.
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.as_deref().map(Any::type_id)
    }

    /// Returns `true` if the stored value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.as_deref().is_some_and(<dyn Any>::is::<T>)
    }

    /// Borrows the stored value as `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_deref()?.downcast_ref()
    }

    /// Mutably borrows the stored value as `T`.
    #[must_use]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.inner.as_deref_mut()?.downcast_mut()
    }

    /// Replaces the stored value, returning the previous refs.
    pub fn replace<T: 'static>(&mut self, value: T) -> Self {
        Self {
            inner: self.inner.replace(Box::new(value)),
        }
    }
}

impl fmt::Debug for Refs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refs")
            .field("type_id", &self.type_id())
            .finish_non_exhaustive()
    }
}
