// Copyright 2025 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Growable bitset over dense indices.

use core::fmt;

use smallvec::SmallVec;

const WORD_BITS: usize = 64;

/// A compact, growable set of `usize` indices.
///
/// Sets of up to 128 indices stay inline. [`clear`](Self::clear) zeroes the
/// words in place, so a set that is reused every frame stops allocating once
/// it has reached its working size.
///
/// # Example
///
/// ```
/// use cadence_dirty::BitSet;
///
/// let mut set = BitSet::new();
/// assert!(set.insert(3));
/// assert!(set.insert(200));
/// assert!(!set.insert(3));
///
/// assert!(set.contains(200));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 200]);
///
/// set.clear();
/// assert!(set.is_empty());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BitSet {
    words: SmallVec<[u64; 2]>,
}

impl BitSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for indices below `len`.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let mut words = SmallVec::new();
        words.resize(len.div_ceil(WORD_BITS), 0);
        Self { words }
    }

    /// Inserts an index. Returns `true` if it was not present.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, mask) = split(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let slot = &mut self.words[word];
        let fresh = *slot & mask == 0;
        *slot |= mask;
        fresh
    }

    /// Removes an index. Returns `true` if it was present.
    pub fn remove(&mut self, index: usize) -> bool {
        let (word, mask) = split(index);
        match self.words.get_mut(word) {
            Some(slot) if *slot & mask != 0 => {
                *slot &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if the index is present.
    #[must_use]
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = split(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns `true` if no index is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Returns the number of indices present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every index, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Iterates over the indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word: 0,
            bits: self.words.first().copied().unwrap_or(0),
        }
    }
}

#[inline]
fn split(index: usize) -> (usize, u64) {
    (index / WORD_BITS, 1_u64 << (index % WORD_BITS))
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a BitSet {
    type Item = usize;
    type IntoIter = BitSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the indices of a [`BitSet`].
#[derive(Clone, Debug)]
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word: usize,
    bits: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.bits == 0 {
            self.word += 1;
            self.bits = *self.words.get(self.word)?;
        }
        let bit = self.bits.trailing_zeros() as usize;
        // Clear the lowest set bit.
        self.bits &= self.bits - 1;
        Some(self.word * WORD_BITS + bit)
    }
}
