//! Sets of buffer argument slots.

use std::fmt;

/// A set of buffer argument table indices, `0..MAX_BUFFER_BINDINGS`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferSlots(u32);

/// Buffer argument table size for compute functions.
pub const MAX_BUFFER_BINDINGS: usize = 31;

impl BufferSlots {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add `index`. Returns `false` if it is outside the argument table.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= MAX_BUFFER_BINDINGS {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_BUFFER_BINDINGS && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Lowest slot in `self` that `bound` does not contain.
    pub fn first_missing(&self, bound: BufferSlots) -> Option<usize> {
        let missing = self.0 & !bound.0;
        (missing != 0).then(|| missing.trailing_zeros() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_BUFFER_BINDINGS).filter(|i| self.contains(*i))
    }
}

impl FromIterator<usize> for BufferSlots {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut slots = Self::new();
        for index in iter {
            slots.insert(index);
        }
        slots
    }
}

impl fmt::Debug for BufferSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
