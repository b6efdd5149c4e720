// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dense key mapping.

/// A key that maps to a dense slot index.
///
/// Adjacency lists are stored in vectors indexed by [`DenseKey::index`], so
/// keys should be allocated densely (arena slots, interned ids). Two distinct
/// live keys must not share an index. The graph does not see generations: a
/// dead key whose slot was reused answers with the new occupant's edges, so
/// callers check liveness before querying and call
/// [`OwnershipGraph::remove_key`](crate::OwnershipGraph::remove_key) before a
/// slot is reused.
pub trait DenseKey {
    /// Returns the slot index of this key.
    fn index(&self) -> usize;
}

impl DenseKey for u32 {
    #[inline]
    fn index(&self) -> usize {
        *self as usize
    }
}

impl DenseKey for usize {
    #[inline]
    fn index(&self) -> usize {
        *self
    }
}

impl DenseKey for u16 {
    #[inline]
    fn index(&self) -> usize {
        usize::from(*self)
    }
}
