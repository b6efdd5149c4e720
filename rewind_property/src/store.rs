// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entity sparse property storage.
//!
//! Entries are kept in a vector sorted by [`PropertyId`] and looked up by
//! binary search. Entities typically carry a handful of properties, so the
//! first [`INLINE_CAPACITY`] entries live inline without a heap allocation.
//!
//! A store only holds values that were written or materialised by a read.
//! Absent keys read as the property's declared default.

use smallvec::SmallVec;

use crate::id::PropertyId;
use crate::value::Value;

const INLINE_CAPACITY: usize = 8;

/// Sparse `PropertyId -> Value` map owned by one entity.
///
/// # Example
///
/// ```rust
/// use rewind_property::{PropertyId, PropertyStore, Value};
///
/// let mut store = PropertyStore::new();
/// let name = PropertyId::new(0);
///
/// assert_eq!(store.set(name, Value::from("a")), None);
/// assert_eq!(store.set(name, Value::from("b")), Some(Value::from("a")));
/// assert_eq!(store.get(name), Some(&Value::from("b")));
/// assert_eq!(store.remove(name), Some(Value::from("b")));
/// assert!(store.is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyStore {
    entries: SmallVec<[(PropertyId, Value); INLINE_CAPACITY]>,
}

impl PropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no values are stored.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of stored values.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn find(&self, id: PropertyId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(pid, _)| *pid)
    }

    /// Returns the stored value for `id`.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&Value> {
        self.find(id).ok().map(|idx| &self.entries[idx].1)
    }

    /// Returns `true` if a value is stored for `id`.
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.find(id).is_ok()
    }

    /// Stores `value`, returning the previous value.
    pub fn set(&mut self, id: PropertyId, value: Value) -> Option<Value> {
        match self.find(id) {
            Ok(idx) => Some(core::mem::replace(&mut self.entries[idx].1, value)),
            Err(idx) => {
                self.entries.insert(idx, (id, value));
                None
            }
        }
    }

    /// Removes the value for `id`, returning it.
    pub fn remove(&mut self, id: PropertyId) -> Option<Value> {
        self.find(id).ok().map(|idx| self.entries.remove(idx).1)
    }

    /// Iterates stored entries in ascending [`PropertyId`] order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &Value)> + '_ {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    /// Iterates stored property ids in ascending order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Iterates stored values.
    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }
}
