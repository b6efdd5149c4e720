// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parent/child edge storage.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::key::DenseKey;

/// Bidirectional ownership edges: "parent owns child".
///
/// `OwnershipGraph` stores every edge twice, once under the parent and once
/// under the child, so both "who owns `k`?" and "what does `k` own?" are
/// answered without scanning. Edges have set semantics: adding an existing
/// edge is a no-op and there is no multiplicity count.
///
/// Cycles are allowed (entities may reference each other). Self edges are
/// refused, since a key owning itself would make every upward walk revisit
/// the starting point.
///
/// # Type Parameters
///
/// - `K`: The key type, typically an arena handle. Must be
///   `Copy + Eq + Hash + DenseKey`.
///
/// # Example
///
/// ```
/// use rewind_graph::OwnershipGraph;
///
/// let mut graph = OwnershipGraph::<u32>::new();
/// graph.add_edge(1, 2);
/// graph.add_edge(3, 2);
///
/// let mut parents: Vec<_> = graph.parents(2).collect();
/// parents.sort();
/// assert_eq!(parents, vec![1, 3]);
///
/// assert!(graph.remove_edge(1, 2));
/// assert_eq!(graph.parents(2).collect::<Vec<_>>(), vec![3]);
/// ```
#[derive(Debug, Clone)]
pub struct OwnershipGraph<K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    /// `parents[key.index()]` -> keys that own `key`.
    parents: Vec<Vec<K>>,
    /// `children[key.index()]` -> keys owned by `key`.
    children: Vec<Vec<K>>,
    edge_count: usize,
}

impl<K> Default for OwnershipGraph<K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Ensures `vec` has at least `idx + 1` elements, filling with defaults.
#[inline]
fn grow<T: Default>(vec: &mut Vec<T>, idx: usize) {
    if idx >= vec.len() {
        vec.resize_with(idx + 1, T::default);
    }
}

#[inline]
fn slot<K>(lists: &[Vec<K>], idx: usize) -> &[K] {
    lists.get(idx).map_or(&[], Vec::as_slice)
}

/// Removes `value` from the adjacency list at `idx`, returning whether it was present.
#[inline]
fn unlink<K: Copy + Eq>(lists: &mut [Vec<K>], idx: usize, value: K) -> bool {
    if let Some(list) = lists.get_mut(idx)
        && let Some(pos) = list.iter().position(|&k| k == value)
    {
        list.swap_remove(pos);
        true
    } else {
        false
    }
}

impl<K> OwnershipGraph<K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parents: Vec::new(),
            children: Vec::new(),
            edge_count: 0,
        }
    }

    /// Returns `true` if the graph has no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Adds the edge `parent` owns `child`.
    ///
    /// Returns `true` if the edge was newly added, `false` if it already
    /// existed or if `parent == child`.
    pub fn add_edge(&mut self, parent: K, child: K) -> bool {
        if parent == child {
            return false;
        }

        let parent_idx = parent.index();
        let child_idx = child.index();

        grow(&mut self.children, parent_idx);
        if self.children[parent_idx].contains(&child) {
            return false;
        }
        self.children[parent_idx].push(child);

        grow(&mut self.parents, child_idx);
        self.parents[child_idx].push(parent);

        self.edge_count += 1;
        true
    }

    /// Removes the edge `parent` owns `child`.
    ///
    /// Returns `true` if the edge existed and was removed.
    pub fn remove_edge(&mut self, parent: K, child: K) -> bool {
        if !unlink(&mut self.children, parent.index(), child) {
            return false;
        }
        unlink(&mut self.parents, child.index(), parent);
        self.edge_count -= 1;
        true
    }

    /// Returns `true` if `parent` directly owns `child`.
    #[must_use]
    pub fn contains_edge(&self, parent: K, child: K) -> bool {
        slot(&self.children, parent.index()).contains(&child)
    }

    /// Removes a key entirely from the graph.
    ///
    /// This removes every edge involving `key`, both as a parent and as a
    /// child. Call this before the key's slot index is reused.
    pub fn remove_key(&mut self, key: K) {
        let idx = key.index();

        let children = self
            .children
            .get_mut(idx)
            .map(core::mem::take)
            .unwrap_or_default();
        for child in children {
            unlink(&mut self.parents, child.index(), key);
            self.edge_count -= 1;
        }

        let parents = self
            .parents
            .get_mut(idx)
            .map(core::mem::take)
            .unwrap_or_default();
        for parent in parents {
            unlink(&mut self.children, parent.index(), key);
            self.edge_count -= 1;
        }
    }

    /// Returns an iterator over the direct parents of `key`.
    ///
    /// The iteration order is not specified.
    #[inline]
    pub fn parents(&self, key: K) -> impl Iterator<Item = K> + '_ {
        slot(&self.parents, key.index()).iter().copied()
    }

    /// Returns an iterator over the direct children of `key`.
    ///
    /// The iteration order is not specified.
    #[inline]
    pub fn children(&self, key: K) -> impl Iterator<Item = K> + '_ {
        slot(&self.children, key.index()).iter().copied()
    }

    /// Returns `true` if `key` has at least one parent.
    #[must_use]
    pub fn has_parents(&self, key: K) -> bool {
        !slot(&self.parents, key.index()).is_empty()
    }

    /// Returns `true` if `key` has at least one child.
    #[must_use]
    pub fn has_children(&self, key: K) -> bool {
        !slot(&self.children, key.index()).is_empty()
    }

    /// Returns an iterator over every transitive owner of `key`.
    ///
    /// `key` itself is never yielded, even when it sits on a cycle.
    /// The iteration order is not specified.
    pub fn ancestors(&self, key: K) -> Ancestors<'_, K> {
        Ancestors(Walk::new(&self.parents, key))
    }

    /// Returns an iterator over everything `key` transitively owns.
    ///
    /// `key` itself is never yielded, even when it sits on a cycle.
    /// The iteration order is not specified.
    pub fn descendants(&self, key: K) -> Descendants<'_, K> {
        Descendants(Walk::new(&self.children, key))
    }

    /// Returns `true` if `descendant` is reachable from `ancestor` by following child edges.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: K, descendant: K) -> bool {
        self.descendants(ancestor).any(|k| k == descendant)
    }
}

/// Depth-first walk over one direction of the graph.
#[derive(Debug)]
struct Walk<'a, K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    lists: &'a [Vec<K>],
    visited: HashSet<K>,
    stack: Vec<K>,
}

impl<'a, K> Walk<'a, K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    fn new(lists: &'a [Vec<K>], start: K) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut stack = Vec::new();
        stack.extend(slot(lists, start.index()).iter().copied());
        Self {
            lists,
            visited,
            stack,
        }
    }

    fn next(&mut self) -> Option<K> {
        while let Some(key) = self.stack.pop() {
            if self.visited.insert(key) {
                self.stack
                    .extend(slot(self.lists, key.index()).iter().copied());
                return Some(key);
            }
        }
        None
    }
}

/// Iterator over transitive owners, returned by [`OwnershipGraph::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a, K>(Walk<'a, K>)
where
    K: Copy + Eq + Hash + DenseKey;

impl<K> Iterator for Ancestors<'_, K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.0.next()
    }
}

/// Iterator over transitively owned keys, returned by [`OwnershipGraph::descendants`].
#[derive(Debug)]
pub struct Descendants<'a, K>(Walk<'a, K>)
where
    K: Copy + Eq + Hash + DenseKey;

impl<K> Iterator for Descendants<'_, K>
where
    K: Copy + Eq + Hash + DenseKey,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.0.next()
    }
}
