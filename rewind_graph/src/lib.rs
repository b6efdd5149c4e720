// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rewind Graph: ownership edges between participants of an object graph.
//!
//! This crate stores a many-to-many parent/child relation with set semantics
//! and answers the two questions state tracking needs:
//!
//! - **Upward**: who owns this key, directly or transitively? Used to flag
//!   ancestors as modified and to record undo points on every enclosing view.
//! - **Downward**: what does this key own? Used to reset a whole subtree to a
//!   clean state.
//!
//! Unlike a dependency DAG, ownership graphs built from user data may contain
//! cycles (two entities referencing each other). Every walk therefore keeps a
//! visited set and terminates on cyclic input.
//!
//! ## Quick Start
//!
//! ```rust
//! use rewind_graph::OwnershipGraph;
//!
//! let mut graph = OwnershipGraph::<u32>::new();
//!
//! // 1 owns 2, 2 owns 3.
//! assert!(graph.add_edge(1, 2));
//! assert!(graph.add_edge(2, 3));
//!
//! // Set semantics: re-adding is a no-op.
//! assert!(!graph.add_edge(1, 2));
//!
//! let mut ancestors: Vec<_> = graph.ancestors(3).collect();
//! ancestors.sort();
//! assert_eq!(ancestors, vec![1, 2]);
//!
//! let mut descendants: Vec<_> = graph.descendants(1).collect();
//! descendants.sort();
//! assert_eq!(descendants, vec![2, 3]);
//! ```
//!
//! ## Keys
//!
//! Keys are small `Copy` handles implementing [`DenseKey`], which maps each
//! key to a dense slot index used for adjacency storage.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod graph;
mod key;

pub use graph::{Ancestors, Descendants, OwnershipGraph};
pub use key::DenseKey;
