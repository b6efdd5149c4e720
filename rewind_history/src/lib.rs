// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rewind History: dirty tracking and undo/redo for `rewind_property` models.
//!
//! Both features are ordinary behaviors. Declare them on an entity type and
//! use the extension traits on [`Model`](rewind_property::Model):
//!
//! - [`Dirtyable`] + [`DirtyTracking`]: a modified flag per entity against a
//!   baseline snapshot. Marking dirty flows to every ancestor in the
//!   ownership graph; cleaning flows to every descendant.
//! - [`Undoable`] + [`UndoRedo`]: per-entity undo and redo stacks of
//!   snapshots, captured before each change on the entity and on all of its
//!   ancestors.
//! - [`atomic`] / [`Atomically`]: group several edits into one undo step.
//!
//! ## Quick Start
//!
//! ```rust
//! use rewind_history::{DirtyTracking, Dirtyable, UndoRedo, Undoable};
//! use rewind_property::{Model, PropertyMetadataBuilder, Registry, TypeMetadataBuilder};
//!
//! let mut registry = Registry::new();
//! let node = registry.register_type(
//!     "Node",
//!     TypeMetadataBuilder::new()
//!         .behavior(Dirtyable)
//!         .behavior(Undoable::new())
//!         .build(),
//! );
//! let value = registry.register_property(node, "Value", PropertyMetadataBuilder::new(0_i64).build());
//! let child = registry.register_property(node, "Child", PropertyMetadataBuilder::new(None).build());
//!
//! let mut model = Model::new(registry);
//! let parent = model.create(node)?;
//! let kid = model.create(node)?;
//! model.set(parent, child, Some(kid))?;
//! model.clean(parent)?;
//!
//! // An edit on the child dirties the parent and is undoable from it.
//! model.set(kid, value, 7)?;
//! assert!(model.is_dirty(parent));
//! assert!(model.undo(parent)?);
//! assert_eq!(model.get(kid, value)?, 0);
//! # Ok::<(), rewind_property::Error>(())
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod dirty;
mod suspend;
mod undo;

pub use dirty::{DirtyState, DirtyTracking, Dirtyable};
pub use suspend::{Atomically, CaptureSuspension, atomic};
pub use undo::{OperationGuard, UndoHistory, UndoRedo, Undoable};
