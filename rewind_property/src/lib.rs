// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rewind Property: intercepted property storage for editable object graphs.
//!
//! A [`Model`] owns entities, collections, and the ownership edges between
//! them. Each entity has a sparse [`PropertyStore`]; every read and write goes
//! through a [`Pipeline`] of [`Behavior`]s declared on the entity's type and
//! on the property. Behaviors can observe, rewrite, or reject access, install
//! typed capabilities, and react to lifecycle and collection events.
//!
//! - **Registry**: entity types and properties are declared once, up front,
//!   with [`TypeMetadata`] and [`PropertyMetadata`]. Each property caches its
//!   pipeline, sorted by [`Priorities`] and de-duplicated by behavior instance.
//! - **Capabilities**: per entity, per [`Scope`] typed services resolved
//!   property scope first, then the entity's global scope, then the model's
//!   ambient table.
//! - **Ownership**: entities referenced from stored values, maps, and lists
//!   become children of the holding entity in an
//!   [`OwnershipGraph`](rewind_graph::OwnershipGraph).
//! - **Snapshots**: [`Model::export`] and [`Model::apply`] capture and restore
//!   entity state structurally, recursing through nested entities and
//!   collections.
//! - **Notifications**: committed changes queue [`Notification`]s for the
//!   embedding application to drain.
//!
//! Dirty tracking and undo/redo are built on top of this crate as behaviors
//! in `rewind_history`.
//!
//! ## Quick Start
//!
//! ```rust
//! use rewind_property::builtin::Initialize;
//! use rewind_property::{Model, PropertyMetadataBuilder, Registry, TypeMetadata, Value};
//!
//! let mut registry = Registry::new();
//! let doc = registry.register_type("Doc", TypeMetadata::default());
//! let title = registry.register_property(doc, "Title", PropertyMetadataBuilder::new(String::new()).build());
//! let tags = registry.register_property(
//!     doc,
//!     "Tags",
//!     PropertyMetadataBuilder::new(Value::Null)
//!         .behavior(Initialize::list())
//!         .build(),
//! );
//!
//! let mut model = Model::new(registry);
//! let d = model.create(doc)?;
//! model.set(d, title, "Draft".to_string())?;
//!
//! let list = model.read(d, tags.id())?.as_list().unwrap();
//! model.list_push(list, Value::from("new"))?;
//!
//! let before = model.export(d)?;
//! model.set(d, title, "Final".to_string())?;
//! model.apply(&before, d)?;
//! assert_eq!(model.get(d, title)?, "Draft");
//! # Ok::<(), rewind_property::Error>(())
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. Enable the `std` feature to
//! forward `std` to `thiserror` and `tracing`.

#![no_std]

extern crate alloc;

mod arena;
mod behavior;
mod capability;
mod collection;
mod error;
mod id;
mod metadata;
mod model;
mod notify;
mod registry;
mod snapshot;
mod store;
mod value;
mod wiring;

pub mod builtin;

pub use behavior::{
    Behavior, DEFAULT_PRIORITY, Interception, Priorities, WriteDecision, WriteOutcome,
};
pub use capability::{CapabilityTable, Installation, Resolver, Scope};
pub use collection::{ChangeKind, CollectionChange};
pub use error::{Error, Result};
pub use id::{BehaviorId, EntityId, EntityTypeId, ListId, MapId, Property, PropertyId};
pub use metadata::{PropertyMetadata, PropertyMetadataBuilder, TypeMetadata, TypeMetadataBuilder};
pub use model::Model;
pub use notify::Notification;
pub use registry::{Pipeline, PropertyRegistration, Registry, TypeRegistration};
pub use snapshot::{ListSnapshot, MapSnapshot, Snapshot, SnapshotValue};
pub use store::PropertyStore;
pub use value::{ErasedValue, PropertyValue, Value};
