// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

use crate::id::{EntityId, EntityTypeId, ListId, MapId, PropertyId};

/// Errors returned by [`Model`](crate::Model) operations.
///
/// Usage errors are detected before anything is mutated. A write rejected by a
/// behavior is not an error; see [`WriteOutcome`](crate::WriteOutcome).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The entity handle is stale or was never issued by this model.
    #[error("entity {0:?} does not exist")]
    MissingEntity(EntityId),
    /// The entity type is not registered.
    #[error("entity type {0:?} is not registered")]
    UnknownType(EntityTypeId),
    /// The property exists but is not declared on the entity's type.
    #[error("property {property} is not declared on entity type `{ty}`")]
    UndeclaredProperty {
        /// Name of the entity type.
        ty: &'static str,
        /// The offending property.
        property: PropertyId,
    },
    /// No property with this name is declared on the entity's type.
    #[error("entity type `{ty}` has no property named `{name}`")]
    UnknownPropertyName {
        /// Name of the entity type.
        ty: &'static str,
        /// The name that was looked up.
        name: String,
    },
    /// Typed access found a value of a different kind.
    #[error("property {property} holds a {found} value, expected {expected}")]
    TypeMismatch {
        /// The property that was read.
        property: PropertyId,
        /// Rust type requested by the caller.
        expected: &'static str,
        /// Kind of the stored value.
        found: &'static str,
    },
    /// The list handle is stale.
    #[error("list {0:?} does not exist")]
    MissingList(ListId),
    /// The map handle is stale.
    #[error("map {0:?} does not exist")]
    MissingMap(MapId),
    /// A list index was past the end.
    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Length of the list.
        len: usize,
    },
    /// A snapshot was applied to an entity of a different type.
    #[error("snapshot of type {snapshot:?} cannot be applied to an entity of type {entity:?}")]
    SnapshotTypeMismatch {
        /// Type recorded in the snapshot.
        snapshot: EntityTypeId,
        /// Type of the target entity.
        entity: EntityTypeId,
    },
}

/// Result alias with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
