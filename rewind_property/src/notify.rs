// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::id::{EntityId, PropertyId};

/// An outward change notification queued by a [`Model`](crate::Model).
///
/// Notifications accumulate until [`Model::drain_notifications`](crate::Model::drain_notifications)
/// is called; the model never delivers them itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notification {
    /// A property was added, updated, or removed by a write or an apply.
    ///
    /// A write that leaves the value unchanged does not notify. An apply
    /// notifies every key it touches, changed or not.
    PropertyChanged {
        /// The entity whose store changed.
        entity: EntityId,
        /// The property key.
        property: PropertyId,
    },
    /// An entity's modified flag flipped.
    DirtyStateChanged {
        /// The entity.
        entity: EntityId,
        /// The new flag value.
        is_dirty: bool,
    },
}

impl Notification {
    /// The entity the notification is about.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match self {
            Self::PropertyChanged { entity, .. } | Self::DirtyStateChanged { entity, .. } => *entity,
        }
    }
}
