// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers for properties, entity types, behaviors, and arena objects.
//!
//! [`PropertyId`] and [`EntityTypeId`] are dense registry indices. [`EntityId`],
//! [`ListId`], and [`MapId`] are generational handles into a
//! [`Model`](crate::Model): a slot index plus a generation counter, so a stale
//! handle never aliases a live object that later reuses the slot.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use rewind_graph::DenseKey;

/// A runtime property identifier.
///
/// Property ids are allocated by [`Registry::register_property`](crate::Registry::register_property)
/// and are unique across all entity types of a registry.
///
/// # Example
///
/// ```rust
/// use rewind_property::PropertyId;
///
/// let id = PropertyId::new(42);
/// assert_eq!(id.index(), 42);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Creates a property id from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed property key.
///
/// `Property<T>` wraps a [`PropertyId`] with the Rust type the property holds,
/// so [`Model::get`](crate::Model::get) and [`Model::set`](crate::Model::set)
/// convert through [`PropertyValue`](crate::PropertyValue) without the caller
/// naming the type again.
///
/// It is the same size as `PropertyId`.
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    /// Wraps an untyped id.
    ///
    /// The caller is responsible for `T` matching the type the property was
    /// registered with; a mismatch surfaces as
    /// [`Error::TypeMismatch`](crate::Error::TypeMismatch) on typed access.
    #[must_use]
    #[inline]
    pub const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying property id.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

impl<T> Copy for Property<T> {}

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}

impl<T> From<Property<T>> for PropertyId {
    #[inline]
    fn from(property: Property<T>) -> Self {
        property.id
    }
}

/// Identifier of a registered entity type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityTypeId(u16);

impl EntityTypeId {
    /// Creates a type id from a raw index.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Interned identity of a behavior instance.
///
/// Two registrations of the same `Rc<dyn Behavior>` share a `BehaviorId`; this
/// is the key used to run lifecycle hooks at most once per entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BehaviorId(u32);

impl BehaviorId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

macro_rules! generational_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            pub(crate) const fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            /// Returns the slot index.
            #[must_use]
            #[inline]
            pub const fn slot(self) -> u32 {
                self.index
            }

            /// Returns the generation of the slot this handle was issued for.
            #[must_use]
            #[inline]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.index, self.generation)
            }
        }
    };
}

generational_handle!(
    /// Handle to an entity living in a [`Model`](crate::Model).
    ///
    /// Entity identity is handle identity: two `EntityId`s are equal exactly
    /// when they name the same live entity.
    EntityId
);

generational_handle!(
    /// Handle to an ordered collection living in a [`Model`](crate::Model).
    ListId
);

generational_handle!(
    /// Handle to a key-value collection living in a [`Model`](crate::Model).
    MapId
);

impl DenseKey for EntityId {
    #[inline]
    fn index(&self) -> usize {
        self.index as usize
    }
}
