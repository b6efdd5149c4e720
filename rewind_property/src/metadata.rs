// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarations for entity types and properties.
//!
//! [`TypeMetadata`] lists the behaviors declared on an entity type;
//! [`PropertyMetadata`] carries a property's default value and the behaviors
//! declared on that property. Both are consumed by the [`Registry`](crate::Registry).

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::behavior::Behavior;
use crate::value::PropertyValue;

/// Declaration of a property: default value plus property-level behaviors.
///
/// # Example
///
/// ```rust
/// use rewind_property::builtin::Log;
/// use rewind_property::PropertyMetadataBuilder;
///
/// let metadata = PropertyMetadataBuilder::new(String::from("untitled"))
///     .behavior(Log::default())
///     .build();
///
/// assert_eq!(metadata.default_value(), "untitled");
/// assert_eq!(metadata.behaviors().len(), 1);
/// ```
pub struct PropertyMetadata<T> {
    default_value: T,
    behaviors: Vec<Rc<dyn Behavior>>,
}

impl<T: PropertyValue + Clone> PropertyMetadata<T> {
    /// Creates metadata with no behaviors.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            behaviors: Vec::new(),
        }
    }

    /// The value a property reads as when nothing is stored.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Property-level behaviors, in declaration order.
    #[must_use]
    #[inline]
    pub fn behaviors(&self) -> &[Rc<dyn Behavior>] {
        &self.behaviors
    }

    pub(crate) fn into_parts(self) -> (T, Vec<Rc<dyn Behavior>>) {
        (self.default_value, self.behaviors)
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("behaviors", &self.behaviors)
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
pub struct PropertyMetadataBuilder<T> {
    default_value: T,
    behaviors: Vec<Rc<dyn Behavior>>,
}

impl<T: fmt::Debug> fmt::Debug for PropertyMetadataBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("default_value", &self.default_value)
            .field("behaviors", &self.behaviors)
            .finish()
    }
}

impl<T: PropertyValue + Clone> PropertyMetadataBuilder<T> {
    /// Starts a declaration with the given default.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            behaviors: Vec::new(),
        }
    }

    /// Declares a behavior on this property.
    #[must_use]
    pub fn behavior(self, behavior: impl Behavior) -> Self {
        self.shared_behavior(Rc::new(behavior))
    }

    /// Declares an already shared behavior instance.
    ///
    /// Declaring the same instance on several properties runs its lifecycle
    /// hooks once per entity.
    #[must_use]
    pub fn shared_behavior(mut self, behavior: Rc<dyn Behavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Builds the [`PropertyMetadata`].
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        PropertyMetadata {
            default_value: self.default_value,
            behaviors: self.behaviors,
        }
    }
}

/// Declaration of an entity type: behaviors that intercept all its properties.
#[derive(Debug, Default)]
pub struct TypeMetadata {
    behaviors: Vec<Rc<dyn Behavior>>,
}

impl TypeMetadata {
    /// Type-level behaviors, in declaration order.
    #[must_use]
    pub fn behaviors(&self) -> &[Rc<dyn Behavior>] {
        &self.behaviors
    }

    pub(crate) fn into_behaviors(self) -> Vec<Rc<dyn Behavior>> {
        self.behaviors
    }
}

/// Builder for [`TypeMetadata`].
#[derive(Debug, Default)]
pub struct TypeMetadataBuilder {
    behaviors: Vec<Rc<dyn Behavior>>,
}

impl TypeMetadataBuilder {
    /// Starts an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a behavior on every property of the type.
    #[must_use]
    pub fn behavior(self, behavior: impl Behavior) -> Self {
        self.shared_behavior(Rc::new(behavior))
    }

    /// Declares an already shared behavior instance.
    #[must_use]
    pub fn shared_behavior(mut self, behavior: Rc<dyn Behavior>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Builds the [`TypeMetadata`].
    #[must_use]
    pub fn build(self) -> TypeMetadata {
        TypeMetadata {
            behaviors: self.behaviors,
        }
    }
}
