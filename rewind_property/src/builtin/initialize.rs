// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::rc::Rc;
use core::fmt;

use tracing::trace;

use crate::behavior::{Behavior, Interception, Priorities};
use crate::error::Result;
use crate::id::EntityTypeId;
use crate::model::Model;
use crate::value::Value;

type Factory = Rc<dyn Fn(&mut Model) -> Result<Value>>;

/// Gives a property a constructed value instead of its default.
///
/// The factory runs while the entity is initialized, and again on any later
/// read that finds the property back at its declared default. Declared on a
/// type, it does nothing; declare it per property.
///
/// # Example
///
/// ```rust
/// use rewind_property::builtin::Initialize;
/// use rewind_property::{Model, PropertyMetadataBuilder, Registry, TypeMetadata, Value};
///
/// let mut registry = Registry::new();
/// let folder = registry.register_type("Folder", TypeMetadata::default());
/// let items = registry.register_property(
///     folder,
///     "Items",
///     PropertyMetadataBuilder::new(Value::Null)
///         .behavior(Initialize::observable_list())
///         .build(),
/// );
///
/// let mut model = Model::new(registry);
/// let f = model.create(folder)?;
/// let list = model.peek(f, items.id())?.and_then(Value::as_list).unwrap();
/// assert!(model.is_observable(list)?);
/// # Ok::<(), rewind_property::Error>(())
/// ```
#[derive(Clone)]
pub struct Initialize {
    factory: Factory,
}

impl fmt::Debug for Initialize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Initialize").finish_non_exhaustive()
    }
}

impl Initialize {
    /// Uses a custom factory.
    pub fn with(factory: impl Fn(&mut Model) -> Result<Value> + 'static) -> Self {
        Self {
            factory: Rc::new(factory),
        }
    }

    /// Creates a plain list.
    #[must_use]
    pub fn list() -> Self {
        Self::with(|model| Ok(Value::List(model.new_list())))
    }

    /// Creates an observable list.
    #[must_use]
    pub fn observable_list() -> Self {
        Self::with(|model| Ok(Value::List(model.new_observable_list())))
    }

    /// Creates a map.
    #[must_use]
    pub fn map() -> Self {
        Self::with(|model| Ok(Value::Map(model.new_map())))
    }

    /// Creates a nested entity of type `ty`.
    #[must_use]
    pub fn entity(ty: EntityTypeId) -> Self {
        Self::with(move |model| model.create(ty).map(Value::Entity))
    }
}

impl Behavior for Initialize {
    fn priorities(&self) -> Priorities {
        Priorities {
            after_read: i32::MIN,
            lifecycle: i32::MIN,
            ..Priorities::default()
        }
    }

    fn after_read(&self, cx: &mut Interception<'_>, value: Value) -> Result<Value> {
        let Some(property) = cx.property() else {
            return Ok(value);
        };
        let at_default = cx
            .model()
            .registry()
            .property(property)
            .is_some_and(|p| *p.default_value() == value);
        if !at_default {
            return Ok(value);
        }
        trace!(entity = ?cx.entity(), %property, "constructing value");
        (self.factory)(cx.model_mut())
    }

    fn on_initialize(&self, cx: &mut Interception<'_>) -> Result<()> {
        if let Some(property) = cx.property() {
            let entity = cx.entity();
            cx.model_mut().read(entity, property)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PropertyMetadataBuilder, TypeMetadata};
    use crate::registry::Registry;

    #[test]
    fn materialises_at_construction() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Bag", TypeMetadata::default());
        let map = registry.register_property(
            ty,
            "Map",
            PropertyMetadataBuilder::new(Value::Null)
                .behavior(Initialize::map())
                .build(),
        );
        let mut model = Model::new(registry);
        let bag = model.create(ty).unwrap();
        let stored = model.peek(bag, map.id()).unwrap().and_then(Value::as_map);
        assert!(stored.is_some());
        // Reading again keeps the same instance.
        assert_eq!(model.read(bag, map.id()).unwrap().as_map(), stored);
    }

    #[test]
    fn reconstructs_after_reset_to_default() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Bag", TypeMetadata::default());
        let list = registry.register_property(
            ty,
            "List",
            PropertyMetadataBuilder::new(Value::Null)
                .behavior(Initialize::list())
                .build(),
        );
        let mut model = Model::new(registry);
        let bag = model.create(ty).unwrap();
        let first = model.read(bag, list.id()).unwrap().as_list().unwrap();

        model.write(bag, list.id(), Value::Null).unwrap();
        let second = model.read(bag, list.id()).unwrap().as_list().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn nested_entity_is_owned() {
        let mut registry = Registry::new();
        let leaf = registry.register_type("Leaf", TypeMetadata::default());
        let root = registry.register_type("Root", TypeMetadata::default());
        let child = registry.register_property(
            root,
            "Child",
            PropertyMetadataBuilder::new(Value::Null)
                .behavior(Initialize::entity(leaf))
                .build(),
        );
        let mut model = Model::new(registry);
        let r = model.create(root).unwrap();
        let c = model.peek(r, child.id()).unwrap().and_then(Value::as_entity).unwrap();
        assert_eq!(model.entity_type(c).unwrap(), leaf);
        assert!(model.graph().contains_edge(r, c));
    }
}
