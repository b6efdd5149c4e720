// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity type and property registry.
//!
//! Types and properties are registered once at startup. Registration resolves
//! every declaration into cached, ordered hook lists, so reads and writes never
//! sort or scan metadata at run time:
//!
//! - per property, a [`Pipeline`] holding the type-level and property-level
//!   behaviors of each phase, stable-sorted by that phase's priority and
//!   de-duplicated by behavior identity;
//! - per type, an install order (every declaration, type-level first) and a
//!   lifecycle order (each behavior instance once).

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::{HashMap, HashSet};

use crate::behavior::{Behavior, Priorities};
use crate::capability::Scope;
use crate::id::{BehaviorId, EntityTypeId, Property, PropertyId};
use crate::metadata::{PropertyMetadata, TypeMetadata};
use crate::value::{PropertyValue, Value};

type Declared = (BehaviorId, Rc<dyn Behavior>);

/// A behavior bound to the scope it was declared at.
#[derive(Clone, Debug)]
pub(crate) struct Hook {
    pub(crate) id: BehaviorId,
    pub(crate) behavior: Rc<dyn Behavior>,
    pub(crate) scope: Scope,
}

/// Ordered hook lists for one property.
#[derive(Debug, Default)]
pub struct Pipeline {
    before_read: Vec<Rc<dyn Behavior>>,
    after_read: Vec<Rc<dyn Behavior>>,
    before_write: Vec<Rc<dyn Behavior>>,
    after_write: Vec<Rc<dyn Behavior>>,
}

impl Pipeline {
    fn build(declared: &[Declared]) -> Self {
        let phase = |key: fn(&Priorities) -> i32| -> Vec<Rc<dyn Behavior>> {
            let mut order: Vec<(i32, &Declared)> = declared
                .iter()
                .map(|d| (key(&d.1.priorities()), d))
                .collect();
            order.sort_by_key(|(priority, _)| *priority);
            let mut seen = HashSet::new();
            order
                .into_iter()
                .filter(|(_, (id, _))| seen.insert(*id))
                .map(|(_, (_, b))| b.clone())
                .collect()
        };
        Self {
            before_read: phase(|p| p.before_read),
            after_read: phase(|p| p.after_read),
            before_write: phase(|p| p.before_write),
            after_write: phase(|p| p.after_write),
        }
    }

    /// `before_read` hooks in run order.
    #[must_use]
    pub fn before_read(&self) -> &[Rc<dyn Behavior>] {
        &self.before_read
    }

    /// `after_read` hooks in run order.
    #[must_use]
    pub fn after_read(&self) -> &[Rc<dyn Behavior>] {
        &self.after_read
    }

    /// `before_write` and `before_collection_change` hooks in run order.
    #[must_use]
    pub fn before_write(&self) -> &[Rc<dyn Behavior>] {
        &self.before_write
    }

    /// `after_write` and `after_collection_change` hooks in run order.
    #[must_use]
    pub fn after_write(&self) -> &[Rc<dyn Behavior>] {
        &self.after_write
    }
}

/// A registered property.
pub struct PropertyRegistration {
    name: &'static str,
    owner: EntityTypeId,
    value_type: &'static str,
    default_value: Value,
    pipeline: Pipeline,
}

impl PropertyRegistration {
    /// The property name, unique within its entity type.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The entity type that declares this property.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> EntityTypeId {
        self.owner
    }

    /// Rust type name the property was registered with.
    #[must_use]
    #[inline]
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// The value the property reads as when nothing is stored.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    /// Cached hook lists.
    #[must_use]
    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl fmt::Debug for PropertyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("value_type", &self.value_type)
            .field("default_value", &self.default_value)
            .finish_non_exhaustive()
    }
}

/// A registered entity type.
pub struct TypeRegistration {
    name: &'static str,
    behaviors: Vec<Declared>,
    properties: Vec<(PropertyId, Vec<Declared>)>,
    by_name: HashMap<&'static str, PropertyId>,
    install: Vec<Hook>,
    lifecycle: Vec<Hook>,
}

impl TypeRegistration {
    /// The type name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared properties, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.properties.iter().map(|(id, _)| *id)
    }

    /// Looks up a declared property by name.
    #[must_use]
    pub fn property_by_name(&self, name: &str) -> Option<PropertyId> {
        self.by_name.get(name).copied()
    }

    /// Returns `true` if `property` is declared on this type.
    #[must_use]
    pub fn declares(&self, property: PropertyId) -> bool {
        self.properties.iter().any(|(id, _)| *id == property)
    }

    pub(crate) fn install_order(&self) -> &[Hook] {
        &self.install
    }

    pub(crate) fn lifecycle_order(&self) -> &[Hook] {
        &self.lifecycle
    }

    fn rebuild_lifecycle(&mut self) {
        let mut install = Vec::new();

        let mut group: Vec<&Declared> = self.behaviors.iter().collect();
        group.sort_by_key(|d| d.1.priorities().lifecycle);
        install.extend(group.into_iter().map(|(id, b)| Hook {
            id: *id,
            behavior: b.clone(),
            scope: Scope::Global,
        }));

        for (property, declared) in &self.properties {
            let mut group: Vec<&Declared> = declared.iter().collect();
            group.sort_by_key(|d| d.1.priorities().lifecycle);
            install.extend(group.into_iter().map(|(id, b)| Hook {
                id: *id,
                behavior: b.clone(),
                scope: Scope::Property(*property),
            }));
        }

        let mut ordered = install.clone();
        ordered.sort_by_key(|h| h.behavior.priorities().lifecycle);
        let mut seen = HashSet::new();
        ordered.retain(|h| seen.insert(h.id));

        self.install = install;
        self.lifecycle = ordered;
    }
}

impl fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("name", &self.name)
            .field("behaviors", &self.behaviors.len())
            .field("properties", &self.by_name.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Registry of entity types, their properties, and declared behaviors.
///
/// A [`Model`](crate::Model) takes ownership of its registry; register
/// everything before constructing the model.
///
/// # Example
///
/// ```rust
/// use rewind_property::{PropertyMetadataBuilder, Registry, TypeMetadata};
///
/// let mut registry = Registry::new();
/// let person = registry.register_type("Person", TypeMetadata::default());
/// let name = registry.register_property(
///     person,
///     "Name",
///     PropertyMetadataBuilder::new(String::new()).build(),
/// );
///
/// assert_eq!(registry.type_by_name("Person"), Some(person));
/// assert_eq!(registry.property_by_name(person, "Name"), Some(name.id()));
/// assert_eq!(registry.property(name.id()).map(|p| p.name()), Some("Name"));
/// ```
#[derive(Default)]
pub struct Registry {
    types: Vec<TypeRegistration>,
    type_by_name: HashMap<&'static str, EntityTypeId>,
    properties: Vec<PropertyRegistration>,
    behaviors: Vec<Rc<dyn Behavior>>,
    behavior_by_addr: HashMap<usize, BehaviorId>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, behavior: Rc<dyn Behavior>) -> Declared {
        let addr = Rc::as_ptr(&behavior).cast::<()>() as usize;
        if let Some(&id) = self.behavior_by_addr.get(&addr) {
            return (id, behavior);
        }
        let index = u32::try_from(self.behaviors.len()).unwrap_or(u32::MAX);
        assert!(index < u32::MAX, "Too many behaviors registered");
        let id = BehaviorId::new(index);
        // The registry keeps every interned instance alive, so addresses are
        // never reused while the map holds them.
        self.behaviors.push(behavior.clone());
        self.behavior_by_addr.insert(addr, id);
        (id, behavior)
    }

    /// Registers an entity type.
    ///
    /// # Panics
    ///
    /// Panics if a type with the same name is already registered, or if more
    /// than 65,535 types are registered.
    pub fn register_type(&mut self, name: &'static str, metadata: TypeMetadata) -> EntityTypeId {
        assert!(
            !self.type_by_name.contains_key(name),
            "Entity type '{name}' is already registered"
        );
        let index = u16::try_from(self.types.len())
            .ok()
            .filter(|i| *i < u16::MAX);
        let Some(index) = index else {
            panic!("Too many entity types registered (max {})", u16::MAX);
        };
        let id = EntityTypeId::new(index);

        let behaviors = metadata
            .into_behaviors()
            .into_iter()
            .map(|b| self.intern(b))
            .collect();
        let mut registration = TypeRegistration {
            name,
            behaviors,
            properties: Vec::new(),
            by_name: HashMap::new(),
            install: Vec::new(),
            lifecycle: Vec::new(),
        };
        registration.rebuild_lifecycle();

        self.types.push(registration);
        self.type_by_name.insert(name, id);
        id
    }

    /// Registers a property on entity type `ty`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is not registered, if `ty` already declares a property
    /// named `name`, or if more than 65,535 properties are registered.
    pub fn register_property<T: PropertyValue + Clone>(
        &mut self,
        ty: EntityTypeId,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Property<T> {
        let type_index = usize::from(ty.index());
        assert!(
            type_index < self.types.len(),
            "Entity type {ty:?} is not registered"
        );
        assert!(
            !self.types[type_index].by_name.contains_key(name),
            "Property '{name}' is already registered on '{}'",
            self.types[type_index].name
        );
        let index = u16::try_from(self.properties.len())
            .ok()
            .filter(|i| *i < u16::MAX);
        let Some(index) = index else {
            panic!("Too many properties registered (max {})", u16::MAX);
        };
        let id = PropertyId::new(index);

        let (default_value, behaviors) = metadata.into_parts();
        let declared: Vec<Declared> = behaviors.into_iter().map(|b| self.intern(b)).collect();

        let mut chain: Vec<Declared> = self.types[type_index].behaviors.clone();
        chain.extend(declared.iter().cloned());
        let pipeline = Pipeline::build(&chain);

        self.properties.push(PropertyRegistration {
            name,
            owner: ty,
            value_type: core::any::type_name::<T>(),
            default_value: default_value.into_value(),
            pipeline,
        });

        let registration = &mut self.types[type_index];
        registration.properties.push((id, declared));
        registration.by_name.insert(name, id);
        registration.rebuild_lifecycle();

        Property::from_id(id)
    }

    /// Number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Number of registered properties across all types.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of distinct behavior instances.
    #[must_use]
    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Returns a registered type.
    #[must_use]
    pub fn entity_type(&self, ty: EntityTypeId) -> Option<&TypeRegistration> {
        self.types.get(usize::from(ty.index()))
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn type_by_name(&self, name: &str) -> Option<EntityTypeId> {
        self.type_by_name.get(name).copied()
    }

    /// Returns a registered property.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<&PropertyRegistration> {
        self.properties.get(usize::from(id.index()))
    }

    /// Looks up a property of `ty` by name.
    #[must_use]
    pub fn property_by_name(&self, ty: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.entity_type(ty)?.property_by_name(name)
    }

    /// Returns an interned behavior.
    #[must_use]
    pub fn behavior(&self, id: BehaviorId) -> Option<&Rc<dyn Behavior>> {
        self.behaviors.get(id.index() as usize)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types)
            .field("properties", &self.properties.len())
            .field("behaviors", &self.behaviors.len())
            .finish_non_exhaustive()
    }
}
