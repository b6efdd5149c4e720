// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The entity arena and the intercepted read/write paths.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::Cell;
use core::fmt;

use rewind_graph::OwnershipGraph;
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::behavior::{Interception, WriteDecision, WriteOutcome};
use crate::capability::{CapabilityTable, Installation, Resolver, Scope};
use crate::collection::{ListRecord, MapRecord};
use crate::error::{Error, Result};
use crate::id::{EntityId, EntityTypeId, Property, PropertyId};
use crate::notify::Notification;
use crate::registry::{PropertyRegistration, Registry, TypeRegistration};
use crate::store::PropertyStore;
use crate::value::{PropertyValue, Value};

#[derive(Debug)]
pub(crate) struct EntityRecord {
    pub(crate) ty: EntityTypeId,
    pub(crate) store: PropertyStore,
    capabilities: CapabilityTable,
}

/// An in-process object database of entities, collections, and the ownership
/// edges between them.
///
/// Every property access goes through the property's behavior pipeline:
///
/// - [`read`](Self::read): stored value (or the declared default), then
///   `before_read` hooks, then `after_read` hooks which may replace it. A
///   replaced value is written back. The result is wired into the ownership
///   graph.
/// - [`write`](Self::write): reads the current value, runs `before_write`
///   hooks (any may reject), commits if the value differs, runs `after_write`
///   hooks, stores the final value even when unchanged, rewires, and queues a
///   [`Notification::PropertyChanged`] if something changed.
///
/// Mutation is single threaded: every mutating call takes `&mut self`.
///
/// # Example
///
/// ```rust
/// use rewind_property::{
///     Model, Notification, PropertyMetadataBuilder, Registry, TypeMetadata, Value,
/// };
///
/// let mut registry = Registry::new();
/// let node = registry.register_type("Node", TypeMetadata::default());
/// let label = registry.register_property(node, "Label", PropertyMetadataBuilder::new(String::new()).build());
/// let next = registry.register_property(node, "Next", PropertyMetadataBuilder::new(Value::Null).build());
///
/// let mut model = Model::new(registry);
/// let a = model.create(node)?;
/// let b = model.create(node)?;
///
/// model.set(a, label, "a".to_string())?;
/// model.set(a, next, Value::Entity(b))?;
///
/// // `a` now owns `b`.
/// assert_eq!(model.parents(b).collect::<Vec<_>>(), vec![a]);
/// assert_eq!(model.drain_notifications().len(), 2);
/// # Ok::<(), rewind_property::Error>(())
/// ```
pub struct Model {
    registry: Rc<Registry>,
    entities: Arena<EntityRecord>,
    pub(crate) lists: Arena<ListRecord>,
    pub(crate) maps: Arena<MapRecord>,
    pub(crate) graph: OwnershipGraph<EntityId>,
    ambient: CapabilityTable,
    notifications: Vec<Notification>,
    pub(crate) applying: Rc<Cell<usize>>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("entities", &self.entities.len())
            .field("lists", &self.lists.len())
            .field("maps", &self.maps.len())
            .field("edges", &self.graph.edge_count())
            .field("pending_notifications", &self.notifications.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates an empty model over a finished registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Rc::new(registry),
            entities: Arena::default(),
            lists: Arena::default(),
            maps: Arena::default(),
            graph: OwnershipGraph::new(),
            ambient: CapabilityTable::new(),
            notifications: Vec::new(),
            applying: Rc::new(Cell::new(0)),
        }
    }

    /// The registry this model was built over.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_rc(&self) -> &Rc<Registry> {
        &self.registry
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.len() == 0
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.record(entity).is_ok()
    }

    /// Iterates live entities.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .map(|(index, generation, _)| EntityId::new(index, generation))
    }

    /// Returns the type of `entity`.
    pub fn entity_type(&self, entity: EntityId) -> Result<EntityTypeId> {
        Ok(self.record(entity)?.ty)
    }

    /// Returns `true` while a snapshot is being applied.
    #[must_use]
    pub fn is_applying(&self) -> bool {
        self.applying.get() > 0
    }

    pub(crate) fn record(&self, entity: EntityId) -> Result<&EntityRecord> {
        self.entities
            .get(entity.slot(), entity.generation())
            .ok_or(Error::MissingEntity(entity))
    }

    pub(crate) fn record_mut(&mut self, entity: EntityId) -> Result<&mut EntityRecord> {
        self.entities
            .get_mut(entity.slot(), entity.generation())
            .ok_or(Error::MissingEntity(entity))
    }

    /// Raw store of `entity`. Bypasses every behavior.
    pub fn store(&self, entity: EntityId) -> Result<&PropertyStore> {
        Ok(&self.record(entity)?.store)
    }

    /// Stored value of one property, without running the pipeline or
    /// falling back to the default.
    pub fn peek(&self, entity: EntityId, property: PropertyId) -> Result<Option<&Value>> {
        Ok(self.store(entity)?.get(property))
    }

    /// Looks up a property of `entity`'s type by name.
    pub fn property_id(&self, entity: EntityId, name: &str) -> Result<PropertyId> {
        let ty = self.entity_type(entity)?;
        self.registry
            .property_by_name(ty, name)
            .ok_or_else(|| Error::UnknownPropertyName {
                ty: self.type_name(ty),
                name: name.into(),
            })
    }

    fn type_name(&self, ty: EntityTypeId) -> &'static str {
        self.registry.entity_type(ty).map_or("?", TypeRegistration::name)
    }

    fn declaration<'r>(
        &self,
        registry: &'r Registry,
        entity: EntityId,
        property: PropertyId,
    ) -> Result<&'r PropertyRegistration> {
        let ty = self.entity_type(entity)?;
        registry
            .property(property)
            .filter(|p| p.owner() == ty)
            .ok_or_else(|| Error::UndeclaredProperty {
                ty: self.type_name(ty),
                property,
            })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Constructs an entity of type `ty`.
    ///
    /// Capabilities are installed for every declaration, then each behavior's
    /// `on_initialize` runs once in lifecycle priority order, then each
    /// `on_initialized`. If a hook fails the entity is removed again and the
    /// error is returned.
    pub fn create(&mut self, ty: EntityTypeId) -> Result<EntityId> {
        let registry = Rc::clone(&self.registry);
        let registration = registry.entity_type(ty).ok_or(Error::UnknownType(ty))?;

        let (index, generation) = self.entities.insert(EntityRecord {
            ty,
            store: PropertyStore::new(),
            capabilities: CapabilityTable::new(),
        });
        let entity = EntityId::new(index, generation);

        if let Some(record) = self.entities.get_mut(index, generation) {
            for hook in registration.install_order() {
                let mut installation =
                    Installation::new(&mut record.capabilities, entity, hook.scope);
                hook.behavior.install(&mut installation);
            }
        }
        debug!(?entity, ty = registration.name(), "created entity");

        if let Err(err) = self.initialize(entity, registration) {
            debug!(?entity, %err, "initialization failed");
            // A failing hook may already have removed the entity itself.
            if let Err(removal) = self.remove(entity) {
                trace!(?entity, %removal, "entity gone before rollback");
            }
            return Err(err);
        }
        Ok(entity)
    }

    fn initialize(&mut self, entity: EntityId, registration: &TypeRegistration) -> Result<()> {
        for hook in registration.lifecycle_order() {
            let mut cx = Interception::new(self, entity, hook.scope);
            hook.behavior.on_initialize(&mut cx)?;
        }
        for hook in registration.lifecycle_order() {
            let mut cx = Interception::new(self, entity, hook.scope);
            hook.behavior.on_initialized(&mut cx)?;
        }
        Ok(())
    }

    /// Destroys `entity`.
    ///
    /// Its ownership edges and list subscriptions are dropped. Collections it
    /// referenced stay alive; other entities may share them.
    pub fn remove(&mut self, entity: EntityId) -> Result<()> {
        let record = self
            .entities
            .remove(entity.slot(), entity.generation())
            .ok_or(Error::MissingEntity(entity))?;
        for (property, value) in record.store.iter() {
            if let Value::List(list) = value {
                self.unsubscribe(*list, entity, property);
            }
        }
        self.graph.remove_key(entity);
        debug!(?entity, "removed entity");
        Ok(())
    }

    // =========================================================================
    // Property access
    // =========================================================================

    /// Reads a property through its pipeline.
    pub fn read(&mut self, entity: EntityId, property: PropertyId) -> Result<Value> {
        let registry = Rc::clone(&self.registry);
        let declaration = self.declaration(&registry, entity, property)?;
        let pipeline = declaration.pipeline();
        let scope = Scope::Property(property);

        let original = self
            .record(entity)?
            .store
            .get(property)
            .cloned()
            .unwrap_or_else(|| declaration.default_value().clone());

        for behavior in pipeline.before_read() {
            behavior.before_read(&mut Interception::new(self, entity, scope))?;
        }

        let mut value = original.clone();
        for behavior in pipeline.after_read() {
            value = behavior.after_read(&mut Interception::new(self, entity, scope), value)?;
        }

        if value != original {
            let displaced = self.record_mut(entity)?.store.set(property, value.clone());
            trace!(?entity, property = declaration.name(), "materialised on read");
            if let Some(old) = displaced
                && old != value
            {
                self.unwire(entity, property, &old);
            }
        }
        self.wire(entity, property, &value);
        Ok(value)
    }

    /// Writes a property through its pipeline.
    ///
    /// Returns [`WriteOutcome::Rejected`] without touching anything if a
    /// `before_write` hook rejects. Otherwise the final value is always
    /// stored; only a change is notified.
    pub fn write(
        &mut self,
        entity: EntityId,
        property: PropertyId,
        value: Value,
    ) -> Result<WriteOutcome> {
        let registry = Rc::clone(&self.registry);
        let declaration = self.declaration(&registry, entity, property)?;
        let pipeline = declaration.pipeline();
        let scope = Scope::Property(property);

        let mut current = self.read(entity, property)?;
        let mut proposed = value;

        for behavior in pipeline.before_write() {
            let mut cx = Interception::new(self, entity, scope);
            if behavior.before_write(&mut cx, &mut proposed, &mut current)? == WriteDecision::Reject
            {
                trace!(
                    ?entity,
                    property = declaration.name(),
                    behavior = behavior.name(),
                    "write rejected"
                );
                return Ok(WriteOutcome::Rejected);
            }
        }

        let changed = current != proposed;
        let displaced = if changed {
            self.record_mut(entity)?
                .store
                .set(property, proposed.clone())
        } else {
            None
        };

        let mut current = proposed.clone();
        for behavior in pipeline.after_write() {
            let mut cx = Interception::new(self, entity, scope);
            behavior.after_write(&mut cx, &proposed, &mut current, changed)?;
        }

        let replaced = self.record_mut(entity)?.store.set(property, current.clone());
        self.wire(entity, property, &current);
        for old in displaced.iter().chain(replaced.iter()) {
            if *old != current {
                self.unwire(entity, property, old);
            }
        }

        let notify = changed || replaced.is_some_and(|r| r != current);
        if notify {
            self.notify(Notification::PropertyChanged { entity, property });
        }
        trace!(?entity, property = declaration.name(), changed, "write");
        Ok(if changed {
            WriteOutcome::Changed
        } else {
            WriteOutcome::Unchanged
        })
    }

    /// Typed [`read`](Self::read).
    pub fn get<T: PropertyValue>(&mut self, entity: EntityId, property: Property<T>) -> Result<T> {
        let value = self.read(entity, property.id())?;
        let found = value.kind();
        T::from_value(value).ok_or(Error::TypeMismatch {
            property: property.id(),
            expected: core::any::type_name::<T>(),
            found,
        })
    }

    /// Typed [`write`](Self::write).
    pub fn set<T: PropertyValue>(
        &mut self,
        entity: EntityId,
        property: Property<T>,
        value: T,
    ) -> Result<WriteOutcome> {
        self.write(entity, property.id(), value.into_value())
    }

    /// [`read`](Self::read) by property name.
    pub fn read_by_name(&mut self, entity: EntityId, name: &str) -> Result<Value> {
        let property = self.property_id(entity, name)?;
        self.read(entity, property)
    }

    /// [`write`](Self::write) by property name.
    pub fn write_by_name(
        &mut self,
        entity: EntityId,
        name: &str,
        value: Value,
    ) -> Result<WriteOutcome> {
        let property = self.property_id(entity, name)?;
        self.write(entity, property, value)
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Resolves capability `C` for `entity` at `scope`.
    ///
    /// Looks at `scope`, then the entity's global scope, then the model's
    /// ambient table.
    #[must_use]
    pub fn capability<C: Any>(&self, entity: EntityId, scope: Scope) -> Option<&C> {
        let record = self.record(entity).ok()?;
        let ambient = Resolver::new(&self.ambient, Scope::Global);
        Resolver::new(&record.capabilities, scope)
            .with_parent(&ambient)
            .resolve()
    }

    /// Mutable variant of [`capability`](Self::capability).
    pub fn capability_mut<C: Any>(&mut self, entity: EntityId, scope: Scope) -> Option<&mut C> {
        let record = self.entities.get_mut(entity.slot(), entity.generation())?;
        if record.capabilities.contains::<C>(scope)
            || record.capabilities.contains::<C>(Scope::Global)
        {
            return record.capabilities.lookup_mut(scope);
        }
        self.ambient.lookup_mut(Scope::Global)
    }

    /// Every distinct instance of `C` visible to `entity` at `scope`, nearest first.
    #[must_use]
    pub fn capabilities<C: Any>(&self, entity: EntityId, scope: Scope) -> Vec<&C> {
        let Ok(record) = self.record(entity) else {
            return Vec::new();
        };
        let ambient = Resolver::new(&self.ambient, Scope::Global);
        Resolver::new(&record.capabilities, scope)
            .with_parent(&ambient)
            .resolve_all()
    }

    /// Registers a model-wide capability, visible to every entity that does
    /// not provide its own.
    pub fn install_ambient<C: Any>(&mut self, capability: C) {
        self.ambient.insert(Scope::Global, capability);
    }

    /// Returns a model-wide capability.
    #[must_use]
    pub fn ambient<C: Any>(&self) -> Option<&C> {
        self.ambient.get(Scope::Global)
    }

    // =========================================================================
    // Ownership graph
    // =========================================================================

    /// The ownership graph.
    #[must_use]
    pub fn graph(&self) -> &OwnershipGraph<EntityId> {
        &self.graph
    }

    /// Direct owners of `entity`.
    ///
    /// The graph is indexed by slot, so a stale handle would otherwise see
    /// the edges of whichever entity reuses its slot. Dead handles yield
    /// nothing.
    pub fn parents(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let live = self.contains(entity);
        self.graph.parents(entity).filter(move |_| live)
    }

    /// Entities directly owned by `entity`. Dead handles yield nothing.
    pub fn children(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let live = self.contains(entity);
        self.graph.children(entity).filter(move |_| live)
    }

    /// Every transitive owner of `entity`. Empty for a dead handle.
    #[must_use]
    pub fn ancestors(&self, entity: EntityId) -> Vec<EntityId> {
        if !self.contains(entity) {
            return Vec::new();
        }
        self.graph.ancestors(entity).collect()
    }

    /// Everything `entity` transitively owns. Empty for a dead handle.
    #[must_use]
    pub fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        if !self.contains(entity) {
            return Vec::new();
        }
        self.graph.descendants(entity).collect()
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Queues a notification.
    pub fn notify(&mut self, notification: Notification) {
        trace!(?notification, "notify");
        self.notifications.push(notification);
    }

    /// Notifications queued since the last drain.
    #[must_use]
    pub fn pending_notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Takes every queued notification.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        core::mem::take(&mut self.notifications)
    }
}
