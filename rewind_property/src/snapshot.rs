// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural snapshots of entities.
//!
//! [`Model::export`] captures an entity's stored properties recursively:
//! nested entities become nested [`Snapshot`]s, lists become
//! [`ListSnapshot`]s, maps become [`MapSnapshot`]s, and everything else is
//! kept as a scalar [`Value`]. A snapshot never changes after it is taken and
//! is cheap to clone.
//!
//! [`Model::apply`] restores a snapshot onto a live entity. Keys absent from
//! the snapshot are removed, every other key is restored, recursing into the
//! entity's current nested entities and collections where the shapes line up
//! and constructing fresh targets where they do not. Each touched key is
//! notified whether or not its value changed.
//!
//! ## Equality
//!
//! Two snapshots are equal when they record the same entity type and the same
//! key set with recursively equal values. Stored values equal to the
//! property's declared default are not exported, so a property explicitly set
//! to its default compares equal to one that was never written. List equality
//! is ordered; map equality ignores entry order.
//!
//! ## Cycles
//!
//! Ownership graphs may be cyclic. An entity or collection that is already
//! being exported further up the current path is recorded as a scalar handle
//! instead of being expanded again.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use tracing::{debug, warn};

use crate::behavior::Interception;
use crate::error::{Error, Result};
use crate::id::{EntityId, EntityTypeId, PropertyId};
use crate::model::Model;
use crate::notify::Notification;
use crate::value::Value;

/// An immutable, structurally comparable export of one entity.
#[derive(Clone)]
pub struct Snapshot {
    inner: Rc<SnapshotInner>,
}

#[derive(PartialEq)]
struct SnapshotInner {
    ty: EntityTypeId,
    values: BTreeMap<PropertyId, SnapshotValue>,
}

impl Snapshot {
    fn new(ty: EntityTypeId, values: BTreeMap<PropertyId, SnapshotValue>) -> Self {
        Self {
            inner: Rc::new(SnapshotInner { ty, values }),
        }
    }

    /// Type of the exported entity.
    #[must_use]
    #[inline]
    pub fn entity_type(&self) -> EntityTypeId {
        self.inner.ty
    }

    /// Number of recorded properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    /// Returns `true` if no property was recorded.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// Recorded value of `property`.
    #[must_use]
    pub fn get(&self, property: PropertyId) -> Option<&SnapshotValue> {
        self.inner.values.get(&property)
    }

    /// Returns `true` if `property` was recorded.
    #[must_use]
    pub fn contains(&self, property: PropertyId) -> bool {
        self.inner.values.contains_key(&property)
    }

    /// Recorded properties in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &SnapshotValue)> + '_ {
        self.inner.values.iter().map(|(k, v)| (*k, v))
    }

    /// Recorded property ids in ascending order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.inner.values.keys().copied()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("ty", &self.inner.ty)
            .field("values", &self.inner.values)
            .finish()
    }
}

/// One recorded property value.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotValue {
    /// A value kept as is: scalars, opaque values, and handles that were not
    /// expanded (cycles, dangling references).
    Scalar(Value),
    /// A nested entity.
    Entity(Snapshot),
    /// A list.
    List(ListSnapshot),
    /// A map.
    Map(MapSnapshot),
}

impl SnapshotValue {
    /// The scalar, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// The nested entity snapshot, if this is one.
    #[must_use]
    pub fn as_entity(&self) -> Option<&Snapshot> {
        match self {
            Self::Entity(s) => Some(s),
            _ => None,
        }
    }

    /// The list snapshot, if this is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&ListSnapshot> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// The map snapshot, if this is one.
    #[must_use]
    pub fn as_map(&self) -> Option<&MapSnapshot> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Recorded elements of a list.
///
/// Equality compares elements in order and ignores observability.
#[derive(Clone, Debug)]
pub struct ListSnapshot {
    observable: bool,
    items: Vec<SnapshotValue>,
}

impl ListSnapshot {
    /// Recorded elements.
    #[must_use]
    pub fn items(&self) -> &[SnapshotValue] {
        &self.items
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the exported list was observable. Restored lists keep it.
    #[must_use]
    pub fn is_observable(&self) -> bool {
        self.observable
    }
}

impl PartialEq for ListSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// Recorded entries of a map.
///
/// Equality ignores entry order.
#[derive(Clone, Debug)]
pub struct MapSnapshot {
    entries: Vec<(SnapshotValue, SnapshotValue)>,
}

impl MapSnapshot {
    /// Recorded entries in the map's insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(SnapshotValue, SnapshotValue)] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value recorded under a scalar key.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&SnapshotValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_scalar() == Some(key))
            .map(|(_, v)| v)
    }
}

impl PartialEq for MapSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|entry| other.entries.contains(entry))
    }
}

/// Holds the model in the applying state until dropped, including while a
/// hook unwinds.
#[derive(Debug)]
struct Applying(Rc<Cell<usize>>);

impl Applying {
    fn enter(depth: &Rc<Cell<usize>>) -> Self {
        depth.set(depth.get() + 1);
        Self(Rc::clone(depth))
    }
}

impl Drop for Applying {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl Model {
    /// Captures the stored state of `entity`.
    pub fn export(&self, entity: EntityId) -> Result<Snapshot> {
        let mut path = Vec::new();
        self.export_entity(entity, &mut path)
    }

    fn export_entity(&self, entity: EntityId, path: &mut Vec<Value>) -> Result<Snapshot> {
        let ty = self.entity_type(entity)?;
        path.push(Value::Entity(entity));
        let mut values = BTreeMap::new();
        for (property, value) in self.store(entity)?.iter() {
            let is_default = self
                .registry()
                .property(property)
                .is_some_and(|p| p.default_value() == value);
            if !is_default {
                values.insert(property, self.export_value(value, path));
            }
        }
        path.pop();
        Ok(Snapshot::new(ty, values))
    }

    fn export_value(&self, value: &Value, path: &mut Vec<Value>) -> SnapshotValue {
        let container = matches!(value, Value::Entity(_) | Value::List(_) | Value::Map(_));
        if container && path.contains(value) {
            return SnapshotValue::Scalar(value.clone());
        }
        match value {
            Value::Entity(entity) => match self.export_entity(*entity, path) {
                Ok(snapshot) => SnapshotValue::Entity(snapshot),
                Err(_) => {
                    warn!(?entity, "exporting dangling entity reference");
                    SnapshotValue::Scalar(value.clone())
                }
            },
            Value::List(list) => {
                let Ok(record) = self.list_record(*list) else {
                    warn!(?list, "exporting dangling list reference");
                    return SnapshotValue::Scalar(value.clone());
                };
                path.push(value.clone());
                let items = record
                    .items
                    .iter()
                    .map(|item| self.export_value(item, path))
                    .collect();
                path.pop();
                SnapshotValue::List(ListSnapshot {
                    observable: record.observable,
                    items,
                })
            }
            Value::Map(map) => {
                let Ok(record) = self.map_record(*map) else {
                    warn!(?map, "exporting dangling map reference");
                    return SnapshotValue::Scalar(value.clone());
                };
                path.push(value.clone());
                let entries = record
                    .entries
                    .iter()
                    .map(|(k, v)| (self.export_value(k, path), self.export_value(v, path)))
                    .collect();
                path.pop();
                SnapshotValue::Map(MapSnapshot { entries })
            }
            _ => SnapshotValue::Scalar(value.clone()),
        }
    }

    /// Restores `snapshot` onto `entity`.
    ///
    /// The snapshot must record the entity's type. Collection hooks do not
    /// run while the apply is in progress; `after_apply` hooks run for every
    /// entity the apply touched, innermost first.
    pub fn apply(&mut self, snapshot: &Snapshot, entity: EntityId) -> Result<()> {
        let _applying = Applying::enter(&self.applying);
        self.apply_entity(snapshot, entity)
    }

    /// Constructs a fresh entity of the snapshot's type and applies onto it.
    pub fn apply_new(&mut self, snapshot: &Snapshot) -> Result<EntityId> {
        let entity = self.create(snapshot.entity_type())?;
        self.apply(snapshot, entity)?;
        Ok(entity)
    }

    /// Returns `true` if `entity` currently exports to `snapshot`.
    pub fn matches(&self, snapshot: &Snapshot, entity: EntityId) -> Result<bool> {
        Ok(self.export(entity)? == *snapshot)
    }

    fn apply_entity(&mut self, snapshot: &Snapshot, entity: EntityId) -> Result<()> {
        let ty = self.entity_type(entity)?;
        if ty != snapshot.entity_type() {
            return Err(Error::SnapshotTypeMismatch {
                snapshot: snapshot.entity_type(),
                entity: ty,
            });
        }

        let stored: Vec<(PropertyId, Value)> = self
            .store(entity)?
            .iter()
            .map(|(p, v)| (p, v.clone()))
            .collect();
        let mut before = Vec::new();
        for (_, value) in &stored {
            self.participants(value, &mut before);
        }

        for (property, old) in &stored {
            if !snapshot.contains(*property) {
                self.record_mut(entity)?.store.remove(*property);
                self.unwire(entity, *property, old);
                self.notify(Notification::PropertyChanged {
                    entity,
                    property: *property,
                });
            }
        }

        for (property, recorded) in snapshot.iter() {
            let current = self.peek(entity, property)?.cloned();
            let value = self.apply_value(current.as_ref(), recorded)?;
            let old = self.record_mut(entity)?.store.set(property, value.clone());
            self.wire(entity, property, &value);
            if let Some(old) = old
                && old != value
            {
                self.unwire(entity, property, &old);
            }
            self.notify(Notification::PropertyChanged { entity, property });
        }
        self.prune(entity, &before);
        debug!(?entity, keys = snapshot.len(), "applied snapshot");

        let registry = Rc::clone(self.registry_rc());
        if let Some(registration) = registry.entity_type(ty) {
            for hook in registration.lifecycle_order() {
                let mut cx = Interception::new(self, entity, hook.scope);
                hook.behavior.after_apply(&mut cx, snapshot)?;
            }
        }
        Ok(())
    }

    fn apply_value(&mut self, current: Option<&Value>, recorded: &SnapshotValue) -> Result<Value> {
        match recorded {
            SnapshotValue::Scalar(value) => Ok(value.clone()),
            SnapshotValue::Entity(snapshot) => {
                let reusable = current.and_then(Value::as_entity).filter(|e| {
                    self.entity_type(*e).ok() == Some(snapshot.entity_type())
                });
                let target = match reusable {
                    Some(entity) => entity,
                    None => self.create(snapshot.entity_type())?,
                };
                self.apply_entity(snapshot, target)?;
                Ok(Value::Entity(target))
            }
            SnapshotValue::List(recorded) => {
                let target = match current.and_then(Value::as_list) {
                    Some(list) if self.list_record(list).is_ok() => list,
                    _ => self.alloc_list(recorded.observable),
                };
                let old = core::mem::take(&mut self.list_record_mut(target)?.items);
                let mut items = Vec::with_capacity(recorded.len());
                for (i, item) in recorded.items().iter().enumerate() {
                    items.push(self.apply_value(old.get(i), item)?);
                }

                let record = self.list_record_mut(target)?;
                record.items.clone_from(&items);
                if record.subscribers.is_empty() {
                    return Ok(Value::List(target));
                }
                let subscribers = record.subscribers.clone();
                let removed: Vec<EntityId> = old.iter().filter_map(Value::as_entity).collect();
                for (owner, _) in subscribers {
                    for child in items.iter().filter_map(Value::as_entity) {
                        self.link(owner, child);
                    }
                    self.prune(owner, &removed);
                }
                Ok(Value::List(target))
            }
            SnapshotValue::Map(recorded) => {
                let target = match current.and_then(Value::as_map) {
                    Some(map) if self.map_record(map).is_ok() => map,
                    _ => self.new_map(),
                };
                let old = core::mem::take(&mut self.map_record_mut(target)?.entries);
                let mut claimed: Vec<usize> = Vec::new();
                let mut entries = Vec::with_capacity(recorded.len());
                for (key, value) in recorded.entries() {
                    let key = match key {
                        SnapshotValue::Scalar(key) => key.clone(),
                        other => {
                            // Reuse a live key that exports the same way.
                            let live = (0..old.len()).find(|i| {
                                !claimed.contains(i)
                                    && self.export_value(&old[*i].0, &mut Vec::new()) == *other
                            });
                            let live = live.map(|i| {
                                claimed.push(i);
                                old[i].0.clone()
                            });
                            self.apply_value(live.as_ref(), other)?
                        }
                    };
                    let previous = old.iter().find(|(k, _)| *k == key).map(|(_, v)| v);
                    let value = self.apply_value(previous, value)?;
                    entries.push((key, value));
                }
                self.map_record_mut(target)?.entries = entries;
                Ok(Value::Map(target))
            }
        }
    }
}
