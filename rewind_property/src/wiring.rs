// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keeps the ownership graph in step with stored values.
//!
//! A value is wired when it is read or committed:
//!
//! - an entity gets an edge from the owner;
//! - a map wires every entity key and value;
//! - an observable list records a subscription for `(owner, property)` and
//!   wires its current elements;
//! - a plain list wires its current elements only.
//!
//! A displaced value is unwired: subscriptions are dropped and edges to its
//! participants are removed unless the owner still references them through
//! another stored value.

use alloc::vec::Vec;

use tracing::trace;

use crate::id::{EntityId, PropertyId};
use crate::model::Model;
use crate::value::Value;

impl Model {
    pub(crate) fn wire(&mut self, owner: EntityId, property: PropertyId, value: &Value) {
        match value {
            Value::Entity(child) => self.link(owner, *child),
            Value::Map(map) => {
                let mut found = Vec::new();
                if let Ok(record) = self.map_record(*map) {
                    for (key, value) in &record.entries {
                        found.extend(key.as_entity());
                        found.extend(value.as_entity());
                    }
                }
                for child in found {
                    self.link(owner, child);
                }
            }
            Value::List(list) => {
                self.subscribe(*list, owner, property);
                let found: Vec<EntityId> = self
                    .list_record(*list)
                    .map(|r| r.items.iter().filter_map(Value::as_entity).collect())
                    .unwrap_or_default();
                for child in found {
                    self.link(owner, child);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn unwire(&mut self, owner: EntityId, property: PropertyId, old: &Value) {
        if let Value::List(list) = old
            && !self.holds(owner, property, old)
        {
            self.unsubscribe(*list, owner, property);
        }
        let mut candidates = Vec::new();
        self.participants(old, &mut candidates);
        self.prune(owner, &candidates);
    }

    /// Adds `owner -> child` unless it would be a self edge or `child` is gone.
    pub(crate) fn link(&mut self, owner: EntityId, child: EntityId) {
        if owner != child && self.contains(child) && self.graph.add_edge(owner, child) {
            trace!(?owner, ?child, "linked");
        }
    }

    /// Entities directly reachable through `value`, one level deep.
    pub(crate) fn participants(&self, value: &Value, out: &mut Vec<EntityId>) {
        match value {
            Value::Entity(e) => out.push(*e),
            Value::List(list) => {
                if let Ok(record) = self.list_record(*list) {
                    out.extend(record.items.iter().filter_map(Value::as_entity));
                }
            }
            Value::Map(map) => {
                if let Ok(record) = self.map_record(*map) {
                    for (key, value) in &record.entries {
                        out.extend(key.as_entity());
                        out.extend(value.as_entity());
                    }
                }
            }
            _ => {}
        }
    }

    /// Returns `true` if any value stored on `owner` reaches `target`.
    pub(crate) fn references(&self, owner: EntityId, target: EntityId) -> bool {
        let Ok(store) = self.store(owner) else {
            return false;
        };
        let mut found = Vec::new();
        store.values().any(|value| {
            found.clear();
            self.participants(value, &mut found);
            found.contains(&target)
        })
    }

    fn holds(&self, owner: EntityId, property: PropertyId, value: &Value) -> bool {
        self.peek(owner, property)
            .ok()
            .flatten()
            .is_some_and(|stored| stored == value)
    }

    /// Removes `owner -> c` for every candidate `owner` no longer references.
    pub(crate) fn prune(&mut self, owner: EntityId, candidates: &[EntityId]) {
        for &child in candidates {
            if !self.references(owner, child) && self.graph.remove_edge(owner, child) {
                trace!(?owner, ?child, "unlinked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::id::EntityId;
    use crate::metadata::{PropertyMetadataBuilder, TypeMetadata};
    use crate::model::Model;
    use crate::registry::Registry;
    use crate::value::Value;
    use alloc::vec::Vec;

    fn setup() -> (Model, [crate::id::PropertyId; 3], [EntityId; 3]) {
        let mut registry = Registry::new();
        let ty = registry.register_type("Node", TypeMetadata::default());
        let a = registry.register_property(ty, "A", PropertyMetadataBuilder::new(Value::Null).build());
        let b = registry.register_property(ty, "B", PropertyMetadataBuilder::new(Value::Null).build());
        let c = registry.register_property(ty, "C", PropertyMetadataBuilder::new(Value::Null).build());
        let mut model = Model::new(registry);
        let owner = model.create(ty).unwrap();
        let x = model.create(ty).unwrap();
        let y = model.create(ty).unwrap();
        (model, [a.id(), b.id(), c.id()], [owner, x, y])
    }

    #[test]
    fn shared_reference_survives_overwrite() {
        let (mut model, [a, b, _], [owner, x, y]) = setup();
        model.write(owner, a, Value::Entity(x)).unwrap();
        model.write(owner, b, Value::Entity(x)).unwrap();
        model.write(owner, a, Value::Entity(y)).unwrap();
        // Still held through `b`.
        assert!(model.graph().contains_edge(owner, x));
        model.write(owner, b, Value::Null).unwrap();
        assert!(!model.graph().contains_edge(owner, x));
        assert!(model.graph().contains_edge(owner, y));
    }

    #[test]
    fn map_keys_and_values_are_wired() {
        let (mut model, [_, _, c], [owner, x, y]) = setup();
        let map = model.new_map();
        model.map_insert(map, Value::Entity(x), Value::Entity(y)).unwrap();
        model.write(owner, c, Value::Map(map)).unwrap();
        let mut children: Vec<_> = model.children(owner).collect();
        children.sort_by_key(|e| e.slot());
        assert_eq!(children, [x, y]);

        model.write(owner, c, Value::Null).unwrap();
        assert!(!model.graph().has_children(owner));
    }

    #[test]
    fn plain_list_is_wired_on_read_only() {
        let (mut model, [a, ..], [owner, x, _]) = setup();
        let list = model.new_list();
        model.write(owner, a, Value::List(list)).unwrap();
        model.list_push(list, Value::Entity(x)).unwrap();
        assert!(!model.graph().contains_edge(owner, x));
        model.read(owner, a).unwrap();
        assert!(model.graph().contains_edge(owner, x));
    }

    #[test]
    fn self_reference_is_not_an_edge() {
        let (mut model, [a, ..], [owner, ..]) = setup();
        model.write(owner, a, Value::Entity(owner)).unwrap();
        assert!(!model.graph().has_parents(owner));
    }
}
