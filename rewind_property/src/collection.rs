// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered and key-value collections owned by a [`Model`].
//!
//! Collections live in the model's arenas and are referenced from property
//! values by [`ListId`] / [`MapId`]. A list is either plain or observable:
//!
//! - A **plain** list is wired into the ownership graph only when the
//!   property holding it is read or written. Later edits are not tracked.
//! - An **observable** list keeps a subscription for every `(owner, property)`
//!   that holds it. Each edit runs the subscribers' collection hooks, updates
//!   ownership edges for inserted and removed entities, then runs the
//!   after-hooks. Hooks are suppressed while a snapshot is being applied.
//!
//! Maps keep insertion order and compare keys with [`Value`] equality.

use alloc::rc::Rc;
use alloc::vec::Vec;

use smallvec::SmallVec;
use tracing::trace;

use crate::behavior::Interception;
use crate::capability::Scope;
use crate::error::{Error, Result};
use crate::id::{EntityId, ListId, MapId, PropertyId};
use crate::model::Model;
use crate::value::Value;

#[derive(Debug, Default)]
pub(crate) struct ListRecord {
    pub(crate) items: Vec<Value>,
    pub(crate) observable: bool,
    pub(crate) subscribers: SmallVec<[(EntityId, PropertyId); 2]>,
}

#[derive(Debug, Default)]
pub(crate) struct MapRecord {
    pub(crate) entries: Vec<(Value, Value)>,
}

/// What an observable list edit did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// One element was inserted.
    Insert,
    /// One element was removed.
    Remove,
    /// One element was overwritten.
    Replace,
    /// Every element was removed.
    Reset,
}

/// An edit to an observable list, delivered to collection hooks.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionChange {
    list: ListId,
    kind: ChangeKind,
    index: usize,
    added: Vec<Value>,
    removed: Vec<Value>,
}

impl CollectionChange {
    /// The list being edited.
    #[must_use]
    pub fn list(&self) -> ListId {
        self.list
    }

    /// The kind of edit.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Position of the edit. `0` for [`ChangeKind::Reset`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Elements entering the list.
    #[must_use]
    pub fn added(&self) -> &[Value] {
        &self.added
    }

    /// Elements leaving the list.
    #[must_use]
    pub fn removed(&self) -> &[Value] {
        &self.removed
    }
}

enum ListEdit {
    Insert(usize, Value),
    Remove(usize),
    Set(usize, Value),
    Clear,
}

#[derive(Copy, Clone)]
enum HookPhase {
    Before,
    After,
}

impl Model {
    /// Creates an empty plain list.
    pub fn new_list(&mut self) -> ListId {
        self.alloc_list(false)
    }

    /// Creates an empty observable list.
    pub fn new_observable_list(&mut self) -> ListId {
        self.alloc_list(true)
    }

    pub(crate) fn alloc_list(&mut self, observable: bool) -> ListId {
        let (index, generation) = self.lists.insert(ListRecord {
            observable,
            ..ListRecord::default()
        });
        ListId::new(index, generation)
    }

    /// Creates an empty map.
    pub fn new_map(&mut self) -> MapId {
        let (index, generation) = self.maps.insert(MapRecord::default());
        MapId::new(index, generation)
    }

    /// Frees a list. Properties still referencing it will read a dangling handle.
    pub fn remove_list(&mut self, list: ListId) -> Result<()> {
        self.lists
            .remove(list.slot(), list.generation())
            .map(drop)
            .ok_or(Error::MissingList(list))
    }

    /// Frees a map.
    pub fn remove_map(&mut self, map: MapId) -> Result<()> {
        self.maps
            .remove(map.slot(), map.generation())
            .map(drop)
            .ok_or(Error::MissingMap(map))
    }

    pub(crate) fn list_record(&self, list: ListId) -> Result<&ListRecord> {
        self.lists
            .get(list.slot(), list.generation())
            .ok_or(Error::MissingList(list))
    }

    pub(crate) fn list_record_mut(&mut self, list: ListId) -> Result<&mut ListRecord> {
        self.lists
            .get_mut(list.slot(), list.generation())
            .ok_or(Error::MissingList(list))
    }

    pub(crate) fn map_record(&self, map: MapId) -> Result<&MapRecord> {
        self.maps
            .get(map.slot(), map.generation())
            .ok_or(Error::MissingMap(map))
    }

    pub(crate) fn map_record_mut(&mut self, map: MapId) -> Result<&mut MapRecord> {
        self.maps
            .get_mut(map.slot(), map.generation())
            .ok_or(Error::MissingMap(map))
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Elements of a list.
    pub fn list(&self, list: ListId) -> Result<&[Value]> {
        Ok(&self.list_record(list)?.items)
    }

    /// Length of a list.
    pub fn list_len(&self, list: ListId) -> Result<usize> {
        Ok(self.list_record(list)?.items.len())
    }

    /// Returns `true` if the list delivers change hooks.
    pub fn is_observable(&self, list: ListId) -> Result<bool> {
        Ok(self.list_record(list)?.observable)
    }

    /// Appends an element.
    pub fn list_push(&mut self, list: ListId, value: Value) -> Result<()> {
        let len = self.list_len(list)?;
        self.edit_list(list, ListEdit::Insert(len, value))
            .map(drop)
    }

    /// Inserts an element at `index`. `index == len` appends.
    pub fn list_insert(&mut self, list: ListId, index: usize, value: Value) -> Result<()> {
        self.edit_list(list, ListEdit::Insert(index, value))
            .map(drop)
    }

    /// Removes and returns the element at `index`.
    pub fn list_remove(&mut self, list: ListId, index: usize) -> Result<Value> {
        let mut change = self.edit_list(list, ListEdit::Remove(index))?;
        Ok(change.removed.pop().unwrap_or_default())
    }

    /// Overwrites the element at `index`, returning the previous one.
    pub fn list_set(&mut self, list: ListId, index: usize, value: Value) -> Result<Value> {
        let mut change = self.edit_list(list, ListEdit::Set(index, value))?;
        Ok(change.removed.pop().unwrap_or_default())
    }

    /// Removes every element.
    pub fn list_clear(&mut self, list: ListId) -> Result<()> {
        self.edit_list(list, ListEdit::Clear).map(drop)
    }

    fn edit_list(&mut self, list: ListId, edit: ListEdit) -> Result<CollectionChange> {
        let record = self.list_record(list)?;
        let len = record.items.len();
        let check = |index: usize, limit: usize| {
            if index < limit {
                Ok(index)
            } else {
                Err(Error::IndexOutOfBounds { index, len })
            }
        };
        let change = match &edit {
            ListEdit::Insert(index, value) => CollectionChange {
                list,
                kind: ChangeKind::Insert,
                index: check(*index, len + 1)?,
                added: alloc::vec![value.clone()],
                removed: Vec::new(),
            },
            ListEdit::Remove(index) => CollectionChange {
                list,
                kind: ChangeKind::Remove,
                index: check(*index, len)?,
                added: Vec::new(),
                removed: alloc::vec![record.items[*index].clone()],
            },
            ListEdit::Set(index, value) => CollectionChange {
                list,
                kind: ChangeKind::Replace,
                index: check(*index, len)?,
                added: alloc::vec![value.clone()],
                removed: alloc::vec![record.items[*index].clone()],
            },
            ListEdit::Clear => CollectionChange {
                list,
                kind: ChangeKind::Reset,
                index: 0,
                added: Vec::new(),
                removed: record.items.clone(),
            },
        };

        let observable = record.observable;
        let subscribers = record.subscribers.clone();
        let hooks = observable && !self.is_applying();

        if hooks {
            for &(owner, property) in &subscribers {
                self.run_collection_hooks(owner, property, &change, HookPhase::Before)?;
            }
        }

        // Hooks may have edited the list; bounds are checked again.
        let record = self.list_record_mut(list)?;
        let len = record.items.len();
        let out_of_bounds = |index: usize| Error::IndexOutOfBounds { index, len };
        match edit {
            ListEdit::Insert(index, value) => {
                if index > len {
                    return Err(out_of_bounds(index));
                }
                record.items.insert(index, value);
            }
            ListEdit::Remove(index) => {
                if index >= len {
                    return Err(out_of_bounds(index));
                }
                record.items.remove(index);
            }
            ListEdit::Set(index, value) => {
                let slot = record.items.get_mut(index).ok_or(out_of_bounds(index))?;
                *slot = value;
            }
            ListEdit::Clear => record.items.clear(),
        }
        trace!(?list, kind = ?change.kind, "list edited");

        if observable {
            for &(owner, _) in &subscribers {
                self.track_change(owner, &change);
            }
        }
        if hooks {
            for &(owner, property) in &subscribers {
                self.run_collection_hooks(owner, property, &change, HookPhase::After)?;
            }
        }
        Ok(change)
    }

    fn track_change(&mut self, owner: EntityId, change: &CollectionChange) {
        if !self.contains(owner) {
            return;
        }
        for value in change.added() {
            if let Value::Entity(child) = value {
                self.link(owner, *child);
            }
        }
        let mut removed = Vec::new();
        for value in change.removed() {
            self.participants(value, &mut removed);
        }
        self.prune(owner, &removed);
    }

    fn run_collection_hooks(
        &mut self,
        owner: EntityId,
        property: PropertyId,
        change: &CollectionChange,
        phase: HookPhase,
    ) -> Result<()> {
        if !self.contains(owner) {
            return Ok(());
        }
        let registry = Rc::clone(self.registry_rc());
        let Some(declaration) = registry.property(property) else {
            return Ok(());
        };
        let scope = Scope::Property(property);
        match phase {
            HookPhase::Before => {
                for behavior in declaration.pipeline().before_write() {
                    let mut cx = Interception::new(self, owner, scope);
                    behavior.before_collection_change(&mut cx, change)?;
                }
            }
            HookPhase::After => {
                for behavior in declaration.pipeline().after_write() {
                    let mut cx = Interception::new(self, owner, scope);
                    behavior.after_collection_change(&mut cx, change)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn subscribe(&mut self, list: ListId, owner: EntityId, property: PropertyId) {
        if let Ok(record) = self.list_record_mut(list)
            && record.observable
            && !record.subscribers.contains(&(owner, property))
        {
            record.subscribers.push((owner, property));
            trace!(?list, ?owner, "subscribed");
        }
    }

    pub(crate) fn unsubscribe(&mut self, list: ListId, owner: EntityId, property: PropertyId) {
        if let Ok(record) = self.list_record_mut(list) {
            record.subscribers.retain(|s| *s != (owner, property));
        }
    }

    // =========================================================================
    // Maps
    // =========================================================================

    /// Looks up `key`.
    pub fn map_get(&self, map: MapId, key: &Value) -> Result<Option<&Value>> {
        Ok(self
            .map_record(map)?
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    /// Inserts or replaces `key`, returning the previous value.
    pub fn map_insert(&mut self, map: MapId, key: Value, value: Value) -> Result<Option<Value>> {
        let record = self.map_record_mut(map)?;
        if let Some((_, slot)) = record.entries.iter_mut().find(|(k, _)| *k == key) {
            return Ok(Some(core::mem::replace(slot, value)));
        }
        record.entries.push((key, value));
        Ok(None)
    }

    /// Removes `key`, returning its value.
    pub fn map_remove(&mut self, map: MapId, key: &Value) -> Result<Option<Value>> {
        let record = self.map_record_mut(map)?;
        Ok(record
            .entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|i| record.entries.remove(i).1))
    }

    /// Number of entries.
    pub fn map_len(&self, map: MapId) -> Result<usize> {
        Ok(self.map_record(map)?.entries.len())
    }

    /// Entries in insertion order.
    pub fn map_entries(&self, map: MapId) -> Result<&[(Value, Value)]> {
        Ok(&self.map_record(map)?.entries)
    }

    /// Removes every entry.
    pub fn map_clear(&mut self, map: MapId) -> Result<()> {
        self.map_record_mut(map)?.entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::metadata::{PropertyMetadataBuilder, TypeMetadata, TypeMetadataBuilder};
    use crate::registry::Registry;
    use crate::id::EntityTypeId;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::RefCell;

    #[derive(Debug, Default)]
    struct Watch(RefCell<Vec<(bool, ChangeKind, usize)>>);

    #[derive(Debug)]
    struct Watcher(Rc<Watch>);

    impl Behavior for Watcher {
        fn before_collection_change(
            &self,
            _cx: &mut Interception<'_>,
            change: &CollectionChange,
        ) -> Result<()> {
            self.0
                .0
                .borrow_mut()
                .push((true, change.kind(), change.index()));
            Ok(())
        }

        fn after_collection_change(
            &self,
            cx: &mut Interception<'_>,
            change: &CollectionChange,
        ) -> Result<()> {
            // The edit is visible by the time after-hooks run.
            let len = cx.model().list_len(change.list())?;
            self.0.0.borrow_mut().push((false, change.kind(), len));
            Ok(())
        }
    }

    fn model_with_watch() -> (Model, EntityTypeId, PropertyId, Rc<Watch>) {
        let watch = Rc::new(Watch::default());
        let mut registry = Registry::new();
        let ty = registry.register_type(
            "Folder",
            TypeMetadataBuilder::new()
                .behavior(Watcher(watch.clone()))
                .build(),
        );
        let items = registry.register_property(
            ty,
            "Items",
            PropertyMetadataBuilder::new(None::<ListId>).build(),
        );
        (Model::new(registry), ty, items.id(), watch)
    }

    #[test]
    fn plain_list_ops() {
        let mut model = Model::new(Registry::new());
        let list = model.new_list();
        model.list_push(list, Value::Int(1)).unwrap();
        model.list_push(list, Value::Int(3)).unwrap();
        model.list_insert(list, 1, Value::Int(2)).unwrap();
        assert_eq!(model.list(list).unwrap(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);

        assert_eq!(model.list_set(list, 0, Value::Int(0)).unwrap(), Value::Int(1));
        assert_eq!(model.list_remove(list, 2).unwrap(), Value::Int(3));
        assert_eq!(model.list_len(list).unwrap(), 2);
        assert!(!model.is_observable(list).unwrap());

        assert_eq!(
            model.list_remove(list, 5),
            Err(Error::IndexOutOfBounds { index: 5, len: 2 })
        );
        model.list_clear(list).unwrap();
        assert!(model.list(list).unwrap().is_empty());
    }

    #[test]
    fn stale_list_handle() {
        let mut model = Model::new(Registry::new());
        let list = model.new_list();
        model.remove_list(list).unwrap();
        assert_eq!(model.list_len(list), Err(Error::MissingList(list)));
        let again = model.new_list();
        assert_ne!(again, list);
    }

    #[test]
    fn map_ops_keep_insertion_order() {
        let mut model = Model::new(Registry::new());
        let map = model.new_map();
        let key = |s: &str| Value::Text(String::from(s));

        assert_eq!(model.map_insert(map, key("b"), Value::Int(1)).unwrap(), None);
        assert_eq!(model.map_insert(map, key("a"), Value::Int(2)).unwrap(), None);
        assert_eq!(
            model.map_insert(map, key("b"), Value::Int(3)).unwrap(),
            Some(Value::Int(1))
        );
        let keys: Vec<_> = model
            .map_entries(map)
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect();
        assert_eq!(keys, vec![key("b"), key("a")]);
        assert_eq!(model.map_get(map, &key("b")).unwrap(), Some(&Value::Int(3)));

        assert_eq!(model.map_remove(map, &key("b")).unwrap(), Some(Value::Int(3)));
        assert_eq!(model.map_len(map).unwrap(), 1);
        model.map_clear(map).unwrap();
        assert_eq!(model.map_len(map).unwrap(), 0);
    }

    #[test]
    fn observable_list_runs_subscriber_hooks() {
        let (mut model, ty, items, watch) = model_with_watch();
        let folder = model.create(ty).unwrap();
        let list = model.new_observable_list();
        model.write(folder, items, Value::List(list)).unwrap();

        model.list_push(list, Value::Int(1)).unwrap();
        model.list_remove(list, 0).unwrap();
        assert_eq!(
            *watch.0.borrow(),
            vec![
                (true, ChangeKind::Insert, 0),
                (false, ChangeKind::Insert, 1),
                (true, ChangeKind::Remove, 0),
                (false, ChangeKind::Remove, 0),
            ]
        );
    }

    #[test]
    fn plain_list_has_no_hooks() {
        let (mut model, ty, items, watch) = model_with_watch();
        let folder = model.create(ty).unwrap();
        let list = model.new_list();
        model.write(folder, items, Value::List(list)).unwrap();
        model.list_push(list, Value::Int(1)).unwrap();
        assert!(watch.0.borrow().is_empty());
    }

    #[test]
    fn observable_list_maintains_edges() {
        let (mut model, ty, items, _) = model_with_watch();
        let folder = model.create(ty).unwrap();
        let child = model.create(ty).unwrap();
        let list = model.new_observable_list();
        model.write(folder, items, Value::List(list)).unwrap();

        model.list_push(list, Value::Entity(child)).unwrap();
        assert!(model.graph().contains_edge(folder, child));

        // A duplicate keeps the edge alive until the last copy leaves.
        model.list_push(list, Value::Entity(child)).unwrap();
        model.list_remove(list, 0).unwrap();
        assert!(model.graph().contains_edge(folder, child));
        model.list_remove(list, 0).unwrap();
        assert!(!model.graph().contains_edge(folder, child));
    }

    #[test]
    fn replacing_the_list_unsubscribes() {
        let (mut model, ty, items, watch) = model_with_watch();
        let folder = model.create(ty).unwrap();
        let first = model.new_observable_list();
        let second = model.new_observable_list();
        model.write(folder, items, Value::List(first)).unwrap();
        model.write(folder, items, Value::List(second)).unwrap();

        model.list_push(first, Value::Int(1)).unwrap();
        assert!(watch.0.borrow().is_empty());
        model.list_push(second, Value::Int(1)).unwrap();
        assert_eq!(watch.0.borrow().len(), 2);
    }

    #[test]
    fn observable_list_links_without_behaviors() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Bare", TypeMetadata::default());
        let items = registry.register_property(ty, "Items", PropertyMetadataBuilder::new(Value::Null).build());
        let mut model = Model::new(registry);
        let owner = model.create(ty).unwrap();
        let child = model.create(ty).unwrap();
        let list = model.new_observable_list();
        model.write(owner, items.id(), Value::List(list)).unwrap();
        model.list_push(list, Value::Entity(child)).unwrap();
        assert_eq!(model.parents(child).collect::<Vec<_>>(), vec![owner]);
    }
}
