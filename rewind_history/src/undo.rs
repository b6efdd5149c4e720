// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Snapshot-based undo and redo.
//!
//! Declaring [`Undoable`] on an entity type installs an [`UndoHistory`] on
//! each entity. Before a write commits a different value, and before an
//! observable list held by the entity changes, the entity's current state is
//! captured on its undo stack. The same capture runs on every ancestor in the
//! ownership graph, so an edit deep in a tree is a single undo step on any
//! enclosing entity too.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;

use rewind_property::{
    Behavior, CollectionChange, EntityId, Installation, Interception, Model, Priorities, Result,
    Scope, Snapshot, Value, WriteDecision,
};
use tracing::{debug, trace};

/// Undo and redo stacks of one entity.
#[derive(Debug)]
pub struct UndoHistory {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    capacity: Option<usize>,
    pub(crate) suspension: Rc<Cell<usize>>,
    in_progress: Rc<Cell<bool>>,
}

impl UndoHistory {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            capacity,
            suspension: Rc::new(Cell::new(0)),
            in_progress: Rc::new(Cell::new(false)),
        }
    }

    /// Number of undo steps.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo steps.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Maximum number of undo steps kept, if bounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Returns `true` while capture is suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspension.get() > 0
    }

    /// Returns `true` while an undo or redo is being applied.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.get()
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            if self.undo.len() >= capacity {
                self.undo.remove(0);
            }
        }
        self.undo.push(snapshot);
    }
}

/// Holds the in-progress flag of an [`UndoHistory`] for its lifetime.
#[derive(Debug)]
pub struct OperationGuard {
    flag: Rc<Cell<bool>>,
}

impl OperationGuard {
    fn acquire(flag: &Rc<Cell<bool>>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self {
            flag: Rc::clone(flag),
        })
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Records undo history for entities of a type.
#[derive(Copy, Clone, Debug, Default)]
pub struct Undoable {
    capacity: Option<usize>,
}

impl Undoable {
    /// Unbounded history.
    #[must_use]
    pub const fn new() -> Self {
        Self { capacity: None }
    }

    /// Keeps at most `capacity` undo steps, dropping the oldest.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

impl Behavior for Undoable {
    fn priorities(&self) -> Priorities {
        Priorities {
            before_write: i32::MAX,
            lifecycle: i32::MAX,
            ..Priorities::default()
        }
    }

    fn install(&self, installation: &mut Installation<'_>) {
        installation.provide_global(UndoHistory::new(self.capacity));
    }

    fn before_write(
        &self,
        cx: &mut Interception<'_>,
        proposed: &mut Value,
        current: &mut Value,
    ) -> Result<WriteDecision> {
        if proposed != current {
            let entity = cx.entity();
            cx.model_mut().make_volatile(entity)?;
        }
        Ok(WriteDecision::Accept)
    }

    fn before_collection_change(
        &self,
        cx: &mut Interception<'_>,
        _change: &CollectionChange,
    ) -> Result<()> {
        let entity = cx.entity();
        cx.model_mut().make_volatile(entity)
    }

    fn on_initialized(&self, cx: &mut Interception<'_>) -> Result<()> {
        let entity = cx.entity();
        cx.model_mut().reset_undo(entity);
        Ok(())
    }
}

/// Undo and redo operations on a [`Model`].
///
/// Entities whose type does not declare [`Undoable`] have empty stacks and
/// every operation on them is a no-op.
pub trait UndoRedo {
    /// Returns `true` if `entity` has an undo step.
    fn can_undo(&self, entity: EntityId) -> bool;

    /// Returns `true` if `entity` has a redo step.
    fn can_redo(&self, entity: EntityId) -> bool;

    /// Number of undo steps of `entity`.
    fn undo_depth(&self, entity: EntityId) -> usize;

    /// Number of redo steps of `entity`.
    fn redo_depth(&self, entity: EntityId) -> usize;

    /// Captures the current state of `entity` and of every ancestor.
    ///
    /// Skipped for any entity whose capture is suspended or that is in the
    /// middle of an undo or redo. A capture equal to the top of the undo
    /// stack is not pushed again. A pushed capture clears the redo stack.
    fn make_volatile(&mut self, entity: EntityId) -> Result<()>;

    /// Restores the previous state. Returns `false` if there was none.
    fn undo(&mut self, entity: EntityId) -> Result<bool>;

    /// Re-applies the state undone last. Returns `false` if there was none.
    fn redo(&mut self, entity: EntityId) -> Result<bool>;

    /// Clears both stacks of `entity`.
    fn reset_undo(&mut self, entity: EntityId);

    /// Suspends capture on `entity` until a matching
    /// [`resume_capture`](Self::resume_capture).
    fn suspend_capture(&mut self, entity: EntityId);

    /// Ends one level of suspension.
    fn resume_capture(&mut self, entity: EntityId);
}

fn lookup(model: &Model, entity: EntityId) -> Option<&UndoHistory> {
    model.capability::<UndoHistory>(entity, Scope::Global)
}

fn lookup_mut(model: &mut Model, entity: EntityId) -> Option<&mut UndoHistory> {
    model.capability_mut::<UndoHistory>(entity, Scope::Global)
}

/// Captures `entity` alone. Returns `true` if a step was pushed.
fn capture(model: &mut Model, entity: EntityId) -> Result<bool> {
    let Some(history) = lookup(model, entity) else {
        return Ok(false);
    };
    if history.is_suspended() || history.is_in_progress() {
        return Ok(false);
    }
    let snapshot = model.export(entity)?;
    let Some(history) = lookup_mut(model, entity) else {
        return Ok(false);
    };
    if history.undo.last() == Some(&snapshot) {
        return Ok(false);
    }
    history.push_undo(snapshot);
    history.redo.clear();
    trace!(?entity, depth = history.undo.len(), "captured undo step");
    Ok(true)
}

enum Direction {
    Undo,
    Redo,
}

fn step(model: &mut Model, entity: EntityId, direction: Direction) -> Result<bool> {
    let Some(history) = lookup(model, entity) else {
        return Ok(false);
    };
    let available = match direction {
        Direction::Undo => !history.undo.is_empty(),
        Direction::Redo => !history.redo.is_empty(),
    };
    if !available {
        return Ok(false);
    }
    let Some(_guard) = OperationGuard::acquire(&history.in_progress) else {
        return Ok(false);
    };

    // Ancestors record their state first so they can undo this step in turn.
    for ancestor in model.ancestors(entity) {
        capture(model, ancestor)?;
    }

    let live = model.export(entity)?;
    let Some(history) = lookup_mut(model, entity) else {
        return Ok(false);
    };
    let target = match direction {
        Direction::Undo => {
            let target = history.undo.pop();
            history.redo.push(live);
            target
        }
        Direction::Redo => {
            let target = history.redo.pop();
            history.push_undo(live);
            target
        }
    };
    let Some(target) = target else {
        return Ok(false);
    };
    model.apply(&target, entity)?;
    debug!(
        ?entity,
        undo = model.undo_depth(entity),
        redo = model.redo_depth(entity),
        "applied history step"
    );
    Ok(true)
}

impl UndoRedo for Model {
    fn can_undo(&self, entity: EntityId) -> bool {
        self.undo_depth(entity) > 0
    }

    fn can_redo(&self, entity: EntityId) -> bool {
        self.redo_depth(entity) > 0
    }

    fn undo_depth(&self, entity: EntityId) -> usize {
        lookup(self, entity).map_or(0, UndoHistory::undo_depth)
    }

    fn redo_depth(&self, entity: EntityId) -> usize {
        lookup(self, entity).map_or(0, UndoHistory::redo_depth)
    }

    fn make_volatile(&mut self, entity: EntityId) -> Result<()> {
        if !self.contains(entity) {
            return Ok(());
        }
        if lookup(self, entity).is_some_and(|h| h.is_suspended() || h.is_in_progress()) {
            return Ok(());
        }
        capture(self, entity)?;
        for ancestor in self.ancestors(entity) {
            capture(self, ancestor)?;
        }
        Ok(())
    }

    fn undo(&mut self, entity: EntityId) -> Result<bool> {
        step(self, entity, Direction::Undo)
    }

    fn redo(&mut self, entity: EntityId) -> Result<bool> {
        step(self, entity, Direction::Redo)
    }

    fn reset_undo(&mut self, entity: EntityId) {
        if let Some(history) = lookup_mut(self, entity) {
            history.undo.clear();
            history.redo.clear();
        }
    }

    fn suspend_capture(&mut self, entity: EntityId) {
        if let Some(history) = lookup(self, entity) {
            history.suspension.set(history.suspension.get() + 1);
        }
    }

    fn resume_capture(&mut self, entity: EntityId) {
        if let Some(history) = lookup(self, entity) {
            history
                .suspension
                .set(history.suspension.get().saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use rewind_property::{
        EntityTypeId, Property, PropertyMetadataBuilder, Registry, TypeMetadata,
        TypeMetadataBuilder,
    };

    fn setup(undoable: Undoable) -> (Model, EntityTypeId, Property<String>) {
        let mut registry = Registry::new();
        let ty = registry.register_type("Doc", TypeMetadataBuilder::new().behavior(undoable).build());
        let text = registry.register_property(ty, "Text", PropertyMetadataBuilder::new(String::new()).build());
        (Model::new(registry), ty, text)
    }

    #[test]
    fn fresh_entity_has_no_history() {
        let (mut model, ty, _) = setup(Undoable::new());
        let e = model.create(ty).unwrap();
        assert!(!model.can_undo(e));
        assert!(!model.can_redo(e));
        assert!(!model.undo(e).unwrap());
    }

    #[test]
    fn undo_then_redo() {
        let (mut model, ty, text) = setup(Undoable::new());
        let e = model.create(ty).unwrap();
        model.set(e, text, "a".to_string()).unwrap();
        model.set(e, text, "b".to_string()).unwrap();
        assert_eq!(model.undo_depth(e), 2);

        assert!(model.undo(e).unwrap());
        assert_eq!(model.get(e, text).unwrap(), "a");
        assert!(model.undo(e).unwrap());
        assert_eq!(model.get(e, text).unwrap(), "");
        assert!(!model.can_undo(e));

        assert!(model.redo(e).unwrap());
        assert!(model.redo(e).unwrap());
        assert_eq!(model.get(e, text).unwrap(), "b");
        assert!(!model.can_redo(e));
        assert_eq!(model.undo_depth(e), 2);
    }

    #[test]
    fn unchanged_write_is_not_captured() {
        let (mut model, ty, text) = setup(Undoable::new());
        let e = model.create(ty).unwrap();
        model.set(e, text, String::new()).unwrap();
        assert_eq!(model.undo_depth(e), 0);
    }

    #[test]
    fn new_edit_clears_redo() {
        let (mut model, ty, text) = setup(Undoable::new());
        let e = model.create(ty).unwrap();
        model.set(e, text, "a".to_string()).unwrap();
        model.undo(e).unwrap();
        assert!(model.can_redo(e));
        model.set(e, text, "c".to_string()).unwrap();
        assert!(!model.can_redo(e));
    }

    #[test]
    fn capacity_drops_oldest() {
        let (mut model, ty, text) = setup(Undoable::with_capacity(2));
        let e = model.create(ty).unwrap();
        for s in ["a", "b", "c", "d"] {
            model.set(e, text, s.to_string()).unwrap();
        }
        assert_eq!(model.undo_depth(e), 2);
        model.undo(e).unwrap();
        model.undo(e).unwrap();
        assert_eq!(model.get(e, text).unwrap(), "b");
    }

    #[test]
    fn manual_suspension() {
        let (mut model, ty, text) = setup(Undoable::new());
        let e = model.create(ty).unwrap();
        model.suspend_capture(e);
        model.set(e, text, "a".to_string()).unwrap();
        model.resume_capture(e);
        assert_eq!(model.undo_depth(e), 0);
        model.set(e, text, "b".to_string()).unwrap();
        assert_eq!(model.undo_depth(e), 1);
    }

    #[test]
    fn guard_releases_flag() {
        let flag = Rc::new(Cell::new(false));
        {
            let guard = OperationGuard::acquire(&flag);
            assert!(guard.is_some());
            assert!(OperationGuard::acquire(&flag).is_none());
        }
        assert!(!flag.get());
    }

    #[test]
    fn untracked_entity_is_a_no_op() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Plain", TypeMetadata::default());
        let mut model = Model::new(registry);
        let e = model.create(ty).unwrap();
        assert!(model.make_volatile(e).is_ok());
        assert_eq!(model.undo_depth(e), 0);
        assert!(!model.redo(e).unwrap());
    }

    #[test]
    fn stale_handle_does_not_capture_on_slot_reuser() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Node", TypeMetadataBuilder::new().behavior(Undoable::new()).build());
        let child = registry.register_property(ty, "Child", PropertyMetadataBuilder::new(None::<EntityId>).build());
        let mut model = Model::new(registry);
        let parent = model.create(ty).unwrap();
        let gone = model.create(ty).unwrap();
        model.remove(gone).unwrap();
        let reused = model.create(ty).unwrap();
        assert_eq!(reused.slot(), gone.slot(), "slot should be reused");
        model.set(parent, child, Some(reused)).unwrap();
        model.reset_undo(parent);

        assert!(model.make_volatile(gone).is_ok());
        assert_eq!(model.undo_depth(parent), 0);
        assert_eq!(model.undo_depth(reused), 0);
        assert!(!model.undo(gone).unwrap());
        assert!(!model.redo(gone).unwrap());
    }
}
