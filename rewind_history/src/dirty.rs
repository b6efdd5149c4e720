// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Modified-since-baseline tracking.
//!
//! Declaring [`Dirtyable`] on an entity type installs a [`DirtyState`] on each
//! entity. The entity starts clean with a baseline snapshot taken at the end
//! of initialization. A changed write or an observable-collection edit marks
//! it dirty; marking flows up the ownership graph, cleaning flows down.

use rewind_property::{
    Behavior, CollectionChange, EntityId, Error, Installation, Interception, Model, Notification,
    Priorities, Result, Scope, Snapshot, Value,
};
use tracing::debug;

/// Per-entity modified flag and clean baseline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirtyState {
    is_dirty: bool,
    clean: Option<Snapshot>,
}

impl DirtyState {
    /// Whether the entity changed since its baseline.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// The baseline recorded at initialization or by the last clean.
    #[must_use]
    pub fn clean_snapshot(&self) -> Option<&Snapshot> {
        self.clean.as_ref()
    }
}

/// Tracks whether entities of a type were modified.
///
/// Runs after every other lifecycle and `after_write` hook, so the baseline
/// includes values constructed during initialization and the flag reflects
/// the final committed value.
#[derive(Copy, Clone, Debug, Default)]
pub struct Dirtyable;

impl Behavior for Dirtyable {
    fn priorities(&self) -> Priorities {
        Priorities {
            after_write: i32::MAX,
            lifecycle: i32::MAX,
            ..Priorities::default()
        }
    }

    fn install(&self, installation: &mut Installation<'_>) {
        installation.provide_global(DirtyState::default());
    }

    fn on_initialize(&self, cx: &mut Interception<'_>) -> Result<()> {
        let entity = cx.entity();
        let baseline = cx.model().export(entity)?;
        if let Some(state) = cx.model_mut().capability_mut::<DirtyState>(entity, Scope::Global) {
            state.clean = Some(baseline);
            state.is_dirty = false;
        }
        Ok(())
    }

    fn after_write(
        &self,
        cx: &mut Interception<'_>,
        _proposed: &Value,
        _current: &mut Value,
        changed: bool,
    ) -> Result<()> {
        if changed {
            let entity = cx.entity();
            cx.model_mut().mark_dirty(entity);
        }
        Ok(())
    }

    fn after_collection_change(
        &self,
        cx: &mut Interception<'_>,
        _change: &CollectionChange,
    ) -> Result<()> {
        let entity = cx.entity();
        cx.model_mut().mark_dirty(entity);
        Ok(())
    }

    fn after_apply(&self, cx: &mut Interception<'_>, snapshot: &Snapshot) -> Result<()> {
        let entity = cx.entity();
        let at_baseline = cx
            .model()
            .capability::<DirtyState>(entity, Scope::Global)
            .and_then(DirtyState::clean_snapshot)
            .is_some_and(|clean| clean == snapshot);
        if at_baseline {
            set_flag(cx.model_mut(), entity, false);
        } else {
            cx.model_mut().mark_dirty(entity);
        }
        Ok(())
    }
}

/// Dirty tracking operations on a [`Model`].
///
/// Entities whose type does not declare [`Dirtyable`] are never dirty and
/// are skipped by propagation.
pub trait DirtyTracking {
    /// Returns `true` if `entity` changed since its baseline.
    fn is_dirty(&self, entity: EntityId) -> bool;

    /// Returns `true` if `entity` carries a [`DirtyState`].
    fn is_dirty_tracked(&self, entity: EntityId) -> bool;

    /// Flags every ancestor of `entity`, then `entity` itself.
    ///
    /// Does nothing for a dead handle.
    fn mark_dirty(&mut self, entity: EntityId);

    /// Re-baselines every descendant of `entity`, then `entity` itself.
    ///
    /// Returns [`Error::MissingEntity`] for a dead handle.
    fn clean(&mut self, entity: EntityId) -> Result<()>;

    /// The baseline of `entity`.
    fn clean_snapshot(&self, entity: EntityId) -> Option<&Snapshot>;
}

fn state(model: &Model, entity: EntityId) -> Option<&DirtyState> {
    model.capability::<DirtyState>(entity, Scope::Global)
}

fn set_flag(model: &mut Model, entity: EntityId, is_dirty: bool) {
    let Some(state) = model.capability_mut::<DirtyState>(entity, Scope::Global) else {
        return;
    };
    if state.is_dirty == is_dirty {
        return;
    }
    state.is_dirty = is_dirty;
    debug!(?entity, is_dirty, "dirty state changed");
    model.notify(Notification::DirtyStateChanged { entity, is_dirty });
}

fn rebaseline(model: &mut Model, entity: EntityId) -> Result<()> {
    if !model.is_dirty_tracked(entity) {
        return Ok(());
    }
    let baseline = model.export(entity)?;
    if let Some(state) = model.capability_mut::<DirtyState>(entity, Scope::Global) {
        state.clean = Some(baseline);
    }
    set_flag(model, entity, false);
    Ok(())
}

impl DirtyTracking for Model {
    fn is_dirty(&self, entity: EntityId) -> bool {
        state(self, entity).is_some_and(DirtyState::is_dirty)
    }

    fn is_dirty_tracked(&self, entity: EntityId) -> bool {
        state(self, entity).is_some()
    }

    fn mark_dirty(&mut self, entity: EntityId) {
        if !self.contains(entity) {
            return;
        }
        for ancestor in self.ancestors(entity) {
            set_flag(self, ancestor, true);
        }
        set_flag(self, entity, true);
    }

    fn clean(&mut self, entity: EntityId) -> Result<()> {
        if !self.contains(entity) {
            return Err(Error::MissingEntity(entity));
        }
        for descendant in self.descendants(entity) {
            rebaseline(self, descendant)?;
        }
        rebaseline(self, entity)
    }

    fn clean_snapshot(&self, entity: EntityId) -> Option<&Snapshot> {
        state(self, entity).and_then(DirtyState::clean_snapshot)
    }
}
