// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batching several edits into one undo step.

use alloc::rc::Rc;
use core::cell::Cell;

use rewind_property::{EntityId, Model, Result, Scope};
use smallvec::SmallVec;
use tracing::trace;

use crate::undo::{UndoHistory, UndoRedo};

/// Suspends undo capture on a set of entities until dropped.
///
/// Release is tied to `Drop`, so the depth is restored on early return and
/// while unwinding.
#[derive(Debug)]
#[must_use = "capture resumes as soon as the suspension is dropped"]
pub struct CaptureSuspension {
    depths: SmallVec<[Rc<Cell<usize>>; 4]>,
}

impl CaptureSuspension {
    /// Suspends capture on every undo-tracked entity in `entities`.
    ///
    /// Untracked entities and repeats are ignored.
    pub fn new(model: &Model, entities: impl IntoIterator<Item = EntityId>) -> Self {
        let mut depths: SmallVec<[Rc<Cell<usize>>; 4]> = SmallVec::new();
        for entity in entities {
            let Some(history) = model.capability::<UndoHistory>(entity, Scope::Global) else {
                continue;
            };
            if depths.iter().any(|d| Rc::ptr_eq(d, &history.suspension)) {
                continue;
            }
            history.suspension.set(history.suspension.get() + 1);
            depths.push(Rc::clone(&history.suspension));
        }
        Self { depths }
    }

    /// Number of entities held suspended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    /// Returns `true` if no entity is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

impl Drop for CaptureSuspension {
    fn drop(&mut self) {
        for depth in &self.depths {
            depth.set(depth.get().saturating_sub(1));
        }
    }
}

/// Opens an atomic undo operation on `item`.
///
/// The current state of `item` and its ancestors is captured once, then
/// capture is suspended on `item` and on every entity in `suppress` until the
/// returned guard is dropped.
pub fn atomic(model: &mut Model, item: EntityId, suppress: &[EntityId]) -> Result<CaptureSuspension> {
    model.make_volatile(item)?;
    let suspension = CaptureSuspension::new(model, core::iter::once(item).chain(suppress.iter().copied()));
    trace!(?item, suspended = suspension.len(), "atomic operation opened");
    Ok(suspension)
}

/// Runs closures as a single undo step.
pub trait Atomically {
    /// Runs `f` inside an [`atomic`] bracket on `item`.
    fn atomically<R>(
        &mut self,
        item: EntityId,
        suppress: &[EntityId],
        f: impl FnOnce(&mut Model) -> Result<R>,
    ) -> Result<R>;
}

impl Atomically for Model {
    fn atomically<R>(
        &mut self,
        item: EntityId,
        suppress: &[EntityId],
        f: impl FnOnce(&mut Model) -> Result<R>,
    ) -> Result<R> {
        let _suspension = atomic(self, item, suppress)?;
        f(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_property::{PropertyMetadataBuilder, Registry, TypeMetadataBuilder};

    use crate::undo::Undoable;

    #[test]
    fn batch_is_one_step() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Doc", TypeMetadataBuilder::new().behavior(Undoable::new()).build());
        let n = registry.register_property(ty, "N", PropertyMetadataBuilder::new(0_i64).build());
        let mut model = Model::new(registry);
        let e = model.create(ty).unwrap();

        model
            .atomically(e, &[], |m| {
                for i in 1..=5 {
                    m.set(e, n, i)?;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(model.undo_depth(e), 1);

        model.undo(e).unwrap();
        assert_eq!(model.get(e, n).unwrap(), 0);
    }

    #[test]
    fn failure_still_resumes() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Doc", TypeMetadataBuilder::new().behavior(Undoable::new()).build());
        let n = registry.register_property(ty, "N", PropertyMetadataBuilder::new(0_i64).build());
        let mut model = Model::new(registry);
        let e = model.create(ty).unwrap();
        let gone = model.create(ty).unwrap();
        model.remove(gone).unwrap();

        let result = model.atomically(e, &[], |m| {
            m.set(e, n, 1)?;
            m.set(gone, n, 1)?;
            Ok(())
        });
        assert!(result.is_err());

        model.set(e, n, 2).unwrap();
        assert_eq!(model.undo_depth(e), 2);
    }

    #[test]
    fn nested_suspensions_count() {
        let mut registry = Registry::new();
        let ty = registry.register_type("Doc", TypeMetadataBuilder::new().behavior(Undoable::new()).build());
        let mut model = Model::new(registry);
        let e = model.create(ty).unwrap();

        let outer = CaptureSuspension::new(&model, [e, e]);
        assert_eq!(outer.len(), 1);
        let inner = CaptureSuspension::new(&model, [e]);
        drop(outer);
        let history = model.capability::<UndoHistory>(e, Scope::Global).unwrap();
        assert!(history.is_suspended());
        drop(inner);
        let history = model.capability::<UndoHistory>(e, Scope::Global).unwrap();
        assert!(!history.is_suspended());
    }
}
