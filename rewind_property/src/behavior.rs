// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behaviors: hooks that intercept property access and entity lifecycle.
//!
//! A [`Behavior`] is declared on an entity type (it then intercepts every
//! property of that type) or on a single property. When a property is read or
//! written, the [`Model`] runs the behaviors of that property's pipeline, each
//! phase in ascending [`Priorities`] order with ties kept in declaration order.
//!
//! | Phase | Hook | Can |
//! |-------|------|-----|
//! | read | [`before_read`](Behavior::before_read) | observe |
//! | read | [`after_read`](Behavior::after_read) | replace the value |
//! | write | [`before_write`](Behavior::before_write) | replace proposed/current, reject |
//! | write | [`after_write`](Behavior::after_write) | replace the committed value |
//! | collection | [`before_collection_change`](Behavior::before_collection_change) | observe |
//! | collection | [`after_collection_change`](Behavior::after_collection_change) | observe |
//!
//! Lifecycle hooks ([`on_initialize`](Behavior::on_initialize),
//! [`on_initialized`](Behavior::on_initialized),
//! [`after_apply`](Behavior::after_apply)) run at most once per behavior
//! instance per event, even when the same instance is declared on several
//! properties.

use core::any::Any;
use core::fmt;

use crate::capability::{Installation, Scope};
use crate::collection::CollectionChange;
use crate::error::Result;
use crate::id::{EntityId, PropertyId};
use crate::model::Model;
use crate::snapshot::Snapshot;
use crate::value::Value;

/// Priority used by every phase unless a behavior overrides it.
pub const DEFAULT_PRIORITY: i32 = i32::MAX / 2;

/// Per-phase ordering keys. Lower runs first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Priorities {
    /// Order among `before_read` hooks.
    pub before_read: i32,
    /// Order among `after_read` hooks.
    pub after_read: i32,
    /// Order among `before_write` and `before_collection_change` hooks.
    pub before_write: i32,
    /// Order among `after_write` and `after_collection_change` hooks.
    pub after_write: i32,
    /// Order among install, initialize, and apply hooks.
    pub lifecycle: i32,
}

impl Default for Priorities {
    fn default() -> Self {
        Self {
            before_read: DEFAULT_PRIORITY,
            after_read: DEFAULT_PRIORITY,
            before_write: DEFAULT_PRIORITY,
            after_write: DEFAULT_PRIORITY,
            lifecycle: DEFAULT_PRIORITY,
        }
    }
}

/// Verdict of a [`Behavior::before_write`] hook.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WriteDecision {
    /// Continue with the write.
    #[default]
    Accept,
    /// Abort the write. Nothing is stored and nothing is notified.
    Reject,
}

/// Result of [`Model::write`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The committed value differs from the previous one.
    Changed,
    /// The proposed value equalled the current one. It was still stored.
    Unchanged,
    /// A `before_write` hook rejected the write.
    Rejected,
}

impl WriteOutcome {
    /// Returns `true` for [`WriteOutcome::Changed`].
    #[must_use]
    #[inline]
    pub fn is_changed(self) -> bool {
        self == Self::Changed
    }
}

/// Context passed to every hook: the model, the entity, and the scope the hook
/// was declared for.
///
/// For property hooks the scope is always [`Scope::Property`] of the property
/// being accessed. For lifecycle hooks it is the scope of the first
/// declaration of the behavior on the entity's type.
pub struct Interception<'a> {
    model: &'a mut Model,
    entity: EntityId,
    scope: Scope,
}

impl fmt::Debug for Interception<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interception")
            .field("entity", &self.entity)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<'a> Interception<'a> {
    pub(crate) fn new(model: &'a mut Model, entity: EntityId, scope: Scope) -> Self {
        Self {
            model,
            entity,
            scope,
        }
    }

    /// The entity being accessed.
    #[must_use]
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The hook's scope.
    #[must_use]
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The property being accessed, if this is a property hook.
    #[must_use]
    #[inline]
    pub fn property(&self) -> Option<PropertyId> {
        self.scope.property()
    }

    /// Shared access to the model.
    #[must_use]
    #[inline]
    pub fn model(&self) -> &Model {
        self.model
    }

    /// Exclusive access to the model.
    ///
    /// Reads and writes issued from a hook run their own pipelines.
    #[inline]
    pub fn model_mut(&mut self) -> &mut Model {
        self.model
    }

    /// Resolves a capability for this entity at this hook's scope.
    #[must_use]
    pub fn capability<C: Any>(&self) -> Option<&C> {
        self.model.capability(self.entity, self.scope)
    }

    /// Mutable variant of [`capability`](Self::capability).
    pub fn capability_mut<C: Any>(&mut self) -> Option<&mut C> {
        self.model.capability_mut(self.entity, self.scope)
    }
}

/// A declarative interceptor.
///
/// Every hook has a no-op default, so implementors only override what they
/// need. Hooks return [`Result`]; an error aborts the surrounding operation
/// and is handed back to the caller of [`Model`] unchanged.
///
/// # Example
///
/// ```rust
/// use rewind_property::{
///     Behavior, Interception, Model, PropertyMetadataBuilder, Registry, Result,
///     TypeMetadata, Value, WriteDecision,
/// };
///
/// /// Refuses negative numbers.
/// #[derive(Debug)]
/// struct NonNegative;
///
/// impl Behavior for NonNegative {
///     fn before_write(
///         &self,
///         _cx: &mut Interception<'_>,
///         proposed: &mut Value,
///         _current: &mut Value,
///     ) -> Result<WriteDecision> {
///         Ok(match proposed {
///             Value::Int(i) if *i < 0 => WriteDecision::Reject,
///             _ => WriteDecision::Accept,
///         })
///     }
/// }
///
/// let mut registry = Registry::new();
/// let counter = registry.register_type("Counter", TypeMetadata::default());
/// let count = registry.register_property(
///     counter,
///     "Count",
///     PropertyMetadataBuilder::new(0_i64).behavior(NonNegative).build(),
/// );
///
/// let mut model = Model::new(registry);
/// let c = model.create(counter)?;
/// assert!(model.set(c, count, 5)?.is_changed());
/// assert!(!model.set(c, count, -1)?.is_changed());
/// assert_eq!(model.get(c, count)?, 5);
/// # Ok::<(), rewind_property::Error>(())
/// ```
pub trait Behavior: fmt::Debug + 'static {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }

    /// Ordering keys for each phase.
    fn priorities(&self) -> Priorities {
        Priorities::default()
    }

    /// Registers capabilities on a newly allocated entity.
    ///
    /// Called once per declaration, before any lifecycle hook runs.
    fn install(&self, installation: &mut Installation<'_>) {
        let _ = installation;
    }

    /// Observes a read before the value is computed.
    fn before_read(&self, cx: &mut Interception<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Receives the value being read and returns the value to use instead.
    fn after_read(&self, cx: &mut Interception<'_>, value: Value) -> Result<Value> {
        let _ = cx;
        Ok(value)
    }

    /// Inspects or rewrites a pending write, or rejects it.
    fn before_write(
        &self,
        cx: &mut Interception<'_>,
        proposed: &mut Value,
        current: &mut Value,
    ) -> Result<WriteDecision> {
        let _ = (cx, proposed, current);
        Ok(WriteDecision::Accept)
    }

    /// Runs after a write was committed. `current` may be replaced.
    fn after_write(
        &self,
        cx: &mut Interception<'_>,
        proposed: &Value,
        current: &mut Value,
        changed: bool,
    ) -> Result<()> {
        let _ = (cx, proposed, current, changed);
        Ok(())
    }

    /// Runs once while the entity is constructed.
    fn on_initialize(&self, cx: &mut Interception<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Runs once after every `on_initialize` hook of the entity has run.
    fn on_initialized(&self, cx: &mut Interception<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Runs before an observable list held by the intercepted property changes.
    fn before_collection_change(
        &self,
        cx: &mut Interception<'_>,
        change: &CollectionChange,
    ) -> Result<()> {
        let _ = (cx, change);
        Ok(())
    }

    /// Runs after an observable list held by the intercepted property changed.
    fn after_collection_change(
        &self,
        cx: &mut Interception<'_>,
        change: &CollectionChange,
    ) -> Result<()> {
        let _ = (cx, change);
        Ok(())
    }

    /// Runs after a snapshot was applied to the entity.
    fn after_apply(&self, cx: &mut Interception<'_>, snapshot: &Snapshot) -> Result<()> {
        let _ = (cx, snapshot);
        Ok(())
    }
}
