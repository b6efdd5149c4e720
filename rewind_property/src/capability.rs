// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scoped capability tables and resolution.
//!
//! A capability is any `'static` value a behavior installs on an entity so
//! that its hooks (and outside callers) can find it again: dirty state, undo
//! history, logging configuration. Capabilities are keyed by their Rust type
//! and a [`Scope`].
//!
//! ## Resolution order
//!
//! [`Resolver::resolve`] looks in its table at the requested scope, then at
//! [`Scope::Global`], then asks its parent resolver. Every entity resolver in a
//! [`Model`](crate::Model) has the model's ambient table as its parent.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use hashbrown::HashMap;

use crate::id::{EntityId, PropertyId};

/// Where a capability is registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Visible to every property of the entity.
    Global,
    /// Visible only when resolving on behalf of this property.
    Property(PropertyId),
}

impl Scope {
    /// Returns the property, for [`Scope::Property`].
    #[must_use]
    #[inline]
    pub fn property(self) -> Option<PropertyId> {
        match self {
            Self::Global => None,
            Self::Property(p) => Some(p),
        }
    }
}

/// Type-erased `(capability type, scope) -> instance` table.
#[derive(Default)]
pub struct CapabilityTable {
    entries: HashMap<(TypeId, Scope), Box<dyn Any>>,
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl CapabilityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `capability` at `scope`, replacing any previous instance of the same type.
    pub fn insert<C: Any>(&mut self, scope: Scope, capability: C) {
        self.entries
            .insert((TypeId::of::<C>(), scope), Box::new(capability));
    }

    /// Registers `capability` at [`Scope::Global`] unless one of the same type is already there.
    ///
    /// Returns `true` if it was inserted.
    pub fn insert_global_if_absent<C: Any>(&mut self, capability: C) -> bool {
        let key = (TypeId::of::<C>(), Scope::Global);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, Box::new(capability));
        true
    }

    /// Returns `true` if an instance of `C` is registered at exactly `scope`.
    #[must_use]
    pub fn contains<C: Any>(&self, scope: Scope) -> bool {
        self.entries.contains_key(&(TypeId::of::<C>(), scope))
    }

    /// Returns the instance of `C` registered at exactly `scope`.
    #[must_use]
    pub fn get<C: Any>(&self, scope: Scope) -> Option<&C> {
        self.entries
            .get(&(TypeId::of::<C>(), scope))
            .and_then(|b| b.downcast_ref())
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut<C: Any>(&mut self, scope: Scope) -> Option<&mut C> {
        self.entries
            .get_mut(&(TypeId::of::<C>(), scope))
            .and_then(|b| b.downcast_mut())
    }

    /// Looks up `scope`, falling back to [`Scope::Global`].
    #[must_use]
    pub fn lookup<C: Any>(&self, scope: Scope) -> Option<&C> {
        self.get(scope).or_else(|| match scope {
            Scope::Global => None,
            Scope::Property(_) => self.get(Scope::Global),
        })
    }

    /// Mutable variant of [`lookup`](Self::lookup).
    pub fn lookup_mut<C: Any>(&mut self, scope: Scope) -> Option<&mut C> {
        let scope = if self.contains::<C>(scope) {
            scope
        } else {
            Scope::Global
        };
        self.get_mut(scope)
    }

    /// Removes and returns the instance of `C` at exactly `scope`.
    pub fn remove<C: Any>(&mut self, scope: Scope) -> Option<C> {
        let boxed = self.entries.remove(&(TypeId::of::<C>(), scope))?;
        boxed.downcast().ok().map(|b| *b)
    }
}

/// A read-only view of a capability table at one scope, chained to a parent.
///
/// Resolution is pure: it never registers anything.
///
/// # Example
///
/// ```rust
/// use rewind_property::{CapabilityTable, PropertyId, Resolver, Scope};
///
/// struct Theme(&'static str);
/// struct Limit(u32);
///
/// let mut ambient = CapabilityTable::new();
/// ambient.insert(Scope::Global, Theme("dark"));
///
/// let mut local = CapabilityTable::new();
/// let width = Scope::Property(PropertyId::new(0));
/// local.insert(Scope::Global, Limit(10));
/// local.insert(width, Limit(3));
///
/// let root = Resolver::new(&ambient, Scope::Global);
/// let for_width = Resolver::new(&local, width).with_parent(&root);
///
/// assert_eq!(for_width.resolve::<Limit>().map(|l| l.0), Some(3));
/// assert_eq!(for_width.resolve::<Theme>().map(|t| t.0), Some("dark"));
/// assert_eq!(for_width.resolve_all::<Limit>().len(), 2);
/// ```
#[derive(Clone, Copy)]
pub struct Resolver<'t, 'p> {
    table: &'t CapabilityTable,
    scope: Scope,
    parent: Option<&'p Resolver<'t, 'p>>,
}

impl fmt::Debug for Resolver<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("scope", &self.scope)
            .field("table", &self.table)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl<'t, 'p> Resolver<'t, 'p> {
    /// Creates a root resolver over `table` at `scope`.
    #[must_use]
    pub fn new(table: &'t CapabilityTable, scope: Scope) -> Self {
        Self {
            table,
            scope,
            parent: None,
        }
    }

    /// Chains this resolver to `parent`, consulted when nothing is found locally.
    #[must_use]
    pub fn with_parent(mut self, parent: &'p Resolver<'t, 'p>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Returns the same table viewed at a different scope, keeping the parent.
    #[must_use]
    pub fn at(self, scope: Scope) -> Self {
        Self { scope, ..self }
    }

    /// Returns the scope this resolver looks up first.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Resolves `C`: scope, then global, then the parent chain.
    #[must_use]
    pub fn resolve<C: Any>(&self) -> Option<&'t C> {
        self.table
            .lookup(self.scope)
            .or_else(|| self.parent.and_then(|p| p.resolve()))
    }

    /// Returns every distinct instance of `C` visible from this scope.
    ///
    /// Instances are listed nearest first.
    #[must_use]
    pub fn resolve_all<C: Any>(&self) -> Vec<&'t C> {
        let mut found: Vec<&'t C> = Vec::new();
        let mut push = |c: Option<&'t C>| {
            if let Some(c) = c
                && !found.iter().any(|f| core::ptr::eq(*f, c))
            {
                found.push(c);
            }
        };
        let mut current = Some(self);
        while let Some(r) = current {
            push(r.table.get(r.scope));
            if r.scope != Scope::Global {
                push(r.table.get(Scope::Global));
            }
            current = r.parent;
        }
        found
    }
}

/// Installation context handed to [`Behavior::install`](crate::Behavior::install).
///
/// A behavior declared on a property installs at that property's scope; a
/// behavior declared on an entity type installs at [`Scope::Global`].
pub struct Installation<'a> {
    table: &'a mut CapabilityTable,
    entity: EntityId,
    scope: Scope,
}

impl fmt::Debug for Installation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installation")
            .field("entity", &self.entity)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl<'a> Installation<'a> {
    pub(crate) fn new(table: &'a mut CapabilityTable, entity: EntityId, scope: Scope) -> Self {
        Self {
            table,
            entity,
            scope,
        }
    }

    /// The entity being constructed.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The scope of the declaration being installed.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Registers `capability` at the declaration's scope.
    pub fn provide<C: Any>(&mut self, capability: C) {
        self.table.insert(self.scope, capability);
    }

    /// Registers a global-only capability.
    ///
    /// It goes under [`Scope::Global`] whatever the declaration scope, and only
    /// if the entity does not already have one; the first declaration wins.
    pub fn provide_global<C: Any>(&mut self, capability: C) -> bool {
        self.table.insert_global_if_absent(capability)
    }
}
