// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property values.
//!
//! Every property holds a [`Value`]. Scalars compare by value; entities and
//! collections are handles and compare by identity. User scalar types that do
//! not fit the built-in variants are carried as an [`ErasedValue`].

use alloc::boxed::Box;
use alloc::string::String;
use core::any::{Any, TypeId};
use core::fmt;

use crate::id::{EntityId, ListId, MapId};

/// A dynamically typed property value.
///
/// # Example
///
/// ```rust
/// use rewind_property::Value;
///
/// assert_eq!(Value::from(3_i64), Value::Int(3));
/// assert_eq!(Value::from("hi"), Value::Text("hi".into()));
/// assert!(Value::default().is_null());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A float. `NaN` never equals itself, so writing `NaN` always counts as a change.
    Float(f64),
    /// A string.
    Text(String),
    /// A reference to an entity. Participates in the ownership graph.
    Entity(EntityId),
    /// A reference to an ordered collection.
    List(ListId),
    /// A reference to a key-value collection.
    Map(MapId),
    /// A user scalar, compared with its own `PartialEq`.
    Opaque(ErasedValue),
}

impl Value {
    /// Wraps a user scalar.
    #[must_use]
    pub fn opaque<T: Clone + PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self::Opaque(ErasedValue::new(value))
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the entity handle, if this is an entity reference.
    #[must_use]
    #[inline]
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the list handle, if this is a list reference.
    #[must_use]
    #[inline]
    pub fn as_list(&self) -> Option<ListId> {
        match self {
            Self::List(l) => Some(*l),
            _ => None,
        }
    }

    /// Returns the map handle, if this is a map reference.
    #[must_use]
    #[inline]
    pub fn as_map(&self) -> Option<MapId> {
        match self {
            Self::Map(m) => Some(*m),
            _ => None,
        }
    }

    /// Returns the integer, if this is an [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string slice, if this is [`Value::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Entity(_) => "entity",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Opaque(_) => "opaque",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Self::Entity(v)
    }
}

impl From<ListId> for Value {
    fn from(v: ListId) -> Self {
        Self::List(v)
    }
}

impl From<MapId> for Value {
    fn from(v: MapId) -> Self {
        Self::Map(v)
    }
}

/// Conversion between a Rust type and [`Value`], used by typed property access.
///
/// `from_value` returns `None` when the value holds a different kind.
/// `Option<T>` maps `None` to [`Value::Null`].
pub trait PropertyValue: Sized + 'static {
    /// Converts into a [`Value`].
    fn into_value(self) -> Value;

    /// Converts from a [`Value`], if it holds this type.
    fn from_value(value: Value) -> Option<Self>;
}

impl PropertyValue for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl PropertyValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl PropertyValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl PropertyValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(self.into())
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int().and_then(|i| Self::try_from(i).ok())
    }
}

impl PropertyValue for u32 {
    fn into_value(self) -> Value {
        Value::Int(self.into())
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int().and_then(|i| Self::try_from(i).ok())
    }
}

impl PropertyValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(f),
            _ => None,
        }
    }
}

impl PropertyValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PropertyValue for EntityId {
    fn into_value(self) -> Value {
        Value::Entity(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_entity()
    }
}

impl PropertyValue for ListId {
    fn into_value(self) -> Value {
        Value::List(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_list()
    }
}

impl PropertyValue for MapId {
    fn into_value(self) -> Value {
        Value::Map(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_map()
    }
}

impl PropertyValue for ErasedValue {
    fn into_value(self) -> Value {
        Value::Opaque(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Opaque(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A type-erased user scalar.
///
/// Wraps any `Clone + PartialEq + Debug + 'static` value. Two erased values
/// are equal when they hold the same type and the inner values are equal.
///
/// # Example
///
/// ```rust
/// use rewind_property::ErasedValue;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// let a = ErasedValue::new(Rgb(1, 2, 3));
/// assert!(a.is::<Rgb>());
/// assert_eq!(a.downcast_ref::<Rgb>(), Some(&Rgb(1, 2, 3)));
/// assert_eq!(a, ErasedValue::new(Rgb(1, 2, 3)));
/// assert_ne!(a, ErasedValue::new(7_u8));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedScalar>,
    type_id: TypeId,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: Clone + PartialEq + fmt::Debug + 'static>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            inner: Box::new(value),
        }
    }

    /// Returns the [`TypeId`] of the contained value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns `true` if the contained value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Downcasts to `&T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }
}

impl Clone for ErasedValue {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_boxed(),
            type_id: self.type_id,
        }
    }
}

impl PartialEq for ErasedValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.inner.eq_dyn(other.inner.as_any())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErasedValue(")?;
        self.inner.fmt_dyn(f)?;
        f.write_str(")")
    }
}

trait ErasedScalar: Any {
    fn as_any(&self) -> &dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedScalar>;
    fn eq_dyn(&self, other: &dyn Any) -> bool;
    fn fmt_dyn(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> ErasedScalar for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedScalar> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|o| self == o)
    }

    fn fmt_dyn(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn scalar_equality_is_by_value() {
        assert_eq!(Value::from("a"), Value::Text("a".into()));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = EntityId::new(0, 1);
        let b = EntityId::new(0, 2);
        assert_eq!(Value::Entity(a), Value::Entity(a));
        assert_ne!(Value::Entity(a), Value::Entity(b));
    }

    #[test]
    fn option_round_trip() {
        assert_eq!(None::<i64>.into_value(), Value::Null);
        assert_eq!(Option::<i64>::from_value(Value::Null), Some(None));
        assert_eq!(Option::<i64>::from_value(Value::Int(4)), Some(Some(4)));
        assert_eq!(Option::<i64>::from_value(Value::Bool(true)), None);
    }

    #[test]
    fn narrowing_conversions_are_checked() {
        assert_eq!(i32::from_value(Value::Int(5)), Some(5));
        assert_eq!(i32::from_value(Value::Int(i64::MAX)), None);
        assert_eq!(u32::from_value(Value::Int(-1)), None);
    }

    #[test]
    fn erased_values_compare_inner() {
        let a = Value::opaque((1_u8, 2_u8));
        let b = Value::opaque((1_u8, 2_u8));
        let c = Value::opaque((1_u8, 3_u8));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(Value::opaque(1_u8), Value::opaque(1_u16));
    }

    #[test]
    fn erased_debug_shows_inner() {
        let v = ErasedValue::new(42_u16);
        assert_eq!(format!("{v:?}"), "ErasedValue(42)");
    }
}
