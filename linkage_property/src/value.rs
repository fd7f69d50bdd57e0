// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased property value storage.
//!
//! [`ErasedValue`] holds any [`PropertyValue`] together with its type, so one
//! store can keep values of different types side by side.

use alloc::boxed::Box;
use core::any::{Any, TypeId};
use core::fmt;

/// Bound satisfied by every type that can be stored in a property.
///
/// Values are compared on assignment and printed in diagnostics, so besides
/// `Clone` they need `PartialEq` and `Debug`.
pub trait PropertyValue: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> PropertyValue for T {}

/// A type-erased property value.
///
/// # Example
///
/// ```rust
/// use linkage_property::ErasedValue;
///
/// let value = ErasedValue::new(3_i64);
/// assert!(value.is::<i64>());
/// assert_eq!(value.downcast_ref::<i64>(), Some(&3));
/// assert_eq!(value, ErasedValue::new(3_i64));
/// assert_ne!(value, ErasedValue::new(3_i32));
/// ```
pub struct ErasedValue {
    inner: Box<dyn ErasedValueTrait>,
    type_id: TypeId,
}

impl ErasedValue {
    /// Erases a concrete value.
    #[must_use]
    pub fn new<T: PropertyValue>(value: T) -> Self {
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

    /// Borrows the value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref()
    }

    /// Mutably borrows the value as a `T`.
    #[must_use]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.inner.as_any_mut().downcast_mut()
    }

    /// Takes the value out as a `T`, handing it back unchanged on a type mismatch.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if self.is::<T>() {
            let type_id = self.type_id;
            match self.inner.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => unreachable!("type id {type_id:?} matched but downcast failed"),
            }
        } else {
            Err(self)
        }
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
        self.type_id == other.type_id && self.inner.eq_any(other.inner.as_any())
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_value(f)
    }
}

trait ErasedValueTrait: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait>;
    fn eq_any(&self, other: &dyn Any) -> bool;
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: PropertyValue> ErasedValueTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedValueTrait> {
        Box::new(self.clone())
    }

    fn eq_any(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn downcast_checks_type() {
        let value = ErasedValue::new(String::from("Pad"));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("Pad"));
        assert_eq!(value.downcast_ref::<i32>(), None);
    }

    #[test]
    fn mutate_in_place() {
        let mut value = ErasedValue::new(vec![1_u32, 2]);
        value.downcast_mut::<Vec<u32>>().unwrap().push(3);
        assert_eq!(value.downcast_ref::<Vec<u32>>(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn take_by_value() {
        let value = ErasedValue::new(5_u8);
        let value = value.downcast::<u16>().unwrap_err();
        assert_eq!(value.downcast::<u8>(), Ok(5));
    }

    #[test]
    fn clone_is_deep_and_equal() {
        let value = ErasedValue::new(vec![String::from("a")]);
        let mut copy = value.clone();
        assert_eq!(value, copy);
        copy.downcast_mut::<Vec<String>>().unwrap().clear();
        assert_ne!(value, copy);
    }

    #[test]
    fn debug_shows_inner_value() {
        assert_eq!(format!("{:?}", ErasedValue::new(Some(4_u32))), "Some(4)");
    }
}
