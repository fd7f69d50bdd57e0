// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property identification types.
//!
//! [`PropertyId`] names a registered property at runtime; [`Property<T>`] carries
//! the value type so reads and writes are checked at compile time.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// A runtime property identifier.
///
/// A compact (u16) index into a [`PropertyRegistry`](crate::PropertyRegistry).
///
/// # Example
///
/// ```rust
/// use linkage_property::PropertyId;
///
/// let id = PropertyId::new(7);
/// assert_eq!(id.index(), 7);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(u16);

impl PropertyId {
    /// Creates a property ID from a registry index.
    ///
    /// Normally produced by the registry rather than constructed by hand.
    #[must_use]
    #[inline]
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyId").field(&self.0).finish()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed property key.
///
/// Wraps a [`PropertyId`] with the value type `T`, so the same handle can only
/// be used to read or write values of that type.
///
/// ```rust
/// use linkage_property::{Property, PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::<u32>::new();
/// let count: Property<i64> = registry.register(
///     "ElementCount",
///     PropertyMetadataBuilder::new(0_i64).build(),
/// );
/// assert_eq!(registry.name(count.id()), Some("ElementCount"));
/// ```
pub struct Property<T> {
    id: PropertyId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    /// Wraps a property ID with a value type.
    ///
    /// The ID must have been registered with the same `T`; reads through a
    /// mismatched key simply find nothing.
    #[must_use]
    #[inline]
    pub const fn from_id(id: PropertyId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Returns the untyped ID.
    #[must_use]
    #[inline]
    pub const fn id(self) -> PropertyId {
        self.id
    }
}

impl<T> Copy for Property<T> {}

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Property<T> {}

impl<T> PartialEq<PropertyId> for Property<T> {
    #[inline]
    fn eq(&self, other: &PropertyId) -> bool {
        self.id == *other
    }
}

impl<T> Hash for Property<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}
