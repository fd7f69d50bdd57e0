// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata definitions.
//!
//! [`PropertyMetadata`] stores a property's default value, the status bits a
//! freshly added value starts with, and an optional coerce callback.
//! [`PropertyMetadataBuilder`] builds it.

use alloc::boxed::Box;
use core::fmt;

use crate::status::PropertyStatus;
use crate::value::PropertyValue;

/// Callback for coercing a property value before it is stored.
pub type CoerceValueCallback<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Metadata for a registered property.
///
/// ```rust
/// use linkage_property::{PropertyMetadataBuilder, PropertyStatus};
///
/// let metadata = PropertyMetadataBuilder::new(0_i64)
///     .status(PropertyStatus::HIDDEN)
///     .coerce(|n| n.max(0))
///     .build();
///
/// assert_eq!(metadata.default_value(), &0);
/// assert_eq!(metadata.coerce(-4), 0);
/// assert!(metadata.status().contains(PropertyStatus::HIDDEN));
/// ```
pub struct PropertyMetadata<T: PropertyValue> {
    default_value: T,
    status: PropertyStatus,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: PropertyValue> PropertyMetadata<T> {
    /// Creates metadata with the given default value, no status bits and no coercion.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            status: PropertyStatus::empty(),
            coerce_callback: None,
        }
    }

    /// Returns the default value.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Returns the status bits a newly added value starts with.
    #[must_use]
    #[inline]
    pub fn status(&self) -> PropertyStatus {
        self.status
    }

    /// Runs the coerce callback, if any.
    #[inline]
    pub fn coerce(&self, value: T) -> T {
        match &self.coerce_callback {
            Some(callback) => callback(value),
            None => value,
        }
    }

    /// Returns whether a coerce callback is set.
    #[must_use]
    #[inline]
    pub fn has_coerce_callback(&self) -> bool {
        self.coerce_callback.is_some()
    }
}

impl<T: PropertyValue> fmt::Debug for PropertyMetadata<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("default_value", &self.default_value)
            .field("status", &self.status)
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .finish()
    }
}

/// Builder for [`PropertyMetadata`].
pub struct PropertyMetadataBuilder<T: PropertyValue> {
    default_value: T,
    status: PropertyStatus,
    coerce_callback: Option<CoerceValueCallback<T>>,
}

impl<T: PropertyValue> fmt::Debug for PropertyMetadataBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadataBuilder")
            .field("default_value", &self.default_value)
            .field("status", &self.status)
            .field("has_coerce_callback", &self.coerce_callback.is_some())
            .finish()
    }
}

impl<T: PropertyValue> PropertyMetadataBuilder<T> {
    /// Starts a builder with the given default value.
    #[must_use]
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            status: PropertyStatus::empty(),
            coerce_callback: None,
        }
    }

    /// Sets the initial status bits.
    #[must_use]
    pub fn status(mut self, status: PropertyStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets a callback that normalizes every value before it is stored.
    #[must_use]
    pub fn coerce<F>(mut self, callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.coerce_callback = Some(Box::new(callback));
        self
    }

    /// Builds the [`PropertyMetadata`].
    #[must_use]
    pub fn build(self) -> PropertyMetadata<T> {
        PropertyMetadata {
            default_value: self.default_value,
            status: self.status,
            coerce_callback: self.coerce_callback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn defaults() {
        let metadata = PropertyMetadata::new(true);
        assert!(*metadata.default_value());
        assert!(metadata.status().is_empty());
        assert!(!metadata.has_coerce_callback());
        assert!(!metadata.coerce(false));
    }

    #[test]
    fn debug_omits_callback_body() {
        let metadata = PropertyMetadataBuilder::new(1_u8).coerce(|v| v).build();
        let text = format!("{metadata:?}");
        assert!(text.contains("has_coerce_callback: true"), "{text}");
    }
}
