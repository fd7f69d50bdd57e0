// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Link-capable property values.
//!
//! A property whose value implements [`LinkValue`] can report the objects it
//! references and drop a reference to a given object. The registry keeps
//! these operations type-erased so owners can walk every link property of an
//! object without knowing the concrete value types.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::value::PropertyValue;

/// A property value that references objects of key type `K`.
pub trait LinkValue<K>: PropertyValue {
    /// Appends every referenced object to `out`, in value order.
    fn collect_links(&self, out: &mut Vec<K>);

    /// Removes every reference to `target`. Returns `true` if anything changed.
    fn break_link(&mut self, target: K) -> bool;
}

/// A plain single link.
impl<K: Copy + Eq + fmt::Debug + 'static> LinkValue<K> for Option<K> {
    fn collect_links(&self, out: &mut Vec<K>) {
        out.extend(*self);
    }

    fn break_link(&mut self, target: K) -> bool {
        if *self == Some(target) {
            *self = None;
            true
        } else {
            false
        }
    }
}

/// An ordered link list. Duplicates are kept.
impl<K: Copy + Eq + fmt::Debug + 'static> LinkValue<K> for Vec<K> {
    fn collect_links(&self, out: &mut Vec<K>) {
        out.extend_from_slice(self);
    }

    fn break_link(&mut self, target: K) -> bool {
        let before = self.len();
        self.retain(|k| *k != target);
        before != self.len()
    }
}

/// A link to an object plus a path into it.
///
/// `subname` is a dot-separated sub-object path relative to `object` and
/// `sub_elements` names leaf elements (faces, edges, ...) below that path.
///
/// ```rust
/// use linkage_property::{LinkSub, LinkValue};
///
/// let mut link = LinkSub::new(3_u32).with_subname("Body.Pad.");
/// let mut out = Vec::new();
/// link.collect_links(&mut out);
/// assert_eq!(out, [3]);
/// assert!(link.break_link(3));
/// assert!(link.object.is_none());
/// assert!(link.subname.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkSub<K> {
    /// Target object, if any.
    pub object: Option<K>,
    /// Sub-object path relative to the target.
    pub subname: String,
    /// Leaf element names below the sub-object path.
    pub sub_elements: Vec<String>,
}

impl<K> LinkSub<K> {
    /// Links to `object` with an empty path.
    #[must_use]
    pub fn new(object: K) -> Self {
        Self {
            object: Some(object),
            subname: String::new(),
            sub_elements: Vec::new(),
        }
    }

    /// Replaces the sub-object path.
    #[must_use]
    pub fn with_subname(mut self, subname: impl Into<String>) -> Self {
        self.subname = subname.into();
        self
    }

    /// Replaces the leaf element names.
    #[must_use]
    pub fn with_sub_elements(mut self, sub_elements: Vec<String>) -> Self {
        self.sub_elements = sub_elements;
        self
    }
}

impl<K> Default for LinkSub<K> {
    fn default() -> Self {
        Self {
            object: None,
            subname: String::new(),
            sub_elements: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + fmt::Debug + 'static> LinkValue<K> for LinkSub<K> {
    fn collect_links(&self, out: &mut Vec<K>) {
        out.extend(self.object);
    }

    fn break_link(&mut self, target: K) -> bool {
        if self.object == Some(target) {
            *self = Self::default();
            true
        } else {
            false
        }
    }
}

/// How a link property participates in out-list filtering.
///
/// ```rust
/// use linkage_property::LinkOptions;
///
/// let opts = LinkOptions::LOCAL.external();
/// assert!(opts.is_external());
/// assert!(!opts.is_hidden());
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LinkOptions {
    external: bool,
    hidden: bool,
}

impl LinkOptions {
    /// Same-document link, visible to every out-list query.
    pub const LOCAL: Self = Self {
        external: false,
        hidden: false,
    };

    /// Allows the link to target objects in other documents.
    #[must_use]
    pub const fn external(mut self) -> Self {
        self.external = true;
        self
    }

    /// Marks the link as hidden so filtered out-lists skip it.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Returns `true` for cross-document capable links.
    #[must_use]
    #[inline]
    pub const fn is_external(self) -> bool {
        self.external
    }

    /// Returns `true` for hidden links.
    #[must_use]
    #[inline]
    pub const fn is_hidden(self) -> bool {
        self.hidden
    }
}
