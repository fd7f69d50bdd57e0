// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property registry.
//!
//! [`PropertyRegistry`] assigns each property name an ID, remembers its value
//! type, metadata and [`PropertyKind`], and for link-capable kinds keeps the
//! type-erased operations that enumerate and break references.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;
use hashbrown::HashMap;

use crate::id::{Property, PropertyId};
use crate::link::{LinkOptions, LinkValue};
use crate::metadata::PropertyMetadata;
use crate::status::PropertyStatus;
use crate::value::{ErasedValue, PropertyValue};

/// What a property contributes to the dependency graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Holds plain data.
    Plain,
    /// Holds object references.
    Link(LinkOptions),
    /// Holds expressions whose dependencies count as references.
    Expression,
}

impl PropertyKind {
    /// Returns `true` for kinds whose values reference objects.
    #[must_use]
    #[inline]
    pub fn references_objects(self) -> bool {
        !matches!(self, Self::Plain)
    }
}

struct LinkOps<K> {
    collect: fn(&ErasedValue, &mut Vec<K>),
    break_link: fn(&mut ErasedValue, K) -> bool,
}

impl<K: 'static> LinkOps<K> {
    fn of<T: LinkValue<K>>() -> Self {
        Self {
            collect: |value, out| {
                if let Some(value) = value.downcast_ref::<T>() {
                    value.collect_links(out);
                }
            },
            break_link: |value, target| {
                value
                    .downcast_mut::<T>()
                    .is_some_and(|value| value.break_link(target))
            },
        }
    }
}

/// A registration entry for one property.
pub struct PropertyRegistration<K> {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    kind: PropertyKind,
    metadata: Box<dyn ErasedMetadata>,
    links: Option<LinkOps<K>>,
}

impl<K> PropertyRegistration<K> {
    /// Returns the property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`TypeId`] of the value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the value type, for diagnostics.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the property kind.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Returns the status bits a newly added value starts with.
    #[must_use]
    pub fn default_status(&self) -> PropertyStatus {
        self.metadata.status()
    }

    /// Returns a copy of the default value.
    #[must_use]
    pub fn default_value(&self) -> ErasedValue {
        self.metadata.default_erased()
    }

    /// Applies the coerce callback. Values of the wrong type pass through.
    #[must_use]
    pub fn coerce(&self, value: ErasedValue) -> ErasedValue {
        self.metadata.coerce_erased(value)
    }

    /// Appends the objects referenced by `value`. Plain properties append nothing.
    pub fn collect_links(&self, value: &ErasedValue, out: &mut Vec<K>) {
        if let Some(ops) = &self.links {
            (ops.collect)(value, out);
        }
    }

    /// Drops every reference to `target` from `value`. Returns `true` if it changed.
    pub fn break_link(&self, value: &mut ErasedValue, target: K) -> bool {
        self.links
            .as_ref()
            .is_some_and(|ops| (ops.break_link)(value, target))
    }
}

impl<K> fmt::Debug for PropertyRegistration<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistration")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A registry of properties whose link values reference keys of type `K`.
///
/// Properties are registered once; registering a name twice panics. Use
/// [`lookup`](Self::lookup) to share a property between independent setup code.
///
/// # Example
///
/// ```rust
/// use linkage_property::{LinkOptions, PropertyKind, PropertyMetadataBuilder, PropertyRegistry};
///
/// let mut registry = PropertyRegistry::<u32>::new();
/// let target = registry.register_link(
///     "Target",
///     PropertyMetadataBuilder::new(None::<u32>).build(),
///     LinkOptions::LOCAL,
/// );
///
/// assert_eq!(registry.by_name("Target"), Some(target.id()));
/// assert_eq!(registry.kind(target.id()), Some(PropertyKind::Link(LinkOptions::LOCAL)));
/// assert_eq!(registry.lookup::<Option<u32>>("Target"), Some(target));
/// assert_eq!(registry.lookup::<bool>("Target"), None);
/// ```
pub struct PropertyRegistry<K> {
    properties: Vec<PropertyRegistration<K>>,
    by_name: HashMap<&'static str, PropertyId>,
}

impl<K> Default for PropertyRegistry<K> {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<K: 'static> PropertyRegistry<K> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plain data property.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or the registry is full.
    pub fn register<T: PropertyValue>(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Property<T> {
        self.insert(name, metadata, PropertyKind::Plain, None)
    }

    /// Registers a property holding object references.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or the registry is full.
    pub fn register_link<T: LinkValue<K>>(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata<T>,
        options: LinkOptions,
    ) -> Property<T> {
        self.insert(
            name,
            metadata,
            PropertyKind::Link(options),
            Some(LinkOps::of::<T>()),
        )
    }

    /// Registers an expression property; its dependencies are its references.
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or the registry is full.
    pub fn register_expression<T: LinkValue<K>>(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata<T>,
    ) -> Property<T> {
        self.insert(
            name,
            metadata,
            PropertyKind::Expression,
            Some(LinkOps::of::<T>()),
        )
    }

    fn insert<T: PropertyValue>(
        &mut self,
        name: &'static str,
        metadata: PropertyMetadata<T>,
        kind: PropertyKind,
        links: Option<LinkOps<K>>,
    ) -> Property<T> {
        assert!(
            !self.by_name.contains_key(name),
            "Property '{name}' is already registered"
        );
        assert!(
            self.properties.len() < u16::MAX as usize,
            "Too many properties registered (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let id = PropertyId::new(self.properties.len() as u16);

        self.properties.push(PropertyRegistration {
            name,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            kind,
            metadata: Box::new(metadata),
            links,
        });
        self.by_name.insert(name, id);

        Property::from_id(id)
    }

    /// Looks up a property by name, typed. `None` if absent or of another type.
    #[must_use]
    pub fn lookup<T: 'static>(&self, name: &str) -> Option<Property<T>> {
        let id = self.by_name(name)?;
        (self.get(id)?.type_id == TypeId::of::<T>()).then(|| Property::from_id(id))
    }

    /// Returns the number of registered properties.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Looks up a property ID by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<PropertyId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of a property.
    #[must_use]
    pub fn name(&self, id: PropertyId) -> Option<&'static str> {
        self.get(id).map(|r| r.name)
    }

    /// Returns the kind of a property.
    #[must_use]
    pub fn kind(&self, id: PropertyId) -> Option<PropertyKind> {
        self.get(id).map(|r| r.kind)
    }

    /// Returns the registration for a property.
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&PropertyRegistration<K>> {
        self.properties.get(id.index() as usize)
    }

    /// Returns the typed metadata of a property.
    #[must_use]
    pub fn get_metadata<T: PropertyValue>(
        &self,
        property: Property<T>,
    ) -> Option<&PropertyMetadata<T>> {
        self.get(property.id())
            .and_then(|r| r.metadata.as_any().downcast_ref())
    }

    /// Iterates over all registrations in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &PropertyRegistration<K>)> {
        self.properties.iter().enumerate().map(|(i, r)| {
            #[expect(clippy::cast_possible_truncation, reason = "index < len < u16::MAX")]
            (PropertyId::new(i as u16), r)
        })
    }
}

impl<K> fmt::Debug for PropertyRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("count", &self.properties.len())
            .field(
                "properties",
                &self.properties.iter().map(|r| r.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

trait ErasedMetadata: Any {
    fn as_any(&self) -> &dyn Any;
    fn status(&self) -> PropertyStatus;
    fn default_erased(&self) -> ErasedValue;
    fn coerce_erased(&self, value: ErasedValue) -> ErasedValue;
}

impl<T: PropertyValue> ErasedMetadata for PropertyMetadata<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn status(&self) -> PropertyStatus {
        Self::status(self)
    }

    fn default_erased(&self) -> ErasedValue {
        ErasedValue::new(self.default_value().clone())
    }

    fn coerce_erased(&self, value: ErasedValue) -> ErasedValue {
        if !self.has_coerce_callback() {
            return value;
        }
        match value.downcast::<T>() {
            Ok(value) => ErasedValue::new(self.coerce(value)),
            Err(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkSub;
    use crate::metadata::PropertyMetadataBuilder;
    use alloc::{format, vec, vec::Vec};

    #[test]
    fn register_assigns_sequential_ids() {
        let mut registry = PropertyRegistry::<u32>::new();
        assert!(registry.is_empty());
        let a = registry.register("A", PropertyMetadataBuilder::new(0_i32).build());
        let b = registry.register("B", PropertyMetadataBuilder::new(0_i32).build());
        assert_eq!(a.id().index(), 0);
        assert_eq!(b.id().index(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name(PropertyId::new(9)), None);
    }

    #[test]
    fn link_operations_are_type_erased() {
        let mut registry = PropertyRegistry::<u32>::new();
        let list = registry.register_link(
            "Group",
            PropertyMetadataBuilder::new(Vec::<u32>::new()).build(),
            LinkOptions::LOCAL.hidden(),
        );
        let reg = registry.get(list.id()).unwrap();
        assert!(reg.kind().references_objects());

        let mut value = ErasedValue::new(vec![1_u32, 2, 1]);
        let mut out = Vec::new();
        reg.collect_links(&value, &mut out);
        assert_eq!(out, [1, 2, 1]);
        assert!(reg.break_link(&mut value, 1));
        assert_eq!(value.downcast_ref::<Vec<u32>>(), Some(&vec![2]));
    }

    #[test]
    fn plain_properties_have_no_links() {
        let mut registry = PropertyRegistry::<u32>::new();
        let p = registry.register("Count", PropertyMetadataBuilder::new(0_u32).build());
        let reg = registry.get(p.id()).unwrap();
        let mut value = ErasedValue::new(5_u32);
        let mut out = Vec::new();
        reg.collect_links(&value, &mut out);
        assert!(out.is_empty());
        assert!(!reg.break_link(&mut value, 5));
        assert!(!reg.kind().references_objects());
    }

    #[test]
    fn expression_kind_collects_dependencies() {
        let mut registry = PropertyRegistry::<u32>::new();
        let e = registry.register_expression(
            "Expr",
            PropertyMetadataBuilder::new(LinkSub::<u32>::default()).build(),
        );
        assert_eq!(registry.kind(e.id()), Some(PropertyKind::Expression));
        let mut out = Vec::new();
        registry
            .get(e.id())
            .unwrap()
            .collect_links(&ErasedValue::new(LinkSub::new(8_u32)), &mut out);
        assert_eq!(out, [8]);
    }

    #[test]
    fn coerce_and_defaults_go_through_erasure() {
        let mut registry = PropertyRegistry::<u32>::new();
        let count = registry.register(
            "ElementCount",
            PropertyMetadataBuilder::new(0_i64)
                .status(PropertyStatus::OUTPUT)
                .coerce(|n| n.max(0))
                .build(),
        );
        let reg = registry.get(count.id()).unwrap();
        assert_eq!(reg.coerce(ErasedValue::new(-3_i64)), ErasedValue::new(0_i64));
        assert_eq!(reg.coerce(ErasedValue::new(-3_i32)), ErasedValue::new(-3_i32));
        assert_eq!(reg.default_value(), ErasedValue::new(0_i64));
        assert_eq!(reg.default_status(), PropertyStatus::OUTPUT);
        assert!(registry.get_metadata(count).is_some());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_name_panics() {
        let mut registry = PropertyRegistry::<u32>::new();
        registry.register("Label", PropertyMetadataBuilder::new(0_u8).build());
        registry.register("Label", PropertyMetadataBuilder::new(0_u8).build());
    }

    #[test]
    fn debug_lists_names_in_order() {
        let mut registry = PropertyRegistry::<u32>::new();
        registry.register("First", PropertyMetadataBuilder::new(0_u8).build());
        registry.register("Second", PropertyMetadataBuilder::new(0_u8).build());
        let names: Vec<_> = registry.iter().map(|(_, r)| r.name()).collect();
        assert_eq!(names, ["First", "Second"]);
        assert!(format!("{registry:?}").contains("Second"));
    }
}
