// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The standard link properties and object specs.

use core::any::type_name;

use glam::DVec3;
use linkage_document::{DocumentError, ObjectId, ObjectSpec, Workspace};
use linkage_property::{
    LinkOptions, LinkSub, Placement, Property, PropertyMetadataBuilder, PropertyRegistry,
    PropertyStatus, PropertyValue,
};

use crate::bindings::LinkBindings;
use crate::element::LinkElement;
use crate::extension::LinkExtension;

/// Returns the property registered as `name` if it holds `T`, registering it
/// with `register` if the name is free.
fn lookup_or_register<T: PropertyValue>(
    registry: &mut PropertyRegistry<ObjectId>,
    name: &'static str,
    register: impl FnOnce(&mut PropertyRegistry<ObjectId>, &'static str) -> Property<T>,
) -> Result<Property<T>, DocumentError> {
    if let Some(property) = registry.lookup::<T>(name) {
        return Ok(property);
    }
    if registry.by_name(name).is_some() {
        return Err(DocumentError::PropertyType {
            property: name,
            expected: type_name::<T>(),
        });
    }
    Ok(register(registry, name))
}

/// The properties every array element carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ElementProperties {
    /// The element placement; the workspace's core placement.
    pub placement: Property<Placement>,
    /// The element scale, registered as `Scale`.
    pub scale: Property<DVec3>,
    /// The element visibility; the workspace's core visibility.
    pub visibility: Property<bool>,
}

impl ElementProperties {
    /// Registers the element properties if needed and returns them.
    ///
    /// Fails if `Scale` is already registered with another value type.
    pub fn install(ws: &mut Workspace) -> Result<Self, DocumentError> {
        let core = ws.core();
        let scale = lookup_or_register(ws.registry_mut(), "Scale", |r, name| {
            r.register(name, PropertyMetadataBuilder::new(DVec3::ONE).build())
        })?;
        Ok(Self {
            placement: core.placement,
            scale,
            visibility: core.visibility,
        })
    }

    /// The element properties, if already registered.
    #[must_use]
    pub fn lookup(ws: &Workspace) -> Option<Self> {
        let core = ws.core();
        Some(Self {
            placement: core.placement,
            scale: ws.registry().lookup("Scale")?,
            visibility: core.visibility,
        })
    }

    /// The spec of the element at `index` of `owner`'s array.
    pub(crate) fn element_spec(
        self,
        owner: ObjectId,
        index: usize,
        placement: Placement,
        scale: DVec3,
        visible: bool,
    ) -> ObjectSpec {
        ObjectSpec::new("LinkElement")
            .property_value(self.placement, placement)
            .property_value(self.scale, scale)
            .property_value(self.visibility, visible)
            .extension(LinkElement::new(self, owner, index))
    }
}

/// The standard property set of a link object, one property per
/// [`LinkRole`].
///
/// ```rust
/// use linkage_document::Workspace;
/// use linkage_link::{LinkExtension, LinkProperties};
///
/// let mut ws = Workspace::new();
/// let props = LinkProperties::install(&mut ws).unwrap();
/// let doc = ws.new_document("Assembly");
/// let link = ws.add_object(doc, props.link_spec(), "Link").unwrap();
///
/// assert!(ws.has_extension::<LinkExtension>(link));
/// assert_eq!(ws.property(link, props.element_count), Some(&0));
/// assert_eq!(LinkProperties::install(&mut ws).unwrap(), props);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkProperties {
    /// `LinkedObject`: external-capable target with sub-object path.
    pub linked_object: Property<LinkSub<ObjectId>>,
    /// `LinkTransform`, default `false`.
    pub link_transform: Property<bool>,
    /// `LinkPlacement`.
    pub link_placement: Property<Placement>,
    /// The core `Placement`.
    pub placement: Property<Placement>,
    /// `Scale`, default one.
    pub scale: Property<DVec3>,
    /// `SubElements`.
    pub sub_elements: Property<Vec<String>>,
    /// `ElementCount`, clamped to zero or more.
    pub element_count: Property<i64>,
    /// `ShowElement`, default `true`.
    pub show_element: Property<bool>,
    /// `ElementList`, hidden from editors.
    pub element_list: Property<Vec<ObjectId>>,
    /// `PlacementList`.
    pub placement_list: Property<Vec<Placement>>,
    /// `ScaleList`.
    pub scale_list: Property<Vec<DVec3>>,
    /// `VisibilityList`.
    pub visibility_list: Property<Vec<bool>>,
}

impl LinkProperties {
    /// Registers the link properties if needed and returns them. Calling it
    /// again returns the same keys.
    ///
    /// Fails if one of the names is already registered with another value
    /// type.
    pub fn install(ws: &mut Workspace) -> Result<Self, DocumentError> {
        let element = ElementProperties::install(ws)?;
        let registry = ws.registry_mut();
        Ok(Self {
            linked_object: lookup_or_register(registry, "LinkedObject", |r, name| {
                r.register_link(
                    name,
                    PropertyMetadataBuilder::new(LinkSub::default()).build(),
                    LinkOptions::LOCAL.external(),
                )
            })?,
            link_transform: lookup_or_register(registry, "LinkTransform", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(false).build())
            })?,
            link_placement: lookup_or_register(registry, "LinkPlacement", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(Placement::IDENTITY).build())
            })?,
            placement: element.placement,
            scale: element.scale,
            sub_elements: lookup_or_register(registry, "SubElements", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(Vec::new()).build())
            })?,
            element_count: lookup_or_register(registry, "ElementCount", |r, name| {
                r.register(
                    name,
                    PropertyMetadataBuilder::new(0_i64)
                        .coerce(|n| n.max(0))
                        .build(),
                )
            })?,
            show_element: lookup_or_register(registry, "ShowElement", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(true).build())
            })?,
            element_list: lookup_or_register(registry, "ElementList", |r, name| {
                r.register_link(
                    name,
                    PropertyMetadataBuilder::new(Vec::new())
                        .status(PropertyStatus::HIDDEN)
                        .build(),
                    LinkOptions::LOCAL,
                )
            })?,
            placement_list: lookup_or_register(registry, "PlacementList", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(Vec::new()).build())
            })?,
            scale_list: lookup_or_register(registry, "ScaleList", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(Vec::new()).build())
            })?,
            visibility_list: lookup_or_register(registry, "VisibilityList", |r, name| {
                r.register(name, PropertyMetadataBuilder::new(Vec::new()).build())
            })?,
        })
    }

    /// Bindings of every role to these properties.
    #[must_use]
    pub fn bindings(&self) -> LinkBindings {
        LinkBindings::from_properties(self)
    }

    /// A link object carrying every standard property, bound to a fresh
    /// [`LinkExtension`].
    #[must_use]
    pub fn link_spec(&self) -> ObjectSpec {
        self.link_spec_with(self.bindings())
    }

    /// Like [`link_spec`](Self::link_spec) with caller-chosen bindings.
    #[must_use]
    pub fn link_spec_with(&self, bindings: LinkBindings) -> ObjectSpec {
        ObjectSpec::new("Link")
            .property(self.linked_object)
            .property(self.link_transform)
            .property(self.link_placement)
            .property(self.placement)
            .property(self.scale)
            .property(self.sub_elements)
            .property(self.element_count)
            .property(self.show_element)
            .property(self.element_list)
            .property(self.placement_list)
            .property(self.scale_list)
            .property(self.visibility_list)
            .extension(LinkExtension::new(bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::LinkRole;

    #[test]
    fn install_rejects_conflicting_names() {
        let mut ws = Workspace::new();
        ws.registry_mut()
            .register("ElementCount", PropertyMetadataBuilder::new(0.0_f64).build());
        assert_eq!(
            LinkProperties::install(&mut ws),
            Err(DocumentError::PropertyType {
                property: "ElementCount",
                expected: "i64",
            })
        );
    }

    #[test]
    fn bindings_cover_every_role() {
        let mut ws = Workspace::new();
        let props = LinkProperties::install(&mut ws).unwrap();
        let bindings = props.bindings();
        for role in LinkRole::ALL {
            let id = bindings.property_of(role).unwrap();
            assert_eq!(bindings.role_of(id), Some(role));
            let rebound = LinkBindings::new().bind(ws.registry(), role, id).unwrap();
            assert_eq!(rebound.property_of(role), Some(id));
        }
    }

    #[test]
    fn element_count_is_clamped() {
        let mut ws = Workspace::new();
        let props = LinkProperties::install(&mut ws).unwrap();
        let doc = ws.new_document("Doc");
        let link = ws.add_object(doc, props.link_spec(), "Link").unwrap();
        ws.set_property(link, props.show_element, false).unwrap();
        ws.set_property(link, props.element_count, -4).unwrap();
        assert_eq!(ws.property(link, props.element_count), Some(&0));
    }
}
