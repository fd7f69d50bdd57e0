// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Role bindings: which property of a link object plays which part.

use core::any::{TypeId, type_name};
use core::fmt;

use glam::DVec3;
use linkage_document::{DocumentError, ObjectId};
use linkage_property::{LinkSub, Placement, Property, PropertyId, PropertyKind, PropertyRegistry};

use crate::properties::LinkProperties;

/// A part a property can play in a link object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkRole {
    /// The link target. `Option<ObjectId>` or `LinkSub<ObjectId>`.
    LinkedObject,
    /// Whether the target's own placement applies under the link. `bool`.
    LinkTransform,
    /// Placement of the link itself when it has a separate one. [`Placement`].
    LinkPlacement,
    /// The object placement, mirrored with `LinkPlacement`. [`Placement`].
    Placement,
    /// Scale applied after the placement. `DVec3`.
    Scale,
    /// Element names under the target. `Vec<String>`.
    SubElements,
    /// Array size. `i64`, zero for a plain link.
    ElementCount,
    /// Whether array slots are real child objects. `bool`.
    ShowElement,
    /// The element objects of an expanded array. `Vec<ObjectId>`.
    ElementList,
    /// Per-slot placements. `Vec<Placement>`.
    PlacementList,
    /// Per-slot scales. `Vec<DVec3>`.
    ScaleList,
    /// Per-slot visibility. `Vec<bool>`.
    VisibilityList,
}

impl LinkRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::LinkedObject,
        Self::LinkTransform,
        Self::LinkPlacement,
        Self::Placement,
        Self::Scale,
        Self::SubElements,
        Self::ElementCount,
        Self::ShowElement,
        Self::ElementList,
        Self::PlacementList,
        Self::ScaleList,
        Self::VisibilityList,
    ];

    /// The role's name, as used in configuration faults.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LinkedObject => "LinkedObject",
            Self::LinkTransform => "LinkTransform",
            Self::LinkPlacement => "LinkPlacement",
            Self::Placement => "Placement",
            Self::Scale => "Scale",
            Self::SubElements => "SubElements",
            Self::ElementCount => "ElementCount",
            Self::ShowElement => "ShowElement",
            Self::ElementList => "ElementList",
            Self::PlacementList => "PlacementList",
            Self::ScaleList => "ScaleList",
            Self::VisibilityList => "VisibilityList",
        }
    }

    /// The configuration fault for this role being unbound.
    #[must_use]
    pub fn unconfigured(self) -> DocumentError {
        DocumentError::Unconfigured { role: self.name() }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The property bound to [`LinkRole::LinkedObject`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkedObjectProperty {
    /// A same-document link without a sub-object path.
    Plain(Property<Option<ObjectId>>),
    /// A link with a sub-object path; may cross documents if registered as
    /// external.
    Sub(Property<LinkSub<ObjectId>>),
}

impl LinkedObjectProperty {
    /// The untyped ID.
    #[must_use]
    pub const fn id(self) -> PropertyId {
        match self {
            Self::Plain(p) => p.id(),
            Self::Sub(p) => p.id(),
        }
    }
}

/// The properties a link object uses for each [`LinkRole`].
///
/// Any subset may be bound; operations that need an unbound role fail with
/// [`DocumentError::Unconfigured`], and queries behave as if the role held
/// its default.
///
/// ```rust
/// use linkage_document::Workspace;
/// use linkage_link::{LinkBindings, LinkRole};
/// use linkage_property::PropertyMetadataBuilder;
///
/// let mut ws = Workspace::new();
/// let count = ws
///     .registry_mut()
///     .register("Copies", PropertyMetadataBuilder::new(0_i64).build());
/// let wrong = ws
///     .registry_mut()
///     .register("Flag", PropertyMetadataBuilder::new(false).build());
///
/// let bindings = LinkBindings::new()
///     .bind(ws.registry(), LinkRole::ElementCount, count.id())
///     .unwrap();
/// assert_eq!(bindings.property_of(LinkRole::ElementCount), Some(count.id()));
/// assert_eq!(bindings.role_of(count.id()), Some(LinkRole::ElementCount));
///
/// let err = bindings
///     .bind(ws.registry(), LinkRole::ElementCount, wrong.id())
///     .unwrap_err();
/// assert!(err.is_configuration());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkBindings {
    linked_object: Option<LinkedObjectProperty>,
    link_transform: Option<Property<bool>>,
    link_placement: Option<Property<Placement>>,
    placement: Option<Property<Placement>>,
    scale: Option<Property<DVec3>>,
    sub_elements: Option<Property<Vec<String>>>,
    element_count: Option<Property<i64>>,
    show_element: Option<Property<bool>>,
    element_list: Option<Property<Vec<ObjectId>>>,
    placement_list: Option<Property<Vec<Placement>>>,
    scale_list: Option<Property<Vec<DVec3>>>,
    visibility_list: Option<Property<Vec<bool>>>,
}

fn typed<T: 'static>(
    registry: &PropertyRegistry<ObjectId>,
    property: PropertyId,
) -> Result<Property<T>, DocumentError> {
    let reg = registry
        .get(property)
        .ok_or(DocumentError::UnregisteredProperty(property))?;
    if reg.type_id() == TypeId::of::<T>() {
        Ok(Property::from_id(property))
    } else {
        Err(DocumentError::PropertyType {
            property: reg.name(),
            expected: type_name::<T>(),
        })
    }
}

fn link_kind(
    registry: &PropertyRegistry<ObjectId>,
    property: PropertyId,
) -> Result<(), DocumentError> {
    match registry.get(property) {
        Some(reg) if matches!(reg.kind(), PropertyKind::Link(_)) => Ok(()),
        Some(reg) => Err(DocumentError::PropertyType {
            property: reg.name(),
            expected: "a link property",
        }),
        None => Err(DocumentError::UnregisteredProperty(property)),
    }
}

impl LinkBindings {
    /// No roles bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_properties(props: &LinkProperties) -> Self {
        Self {
            linked_object: Some(LinkedObjectProperty::Sub(props.linked_object)),
            link_transform: Some(props.link_transform),
            link_placement: Some(props.link_placement),
            placement: Some(props.placement),
            scale: Some(props.scale),
            sub_elements: Some(props.sub_elements),
            element_count: Some(props.element_count),
            show_element: Some(props.show_element),
            element_list: Some(props.element_list),
            placement_list: Some(props.placement_list),
            scale_list: Some(props.scale_list),
            visibility_list: Some(props.visibility_list),
        }
    }

    /// Binds `property` to `role`, replacing any earlier binding.
    ///
    /// Fails if the property is not registered, holds the wrong value type,
    /// or, for `LinkedObject` and `ElementList`, is not a link property.
    pub fn bind(
        mut self,
        registry: &PropertyRegistry<ObjectId>,
        role: LinkRole,
        property: PropertyId,
    ) -> Result<Self, DocumentError> {
        match role {
            LinkRole::LinkedObject => {
                link_kind(registry, property)?;
                self.linked_object = Some(
                    match typed::<Option<ObjectId>>(registry, property) {
                        Ok(plain) => LinkedObjectProperty::Plain(plain),
                        Err(_) => LinkedObjectProperty::Sub(typed(registry, property)?),
                    },
                );
            }
            LinkRole::LinkTransform => self.link_transform = Some(typed(registry, property)?),
            LinkRole::LinkPlacement => self.link_placement = Some(typed(registry, property)?),
            LinkRole::Placement => self.placement = Some(typed(registry, property)?),
            LinkRole::Scale => self.scale = Some(typed(registry, property)?),
            LinkRole::SubElements => self.sub_elements = Some(typed(registry, property)?),
            LinkRole::ElementCount => self.element_count = Some(typed(registry, property)?),
            LinkRole::ShowElement => self.show_element = Some(typed(registry, property)?),
            LinkRole::ElementList => {
                link_kind(registry, property)?;
                self.element_list = Some(typed(registry, property)?);
            }
            LinkRole::PlacementList => self.placement_list = Some(typed(registry, property)?),
            LinkRole::ScaleList => self.scale_list = Some(typed(registry, property)?),
            LinkRole::VisibilityList => self.visibility_list = Some(typed(registry, property)?),
        }
        tracing::trace!(
            role = role.name(),
            property = registry.name(property).unwrap_or_default(),
            "bound link property"
        );
        Ok(self)
    }

    /// The property bound to `role`.
    #[must_use]
    pub fn property_of(&self, role: LinkRole) -> Option<PropertyId> {
        match role {
            LinkRole::LinkedObject => self.linked_object.map(LinkedObjectProperty::id),
            LinkRole::LinkTransform => self.link_transform.map(Property::id),
            LinkRole::LinkPlacement => self.link_placement.map(Property::id),
            LinkRole::Placement => self.placement.map(Property::id),
            LinkRole::Scale => self.scale.map(Property::id),
            LinkRole::SubElements => self.sub_elements.map(Property::id),
            LinkRole::ElementCount => self.element_count.map(Property::id),
            LinkRole::ShowElement => self.show_element.map(Property::id),
            LinkRole::ElementList => self.element_list.map(Property::id),
            LinkRole::PlacementList => self.placement_list.map(Property::id),
            LinkRole::ScaleList => self.scale_list.map(Property::id),
            LinkRole::VisibilityList => self.visibility_list.map(Property::id),
        }
    }

    /// The role `property` is bound to, if any.
    #[must_use]
    pub fn role_of(&self, property: PropertyId) -> Option<LinkRole> {
        LinkRole::ALL
            .into_iter()
            .find(|role| self.property_of(*role) == Some(property))
    }

    /// The link target property.
    #[must_use]
    pub fn linked_object(&self) -> Option<LinkedObjectProperty> {
        self.linked_object
    }

    /// The `LinkTransform` property.
    #[must_use]
    pub fn link_transform(&self) -> Option<Property<bool>> {
        self.link_transform
    }

    /// The `LinkPlacement` property.
    #[must_use]
    pub fn link_placement(&self) -> Option<Property<Placement>> {
        self.link_placement
    }

    /// The `Placement` property.
    #[must_use]
    pub fn placement(&self) -> Option<Property<Placement>> {
        self.placement
    }

    /// The `Scale` property.
    #[must_use]
    pub fn scale(&self) -> Option<Property<DVec3>> {
        self.scale
    }

    /// The `SubElements` property.
    #[must_use]
    pub fn sub_elements(&self) -> Option<Property<Vec<String>>> {
        self.sub_elements
    }

    /// The `ElementCount` property.
    #[must_use]
    pub fn element_count(&self) -> Option<Property<i64>> {
        self.element_count
    }

    /// The `ShowElement` property.
    #[must_use]
    pub fn show_element(&self) -> Option<Property<bool>> {
        self.show_element
    }

    /// The `ElementList` property.
    #[must_use]
    pub fn element_list(&self) -> Option<Property<Vec<ObjectId>>> {
        self.element_list
    }

    /// The `PlacementList` property.
    #[must_use]
    pub fn placement_list(&self) -> Option<Property<Vec<Placement>>> {
        self.placement_list
    }

    /// The `ScaleList` property.
    #[must_use]
    pub fn scale_list(&self) -> Option<Property<Vec<DVec3>>> {
        self.scale_list
    }

    /// The `VisibilityList` property.
    #[must_use]
    pub fn visibility_list(&self) -> Option<Property<Vec<bool>>> {
        self.visibility_list
    }
}

#[cfg(test)]
mod tests {
    use linkage_property::{LinkOptions, PropertyMetadataBuilder};

    use super::*;

    #[test]
    fn linked_object_accepts_both_link_shapes() {
        let mut registry = PropertyRegistry::<ObjectId>::new();
        let plain = registry.register_link(
            "Plain",
            PropertyMetadataBuilder::new(None).build(),
            LinkOptions::LOCAL,
        );
        let sub = registry.register_link(
            "Sub",
            PropertyMetadataBuilder::new(LinkSub::default()).build(),
            LinkOptions::LOCAL.external(),
        );
        let list = registry.register_link(
            "List",
            PropertyMetadataBuilder::new(Vec::new()).build(),
            LinkOptions::LOCAL,
        );

        let b = LinkBindings::new()
            .bind(&registry, LinkRole::LinkedObject, plain.id())
            .unwrap();
        assert_eq!(b.linked_object(), Some(LinkedObjectProperty::Plain(plain)));
        let b = b.bind(&registry, LinkRole::LinkedObject, sub.id()).unwrap();
        assert_eq!(b.linked_object(), Some(LinkedObjectProperty::Sub(sub)));
        assert!(
            b.bind(&registry, LinkRole::LinkedObject, list.id())
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn element_list_must_hold_links() {
        let mut registry = PropertyRegistry::<ObjectId>::new();
        let data: Property<Vec<ObjectId>> =
            registry.register("Data", PropertyMetadataBuilder::new(Vec::new()).build());
        assert_eq!(
            LinkBindings::new().bind(&registry, LinkRole::ElementList, data.id()),
            Err(DocumentError::PropertyType {
                property: "Data",
                expected: "a link property",
            })
        );
        assert_eq!(
            LinkBindings::new().bind(&registry, LinkRole::Scale, PropertyId::new(9)),
            Err(DocumentError::UnregisteredProperty(PropertyId::new(9)))
        );
    }

    #[test]
    fn unconfigured_names_the_role() {
        assert_eq!(
            LinkRole::ElementCount.unconfigured().to_string(),
            "no ElementCount property configured"
        );
    }
}
