// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Array element objects.

use std::cell::Cell;
use std::rc::Rc;

use glam::{DMat4, DVec3};
use linkage_document::{
    DocumentError, DocumentObjectExtension, LinkDepth, Lookup, ObjectId, Workspace,
};
use linkage_property::{Placement, Property, PropertyId, PropertyValue, scale_matrix};

use crate::extension::{LinkExtension, MIRRORING};
use crate::properties::ElementProperties;

/// One slot of an expanded link array.
///
/// Elements are created and removed only by their owning link. An element
/// stands in for the owner's target, transformed by its own `Placement` and
/// `Scale`; changing those (or its `Visibility`) writes the new value back into
/// the owner's parallel list at the element's index.
///
/// An element whose owner released it is an orphan: it is its own linked
/// object, has no sub-objects and cannot be used as a link target.
#[derive(Debug)]
pub struct LinkElement {
    props: ElementProperties,
    owner: Cell<Option<ObjectId>>,
    index: Cell<usize>,
}

impl LinkElement {
    /// Creates the extension for slot `index` of `owner`.
    #[must_use]
    pub fn new(props: ElementProperties, owner: ObjectId, index: usize) -> Self {
        Self {
            props,
            owner: Cell::new(Some(owner)),
            index: Cell::new(index),
        }
    }

    /// The owning link, or `None` for an orphan.
    #[must_use]
    pub fn owner(&self) -> Option<ObjectId> {
        self.owner.get()
    }

    /// The slot index within the owner's array.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index.get()
    }

    /// Detaches the element from its owner.
    pub fn release_owner(&self) {
        self.owner.set(None);
    }

    pub(crate) fn adopt(&self, owner: ObjectId, index: usize) {
        self.owner.set(Some(owner));
        self.index.set(index);
    }

    /// The live owner and its link extension.
    fn owner_link(&self, ws: &Workspace) -> Option<(ObjectId, Rc<LinkExtension>)> {
        let owner = self.owner().filter(|o| ws.is_attached(*o))?;
        Some((owner, ws.extension::<LinkExtension>(owner)?))
    }

    fn transform_matrix(&self, ws: &Workspace, element: ObjectId, transform: bool) -> DMat4 {
        let mut mat = DMat4::IDENTITY;
        if transform && let Some(placement) = ws.property(element, self.props.placement) {
            mat = placement.to_matrix();
        }
        if let Some(scale) = ws.property(element, self.props.scale) {
            mat *= scale_matrix(*scale);
        }
        mat
    }

    /// Writes `value` into slot `index` of the owner's list, growing the list
    /// with `fill` if needed.
    fn write_slot<T: PropertyValue>(
        ws: &mut Workspace,
        owner: ObjectId,
        list: Property<Vec<T>>,
        index: usize,
        value: T,
        fill: T,
    ) -> Result<(), DocumentError> {
        if ws.property(owner, list).and_then(|l| l.get(index)) == Some(&value) {
            return Ok(());
        }
        ws.with_property_status(owner, list.id(), MIRRORING, |ws| {
            ws.update_property(owner, list, |values| {
                if values.len() <= index {
                    values.resize(index + 1, fill);
                }
                values[index] = value;
            })
        })
    }

    fn resolve_sub_object(
        &self,
        ws: &Workspace,
        element: ObjectId,
        subname: &str,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Lookup {
        let Some((owner, link)) = self.owner_link(ws) else {
            return Ok(subname.is_empty().then_some(element));
        };
        if let Some(mat) = mat.as_deref_mut() {
            *mat *= self.transform_matrix(ws, element, transform);
        }
        if subname.is_empty() {
            return Ok(Some(element));
        }
        let Some(linked) = link.true_linked_object(ws, owner, true, mat.as_deref_mut(), depth)?
        else {
            return Ok(None);
        };
        let mut next = DMat4::IDENTITY;
        let collect = mat.is_some();
        let Some(found) = ws.get_sub_object_with(
            linked,
            subname,
            collect.then_some(&mut next),
            false,
            depth.next()?,
        )?
        else {
            return Ok(None);
        };
        if !subname.contains('.') {
            return Ok(Some(element));
        }
        if let Some(mat) = mat {
            *mat *= next;
        }
        Ok(Some(found))
    }

    fn linked_for_query(&self, ws: &Workspace, element: ObjectId) -> Option<ObjectId> {
        let (owner, link) = self.owner_link(ws)?;
        match link.true_linked_object(ws, owner, true, None, ws.link_depth()) {
            Ok(found) => found.filter(|f| *f != element),
            Err(err) => {
                tracing::warn!(%err, "cannot resolve link element target");
                None
            }
        }
    }
}

impl DocumentObjectExtension for LinkElement {
    fn changed(
        &self,
        ws: &mut Workspace,
        element: ObjectId,
        property: PropertyId,
    ) -> Result<(), DocumentError> {
        if ws.is_restoring(element) || LinkExtension::is_mirroring(ws, element, property) {
            return Ok(());
        }
        let Some((owner, link)) = self.owner_link(ws) else {
            return Ok(());
        };
        let index = self.index();
        let bindings = link.bindings();
        if property == self.props.placement.id() {
            if let (Some(list), Some(value)) = (
                bindings.placement_list(),
                ws.property(element, self.props.placement).copied(),
            ) {
                Self::write_slot(ws, owner, list, index, value, Placement::IDENTITY)?;
            }
        } else if property == self.props.scale.id() {
            if let (Some(list), Some(value)) = (
                bindings.scale_list(),
                ws.property(element, self.props.scale).copied(),
            ) {
                Self::write_slot(ws, owner, list, index, value, DVec3::ONE)?;
            }
        } else if property == self.props.visibility.id()
            && let (Some(list), Some(value)) = (
                bindings.visibility_list(),
                ws.property(element, self.props.visibility).copied(),
            )
        {
            Self::write_slot(ws, owner, list, index, value, true)?;
        }
        Ok(())
    }

    fn must_execute(&self, ws: &Workspace, element: ObjectId) -> bool {
        self.linked_for_query(ws, element)
            .is_some_and(|target| ws.must_execute(target))
    }

    fn sub_object(
        &self,
        ws: &Workspace,
        element: ObjectId,
        subname: &str,
        mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        Some(self.resolve_sub_object(ws, element, subname, mat, transform, depth))
    }

    fn linked_object(
        &self,
        ws: &Workspace,
        element: ObjectId,
        recurse: bool,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        let (owner, link) = self.owner_link(ws)?;
        if let Some(mat) = mat.as_deref_mut() {
            *mat *= self.transform_matrix(ws, element, transform);
        }
        Some(
            link.true_linked_object(ws, owner, recurse, mat, depth)
                .map(|found| Some(found.unwrap_or(element))),
        )
    }

    fn sub_objects(&self, ws: &Workspace, element: ObjectId) -> Option<Vec<String>> {
        let linked = self.linked_for_query(ws, element)?;
        Some(ws.sub_objects(linked))
    }

    fn has_child_element(&self, ws: &Workspace, element: ObjectId) -> Option<bool> {
        let linked = self.linked_for_query(ws, element)?;
        Some(ws.has_child_element(linked))
    }

    fn is_element_visible(&self, ws: &Workspace, element: ObjectId, name: &str) -> Option<bool> {
        let linked = self.linked_for_query(ws, element)?;
        ws.is_element_visible(linked, name)
    }

    fn set_element_visible(
        &self,
        ws: &mut Workspace,
        element: ObjectId,
        name: &str,
        visible: bool,
    ) -> Option<Result<(), DocumentError>> {
        let linked = self.linked_for_query(ws, element)?;
        match ws.set_element_visible(linked, name, visible) {
            Ok(true) => Some(Ok(())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
