// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The count/list synchronization protocol.
//!
//! Every change to a bound property lands in [`LinkExtension::update`], which
//! dispatches on the property's role. Writes the protocol makes on its own
//! behalf are wrapped in [`MIRRORING`] so the resulting change notification is
//! recognized and not synchronized a second time.
//!
//! While the array is expanded the element objects are authoritative for the
//! per-slot placement and scale, and the parallel lists are rewritten from
//! them whenever the element list changes. While collapsed the lists are the
//! only representation.

use glam::DVec3;
use linkage_document::{DocumentError, ObjectId, ObjectStatus, Workspace};
use linkage_property::{Placement, Property, PropertyId, PropertyStatus, PropertyValue};

use crate::bindings::LinkRole;
use crate::element::LinkElement;
use crate::extension::{LinkExtension, MIRRORING};
use crate::properties::ElementProperties;

/// Assigns `value` with [`MIRRORING`] set on the property, skipping the write
/// if the value is unchanged.
pub(crate) fn mirror<T: PropertyValue>(
    ws: &mut Workspace,
    id: ObjectId,
    property: Property<T>,
    value: T,
) -> Result<(), DocumentError> {
    if ws.property(id, property) == Some(&value) {
        return Ok(());
    }
    ws.with_property_status(id, property.id(), MIRRORING, |ws| {
        ws.assign_property(id, property, value)
    })
}

impl LinkExtension {
    /// Brings the link's derived state in line after `property` changed.
    pub(crate) fn update(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        property: PropertyId,
    ) -> Result<(), DocumentError> {
        let Some(role) = self.bindings().role_of(property) else {
            return Ok(());
        };
        match role {
            LinkRole::LinkPlacement | LinkRole::Placement => self.mirror_placement(ws, owner, role),
            LinkRole::ElementCount | LinkRole::ShowElement => self.sync_elements(ws, owner),
            LinkRole::ElementList => self.sync_element_slots(ws, owner),
            LinkRole::PlacementList | LinkRole::ScaleList => {
                self.push_slots_to_elements(ws, owner)
            }
            LinkRole::VisibilityList => self.push_visibility_to_elements(ws, owner),
            LinkRole::LinkedObject => {
                self.refresh_sub_path(ws, owner);
                self.touch_elements(ws, owner);
                Ok(())
            }
            LinkRole::LinkTransform => {
                self.sync_transform_status(ws, owner)?;
                self.touch_elements(ws, owner);
                Ok(())
            }
            LinkRole::Scale | LinkRole::SubElements => Ok(()),
        }
    }

    fn mirror_placement(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        changed: LinkRole,
    ) -> Result<(), DocumentError> {
        let (Some(link_placement), Some(placement)) =
            (self.bindings().link_placement(), self.bindings().placement())
        else {
            return Ok(());
        };
        let (from, to) = if changed == LinkRole::Placement {
            (placement, link_placement)
        } else {
            (link_placement, placement)
        };
        let Some(value) = ws.property(owner, from).copied() else {
            return Ok(());
        };
        tracing::trace!(
            object = ws.name(owner).unwrap_or_default(),
            from = changed.name(),
            "mirroring link placement"
        );
        mirror(ws, owner, to, value)
    }

    /// Hides whichever of `Placement` and `LinkPlacement` does not apply
    /// under the current `LinkTransform`.
    pub(crate) fn sync_transform_status(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let transform = self.link_transform(ws, owner);
        if let Some(placement) = self.bindings().placement()
            && ws.has_property(owner, placement.id())
        {
            ws.set_property_status(owner, placement.id(), PropertyStatus::HIDDEN, transform)?;
        }
        if let Some(link_placement) = self.bindings().link_placement()
            && ws.has_property(owner, link_placement.id())
        {
            ws.set_property_status(
                owner,
                link_placement.id(),
                PropertyStatus::HIDDEN,
                !transform,
            )?;
        }
        Ok(())
    }

    /// Makes the representation match `ElementCount` and `ShowElement`.
    ///
    /// Collapsing folds the element placements and scales into the lists and
    /// removes the elements; the lists are then sized to the count. Expanding
    /// creates the missing elements, seeded from the lists; shrinking removes
    /// elements from the tail.
    pub(crate) fn sync_elements(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let count = self.element_count(ws, owner);
        if !self.show_element(ws, owner) {
            self.collapse(ws, owner)?;
            return self.resize_slot_lists(ws, owner, count);
        }
        if self.bindings().element_list().is_none() {
            return Ok(());
        }
        let existing = self.elements(ws, owner).len();
        if existing < count {
            self.grow(ws, owner, count)
        } else {
            self.truncate_elements(ws, owner, count)
        }
    }

    fn collapse(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        let elements = self.elements(ws, owner);
        if elements.is_empty() {
            return Ok(());
        }
        let props = ElementProperties::lookup(ws);
        if let Some(list) = self.bindings().placement_list() {
            let placements = elements
                .iter()
                .map(|e| {
                    props
                        .and_then(|p| ws.property(*e, p.placement))
                        .copied()
                        .unwrap_or_default()
                })
                .collect();
            mirror(ws, owner, list, placements)?;
        }
        if let Some(list) = self.bindings().scale_list() {
            let scales = elements
                .iter()
                .map(|e| {
                    props
                        .and_then(|p| ws.property(*e, p.scale))
                        .copied()
                        .unwrap_or(DVec3::ONE)
                })
                .collect();
            mirror(ws, owner, list, scales)?;
        }
        self.truncate_elements(ws, owner, 0)
    }

    /// Sizes the parallel lists to `count` for the collapsed representation.
    /// New slots are offset by their index along X.
    fn resize_slot_lists(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        count: usize,
    ) -> Result<(), DocumentError> {
        if let Some(list) = self.bindings().placement_list() {
            let mut placements = self.placement_list(ws, owner);
            placements.truncate(count);
            for i in placements.len()..count {
                placements.push(default_slot_placement(i));
            }
            mirror(ws, owner, list, placements)?;
        }
        if let Some(list) = self.bindings().scale_list() {
            let mut scales = self.scale_list(ws, owner);
            scales.resize(count, DVec3::ONE);
            mirror(ws, owner, list, scales)?;
        }
        if let Some(list) = self.bindings().visibility_list() {
            let mut visibility = self.visibility_list(ws, owner);
            if visibility.len() > count {
                visibility.truncate(count);
                mirror(ws, owner, list, visibility)?;
            }
        }
        Ok(())
    }

    fn grow(&self, ws: &mut Workspace, owner: ObjectId, count: usize) -> Result<(), DocumentError> {
        let Some(list) = self.bindings().element_list() else {
            return Ok(());
        };
        let doc = ws
            .document_of(owner)
            .ok_or(DocumentError::NotAttached(owner))?;
        let base = format!("{}_i", ws.name(owner).unwrap_or_default());
        let props = ElementProperties::install(ws)?;
        let placements = self.placement_list(ws, owner);
        let scales = self.scale_list(ws, owner);
        let visibility = self.visibility_list(ws, owner);

        let mut elements = self.elements(ws, owner);
        for index in elements.len()..count {
            let placement = placements
                .get(index)
                .copied()
                .unwrap_or_else(|| default_slot_placement(index));
            let scale = scales.get(index).copied().unwrap_or(DVec3::ONE);
            let visible = visibility.get(index).copied().unwrap_or(true);
            let spec = props.element_spec(owner, index, placement, scale, visible);
            let element = ws.add_object(doc, spec, &format!("{base}{index}"))?;
            tracing::debug!(
                owner = ws.name(owner).unwrap_or_default(),
                element = ws.name(element).unwrap_or_default(),
                index,
                "created link element"
            );
            elements.push(element);
        }
        ws.assign_property(owner, list, elements)
    }

    /// Keeps the first `keep` elements and removes the rest, last first.
    fn truncate_elements(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        keep: usize,
    ) -> Result<(), DocumentError> {
        let Some(list) = self.bindings().element_list() else {
            return Ok(());
        };
        let elements = self.elements(ws, owner);
        if elements.len() <= keep {
            return Ok(());
        }
        let (kept, dropped) = elements.split_at(keep);
        ws.assign_property(owner, list, kept.to_vec())?;
        remove_elements(ws, dropped)
    }

    /// Re-indexes the elements after `ElementList` changed and, while
    /// expanded, rewrites the parallel lists and the count from them.
    pub(crate) fn sync_element_slots(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let elements = self.elements(ws, owner);
        for (index, element) in elements.iter().enumerate() {
            if let Some(ext) = ws.extension::<LinkElement>(*element) {
                ext.adopt(owner, index);
            }
        }
        if !self.show_element(ws, owner) {
            return Ok(());
        }
        let Some(props) = ElementProperties::lookup(ws) else {
            return Ok(());
        };
        if let Some(list) = self.bindings().placement_list() {
            let placements = elements
                .iter()
                .map(|e| ws.property(*e, props.placement).copied().unwrap_or_default())
                .collect();
            mirror(ws, owner, list, placements)?;
        }
        if let Some(list) = self.bindings().scale_list() {
            let scales = elements
                .iter()
                .map(|e| ws.property(*e, props.scale).copied().unwrap_or(DVec3::ONE))
                .collect();
            mirror(ws, owner, list, scales)?;
        }
        if let Some(count) = self.bindings().element_count()
            && self.element_count(ws, owner) != elements.len()
        {
            let len = i64::try_from(elements.len()).unwrap_or(i64::MAX);
            mirror(ws, owner, count, len)?;
        }
        Ok(())
    }

    /// Pushes the parallel placement and scale lists down to the elements.
    fn push_slots_to_elements(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let elements = self.elements(ws, owner);
        if elements.is_empty() {
            return Ok(());
        }
        let Some(props) = ElementProperties::lookup(ws) else {
            return Ok(());
        };
        let placements = self.placement_list(ws, owner);
        let scales = self.scale_list(ws, owner);
        for (index, element) in elements.into_iter().enumerate() {
            if !ws.is_attached(element) {
                continue;
            }
            if let Some(placement) = placements.get(index) {
                mirror(ws, element, props.placement, *placement)?;
            }
            if let Some(scale) = scales.get(index) {
                mirror(ws, element, props.scale, *scale)?;
            }
        }
        Ok(())
    }

    fn push_visibility_to_elements(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let visibility = self.visibility_list(ws, owner);
        let core = ws.core();
        for (index, element) in self.elements(ws, owner).into_iter().enumerate() {
            if ws.is_attached(element) {
                let visible = visibility.get(index).copied().unwrap_or(true);
                mirror(ws, element, core.visibility, visible)?;
            }
        }
        Ok(())
    }

    /// Detaches and removes every element. Used when the link goes away.
    pub(crate) fn drop_elements(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
    ) -> Result<(), DocumentError> {
        let Some(list) = self.bindings().element_list() else {
            return Ok(());
        };
        let elements = self.elements(ws, owner);
        if elements.is_empty() {
            return Ok(());
        }
        mirror(ws, owner, list, Vec::new())?;
        remove_elements(ws, &elements)
    }
}

fn default_slot_placement(index: usize) -> Placement {
    Placement::from_translation(DVec3::new(index as f64, 0.0, 0.0))
}

/// Orphans and removes `elements`, last first. Elements already being
/// removed are skipped.
fn remove_elements(ws: &mut Workspace, elements: &[ObjectId]) -> Result<(), DocumentError> {
    for &element in elements.iter().rev() {
        if let Some(ext) = ws.extension::<LinkElement>(element) {
            ext.release_owner();
        }
        if !ws.is_attached(element) || ws.status(element).contains(ObjectStatus::DELETING) {
            continue;
        }
        tracing::debug!(
            element = ws.name(element).unwrap_or_default(),
            "removing link element"
        );
        ws.remove_object(element)?;
    }
    Ok(())
}
