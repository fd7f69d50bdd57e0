// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The link extension: target indirection and array slots.

use std::cell::{Cell, RefCell};

use glam::{DMat4, DVec3};
use linkage_document::{
    DocumentError, DocumentObjectExtension, LinkDepth, Lookup, ObjectId, Workspace,
};
use linkage_property::{Placement, PropertyId, PropertyStatus, scale_matrix};

use crate::bindings::{LinkBindings, LinkedObjectProperty};

/// Status bit set on a property while a link writes it as a mirror of
/// another property. Change notifications for a property carrying it are not
/// synchronized again.
pub const MIRRORING: PropertyStatus = PropertyStatus::USER3;

/// Makes an object stand in for another object, or for an array of copies of
/// it.
///
/// The extension reads its state from the properties named by its
/// [`LinkBindings`] and keeps them consistent as they change:
///
/// - **Plain link** (`ElementCount` is zero): sub-object and linked-object
///   queries forward to the target, through the link's sub-object path if it
///   has one, with the link's own placement and scale composed in front.
/// - **Collapsed array** (`ElementCount > 0`, `ShowElement` off): a numeric
///   path segment `i` selects slot `i`, transformed by `PlacementList[i]` and
///   `ScaleList[i]`, and continues into the target.
/// - **Expanded array** (`ElementCount > 0`, `ShowElement` on): `ElementList`
///   holds one [`LinkElement`](crate::LinkElement) child per slot, created and
///   removed by the link as the count or mode changes.
#[derive(Debug)]
pub struct LinkExtension {
    bindings: LinkBindings,
    sub_path: RefCell<String>,
    forwarding: Cell<bool>,
}

impl LinkExtension {
    /// Creates the extension over the given bindings.
    #[must_use]
    pub fn new(bindings: LinkBindings) -> Self {
        Self {
            bindings,
            sub_path: RefCell::new(String::new()),
            forwarding: Cell::new(false),
        }
    }

    /// The role bindings.
    #[must_use]
    pub fn bindings(&self) -> &LinkBindings {
        &self.bindings
    }

    /// The sub-object path inside the target, ending in `.`, or empty.
    #[must_use]
    pub fn sub_path(&self) -> String {
        self.sub_path.borrow().clone()
    }

    pub(crate) fn refresh_sub_path(&self, ws: &Workspace, owner: ObjectId) {
        let mut path = match self.bindings.linked_object() {
            Some(LinkedObjectProperty::Sub(p)) => ws
                .property(owner, p)
                .map(|link| link.subname.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        if !path.is_empty() && !path.ends_with('.') {
            path.push('.');
        }
        *self.sub_path.borrow_mut() = path;
    }

    /// The direct target of the link.
    #[must_use]
    pub fn link(&self, ws: &Workspace, owner: ObjectId) -> Option<ObjectId> {
        match self.bindings.linked_object()? {
            LinkedObjectProperty::Plain(p) => ws.property(owner, p).copied().flatten(),
            LinkedObjectProperty::Sub(p) => ws.property(owner, p).and_then(|link| link.object),
        }
    }

    /// The array size; zero for a plain link.
    #[must_use]
    pub fn element_count(&self, ws: &Workspace, owner: ObjectId) -> usize {
        self.bindings
            .element_count()
            .and_then(|p| ws.property(owner, p))
            .map_or(0, |n| usize::try_from(*n).unwrap_or(0))
    }

    /// Whether array slots are expanded into element objects.
    #[must_use]
    pub fn show_element(&self, ws: &Workspace, owner: ObjectId) -> bool {
        self.bindings
            .show_element()
            .and_then(|p| ws.property(owner, p))
            .is_none_or(|show| *show)
    }

    /// Whether the target's own placement applies under the link.
    #[must_use]
    pub fn link_transform(&self, ws: &Workspace, owner: ObjectId) -> bool {
        self.bindings
            .link_transform()
            .and_then(|p| ws.property(owner, p))
            .is_some_and(|t| *t)
    }

    /// The element objects of an expanded array.
    #[must_use]
    pub fn elements(&self, ws: &Workspace, owner: ObjectId) -> Vec<ObjectId> {
        self.bindings
            .element_list()
            .and_then(|p| ws.property(owner, p))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if the array is expanded into element objects.
    #[must_use]
    pub fn has_elements(&self, ws: &Workspace, owner: ObjectId) -> bool {
        self.bindings
            .element_list()
            .and_then(|p| ws.property(owner, p))
            .is_some_and(|list| !list.is_empty())
    }

    pub(crate) fn placement_list(&self, ws: &Workspace, owner: ObjectId) -> Vec<Placement> {
        self.bindings
            .placement_list()
            .and_then(|p| ws.property(owner, p))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn scale_list(&self, ws: &Workspace, owner: ObjectId) -> Vec<DVec3> {
        self.bindings
            .scale_list()
            .and_then(|p| ws.property(owner, p))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn visibility_list(&self, ws: &Workspace, owner: ObjectId) -> Vec<bool> {
        self.bindings
            .visibility_list()
            .and_then(|p| ws.property(owner, p))
            .cloned()
            .unwrap_or_default()
    }

    /// Parses the leading segment of `subname` as an array slot.
    ///
    /// A segment of digits is a 0-based index, valid below `ElementCount`
    /// (or below the element list length if no count is bound). Any other
    /// segment is looked up in the element list, by name or, with a `$`
    /// prefix, by label. Digits win over a name that happens to be numeric.
    ///
    /// Returns the index and the rest of the path after the segment.
    #[must_use]
    pub fn element_index<'a>(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        subname: &'a str,
    ) -> Option<(usize, &'a str)> {
        let (token, rest) = subname.split_once('.').unwrap_or((subname, ""));
        if subname.starts_with(|c: char| c.is_ascii_digit()) {
            if !is_index_token(token) {
                return None;
            }
            let index: usize = token.parse().ok()?;
            let bound = if self.bindings.element_count().is_some() {
                self.element_count(ws, owner)
            } else if self.bindings.element_list().is_some() {
                self.elements(ws, owner).len()
            } else {
                0
            };
            return (index < bound).then_some((index, rest));
        }
        let elements = self.elements(ws, owner);
        let index = match token.strip_prefix('$') {
            Some(label) => elements.iter().position(|e| ws.label(*e) == Some(label)),
            None => elements.iter().position(|e| ws.name(*e) == Some(token)),
        }?;
        Some((index, rest))
    }

    /// The link's own transform: `LinkPlacement` (or `Placement`) if
    /// `transform`, followed by `Scale`.
    #[must_use]
    pub fn transform_matrix(&self, ws: &Workspace, owner: ObjectId, transform: bool) -> DMat4 {
        let mut mat = DMat4::IDENTITY;
        if transform
            && let Some(placement) = self
                .bindings
                .link_placement()
                .and_then(|p| ws.property(owner, p))
                .or_else(|| self.bindings.placement().and_then(|p| ws.property(owner, p)))
        {
            mat = placement.to_matrix();
        }
        if let Some(scale) = self.bindings.scale().and_then(|p| ws.property(owner, p)) {
            mat *= scale_matrix(*scale);
        }
        mat
    }

    /// Resolves the object the link ultimately points at.
    ///
    /// Follows the target, then the sub-object path, then (with `recurse`)
    /// the target's own link indirection, so chains of links collapse to
    /// their final target. `Ok(None)` if any hop misses.
    pub fn true_linked_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        recurse: bool,
        mut mat: Option<&mut DMat4>,
        depth: LinkDepth,
    ) -> Lookup {
        let Some(mut target) = self.link(ws, owner) else {
            return Ok(None);
        };
        let mut transform = self.link_transform(ws, owner);
        let sub_path = self.sub_path();
        if !sub_path.is_empty() {
            let Some(found) = ws.get_sub_object_with(
                target,
                &sub_path,
                mat.as_deref_mut(),
                transform,
                depth.next()?,
            )?
            else {
                return Ok(None);
            };
            target = found;
            transform = false;
        }
        if recurse {
            let Some(found) =
                ws.linked_object_with(target, true, mat, transform, depth.next()?)?
            else {
                return Ok(None);
            };
            target = found;
        }
        Ok(ws.is_attached(target).then_some(target))
    }

    fn resolve_sub_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        subname: &str,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Lookup {
        if let Some(mat) = mat.as_deref_mut() {
            *mat *= self.transform_matrix(ws, owner, transform);
        }
        if subname.is_empty() {
            return Ok(Some(owner));
        }

        let mut rest = subname;
        let mut slot = false;
        if let Some((index, tail)) = self.element_index(ws, owner, subname) {
            rest = tail;
            let elements = self.elements(ws, owner);
            if !elements.is_empty() {
                let Some(&element) = elements.get(index).filter(|e| ws.is_attached(**e)) else {
                    return Ok(None);
                };
                let found = ws.get_sub_object_with(element, rest, mat, true, depth.next()?)?;
                return Ok(if rest.contains('.') { found } else { Some(element) });
            }
            slot = true;
            if let Some(mat) = mat.as_deref_mut() {
                if let Some(placement) = self.placement_list(ws, owner).get(index) {
                    *mat *= placement.to_matrix();
                }
                if let Some(scale) = self.scale_list(ws, owner).get(index) {
                    *mat *= scale_matrix(*scale);
                }
            }
        } else if is_index_token(subname)
            && (self.element_count(ws, owner) > 0 || self.has_elements(ws, owner))
        {
            return Ok(None);
        }

        let Some(linked) = self.true_linked_object(ws, owner, true, mat.as_deref_mut(), depth)?
        else {
            return Ok(None);
        };
        let mut next = DMat4::IDENTITY;
        let collect = mat.is_some();
        let Some(found) =
            ws.get_sub_object_with(linked, rest, collect.then_some(&mut next), false, depth.next()?)?
        else {
            return Ok(None);
        };
        if !rest.contains('.') && !slot {
            return Ok(Some(owner));
        }
        if let Some(mat) = mat {
            *mat *= next;
        }
        Ok(Some(found))
    }

    fn forward<R>(&self, f: impl FnOnce() -> R, fallback: R) -> R {
        if self.forwarding.replace(true) {
            return fallback;
        }
        let result = f();
        self.forwarding.set(false);
        result
    }

    fn linked_for_query(&self, ws: &Workspace, owner: ObjectId) -> Option<ObjectId> {
        match self.true_linked_object(ws, owner, true, None, ws.link_depth()) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(%err, "cannot resolve link target");
                None
            }
        }
    }

    pub(crate) fn touch_elements(&self, ws: &mut Workspace, owner: ObjectId) {
        for element in self.elements(ws, owner) {
            ws.touch(element);
        }
    }

    pub(crate) fn is_mirroring(ws: &Workspace, id: ObjectId, property: PropertyId) -> bool {
        ws.property_status(id, property)
            .is_some_and(|s| s.contains(MIRRORING))
    }
}

/// Whether the leading segment of `subname` is made of digits only.
fn is_index_token(subname: &str) -> bool {
    let token = subname.split_once('.').map_or(subname, |(token, _)| token);
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

impl DocumentObjectExtension for LinkExtension {
    fn setup(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        if let (Some(list), Some(_)) = (self.bindings.element_list(), self.bindings.element_count())
            && ws.has_property(owner, list.id())
        {
            ws.set_property_status(owner, list.id(), PropertyStatus::IMMUTABLE, true)?;
        }
        self.sync_transform_status(ws, owner)?;
        self.refresh_sub_path(ws, owner);
        if !ws.is_restoring(owner) {
            self.sync_elements(ws, owner)?;
        }
        Ok(())
    }

    fn unsetup(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        self.drop_elements(ws, owner)
    }

    fn restored(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        self.refresh_sub_path(ws, owner);
        let placement = self
            .bindings
            .link_placement()
            .map(|p| p.id())
            .or_else(|| self.bindings.placement().map(|p| p.id()));
        if let Some(placement) = placement {
            self.update(ws, owner, placement)?;
        }
        self.sync_transform_status(ws, owner)?;
        if self.bindings.element_list().is_some() {
            self.sync_element_slots(ws, owner)?;
            for element in self.elements(ws, owner) {
                ws.purge_touched(element);
            }
        }
        Ok(())
    }

    fn changed(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        property: PropertyId,
    ) -> Result<(), DocumentError> {
        if ws.is_restoring(owner) || Self::is_mirroring(ws, owner, property) {
            return Ok(());
        }
        self.update(ws, owner, property)
    }

    fn must_execute(&self, ws: &Workspace, owner: ObjectId) -> bool {
        let Some(target) = self.link(ws, owner).filter(|t| *t != owner) else {
            return false;
        };
        self.forward(|| ws.must_execute(target), false)
    }

    fn sub_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        subname: &str,
        mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        Some(self.resolve_sub_object(ws, owner, subname, mat, transform, depth))
    }

    fn linked_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        recurse: bool,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        if let Some(mat) = mat.as_deref_mut() {
            *mat *= self.transform_matrix(ws, owner, transform);
        }
        if self.has_elements(ws, owner) {
            return Some(Ok(Some(owner)));
        }
        Some(
            self.true_linked_object(ws, owner, recurse, mat, depth)
                .map(|found| Some(found.unwrap_or(owner))),
        )
    }

    fn sub_objects(&self, ws: &Workspace, owner: ObjectId) -> Option<Vec<String>> {
        if self.has_elements(ws, owner) {
            return Some(
                self.elements(ws, owner)
                    .into_iter()
                    .filter_map(|e| ws.name(e).map(|name| format!("{name}.")))
                    .collect(),
            );
        }
        let count = self.element_count(ws, owner);
        if count > 0 {
            return Some((0..count).map(|i| format!("{i}.")).collect());
        }
        let linked = self.linked_for_query(ws, owner)?;
        Some(self.forward(|| ws.sub_objects(linked), Vec::new()))
    }

    fn has_child_element(&self, ws: &Workspace, owner: ObjectId) -> Option<bool> {
        if self.has_elements(ws, owner) {
            return Some(true);
        }
        if self.element_count(ws, owner) > 0 {
            return Some(false);
        }
        let linked = self.linked_for_query(ws, owner)?;
        Some(self.forward(|| ws.has_child_element(linked), false))
    }

    fn is_element_visible(&self, ws: &Workspace, owner: ObjectId, element: &str) -> Option<bool> {
        if let Some((index, _)) = self.element_index(ws, owner, element) {
            self.bindings.visibility_list()?;
            return Some(
                self.visibility_list(ws, owner)
                    .get(index)
                    .copied()
                    .unwrap_or(true),
            );
        }
        let linked = self.linked_for_query(ws, owner)?;
        self.forward(|| ws.is_element_visible(linked, element), None)
    }

    fn set_element_visible(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        element: &str,
        visible: bool,
    ) -> Option<Result<(), DocumentError>> {
        if let Some((index, _)) = self.element_index(ws, owner, element) {
            let list = self.bindings.visibility_list()?;
            let mut values = self.visibility_list(ws, owner);
            if values.len() <= index {
                if visible {
                    return Some(Ok(()));
                }
                values.resize(index + 1, true);
            }
            values[index] = visible;
            return Some(ws.assign_property(owner, list, values));
        }
        let linked = self.linked_for_query(ws, owner)?;
        match ws.set_element_visible(linked, element, visible) {
            Ok(true) => Some(Ok(())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use linkage_document::ObjectSpec;
    use linkage_property::LinkSub;

    use super::*;
    use crate::properties::LinkProperties;

    struct Scene {
        ws: Workspace,
        props: LinkProperties,
        link: ObjectId,
        body: ObjectId,
        pad: ObjectId,
    }

    /// A `Body` holding `Pad` through a plain link, and a link object
    /// pointing at the body.
    fn scene() -> Scene {
        let mut ws = Workspace::new();
        let props = LinkProperties::install(&mut ws).unwrap();
        let group = ws.registry_mut().register_link(
            "Group",
            linkage_property::PropertyMetadataBuilder::new(Vec::new()).build(),
            linkage_property::LinkOptions::LOCAL,
        );
        let placement = ws.core().placement;
        let doc = ws.new_document("Doc");
        let pad = ws
            .add_object(
                doc,
                ObjectSpec::new("Pad").property_value(
                    placement,
                    Placement::from_translation(DVec3::new(0.0, 5.0, 0.0)),
                ),
                "Pad",
            )
            .unwrap();
        let body = ws
            .add_object(doc, ObjectSpec::new("Body").property_value(group, vec![pad]), "Body")
            .unwrap();
        let link = ws.add_object(doc, props.link_spec(), "Link").unwrap();
        ws.set_property(link, props.linked_object, LinkSub::new(body))
            .unwrap();
        Scene {
            ws,
            props,
            link,
            body,
            pad,
        }
    }

    fn ext(ws: &Workspace, link: ObjectId) -> std::rc::Rc<LinkExtension> {
        ws.extension::<LinkExtension>(link).unwrap()
    }

    #[test]
    fn plain_link_forwards_paths_and_keeps_itself_as_leaf() {
        let Scene {
            ws, link, body, pad, ..
        } = scene();
        assert_eq!(ws.get_sub_object(link, "").unwrap(), Some(link));
        assert_eq!(ws.get_sub_object(link, "Face1").unwrap(), Some(link));
        assert_eq!(ws.get_sub_object(link, "Pad.").unwrap(), Some(pad));
        assert_eq!(ws.get_sub_object(link, "Nope.").unwrap(), None);
        assert_eq!(ws.linked_object(link, true).unwrap(), Some(body));
        assert_eq!(ws.links_to(body, false).unwrap(), [link]);
    }

    #[test]
    fn link_placement_composes_before_target() {
        let Scene {
            mut ws,
            props,
            link,
            ..
        } = scene();
        ws.set_property(
            link,
            props.placement,
            Placement::from_translation(DVec3::X),
        )
        .unwrap();
        assert_eq!(
            ws.property(link, props.link_placement),
            Some(&Placement::from_translation(DVec3::X)),
            "placement mirrors into link placement"
        );
        ws.set_property(link, props.scale, DVec3::splat(2.0)).unwrap();

        let mut mat = DMat4::IDENTITY;
        let found = ws
            .get_sub_object_with(link, "Pad.", Some(&mut mat), true, ws.link_depth())
            .unwrap();
        assert!(found.is_some());
        assert_eq!(
            mat.transform_point3(DVec3::ZERO),
            DVec3::new(1.0, 10.0, 0.0)
        );
    }

    #[test]
    fn sub_path_redirects_the_target() {
        let Scene {
            mut ws,
            props,
            link,
            body,
            pad,
        } = scene();
        ws.set_property(link, props.linked_object, LinkSub::new(body).with_subname("Pad"))
            .unwrap();
        let ext = ext(&ws, link);
        assert_eq!(ext.sub_path(), "Pad.");
        assert_eq!(ws.linked_object(link, true).unwrap(), Some(pad));
        assert_eq!(
            ext.true_linked_object(&ws, link, false, None, ws.link_depth())
                .unwrap(),
            Some(pad)
        );
    }

    #[test]
    fn collapsed_array_slots() {
        let Scene {
            mut ws,
            props,
            link,
            body,
            pad,
        } = scene();
        ws.set_property(link, props.show_element, false).unwrap();
        ws.set_property(link, props.element_count, 5).unwrap();
        ws.set_property(
            link,
            props.placement_list,
            (0..5)
                .map(|i| Placement::from_translation(DVec3::new(f64::from(i) * 10.0, 0.0, 0.0)))
                .collect(),
        )
        .unwrap();
        assert!(ext(&ws, link).elements(&ws, link).is_empty());

        let mut mat = DMat4::IDENTITY;
        let found = ws
            .get_sub_object_with(link, "3.", Some(&mut mat), true, ws.link_depth())
            .unwrap();
        assert_eq!(found, Some(body));
        assert_eq!(mat.transform_point3(DVec3::ZERO), DVec3::new(30.0, 0.0, 0.0));
        assert_eq!(ws.linked_object(link, true).unwrap(), Some(body));

        assert_eq!(ws.get_sub_object(link, "3.Pad.").unwrap(), Some(pad));
        assert_eq!(ws.get_sub_object(link, "7.").unwrap(), None);
        assert_eq!(
            ws.sub_objects(link),
            ["0.", "1.", "2.", "3.", "4."].map(String::from)
        );
    }

    /// Answers digit-led element names such as `3abc` with the owner.
    #[derive(Debug)]
    struct NumberedFaces;

    impl DocumentObjectExtension for NumberedFaces {
        fn sub_object(
            &self,
            _ws: &Workspace,
            owner: ObjectId,
            subname: &str,
            _mat: Option<&mut DMat4>,
            _transform: bool,
            _depth: LinkDepth,
        ) -> Option<Lookup> {
            subname
                .starts_with(|c: char| c.is_ascii_digit())
                .then_some(Ok(Some(owner)))
        }
    }

    #[test]
    fn non_numeric_segments_pass_to_the_target() {
        let Scene {
            mut ws, props, link, ..
        } = scene();
        let doc = ws.document_of(link).unwrap();
        let shape = ws
            .add_object(doc, ObjectSpec::new("Shape").extension(NumberedFaces), "Shape")
            .unwrap();
        ws.set_property(link, props.linked_object, LinkSub::new(shape))
            .unwrap();
        ws.set_property(link, props.show_element, false).unwrap();
        ws.set_property(link, props.element_count, 5).unwrap();

        assert_eq!(ext(&ws, link).element_index(&ws, link, "3abc."), None);
        assert_eq!(ws.get_sub_object(link, "3abc.").unwrap(), Some(shape));
        assert_eq!(ws.get_sub_object(link, "2.3abc.").unwrap(), Some(shape));
        assert_eq!(ws.get_sub_object(link, "7.").unwrap(), None);
    }

    #[test]
    fn slot_visibility() {
        let Scene {
            mut ws,
            props,
            link,
            ..
        } = scene();
        ws.set_property(link, props.show_element, false).unwrap();
        ws.set_property(link, props.element_count, 3).unwrap();
        assert_eq!(ws.is_element_visible(link, "2."), Some(true));
        assert!(ws.set_element_visible(link, "2.", true).unwrap());
        assert_eq!(ws.property(link, props.visibility_list), Some(&vec![]));
        assert!(ws.set_element_visible(link, "1.", false).unwrap());
        assert_eq!(
            ws.property(link, props.visibility_list),
            Some(&vec![true, false])
        );
        assert_eq!(ws.is_element_visible(link, "1."), Some(false));
        assert_eq!(ws.is_element_visible(link, "5."), None);
    }

    #[test]
    fn transform_mode_toggles_hidden_placement() {
        let Scene {
            mut ws,
            props,
            link,
            ..
        } = scene();
        let hidden = |ws: &Workspace, p: PropertyId| {
            ws.property_status(link, p)
                .unwrap()
                .contains(PropertyStatus::HIDDEN)
        };
        assert!(!hidden(&ws, props.placement.id()));
        assert!(hidden(&ws, props.link_placement.id()));
        ws.set_property(link, props.link_transform, true).unwrap();
        assert!(hidden(&ws, props.placement.id()));
        assert!(!hidden(&ws, props.link_placement.id()));
    }

    #[test]
    fn must_execute_follows_the_target() {
        let Scene {
            mut ws,
            link,
            body,
            ..
        } = scene();
        ws.recompute(None).unwrap();
        assert!(!ws.must_execute(link));
        ws.touch(body);
        assert!(ws.must_execute(link));
    }

    #[test]
    fn mutual_links_do_not_recurse_forever() {
        let Scene {
            mut ws,
            props,
            link,
            ..
        } = scene();
        let doc = ws.document_of(link).unwrap();
        let other = ws.add_object(doc, props.link_spec(), "Other").unwrap();
        ws.set_property(other, props.linked_object, LinkSub::new(link))
            .unwrap();
        ws.set_property(link, props.linked_object, LinkSub::new(other))
            .unwrap();
        ws.recompute(None).unwrap_err();
        assert!(ws.linked_object(link, true).unwrap_err().is_cyclic());
        assert!(!ws.has_child_element(link));
    }
}
