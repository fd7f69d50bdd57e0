// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sub-object paths.
//!
//! A subname is a dot-separated path relative to some object, such as
//! `"Pad.Sketch.Edge1"`. Every object segment ends in `.`; whatever follows the
//! last dot is a geometric element name that this crate carries along but does
//! not interpret. A segment starting with `$` names a child by label instead of
//! by name. A path starting with [`ELEMENT_MAP_PREFIX`] is a mapped element
//! name and is never split.
//!
//! Resolution walks the out-lists one segment at a time, offering each step to
//! the object's extensions first so link objects can redirect the walk into
//! their targets. A missing child is a miss (`Ok(None)`); only exhausting the
//! link depth is an error.

use glam::DMat4;
use hashbrown::HashSet;

use crate::config::LinkDepth;
use crate::error::DocumentError;
use crate::extension::Lookup;
use crate::id::ObjectId;
use crate::workspace::Workspace;

/// Trailing element token that marks a path as hidden.
pub const HIDDEN_MARKER: &str = "!hide";

/// Leading character of mapped element names.
pub const ELEMENT_MAP_PREFIX: char = ';';

/// Returns `true` if `subname` ends in the [`HIDDEN_MARKER`] element.
#[must_use]
pub fn has_hidden_marker(subname: &str) -> bool {
    subname
        .strip_suffix(HIDDEN_MARKER)
        .is_some_and(|head| head.is_empty() || head.ends_with('.'))
}

/// Returns `true` if `name` is a mapped element name.
#[must_use]
pub fn is_mapped_element(name: &str) -> bool {
    name.starts_with(ELEMENT_MAP_PREFIX)
}

/// A subname taken apart by [`Workspace::resolve`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The object the path's object segments lead to. `None` on a miss.
    pub object: Option<ObjectId>,
    /// The object holding [`object`](Self::object) as a child, if the path
    /// names one.
    pub parent: Option<ObjectId>,
    /// The segment under which the parent holds the object.
    pub child_name: Option<String>,
    /// The trailing element token, possibly empty.
    pub sub_element: String,
}

impl Workspace {
    /// Multiplies the object's own placement into `mat`. Objects without a
    /// placement leave it unchanged.
    pub fn apply_placement(&self, id: ObjectId, mat: Option<&mut DMat4>) {
        if let Some(mat) = mat
            && let Some(placement) = self.property(id, self.core().placement)
        {
            *mat *= placement.to_matrix();
        }
    }

    /// Resolves `subname` relative to `id` with a fresh depth budget and no
    /// transform accumulation.
    ///
    /// An empty path, or one without a dot, resolves to `id` itself.
    pub fn get_sub_object(&self, id: ObjectId, subname: &str) -> Lookup {
        self.get_sub_object_with(id, subname, None, true, self.link_depth())
    }

    /// Resolves `subname` relative to `id`.
    ///
    /// When `mat` is given, each traversed object's placement is multiplied
    /// in; `transform` says whether `id`'s own placement counts. Deeper levels
    /// always apply theirs.
    pub fn get_sub_object_with(
        &self,
        id: ObjectId,
        subname: &str,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Lookup {
        if !self.is_attached(id) {
            return Ok(None);
        }
        for ext in self.extensions_of(id) {
            if let Some(found) =
                ext.sub_object(self, id, subname, mat.as_deref_mut(), transform, depth)
            {
                return found;
            }
        }

        let dot = if is_mapped_element(subname) {
            None
        } else {
            subname.find('.')
        };
        if transform {
            self.apply_placement(id, mat.as_deref_mut());
        }
        let Some(dot) = dot else {
            return Ok(Some(id));
        };
        let token = &subname[..dot];
        let child = match token.strip_prefix('$') {
            Some(label) => self.child_by_label(id, label),
            None => self.child_by_name(id, token),
        };
        match child {
            Some(child) => self.get_sub_object_with(child, &subname[dot + 1..], mat, true, depth.next()?),
            None => Ok(None),
        }
    }

    /// Splits a path into the object it reaches, that object's structural
    /// parent, the parent's name for it, and the trailing element.
    ///
    /// The parent is found semantically: shorter prefixes of the path are
    /// resolved until one lands somewhere other than the final object, so a
    /// path through a link reports the link as parent.
    ///
    /// ```rust
    /// use linkage_document::{ObjectSpec, Workspace};
    /// use linkage_property::{LinkOptions, PropertyMetadataBuilder};
    ///
    /// let mut ws = Workspace::new();
    /// let base = ws.registry_mut().register_link(
    ///     "Base",
    ///     PropertyMetadataBuilder::new(None).build(),
    ///     LinkOptions::LOCAL,
    /// );
    /// let doc = ws.new_document("Part");
    /// let sketch = ws.add_object(doc, ObjectSpec::new("Sketch"), "Sketch").unwrap();
    /// let pad = ws
    ///     .add_object(doc, ObjectSpec::new("Pad").property_value(base, Some(sketch)), "Pad")
    ///     .unwrap();
    /// let root = ws
    ///     .add_object(doc, ObjectSpec::new("Body").property_value(base, Some(pad)), "Body")
    ///     .unwrap();
    ///
    /// let path = ws.resolve(root, "Pad.Sketch.Edge1").unwrap();
    /// assert_eq!(path.object, Some(sketch));
    /// assert_eq!(path.parent, Some(pad));
    /// assert_eq!(path.child_name.as_deref(), Some("Sketch"));
    /// assert_eq!(path.sub_element, "Edge1");
    /// ```
    pub fn resolve(&self, id: ObjectId, subname: &str) -> Result<ResolvedPath, DocumentError> {
        let Some(object) = self.get_sub_object(id, subname)? else {
            return Ok(ResolvedPath::default());
        };
        let mut path = ResolvedPath {
            object: Some(object),
            ..ResolvedPath::default()
        };
        let bytes = subname.as_bytes();
        let last_dot = match subname.rfind('.') {
            Some(pos) if pos > 0 && !is_mapped_element(subname) => pos,
            found => {
                path.sub_element = found.map_or(subname, |pos| &subname[pos + 1..]).to_owned();
                return Ok(path);
            }
        };

        path.parent = Some(id);
        let mut last_dot = last_dot;
        let mut dot = last_dot;
        let mut element_checked = false;
        while dot > 0 {
            dot -= 1;
            if bytes[dot] != b'.' && dot != 0 {
                continue;
            }
            if !element_checked {
                element_checked = true;
                let tail = if dot == 0 { subname } else { &subname[dot + 1..] };
                if is_mapped_element(tail) {
                    last_dot = dot;
                    continue;
                }
            }
            if dot == 0 {
                break;
            }
            let prefix = self.get_sub_object(id, &subname[..=dot])?;
            if prefix != Some(object) {
                path.parent = prefix;
                break;
            }
        }

        if last_dot != dot {
            let start = if bytes[dot] == b'.' { dot + 1 } else { dot };
            if let Some(len) = subname[start..].find('.') {
                path.child_name = Some(subname[start..start + len].to_owned());
            }
        }
        path.sub_element = if bytes[last_dot] == b'.' {
            &subname[last_dot + 1..]
        } else {
            &subname[last_dot..]
        }
        .to_owned();
        Ok(path)
    }

    /// Resolves what `id` stands in for. Objects that are not links stand in
    /// for themselves.
    pub fn linked_object(&self, id: ObjectId, recurse: bool) -> Lookup {
        self.linked_object_with(id, recurse, None, false, self.link_depth())
    }

    /// [`linked_object`](Self::linked_object) with transform accumulation and
    /// an explicit depth budget.
    pub fn linked_object_with(
        &self,
        id: ObjectId,
        recurse: bool,
        mut mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Lookup {
        if !self.is_attached(id) {
            return Ok(None);
        }
        for ext in self.extensions_of(id) {
            if let Some(found) =
                ext.linked_object(self, id, recurse, mat.as_deref_mut(), transform, depth)
            {
                return found;
            }
        }
        if transform {
            self.apply_placement(id, mat);
        }
        Ok(Some(id))
    }

    /// Child paths of `id`, each ending in `.`. Empty unless an extension
    /// provides them.
    #[must_use]
    pub fn sub_objects(&self, id: ObjectId) -> Vec<String> {
        self.extensions_of(id)
            .iter()
            .find_map(|ext| ext.sub_objects(self, id))
            .unwrap_or_default()
    }

    /// Returns `true` if an extension reports child elements on `id`.
    #[must_use]
    pub fn has_child_element(&self, id: ObjectId) -> bool {
        self.extensions_of(id)
            .iter()
            .find_map(|ext| ext.has_child_element(self, id))
            .unwrap_or(false)
    }

    /// Visibility of a child element. `None` if no extension tracks it.
    #[must_use]
    pub fn is_element_visible(&self, id: ObjectId, element: &str) -> Option<bool> {
        self.extensions_of(id)
            .iter()
            .find_map(|ext| ext.is_element_visible(self, id, element))
    }

    /// Changes the visibility of a child element. Returns `Ok(false)` if no
    /// extension handled the request.
    pub fn set_element_visible(
        &mut self,
        id: ObjectId,
        element: &str,
        visible: bool,
    ) -> Result<bool, DocumentError> {
        for ext in self.extensions_of(id) {
            if let Some(result) = ext.set_element_visible(self, id, element, visible) {
                return result.map(|()| true);
            }
        }
        Ok(false)
    }

    /// Objects that stand in for `id`: direct referrers whose non-recursive
    /// linked object is `id`. With `recursive`, links to those links too.
    pub fn links_to(&self, id: ObjectId, recursive: bool) -> Result<Vec<ObjectId>, DocumentError> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![id];
        while let Some(target) = pending.pop() {
            let mut referrers = self.in_list(target);
            referrers.sort_unstable();
            referrers.dedup();
            for referrer in referrers {
                if self.linked_object(referrer, false)? == Some(target) && seen.insert(referrer) {
                    found.push(referrer);
                    if recursive {
                        pending.push(referrer);
                    }
                }
            }
        }
        Ok(found)
    }

    /// Every `(top, subname)` pair such that resolving `subname` from `top`
    /// reaches `id`. Parents are found through the in-list and expanded to the
    /// links standing in for them.
    pub fn parents(&self, id: ObjectId) -> Result<Vec<(ObjectId, String)>, DocumentError> {
        self.parents_at(id, self.link_depth())
    }

    fn parents_at(
        &self,
        id: ObjectId,
        depth: LinkDepth,
    ) -> Result<Vec<(ObjectId, String)>, DocumentError> {
        let Some(name) = self.name(id) else {
            return Ok(Vec::new());
        };
        let segment = format!("{name}.");
        let mut referrers = self.in_list(id);
        referrers.sort_unstable();
        referrers.dedup();

        let mut out = Vec::new();
        for parent in referrers {
            if self.get_sub_object(parent, &segment)? != Some(id) {
                continue;
            }
            let mut holders = self.links_to(parent, true)?;
            holders.insert(0, parent);
            for holder in holders {
                let mut above = self.parents_at(holder, depth.next()?)?;
                if above.is_empty() {
                    above.push((holder, String::new()));
                }
                out.extend(above.into_iter().map(|(top, sub)| (top, sub + &segment)));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use linkage_property::{LinkOptions, Placement, Property, PropertyMetadataBuilder};

    use super::*;
    use crate::object::ObjectSpec;

    struct Chain {
        ws: Workspace,
        base: Property<Option<ObjectId>>,
        root: ObjectId,
        pad: ObjectId,
        sketch: ObjectId,
    }

    fn chain() -> Chain {
        let mut ws = Workspace::new();
        let base = ws.registry_mut().register_link(
            "Base",
            PropertyMetadataBuilder::new(None).build(),
            LinkOptions::LOCAL,
        );
        let placement = ws.core().placement;
        let doc = ws.new_document("Doc");
        let sketch = ws
            .add_object(
                doc,
                ObjectSpec::new("Sketch")
                    .label("Profile")
                    .property_value(placement, Placement::from_translation(DVec3::Z)),
                "SketchB",
            )
            .unwrap();
        let pad = ws
            .add_object(
                doc,
                ObjectSpec::new("Pad")
                    .property_value(base, Some(sketch))
                    .property_value(placement, Placement::from_translation(DVec3::X)),
                "PadA",
            )
            .unwrap();
        let root = ws
            .add_object(doc, ObjectSpec::new("Root").property_value(base, Some(pad)), "Root")
            .unwrap();
        Chain {
            ws,
            base,
            root,
            pad,
            sketch,
        }
    }

    #[test]
    fn resolves_by_name_and_label() {
        let Chain {
            ws,
            root,
            pad,
            sketch,
            ..
        } = chain();
        assert_eq!(ws.get_sub_object(root, "").unwrap(), Some(root));
        assert_eq!(ws.get_sub_object(root, "Face1").unwrap(), Some(root));
        assert_eq!(ws.get_sub_object(root, "PadA.").unwrap(), Some(pad));
        assert_eq!(ws.get_sub_object(root, "PadA.SketchB.").unwrap(), Some(sketch));
        assert_eq!(ws.get_sub_object(root, "PadA.$Profile.Edge2").unwrap(), Some(sketch));
        assert_eq!(ws.get_sub_object(root, "Nope.").unwrap(), None);
        assert_eq!(ws.get_sub_object(root, "PadA.Nope.").unwrap(), None);
        assert_eq!(ws.get_sub_object(root, ";#1:2.Edge").unwrap(), Some(root));
    }

    #[test]
    fn accumulates_placements() {
        let Chain { ws, root, .. } = chain();
        let mut mat = DMat4::IDENTITY;
        let found = ws
            .get_sub_object_with(root, "PadA.SketchB.", Some(&mut mat), true, ws.link_depth())
            .unwrap();
        assert!(found.is_some());
        assert_eq!(mat.transform_point3(DVec3::ZERO), DVec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn resolve_reports_parent_and_child() {
        let Chain {
            ws,
            root,
            pad,
            sketch,
            ..
        } = chain();
        let path = ws.resolve(root, "PadA.SketchB.").unwrap();
        assert_eq!(path.object, Some(sketch));
        assert_eq!(path.parent, Some(pad));
        assert_eq!(path.child_name.as_deref(), Some("SketchB"));
        assert_eq!(path.sub_element, "");

        let path = ws.resolve(root, "PadA.").unwrap();
        assert_eq!(path.object, Some(pad));
        assert_eq!(path.parent, Some(root));
        assert_eq!(path.child_name.as_deref(), Some("PadA"));

        let path = ws.resolve(root, "Vertex3").unwrap();
        assert_eq!(path.object, Some(root));
        assert_eq!(path.parent, None);
        assert_eq!(path.sub_element, "Vertex3");

        assert_eq!(ws.resolve(root, "Missing.").unwrap(), ResolvedPath::default());
    }

    #[test]
    fn resolve_keeps_mapped_element_tail() {
        let Chain { ws, root, pad, .. } = chain();
        let path = ws.resolve(root, "PadA.;g1.v2").unwrap();
        assert_eq!(path.object, Some(pad));
        assert_eq!(path.parent, Some(root));
        assert_eq!(path.child_name.as_deref(), Some("PadA"));
        assert_eq!(path.sub_element, ";g1.v2");
    }

    #[test]
    fn cycle_exhausts_depth() {
        let Chain {
            mut ws,
            base,
            sketch,
            root,
            ..
        } = chain();
        ws.add_property(sketch, base, Some(root)).unwrap();
        let err = ws
            .get_sub_object(root, &"PadA.SketchB.Root.".repeat(4))
            .unwrap_err();
        assert!(err.is_cyclic());
    }

    #[test]
    fn plain_objects_are_their_own_linked_object() {
        let Chain { ws, pad, .. } = chain();
        assert_eq!(ws.linked_object(pad, true).unwrap(), Some(pad));
        assert!(ws.links_to(pad, true).unwrap().is_empty());
        assert!(ws.sub_objects(pad).is_empty());
        assert!(!ws.has_child_element(pad));
        assert_eq!(ws.is_element_visible(pad, "Edge1"), None);
    }

    #[test]
    fn parents_walk_up_to_the_roots() {
        let Chain {
            ws, root, sketch, ..
        } = chain();
        assert_eq!(
            ws.parents(sketch).unwrap(),
            [(root, "PadA.SketchB.".to_owned())]
        );
        assert!(ws.parents(root).unwrap().is_empty());
    }

    #[test]
    fn hidden_marker() {
        assert!(has_hidden_marker("Pad.!hide"));
        assert!(has_hidden_marker("!hide"));
        assert!(!has_hidden_marker("Pad.Edge!hide"));
        assert!(is_mapped_element(";Face1"));
    }
}
