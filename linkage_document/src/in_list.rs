// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Back-link bookkeeping.
//!
//! Each object keeps the multiset of objects referencing it, one entry per
//! reference. A referrer holding the same target through two properties
//! appears twice, so dropping one of those references leaves the other entry
//! in place.

use crate::id::ObjectId;
use crate::workspace::Workspace;

impl Workspace {
    /// Records that `referrer` references `target`. Duplicates are kept.
    /// Does nothing if `target` is detached.
    ///
    /// Called by the property write path; exposed for owners that keep
    /// references outside link properties.
    pub fn add_back_link(&mut self, target: ObjectId, referrer: ObjectId) {
        if let Some(data) = self.data_mut(target) {
            data.in_list.push(referrer);
        }
    }

    /// Removes one entry for `referrer` from `target`'s in-list, the first
    /// found. A missing entry is ignored.
    pub fn remove_back_link(&mut self, target: ObjectId, referrer: ObjectId) {
        if let Some(data) = self.data_mut(target)
            && let Some(pos) = data.in_list.iter().position(|r| *r == referrer)
        {
            data.in_list.remove(pos);
        }
    }

    /// The raw in-list of `id`, in insertion order, duplicates included.
    #[must_use]
    pub fn in_list(&self, id: ObjectId) -> Vec<ObjectId> {
        self.data(id)
            .map(|d| d.in_list.to_vec())
            .unwrap_or_default()
    }

    /// How many in-list entries of `target` name `referrer`.
    #[must_use]
    pub fn back_link_count(&self, target: ObjectId, referrer: ObjectId) -> usize {
        self.data(target)
            .map_or(0, |d| d.in_list.iter().filter(|r| **r == referrer).count())
    }

    /// Returns `true` if `other` directly references `id`.
    #[must_use]
    pub fn is_in_in_list(&self, id: ObjectId, other: ObjectId) -> bool {
        self.data(id).is_some_and(|d| d.in_list.contains(&other))
    }

    /// Returns `true` if `id` directly references `other`.
    #[must_use]
    pub fn is_in_out_list(&self, id: ObjectId, other: ObjectId) -> bool {
        self.out_list(id).contains(&other)
    }
}

#[cfg(test)]
mod tests {
    use linkage_property::{LinkOptions, Property, PropertyMetadataBuilder};
    use proptest::prelude::*;

    use super::*;
    use crate::object::ObjectSpec;

    fn two_links(ws: &mut Workspace) -> (Property<Option<ObjectId>>, Property<Option<ObjectId>>) {
        let first = ws.registry_mut().register_link(
            "First",
            PropertyMetadataBuilder::new(None).build(),
            LinkOptions::LOCAL,
        );
        let second = ws.registry_mut().register_link(
            "Second",
            PropertyMetadataBuilder::new(None).build(),
            LinkOptions::LOCAL,
        );
        (first, second)
    }

    #[test]
    fn duplicate_references_are_counted_separately() {
        let mut ws = Workspace::new();
        let (first, second) = two_links(&mut ws);
        let doc = ws.new_document("Doc");
        let target = ws.add_object(doc, ObjectSpec::new("Feature"), "Target").unwrap();
        let referrer = ws
            .add_object(
                doc,
                ObjectSpec::new("Feature")
                    .property_value(first, Some(target))
                    .property_value(second, Some(target)),
                "Referrer",
            )
            .unwrap();
        assert_eq!(ws.in_list(target), [referrer, referrer]);
        assert_eq!(ws.out_list(referrer), [target]);

        ws.set_property(referrer, first, None).unwrap();
        assert_eq!(ws.back_link_count(target, referrer), 1);
        assert!(ws.is_in_in_list(target, referrer));
        assert!(ws.is_in_out_list(referrer, target));
    }

    #[test]
    fn removing_absent_back_link_is_silent() {
        let mut ws = Workspace::new();
        let doc = ws.new_document("Doc");
        let a = ws.add_object(doc, ObjectSpec::new("Feature"), "A").unwrap();
        let b = ws.add_object(doc, ObjectSpec::new("Feature"), "B").unwrap();
        ws.remove_back_link(a, b);
        ws.add_back_link(a, b);
        ws.add_back_link(a, b);
        ws.remove_back_link(a, b);
        assert_eq!(ws.in_list(a), [b]);
    }

    proptest! {
        #[test]
        fn in_list_mirrors_out_list(
            edits in prop::collection::vec((0_usize..4, 0_usize..2, prop::option::of(0_usize..4)), 1..40)
        ) {
            let mut ws = Workspace::new();
            let (first, second) = two_links(&mut ws);
            let doc = ws.new_document("Doc");
            let objects: Vec<ObjectId> = (0..4)
                .map(|i| {
                    ws.add_object(
                        doc,
                        ObjectSpec::new("Feature").property(first).property(second),
                        &format!("Obj{i}"),
                    )
                    .unwrap()
                })
                .collect();

            for (owner, which, target) in edits {
                let property = if which == 0 { first } else { second };
                ws.set_property(objects[owner], property, target.map(|t| objects[t])).unwrap();
            }

            for &target in &objects {
                for &referrer in &objects {
                    let held = [first, second]
                        .iter()
                        .filter(|p| ws.property(referrer, **p) == Some(&Some(target)))
                        .count();
                    prop_assert_eq!(ws.back_link_count(target, referrer), held);
                    prop_assert_eq!(ws.out_list(referrer).contains(&target), held > 0);
                }
            }
        }
    }
}
