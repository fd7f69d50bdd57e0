// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Out-list extraction.
//!
//! An object's out-list is every object referenced by its link properties,
//! followed by the dependencies of its expressions. The default query is
//! deduplicated (first occurrence wins) and cached on the object until a
//! reference-holding property changes; filtered queries are computed fresh and
//! leave the cache alone.

use hashbrown::{HashMap, HashSet};
use linkage_property::{PropertyId, PropertyKind};

use crate::id::ObjectId;
use crate::object::ObjectData;
use crate::workspace::Workspace;

bitflags::bitflags! {
    /// Filters for [`Workspace::out_list_with`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OutListOptions: u8 {
        /// Skip links registered as hidden.
        const NO_HIDDEN = 0b0001;
        /// Skip external-capable (cross-document) links.
        const NO_XLINKED = 0b0010;
        /// Skip expression dependencies.
        const NO_EXPRESSION = 0b0100;
        /// Keep duplicates.
        const RAW = 0b1000;
    }
}

impl Workspace {
    fn collect_out_list(&self, data: &ObjectData, options: OutListOptions) -> Vec<ObjectId> {
        let mut links = Vec::new();
        let mut expressions = Vec::new();
        for (pid, value, _) in data.properties.iter() {
            let Some(reg) = self.registry.get(pid) else {
                continue;
            };
            match reg.kind() {
                PropertyKind::Plain => {}
                PropertyKind::Link(link) => {
                    if (options.contains(OutListOptions::NO_HIDDEN) && link.is_hidden())
                        || (options.contains(OutListOptions::NO_XLINKED) && link.is_external())
                    {
                        continue;
                    }
                    reg.collect_links(value, &mut links);
                }
                PropertyKind::Expression => {
                    if !options.contains(OutListOptions::NO_EXPRESSION) {
                        reg.collect_links(value, &mut expressions);
                    }
                }
            }
        }
        links.append(&mut expressions);
        if !options.contains(OutListOptions::RAW) {
            let mut seen = HashSet::with_capacity(links.len());
            links.retain(|id| seen.insert(*id));
        }
        links
    }

    /// The objects `id` references, deduplicated, in property order with
    /// expression dependencies last. Cached until a link or expression
    /// property of `id` changes. Empty for detached handles.
    #[must_use]
    pub fn out_list(&self, id: ObjectId) -> Vec<ObjectId> {
        let Some(data) = self.data(id) else {
            return Vec::new();
        };
        if let Some(list) = &data.out_list.borrow().list {
            return list.clone();
        }
        let list = self.collect_out_list(data, OutListOptions::empty());
        data.out_list.borrow_mut().list = Some(list.clone());
        list
    }

    /// The out-list under the given filters. Empty options use the cache;
    /// anything else is computed fresh.
    #[must_use]
    pub fn out_list_with(&self, id: ObjectId, options: OutListOptions) -> Vec<ObjectId> {
        if options.is_empty() {
            return self.out_list(id);
        }
        self.data(id)
            .map(|data| self.collect_out_list(data, options))
            .unwrap_or_default()
    }

    /// The objects referenced by one property, in value order.
    #[must_use]
    pub fn out_list_of_property(&self, id: ObjectId, property: PropertyId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if let (Some(value), Some(reg)) = (
            self.property_erased(id, property),
            self.registry.get(property),
        ) {
            reg.collect_links(value, &mut out);
        }
        out
    }

    /// Returns `true` if the out-list of `id` is currently cached.
    #[must_use]
    pub fn is_out_list_cached(&self, id: ObjectId) -> bool {
        self.data(id)
            .is_some_and(|d| d.out_list.borrow().list.is_some())
    }

    /// Drops the cached out-list of `id`.
    pub fn invalidate_out_list(&mut self, id: ObjectId) {
        if let Some(data) = self.data_mut(id) {
            data.out_list.get_mut().clear();
        }
    }

    /// Finds a direct child of `id` by name among its out-list.
    #[must_use]
    pub fn child_by_name(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        let data = self.data(id)?;
        if let Some(children) = &data.out_list.borrow().children {
            return children.get(name).copied();
        }
        let children: HashMap<String, ObjectId> = self
            .out_list(id)
            .into_iter()
            .filter_map(|child| Some((self.name(child)?.to_owned(), child)))
            .collect();
        let found = children.get(name).copied();
        data.out_list.borrow_mut().children = Some(children);
        found
    }

    /// Finds the first direct child of `id` with the given label, ignoring
    /// expression dependencies.
    #[must_use]
    pub fn child_by_label(&self, id: ObjectId, label: &str) -> Option<ObjectId> {
        self.out_list_with(id, OutListOptions::NO_EXPRESSION)
            .into_iter()
            .find(|child| self.label(*child) == Some(label))
    }
}
