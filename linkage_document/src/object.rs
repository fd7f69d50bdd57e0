// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object records and the specs they are built from.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use linkage_property::{ErasedValue, Property, PropertyId, PropertyStore, PropertyValue};
use smallvec::SmallVec;

use crate::extension::DocumentObjectExtension;
use crate::id::{DocumentId, ObjectId};

bitflags::bitflags! {
    /// Object-level status bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ObjectStatus: u8 {
        /// Needs recompute.
        const TOUCHED = 0b0000_0001;
        /// The last execution failed.
        const ERROR = 0b0000_0010;
        /// Executing right now.
        const RECOMPUTING = 0b0000_0100;
        /// Being rebuilt by a restore; change hooks are not run.
        const RESTORING = 0b0000_1000;
        /// Being removed; change hooks are not run.
        const DELETING = 0b0001_0000;
    }
}

/// The detached description of an object, handed to
/// [`Workspace::add_object`](crate::Workspace::add_object).
///
/// ```rust
/// use linkage_document::{ObjectSpec, Workspace};
///
/// let mut ws = Workspace::new();
/// let doc = ws.new_document("Part");
/// let placement = ws.core().placement;
/// let spec = ObjectSpec::new("Feature").label("Base plate").property(placement);
/// let id = ws.add_object(doc, spec, "Plate").unwrap();
/// assert_eq!(ws.label(id), Some("Base plate"));
/// assert!(ws.has_property(id, placement.id()));
/// ```
#[derive(Debug)]
pub struct ObjectSpec {
    pub(crate) type_name: &'static str,
    pub(crate) label: Option<String>,
    pub(crate) properties: Vec<(PropertyId, Option<ErasedValue>)>,
    pub(crate) extensions: Vec<Rc<dyn DocumentObjectExtension>>,
}

impl ObjectSpec {
    /// Starts a spec for an object of the given type.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            label: None,
            properties: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Sets the label. Defaults to the assigned name.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn set_entry(&mut self, id: PropertyId, value: Option<ErasedValue>) {
        match self.properties.iter_mut().find(|(pid, _)| *pid == id) {
            Some(entry) => entry.1 = value,
            None => self.properties.push((id, value)),
        }
    }

    /// Adds a property with its registered default value. Adding a property
    /// again replaces its earlier entry.
    #[must_use]
    pub fn property<T>(mut self, property: Property<T>) -> Self {
        self.set_entry(property.id(), None);
        self
    }

    /// Adds a property with an initial value.
    #[must_use]
    pub fn property_value<T: PropertyValue>(mut self, property: Property<T>, value: T) -> Self {
        self.set_entry(property.id(), Some(ErasedValue::new(value)));
        self
    }

    pub(crate) fn has_property(&self, id: PropertyId) -> bool {
        self.properties.iter().any(|(pid, _)| *pid == id)
    }

    /// Attaches an extension. Hooks are offered to extensions in attachment order.
    #[must_use]
    pub fn extension(mut self, extension: impl DocumentObjectExtension) -> Self {
        self.extensions.push(Rc::new(extension));
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

#[derive(Debug, Default)]
pub(crate) struct OutListCache {
    pub(crate) list: Option<Vec<ObjectId>>,
    pub(crate) children: Option<HashMap<String, ObjectId>>,
}

impl OutListCache {
    pub(crate) fn clear(&mut self) {
        self.list = None;
        self.children = None;
    }
}

#[derive(Debug)]
pub(crate) struct ObjectData {
    pub(crate) type_name: &'static str,
    pub(crate) name: String,
    pub(crate) label: String,
    pub(crate) document: DocumentId,
    pub(crate) status: ObjectStatus,
    pub(crate) properties: PropertyStore<ObjectId>,
    /// Referrers, one entry per reference held.
    pub(crate) in_list: SmallVec<[ObjectId; 4]>,
    pub(crate) out_list: RefCell<OutListCache>,
    pub(crate) extensions: Vec<Rc<dyn DocumentObjectExtension>>,
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) object: Option<ObjectData>,
}
