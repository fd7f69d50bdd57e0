// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The object registry: documents, object slots, names and lifecycle.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use linkage_property::{
    ErasedValue, Placement, Property, PropertyId, PropertyMetadataBuilder, PropertyRegistry,
    PropertyStatus, PropertyStore,
};
use smallvec::SmallVec;

use crate::config::{LinkDepth, WorkspaceConfig};
use crate::error::DocumentError;
use crate::expression::ExpressionMap;
use crate::extension::DocumentObjectExtension;
use crate::id::{DocumentId, ObjectId};
use crate::naming;
use crate::object::{ObjectData, ObjectSpec, ObjectStatus, OutListCache, Slot};

/// Properties every workspace registers.
#[derive(Copy, Clone, Debug)]
pub struct CoreProperties {
    /// Expression bindings. Present on every object.
    pub expression_engine: Property<ExpressionMap>,
    /// Object visibility. Present on every object, hidden from editors.
    pub visibility: Property<bool>,
    /// Placement. Objects opt in; sub-object paths compose it.
    pub placement: Property<Placement>,
}

impl CoreProperties {
    fn register(registry: &mut PropertyRegistry<ObjectId>) -> Self {
        Self {
            expression_engine: registry.register_expression(
                "ExpressionEngine",
                PropertyMetadataBuilder::new(ExpressionMap::new())
                    .status(PropertyStatus::HIDDEN)
                    .build(),
            ),
            visibility: registry.register(
                "Visibility",
                PropertyMetadataBuilder::new(true)
                    .status(PropertyStatus::HIDDEN | PropertyStatus::OUTPUT)
                    .build(),
            ),
            placement: registry.register(
                "Placement",
                PropertyMetadataBuilder::new(Placement::IDENTITY).build(),
            ),
        }
    }
}

#[derive(Debug)]
struct DocumentData {
    name: String,
    objects: Vec<ObjectId>,
    by_name: HashMap<String, ObjectId>,
    restoring: bool,
}

/// A set of open documents and the objects in them.
///
/// The workspace owns every object. Objects refer to each other by
/// [`ObjectId`] through link properties; the workspace keeps the forward
/// (out-list) and reverse (in-list) views of those references consistent as
/// properties change and objects come and go.
///
/// # Example
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
///
/// let doc = ws.new_document("Part");
/// let sketch = ws.add_object(doc, ObjectSpec::new("Sketch"), "Sketch").unwrap();
/// let pad = ws
///     .add_object(doc, ObjectSpec::new("Pad").property_value(base, Some(sketch)), "Pad")
///     .unwrap();
///
/// assert_eq!(ws.out_list(pad), [sketch]);
/// assert_eq!(ws.in_list(sketch), [pad]);
///
/// ws.remove_object(sketch).unwrap();
/// assert_eq!(ws.property(pad, base), Some(&None));
/// assert!(ws.out_list(pad).is_empty());
/// ```
#[derive(Debug)]
pub struct Workspace {
    config: WorkspaceConfig,
    pub(crate) registry: PropertyRegistry<ObjectId>,
    core: CoreProperties,
    documents: Vec<Option<DocumentData>>,
    pub(crate) slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Creates an empty workspace with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorkspaceConfig::default())
    }

    /// Creates an empty workspace.
    #[must_use]
    pub fn with_config(config: WorkspaceConfig) -> Self {
        let mut registry = PropertyRegistry::new();
        let core = CoreProperties::register(&mut registry);
        Self {
            config,
            registry,
            core,
            documents: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Returns the property registry.
    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry<ObjectId> {
        &self.registry
    }

    /// Returns the property registry for registering more properties.
    pub fn registry_mut(&mut self) -> &mut PropertyRegistry<ObjectId> {
        &mut self.registry
    }

    /// Returns the core property keys.
    #[must_use]
    pub fn core(&self) -> CoreProperties {
        self.core
    }

    /// Returns a fresh depth budget sized for the current object count.
    #[must_use]
    pub fn link_depth(&self) -> LinkDepth {
        LinkDepth::new(self.config.link_depth_limit(self.live))
    }

    // --- documents ---

    /// Opens a new, empty document.
    pub fn new_document(&mut self, name: impl Into<String>) -> DocumentId {
        #[expect(clippy::cast_possible_truncation, reason = "document count fits in u32")]
        let id = DocumentId(self.documents.len() as u32);
        self.documents.push(Some(DocumentData {
            name: name.into(),
            objects: Vec::new(),
            by_name: HashMap::new(),
            restoring: false,
        }));
        id
    }

    fn document(&self, doc: DocumentId) -> Result<&DocumentData, DocumentError> {
        self.documents
            .get(doc.idx())
            .and_then(Option::as_ref)
            .ok_or(DocumentError::NoSuchDocument(doc))
    }

    fn document_mut(&mut self, doc: DocumentId) -> Result<&mut DocumentData, DocumentError> {
        self.documents
            .get_mut(doc.idx())
            .and_then(Option::as_mut)
            .ok_or(DocumentError::NoSuchDocument(doc))
    }

    /// Returns the name of an open document.
    #[must_use]
    pub fn document_name(&self, doc: DocumentId) -> Option<&str> {
        self.document(doc).ok().map(|d| d.name.as_str())
    }

    /// Iterates over open documents.
    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.iter().enumerate().filter_map(|(i, d)| {
            #[expect(clippy::cast_possible_truncation, reason = "document count fits in u32")]
            d.as_ref().map(|_| DocumentId(i as u32))
        })
    }

    /// Removes every object of a document, newest first, then closes it.
    pub fn close_document(&mut self, doc: DocumentId) -> Result<(), DocumentError> {
        while let Some(&last) = self.document(doc)?.objects.last() {
            self.remove_object(last)?;
        }
        self.documents[doc.idx()] = None;
        Ok(())
    }

    /// Objects of a document in insertion order. Empty for closed documents.
    #[must_use]
    pub fn objects(&self, doc: DocumentId) -> &[ObjectId] {
        self.document(doc).map_or(&[], |d| d.objects.as_slice())
    }

    /// Every attached object across all open documents.
    #[must_use]
    pub fn objects_in_all_documents(&self) -> Vec<ObjectId> {
        self.documents
            .iter()
            .flatten()
            .flat_map(|d| d.objects.iter().copied())
            .collect()
    }

    /// Number of attached objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.live
    }

    // --- object records ---

    pub(crate) fn data(&self, id: ObjectId) -> Option<&ObjectData> {
        self.slots
            .get(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_ref())
    }

    pub(crate) fn data_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData> {
        self.slots
            .get_mut(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_mut())
    }

    pub(crate) fn attached(&self, id: ObjectId) -> Result<&ObjectData, DocumentError> {
        self.data(id).ok_or(DocumentError::NotAttached(id))
    }

    pub(crate) fn attached_mut(&mut self, id: ObjectId) -> Result<&mut ObjectData, DocumentError> {
        self.data_mut(id).ok_or(DocumentError::NotAttached(id))
    }

    pub(crate) fn extensions_of(&self, id: ObjectId) -> Vec<Rc<dyn DocumentObjectExtension>> {
        self.data(id)
            .map(|d| d.extensions.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if `id` names an attached object.
    #[must_use]
    pub fn is_attached(&self, id: ObjectId) -> bool {
        self.data(id).is_some()
    }

    /// Returns the object's unique name.
    #[must_use]
    pub fn name(&self, id: ObjectId) -> Option<&str> {
        self.data(id).map(|d| d.name.as_str())
    }

    /// Returns the object's label.
    #[must_use]
    pub fn label(&self, id: ObjectId) -> Option<&str> {
        self.data(id).map(|d| d.label.as_str())
    }

    /// Changes the object's label. Labels need not be unique.
    pub fn set_label(&mut self, id: ObjectId, label: impl Into<String>) -> Result<(), DocumentError> {
        self.attached_mut(id)?.label = label.into();
        Ok(())
    }

    /// Returns the type name the object was created with.
    #[must_use]
    pub fn type_name(&self, id: ObjectId) -> Option<&'static str> {
        self.data(id).map(|d| d.type_name)
    }

    /// Returns the document holding the object.
    #[must_use]
    pub fn document_of(&self, id: ObjectId) -> Option<DocumentId> {
        self.data(id).map(|d| d.document)
    }

    /// Looks an object up by name.
    #[must_use]
    pub fn object_by_name(&self, doc: DocumentId, name: &str) -> Option<ObjectId> {
        self.document(doc).ok()?.by_name.get(name).copied()
    }

    /// Returns the first object, in insertion order, with the given label.
    #[must_use]
    pub fn object_by_label(&self, doc: DocumentId, label: &str) -> Option<ObjectId> {
        self.objects(doc)
            .iter()
            .copied()
            .find(|id| self.label(*id) == Some(label))
    }

    /// Returns the object's status bits. Empty for detached handles.
    #[must_use]
    pub fn status(&self, id: ObjectId) -> ObjectStatus {
        self.data(id).map(|d| d.status).unwrap_or_default()
    }

    pub(crate) fn set_status(&mut self, id: ObjectId, bits: ObjectStatus, on: bool) {
        if let Some(data) = self.data_mut(id) {
            data.status.set(bits, on);
        }
    }

    /// Returns the first attached extension of type `E`.
    #[must_use]
    pub fn extension<E: DocumentObjectExtension>(&self, id: ObjectId) -> Option<Rc<E>> {
        self.data(id)?.extensions.iter().find_map(|ext| {
            let any: Rc<dyn Any> = ext.clone();
            any.downcast::<E>().ok()
        })
    }

    /// Returns `true` if the object carries an extension of type `E`.
    #[must_use]
    pub fn has_extension<E: DocumentObjectExtension>(&self, id: ObjectId) -> bool {
        self.data(id).is_some_and(|d| {
            d.extensions
                .iter()
                .any(|ext| (&**ext as &dyn Any).is::<E>())
        })
    }

    // --- lifecycle ---

    /// Returns a name not used in `doc`, derived from `base`.
    pub fn unique_name(&self, doc: DocumentId, base: &str) -> Result<String, DocumentError> {
        let document = self.document(doc)?;
        Ok(naming::make_unique(&naming::sanitize(base), |n| {
            document.by_name.contains_key(n)
        }))
    }

    fn alloc_slot(&mut self) -> ObjectId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            ObjectId::new(idx, slot.generation)
        } else {
            #[expect(clippy::cast_possible_truncation, reason = "slot count fits in u32")]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                object: None,
            });
            ObjectId::new(idx, 1)
        }
    }

    /// Attaches a new object to `doc` and returns its handle.
    ///
    /// The object is named from `proposed_name` (made unique within the
    /// document, or derived from the type name if empty), receives the core
    /// properties plus those of the spec, registers back-links for its initial
    /// link values and then runs its extensions' `setup` hooks. A failing hook
    /// removes the object again and returns the error.
    pub fn add_object(
        &mut self,
        doc: DocumentId,
        spec: ObjectSpec,
        proposed_name: &str,
    ) -> Result<ObjectId, DocumentError> {
        let base = if proposed_name.is_empty() {
            spec.type_name
        } else {
            proposed_name
        };
        let name = self.unique_name(doc, base)?;
        let restoring = self.document(doc)?.restoring;

        let mut values = Vec::with_capacity(spec.properties.len() + 2);
        for core in [self.core.expression_engine.id(), self.core.visibility.id()] {
            if !spec.has_property(core) {
                values.push((core, None));
            }
        }
        values.extend(spec.properties);

        let mut initial = Vec::with_capacity(values.len());
        let mut targets = Vec::new();
        for (pid, value) in values {
            let reg = self
                .registry
                .get(pid)
                .ok_or(DocumentError::UnregisteredProperty(pid))?;
            let value = match value {
                Some(value) if value.type_id() != reg.type_id() => {
                    return Err(DocumentError::PropertyType {
                        property: reg.name(),
                        expected: reg.type_name(),
                    });
                }
                Some(value) => reg.coerce(value),
                None => reg.default_value(),
            };
            reg.collect_links(&value, &mut targets);
            initial.push((pid, value, reg.default_status()));
        }

        let id = self.alloc_slot();
        let mut properties = PropertyStore::new(id);
        for (pid, value, status) in initial {
            properties.insert(pid, value, status);
        }
        let mut status = ObjectStatus::TOUCHED;
        if restoring {
            status.insert(ObjectStatus::RESTORING);
        }
        let label = spec.label.unwrap_or_else(|| name.clone());
        self.slots[id.idx()].object = Some(ObjectData {
            type_name: spec.type_name,
            name: name.clone(),
            label,
            document: doc,
            status,
            properties,
            in_list: SmallVec::new(),
            out_list: RefCell::new(OutListCache::default()),
            extensions: spec.extensions,
        });
        self.live += 1;
        let document = self.document_mut(doc)?;
        document.objects.push(id);
        document.by_name.insert(name, id);

        for target in targets {
            self.add_back_link(target, id);
        }

        tracing::debug!(
            object = self.name(id).unwrap_or_default(),
            type_name = spec.type_name,
            "added object"
        );

        for ext in self.extensions_of(id) {
            if let Err(err) = ext.setup(self, id) {
                tracing::warn!(%err, "extension setup failed, removing object");
                self.remove_object(id)?;
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Removes an object from its document.
    ///
    /// The object is marked deleting, its extensions' `unsetup` hooks run
    /// (a failing hook is logged and removal continues), every reference other
    /// objects hold to it is broken through their link properties, its own
    /// back-links are dropped, and finally its name is released and its handle
    /// goes stale. Removing an object that is already being removed is a no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), DocumentError> {
        let data = self.attached_mut(id)?;
        if data.status.contains(ObjectStatus::DELETING) {
            return Ok(());
        }
        data.status.insert(ObjectStatus::DELETING);

        for ext in self.extensions_of(id) {
            if let Err(err) = ext.unsetup(self, id) {
                tracing::warn!(%err, "extension unsetup failed");
            }
        }

        let mut referrers: Vec<ObjectId> = self.in_list(id);
        referrers.sort_unstable();
        referrers.dedup();
        for referrer in referrers {
            if referrer != id {
                self.break_links_to(referrer, id)?;
            }
        }

        for target in self.all_link_targets(id) {
            self.remove_back_link(target, id);
        }

        let Some(data) = self.slots[id.idx()].object.take() else {
            return Ok(());
        };
        self.free.push(id.slot());
        self.live -= 1;
        if let Ok(document) = self.document_mut(data.document) {
            document.by_name.remove(&data.name);
            document.objects.retain(|o| *o != id);
        }
        tracing::debug!(object = %data.name, "removed object");
        Ok(())
    }

    /// Every object referenced by `id` through any link or expression
    /// property, one entry per reference.
    pub(crate) fn all_link_targets(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        if let Some(data) = self.data(id) {
            for (pid, value, _) in data.properties.iter() {
                if let Some(reg) = self.registry.get(pid) {
                    reg.collect_links(value, &mut out);
                }
            }
        }
        out
    }

    /// Drops every reference `referrer` holds to `target`, notifying as for
    /// any other write.
    fn break_links_to(&mut self, referrer: ObjectId, target: ObjectId) -> Result<(), DocumentError> {
        let Some(data) = self.data(referrer) else {
            return Ok(());
        };
        let mut rewrites: Vec<(PropertyId, ErasedValue)> = Vec::new();
        for (pid, value, _) in data.properties.iter() {
            let Some(reg) = self.registry.get(pid) else {
                continue;
            };
            let mut value = value.clone();
            if reg.break_link(&mut value, target) {
                rewrites.push((pid, value));
            }
        }
        for (pid, value) in rewrites {
            self.write_erased(referrer, pid, value)?;
        }
        Ok(())
    }

    // --- restore ---

    /// Starts restoring `doc`. Objects added until [`finish_restore`](Self::finish_restore)
    /// do not run change hooks.
    pub fn begin_restore(&mut self, doc: DocumentId) -> Result<(), DocumentError> {
        self.document_mut(doc)?.restoring = true;
        Ok(())
    }

    /// Finishes restoring `doc`: clears the restoring state of its objects and
    /// runs their `restored` hooks in insertion order.
    ///
    /// Restoring is best effort. A failing hook is logged and skipped so one
    /// bad object does not block the rest of the document.
    pub fn finish_restore(&mut self, doc: DocumentId) -> Result<(), DocumentError> {
        self.document_mut(doc)?.restoring = false;
        let objects = self.objects(doc).to_vec();
        for &id in &objects {
            self.set_status(id, ObjectStatus::RESTORING, false);
        }
        for id in objects {
            for ext in self.extensions_of(id) {
                if let Err(err) = ext.restored(self, id) {
                    tracing::warn!(
                        object = self.name(id).unwrap_or_default(),
                        %err,
                        "failed to finish restoring object"
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns `true` while `id`'s document is being restored.
    #[must_use]
    pub fn is_restoring(&self, id: ObjectId) -> bool {
        self.status(id).contains(ObjectStatus::RESTORING)
    }
}
