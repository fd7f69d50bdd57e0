// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property access and the write path.
//!
//! Every write goes through one routine that coerces the value, swaps it into
//! the store, moves back-links from the old targets to the new ones, clears
//! the out-list cache for reference-holding properties, touches the property
//! and the object, and finally offers the change to the object's extensions.

use linkage_property::{ErasedValue, Property, PropertyId, PropertyStatus, PropertyValue};

use crate::error::DocumentError;
use crate::expression::Expression;
use crate::id::ObjectId;
use crate::object::ObjectStatus;
use crate::workspace::Workspace;

impl Workspace {
    pub(crate) fn property_name(&self, property: PropertyId) -> &'static str {
        self.registry.name(property).unwrap_or("<unregistered>")
    }

    /// Borrows a typed property value. `None` if the object is detached or
    /// does not carry the property.
    #[must_use]
    pub fn property<T: 'static>(&self, id: ObjectId, property: Property<T>) -> Option<&T> {
        self.data(id)?.properties.get(property)
    }

    /// Borrows an erased property value.
    #[must_use]
    pub fn property_erased(&self, id: ObjectId, property: PropertyId) -> Option<&ErasedValue> {
        self.data(id)?.properties.get_erased(property)
    }

    /// Returns `true` if the object carries the property.
    #[must_use]
    pub fn has_property(&self, id: ObjectId, property: PropertyId) -> bool {
        self.data(id)
            .is_some_and(|d| d.properties.contains(property))
    }

    /// The object's property IDs in ascending order.
    #[must_use]
    pub fn property_ids(&self, id: ObjectId) -> Vec<PropertyId> {
        self.data(id)
            .map(|d| d.properties.property_ids().collect())
            .unwrap_or_default()
    }

    /// Returns the status bits of one of the object's properties.
    #[must_use]
    pub fn property_status(&self, id: ObjectId, property: PropertyId) -> Option<PropertyStatus> {
        self.data(id)?.properties.status(property)
    }

    /// Sets or clears status bits on a property.
    pub fn set_property_status(
        &mut self,
        id: ObjectId,
        property: PropertyId,
        bits: PropertyStatus,
        on: bool,
    ) -> Result<(), DocumentError> {
        let name = self.property_name(property);
        if self
            .attached_mut(id)?
            .properties
            .set_status(property, bits, on)
        {
            Ok(())
        } else {
            Err(DocumentError::MissingProperty {
                object: id,
                property: name,
            })
        }
    }

    /// Runs `f` with `bits` set on the property, then restores those bits to
    /// their previous state whatever `f` returned.
    ///
    /// This is the guard used around writes that are themselves caused by a
    /// change notification, so the nested notification can tell it is a
    /// mirror and skip re-mirroring.
    pub fn with_property_status<R>(
        &mut self,
        id: ObjectId,
        property: PropertyId,
        bits: PropertyStatus,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.data_mut(id).and_then(|data| {
            let previous = data.properties.status(property)? & bits;
            data.properties.set_status(property, bits, true);
            Some(previous)
        });
        let result = f(self);
        if let Some(previous) = previous
            && let Some(data) = self.data_mut(id)
        {
            data.properties.set_status(property, bits, false);
            data.properties.set_status(property, previous, true);
        }
        result
    }

    /// Assigns a property value on behalf of a caller outside the object.
    ///
    /// Fails without changing anything if the object is detached, does not
    /// carry the property, or the property is [`IMMUTABLE`](PropertyStatus::IMMUTABLE).
    pub fn set_property<T: PropertyValue>(
        &mut self,
        id: ObjectId,
        property: Property<T>,
        value: T,
    ) -> Result<(), DocumentError> {
        let status = self
            .attached(id)?
            .properties
            .status(property.id())
            .ok_or(DocumentError::MissingProperty {
                object: id,
                property: self.property_name(property.id()),
            })?;
        if status.contains(PropertyStatus::IMMUTABLE) {
            return Err(DocumentError::ImmutableProperty {
                object: id,
                property: self.property_name(property.id()),
            });
        }
        self.write_erased(id, property.id(), ErasedValue::new(value))
    }

    /// Assigns a property value from the object's own logic. Ignores
    /// [`IMMUTABLE`](PropertyStatus::IMMUTABLE).
    pub fn assign_property<T: PropertyValue>(
        &mut self,
        id: ObjectId,
        property: Property<T>,
        value: T,
    ) -> Result<(), DocumentError> {
        self.write_erased(id, property.id(), ErasedValue::new(value))
    }

    /// Edits a property value in place and assigns the result.
    pub fn update_property<T: PropertyValue>(
        &mut self,
        id: ObjectId,
        property: Property<T>,
        f: impl FnOnce(&mut T),
    ) -> Result<(), DocumentError> {
        let mut value = self
            .property(id, property)
            .cloned()
            .ok_or(DocumentError::MissingProperty {
                object: id,
                property: self.property_name(property.id()),
            })?;
        f(&mut value);
        self.write_erased(id, property.id(), ErasedValue::new(value))
    }

    /// Binds an expression on the object.
    pub fn set_expression(
        &mut self,
        id: ObjectId,
        path: &str,
        expression: Expression,
    ) -> Result<(), DocumentError> {
        let engine = self.core().expression_engine;
        self.update_property(id, engine, |map| {
            map.bind(path, expression);
        })
    }

    /// Adds a property to an existing object. Does not notify.
    pub fn add_property<T: PropertyValue>(
        &mut self,
        id: ObjectId,
        property: Property<T>,
        value: T,
    ) -> Result<(), DocumentError> {
        let pid = property.id();
        let reg = self
            .registry
            .get(pid)
            .ok_or(DocumentError::UnregisteredProperty(pid))?;
        let name = reg.name();
        let value = reg.coerce(ErasedValue::new(value));
        let status = reg.default_status();
        let mut targets = Vec::new();
        reg.collect_links(&value, &mut targets);
        let references = reg.kind().references_objects();

        let data = self.attached_mut(id)?;
        if data.properties.contains(pid) {
            return Err(DocumentError::DuplicateProperty {
                object: id,
                property: name,
            });
        }
        data.properties.insert(pid, value, status);
        if references {
            data.out_list.get_mut().clear();
        }
        for target in targets {
            self.add_back_link(target, id);
        }
        Ok(())
    }

    /// Removes a property from an object, dropping the back-links it
    /// contributed and clearing the out-list cache. Returns the old value.
    pub fn remove_property(
        &mut self,
        id: ObjectId,
        property: PropertyId,
    ) -> Result<Option<ErasedValue>, DocumentError> {
        let data = self.attached_mut(id)?;
        let Some(value) = data.properties.remove(property) else {
            return Ok(None);
        };
        data.out_list.get_mut().clear();
        let mut targets = Vec::new();
        if let Some(reg) = self.registry.get(property) {
            reg.collect_links(&value, &mut targets);
        }
        for target in targets {
            self.remove_back_link(target, id);
        }
        Ok(Some(value))
    }

    /// The single write routine behind every assignment.
    pub(crate) fn write_erased(
        &mut self,
        id: ObjectId,
        property: PropertyId,
        value: ErasedValue,
    ) -> Result<(), DocumentError> {
        let reg = self
            .registry
            .get(property)
            .ok_or(DocumentError::UnregisteredProperty(property))?;
        if value.type_id() != reg.type_id() {
            return Err(DocumentError::PropertyType {
                property: reg.name(),
                expected: reg.type_name(),
            });
        }
        let name = reg.name();
        let kind = reg.kind();
        let value = reg.coerce(value);
        let mut new_targets = Vec::new();
        reg.collect_links(&value, &mut new_targets);

        let data = self.attached_mut(id)?;
        let old = data
            .properties
            .replace(property, value)
            .ok_or(DocumentError::MissingProperty {
                object: id,
                property: name,
            })?;

        if kind.references_objects() {
            let mut old_targets = Vec::new();
            if let Some(reg) = self.registry.get(property) {
                reg.collect_links(&old, &mut old_targets);
            }
            for target in old_targets {
                self.remove_back_link(target, id);
            }
            for target in new_targets {
                self.add_back_link(target, id);
            }
        }
        self.property_changed(id, property)
    }

    /// Change bookkeeping and extension dispatch for a property that was just written.
    fn property_changed(&mut self, id: ObjectId, property: PropertyId) -> Result<(), DocumentError> {
        let references = self
            .registry
            .kind(property)
            .is_some_and(|k| k.references_objects());
        let data = self.attached_mut(id)?;
        if references {
            data.out_list.get_mut().clear();
        }
        let status = data.properties.status(property).unwrap_or_default();
        data.properties
            .set_status(property, PropertyStatus::TOUCHED, true);
        if !status.contains(PropertyStatus::OUTPUT) {
            data.status.insert(ObjectStatus::TOUCHED);
        }
        if data
            .status
            .intersects(ObjectStatus::RESTORING | ObjectStatus::DELETING)
        {
            return Ok(());
        }
        for ext in self.extensions_of(id) {
            ext.changed(self, id, property)?;
        }
        Ok(())
    }
}
