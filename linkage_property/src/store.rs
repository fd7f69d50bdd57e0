// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object sparse property storage.
//!
//! [`PropertyStore`] keeps the properties an object actually carries, each with
//! its value and [`PropertyStatus`]. Entries live in a `SmallVec` sorted by
//! [`PropertyId`] and are found by binary search; typical objects carry few
//! enough properties to stay inline.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::id::{Property, PropertyId};
use crate::status::PropertyStatus;
use crate::value::ErasedValue;

const INLINE_CAPACITY: usize = 8;

#[derive(Clone, Debug)]
struct Entry {
    value: ErasedValue,
    status: PropertyStatus,
}

/// Sparse storage for the properties of one object.
///
/// Unlike a registry default, a property is only readable once it has been
/// [`insert`](Self::insert)ed; objects differ in which properties they carry.
///
/// # Example
///
/// ```rust
/// use linkage_property::{PropertyMetadataBuilder, PropertyRegistry, PropertyStatus, PropertyStore};
///
/// let mut registry = PropertyRegistry::<u32>::new();
/// let count = registry.register("ElementCount", PropertyMetadataBuilder::new(0_i64).build());
///
/// let mut store = PropertyStore::new(1_u32);
/// assert!(store.get(count).is_none());
///
/// store.insert(count.id(), registry.get(count.id()).unwrap().default_value(), PropertyStatus::empty());
/// assert_eq!(store.get(count), Some(&0));
///
/// let old = store.replace(count.id(), linkage_property::ErasedValue::new(3_i64));
/// assert_eq!(old.and_then(|v| v.downcast::<i64>().ok()), Some(0));
/// assert_eq!(store.get(count), Some(&3));
/// ```
#[derive(Clone, Debug)]
pub struct PropertyStore<K> {
    entries: SmallVec<[(PropertyId, Entry); INLINE_CAPACITY]>,
    owner: K,
}

impl<K: Copy> PropertyStore<K> {
    /// Creates an empty store for `owner`.
    #[must_use]
    pub fn new(owner: K) -> Self {
        Self {
            entries: SmallVec::new(),
            owner,
        }
    }

    /// Returns the owner key.
    #[must_use]
    #[inline]
    pub fn owner(&self) -> K {
        self.owner
    }

    /// Returns `true` if no property is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of properties present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn find(&self, id: PropertyId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |(pid, _)| *pid)
    }

    /// Returns `true` if the property is present.
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.find(id).is_ok()
    }

    /// Property IDs in ascending order.
    pub fn property_ids(&self) -> impl Iterator<Item = PropertyId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Iterates over `(id, value, status)` in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &ErasedValue, PropertyStatus)> + '_ {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, &entry.value, entry.status))
    }

    /// Adds a property, or replaces its value and status if already present.
    ///
    /// Returns the previous value.
    pub fn insert(
        &mut self,
        id: PropertyId,
        value: ErasedValue,
        status: PropertyStatus,
    ) -> Option<ErasedValue> {
        match self.find(id) {
            Ok(i) => {
                let entry = &mut self.entries[i].1;
                entry.status = status;
                Some(core::mem::replace(&mut entry.value, value))
            }
            Err(i) => {
                self.entries.insert(i, (id, Entry { value, status }));
                None
            }
        }
    }

    /// Removes a property, returning its value.
    pub fn remove(&mut self, id: PropertyId) -> Option<ErasedValue> {
        let i = self.find(id).ok()?;
        Some(self.entries.remove(i).1.value)
    }

    /// Replaces the value of a present property, keeping its status.
    ///
    /// Returns the previous value, or `None` (storing nothing) if the
    /// property is absent.
    pub fn replace(&mut self, id: PropertyId, value: ErasedValue) -> Option<ErasedValue> {
        let i = self.find(id).ok()?;
        Some(core::mem::replace(&mut self.entries[i].1.value, value))
    }

    /// Borrows a typed value.
    #[must_use]
    pub fn get<T: 'static>(&self, property: Property<T>) -> Option<&T> {
        self.get_erased(property.id())?.downcast_ref()
    }

    /// Borrows an erased value.
    #[must_use]
    pub fn get_erased(&self, id: PropertyId) -> Option<&ErasedValue> {
        let i = self.find(id).ok()?;
        Some(&self.entries[i].1.value)
    }

    /// Returns the status bits of a property.
    #[must_use]
    pub fn status(&self, id: PropertyId) -> Option<PropertyStatus> {
        let i = self.find(id).ok()?;
        Some(self.entries[i].1.status)
    }

    /// Sets or clears status bits. Returns `false` if the property is absent.
    pub fn set_status(&mut self, id: PropertyId, bits: PropertyStatus, on: bool) -> bool {
        match self.find(id) {
            Ok(i) => {
                self.entries[i].1.status.set(bits, on);
                true
            }
            Err(_) => false,
        }
    }

    /// Clears `bits` on every property.
    pub fn clear_status_all(&mut self, bits: PropertyStatus) {
        for (_, entry) in &mut self.entries {
            entry.status.remove(bits);
        }
    }

    /// Returns the IDs of properties whose status contains all of `bits`.
    #[must_use]
    pub fn with_status(&self, bits: PropertyStatus) -> Vec<PropertyId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.status.contains(bits))
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn typed<T>(index: u16) -> Property<T> {
        Property::from_id(PropertyId::new(index))
    }

    #[test]
    fn entries_stay_sorted() {
        let mut store = PropertyStore::new(0_u32);
        for index in [5_u16, 1, 3] {
            store.insert(
                PropertyId::new(index),
                ErasedValue::new(index),
                PropertyStatus::empty(),
            );
        }
        let ids: Vec<_> = store.property_ids().map(PropertyId::index).collect();
        assert_eq!(ids, [1, 3, 5]);
        assert_eq!(store.get(typed::<u16>(3)), Some(&3));
        assert_eq!(store.get(typed::<u32>(3)), None);
    }

    #[test]
    fn replace_requires_presence() {
        let mut store = PropertyStore::new(0_u32);
        assert!(store.replace(PropertyId::new(0), ErasedValue::new(1_u8)).is_none());
        assert!(store.is_empty());
        store.insert(PropertyId::new(0), ErasedValue::new(1_u8), PropertyStatus::HIDDEN);
        let old = store.replace(PropertyId::new(0), ErasedValue::new(2_u8));
        assert_eq!(old, Some(ErasedValue::new(1_u8)));
        assert_eq!(store.status(PropertyId::new(0)), Some(PropertyStatus::HIDDEN));
    }

    #[test]
    fn status_bits() {
        let mut store = PropertyStore::new(0_u32);
        let id = PropertyId::new(2);
        assert!(!store.set_status(id, PropertyStatus::TOUCHED, true));
        store.insert(id, ErasedValue::new(vec![1_u32]), PropertyStatus::empty());
        assert!(store.set_status(id, PropertyStatus::TOUCHED | PropertyStatus::USER3, true));
        assert_eq!(store.with_status(PropertyStatus::TOUCHED), [id]);
        store.set_status(id, PropertyStatus::USER3, false);
        assert_eq!(store.status(id), Some(PropertyStatus::TOUCHED));
        store.clear_status_all(PropertyStatus::TOUCHED);
        assert!(store.with_status(PropertyStatus::TOUCHED).is_empty());
    }

    #[test]
    fn remove_returns_value() {
        let mut store = PropertyStore::new(7_u32);
        store.insert(PropertyId::new(1), ErasedValue::new(true), PropertyStatus::empty());
        assert_eq!(store.owner(), 7);
        assert_eq!(store.remove(PropertyId::new(1)), Some(ErasedValue::new(true)));
        assert_eq!(store.remove(PropertyId::new(1)), None);
        assert_eq!(store.len(), 0);
    }
}
