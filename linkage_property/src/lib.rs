// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linkage Property: typed, status-flagged object properties.
//!
//! This crate is the property capability underneath `linkage_document`. It
//! knows nothing about documents or objects beyond an opaque key type `K`
//! that link values point at.
//!
//! ## Core Concepts
//!
//! - [`PropertyRegistry`] registers each property once with a value type,
//!   [`PropertyMetadata`] and a [`PropertyKind`]. Link and expression kinds
//!   carry type-erased operations to list and break the references a value
//!   holds.
//! - [`PropertyStore`] holds the values one object carries, each with its
//!   [`PropertyStatus`] bits.
//! - [`LinkValue`] is implemented by the link value types: `Option<K>`
//!   (single link), `Vec<K>` (link list) and [`LinkSub<K>`] (link plus
//!   sub-object path).
//! - [`Placement`] is the rigid transform composed along sub-object paths.
//!
//! ## Quick Start
//!
//! ```rust
//! use linkage_property::{
//!     ErasedValue, LinkOptions, PropertyMetadataBuilder, PropertyRegistry, PropertyStatus,
//!     PropertyStore,
//! };
//!
//! let mut registry = PropertyRegistry::<u32>::new();
//! let base = registry.register_link(
//!     "Base",
//!     PropertyMetadataBuilder::new(None::<u32>).build(),
//!     LinkOptions::LOCAL,
//! );
//!
//! let mut store = PropertyStore::new(1_u32);
//! store.insert(base.id(), ErasedValue::new(Some(2_u32)), PropertyStatus::empty());
//!
//! // Walk every link property of the object without knowing its value type.
//! let mut out = Vec::new();
//! for (id, value, _) in store.iter() {
//!     registry.get(id).unwrap().collect_links(value, &mut out);
//! }
//! assert_eq!(out, [2]);
//! ```
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod id;
mod link;
mod metadata;
mod placement;
mod registry;
mod status;
mod store;
mod value;

pub use id::{Property, PropertyId};
pub use link::{LinkOptions, LinkSub, LinkValue};
pub use metadata::{CoerceValueCallback, PropertyMetadata, PropertyMetadataBuilder};
pub use placement::{Placement, scale_matrix};
pub use registry::{PropertyKind, PropertyRegistration, PropertyRegistry};
pub use status::PropertyStatus;
pub use store::PropertyStore;
pub use value::{ErasedValue, PropertyValue};
