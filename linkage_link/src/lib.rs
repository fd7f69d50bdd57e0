// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linkage Link: objects that stand in for other objects.
//!
//! A link object carries a [`LinkExtension`] that forwards sub-object and
//! linked-object queries to a target, optionally through a sub-object path
//! inside it, with the link's own placement and scale composed in front. With
//! a non-zero `ElementCount` the link becomes an array of slots, held either
//! as parallel placement, scale and visibility lists (collapsed) or as one
//! [`LinkElement`] child object per slot (expanded).
//!
//! ## Core Concepts
//!
//! - **Bindings**: [`LinkBindings`] names the property playing each
//!   [`LinkRole`]. [`LinkProperties`] registers a standard set and builds link
//!   object specs bound to it.
//! - **Synchronization**: every change to a bound property is dispatched by
//!   role. Writes made by the protocol itself carry the [`MIRRORING`] status
//!   bit so the resulting notification is not synchronized again.
//! - **Write path**: [`set_link`] validates a target and path before storing
//!   it, and never stores an array element as a target.
//!
//! ## Quick Start
//!
//! ```rust
//! use glam::{DMat4, DVec3};
//! use linkage_document::{ObjectSpec, Workspace};
//! use linkage_link::{LinkProperties, set_link};
//!
//! let mut ws = Workspace::new();
//! let props = LinkProperties::install(&mut ws).unwrap();
//! let doc = ws.new_document("Assembly");
//! let bolt = ws.add_object(doc, ObjectSpec::new("Bolt"), "Bolt").unwrap();
//! let array = ws.add_object(doc, props.link_spec(), "Bolts").unwrap();
//! set_link(&mut ws, array, bolt, "", Vec::new()).unwrap();
//!
//! // Three expanded slots, offset along X by default.
//! ws.set_property(array, props.element_count, 3).unwrap();
//! let elements = ws.property(array, props.element_list).unwrap().clone();
//! assert_eq!(elements.len(), 3);
//!
//! let mut mat = DMat4::IDENTITY;
//! let found = ws
//!     .get_sub_object_with(array, "2.", Some(&mut mat), true, ws.link_depth())
//!     .unwrap();
//! assert_eq!(found, Some(elements[2]));
//! assert_eq!(mat.transform_point3(DVec3::ZERO), DVec3::new(2.0, 0.0, 0.0));
//!
//! // Collapsing keeps the slot placements in the list.
//! ws.set_property(array, props.show_element, false).unwrap();
//! assert!(ws.property(array, props.element_list).unwrap().is_empty());
//! assert_eq!(ws.property(array, props.placement_list).unwrap().len(), 3);
//! assert!(!ws.is_attached(elements[0]));
//! ```

mod bindings;
mod element;
mod extension;
mod properties;
mod sync;
mod write;

pub use bindings::{LinkBindings, LinkRole, LinkedObjectProperty};
pub use element::LinkElement;
pub use extension::{LinkExtension, MIRRORING};
pub use properties::{ElementProperties, LinkProperties};
pub use write::{clear_link, set_link};
