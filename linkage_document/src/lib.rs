// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linkage Document: the object graph of a set of documents.
//!
//! Objects live in documents inside a [`Workspace`] and reference each other
//! through link properties registered in the workspace's property registry.
//! The workspace derives the dependency graph from those properties and keeps
//! it consistent under every write.
//!
//! ## Core Concepts
//!
//! - **Out-list**: the objects an object references, in property order with
//!   expression dependencies last. Deduplicated and cached by default;
//!   filtered queries take [`OutListOptions`].
//! - **In-list**: the multiset of objects referencing an object, one entry per
//!   reference, maintained incrementally by the property write path.
//! - **Traversal**: cycle-checked recursive closures that raise
//!   [`DocumentError::CyclicDependency`], and a fixed-point in-list sweep that
//!   tolerates cycles.
//! - **Subnames**: dot-separated paths such as `"Body.Pad.Face3"` resolved
//!   through out-lists, with transform accumulation and [`ResolvedPath`]
//!   decomposition.
//! - **Extensions**: [`DocumentObjectExtension`] hooks offered in order before
//!   the default behavior; link objects are built on them.
//! - **Recompute**: touched state, [`Workspace::dependency_order`] and
//!   [`Workspace::recompute`].
//!
//! Recursive queries take a [`LinkDepth`] budget derived once per call from
//! the [`WorkspaceConfig`] and the live object count.
//!
//! ## Quick Start
//!
//! ```rust
//! use linkage_document::{ObjectSpec, Workspace};
//! use linkage_property::{LinkOptions, PropertyMetadataBuilder};
//!
//! let mut ws = Workspace::new();
//! let inputs = ws.registry_mut().register_link(
//!     "Inputs",
//!     PropertyMetadataBuilder::new(Vec::new()).build(),
//!     LinkOptions::LOCAL,
//! );
//!
//! let doc = ws.new_document("Part");
//! let a = ws.add_object(doc, ObjectSpec::new("Feature"), "A").unwrap();
//! let b = ws
//!     .add_object(doc, ObjectSpec::new("Feature").property_value(inputs, vec![a]), "B")
//!     .unwrap();
//! let c = ws
//!     .add_object(doc, ObjectSpec::new("Feature").property_value(inputs, vec![b]), "C")
//!     .unwrap();
//!
//! assert_eq!(ws.out_list_recursive(c).unwrap(), [b, a]);
//! assert_eq!(ws.in_list_recursive(a), [b, c]);
//! assert_eq!(ws.get_sub_object(c, "B.A.").unwrap(), Some(a));
//!
//! // Closing the loop makes the checked closure fail...
//! ws.add_property(a, inputs, vec![c]).unwrap();
//! assert!(ws.out_list_recursive(c).unwrap_err().is_cyclic());
//! // ...while the sweep still answers.
//! assert_eq!(ws.in_list_recursive(a), [a, b, c]);
//! ```

mod config;
mod error;
mod expression;
mod extension;
mod id;
mod in_list;
mod naming;
mod object;
mod out_list;
mod properties;
mod recompute;
mod subname;
mod traverse;
mod workspace;

pub use config::{DEFAULT_LINK_DEPTH_SLACK, LinkDepth, WorkspaceConfig};
pub use error::{ConfigError, DocumentError, ExecFailure, ExecResult};
pub use expression::{Expression, ExpressionMap};
pub use extension::{DocumentObjectExtension, Lookup};
pub use id::{DocumentId, ObjectId};
pub use object::{ObjectSpec, ObjectStatus};
pub use out_list::OutListOptions;
pub use recompute::RecomputeReport;
pub use subname::{
    ELEMENT_MAP_PREFIX, HIDDEN_MARKER, ResolvedPath, has_hidden_marker, is_mapped_element,
};
pub use workspace::{CoreProperties, Workspace};
