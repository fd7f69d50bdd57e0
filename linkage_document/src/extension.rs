// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pluggable object behavior.
//!
//! An object carries an ordered list of [`DocumentObjectExtension`]s. Every
//! hook is offered to each extension in attachment order before the
//! [`Workspace`] falls back to its default behavior. Query hooks return `None`
//! to pass; the first `Some` answer wins.
//!
//! Hooks receive the workspace and the owning object's id rather than a
//! reference to the object, so an extension may freely query or mutate the
//! graph, including creating and removing other objects. The workspace clones
//! the extension list before dispatching, so an extension being removed while
//! one of its hooks runs stays alive until the hook returns.

use std::any::Any;
use std::fmt;

use glam::DMat4;
use linkage_property::PropertyId;

use crate::config::LinkDepth;
use crate::error::{DocumentError, ExecResult};
use crate::id::ObjectId;
use crate::workspace::Workspace;

/// Result of a sub-object or linked-object lookup. `Ok(None)` is a miss.
pub type Lookup = Result<Option<ObjectId>, DocumentError>;

/// Behavior attached to an object.
///
/// All methods have pass-through defaults.
#[expect(unused_variables, reason = "default hook bodies ignore their arguments")]
pub trait DocumentObjectExtension: Any + fmt::Debug {
    /// Runs after the owner is attached and named.
    fn setup(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        Ok(())
    }

    /// Runs when the owner is about to be removed, while it is still attached.
    fn unsetup(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        Ok(())
    }

    /// Runs when the owner's document finishes restoring.
    fn restored(&self, ws: &mut Workspace, owner: ObjectId) -> Result<(), DocumentError> {
        Ok(())
    }

    /// Runs after a property of the owner changed.
    fn changed(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        property: PropertyId,
    ) -> Result<(), DocumentError> {
        Ok(())
    }

    /// Executes the extension's part of a recompute. A failure stops the
    /// remaining extensions.
    fn execute(&self, ws: &mut Workspace, owner: ObjectId) -> ExecResult {
        Ok(())
    }

    /// Demands a recompute even when the owner is not touched.
    fn must_execute(&self, ws: &Workspace, owner: ObjectId) -> bool {
        false
    }

    /// Resolves `subname` relative to the owner.
    ///
    /// `mat`, when present, accumulates the transform of the path;
    /// `transform` says whether the owner's own placement applies.
    fn sub_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        subname: &str,
        mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        None
    }

    /// Resolves the object the owner stands in for.
    fn linked_object(
        &self,
        ws: &Workspace,
        owner: ObjectId,
        recurse: bool,
        mat: Option<&mut DMat4>,
        transform: bool,
        depth: LinkDepth,
    ) -> Option<Lookup> {
        None
    }

    /// Lists the owner's child paths, each ending in `.`.
    fn sub_objects(&self, ws: &Workspace, owner: ObjectId) -> Option<Vec<String>> {
        None
    }

    /// Reports whether the owner has child elements at all.
    fn has_child_element(&self, ws: &Workspace, owner: ObjectId) -> Option<bool> {
        None
    }

    /// Reports the visibility of a child element.
    fn is_element_visible(&self, ws: &Workspace, owner: ObjectId, element: &str) -> Option<bool> {
        None
    }

    /// Changes the visibility of a child element.
    fn set_element_visible(
        &self,
        ws: &mut Workspace,
        owner: ObjectId,
        element: &str,
        visible: bool,
    ) -> Option<Result<(), DocumentError>> {
        None
    }
}
