// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use linkage_property::PropertyId;
use thiserror::Error;

use crate::id::{DocumentId, ObjectId};

/// Errors raised by graph queries and mutating operations.
///
/// Two families matter to callers:
///
/// - [`is_cyclic`](Self::is_cyclic): the graph is currently unsound. Raised by
///   the bounded recursive closures and by sub-object resolution when the link
///   depth limit is hit. Always logged where it is raised.
/// - [`is_configuration`](Self::is_configuration): a mutating call was given
///   bad arguments. Raised before anything is changed, so the call can be
///   retried with corrected input.
///
/// Resolution misses are not errors; they are `Ok(None)`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// A node reappeared on the active path, or the depth bound ran out.
    #[error("cyclic dependency detected at {object}")]
    CyclicDependency {
        /// The object at which the walk stopped.
        object: ObjectId,
    },
    /// Recursive link resolution went deeper than the configured limit.
    #[error("link recursion limit of {limit} reached, check for cyclic references")]
    LinkDepthExceeded {
        /// The limit in force for the call.
        limit: usize,
    },
    /// The handle does not name an attached object.
    #[error("{0} is not attached to a document")]
    NotAttached(ObjectId),
    /// The handle does not name an open document.
    #[error("{0} is not open")]
    NoSuchDocument(DocumentId),
    /// The property ID was never registered.
    #[error("property {0} is not registered")]
    UnregisteredProperty(PropertyId),
    /// The object does not carry the property.
    #[error("{object} has no property `{property}`")]
    MissingProperty {
        /// Object that was queried.
        object: ObjectId,
        /// Property name.
        property: &'static str,
    },
    /// The object already carries the property.
    #[error("{object} already has property `{property}`")]
    DuplicateProperty {
        /// Object that was modified.
        object: ObjectId,
        /// Property name.
        property: &'static str,
    },
    /// A value or binding has the wrong type for the property.
    #[error("property `{property}` holds {expected}")]
    PropertyType {
        /// Property name.
        property: &'static str,
        /// The type the property holds.
        expected: &'static str,
    },
    /// The property is marked immutable.
    #[error("property `{property}` of {object} is immutable")]
    ImmutableProperty {
        /// Object that was modified.
        object: ObjectId,
        /// Property name.
        property: &'static str,
    },
    /// A role the operation needs has no property configured.
    #[error("no {role} property configured")]
    Unconfigured {
        /// The missing role.
        role: &'static str,
    },
    /// An index addressed past the end of a list.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// List length.
        len: usize,
    },
    /// An array element whose owner is gone was used as a link target.
    #[error("orphan link element {0}")]
    OrphanElement(ObjectId),
    /// A same-document link was pointed into another document.
    #[error("{object} cannot link to {target} in another document without an external link property")]
    ExternalLink {
        /// The linking object.
        object: ObjectId,
        /// The requested target.
        target: ObjectId,
    },
    /// A sub-object path did not resolve.
    #[error("cannot find sub-object `{subname}` of {object}")]
    SubObjectNotFound {
        /// Object the path is relative to.
        object: ObjectId,
        /// The path that failed.
        subname: String,
    },
}

impl DocumentError {
    /// Returns `true` for faults that mean the graph is currently unsound.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        matches!(
            self,
            Self::CyclicDependency { .. } | Self::LinkDepthExceeded { .. }
        )
    }

    /// Returns `true` for argument validation faults.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !self.is_cyclic()
    }
}

/// Failure outcome of executing an object.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{object}: {message}")]
pub struct ExecFailure {
    /// The object that failed.
    pub object: ObjectId,
    /// Human readable reason.
    pub message: String,
}

impl ExecFailure {
    /// Creates a failure for `object`.
    #[must_use]
    pub fn new(object: ObjectId, message: impl Into<String>) -> Self {
        Self {
            object,
            message: message.into(),
        }
    }
}

/// Outcome of executing an object. `Ok(())` is the standard success.
pub type ExecResult = Result<(), ExecFailure>;

/// Errors from loading a [`WorkspaceConfig`](crate::WorkspaceConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text did not parse or did not match the schema.
    #[error("invalid workspace configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
