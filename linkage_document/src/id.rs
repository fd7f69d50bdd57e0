// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object and document handles.

use core::fmt;

/// Identifier for an object in a [`Workspace`](crate::Workspace).
///
/// A copyable handle made of a slot index and a generation counter. It stays
/// valid while the object is attached and becomes stale once the object is
/// removed.
///
/// - On insert, a fresh slot starts at generation `1`.
/// - On removal, the slot is freed; existing handles to it go stale.
/// - On reuse of a freed slot, its generation is incremented.
///
/// Stale handles never alias a different live object. Use
/// [`Workspace::is_attached`](crate::Workspace::is_attached) to test liveness.
///
/// The derived ordering (slot, then generation) is what callers sort by when
/// they need a deterministic order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32, u32);

impl ObjectId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn slot(self) -> u32 {
        self.0
    }

    /// Returns the slot generation.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object {}v{}", self.0, self.1)
    }
}

/// Identifier for a document in a [`Workspace`](crate::Workspace).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub(crate) u32);

impl DocumentId {
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {}", self.0)
    }
}
