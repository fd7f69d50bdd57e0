// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Workspace configuration and the link depth budget.

use serde::Deserialize;

use crate::error::{ConfigError, DocumentError};

/// Default number of hops allowed beyond the live object count.
pub const DEFAULT_LINK_DEPTH_SLACK: usize = 2;

/// Tunables for a [`Workspace`](crate::Workspace).
///
/// The link depth limit bounds every recursive walk: sub-object resolution,
/// linked-object chains and the cycle-checked closures. An acyclic path can
/// never be longer than the number of live objects, so the limit is that count
/// plus a small slack, optionally capped.
///
/// ```rust
/// use linkage_document::WorkspaceConfig;
///
/// let config = WorkspaceConfig::from_toml_str("link_depth_slack = 4\nmax_link_depth = 10").unwrap();
/// assert_eq!(config.link_depth_limit(3), 7);
/// assert_eq!(config.link_depth_limit(30), 10);
/// assert_eq!(WorkspaceConfig::default().link_depth_limit(3), 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Hops allowed beyond the live object count.
    pub link_depth_slack: usize,
    /// Hard upper bound on the limit, if any.
    pub max_link_depth: Option<usize>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            link_depth_slack: DEFAULT_LINK_DEPTH_SLACK,
            max_link_depth: None,
        }
    }
}

impl WorkspaceConfig {
    /// Parses a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Sets the slack added to the live object count.
    #[must_use]
    pub fn with_link_depth_slack(mut self, slack: usize) -> Self {
        self.link_depth_slack = slack;
        self
    }

    /// Caps the link depth limit.
    #[must_use]
    pub fn with_max_link_depth(mut self, max: usize) -> Self {
        self.max_link_depth = Some(max);
        self
    }

    /// Returns the depth limit for a workspace holding `object_count` objects.
    #[must_use]
    pub fn link_depth_limit(&self, object_count: usize) -> usize {
        let limit = object_count.saturating_add(self.link_depth_slack);
        self.max_link_depth.map_or(limit, |max| limit.min(max))
    }
}

/// The depth budget threaded through one recursive resolution.
///
/// The limit is read once, when the outermost call starts, and every hop
/// derives the next budget with [`next`](Self::next).
///
/// ```rust
/// use linkage_document::LinkDepth;
///
/// let depth = LinkDepth::new(1);
/// let depth = depth.next().unwrap();
/// assert_eq!(depth.depth(), 1);
/// assert!(depth.next().unwrap_err().is_cyclic());
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkDepth {
    depth: usize,
    limit: usize,
}

impl LinkDepth {
    /// A fresh budget with the given limit.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { depth: 0, limit }
    }

    /// Hops taken so far.
    #[must_use]
    pub const fn depth(self) -> usize {
        self.depth
    }

    /// The limit in force.
    #[must_use]
    pub const fn limit(self) -> usize {
        self.limit
    }

    /// The budget one hop deeper, or the depth fault if the limit is exceeded.
    pub fn next(self) -> Result<Self, DocumentError> {
        self.try_next().ok_or_else(|| {
            tracing::error!(limit = self.limit, "link recursion limit reached");
            DocumentError::LinkDepthExceeded { limit: self.limit }
        })
    }

    /// The budget one hop deeper, or `None` if the limit is exceeded.
    #[must_use]
    pub fn try_next(self) -> Option<Self> {
        let depth = self.depth + 1;
        (depth <= self.limit).then_some(Self {
            depth,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            WorkspaceConfig::from_toml_str("").unwrap(),
            WorkspaceConfig::default()
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = WorkspaceConfig::from_toml_str("depth = 3").unwrap_err();
        assert!(err.to_string().contains("invalid workspace configuration"), "{err}");
    }

    #[test]
    fn builder_setters() {
        let config = WorkspaceConfig::default()
            .with_link_depth_slack(0)
            .with_max_link_depth(4);
        assert_eq!(config.link_depth_limit(2), 2);
        assert_eq!(config.link_depth_limit(9), 4);
    }

    #[test]
    fn depth_counts_hops() {
        let mut depth = LinkDepth::new(3);
        for expected in 1..=3 {
            depth = depth.next().unwrap();
            assert_eq!(depth.depth(), expected);
        }
        assert_eq!(
            depth.next(),
            Err(DocumentError::LinkDepthExceeded { limit: 3 })
        );
    }
}
