// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expression bindings as seen by the dependency graph.
//!
//! Expressions are evaluated elsewhere. Here an expression is only its text
//! and the objects it reads, which become extra out-list edges of the object
//! that holds it.

use std::collections::BTreeMap;

use linkage_property::LinkValue;

use crate::id::ObjectId;

/// One bound expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    /// Source text.
    pub text: String,
    /// Objects the expression reads, in first-use order.
    pub dependencies: Vec<ObjectId>,
}

impl Expression {
    /// An expression with no dependencies yet.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dependencies: Vec::new(),
        }
    }

    /// Adds a dependency.
    #[must_use]
    pub fn depends_on(mut self, object: ObjectId) -> Self {
        self.dependencies.push(object);
        self
    }
}

/// Expressions bound to property paths of one object.
///
/// Bindings iterate in path order, so dependency extraction is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpressionMap {
    bindings: BTreeMap<String, Expression>,
}

impl ExpressionMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `expression` to `path`, returning the previous binding.
    pub fn bind(&mut self, path: impl Into<String>, expression: Expression) -> Option<Expression> {
        self.bindings.insert(path.into(), expression)
    }

    /// Removes the binding at `path`.
    pub fn unbind(&mut self, path: &str) -> Option<Expression> {
        self.bindings.remove(path)
    }

    /// Returns the binding at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Expression> {
        self.bindings.get(path)
    }

    /// Iterates over `(path, expression)` in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> + '_ {
        self.bindings.iter().map(|(path, e)| (path.as_str(), e))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Breaking a link unbinds every expression that reads the removed object.
impl LinkValue<ObjectId> for ExpressionMap {
    fn collect_links(&self, out: &mut Vec<ObjectId>) {
        for expression in self.bindings.values() {
            out.extend_from_slice(&expression.dependencies);
        }
    }

    fn break_link(&mut self, target: ObjectId) -> bool {
        let before = self.bindings.len();
        self.bindings
            .retain(|_, e| !e.dependencies.contains(&target));
        before != self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_in_path_order() {
        let a = ObjectId::new(0, 1);
        let b = ObjectId::new(1, 1);
        let mut map = ExpressionMap::new();
        map.bind("Width", Expression::new("B.Length * 2").depends_on(b));
        map.bind("Height", Expression::new("A.Length").depends_on(a));
        let mut out = Vec::new();
        map.collect_links(&mut out);
        assert_eq!(out, [a, b]);
    }

    #[test]
    fn breaking_unbinds_readers() {
        let a = ObjectId::new(0, 1);
        let mut map = ExpressionMap::new();
        map.bind("Height", Expression::new("A.Length").depends_on(a));
        map.bind("Angle", Expression::new("45"));
        assert!(map.break_link(a));
        assert_eq!(map.len(), 1);
        assert!(map.get("Angle").is_some());
        assert!(!map.break_link(a));
    }
}
