// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transitive closures over out-lists and in-lists.
//!
//! Two families with different guarantees:
//!
//! - The checked walks ([`out_list_recursive`](Workspace::out_list_recursive),
//!   [`in_list_recursive_checked`](Workspace::in_list_recursive_checked) and the
//!   `is_in_*_recursive` tests) recurse depth-first, keep the active path, and
//!   raise [`DocumentError::CyclicDependency`] when a node reappears on that
//!   path or the link depth limit runs out.
//! - The sweep ([`in_list_ex`](Workspace::in_list_ex)) snapshots every
//!   object's out-list across all documents and grows the result with a
//!   worklist. Each object enters the result at most once, so it terminates
//!   on cyclic graphs, but it does not report the cycle.
//!
//! The asymmetry is deliberate: whole-document ancestor queries must keep
//! working while an edit has transiently closed a cycle.

use hashbrown::HashSet;

use crate::config::LinkDepth;
use crate::error::DocumentError;
use crate::id::ObjectId;
use crate::workspace::Workspace;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    Out,
    In,
}

struct CheckedWalk<'a> {
    ws: &'a Workspace,
    direction: Direction,
    target: Option<ObjectId>,
    on_path: HashSet<ObjectId>,
    seen: HashSet<ObjectId>,
    order: Vec<ObjectId>,
}

impl<'a> CheckedWalk<'a> {
    fn new(ws: &'a Workspace, direction: Direction, target: Option<ObjectId>) -> Self {
        Self {
            ws,
            direction,
            target,
            on_path: HashSet::new(),
            seen: HashSet::new(),
            order: Vec::new(),
        }
    }

    fn neighbors(&self, id: ObjectId) -> Vec<ObjectId> {
        match self.direction {
            Direction::Out => self.ws.out_list(id),
            Direction::In => {
                let mut list = self.ws.in_list(id);
                let mut seen = HashSet::with_capacity(list.len());
                list.retain(|r| seen.insert(*r));
                list
            }
        }
    }

    /// Returns `Ok(true)` as soon as the target is reached.
    fn visit(&mut self, node: ObjectId, depth: LinkDepth) -> Result<bool, DocumentError> {
        self.on_path.insert(node);
        for next in self.neighbors(node) {
            if Some(next) == self.target {
                return Ok(true);
            }
            if self.on_path.contains(&next) {
                return Err(cyclic(self.ws, next));
            }
            if self.seen.insert(next) {
                self.order.push(next);
                let depth = depth.try_next().ok_or_else(|| cyclic(self.ws, next))?;
                if self.visit(next, depth)? {
                    return Ok(true);
                }
            }
        }
        self.on_path.remove(&node);
        Ok(false)
    }
}

fn cyclic(ws: &Workspace, object: ObjectId) -> DocumentError {
    tracing::error!(
        object = ws.name(object).unwrap_or_default(),
        "cyclic dependency detected"
    );
    DocumentError::CyclicDependency { object }
}

impl Workspace {
    fn checked_walk(
        &self,
        id: ObjectId,
        direction: Direction,
        target: Option<ObjectId>,
    ) -> Result<(bool, Vec<ObjectId>), DocumentError> {
        self.attached(id)?;
        let mut walk = CheckedWalk::new(self, direction, target);
        let found = walk.visit(id, self.link_depth())?;
        Ok((found, walk.order))
    }

    /// Every object reachable from `id` through out-lists, in discovery order.
    ///
    /// Raises [`DocumentError::CyclicDependency`] if the walk meets a cycle or
    /// runs out of link depth.
    pub fn out_list_recursive(&self, id: ObjectId) -> Result<Vec<ObjectId>, DocumentError> {
        Ok(self.checked_walk(id, Direction::Out, None)?.1)
    }

    /// Every object that reaches `id` through out-lists, found by recursing
    /// over in-lists, in discovery order. Same failure modes as
    /// [`out_list_recursive`](Self::out_list_recursive).
    pub fn in_list_recursive_checked(&self, id: ObjectId) -> Result<Vec<ObjectId>, DocumentError> {
        Ok(self.checked_walk(id, Direction::In, None)?.1)
    }

    /// Returns `true` if `id` reaches `other` through out-lists.
    pub fn is_in_out_list_recursive(
        &self,
        id: ObjectId,
        other: ObjectId,
    ) -> Result<bool, DocumentError> {
        if self.is_in_out_list(id, other) {
            return Ok(true);
        }
        Ok(self.checked_walk(id, Direction::Out, Some(other))?.0)
    }

    /// Returns `true` if `other` reaches `id` through out-lists.
    pub fn is_in_in_list_recursive(
        &self,
        id: ObjectId,
        other: ObjectId,
    ) -> Result<bool, DocumentError> {
        if self.is_in_in_list(id, other) {
            return Ok(true);
        }
        Ok(self.checked_walk(id, Direction::In, Some(other))?.0)
    }

    /// Objects referencing `id`, across all documents, computed from
    /// out-lists rather than the stored in-lists. With `recursive`, the
    /// fixed point: every object from which `id` is reachable.
    ///
    /// Never fails on cycles; an object on a cycle through `id` includes `id`
    /// itself in the result. Sorted by [`ObjectId`].
    #[must_use]
    pub fn in_list_ex(&self, id: ObjectId, recursive: bool) -> Vec<ObjectId> {
        let out_lists: Vec<(ObjectId, HashSet<ObjectId>)> = self
            .objects_in_all_documents()
            .into_iter()
            .map(|obj| (obj, self.out_list(obj).into_iter().collect()))
            .collect();

        let mut result = HashSet::new();
        let mut pending = vec![id];
        while let Some(obj) = pending.pop() {
            for (candidate, out_list) in &out_lists {
                if *candidate == obj {
                    continue;
                }
                if out_list.contains(&obj) && result.insert(*candidate) && recursive {
                    pending.push(*candidate);
                }
            }
        }
        let mut result: Vec<_> = result.into_iter().collect();
        result.sort_unstable();
        result
    }

    /// Shorthand for [`in_list_ex(id, true)`](Self::in_list_ex).
    #[must_use]
    pub fn in_list_recursive(&self, id: ObjectId) -> Vec<ObjectId> {
        self.in_list_ex(id, true)
    }

    /// `roots` plus everything reachable from them through out-lists, roots
    /// first, then breadth-first. Tolerates cycles.
    #[must_use]
    pub fn dependency_closure(&self, roots: &[ObjectId]) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        let mut order: Vec<ObjectId> = roots
            .iter()
            .copied()
            .filter(|r| self.is_attached(*r) && seen.insert(*r))
            .collect();
        let mut next = 0;
        while let Some(&obj) = order.get(next) {
            next += 1;
            for child in self.out_list(obj) {
                if seen.insert(child) {
                    order.push(child);
                }
            }
        }
        order
    }

    /// Returns `false` if making `id` reference `targets` would close a cycle,
    /// that is, if `id` is among the targets or their dependencies.
    pub fn test_if_link_dag_compatible(
        &self,
        id: ObjectId,
        targets: &[ObjectId],
    ) -> Result<bool, DocumentError> {
        self.attached(id)?;
        Ok(!self.dependency_closure(targets).contains(&id))
    }

    /// Every simple path from `from` to `to` along out-lists, each starting
    /// with `from` and ending with `to`.
    #[must_use]
    pub fn paths_by_out_list(&self, from: ObjectId, to: ObjectId) -> Vec<Vec<ObjectId>> {
        fn walk(
            ws: &Workspace,
            to: ObjectId,
            path: &mut Vec<ObjectId>,
            paths: &mut Vec<Vec<ObjectId>>,
        ) {
            let Some(&last) = path.last() else {
                return;
            };
            for child in ws.out_list(last) {
                if child == to {
                    let mut found = path.clone();
                    found.push(to);
                    paths.push(found);
                } else if !path.contains(&child) {
                    path.push(child);
                    walk(ws, to, path, paths);
                    path.pop();
                }
            }
        }

        let mut paths = Vec::new();
        if self.is_attached(from) && self.is_attached(to) && from != to {
            walk(self, to, &mut vec![from], &mut paths);
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use linkage_property::{LinkOptions, Property, PropertyMetadataBuilder};

    use super::*;
    use crate::object::ObjectSpec;

    struct Graph {
        ws: Workspace,
        links: Property<Vec<ObjectId>>,
        ids: Vec<ObjectId>,
    }

    /// Builds `n` objects named `N0..`, then applies the edges.
    fn graph(n: usize, edges: &[(usize, usize)]) -> Graph {
        let mut ws = Workspace::new();
        let links = ws.registry_mut().register_link(
            "Links",
            PropertyMetadataBuilder::new(Vec::new()).build(),
            LinkOptions::LOCAL,
        );
        let doc = ws.new_document("Doc");
        let ids: Vec<_> = (0..n)
            .map(|i| {
                ws.add_object(doc, ObjectSpec::new("Node").property(links), &format!("N{i}"))
                    .unwrap()
            })
            .collect();
        for &(from, to) in edges {
            ws.update_property(ids[from], links, |l| l.push(ids[to]))
                .unwrap();
        }
        Graph { ws, links, ids }
    }

    #[test]
    fn cycle_faults_checked_walk_but_not_sweep() {
        let Graph { ws, ids, .. } = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let err = ws.out_list_recursive(a).unwrap_err();
        assert!(err.is_cyclic());
        assert!(ws.in_list_recursive_checked(a).unwrap_err().is_cyclic());

        let mut expected = vec![a, b, c];
        expected.sort_unstable();
        assert_eq!(ws.in_list_recursive(a), expected);
    }

    #[test]
    fn cycle_away_from_start_is_detected() {
        let Graph { ws, ids, .. } = graph(3, &[(0, 1), (1, 2), (2, 1)]);
        assert!(matches!(
            ws.out_list_recursive(ids[0]),
            Err(DocumentError::CyclicDependency { object }) if object == ids[1]
        ));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let Graph { ws, ids, .. } = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(
            ws.out_list_recursive(ids[0]).unwrap(),
            [ids[1], ids[3], ids[2]]
        );
        assert_eq!(
            ws.in_list_recursive_checked(ids[3]).unwrap(),
            [ids[1], ids[0], ids[2]]
        );
        assert_eq!(ws.in_list_ex(ids[3], false), [ids[1], ids[2]]);
        assert_eq!(ws.in_list_recursive(ids[3]), [ids[0], ids[1], ids[2]]);
    }

    #[test]
    fn membership_tests() {
        let Graph { ws, ids, .. } = graph(4, &[(0, 1), (1, 2)]);
        assert!(ws.is_in_out_list_recursive(ids[0], ids[2]).unwrap());
        assert!(!ws.is_in_out_list_recursive(ids[0], ids[3]).unwrap());
        assert!(ws.is_in_in_list_recursive(ids[2], ids[0]).unwrap());
        assert!(!ws.is_in_in_list_recursive(ids[0], ids[2]).unwrap());
    }

    #[test]
    fn membership_short_circuits_before_reaching_a_cycle() {
        let Graph { ws, ids, .. } = graph(3, &[(0, 1), (0, 2), (2, 0)]);
        assert!(ws.is_in_out_list_recursive(ids[0], ids[1]).unwrap());
    }

    #[test]
    fn depth_limit_faults_long_chains() {
        let Graph { ws, ids, .. } = graph(3, &[(0, 1), (1, 2)]);
        assert_eq!(ws.out_list_recursive(ids[0]).unwrap().len(), 2);

        let mut tight = Workspace::with_config(
            crate::config::WorkspaceConfig::default()
                .with_link_depth_slack(0)
                .with_max_link_depth(1),
        );
        let links = tight.registry_mut().register_link(
            "Links",
            PropertyMetadataBuilder::new(Vec::new()).build(),
            LinkOptions::LOCAL,
        );
        let doc = tight.new_document("Doc");
        let c = tight.add_object(doc, ObjectSpec::new("Node"), "C").unwrap();
        let b = tight
            .add_object(doc, ObjectSpec::new("Node").property_value(links, vec![c]), "B")
            .unwrap();
        let a = tight
            .add_object(doc, ObjectSpec::new("Node").property_value(links, vec![b]), "A")
            .unwrap();
        assert!(tight.out_list_recursive(a).unwrap_err().is_cyclic());
        assert_eq!(tight.out_list_recursive(b).unwrap(), [c]);
    }

    #[test]
    fn dag_compatibility() {
        let Graph { ws, ids, .. } = graph(3, &[(0, 1), (1, 2)]);
        assert!(!ws.test_if_link_dag_compatible(ids[2], &[ids[0]]).unwrap());
        assert!(!ws.test_if_link_dag_compatible(ids[0], &[ids[0]]).unwrap());
        assert!(ws.test_if_link_dag_compatible(ids[0], &[ids[2]]).unwrap());
        assert_eq!(ws.dependency_closure(&[ids[1]]), [ids[1], ids[2]]);
    }

    #[test]
    fn all_simple_paths() {
        let Graph { ws, ids, .. } = graph(4, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)]);
        let paths = ws.paths_by_out_list(ids[0], ids[3]);
        assert_eq!(
            paths,
            [vec![ids[0], ids[1], ids[3]], vec![ids[0], ids[2], ids[3]]]
        );
        assert!(ws.paths_by_out_list(ids[3], ids[3]).is_empty());
    }

    #[test]
    fn removal_updates_closures() {
        let Graph {
            mut ws, ids, links, ..
        } = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        ws.set_property(ids[2], links, Vec::new()).unwrap();
        assert_eq!(ws.out_list_recursive(ids[0]).unwrap(), [ids[1], ids[2]]);
        ws.remove_object(ids[1]).unwrap();
        assert!(ws.out_list_recursive(ids[0]).unwrap().is_empty());
        assert!(ws.in_list_recursive(ids[2]).is_empty());
    }
}
