// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touched state, execution and recompute ordering.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use linkage_property::PropertyStatus;

use crate::error::{DocumentError, ExecFailure, ExecResult};
use crate::id::{DocumentId, ObjectId};
use crate::object::ObjectStatus;
use crate::workspace::Workspace;

/// What a [`Workspace::recompute`] pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Objects executed, in execution order, failed ones included.
    pub executed: Vec<ObjectId>,
    /// Objects whose execution failed.
    pub failures: Vec<ExecFailure>,
}

impl RecomputeReport {
    /// Returns `true` if nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Workspace {
    /// Marks the object as needing a recompute.
    pub fn touch(&mut self, id: ObjectId) {
        self.set_status(id, ObjectStatus::TOUCHED, true);
    }

    /// Returns `true` if the object is marked for recompute.
    #[must_use]
    pub fn is_touched(&self, id: ObjectId) -> bool {
        self.status(id).contains(ObjectStatus::TOUCHED)
    }

    /// Clears the touched mark of the object and of all its properties.
    pub fn purge_touched(&mut self, id: ObjectId) {
        if let Some(data) = self.data_mut(id) {
            data.status.remove(ObjectStatus::TOUCHED);
            data.properties.clear_status_all(PropertyStatus::TOUCHED);
        }
    }

    /// Returns `true` if the object is touched or one of its extensions
    /// demands execution.
    #[must_use]
    pub fn must_execute(&self, id: ObjectId) -> bool {
        self.is_touched(id)
            || self
                .extensions_of(id)
                .iter()
                .any(|ext| ext.must_execute(self, id))
    }

    /// Runs the object's extensions' `execute` hooks in order, stopping at the
    /// first failure.
    pub fn execute(&mut self, id: ObjectId) -> ExecResult {
        if !self.is_attached(id) {
            return Err(ExecFailure::new(id, "object is not attached"));
        }
        for ext in self.extensions_of(id) {
            ext.execute(self, id)?;
        }
        Ok(())
    }

    /// Sorts `objects` so every object comes after the objects it references,
    /// considering only references within the set. Among objects whose
    /// dependencies are done, the smallest [`ObjectId`] goes first.
    ///
    /// Raises [`DocumentError::CyclicDependency`] if the set contains a cycle.
    pub fn dependency_order(&self, objects: &[ObjectId]) -> Result<Vec<ObjectId>, DocumentError> {
        let members: HashSet<ObjectId> = objects.iter().copied().collect();
        let mut pending: HashMap<ObjectId, usize> = HashMap::with_capacity(members.len());
        let mut dependents: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        for &id in &members {
            let deps: Vec<_> = self
                .out_list(id)
                .into_iter()
                .filter(|dep| *dep != id && members.contains(dep))
                .collect();
            pending.insert(id, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(id);
            }
        }

        let mut ready: BinaryHeap<Reverse<ObjectId>> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();
        let mut order = Vec::with_capacity(members.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for dependent in dependents.remove(&id).unwrap_or_default() {
                if let Some(n) = pending.get_mut(&dependent) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        if order.len() < members.len() {
            let stuck = pending
                .iter()
                .filter(|(_, n)| **n > 0)
                .map(|(id, _)| *id)
                .min();
            if let Some(object) = stuck {
                tracing::error!(
                    object = self.name(object).unwrap_or_default(),
                    "cyclic dependency blocks recompute"
                );
                return Err(DocumentError::CyclicDependency { object });
            }
        }
        Ok(order)
    }

    /// Executes every object of `doc` (or of every document) that must
    /// execute, along with everything that depends on one, dependencies first.
    ///
    /// A failing object is marked [`ERROR`](ObjectStatus::ERROR) and recorded
    /// in the report; the pass continues with the rest. Successful objects have
    /// their touched marks purged.
    pub fn recompute(&mut self, doc: Option<DocumentId>) -> Result<RecomputeReport, DocumentError> {
        let scope = match doc {
            Some(doc) => self.objects(doc).to_vec(),
            None => self.objects_in_all_documents(),
        };
        let mut candidates: HashSet<ObjectId> = HashSet::new();
        for &id in &scope {
            if self.must_execute(id) && candidates.insert(id) {
                candidates.extend(self.in_list_recursive(id));
            }
        }
        let candidates: Vec<_> = candidates.into_iter().collect();
        let order = self.dependency_order(&candidates)?;

        let mut report = RecomputeReport::default();
        for id in order {
            if !self.is_attached(id) {
                continue;
            }
            self.set_status(id, ObjectStatus::RECOMPUTING, true);
            let outcome = self.execute(id);
            self.set_status(id, ObjectStatus::RECOMPUTING, false);
            report.executed.push(id);
            match outcome {
                Ok(()) => {
                    self.set_status(id, ObjectStatus::ERROR, false);
                    self.purge_touched(id);
                }
                Err(failure) => {
                    tracing::warn!(%failure, "recompute failed");
                    self.set_status(id, ObjectStatus::ERROR, true);
                    report.failures.push(failure);
                }
            }
        }
        tracing::debug!(
            executed = report.executed.len(),
            failed = report.failures.len(),
            "recompute finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use linkage_property::{LinkOptions, Property, PropertyMetadataBuilder};

    use super::*;
    use crate::extension::DocumentObjectExtension;
    use crate::object::ObjectSpec;

    #[derive(Debug)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl DocumentObjectExtension for Recorder {
        fn execute(&self, ws: &mut Workspace, owner: ObjectId) -> ExecResult {
            self.log
                .borrow_mut()
                .push(ws.name(owner).unwrap_or_default().to_owned());
            if self.fail {
                Err(ExecFailure::new(owner, "boom"))
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        ws: Workspace,
        links: Property<Vec<ObjectId>>,
        log: Rc<RefCell<Vec<String>>>,
        doc: DocumentId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ws = Workspace::new();
            let links = ws.registry_mut().register_link(
                "Links",
                PropertyMetadataBuilder::new(Vec::new()).build(),
                LinkOptions::LOCAL,
            );
            let doc = ws.new_document("Doc");
            Self {
                ws,
                links,
                log: Rc::default(),
                doc,
            }
        }

        fn add(&mut self, name: &str, deps: Vec<ObjectId>, fail: bool) -> ObjectId {
            let spec = ObjectSpec::new("Feature")
                .property_value(self.links, deps)
                .extension(Recorder {
                    log: self.log.clone(),
                    fail,
                });
            self.ws.add_object(self.doc, spec, name).unwrap()
        }

        fn take_log(&self) -> Vec<String> {
            self.log.take()
        }
    }

    #[test]
    fn dependencies_run_first() {
        let mut f = Fixture::new();
        let c = f.add("C", vec![], false);
        let b = f.add("B", vec![c], false);
        let a = f.add("A", vec![b, c], false);
        assert_eq!(f.ws.dependency_order(&[a, b, c]).unwrap(), [c, b, a]);

        let report = f.ws.recompute(Some(f.doc)).unwrap();
        assert!(report.is_success());
        assert_eq!(f.take_log(), ["C", "B", "A"]);
        assert!(!f.ws.is_touched(a));
        assert_eq!(
            f.ws.property_status(a, f.links.id())
                .map(|s| s.contains(PropertyStatus::TOUCHED)),
            Some(false)
        );

        assert!(f.ws.recompute(None).unwrap().executed.is_empty());
    }

    #[test]
    fn touching_a_dependency_reruns_dependents() {
        let mut f = Fixture::new();
        let c = f.add("C", vec![], false);
        let b = f.add("B", vec![c], false);
        let _a = f.add("A", vec![b], false);
        let _d = f.add("D", vec![], false);
        f.ws.recompute(None).unwrap();
        f.take_log();

        f.ws.touch(b);
        f.ws.recompute(None).unwrap();
        assert_eq!(f.take_log(), ["B", "A"]);
    }

    #[test]
    fn failures_are_recorded_and_marked() {
        let mut f = Fixture::new();
        let bad = f.add("Bad", vec![], true);
        let good = f.add("Good", vec![bad], false);
        let report = f.ws.recompute(None).unwrap();
        assert_eq!(report.executed, [bad, good]);
        assert_eq!(report.failures, [ExecFailure::new(bad, "boom")]);
        assert!(f.ws.status(bad).contains(ObjectStatus::ERROR));
        assert!(f.ws.is_touched(bad));
        assert!(!f.ws.status(good).contains(ObjectStatus::ERROR));
    }

    #[test]
    fn cycles_block_recompute() {
        let mut f = Fixture::new();
        let a = f.add("A", vec![], false);
        let b = f.add("B", vec![a], false);
        f.ws.set_property(a, f.links, vec![b]).unwrap();
        assert!(f.ws.recompute(None).unwrap_err().is_cyclic());
        assert!(f.take_log().is_empty());
    }
}
