//! Observer-emulating test tree.

use retrace_core::{DeltaResult, DiffFilter, NodeId, Value};
use retrace_diff::{BoundaryRange, MutationDiff, NodeDiff, NotificationRecord, RevertOutcome};
use retrace_tree::{SimTree, TreeMutator, TreeReader};
use std::collections::HashMap;

/// A `SimTree` whose tracked operations feed a `MutationDiff` with the
/// same point-in-time records a DOM `MutationObserver` would deliver.
#[derive(Debug, Default)]
pub struct TrackedTree {
    pub tree: SimTree,
    pub diff: MutationDiff,
}

impl TrackedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A root with one fresh element child per name; the common seed
    /// shape for scenarios. Seeding happens before tracking: no records.
    pub fn seeded(names: &[&str]) -> (Self, NodeId, Vec<NodeId>) {
        let mut this = Self::new();
        let root = this.tree.create_element("root");
        let kids: Vec<_> = names.iter().map(|n| this.tree.create_element(n)).collect();
        this.tree.append(root, &kids).unwrap();
        (this, root, kids)
    }

    pub fn element(&mut self, name: &str) -> NodeId {
        self.tree.create_element(name)
    }

    pub fn text(&mut self, data: &str) -> NodeId {
        self.tree.create_text(data)
    }

    // ==================== Tracked structural ops ====================

    /// Detach a node, reporting the removal window.
    pub fn remove(&mut self, node: NodeId) {
        let parent = self.tree.parent_of(node).expect("node is attached");
        let (prev, next) = self.tree.siblings_of(node);
        self.tree.remove(node).unwrap();
        self.diff.record(
            &self.tree,
            NotificationRecord::ChildList {
                target: parent,
                removed: vec![node],
                added: vec![],
                previous_sibling: prev,
                next_sibling: next,
            },
        );
    }

    /// Move or insert a node at a child index, reporting each step.
    pub fn insert_at(&mut self, parent: NodeId, node: NodeId, at: usize) {
        if self.tree.parent_of(node).is_some() {
            self.remove(node);
        }
        match self.tree.children_of(parent).get(at).copied() {
            Some(reference) => self.tree.insert_before(parent, &[node], reference).unwrap(),
            None => self.tree.append(parent, &[node]).unwrap(),
        }
        let (prev, next) = self.tree.siblings_of(node);
        self.diff.record(
            &self.tree,
            NotificationRecord::ChildList {
                target: parent,
                removed: vec![],
                added: vec![node],
                previous_sibling: prev,
                next_sibling: next,
            },
        );
    }

    pub fn append(&mut self, parent: NodeId, node: NodeId) {
        let end = self.tree.children_of(parent).len();
        self.insert_at(parent, node, end);
    }

    pub fn prepend(&mut self, parent: NodeId, node: NodeId) {
        self.insert_at(parent, node, 0);
    }

    /// Remove every child of `parent` in one batched window, the way
    /// `replaceChildren()` reports it.
    pub fn remove_all_children(&mut self, parent: NodeId) {
        let removed: Vec<NodeId> = self.tree.children_of(parent).to_vec();
        if removed.is_empty() {
            return;
        }
        for &n in &removed {
            self.tree.remove(n).unwrap();
        }
        self.diff.children(parent, &removed, &[], None, None);
    }

    // ==================== Tracked property ops ====================

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let old = self.tree.attribute(node, name, None);
        self.tree.set_attribute(node, name, None, value).unwrap();
        self.diff.record(
            &self.tree,
            NotificationRecord::Attributes {
                target: node,
                attr_name: name.to_string(),
                attr_namespace: None,
                old_value: old,
            },
        );
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        let old = self.tree.attribute(node, name, None);
        self.tree.remove_attribute(node, name, None).unwrap();
        self.diff.record(
            &self.tree,
            NotificationRecord::Attributes {
                target: node,
                attr_name: name.to_string(),
                attr_namespace: None,
                old_value: old,
            },
        );
    }

    pub fn set_data(&mut self, node: NodeId, data: &str) {
        let old = self.tree.data(node).expect("character-data node");
        self.tree.set_data(node, data).unwrap();
        self.diff.record(
            &self.tree,
            NotificationRecord::CharacterData {
                target: node,
                old_value: old,
            },
        );
    }

    pub fn set_custom(&mut self, node: NodeId, key: &str, current: Value, old: Value) {
        self.diff.custom(node, key, current, old);
    }

    // ==================== Untracked ops ====================

    /// Change the tree without telling the tracker.
    pub fn untracked_insert_at(&mut self, parent: NodeId, node: NodeId, at: usize) {
        self.tree.remove(node).unwrap();
        match self.tree.children_of(parent).get(at).copied() {
            Some(reference) => self.tree.insert_before(parent, &[node], reference).unwrap(),
            None => self.tree.append(parent, &[node]).unwrap(),
        }
    }

    pub fn untracked_remove(&mut self, node: NodeId) {
        self.tree.remove(node).unwrap();
    }

    // ==================== Queries and lifecycle ====================

    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.tree.children_of(parent).to_vec()
    }

    pub fn mutated(&self, root: Option<NodeId>) -> bool {
        self.diff.mutated(&self.tree, root)
    }

    pub fn range(&self, root: Option<NodeId>) -> DeltaResult<Option<BoundaryRange>> {
        self.diff.range(&self.tree, root)
    }

    pub fn node_diff(&self, filter: DiffFilter) -> DeltaResult<HashMap<NodeId, NodeDiff>> {
        self.diff.diff(&self.tree, filter, None)
    }

    pub fn revert(&mut self) -> DeltaResult<RevertOutcome> {
        self.diff.revert(&mut self.tree, None)
    }

    pub fn synchronize(&mut self) {
        self.diff.synchronize(&self.tree);
    }

    pub fn outline(&self, node: NodeId) -> String {
        self.tree.outline(node)
    }
}
