//! The MutationDiff façade.
//!
//! Receives notification records, dispatches property observations to the
//! property cache and child-list windows to the mutation engine, and
//! answers the embedder's queries: is anything different, what range
//! brackets the differences, what exactly changed, and put it all back.

use crate::boundary::{Boundary, BoundaryRange};
use crate::mutations::TreeMutations;
use crate::props::{PropKey, PropertyCache};
use retrace_core::{DeltaResult, DiffFilter, NodeId, Position, Sibling, Value};
use retrace_tree::{TreeMutator, TreeReader};
use serde::Serialize;
use std::collections::HashMap;

/// One observer notification, shaped like a DOM `MutationRecord`.
#[derive(Debug, Clone)]
pub enum NotificationRecord {
    Attributes {
        target: NodeId,
        attr_name: String,
        attr_namespace: Option<String>,
        /// Value before the change; `None` when the attribute was absent.
        old_value: Option<String>,
    },
    CharacterData {
        target: NodeId,
        old_value: String,
    },
    ChildList {
        target: NodeId,
        removed: Vec<NodeId>,
        added: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
}

/// Original/current pair for one property, sides gated by the diff filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Delta<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutated: Option<T>,
}

/// Placement change of one node. A side is `None` when filtered out, or
/// when the node has no placement on that side (never existed / removed).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChildrenDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutated: Option<Position>,
}

/// Everything that changed on one node.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Delta<String>>,
    /// Keyed by attribute name, `namespace:name` when namespaced.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Delta<Option<String>>>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, Delta<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenDelta>,
}

impl NodeDiff {
    fn is_empty(&self) -> bool {
        self.data.is_none()
            && self.attributes.is_empty()
            && self.custom.is_empty()
            && self.children.is_none()
    }
}

/// Outcome of a revert pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RevertOutcome {
    /// Property entries restored.
    pub properties_reverted: usize,
    /// Move groups placed back at their original position.
    pub groups_moved: usize,
    /// Move groups skipped for lack of a placement anchor.
    pub groups_skipped: usize,
    /// Added nodes detached for good.
    pub nodes_removed: usize,
}

impl RevertOutcome {
    /// True when every tracked difference could be undone.
    pub fn is_complete(&self) -> bool {
        self.groups_skipped == 0
    }
}

/// Minimum-delta tracker between a live tree and its tracking-start state.
///
/// Holds node handles only, never nodes; every method that touches the
/// tree borrows the embedder's accessor for the duration of the call.
#[derive(Debug, Default)]
pub struct MutationDiff {
    props: PropertyCache,
    tree_mutations: TreeMutations,
}

impl MutationDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch one notification record.
    pub fn record(&mut self, tree: &impl TreeReader, record: NotificationRecord) {
        match record {
            NotificationRecord::Attributes {
                target,
                attr_name,
                attr_namespace,
                old_value,
            } => self.attribute(tree, target, &attr_name, attr_namespace.as_deref(), old_value),
            NotificationRecord::CharacterData { target, old_value } => {
                self.data(tree, target, old_value)
            }
            NotificationRecord::ChildList {
                target,
                removed,
                added,
                previous_sibling,
                next_sibling,
            } => self.children(target, &removed, &added, previous_sibling, next_sibling),
        }
    }

    /// Observe an attribute change; the current value is read live.
    pub fn attribute(
        &mut self,
        tree: &impl TreeReader,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
        old_value: Option<String>,
    ) {
        let current = tree.attribute(node, name, namespace);
        self.props.mark_native(
            node,
            PropKey::Attr {
                name: name.to_string(),
                namespace: namespace.map(str::to_string),
            },
            current,
            old_value,
        );
    }

    /// Observe a character-data change; the current value is read live.
    pub fn data(&mut self, tree: &impl TreeReader, node: NodeId, old_value: String) {
        let current = tree.data(node);
        self.props
            .mark_native(node, PropKey::Data, current, Some(old_value));
    }

    /// Observe a custom (embedder-defined) property change.
    pub fn custom(&mut self, node: NodeId, key: &str, current: Value, old: Value) {
        self.props.mark_custom(node, key, current, old);
    }

    /// Ingest one child-list window.
    pub fn children(
        &mut self,
        parent: NodeId,
        removed: &[NodeId],
        added: &[NodeId],
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) {
        self.tree_mutations
            .mutation(parent, removed, added, previous_sibling, next_sibling);
    }

    /// Is anything under `root` different from the tracking-start state?
    pub fn mutated(&self, tree: &impl TreeReader, root: Option<NodeId>) -> bool {
        let under = |node: NodeId| root.map_or(true, |r| tree.contains(r, node));
        self.props.dirty_nodes().any(under)
            || self.tree_mutations.records().any(|rec| {
                rec.original.map(|o| o.parent).is_some_and(under)
                    || rec.mutated.map(|m| m.parent).is_some_and(under)
            })
    }

    /// The minimal range bracketing every difference under `root`.
    ///
    /// Unions the current-position box of every dirty or floating node
    /// with the original-position gaps of floating records (anchored on
    /// their fixed original siblings, collapsed when only one side has an
    /// anchor). `Ok(None)` when nothing contributes. Without a root,
    /// differences spanning disjoint trees are a `DisconnectedRange`
    /// error.
    pub fn range(
        &self,
        tree: &impl TreeReader,
        root: Option<NodeId>,
    ) -> DeltaResult<Option<BoundaryRange>> {
        let under = |node: NodeId| root.map_or(true, |r| tree.contains(r, node));
        let mut out: Option<BoundaryRange> = None;
        let mut pieces: Vec<BoundaryRange> = Vec::new();
        for node in self.props.dirty_nodes() {
            if under(node) {
                pieces.push(BoundaryRange::select_node(node));
            }
        }
        for rec in self.tree_mutations.records() {
            if rec.mutated.is_some() && under(rec.node) {
                pieces.push(BoundaryRange::select_node(rec.node));
            }
            if let Some(orig) = rec.original {
                let prev = self.fixed_anchor(orig.prev).filter(|&n| under(n));
                let next = self.fixed_anchor(orig.next).filter(|&n| under(n));
                match (prev, next) {
                    (Some(p), Some(n)) => pieces.push(BoundaryRange::between(p, n)),
                    (Some(p), None) => {
                        pieces.push(BoundaryRange::collapsed(Boundary::after(p)))
                    }
                    (None, Some(n)) => {
                        pieces.push(BoundaryRange::collapsed(Boundary::before(n)))
                    }
                    (None, None) => {}
                }
            }
        }
        for piece in pieces {
            match &mut out {
                None => out = Some(piece),
                Some(range) => range.extend(&piece, tree)?,
            }
        }
        Ok(out)
    }

    fn fixed_anchor(&self, sibling: Sibling) -> Option<NodeId> {
        match sibling {
            Sibling::Node(n) if !self.tree_mutations.is_floating(n) => Some(n),
            _ => None,
        }
    }

    /// The structured diff, shaped by `filter`.
    ///
    /// Only dirty properties and floating placements are emitted, and only
    /// the sides the filter selects are materialized. Current custom
    /// values come from `custom_getter`; without it the mutated side of
    /// custom entries is omitted.
    pub fn diff(
        &self,
        tree: &impl TreeReader,
        filter: DiffFilter,
        custom_getter: Option<&dyn Fn(NodeId, &str) -> Value>,
    ) -> DeltaResult<HashMap<NodeId, NodeDiff>> {
        let filter = filter.validate()?;
        let want_original = filter.contains(DiffFilter::ORIGINAL);
        let want_mutated = filter.contains(DiffFilter::MUTATED);
        let mut out: HashMap<NodeId, NodeDiff> = HashMap::new();

        if filter.intersects(DiffFilter::PROPERTY) {
            for (node, props) in self.props.iter() {
                let entry = out.entry(node).or_default();
                for (key, original) in props.dirty_native() {
                    match key {
                        PropKey::Data if filter.contains(DiffFilter::DATA) => {
                            entry.data = Some(Delta {
                                original: want_original
                                    .then(|| original.unwrap_or_default().to_string()),
                                mutated: want_mutated.then(|| tree.data(node)).flatten(),
                            });
                        }
                        PropKey::Attr { name, namespace }
                            if filter.contains(DiffFilter::ATTRIBUTE) =>
                        {
                            let label = match namespace {
                                Some(ns) => format!("{ns}:{name}"),
                                None => name.clone(),
                            };
                            entry.attributes.insert(
                                label,
                                Delta {
                                    original: want_original.then(|| original.map(str::to_string)),
                                    mutated: want_mutated
                                        .then(|| tree.attribute(node, name, namespace.as_deref())),
                                },
                            );
                        }
                        _ => {}
                    }
                }
                if filter.contains(DiffFilter::CUSTOM) {
                    for (key, original) in props.dirty_custom() {
                        entry.custom.insert(
                            key.to_string(),
                            Delta {
                                original: want_original.then(|| original.clone()),
                                mutated: want_mutated
                                    .then(|| custom_getter.map(|get| get(node, key)))
                                    .flatten(),
                            },
                        );
                    }
                }
            }
        }

        if filter.contains(DiffFilter::CHILDREN) {
            for rec in self.tree_mutations.records() {
                let entry = out.entry(rec.node).or_default();
                entry.children = Some(ChildrenDelta {
                    original: if want_original { rec.original } else { None },
                    mutated: if want_mutated { rec.mutated } else { None },
                });
            }
        }

        out.retain(|_, diff| !diff.is_empty());
        Ok(out)
    }

    /// Revert the tree to its tracking-start state.
    ///
    /// Properties are restored first, then structure. Groups with no
    /// usable placement anchor are skipped and counted rather than
    /// aborting the pass. All tracked state is dropped on completion.
    pub fn revert(
        &mut self,
        tree: &mut impl TreeMutator,
        custom_revert: Option<&mut dyn FnMut(NodeId, &str, &Value)>,
    ) -> DeltaResult<RevertOutcome> {
        let properties_reverted = self.props.revert(tree, custom_revert)?;
        let stats = self.tree_mutations.revert(tree)?;
        Ok(RevertOutcome {
            properties_reverted,
            groups_moved: stats.groups_moved,
            groups_skipped: stats.groups_skipped,
            nodes_removed: stats.nodes_removed,
        })
    }

    /// Declare the live tree quiescent and reconcile against it: unknown
    /// mutated siblings are read live, outstanding promises resolve, and
    /// clean property entries are dropped.
    pub fn synchronize(&mut self, tree: &impl TreeReader) {
        self.props.synchronize();
        self.tree_mutations.synchronize(tree);
    }

    /// Drop all tracked state.
    pub fn clear(&mut self) {
        self.props.clear();
        self.tree_mutations.clear();
    }

    /// Tracked nodes: property-observed plus floating.
    pub fn storage_size(&self) -> usize {
        self.props.len() + self.tree_mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage_size() == 0
    }
}
