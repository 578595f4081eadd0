//! Per-node property originals with dirty/clean accounting.
//!
//! Native entries cover attributes (keyed by name + namespace) and
//! character data (a distinguished sentinel key). Custom entries carry
//! embedder-defined state. The original value of a key never changes after
//! first observation; only the dirty flag toggles as later observations
//! compare the current value against that original.

use retrace_core::{DeltaResult, NodeId, Value};
use retrace_tree::TreeMutator;
use std::collections::HashMap;

/// Key of a native property entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum PropKey {
    /// Character data of the node.
    Data,
    /// An attribute, optionally namespaced.
    Attr {
        name: String,
        namespace: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct NativeEntry {
    /// `None` means the attribute was absent when tracking began.
    original: Option<String>,
    dirty: bool,
}

#[derive(Debug, Clone)]
struct CustomEntry {
    original: Value,
    dirty: bool,
}

#[derive(Debug, Default)]
pub(crate) struct NodeProps {
    native: HashMap<PropKey, NativeEntry>,
    custom: HashMap<String, CustomEntry>,
}

impl NodeProps {
    fn is_empty(&self) -> bool {
        self.native.is_empty() && self.custom.is_empty()
    }

    fn dirty_count(&self) -> usize {
        self.native.values().filter(|e| e.dirty).count()
            + self.custom.values().filter(|e| e.dirty).count()
    }

    /// Dirty native entries: `(key, original)`.
    pub fn dirty_native(&self) -> impl Iterator<Item = (&PropKey, Option<&str>)> {
        self.native
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(k, e)| (k, e.original.as_deref()))
    }

    /// Dirty custom entries: `(key, original)`.
    pub fn dirty_custom(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.custom
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(k, e)| (k.as_str(), &e.original))
    }
}

/// Store of property originals for every observed node.
#[derive(Debug, Default)]
pub(crate) struct PropertyCache {
    nodes: HashMap<NodeId, NodeProps>,
    clean: usize,
    dirty: usize,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation of a native property.
    ///
    /// First observation stores `old` as the immutable original; every
    /// observation recomputes dirtiness from `current` vs the original.
    pub fn mark_native(
        &mut self,
        node: NodeId,
        key: PropKey,
        current: Option<String>,
        old: Option<String>,
    ) {
        let mut inserted = false;
        let entry = self
            .nodes
            .entry(node)
            .or_default()
            .native
            .entry(key)
            .or_insert_with(|| {
                inserted = true;
                NativeEntry {
                    original: old,
                    dirty: false,
                }
            });
        let was_dirty = entry.dirty;
        entry.dirty = current.as_deref() != entry.original.as_deref();
        let now_dirty = entry.dirty;
        self.adjust_counters(inserted, was_dirty, now_dirty);
    }

    /// Record an observation of a custom property.
    pub fn mark_custom(&mut self, node: NodeId, key: &str, current: Value, old: Value) {
        let mut inserted = false;
        let entry = self
            .nodes
            .entry(node)
            .or_default()
            .custom
            .entry(key.to_string())
            .or_insert_with(|| {
                inserted = true;
                CustomEntry {
                    original: old,
                    dirty: false,
                }
            });
        let was_dirty = entry.dirty;
        entry.dirty = current != entry.original;
        let now_dirty = entry.dirty;
        self.adjust_counters(inserted, was_dirty, now_dirty);
    }

    fn adjust_counters(&mut self, inserted: bool, was_dirty: bool, now_dirty: bool) {
        if inserted {
            self.clean += 1;
        }
        if now_dirty != was_dirty {
            if now_dirty {
                self.clean -= 1;
                self.dirty += 1;
            } else {
                self.dirty -= 1;
                self.clean += 1;
            }
        }
    }

    /// Number of nodes with tracked entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of dirty entries across all nodes.
    pub fn dirty_count(&self) -> usize {
        self.dirty
    }

    /// True when the node carries at least one dirty entry.
    pub fn is_node_dirty(&self, node: NodeId) -> bool {
        self.nodes
            .get(&node)
            .is_some_and(|props| props.dirty_count() > 0)
    }

    /// Nodes with at least one dirty entry.
    pub fn dirty_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, props)| props.dirty_count() > 0)
            .map(|(&node, _)| node)
    }

    /// All tracked nodes with their entries.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeProps)> {
        self.nodes.iter().map(|(&node, props)| (node, props))
    }

    /// Restore every dirty entry.
    ///
    /// Native entries write back through the tree: character data by
    /// assignment, absent-original attributes by removal, others by set.
    /// Dirty custom entries invoke `custom_revert`; with no callback they
    /// are skipped. Returns the number of entries restored, and clears the
    /// cache on success.
    pub fn revert(
        &mut self,
        tree: &mut impl TreeMutator,
        mut custom_revert: Option<&mut dyn FnMut(NodeId, &str, &Value)>,
    ) -> DeltaResult<usize> {
        let mut restored = 0;
        for (&node, props) in &self.nodes {
            for (key, original) in props.dirty_native() {
                match key {
                    PropKey::Data => {
                        tree.set_data(node, original.unwrap_or_default())?;
                    }
                    PropKey::Attr { name, namespace } => match original {
                        Some(value) => {
                            tree.set_attribute(node, name, namespace.as_deref(), value)?;
                        }
                        None => {
                            tree.remove_attribute(node, name, namespace.as_deref())?;
                        }
                    },
                }
                restored += 1;
            }
            for (key, original) in props.dirty_custom() {
                match custom_revert.as_mut() {
                    Some(callback) => {
                        callback(node, key, original);
                        restored += 1;
                    }
                    None => {
                        log::debug!("no custom revert callback; skipping {key} on {node}");
                    }
                }
            }
        }
        self.clear();
        Ok(restored)
    }

    /// Drop all clean entries; returns the count of remaining dirty ones.
    pub fn synchronize(&mut self) -> usize {
        for props in self.nodes.values_mut() {
            props.native.retain(|_, e| e.dirty);
            props.custom.retain(|_, e| e.dirty);
        }
        self.nodes.retain(|_, props| !props.is_empty());
        self.clean = 0;
        self.dirty
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.clean = 0;
        self.dirty = 0;
    }

    #[cfg(debug_assertions)]
    pub fn counters_consistent(&self) -> bool {
        let dirty: usize = self.nodes.values().map(|p| p.dirty_count()).sum();
        let total: usize = self
            .nodes
            .values()
            .map(|p| p.native.len() + p.custom.len())
            .sum();
        dirty == self.dirty && total == self.clean + self.dirty
    }
}
