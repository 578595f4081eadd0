//! In-memory ordered tree.
//!
//! Slab-style storage: every node lives in a `HashMap` keyed by its
//! [`NodeId`], parents hold ordered child-id lists, children hold a parent
//! back-link. Detached nodes (no parent) remain addressable, matching how
//! a DOM keeps removed nodes alive while references exist.

use crate::{DocPosition, TreeMutator, TreeReader};
use retrace_core::{DeltaError, DeltaResult, NodeId};
use std::collections::HashMap;
use std::fmt::Write as _;

/// ID allocator for simulated nodes.
#[derive(Debug, Default)]
struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next_id: 1 }
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Attribute key: local name plus optional namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrKey {
    name: String,
    namespace: Option<String>,
}

#[derive(Debug)]
enum NodeKind {
    Element {
        name: String,
        // Vec keeps source order; lookups go through helpers.
        attributes: Vec<(AttrKey, String)>,
    },
    Text {
        data: String,
    },
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An in-memory ordered tree implementing the retrace access traits.
#[derive(Debug)]
pub struct SimTree {
    nodes: HashMap<NodeId, NodeData>,
    id_alloc: IdAllocator,
}

impl Default for SimTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            id_alloc: IdAllocator::new(),
        }
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = self.id_alloc.alloc();
        self.nodes.insert(
            id,
            NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Element {
                    name: name.to_string(),
                    attributes: Vec::new(),
                },
            },
        );
        id
    }

    /// Create a detached character-data node.
    pub fn create_text(&mut self, data: &str) -> NodeId {
        let id = self.id_alloc.alloc();
        self.nodes.insert(
            id,
            NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Text {
                    data: data.to_string(),
                },
            },
        );
        id
    }

    /// The element's tag name, `None` for character data.
    pub fn element_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text { .. } => None,
        }
    }

    /// Ordered child ids of a node.
    pub fn children_of(&self, parent: NodeId) -> &[NodeId] {
        self.nodes
            .get(&parent)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// True when the node is not attached to any parent.
    pub fn is_detached(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.parent.is_none())
    }

    /// One-line structure dump of a subtree, for test failure output.
    pub fn outline(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(node, &mut out);
        out
    }

    fn write_outline(&self, node: NodeId, out: &mut String) {
        match self.nodes.get(&node).map(|n| &n.kind) {
            Some(NodeKind::Element { name, .. }) => {
                let _ = write!(out, "{name}");
                let children = self.children_of(node).to_vec();
                if !children.is_empty() {
                    out.push('[');
                    for (i, child) in children.iter().enumerate() {
                        if i > 0 {
                            out.push(' ');
                        }
                        self.write_outline(*child, out);
                    }
                    out.push(']');
                }
            }
            Some(NodeKind::Text { data }) => {
                let _ = write!(out, "{data:?}");
            }
            None => {
                let _ = write!(out, "<missing {node}>");
            }
        }
    }

    fn node(&self, id: NodeId) -> DeltaResult<&NodeData> {
        self.nodes.get(&id).ok_or(DeltaError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DeltaResult<&mut NodeData> {
        self.nodes.get_mut(&id).ok_or(DeltaError::NodeNotFound(id))
    }

    fn detach(&mut self, node: NodeId) -> DeltaResult<()> {
        let parent = self.node(node)?.parent;
        if let Some(parent) = parent {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|&c| c != node);
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }

    fn insert_at(&mut self, parent: NodeId, nodes: &[NodeId], index: usize) -> DeltaResult<()> {
        self.node(parent)?;
        for &n in nodes {
            self.node(n)?;
            // An attached ancestor cannot be inserted under its own
            // descendant; callers detach first, as the DOM requires.
            // `contains` is inclusive, so this also rejects n == parent.
            if self.contains(n, parent) {
                return Err(DeltaError::HierarchyViolation { node: n, parent });
            }
        }
        let mut at = index;
        for &n in nodes {
            self.detach(n)?;
            let children = &mut self.node_mut(parent)?.children;
            let at_clamped = at.min(children.len());
            children.insert(at_clamped, n);
            self.node_mut(n)?.parent = Some(parent);
            at = at_clamped + 1;
        }
        Ok(())
    }

    /// Root of the tree the node currently belongs to.
    fn root_of(&self, node: NodeId) -> NodeId {
        let mut cur = node;
        while let Some(parent) = self.nodes.get(&cur).and_then(|n| n.parent) {
            cur = parent;
        }
        cur
    }

    /// Path of child indexes from the root down to the node.
    fn index_path(&self, node: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = node;
        while let Some(parent) = self.nodes.get(&cur).and_then(|n| n.parent) {
            if let Some(i) = self.children_of(parent).iter().position(|&c| c == cur) {
                path.push(i);
            }
            cur = parent;
        }
        path.reverse();
        path
    }
}

impl TreeReader for SimTree {
    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn siblings_of(&self, node: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let Some(parent) = self.parent_of(node) else {
            return (None, None);
        };
        let children = self.children_of(parent);
        let Some(i) = children.iter().position(|&c| c == node) else {
            return (None, None);
        };
        let prev = (i > 0).then(|| children[i - 1]);
        let next = children.get(i + 1).copied();
        (prev, next)
    }

    fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent_of(node)?;
        self.children_of(parent).iter().position(|&c| c == node)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    fn position(&self, a: NodeId, b: NodeId) -> DocPosition {
        if a == b {
            return DocPosition::Same;
        }
        if self.root_of(a) != self.root_of(b) {
            return DocPosition::Disconnected;
        }
        if self.contains(a, b) {
            return DocPosition::Contains;
        }
        if self.contains(b, a) {
            return DocPosition::ContainedBy;
        }
        let pa = self.index_path(a);
        let pb = self.index_path(b);
        if pa < pb {
            DocPosition::Preceding
        } else {
            DocPosition::Following
        }
    }

    fn attribute(&self, node: NodeId, name: &str, namespace: Option<&str>) -> Option<String> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.name == name && k.namespace.as_deref() == namespace)
                .map(|(_, v)| v.clone()),
            NodeKind::Text { .. } => None,
        }
    }

    fn data(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Text { data } => Some(data.clone()),
            NodeKind::Element { .. } => None,
        }
    }
}

impl TreeMutator for SimTree {
    fn remove(&mut self, node: NodeId) -> DeltaResult<()> {
        self.detach(node)
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        nodes: &[NodeId],
        reference: NodeId,
    ) -> DeltaResult<()> {
        let index = self
            .children_of(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or(DeltaError::NodeNotFound(reference))?;
        self.insert_at(parent, nodes, index)
    }

    fn append(&mut self, parent: NodeId, nodes: &[NodeId]) -> DeltaResult<()> {
        let end = self.node(parent)?.children.len();
        self.insert_at(parent, nodes, end)
    }

    fn prepend(&mut self, parent: NodeId, nodes: &[NodeId]) -> DeltaResult<()> {
        self.insert_at(parent, nodes, 0)
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
        value: &str,
    ) -> DeltaResult<()> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Element { attributes, .. } => {
                let existing = attributes
                    .iter_mut()
                    .find(|(k, _)| k.name == name && k.namespace.as_deref() == namespace);
                match existing {
                    Some((_, v)) => *v = value.to_string(),
                    None => attributes.push((
                        AttrKey {
                            name: name.to_string(),
                            namespace: namespace.map(str::to_string),
                        },
                        value.to_string(),
                    )),
                }
                Ok(())
            }
            NodeKind::Text { .. } => Err(DeltaError::NodeNotFound(node)),
        }
    }

    fn remove_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
    ) -> DeltaResult<()> {
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(node)?.kind {
            attributes.retain(|(k, _)| !(k.name == name && k.namespace.as_deref() == namespace));
        }
        Ok(())
    }

    fn set_data(&mut self, node: NodeId, data: &str) -> DeltaResult<()> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Text { data: d } => {
                *d = data.to_string();
                Ok(())
            }
            NodeKind::Element { .. } => Err(DeltaError::NodeNotFound(node)),
        }
    }
}
