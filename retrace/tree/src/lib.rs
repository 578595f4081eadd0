//! Retrace tree access
//!
//! The mutation tracker never owns tree nodes; it sees the embedder's tree
//! through the traits defined here, keyed entirely by [`NodeId`] handles.
//!
//! Responsibilities:
//! - `TreeReader`: structural and content queries (parents, siblings,
//!   containment, document order, attributes, character data)
//! - `TreeMutator`: the operations reversion needs (detach, insert,
//!   attribute/data writes)
//! - `SimTree`: an in-memory implementation backing tests and demos

mod sim;

pub use sim::SimTree;

use retrace_core::{DeltaResult, NodeId};

/// Relative placement of two nodes in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocPosition {
    /// The same node.
    Same,
    /// `a` comes before `b` and does not contain it.
    Preceding,
    /// `a` comes after `b` and is not contained by it.
    Following,
    /// `a` is an ancestor of `b`.
    Contains,
    /// `a` is a descendant of `b`.
    ContainedBy,
    /// The nodes live in disjoint trees.
    Disconnected,
}

/// Read-only view of the embedder's ordered tree.
pub trait TreeReader {
    /// The node's parent, or `None` for a root or detached node.
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// The node's `(previous, next)` siblings.
    fn siblings_of(&self, node: NodeId) -> (Option<NodeId>, Option<NodeId>);

    /// The node's index within its parent's child list.
    fn child_index(&self, node: NodeId) -> Option<usize>;

    /// Inclusive containment: a node contains itself.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Document-order comparison of two nodes.
    fn position(&self, a: NodeId, b: NodeId) -> DocPosition;

    /// Current value of an attribute, `None` when absent.
    fn attribute(&self, node: NodeId, name: &str, namespace: Option<&str>) -> Option<String>;

    /// Current character data, `None` for non-character-data nodes.
    fn data(&self, node: NodeId) -> Option<String>;
}

/// Mutation operations used when reverting a tree to its tracked state.
pub trait TreeMutator: TreeReader {
    /// Detach a node from its parent. Detached nodes stay addressable.
    fn remove(&mut self, node: NodeId) -> DeltaResult<()>;

    /// Insert `nodes` (in order) into `parent` before `reference`.
    fn insert_before(
        &mut self,
        parent: NodeId,
        nodes: &[NodeId],
        reference: NodeId,
    ) -> DeltaResult<()>;

    /// Insert `nodes` (in order) at the end of `parent`.
    fn append(&mut self, parent: NodeId, nodes: &[NodeId]) -> DeltaResult<()>;

    /// Insert `nodes` (in order) at the start of `parent`.
    fn prepend(&mut self, parent: NodeId, nodes: &[NodeId]) -> DeltaResult<()>;

    /// Set an attribute value.
    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
        value: &str,
    ) -> DeltaResult<()>;

    /// Remove an attribute.
    fn remove_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        namespace: Option<&str>,
    ) -> DeltaResult<()>;

    /// Replace a character-data node's contents.
    fn set_data(&mut self, node: NodeId, data: &str) -> DeltaResult<()>;
}
