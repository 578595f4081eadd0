//! Node-anchored boundary ranges.
//!
//! A boundary names a spot immediately before or after a node; a range is
//! a start/end pair of boundaries. The type is an inert value: ordering
//! between boundaries depends on document order, so comparisons borrow the
//! embedder's tree instead of storing any of it.

use retrace_core::{DeltaError, DeltaResult, NodeId};
use retrace_tree::{DocPosition, TreeReader};
use serde::Serialize;
use std::cmp::Ordering;

/// Which side of the anchor node a boundary sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Edge {
    Before,
    After,
}

/// A spot in the tree, anchored to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Boundary {
    pub node: NodeId,
    pub edge: Edge,
}

impl Boundary {
    pub fn before(node: NodeId) -> Self {
        Self {
            node,
            edge: Edge::Before,
        }
    }

    pub fn after(node: NodeId) -> Self {
        Self {
            node,
            edge: Edge::After,
        }
    }
}

/// Document-order comparison of two boundaries.
///
/// Containment nests: the start of an ancestor precedes the start of any
/// descendant, and its end follows the end of any descendant.
fn compare(a: Boundary, b: Boundary, tree: &impl TreeReader) -> DeltaResult<Ordering> {
    match tree.position(a.node, b.node) {
        DocPosition::Same => Ok(match (a.edge, b.edge) {
            (Edge::Before, Edge::After) => Ordering::Less,
            (Edge::After, Edge::Before) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
        DocPosition::Preceding => Ok(Ordering::Less),
        DocPosition::Following => Ok(Ordering::Greater),
        DocPosition::Contains => Ok(match a.edge {
            Edge::Before => Ordering::Less,
            Edge::After => Ordering::Greater,
        }),
        DocPosition::ContainedBy => Ok(match b.edge {
            Edge::Before => Ordering::Greater,
            Edge::After => Ordering::Less,
        }),
        DocPosition::Disconnected => Err(DeltaError::DisconnectedRange),
    }
}

/// A pair of boundaries bracketing a span of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundaryRange {
    start: Boundary,
    end: Boundary,
}

impl BoundaryRange {
    /// The range spanning exactly one node.
    pub fn select_node(node: NodeId) -> Self {
        Self {
            start: Boundary::before(node),
            end: Boundary::after(node),
        }
    }

    /// A zero-width range at one boundary.
    pub fn collapsed(at: Boundary) -> Self {
        Self { start: at, end: at }
    }

    /// The gap between two anchors: after `prev`, before `next`.
    pub fn between(prev: NodeId, next: NodeId) -> Self {
        Self {
            start: Boundary::after(prev),
            end: Boundary::before(next),
        }
    }

    pub fn start(&self) -> Boundary {
        self.start
    }

    pub fn end(&self) -> Boundary {
        self.end
    }

    /// Move the start boundary; `after` picks the trailing edge of `node`,
    /// `collapse` drags the end along.
    pub fn set_start(&mut self, node: NodeId, after: bool, collapse: bool) {
        self.start = Boundary {
            node,
            edge: if after { Edge::After } else { Edge::Before },
        };
        if collapse {
            self.end = self.start;
        }
    }

    /// Move the end boundary; `before` picks the leading edge of `node`,
    /// `collapse` drags the start along.
    pub fn set_end(&mut self, node: NodeId, before: bool, collapse: bool) {
        self.end = Boundary {
            node,
            edge: if before { Edge::Before } else { Edge::After },
        };
        if collapse {
            self.start = self.end;
        }
    }

    /// Grow this range to also cover `other`.
    pub fn extend(&mut self, other: &BoundaryRange, tree: &impl TreeReader) -> DeltaResult<()> {
        if compare(other.start, self.start, tree)? == Ordering::Less {
            self.start = other.start;
        }
        if compare(other.end, self.end, tree)? == Ordering::Greater {
            self.end = other.end;
        }
        Ok(())
    }

    pub fn is_equal(&self, other: &BoundaryRange) -> bool {
        self == other
    }

    /// True when the range covers the given node entirely.
    pub fn covers(&self, node: NodeId, tree: &impl TreeReader) -> DeltaResult<bool> {
        let probe = BoundaryRange::select_node(node);
        Ok(compare(self.start, probe.start, tree)? != Ordering::Greater
            && compare(self.end, probe.end, tree)? != Ordering::Less)
    }
}
