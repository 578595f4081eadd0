//! Sibling variants and position triples.
//!
//! A tracked node's neighborhood is described per side by a [`Sibling`],
//! which makes the "known node vs end-of-parent vs never observed vs
//! pending discovery" distinction total. A [`Position`] pairs both sides
//! with the owning parent.

use crate::{NodeId, PromiseId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a node a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    /// The other side.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Prev => Direction::Next,
            Direction::Next => Direction::Prev,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Prev => write!(f, "prev"),
            Direction::Next => write!(f, "next"),
        }
    }
}

/// One side of a node's neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sibling {
    /// A concrete neighboring node.
    Node(NodeId),
    /// No neighbor: the node sits at this end of its parent.
    End,
    /// Never observed.
    Unknown,
    /// Observed to be unknown; a promise is parked here awaiting discovery.
    Pending(PromiseId),
}

impl Sibling {
    /// Lift an embedder-reported sibling (`Some(node)` / `None`) into the
    /// variant. Notifications can only carry a node or "end of parent".
    pub fn from_reported(node: Option<NodeId>) -> Self {
        match node {
            Some(n) => Sibling::Node(n),
            None => Sibling::End,
        }
    }

    /// The concrete node, if this side holds one.
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            Sibling::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The parked promise, if this side holds one.
    pub fn as_pending(self) -> Option<PromiseId> {
        match self {
            Sibling::Pending(p) => Some(p),
            _ => None,
        }
    }

    /// True for `Node` and `End`: values a walk can act on directly.
    pub fn is_settled(self) -> bool {
        matches!(self, Sibling::Node(_) | Sibling::End)
    }
}

impl fmt::Display for Sibling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sibling::Node(n) => write!(f, "{n}"),
            Sibling::End => write!(f, "#end"),
            Sibling::Unknown => write!(f, "#unknown"),
            Sibling::Pending(p) => write!(f, "#pending({p})"),
        }
    }
}

/// A node's placement: owning parent plus both sibling sides.
///
/// A triple only exists while the placement's parent is known; absence of
/// a placement altogether (node removed, or node that never existed) is
/// expressed by `Option<Position>` at the record level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub parent: NodeId,
    pub prev: Sibling,
    pub next: Sibling,
}

impl Position {
    /// A placement with both sides unobserved.
    pub fn unknown(parent: NodeId) -> Self {
        Self {
            parent,
            prev: Sibling::Unknown,
            next: Sibling::Unknown,
        }
    }

    /// Read one side.
    pub fn side(&self, dir: Direction) -> Sibling {
        match dir {
            Direction::Prev => self.prev,
            Direction::Next => self.next,
        }
    }

    /// Write one side.
    pub fn set_side(&mut self, dir: Direction, value: Sibling) {
        match dir {
            Direction::Prev => self.prev = value,
            Direction::Next => self.next = value,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}..{}}}", self.parent, self.prev, self.next)
    }
}
