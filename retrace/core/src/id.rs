//! Identity types for tracked entities.
//!
//! All identifiers are opaque handles that are:
//! - Assigned by the embedder's tree (nodes) or an internal arena (promises)
//! - Immutable once assigned
//! - Compared and hashed by value, standing in for object identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tree node.
///
/// The tracker never holds nodes themselves; every map is keyed on this
/// handle, which the embedder guarantees stable for the node's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Arena index of a pending sibling promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromiseId(pub u32);

impl PromiseId {
    /// Create a new PromiseId from a raw arena index.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw arena index.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}
