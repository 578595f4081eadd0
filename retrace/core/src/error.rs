//! Common error types for the retrace workspace.

use crate::NodeId;
use thiserror::Error;

/// Result type for diff operations.
pub type DeltaResult<T> = Result<T, DeltaError>;

/// Errors surfaced by the mutation-tracking core.
///
/// Internal invariant violations are deliberately absent: those are bugs,
/// guarded by debug assertions, never runtime conditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeltaError {
    /// A diff filter selecting no sides or no content.
    #[error("invalid diff filter: {bits:#06x} selects nothing")]
    InvalidFilter { bits: u32 },

    /// A range query over mutations spanning disjoint trees.
    #[error("mutation range spans disconnected trees")]
    DisconnectedRange,

    /// A tree operation against a node the embedder no longer knows.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Inserting a node under its own descendant.
    #[error("cannot insert {node} into its own descendant {parent}")]
    HierarchyViolation { node: NodeId, parent: NodeId },
}

impl DeltaError {
    pub fn invalid_filter(bits: u32) -> Self {
        Self::InvalidFilter { bits }
    }
}
