//! Retrace diff
//!
//! Maintain the minimum delta between an ordered tree and its state at
//! the moment tracking began, fed by batched mutation notifications.
//!
//! The hard part is that child-list notifications arrive batched and out
//! of order with respect to intermediate tree states: each window reveals
//! only its point-in-time siblings and the added/removed lists. The
//! engine reconstructs every moved node's original placement from those
//! reveals alone, without walking the tree, and drops a record the moment
//! its node is effectively back where it started.
//!
//! Module map:
//! - `props` - attribute/character-data/custom originals with dirty
//!   accounting
//! - `index` - the four sibling-to-record lookup maps
//! - `promise` - deferred original-sibling computations
//! - `record` - floating-node records
//! - `mutations` - the child-list engine: window ingest, promise
//!   resolution, fixedness propagation, synchronize, revert
//! - `boundary` - node-anchored boundary ranges
//! - `diff` - the `MutationDiff` façade
//!
//! ```
//! use retrace_diff::MutationDiff;
//! use retrace_tree::{SimTree, TreeMutator, TreeReader};
//!
//! let mut tree = SimTree::new();
//! let root = tree.create_element("div");
//! let item = tree.create_element("p");
//! tree.append(root, &[item]).unwrap();
//!
//! let mut diff = MutationDiff::new();
//! // The embedder relays observer notifications; here: removing `item`.
//! let (prev, next) = tree.siblings_of(item);
//! tree.remove(item).unwrap();
//! diff.children(root, &[item], &[], prev, next);
//!
//! assert!(diff.mutated(&tree, Some(root)));
//! diff.revert(&mut tree, None).unwrap();
//! assert_eq!(tree.children_of(root), &[item]);
//! ```

mod boundary;
mod diff;
mod index;
mod mutations;
mod promise;
mod props;
mod record;

pub use boundary::{Boundary, BoundaryRange, Edge};
pub use diff::{
    ChildrenDelta, Delta, MutationDiff, NodeDiff, NotificationRecord, RevertOutcome,
};
