//! Integration harness for the retrace workspace.
//!
//! `TrackedTree` pairs a `SimTree` with a `MutationDiff` and emulates a
//! mutation observer: every tracked operation performs the tree change
//! *and* emits the point-in-time notification record the change would
//! produce. Untracked operations change the tree behind the tracker's
//! back, which is how tests manufacture information gaps.

mod harness;

pub use harness::TrackedTree;

pub mod prelude {
    pub use crate::TrackedTree;
    pub use retrace_core::{DeltaError, DiffFilter, NodeId, Sibling, Value};
    pub use retrace_diff::{BoundaryRange, MutationDiff, NotificationRecord, RevertOutcome};
    pub use retrace_tree::{SimTree, TreeMutator, TreeReader};
}
