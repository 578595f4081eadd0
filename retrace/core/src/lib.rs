//! Retrace core
//!
//! Shared vocabulary types for the mutation-tracking workspace.
//!
//! Responsibilities:
//! - Opaque identity handles for tree nodes and sibling promises
//! - The total sibling variant (`Node` / `End` / `Unknown` / `Pending`)
//!   and the position triple built from it
//! - Property values for custom (embedder-defined) per-node state
//! - Common error types
//! - The bit filter controlling structured diff output

mod error;
mod filter;
mod id;
mod sibling;
mod value;

pub use error::{DeltaError, DeltaResult};
pub use filter::DiffFilter;
pub use id::{NodeId, PromiseId};
pub use sibling::{Direction, Position, Sibling};
pub use value::Value;
