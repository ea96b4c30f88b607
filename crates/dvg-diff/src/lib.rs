//! Structural diff primitives for document divergence.
//!
//! Flattens documents into addressable paths, detects moved members of
//! keyed arrays, and classifies the effect of a change at a path.
//!
//! # Key Types
//!
//! - [`Flatten`] / [`FlatEntry`]: Lazy depth-first walk over a document
//! - [`MoveDetector`] / [`MoveTable`]: Memoized LCS-based move detection
//! - [`classify_values`] / [`classify_hashes`]: Effect decision table

pub mod effect;
pub mod error;
pub mod flatten;
pub mod moves;

pub use effect::{classify_hashes, classify_values};
pub use error::{DiffError, DiffResult};
pub use flatten::{
    flatten_array, flatten_object, flatten_value, node_type, ArrayIds, FlatEntry, Flatten,
    ParentRef,
};
pub use moves::{find_moves, lcs, MoveDetector, MoveStats, MoveTable};
