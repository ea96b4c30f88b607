//! Snapshot sources for divergence computations.
//!
//! A computation needs three revisions: the upstream document as it was when
//! the subject forked from it, the upstream document now, and the subject
//! now. This crate defines where those come from.
//!
//! # Sources
//!
//! All backends implement the [`SnapshotSource`] trait:
//!
//! - [`InMemorySnapshotStore`]: keeps every revision of every document in
//!   memory, for tests, tools and embedding
//!
//! [`load_context`] assembles a [`FindDivergencesContext`](dvg_types::FindDivergencesContext)
//! from any source given a [`ForkRef`].
//!
//! # Rules
//!
//! 1. A missing document or revision is `Ok(None)`, never an error.
//! 2. Documents are stored as given; the store never interprets content
//!    beyond `_id` and `_rev`.

pub mod context;
pub mod error;
pub mod memory;
pub mod traits;

pub use context::{load_context, ForkRef};
pub use error::{StoreError, StoreResult};
pub use memory::InMemorySnapshotStore;
pub use traits::SnapshotSource;
