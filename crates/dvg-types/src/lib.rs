//! Foundation types for document divergence (DVG).
//!
//! This crate provides the document, path, and divergence record types used
//! throughout the DVG system. Every other DVG crate depends on `dvg-types`.
//!
//! # Key Types
//!
//! - [`Document`]: A JSON document snapshot with system fields
//! - [`FlatPath`]: Structural path addressing a node inside a document
//! - [`Digest`]: 20-byte content digest, rendered as lowercase hex
//! - [`Resolution`]: A recorded acknowledgement of an upstream change
//! - [`Divergence`]: One upstream change the subject has not (yet) absorbed
//! - [`FindDivergencesContext`]: The three snapshots plus resolutions

pub mod context;
pub mod digest;
pub mod divergence;
pub mod document;
pub mod error;
pub mod path;
pub mod resolution;

pub use context::{ContextFingerprint, FindDivergencesContext};
pub use digest::Digest;
pub use divergence::{
    ArrayId, Divergence, DivergenceStatus, Effect, EffectKind, ParentArray, SnapshotNode,
    SnapshotRole, Snapshots,
};
pub use document::{key_of, object_type, Document, SYSTEM_FIELDS};
pub use error::TypeError;
pub use path::{FlatPath, PathSegment, TypedSegment};
pub use resolution::{Resolution, ResolutionMarker, Signature};
