//! Content hashing for document divergence.
//!
//! Provides a key-order independent fingerprint for any JSON value and the
//! canonical text form it is computed from. The digest is a diffing
//! fingerprint, not a security boundary.

pub mod canonical;
pub mod hasher;

pub use canonical::{canonical_json, canonical_text, number_text};
pub use hasher::{ContentHasher, HasherError, HasherResult};
