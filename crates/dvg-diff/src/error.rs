//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiffError {
    /// Flattening needs an object or array at the root.
    #[error("cannot flatten a {0}: expected an object or array")]
    NotAContainer(&'static str),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
