/// Faults raised while evaluating a single path.
///
/// A fault aborts only the path it occurred on; the rest of the batch is
/// still computed and the fault is reported alongside the divergences.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum DivergenceError {
    /// A keyed array member was resolved with something other than its
    /// upstream position.
    #[error("expected upstream position signature at `{path}`, got {found}")]
    ExpectedPositionSignature { path: String, found: &'static str },

    /// A value was resolved with something other than a content hash.
    #[error("expected hash signature at `{path}`, got {found}")]
    ExpectedHashSignature { path: String, found: &'static str },

    /// The hash signature is not a valid digest.
    #[error("malformed hash signature at `{path}`: {reason}")]
    MalformedSignature { path: String, reason: String },
}

impl DivergenceError {
    /// The path the fault occurred on.
    pub fn path(&self) -> &str {
        match self {
            Self::ExpectedPositionSignature { path, .. }
            | Self::ExpectedHashSignature { path, .. }
            | Self::MalformedSignature { path, .. } => path,
        }
    }
}

/// Convenience alias for per-path engine results.
pub type EngineResult<T> = Result<T, DivergenceError>;
