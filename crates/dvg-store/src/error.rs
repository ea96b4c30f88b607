use dvg_types::TypeError;

/// Errors from snapshot source operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No revision of the document is known.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The document exists but not at this revision.
    #[error("revision {revision} of document {id} not found")]
    RevisionNotFound { id: String, revision: String },

    /// Documents must carry an `_id` to be stored.
    #[error("document has no _id")]
    MissingId,

    /// Documents must carry a `_rev` to be stored.
    #[error("document {0} has no _rev")]
    MissingRevision(String),

    /// The input is not a valid document.
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] TypeError),

    /// JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing source failed.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
