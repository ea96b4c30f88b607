/// Errors produced by the divergence cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Entries spawn workers and need a tokio runtime on the calling thread.
    #[error("no tokio runtime available to run divergence workers")]
    NoRuntime,

    /// The entry was evicted or invalidated and its worker has stopped.
    #[error("cache entry closed")]
    Closed,
}

/// Convenience alias used throughout the cache crate.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
