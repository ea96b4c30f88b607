//! Live divergence computations, keyed by `(upstream id, subject id)`.
//!
//! A [`DivergenceCache`] keeps at most [`CacheConfig::capacity`] entries.
//! Each entry runs one background worker that debounces the contexts written
//! to its [`ContextSink`], skips contexts equivalent to the last one it
//! computed, and publishes the newest [`DivergenceReport`](dvg_engine::DivergenceReport)
//! to every [`ResultStream`] observing the entry. A context written while a
//! computation is running supersedes it; the superseded run publishes
//! nothing.

pub mod cache;
pub mod config;
pub mod error;
pub mod lru;
pub mod stream;

pub use cache::{CacheKey, DivergenceCache, DivergenceHandle};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use lru::LruStore;
pub use stream::{ContextSink, DivergenceState, ResultStream};
