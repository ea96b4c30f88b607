use serde::{Deserialize, Serialize};

/// Configuration for the divergence engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Paths compared between cooperative yields in async runs.
    pub paths_per_yield: usize,
    /// Maximum number of memoized move tables before the memo is cleared.
    pub move_memo_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            paths_per_yield: 16,
            move_memo_capacity: 256,
        }
    }
}
