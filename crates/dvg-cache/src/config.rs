use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the [`DivergenceCache`](crate::DivergenceCache).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries before the least recently used one is
    /// evicted.
    pub capacity: usize,
    /// Quiet period after the last context write before a computation starts.
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            debounce: Duration::from_secs(1),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.debounce, Duration::from_secs(1));
    }

    #[test]
    fn debounce_is_written_in_milliseconds() {
        let json = serde_json::to_value(CacheConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({"capacity": 10, "debounce_ms": 1000}));

        let config: CacheConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.capacity, 10);
    }
}
