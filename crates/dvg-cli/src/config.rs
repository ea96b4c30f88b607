use std::fs;
use std::path::Path;

use anyhow::Context;
use dvg_cache::CacheConfig;
use dvg_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Settings read from `--config`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DvgConfig {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
}

impl DvgConfig {
    /// Load from a TOML file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
