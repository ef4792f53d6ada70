use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use statefold_engine::EngineConfig;

use crate::domain::Counter;

/// Demo configuration file: engine tuning plus counter limits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub counter: CounterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterConfig {
    pub max: i64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            max: Counter::DEFAULT_MAX,
        }
    }
}

impl CounterConfig {
    pub fn kernel(&self) -> Counter {
        Counter::new(self.max)
    }
}

/// Load and parse a TOML demo config file.
pub fn load_config(path: &Path) -> Result<DemoConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: DemoConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    anyhow::ensure!(
        config.counter.max > 0 && config.counter.max <= Counter::MAX_LIMIT,
        "counter.max must be between 1 and {} in {}",
        Counter::MAX_LIMIT,
        path.display()
    );
    Ok(config)
}
