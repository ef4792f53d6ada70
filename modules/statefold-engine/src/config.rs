use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// TOML-backed engine configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub mailbox: MailboxConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Upper bound on events processed by one external dispatch, feedback included.
    pub max_cascade: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_cascade: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailboxConfig {
    /// Sleep between quiescence checks in `drain`. 0 means yield to the scheduler.
    pub drain_poll_micros: u64,
}

/// Load and parse a TOML engine config file.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    anyhow::ensure!(
        config.runtime.max_cascade > 0,
        "runtime.max_cascade must be positive in {}",
        path.display()
    );
    Ok(config)
}
