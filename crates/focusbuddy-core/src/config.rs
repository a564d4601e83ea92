use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

/// Get the local data directory for focusbuddy.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("focusbuddy");
    Ok(path)
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
}

impl Config {
    /// Load `config.toml` from `data_dir`; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("Invalid {}", path.display()))?;
        log::debug!("Loaded tracker config from {}: {config:?}", path.display());
        Ok(config)
    }
}

/// Sampling loop tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Cadence between foreground samples
    pub tick_interval_ms: u64,
    /// Wall-clock gap between samples treated as system sleep rather than usage.
    /// Heuristic value; must stay well above the tick interval.
    pub sleep_gap_threshold_secs: u64,
    /// Upper bound the loop waits on a sink write or focus advisory
    pub side_effect_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            sleep_gap_threshold_secs: 10,
            side_effect_timeout_secs: 5,
        }
    }
}

impl TrackerConfig {
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    #[must_use]
    pub fn sleep_gap_threshold(&self) -> Duration {
        Duration::from_secs(self.sleep_gap_threshold_secs)
    }

    #[must_use]
    pub fn side_effect_timeout(&self) -> Duration {
        Duration::from_secs(self.side_effect_timeout_secs)
    }
}
