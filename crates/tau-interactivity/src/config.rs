//! Service configuration: defaults, `TAU_INTERACTIVITY_*` env overrides, and JSON files.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CANCEL_PHRASE: &str = "cancel";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_HUB_CAPACITY: usize = 256;

/// Runtime settings shared by every collector started from one service.
///
/// # Examples
///
/// ```
/// use tau_interactivity::InteractivityConfig;
///
/// let config = InteractivityConfig {
///     default_timeout_ms: 15_000,
///     ..InteractivityConfig::default()
/// };
/// assert_eq!(config.cancel_phrase, "cancel");
/// assert_eq!(config.default_timeout().as_secs(), 15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractivityConfig {
    pub default_timeout_ms: u64,
    pub cancel_phrase: String,
    pub action_timeout_ms: u64,
    pub hub_capacity: usize,
}

impl Default for InteractivityConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            cancel_phrase: DEFAULT_CANCEL_PHRASE.to_string(),
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            hub_capacity: DEFAULT_HUB_CAPACITY,
        }
    }
}

impl InteractivityConfig {
    /// Build config from `TAU_INTERACTIVITY_*` env vars with safe defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_timeout_ms: env_positive("TAU_INTERACTIVITY_DEFAULT_TIMEOUT_MS")
                .unwrap_or(defaults.default_timeout_ms),
            cancel_phrase: std::env::var("TAU_INTERACTIVITY_CANCEL_PHRASE")
                .ok()
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.cancel_phrase),
            action_timeout_ms: env_positive("TAU_INTERACTIVITY_ACTION_TIMEOUT_MS")
                .unwrap_or(defaults.action_timeout_ms),
            hub_capacity: env_positive("TAU_INTERACTIVITY_HUB_CAPACITY")
                .unwrap_or(defaults.hub_capacity),
        }
    }

    /// Loads a JSON config file; missing keys fall back to defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse interactivity config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            bail!("default_timeout_ms must be greater than 0");
        }
        if self.cancel_phrase.trim().is_empty() {
            bail!("cancel_phrase cannot be empty");
        }
        if self.hub_capacity == 0 {
            bail!("hub_capacity must be greater than 0");
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms.max(1))
    }
}

fn env_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}
