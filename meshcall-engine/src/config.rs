use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables of a call session. Every field has a default, so a config file
/// only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transport: TransportConfig,
    /// Lower bound of the random wait before offering to a newly announced peer.
    pub offer_jitter_min_ms: u64,
    pub offer_jitter_max_ms: u64,
    /// How long a peer that left or dropped is kept before teardown.
    pub teardown_grace_ms: u64,
    pub subscribe_timeout_ms: u64,
    /// Video toggles closer together than this are ignored.
    pub video_toggle_debounce_ms: u64,
    pub video_width: u32,
    pub video_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            offer_jitter_min_ms: 1000,
            offer_jitter_max_ms: 2000,
            teardown_grace_ms: 1000,
            subscribe_timeout_ms: 5000,
            video_toggle_debounce_ms: 300,
            video_width: 1280,
            video_height: 720,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }

    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.subscribe_timeout_ms)
    }

    pub fn video_toggle_debounce(&self) -> Duration {
        Duration::from_millis(self.video_toggle_debounce_ms)
    }
}
