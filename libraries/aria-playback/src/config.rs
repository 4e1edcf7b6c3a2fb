//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default key of the persisted session record
pub const DEFAULT_STORAGE_KEY: &str = "aria.player-state";

/// Playback engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Key the session is persisted under (default: "aria.player-state")
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Time a load may stay pending before it fails (default: 15000)
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    /// Past this position, `previous()` restarts the track (default: 3.0)
    #[serde(default = "default_previous_restart_threshold_secs")]
    pub previous_restart_threshold_secs: f64,

    /// Start playing after `load_playlist` / first `add_to_playlist` (default: true)
    #[serde(default = "default_autoplay_on_load")]
    pub autoplay_on_load: bool,

    /// Volume used when no session is restored (default: 1.0)
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f64,

    /// Fixed seed for reproducible shuffle orders
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

impl EngineConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            load_timeout_ms: default_load_timeout_ms(),
            previous_restart_threshold_secs: default_previous_restart_threshold_secs(),
            autoplay_on_load: default_autoplay_on_load(),
            initial_volume: default_initial_volume(),
            shuffle_seed: None,
        }
    }
}

// Default values
fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_load_timeout_ms() -> u64 {
    15_000
}

fn default_previous_restart_threshold_secs() -> f64 {
    3.0
}

fn default_autoplay_on_load() -> bool {
    true
}

fn default_initial_volume() -> f64 {
    1.0
}
