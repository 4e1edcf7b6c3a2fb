/// Headless player configuration
use anyhow::{bail, Context, Result};
use aria_playback::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Directory holding the persisted session
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// How often events are drained and the load timeout checked
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default = "default_simulator")]
    pub simulator: SimulatorSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatorSettings {
    /// Delay between a load and its metadata
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    #[serde(default = "default_time_update_interval_ms")]
    pub time_update_interval_ms: u64,

    /// Duration used for tracks that do not carry one
    #[serde(default = "default_track_seconds")]
    pub default_track_seconds: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        default_simulator()
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// Without an explicit `path`, `aria.toml` in the working directory is
    /// used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings.add_source(config::File::with_name("aria").required(false)),
        };

        // Override with environment variables (ARIA_STATE_DIR, ARIA_ENGINE__LOAD_TIMEOUT_MS, ...)
        settings = settings.add_source(
            config::Environment::with_prefix("ARIA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build().context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }

        if self.engine.load_timeout_ms == 0 {
            bail!("engine.load_timeout_ms must be greater than zero");
        }

        if !(0.0..=1.0).contains(&self.engine.initial_volume) {
            bail!(
                "engine.initial_volume must be within [0, 1], got {}",
                self.engine.initial_volume
            );
        }

        if self.engine.storage_key.trim().is_empty() {
            bail!("engine.storage_key must not be empty");
        }

        if !(self.simulator.default_track_seconds.is_finite()
            && self.simulator.default_track_seconds > 0.0)
        {
            bail!("simulator.default_track_seconds must be positive");
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            tick_interval_ms: default_tick_interval_ms(),
            engine: EngineConfig::default(),
            simulator: default_simulator(),
        }
    }
}

// Default values
fn default_state_dir() -> PathBuf {
    PathBuf::from("./data/state")
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_simulator() -> SimulatorSettings {
    SimulatorSettings {
        load_latency_ms: default_load_latency_ms(),
        time_update_interval_ms: default_time_update_interval_ms(),
        default_track_seconds: default_track_seconds(),
    }
}

fn default_load_latency_ms() -> u64 {
    150
}

fn default_time_update_interval_ms() -> u64 {
    250
}

fn default_track_seconds() -> f64 {
    30.0
}
