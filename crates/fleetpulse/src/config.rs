//! Configuration management for fleetpulse.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_CAPACITY;
use crate::error::{Error, Result};
use crate::simulator::Scenario;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "fleetpulse";

/// Environment variable prefix.
const ENV_PREFIX: &str = "FLEETPULSE_";

/// J1939 EEC1 (Electronic Engine Controller 1).
pub const DEFAULT_PROTOCOL_ID: &str = "0x0CF00400";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLEETPULSE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/fleetpulse/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telemetry buffer configuration.
    pub buffer: BufferConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Simulator configuration.
    pub simulator: SimulatorConfig,
}

/// Telemetry buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Frames retained per equipment.
    pub capacity: usize,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen: SocketAddr,
    /// Frames returned by `recent` when the caller gives no count.
    pub default_recent_count: i64,
}

/// Simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Interval between ticks in milliseconds.
    pub tick_interval_ms: u64,
    /// How long a run lasts, in simulated seconds.
    pub duration_secs: u64,
    /// Target trajectory profile.
    pub scenario: Scenario,
    /// Fraction of the distance to target covered per tick.
    pub smoothing_factor: f64,
    /// Delay between successive equipment start-ups in milliseconds.
    pub stagger_ms: u64,
    /// Seed for the noise generator. Random when unset.
    pub seed: Option<u64>,
    /// Log a status line every this many frames. Zero disables.
    pub status_every: u64,
    /// Base URL of a remote ingestion boundary. In-process when unset.
    pub target_url: Option<String>,
    /// Give up on a remote submission after this many milliseconds.
    pub request_timeout_ms: u64,
    /// Equipment to drive.
    pub equipment: Vec<EquipmentConfig>,
}

/// One simulated piece of equipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentConfig {
    /// Opaque equipment id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Protocol id stamped on every frame.
    #[serde(default = "default_protocol_id")]
    pub protocol_id: String,
}

fn default_protocol_id() -> String {
    DEFAULT_PROTOCOL_ID.to_string()
}

impl EquipmentConfig {
    /// Create an equipment entry on the default protocol id.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protocol_id: default_protocol_id(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 5038)),
            default_recent_count: 60,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250, // 4 frames per second, a realistic CAN rate
            duration_secs: 120,
            scenario: Scenario::Normal,
            smoothing_factor: 0.05,
            stagger_ms: 2000,
            seed: None,
            status_every: 20,
            target_url: None,
            request_timeout_ms: 2000,
            equipment: default_equipment(),
        }
    }
}

/// Default simulated fleet.
fn default_equipment() -> Vec<EquipmentConfig> {
    vec![
        EquipmentConfig::new("CAT320", "Caterpillar 320D Excavator"),
        EquipmentConfig::new("KOMATSU350", "Komatsu PC350 Excavator"),
        EquipmentConfig::new("VOLVO240", "Volvo EC240B Excavator"),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.buffer.capacity == 0 {
            return Err(invalid("buffer.capacity must be greater than 0"));
        }

        let sim = &self.simulator;
        if sim.tick_interval_ms == 0 {
            return Err(invalid("simulator.tick_interval_ms must be greater than 0"));
        }
        if sim.duration_secs == 0 {
            return Err(invalid("simulator.duration_secs must be greater than 0"));
        }
        if sim.request_timeout_ms == 0 {
            return Err(invalid("simulator.request_timeout_ms must be greater than 0"));
        }
        if !(sim.smoothing_factor > 0.0 && sim.smoothing_factor <= 1.0) {
            return Err(invalid(format!(
                "simulator.smoothing_factor ({}) must be in (0, 1]",
                sim.smoothing_factor
            )));
        }

        let mut seen = HashSet::new();
        for equipment in &sim.equipment {
            if equipment.id.trim().is_empty() {
                return Err(invalid("simulator.equipment ids must not be empty"));
            }
            if !seen.insert(equipment.id.as_str()) {
                return Err(invalid(format!(
                    "duplicate simulator equipment id: {}",
                    equipment.id
                )));
            }
            if equipment.protocol_id.trim().is_empty() {
                return Err(invalid(format!(
                    "simulator equipment {} has an empty protocol_id",
                    equipment.id
                )));
            }
        }

        Ok(())
    }

    /// Get the simulator tick interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.simulator.tick_interval_ms)
    }

    /// Get the simulated run length as a Duration.
    #[must_use]
    pub fn simulation_duration(&self) -> Duration {
        Duration::from_secs(self.simulator.duration_secs)
    }

    /// Get the remote submission timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.simulator.request_timeout_ms)
    }

    /// Get the equipment start-up stagger as a Duration.
    #[must_use]
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.simulator.stagger_ms)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
