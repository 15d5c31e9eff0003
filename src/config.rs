//! Engine configuration
//!
//! Loaded from a TOML file with `[server]` and `[physics]` sections. Any key
//! left out falls back to the values in [`crate::constants`].

use crate::constants::rooms;
use crate::network::protocol::DEFAULT_TCP_PORT;
use crate::physics::PhysicsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub physics: PhysicsConfig,
}

/// Room server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_players_per_room: usize,
    pub countdown_secs: u64,
    pub day_cycle_secs: u64,
    pub time_sync_interval_secs: u64,
    pub stale_room_timeout_secs: u64,
    pub cleanup_interval_secs: u64,
    pub position_relay_hz: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_TCP_PORT),
            max_players_per_room: rooms::MAX_PLAYERS_PER_ROOM,
            countdown_secs: rooms::COUNTDOWN_SECS,
            day_cycle_secs: rooms::DAY_CYCLE_SECS,
            time_sync_interval_secs: rooms::TIME_SYNC_INTERVAL_SECS,
            stale_room_timeout_secs: rooms::STALE_ROOM_TIMEOUT_SECS,
            cleanup_interval_secs: rooms::CLEANUP_INTERVAL_SECS,
            position_relay_hz: rooms::POSITION_RELAY_HZ,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if server.max_players_per_room == 0 {
            return Err(ConfigError::Invalid {
                key: "server.max_players_per_room",
                reason: "must be at least 1".to_string(),
            });
        }
        if server.day_cycle_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "server.day_cycle_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if server.time_sync_interval_secs == 0 || server.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "server intervals",
                reason: "timer intervals must be at least 1 second".to_string(),
            });
        }
        if server.position_relay_hz == 0 {
            return Err(ConfigError::Invalid {
                key: "server.position_relay_hz",
                reason: "must be at least 1".to_string(),
            });
        }

        let physics = &self.physics;
        if !(physics.player_width > 0.0 && physics.player_width < 1.0) {
            return Err(ConfigError::Invalid {
                key: "physics.player_width",
                reason: format!("{} is outside (0, 1)", physics.player_width),
            });
        }
        if physics.player_height <= 0.0 || physics.eye_height > physics.player_height {
            return Err(ConfigError::Invalid {
                key: "physics.player_height",
                reason: "height must be positive and contain the eye".to_string(),
            });
        }
        Ok(())
    }
}

/// Read and validate a TOML config file
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EngineConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}
