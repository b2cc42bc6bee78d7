//! Server configuration.
//!
//! Tick pacing, file locations and the island settings. Loaded from
//! `skyisle.toml`; a missing or unreadable file falls back to defaults.

use serde::{Deserialize, Serialize};
use skyisle_island::IslandSettings;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "skyisle.toml";

/// Server configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // === Tick Settings ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Seconds between parcel snapshots (0 = only on shutdown)
    pub save_interval: u32,

    // === Files ===
    /// Directory holding schematics and `configuration.toml`
    pub template_dir: PathBuf,
    /// Parcel store snapshot
    pub store_path: PathBuf,

    // === Startup ===
    /// Create a spawn island when the store holds none
    pub create_spawn_island: bool,
    /// Owner recorded for the spawn island
    pub spawn_owner: String,

    // === Islands ===
    /// Island lifecycle settings
    pub island: IslandSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            save_interval: 300, // 5 minutes
            template_dir: PathBuf::from("schematics"),
            store_path: PathBuf::from("parcels.json"),
            create_spawn_island: true,
            spawn_owner: "server".to_string(),
            island: IslandSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str::<Self>(&contents) {
                    Ok(mut config) => {
                        config.validate();
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 100);
        self.save_interval = self.save_interval.min(86_400);
        if self.spawn_owner.trim().is_empty() {
            self.spawn_owner = "server".to_string();
        }
        self.island.validate();
    }

    /// Time between ticks in milliseconds.
    #[must_use]
    pub fn tick_millis(&self) -> u64 {
        1000 / u64::from(self.tick_rate.max(1))
    }
}
