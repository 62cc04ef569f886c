//! Configuration loading for CharaSim

use crate::catalog::{ActorRecord, InMemoryCatalog, KeepoutZoneRecord, MapRecord};
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, Default)]
pub struct CharaConfig {
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub sim: SimSettings,
    #[serde(default)]
    pub streaming: StreamingSettings,

    /// Map records seeded into the catalog
    #[serde(default)]
    pub maps: Vec<MapRecord>,
    /// Keepout zones seeded into the catalog
    #[serde(default)]
    pub keepout_zones: Vec<KeepoutZoneRecord>,
    /// Actor registry seeded into the catalog
    #[serde(default)]
    pub actors: Vec<ActorRecord>,
}

/// Grid construction settings
#[derive(Clone, Debug, Deserialize)]
pub struct GridSettings {
    /// Cell edge length in sensor-image pixels (default: 1)
    #[serde(default = "default_cell_size_px")]
    pub cell_size_px: u32,

    /// Grayscale threshold; pixels at or below it are obstacles (default: 127)
    #[serde(default = "default_occupied_threshold")]
    pub occupied_threshold_gray: u8,
}

/// Movement simulation settings
#[derive(Clone, Debug, Deserialize)]
pub struct SimSettings {
    /// Delay between movement steps in milliseconds (default: 100)
    #[serde(default = "default_move_tick_ms")]
    pub move_tick_ms: u64,
}

/// Status streaming settings
#[derive(Clone, Debug, Deserialize)]
pub struct StreamingSettings {
    /// TCP bind address for the actor status feed (default: 127.0.0.1:5600)
    #[serde(default = "default_status_bind_address")]
    pub status_bind_address: String,
}

fn default_cell_size_px() -> u32 {
    1
}

fn default_occupied_threshold() -> u8 {
    127
}

fn default_move_tick_ms() -> u64 {
    100
}

fn default_status_bind_address() -> String {
    "127.0.0.1:5600".to_string()
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size_px: default_cell_size_px(),
            occupied_threshold_gray: default_occupied_threshold(),
        }
    }
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            move_tick_ms: default_move_tick_ms(),
        }
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            status_bind_address: default_status_bind_address(),
        }
    }
}

impl CharaConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Seed an in-memory catalog from the configured records
    pub fn build_catalog(&self) -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        for map in &self.maps {
            catalog.insert_map(map.clone());
        }
        for zone in &self.keepout_zones {
            catalog.add_keepout_zone(zone.clone());
        }
        for actor in &self.actors {
            catalog.add_actor(actor.clone());
        }
        catalog
    }
}
