//! Collaborator data sources.
//!
//! The simulation core does not own persistence. Map records, keepout
//! zones, and the actor registry come from a [`Catalog`] implementation;
//! the daemon ships an in-memory one seeded from configuration.

use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;

/// Map record: where the facility's sensor image lives
#[derive(Clone, Debug, Deserialize)]
pub struct MapRecord {
    /// Map identifier
    pub id: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Path to the raster sensor image of the facility
    pub sensor_image_path: String,
}

/// Keepout zone: a configured impassable polygon, baked in at build time
#[derive(Clone, Debug, Deserialize)]
pub struct KeepoutZoneRecord {
    /// Map this zone belongs to
    pub map_id: i64,
    /// Zone name (unique per map by convention)
    pub name: String,
    /// Only enabled zones enter the keepout layer
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-form text containing at least 3 pixel-space (x, y) pairs
    pub vertices_text: String,
}

/// Actor registry entry
#[derive(Clone, Debug, Deserialize)]
pub struct ActorRecord {
    /// Actor identifier
    pub id: i64,
    /// Footprint size in cells, clamped to at least 1
    #[serde(default = "default_size")]
    pub size: u32,
    /// Disabled actors are not seeded
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_size() -> u32 {
    1
}

/// Source of map, keepout-zone, and actor records.
///
/// The seam where a persistence layer would plug in.
pub trait Catalog: Send + Sync {
    /// Look up a map record by id
    fn find_map(&self, map_id: i64) -> Option<MapRecord>;

    /// Zones for `map_id` with `enabled == true`, in registration order
    fn enabled_keepout_zones(&self, map_id: i64) -> Vec<KeepoutZoneRecord>;

    /// Enabled actors in registration order
    fn active_actors(&self) -> Vec<ActorRecord>;
}

/// In-memory catalog seeded from configuration.
#[derive(Default)]
pub struct InMemoryCatalog {
    maps: RwLock<HashMap<i64, MapRecord>>,
    zones: RwLock<Vec<KeepoutZoneRecord>>,
    actors: RwLock<Vec<ActorRecord>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a map record
    pub fn insert_map(&self, map: MapRecord) {
        self.maps.write().insert(map.id, map);
    }

    /// Register a keepout zone
    pub fn add_keepout_zone(&self, zone: KeepoutZoneRecord) {
        self.zones.write().push(zone);
    }

    /// Toggle a zone by map id and name; returns whether a zone matched.
    ///
    /// Toggling has no effect on an already-built world until the next
    /// build: the keepout layer is frozen into the bundle.
    pub fn set_zone_enabled(&self, map_id: i64, name: &str, enabled: bool) -> bool {
        let mut zones = self.zones.write();
        let mut matched = false;
        for zone in zones.iter_mut() {
            if zone.map_id == map_id && zone.name == name {
                zone.enabled = enabled;
                matched = true;
            }
        }
        matched
    }

    /// Register an actor
    pub fn add_actor(&self, actor: ActorRecord) {
        self.actors.write().push(actor);
    }
}

impl Catalog for InMemoryCatalog {
    fn find_map(&self, map_id: i64) -> Option<MapRecord> {
        self.maps.read().get(&map_id).cloned()
    }

    fn enabled_keepout_zones(&self, map_id: i64) -> Vec<KeepoutZoneRecord> {
        self.zones
            .read()
            .iter()
            .filter(|z| z.map_id == map_id && z.enabled)
            .cloned()
            .collect()
    }

    fn active_actors(&self) -> Vec<ActorRecord> {
        self.actors
            .read()
            .iter()
            .filter(|a| a.enabled)
            .cloned()
            .collect()
    }
}
