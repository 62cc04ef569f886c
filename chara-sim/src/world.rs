//! Layered world cache.
//!
//! One [`WorldBundle`] per active map: base occupancy from the sensor
//! image, keepout zones frozen at build time, dynamic obstacles rebuilt
//! from their registry on every change, and the composite union of the
//! three. Exactly one bundle is cached at a time; a build replaces the
//! slot with a single reference swap, so readers observe either the old
//! or the new bundle in full.

use crate::broadcast::LatestHub;
use crate::catalog::Catalog;
use crate::config::GridSettings;
use crate::error::{Result, SimError};
use crossbeam_channel::Receiver;
use kshetra_map::{polygon, raster, MapPoint, OccupancyGrid};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Cached layered world for one map.
#[derive(Clone, Debug)]
pub struct WorldBundle {
    /// Map this bundle was built for
    pub map_id: i64,
    /// Grid width in cells
    pub width_cells: usize,
    /// Grid height in cells
    pub height_cells: usize,
    /// Cell edge length in pixels
    pub cell_size_px: u32,
    /// Static obstacles from the sensor image
    pub base: OccupancyGrid,
    /// Keepout zones as of build time; immutable for the bundle's lifetime
    pub keepout: OccupancyGrid,
    /// Dynamic obstacles, recomputed from `dynamic_objects` on every change
    pub dynamic: OccupancyGrid,
    /// Elementwise union of base, keepout, and dynamic
    pub composite: OccupancyGrid,
    /// Dynamic-object polygons in grid scale, keyed by object id
    pub dynamic_objects: HashMap<String, Vec<MapPoint>>,
}

impl WorldBundle {
    /// Whether this bundle was built with the exact same grid configuration.
    ///
    /// Dynamic objects carry over into a rebuild only when this holds;
    /// otherwise their grid-scale coordinates would no longer line up.
    pub fn has_same_grid_config(
        &self,
        map_id: i64,
        width_cells: usize,
        height_cells: usize,
        cell_size_px: u32,
    ) -> bool {
        self.map_id == map_id
            && self.width_cells == width_cells
            && self.height_cells == height_cells
            && self.cell_size_px == cell_size_px
    }
}

/// A composite-grid replacement event on the world feed.
#[derive(Clone, Debug)]
pub struct GridUpdate {
    /// Map the grid belongs to
    pub map_id: i64,
    /// Deep-copy snapshot of the composite grid
    pub grid: OccupancyGrid,
}

/// Single active-map world cache.
pub struct WorldCache {
    catalog: Arc<dyn Catalog>,
    settings: GridSettings,
    slot: RwLock<Option<Arc<WorldBundle>>>,
    hub: LatestHub<GridUpdate>,
}

impl WorldCache {
    /// Create an empty cache over a catalog
    pub fn new(catalog: Arc<dyn Catalog>, settings: GridSettings) -> Self {
        Self {
            catalog,
            settings,
            slot: RwLock::new(None),
            hub: LatestHub::new(),
        }
    }

    /// Build the world for `map_id` with the configured default cell size.
    pub fn build(&self, map_id: i64) -> Result<OccupancyGrid> {
        self.build_with_cell_size(map_id, self.settings.cell_size_px)
    }

    /// Build the world for `map_id` and cache it, replacing any previous
    /// bundle. Returns a deep-copy snapshot of the composite grid.
    ///
    /// Keepout zones enabled at this moment are baked into the bundle and
    /// stay frozen until the next build. Dynamic objects from the previous
    /// bundle carry over only when map id and grid configuration match
    /// exactly; otherwise the registry resets empty.
    pub fn build_with_cell_size(&self, map_id: i64, cell_size_px: u32) -> Result<OccupancyGrid> {
        let map = self
            .catalog
            .find_map(map_id)
            .ok_or(SimError::MapNotFound(map_id))?;
        if map.sensor_image_path.trim().is_empty() {
            return Err(SimError::InvalidState(format!(
                "sensor map image path is empty for map {map_id}"
            )));
        }

        let base = raster::rasterize_file_with_threshold(
            &map.sensor_image_path,
            cell_size_px,
            self.settings.occupied_threshold_gray,
        )?;
        let width_cells = base.width_cells();
        let height_cells = base.height_cells();

        let keepout = self.bake_keepout_layer(map_id, &base)?;

        // Carry dynamic objects across the rebuild only under an exact
        // grid-config match; their coordinates are grid-scale.
        let dynamic_objects = {
            let slot = self.slot.read();
            match slot.as_ref() {
                Some(prev)
                    if prev.has_same_grid_config(
                        map_id,
                        width_cells,
                        height_cells,
                        cell_size_px,
                    ) =>
                {
                    prev.dynamic_objects.clone()
                }
                _ => HashMap::new(),
            }
        };

        let dynamic = rebuild_dynamic_layer(&base, &dynamic_objects);
        let composite = OccupancyGrid::union_of(&base, &keepout, &dynamic);

        let bundle = Arc::new(WorldBundle {
            map_id,
            width_cells,
            height_cells,
            cell_size_px,
            base,
            keepout,
            dynamic,
            composite: composite.clone(),
            dynamic_objects,
        });

        *self.slot.write() = Some(bundle);
        info!(
            "world built: map={} grid={}x{}@{}px",
            map_id, width_cells, height_cells, cell_size_px
        );
        self.hub.publish(GridUpdate {
            map_id,
            grid: composite.clone(),
        });
        Ok(composite)
    }

    /// Deep-copy snapshot of the cached composite, if the slot holds `map_id`.
    pub fn cached(&self, map_id: i64) -> Option<OccupancyGrid> {
        let slot = self.slot.read();
        slot.as_ref()
            .filter(|bundle| bundle.map_id == map_id)
            .map(|bundle| bundle.composite.clone())
    }

    /// Snapshot of the full cached bundle (diagnostics and tests).
    pub fn cached_bundle(&self) -> Option<Arc<WorldBundle>> {
        self.slot.read().clone()
    }

    /// Add or replace a dynamic obstacle polygon.
    ///
    /// `vertices_text` is free-form text of pixel-space coordinates.
    /// Idempotent: re-applying the same upsert leaves the composite
    /// unchanged. Returns a snapshot of the recomputed composite.
    pub fn upsert_dynamic_object(
        &self,
        map_id: i64,
        object_id: &str,
        vertices_text: &str,
    ) -> Result<OccupancyGrid> {
        let polygon_in_pixels = polygon::parse_vertices(vertices_text)
            .map_err(|e| SimError::InvalidInput(e.to_string()))?;
        self.mutate_dynamic_objects(map_id, move |objects, cell_size_px| {
            let polygon_in_grid = polygon::to_grid_scale(&polygon_in_pixels, cell_size_px);
            objects.insert(object_id.to_string(), polygon_in_grid);
        })
    }

    /// Remove a dynamic obstacle. Removing an absent id changes nothing.
    pub fn remove_dynamic_object(&self, map_id: i64, object_id: &str) -> Result<OccupancyGrid> {
        let object_id = object_id.to_string();
        self.mutate_dynamic_objects(map_id, move |objects, _| {
            objects.remove(&object_id);
        })
    }

    /// Drop every dynamic obstacle.
    pub fn clear_dynamic_objects(&self, map_id: i64) -> Result<OccupancyGrid> {
        self.mutate_dynamic_objects(map_id, |objects, _| objects.clear())
    }

    /// Clear the cache slot if it currently holds `map_id`.
    pub fn evict(&self, map_id: i64) {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|bundle| bundle.map_id == map_id) {
            *slot = None;
            self.hub.clear_latest();
            info!("world evicted: map={}", map_id);
        }
    }

    /// Live feed of composite-grid replacements, any map.
    ///
    /// New subscribers immediately receive the current state when a bundle
    /// is cached.
    pub fn subscribe(&self) -> Receiver<GridUpdate> {
        self.hub.subscribe()
    }

    /// Live feed filtered to one map.
    pub fn subscribe_map(&self, map_id: i64) -> Receiver<GridUpdate> {
        self.hub.subscribe_filtered(move |update| update.map_id == map_id)
    }

    /// Build-if-absent, then mutate the dynamic-object registry and
    /// recompute the dynamic and composite layers from scratch.
    fn mutate_dynamic_objects(
        &self,
        map_id: i64,
        apply: impl FnOnce(&mut HashMap<String, Vec<MapPoint>>, u32),
    ) -> Result<OccupancyGrid> {
        self.ensure_bundle(map_id)?;

        let (bundle_map_id, composite) = {
            let mut slot = self.slot.write();
            let bundle = slot
                .as_ref()
                .ok_or_else(|| SimError::InvalidState("world bundle cache is empty".into()))?
                .clone();

            let mut dynamic_objects = bundle.dynamic_objects.clone();
            apply(&mut dynamic_objects, bundle.cell_size_px);

            let dynamic = rebuild_dynamic_layer(&bundle.base, &dynamic_objects);
            let composite = OccupancyGrid::union_of(&bundle.base, &bundle.keepout, &dynamic);
            let bundle_map_id = bundle.map_id;

            *slot = Some(Arc::new(WorldBundle {
                map_id: bundle_map_id,
                width_cells: bundle.width_cells,
                height_cells: bundle.height_cells,
                cell_size_px: bundle.cell_size_px,
                base: bundle.base.clone(),
                keepout: bundle.keepout.clone(),
                dynamic,
                composite: composite.clone(),
                dynamic_objects,
            }));
            (bundle_map_id, composite)
        };

        self.hub.publish(GridUpdate {
            map_id: bundle_map_id,
            grid: composite.clone(),
        });
        Ok(composite)
    }

    fn ensure_bundle(&self, map_id: i64) -> Result<()> {
        let needs_build = {
            let slot = self.slot.read();
            !slot.as_ref().is_some_and(|bundle| bundle.map_id == map_id)
        };
        if needs_build {
            self.build(map_id)?;
        }
        Ok(())
    }

    /// Overlay every currently-enabled keepout zone onto a fresh layer.
    fn bake_keepout_layer(&self, map_id: i64, base: &OccupancyGrid) -> Result<OccupancyGrid> {
        let mut keepout = OccupancyGrid::empty(
            base.width_cells(),
            base.height_cells(),
            base.cell_size_px(),
        );
        for zone in self.catalog.enabled_keepout_zones(map_id) {
            let polygon_in_pixels = polygon::parse_vertices(&zone.vertices_text)
                .map_err(|e| SimError::InvalidInput(format!("keepout zone {}: {e}", zone.name)))?;
            let polygon_in_grid = polygon::to_grid_scale(&polygon_in_pixels, base.cell_size_px());
            polygon::overlay_polygon(&mut keepout, &polygon_in_grid);
        }
        Ok(keepout)
    }
}

/// Allocate a fresh all-zero layer and overlay every registered polygon.
///
/// There is no incremental removal; recomputing from the whole registry is
/// what makes remove and clear exact inverses of their upserts.
fn rebuild_dynamic_layer(
    base: &OccupancyGrid,
    dynamic_objects: &HashMap<String, Vec<MapPoint>>,
) -> OccupancyGrid {
    let mut dynamic = OccupancyGrid::empty(
        base.width_cells(),
        base.height_cells(),
        base.cell_size_px(),
    );
    for polygon_in_grid in dynamic_objects.values() {
        polygon::overlay_polygon(&mut dynamic, polygon_in_grid);
    }
    dynamic
}
