//! World cache integration: build, layering, dynamic objects, eviction.

use chara_sim::config::GridSettings;
use chara_sim::{InMemoryCatalog, KeepoutZoneRecord, MapRecord, SimError, WorldCache};
use image::{Rgb, RgbImage};
use kshetra_map::pathfinding::{find_path, PathFailure};
use kshetra_map::{GridPoint, OccupancyGrid};
use std::path::Path;
use std::sync::Arc;

fn write_white_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
        .save(path)
        .unwrap();
}

fn catalog_with_map(dir: &Path, map_id: i64) -> Arc<InMemoryCatalog> {
    let image_path = dir.join(format!("map_{map_id}.png"));
    write_white_png(&image_path, 16, 16);

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.insert_map(MapRecord {
        id: map_id,
        name: format!("map {map_id}"),
        sensor_image_path: image_path.to_string_lossy().into_owned(),
    });
    catalog
}

fn cache_with_cell_size(catalog: Arc<InMemoryCatalog>, cell_size_px: u32) -> WorldCache {
    WorldCache::new(
        catalog,
        GridSettings {
            cell_size_px,
            occupied_threshold_gray: 127,
        },
    )
}

fn assert_composite_is_union(cache: &WorldCache) {
    let bundle = cache.cached_bundle().expect("bundle cached");
    let expected = OccupancyGrid::union_of(&bundle.base, &bundle.keepout, &bundle.dynamic);
    assert_eq!(bundle.composite, expected);
}

#[test]
fn build_applies_enabled_keepout_zones_only() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 7);
    catalog.add_keepout_zone(KeepoutZoneRecord {
        map_id: 7,
        name: "corner".into(),
        enabled: true,
        vertices_text: "[[0,0],[8,0],[8,8],[0,8]]".into(),
    });
    catalog.add_keepout_zone(KeepoutZoneRecord {
        map_id: 7,
        name: "disabled".into(),
        enabled: false,
        vertices_text: "[[8,8],[16,8],[16,16],[8,16]]".into(),
    });

    let cache = cache_with_cell_size(catalog, 4);
    let grid = cache.build(7).unwrap();

    assert_eq!(grid.width_cells(), 4);
    assert_eq!(grid.height_cells(), 4);
    for y in 0..4 {
        for x in 0..4 {
            let expected = x < 2 && y < 2;
            assert_eq!(grid.is_occupied(x, y), expected, "cell ({x},{y})");
        }
    }
    assert_composite_is_union(&cache);

    // Planning hits the keepout block exactly as the layer says.
    let blocked = find_path(&grid, GridPoint::new(0, 0), GridPoint::new(3, 3));
    assert_eq!(blocked.reason, Some(PathFailure::StartBlocked));
    let blocked = find_path(&grid, GridPoint::new(3, 3), GridPoint::new(0, 0));
    assert_eq!(blocked.reason, Some(PathFailure::TargetBlocked));
}

#[test]
fn cached_returns_none_for_other_map_or_empty_slot() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);

    assert!(cache.cached(1).is_none());
    cache.build(1).unwrap();
    assert!(cache.cached(1).is_some());
    assert!(cache.cached(2).is_none());
}

#[test]
fn cached_snapshots_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    cache.build(1).unwrap();

    let mut snapshot = cache.cached(1).unwrap();
    snapshot.set_occupied(0, 0);

    let fresh = cache.cached(1).unwrap();
    assert!(!fresh.is_occupied(0, 0));
}

#[test]
fn dynamic_objects_are_idempotent_and_reversible() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);

    let before = cache.build(1).unwrap();

    // Upserting without a prior build would also have built the world.
    let once = cache
        .upsert_dynamic_object(1, "cart", "[[8,8],[16,8],[16,16],[8,16]]")
        .unwrap();
    assert!(once.is_occupied(2, 2));
    assert!(once.is_occupied(3, 3));
    assert!(!once.is_occupied(0, 0));
    assert_composite_is_union(&cache);

    let twice = cache
        .upsert_dynamic_object(1, "cart", "[[8,8],[16,8],[16,16],[8,16]]")
        .unwrap();
    assert_eq!(once, twice);

    let removed = cache.remove_dynamic_object(1, "cart").unwrap();
    assert_eq!(removed, before);

    // Removing an absent id changes nothing.
    let removed_again = cache.remove_dynamic_object(1, "cart").unwrap();
    assert_eq!(removed_again, before);
}

#[test]
fn clear_drops_every_dynamic_object() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    let before = cache.build(1).unwrap();

    cache
        .upsert_dynamic_object(1, "a", "[[0,0],[8,0],[8,8],[0,8]]")
        .unwrap();
    cache
        .upsert_dynamic_object(1, "b", "[[8,8],[16,8],[16,16],[8,16]]")
        .unwrap();

    let cleared = cache.clear_dynamic_objects(1).unwrap();
    assert_eq!(cleared, before);
    assert!(cache.cached_bundle().unwrap().dynamic_objects.is_empty());
}

#[test]
fn malformed_vertices_are_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    cache.build(1).unwrap();

    let err = cache.upsert_dynamic_object(1, "bad", "only 1,2 here").unwrap_err();
    assert!(matches!(err, SimError::InvalidInput(_)));
}

#[test]
fn keepout_layer_is_frozen_until_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    catalog.add_keepout_zone(KeepoutZoneRecord {
        map_id: 1,
        name: "corner".into(),
        enabled: false,
        vertices_text: "[[0,0],[8,0],[8,8],[0,8]]".into(),
    });

    let cache = cache_with_cell_size(catalog.clone(), 4);
    let grid = cache.build(1).unwrap();
    assert_eq!(grid.occupied_count(), 0);

    // Enabling the zone after the build has no effect on the cached world.
    catalog.set_zone_enabled(1, "corner", true);
    assert_eq!(cache.cached(1).unwrap().occupied_count(), 0);

    // The next build bakes it in.
    let rebuilt = cache.build(1).unwrap();
    assert_eq!(rebuilt.occupied_count(), 4);
}

#[test]
fn dynamic_objects_carry_over_only_on_same_grid_config() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    cache.build(1).unwrap();
    cache
        .upsert_dynamic_object(1, "cart", "[[8,8],[16,8],[16,16],[8,16]]")
        .unwrap();

    // Same map, same cell size: the object survives the rebuild.
    let rebuilt = cache.build(1).unwrap();
    assert!(rebuilt.is_occupied(2, 2));
    assert_eq!(cache.cached_bundle().unwrap().dynamic_objects.len(), 1);

    // Different cell size changes the grid shape: the registry resets.
    let resized = cache.build_with_cell_size(1, 2).unwrap();
    assert_eq!(resized.width_cells(), 8);
    assert_eq!(resized.occupied_count(), 0);
    assert!(cache.cached_bundle().unwrap().dynamic_objects.is_empty());
}

#[test]
fn evict_clears_only_the_matching_map() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    cache.build(1).unwrap();

    cache.evict(2);
    assert!(cache.cached(1).is_some());

    cache.evict(1);
    assert!(cache.cached(1).is_none());
}

#[test]
fn subscribe_replays_latest_and_follows_replacements() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    let cache = cache_with_cell_size(catalog, 4);
    cache.build(1).unwrap();

    let feed = cache.subscribe_map(1);
    let replayed = feed.try_recv().unwrap();
    assert_eq!(replayed.map_id, 1);
    assert_eq!(replayed.grid.occupied_count(), 0);

    cache
        .upsert_dynamic_object(1, "cart", "[[0,0],[8,0],[8,8],[0,8]]")
        .unwrap();
    let updated = feed.try_recv().unwrap();
    assert_eq!(updated.grid.occupied_count(), 4);

    // Feeds for other maps see nothing.
    let other = cache.subscribe_map(99);
    assert!(other.try_recv().is_err());
}

#[test]
fn build_failures_surface_distinctly() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog_with_map(dir.path(), 1);
    catalog.insert_map(MapRecord {
        id: 2,
        name: "blank path".into(),
        sensor_image_path: "   ".into(),
    });
    catalog.insert_map(MapRecord {
        id: 3,
        name: "missing file".into(),
        sensor_image_path: dir.path().join("missing.png").to_string_lossy().into_owned(),
    });

    let cache = cache_with_cell_size(catalog, 4);

    assert!(matches!(
        cache.build(42).unwrap_err(),
        SimError::MapNotFound(42)
    ));
    assert!(matches!(cache.build(2).unwrap_err(), SimError::InvalidState(_)));
    assert!(matches!(cache.build(3).unwrap_err(), SimError::Map(_)));

    // Failed builds leave the slot untouched.
    assert!(cache.cached(2).is_none());
}
