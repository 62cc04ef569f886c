//! Actor status store.
//!
//! Latest status per actor plus a bounded trail of distinct past grid
//! positions, with latest-replay broadcast for live subscribers. Per-key
//! operations are individually atomic; `current()` is a best-effort
//! snapshot and not point-in-time consistent across actors.

use crate::broadcast::LatestHub;
use crate::catalog::Catalog;
use crossbeam_channel::Receiver;
use kshetra_map::GridPoint;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Maximum number of trail points retained per actor
pub const MAX_TRAIL_POINTS: usize = 1_000;

/// Seed row for actors registered at startup
const SEED_START_X: i32 = 10;
const SEED_START_Y: i32 = 10;

/// Live status of one actor, published as a JSON event per update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorStatus {
    /// Actor identifier
    pub actor_id: i64,
    /// Footprint size in cells, at least 1
    pub size: u32,
    /// X position in grid space
    pub x: f64,
    /// Y position in grid space
    pub y: f64,
    /// Speech-bubble text ("moving", "arrived", or free text)
    pub speech: String,
}

impl ActorStatus {
    /// Create a status record; `size` is clamped on upsert, not here
    pub fn new(actor_id: i64, size: u32, x: f64, y: f64, speech: impl Into<String>) -> Self {
        Self {
            actor_id,
            size,
            x,
            y,
            speech: speech.into(),
        }
    }

    /// Nearest grid cell to the current position
    pub fn grid_point(&self) -> GridPoint {
        GridPoint::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Concurrent actor-status map with bounded trails and broadcast.
pub struct ActorStatusStore {
    statuses: Mutex<HashMap<i64, ActorStatus>>,
    trails: Mutex<HashMap<i64, VecDeque<GridPoint>>>,
    hub: LatestHub<ActorStatus>,
}

impl ActorStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            trails: Mutex::new(HashMap::new()),
            hub: LatestHub::new(),
        }
    }

    /// Seed one status per active actor at a deterministic start row,
    /// offset one cell per actor in registration order.
    pub fn seed_from_catalog(&self, catalog: &dyn Catalog) {
        for (offset, actor) in catalog.active_actors().iter().enumerate() {
            self.upsert(ActorStatus::new(
                actor.id,
                actor.size,
                (SEED_START_X + offset as i32) as f64,
                SEED_START_Y as f64,
                "",
            ));
        }
    }

    /// Store a status as the actor's latest, extend the trail, broadcast.
    ///
    /// `size` is clamped to at least 1. The trail only grows when the new
    /// grid point differs from its last entry; consecutive duplicates
    /// collapse. Trails hold at most [`MAX_TRAIL_POINTS`] points, oldest
    /// dropped first.
    pub fn upsert(&self, status: ActorStatus) {
        let mut sanitized = status;
        sanitized.size = sanitized.size.max(1);

        self.statuses
            .lock()
            .insert(sanitized.actor_id, sanitized.clone());
        self.push_trail_point(sanitized.actor_id, sanitized.grid_point());
        self.hub.publish(sanitized);
    }

    /// Drop an actor's latest status and trail.
    pub fn remove(&self, actor_id: i64) {
        self.statuses.lock().remove(&actor_id);
        self.trails.lock().remove(&actor_id);
    }

    /// Drop every actor.
    pub fn clear(&self) {
        self.statuses.lock().clear();
        self.trails.lock().clear();
    }

    /// Latest status of one actor
    pub fn current_status(&self, actor_id: i64) -> Option<ActorStatus> {
        self.statuses.lock().get(&actor_id).cloned()
    }

    /// Snapshot of every actor's latest status, sorted by actor id
    pub fn current(&self) -> Vec<ActorStatus> {
        let mut statuses: Vec<ActorStatus> = self.statuses.lock().values().cloned().collect();
        statuses.sort_by_key(|s| s.actor_id);
        statuses
    }

    /// Snapshot of an actor's trail, oldest first; empty when unknown
    pub fn trail(&self, actor_id: i64) -> Vec<GridPoint> {
        self.trails
            .lock()
            .get(&actor_id)
            .map(|trail| trail.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Live feed of every status update, with immediate latest-replay.
    pub fn subscribe(&self) -> Receiver<ActorStatus> {
        self.hub.subscribe()
    }

    /// Live feed filtered to one actor.
    pub fn subscribe_actor(&self, actor_id: i64) -> Receiver<ActorStatus> {
        self.hub
            .subscribe_filtered(move |status| status.actor_id == actor_id)
    }

    fn push_trail_point(&self, actor_id: i64, point: GridPoint) {
        let mut trails = self.trails.lock();
        let trail = trails.entry(actor_id).or_default();
        if trail.back() == Some(&point) {
            return;
        }
        trail.push_back(point);
        while trail.len() > MAX_TRAIL_POINTS {
            trail.pop_front();
        }
    }
}

impl Default for ActorStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActorRecord, InMemoryCatalog};

    #[test]
    fn test_upsert_clamps_size_and_broadcasts() {
        let store = ActorStatusStore::new();
        let rx = store.subscribe();

        store.upsert(ActorStatus::new(1, 0, 2.0, 3.0, "hi"));

        let stored = store.current_status(1).unwrap();
        assert_eq!(stored.size, 1);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.size, 1);
        assert_eq!(event.speech, "hi");
    }

    #[test]
    fn test_trail_collapses_consecutive_duplicates() {
        let store = ActorStatusStore::new();
        store.upsert(ActorStatus::new(1, 1, 5.0, 5.0, ""));
        store.upsert(ActorStatus::new(1, 1, 5.0, 5.0, "again"));
        assert_eq!(store.trail(1), vec![GridPoint::new(5, 5)]);

        store.upsert(ActorStatus::new(1, 1, 6.0, 5.0, ""));
        store.upsert(ActorStatus::new(1, 1, 5.0, 5.0, ""));
        assert_eq!(
            store.trail(1),
            vec![
                GridPoint::new(5, 5),
                GridPoint::new(6, 5),
                GridPoint::new(5, 5)
            ]
        );
    }

    #[test]
    fn test_trail_caps_at_limit_dropping_oldest() {
        let store = ActorStatusStore::new();
        for i in 0..(MAX_TRAIL_POINTS as i32 + 1) {
            store.upsert(ActorStatus::new(1, 1, i as f64, 0.0, ""));
        }

        let trail = store.trail(1);
        assert_eq!(trail.len(), MAX_TRAIL_POINTS);
        assert_eq!(trail[0], GridPoint::new(1, 0));
        assert_eq!(trail[MAX_TRAIL_POINTS - 1], GridPoint::new(1000, 0));
    }

    #[test]
    fn test_remove_drops_latest_and_trail() {
        let store = ActorStatusStore::new();
        store.upsert(ActorStatus::new(1, 1, 0.0, 0.0, ""));
        store.remove(1);
        assert!(store.current_status(1).is_none());
        assert!(store.trail(1).is_empty());
    }

    #[test]
    fn test_current_is_sorted_snapshot() {
        let store = ActorStatusStore::new();
        store.upsert(ActorStatus::new(9, 1, 0.0, 0.0, ""));
        store.upsert(ActorStatus::new(2, 1, 1.0, 0.0, ""));

        let snapshot = store.current();
        let ids: Vec<i64> = snapshot.iter().map(|s| s.actor_id).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn test_subscribe_actor_filters_and_replays() {
        let store = ActorStatusStore::new();
        store.upsert(ActorStatus::new(1, 1, 0.0, 0.0, ""));

        let rx = store.subscribe_actor(2);
        // Latest status belongs to actor 1; nothing replayed for actor 2.
        assert!(rx.try_recv().is_err());

        store.upsert(ActorStatus::new(2, 1, 4.0, 4.0, ""));
        store.upsert(ActorStatus::new(1, 1, 1.0, 0.0, ""));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.actor_id, 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_seed_from_catalog_offsets_start_positions() {
        let catalog = InMemoryCatalog::new();
        catalog.add_actor(ActorRecord {
            id: 4,
            size: 0,
            enabled: true,
        });
        catalog.add_actor(ActorRecord {
            id: 8,
            size: 3,
            enabled: true,
        });
        catalog.add_actor(ActorRecord {
            id: 6,
            size: 1,
            enabled: false,
        });

        let store = ActorStatusStore::new();
        store.seed_from_catalog(&catalog);

        let first = store.current_status(4).unwrap();
        assert_eq!((first.x, first.y), (10.0, 10.0));
        assert_eq!(first.size, 1);

        let second = store.current_status(8).unwrap();
        assert_eq!((second.x, second.y), (11.0, 10.0));
        assert_eq!(second.size, 3);

        assert!(store.current_status(6).is_none());
    }

    #[test]
    fn test_status_event_json_shape() {
        let status = ActorStatus::new(3, 2, 12.5, 8.0, "moving");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["actor_id"], 3);
        assert_eq!(json["size"], 2);
        assert_eq!(json["x"], 12.5);
        assert_eq!(json["speech"], "moving");
    }
}
