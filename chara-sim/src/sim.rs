//! Movement simulation.
//!
//! Plans a BFS path on the cached composite grid and steps the actor
//! along it on a dedicated thread, publishing one status update per tick.
//! The planning call returns before any step executes; the step sequence
//! is fire-and-forget.

use crate::error::Result;
use crate::status::{ActorStatus, ActorStatusStore};
use crate::world::WorldCache;
use kshetra_map::pathfinding::{self, PathFailure, PathResult};
use kshetra_map::GridPoint;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Path planner plus timed step driver for actors.
pub struct MovementSimulator {
    world: Arc<WorldCache>,
    statuses: Arc<ActorStatusStore>,
    move_tick: Duration,
}

impl MovementSimulator {
    /// Create a simulator over the shared world cache and status store
    pub fn new(
        world: Arc<WorldCache>,
        statuses: Arc<ActorStatusStore>,
        move_tick: Duration,
    ) -> Self {
        Self {
            world,
            statuses,
            move_tick,
        }
    }

    /// Plan a path from the actor's current grid position to `target`.
    ///
    /// An unknown actor yields the `actor_status_not_found` planning
    /// failure, not an error. The composite grid comes from the cache,
    /// building it first when absent or holding a different map.
    pub fn find_path(&self, map_id: i64, actor_id: i64, target: GridPoint) -> Result<PathResult> {
        let Some(status) = self.statuses.current_status(actor_id) else {
            return Ok(PathResult::failed(PathFailure::ActorStatusNotFound));
        };

        let grid = match self.world.cached(map_id) {
            Some(grid) => grid,
            None => self.world.build(map_id)?,
        };
        Ok(pathfinding::find_path(&grid, status.grid_point(), target))
    }

    /// Plan a path and, when one exists, walk the actor along it.
    ///
    /// Returns the planning outcome immediately; a path of length 1 means
    /// the actor is already at the target and nothing is scheduled. The
    /// step sequence runs on its own thread: one status update per tick
    /// with speech "moving", then a final update at the last point with
    /// speech "arrived". Step-sequence failures are logged and swallowed;
    /// published positions are never rolled back.
    ///
    /// There is no cancellation: a second move for the same actor runs
    /// concurrently with the first, and the actor's resting status is
    /// whichever sequence steps last.
    // TODO: cancellation token so a new move supersedes the in-flight one
    pub fn move_actor(&self, map_id: i64, actor_id: i64, target: GridPoint) -> Result<PathResult> {
        let Some(status) = self.statuses.current_status(actor_id) else {
            return Ok(PathResult::failed(PathFailure::ActorStatusNotFound));
        };

        let result = self.find_path(map_id, actor_id, target)?;
        if !result.found || result.path.len() <= 1 {
            return Ok(result);
        }

        let steps: Vec<GridPoint> = result.path[1..].to_vec();
        let actor_size = status.size;
        let statuses = Arc::clone(&self.statuses);
        let move_tick = self.move_tick;

        debug!(
            "actor {} stepping {} cells to ({},{})",
            actor_id,
            steps.len(),
            target.x,
            target.y
        );

        let spawned = thread::Builder::new()
            .name(format!("actor-move-{actor_id}"))
            .spawn(move || {
                for point in &steps {
                    thread::sleep(move_tick);
                    statuses.upsert(ActorStatus::new(
                        actor_id,
                        actor_size,
                        point.x as f64,
                        point.y as f64,
                        "moving",
                    ));
                }
                let last = steps[steps.len() - 1];
                statuses.upsert(ActorStatus::new(
                    actor_id,
                    actor_size,
                    last.x as f64,
                    last.y as f64,
                    "arrived",
                ));
            });
        if let Err(e) = spawned {
            // The planning outcome stands; only the walk is lost.
            warn!("actor {} move sequence failed to start: {}", actor_id, e);
        }

        Ok(result)
    }
}
