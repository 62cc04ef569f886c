//! BFS pathfinding on the occupancy grid.
//!
//! Breadth-first search over the 4-connected grid yields a minimum
//! edge-count path. Ties are broken purely by discovery order, so results
//! are deterministic for a given grid and endpoints. Nothing is cached
//! across queries; each call costs O(width * height).

mod planner;
mod types;

pub use planner::BfsPlanner;
pub use types::{PathFailure, PathResult};

use crate::core::GridPoint;
use crate::grid::OccupancyGrid;

/// Find the shortest path between two cells.
pub fn find_path(grid: &OccupancyGrid, start: GridPoint, target: GridPoint) -> PathResult {
    BfsPlanner::new(grid).find_path(start, target)
}

/// Check whether any path exists (same cost as a full query).
pub fn path_exists(grid: &OccupancyGrid, start: GridPoint, target: GridPoint) -> bool {
    find_path(grid, start, target).found
}
