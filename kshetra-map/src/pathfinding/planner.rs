//! BFS planner implementation.

use crate::core::GridPoint;
use crate::grid::OccupancyGrid;
use log::debug;
use std::collections::VecDeque;

use super::types::{PathFailure, PathResult};

/// Neighbor enumeration order: +x, -x, +y, -y.
///
/// The order is fixed; together with FIFO dequeuing it makes tie-breaking
/// deterministic.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// BFS pathfinder over a composite occupancy grid
pub struct BfsPlanner<'a> {
    grid: &'a OccupancyGrid,
}

impl<'a> BfsPlanner<'a> {
    /// Create a planner over a grid snapshot
    pub fn new(grid: &'a OccupancyGrid) -> Self {
        Self { grid }
    }

    /// Find the shortest path from `start` to `target`.
    ///
    /// Endpoints are validated in order: bounds, start occupancy, target
    /// occupancy. A query with `start == target` succeeds with the
    /// single-cell path `[start]`. The returned path includes both
    /// endpoints.
    pub fn find_path(&self, start: GridPoint, target: GridPoint) -> PathResult {
        let width = self.grid.width_cells();
        let height = self.grid.height_cells();

        if !self.grid.in_bounds(start) || !self.grid.in_bounds(target) {
            debug!(
                "[Bfs] out of bounds: start=({},{}) target=({},{}) grid={}x{}",
                start.x, start.y, target.x, target.y, width, height
            );
            return PathResult::failed(PathFailure::StartOrTargetOutOfBounds);
        }
        if self.grid.is_occupied(start.x as usize, start.y as usize) {
            debug!("[Bfs] start blocked at ({},{})", start.x, start.y);
            return PathResult::failed(PathFailure::StartBlocked);
        }
        if self.grid.is_occupied(target.x as usize, target.y as usize) {
            debug!("[Bfs] target blocked at ({},{})", target.x, target.y);
            return PathResult::failed(PathFailure::TargetBlocked);
        }
        if start == target {
            return PathResult::success(vec![start]);
        }

        // Flat visited and parent arrays sized to the grid; parents hold the
        // packed index of the discovering cell.
        let mut visited = vec![false; width * height];
        let mut parent: Vec<u32> = vec![u32::MAX; width * height];
        let pack = |p: GridPoint| p.y as usize * width + p.x as usize;
        let unpack = |idx: u32| {
            GridPoint::new((idx as usize % width) as i32, (idx as usize / width) as i32)
        };

        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[pack(start)] = true;

        while let Some(current) = queue.pop_front() {
            if current == target {
                return PathResult::success(self.rebuild_path(&parent, start, target, unpack));
            }

            for (dx, dy) in DIRECTIONS {
                let next = GridPoint::new(current.x + dx, current.y + dy);
                if !self.grid.in_bounds(next) {
                    continue;
                }
                let next_idx = pack(next);
                if visited[next_idx] || self.grid.is_occupied(next.x as usize, next.y as usize) {
                    continue;
                }
                visited[next_idx] = true;
                parent[next_idx] = pack(current) as u32;
                queue.push_back(next);
            }
        }

        debug!(
            "[Bfs] no path from ({},{}) to ({},{})",
            start.x, start.y, target.x, target.y
        );
        PathResult::failed(PathFailure::NoPath)
    }

    /// Walk parent pointers target -> start, then reverse.
    fn rebuild_path(
        &self,
        parent: &[u32],
        start: GridPoint,
        target: GridPoint,
        unpack: impl Fn(u32) -> GridPoint,
    ) -> Vec<GridPoint> {
        let width = self.grid.width_cells();
        let mut path = Vec::new();
        let mut cursor = target;

        while cursor != start {
            path.push(cursor);
            let idx = parent[cursor.y as usize * width + cursor.x as usize];
            if idx == u32::MAX {
                // Unreachable with a consistent parent map; bail rather than loop.
                return Vec::new();
            }
            cursor = unpack(idx);
        }
        path.push(start);
        path.reverse();
        path
    }
}
