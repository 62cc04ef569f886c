//! Point and coordinate types for the occupancy grid.

use serde::{Deserialize, Serialize};

/// Grid coordinates (integer cell indices)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPoint {
    /// X coordinate (column index)
    pub x: i32,
    /// Y coordinate (row index, 0 at the bottom)
    pub y: i32,
}

impl GridPoint {
    /// Create a new grid point
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another point
    #[inline]
    pub fn manhattan_distance(&self, other: &GridPoint) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// Real-valued point in pixel space or grid scale.
///
/// Polygon vertices keep sub-cell precision when scaled from pixels to
/// grid coordinates, so this stays `f64` all the way to the overlay.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl MapPoint {
    /// Create a new map point
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
