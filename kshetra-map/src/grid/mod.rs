//! Occupancy grid storage.
//!
//! The grid is the composite world representation used for path planning:
//! a rectangular field of cells where 1 = blocked and 0 = free, with a
//! bottom-left origin.

mod storage;

pub use storage::OccupancyGrid;
