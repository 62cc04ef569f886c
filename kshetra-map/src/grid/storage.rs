//! Flat-buffer occupancy grid storage.
//!
//! Cells are stored in a single contiguous array indexed `y * width + x`
//! for cache locality. The JSON form stays a 2D row list (row 0 at the
//! bottom) so external consumers see the grid shape directly.

use crate::core::GridPoint;
use serde::{Deserialize, Serialize};

/// A 2D occupancy grid with bottom-left origin.
///
/// The coordinate system:
/// - Cell (0, 0) is the bottom-left corner
/// - Positive X is to the right, positive Y is up
/// - Cell (x, y) covers pixels `[x*cell_size, (x+1)*cell_size)` horizontally
///
/// Cloning produces a deep copy; callers may freely mutate a returned grid
/// without affecting the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "GridRows", try_from = "GridRows")]
pub struct OccupancyGrid {
    /// Grid width in cells
    width_cells: usize,
    /// Grid height in cells
    height_cells: usize,
    /// Edge length of one cell in source-image pixels
    cell_size_px: u32,
    /// Occupancy values (0 = free, 1 = occupied), row-major from the bottom
    occupancy: Vec<u8>,
}

impl OccupancyGrid {
    /// Create a grid with every cell free
    pub fn empty(width_cells: usize, height_cells: usize, cell_size_px: u32) -> Self {
        Self {
            width_cells,
            height_cells,
            cell_size_px,
            occupancy: vec![0; width_cells * height_cells],
        }
    }

    /// Grid width in cells
    #[inline]
    pub fn width_cells(&self) -> usize {
        self.width_cells
    }

    /// Grid height in cells
    #[inline]
    pub fn height_cells(&self) -> usize {
        self.height_cells
    }

    /// Cell edge length in source-image pixels
    #[inline]
    pub fn cell_size_px(&self) -> u32 {
        self.cell_size_px
    }

    /// Total number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width_cells * self.height_cells
    }

    /// Check whether a point lies within `[0,width) x [0,height)`
    #[inline]
    pub fn in_bounds(&self, point: GridPoint) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width_cells
            && (point.y as usize) < self.height_cells
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width_cells + x
    }

    /// Whether the cell at `(x, y)` is occupied. Panics out of bounds.
    #[inline]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.occupancy[self.index(x, y)] == 1
    }

    /// Whether the cell at `point` is occupied, or `None` out of bounds.
    #[inline]
    pub fn occupied_at(&self, point: GridPoint) -> Option<bool> {
        if !self.in_bounds(point) {
            return None;
        }
        Some(self.is_occupied(point.x as usize, point.y as usize))
    }

    /// Mark the cell at `(x, y)` occupied
    #[inline]
    pub fn set_occupied(&mut self, x: usize, y: usize) {
        let idx = self.index(x, y);
        self.occupancy[idx] = 1;
    }

    /// Number of occupied cells
    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().filter(|&&v| v == 1).count()
    }

    /// Number of free cells
    pub fn free_count(&self) -> usize {
        self.cell_count() - self.occupied_count()
    }

    /// Elementwise OR of three same-shaped layers.
    ///
    /// A composite cell is occupied when the cell is occupied in any of the
    /// base, keepout, or dynamic layers. All three grids must share one
    /// shape; this is guaranteed by construction in the world cache.
    pub fn union_of(base: &Self, keepout: &Self, dynamic: &Self) -> Self {
        debug_assert_eq!(base.width_cells, keepout.width_cells);
        debug_assert_eq!(base.width_cells, dynamic.width_cells);
        debug_assert_eq!(base.height_cells, keepout.height_cells);
        debug_assert_eq!(base.height_cells, dynamic.height_cells);

        let occupancy = base
            .occupancy
            .iter()
            .zip(keepout.occupancy.iter())
            .zip(dynamic.occupancy.iter())
            .map(|((&b, &k), &d)| if b == 1 || k == 1 || d == 1 { 1 } else { 0 })
            .collect();

        Self {
            width_cells: base.width_cells,
            height_cells: base.height_cells,
            cell_size_px: base.cell_size_px,
            occupancy,
        }
    }

    /// Row slice at grid row `y` (row 0 at the bottom)
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.width_cells;
        &self.occupancy[start..start + self.width_cells]
    }
}

/// Serde mirror: the wire form keeps occupancy as a 2D row list.
#[derive(Serialize, Deserialize)]
struct GridRows {
    width_cells: usize,
    height_cells: usize,
    cell_size_px: u32,
    occupancy: Vec<Vec<u8>>,
}

impl From<OccupancyGrid> for GridRows {
    fn from(grid: OccupancyGrid) -> Self {
        let occupancy = (0..grid.height_cells)
            .map(|y| grid.row(y).to_vec())
            .collect();
        Self {
            width_cells: grid.width_cells,
            height_cells: grid.height_cells,
            cell_size_px: grid.cell_size_px,
            occupancy,
        }
    }
}

impl TryFrom<GridRows> for OccupancyGrid {
    type Error = String;

    fn try_from(rows: GridRows) -> std::result::Result<Self, Self::Error> {
        if rows.occupancy.len() != rows.height_cells {
            return Err(format!(
                "occupancy has {} rows, expected {}",
                rows.occupancy.len(),
                rows.height_cells
            ));
        }
        let mut occupancy = Vec::with_capacity(rows.width_cells * rows.height_cells);
        for (y, row) in rows.occupancy.iter().enumerate() {
            if row.len() != rows.width_cells {
                return Err(format!(
                    "occupancy row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    rows.width_cells
                ));
            }
            occupancy.extend(row.iter().map(|&v| if v == 0 { 0 } else { 1 }));
        }
        Ok(Self {
            width_cells: rows.width_cells,
            height_cells: rows.height_cells,
            cell_size_px: rows.cell_size_px,
            occupancy,
        })
    }
}
