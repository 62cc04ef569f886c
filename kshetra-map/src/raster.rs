//! Sensor image rasterization.
//!
//! Converts a raster sensor image of the facility into the base occupancy
//! grid. Each grid cell covers a `cell_size_px` square block of pixels; a
//! cell is occupied as soon as any pixel in its (boundary-clipped) block is
//! dark enough. Rasterization is a pure function of the image, cell size,
//! and threshold.

use crate::error::{MapError, Result};
use crate::grid::OccupancyGrid;
use image::RgbImage;
use std::path::Path;

/// Default grayscale threshold: pixels at or below this are obstacles
pub const DEFAULT_OCCUPIED_THRESHOLD: u8 = 127;

/// Rasterize a sensor image file with the default threshold.
pub fn rasterize_file<P: AsRef<Path>>(path: P, cell_size_px: u32) -> Result<OccupancyGrid> {
    rasterize_file_with_threshold(path, cell_size_px, DEFAULT_OCCUPIED_THRESHOLD)
}

/// Rasterize a sensor image file.
///
/// Fails with [`MapError::InvalidParameter`] when `cell_size_px` is zero,
/// [`MapError::ImageRead`] when the file cannot be read, and
/// [`MapError::ImageDecode`] when the bytes are not a decodable image.
/// These failures are fatal for the triggering call and never retried.
pub fn rasterize_file_with_threshold<P: AsRef<Path>>(
    path: P,
    cell_size_px: u32,
    occupied_threshold_gray: u8,
) -> Result<OccupancyGrid> {
    let path = path.as_ref();
    if cell_size_px == 0 {
        return Err(MapError::InvalidParameter(
            "cell_size_px must be greater than 0".into(),
        ));
    }

    let bytes = std::fs::read(path).map_err(|source| MapError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| MapError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;

    rasterize(&image.to_rgb8(), cell_size_px, occupied_threshold_gray)
}

/// Rasterize a decoded image.
///
/// The grid has `ceil(W / cell_size_px)` columns and `ceil(H / cell_size_px)`
/// rows. Image rows are read bottom-up: image row `H-1-y` maps to grid row
/// `y`, so grid row 0 is the bottom of the facility.
pub fn rasterize(
    image: &RgbImage,
    cell_size_px: u32,
    occupied_threshold_gray: u8,
) -> Result<OccupancyGrid> {
    if cell_size_px == 0 {
        return Err(MapError::InvalidParameter(
            "cell_size_px must be greater than 0".into(),
        ));
    }

    let image_width = image.width();
    let image_height = image.height();
    let width_cells = image_width.div_ceil(cell_size_px) as usize;
    let height_cells = image_height.div_ceil(cell_size_px) as usize;

    let mut grid = OccupancyGrid::empty(width_cells, height_cells, cell_size_px);
    for grid_y in 0..height_cells {
        for grid_x in 0..width_cells {
            if cell_has_obstacle(image, grid_x, grid_y, cell_size_px, occupied_threshold_gray) {
                grid.set_occupied(grid_x, grid_y);
            }
        }
    }

    Ok(grid)
}

/// Scan every pixel of one cell's block; occupied on the first dark pixel.
fn cell_has_obstacle(
    image: &RgbImage,
    grid_x: usize,
    grid_y: usize,
    cell_size_px: u32,
    occupied_threshold_gray: u8,
) -> bool {
    let image_width = image.width();
    let image_height = image.height();

    let start_x = grid_x as u32 * cell_size_px;
    let start_y = grid_y as u32 * cell_size_px;
    let end_x = (start_x + cell_size_px).min(image_width);
    let end_y = (start_y + cell_size_px).min(image_height);

    for y in start_y..end_y {
        // Bottom-up: grid-space pixel row y lives at image row H-1-y.
        let image_y = image_height - 1 - y;
        for x in start_x..end_x {
            let pixel = image.get_pixel(x, image_y);
            let gray = (pixel[0] as u32 + pixel[1] as u32 + pixel[2] as u32) / 3;
            if gray <= occupied_threshold_gray as u32 {
                return true;
            }
        }
    }
    false
}
