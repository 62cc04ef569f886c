//! Black/white PNG export of an occupancy grid.
//!
//! One pixel per cell: occupied = black, free = white. Grid row 0 ends up
//! at the bottom of the image, matching the sensor-image orientation the
//! grid was rasterized from.

use crate::error::Result;
use crate::grid::OccupancyGrid;
use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Encode a grid as PNG bytes.
pub fn to_png_bytes(grid: &OccupancyGrid) -> Result<Vec<u8>> {
    let width = grid.width_cells() as u32;
    let height = grid.height_cells() as u32;

    let mut image = GrayImage::new(width, height);
    for y in 0..grid.height_cells() {
        let image_y = height - 1 - y as u32;
        for (x, &value) in grid.row(y).iter().enumerate() {
            let luma = if value == 1 { 0u8 } else { 255u8 };
            image.put_pixel(x as u32, image_y, Luma([luma]));
        }
    }

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
