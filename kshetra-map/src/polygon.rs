//! Polygon parsing and occupancy overlay.
//!
//! Keepout zones and dynamic objects arrive as free-form text containing
//! vertex coordinates in pixel space. Parsing scans the text for signed
//! decimal numbers and pairs them up; overlaying rasterizes the polygon onto
//! an occupancy layer by testing each cell center with the even-odd rule.

use crate::core::MapPoint;
use crate::error::{MapError, Result};
use crate::grid::OccupancyGrid;

/// Parse polygon vertices from free-form text.
///
/// Any `[[x,y],...]`, `x,y x,y ...`, or similar formatting works: the text
/// is scanned for signed decimal numbers (`-?digits[.digits]`) and the
/// matches are paired into vertices in order. The scan must yield an even
/// count of at least 6 numbers (3 vertices).
pub fn parse_vertices(text: &str) -> Result<Vec<MapPoint>> {
    if text.trim().is_empty() {
        return Err(MapError::InvalidVertices("vertices text is empty".into()));
    }

    let numbers = scan_numbers(text);
    if numbers.len() < 6 || numbers.len() % 2 != 0 {
        return Err(MapError::InvalidVertices(format!(
            "expected an even count of at least 6 coordinates, got {} in {text:?}",
            numbers.len()
        )));
    }

    Ok(numbers
        .chunks_exact(2)
        .map(|pair| MapPoint::new(pair[0], pair[1]))
        .collect())
}

/// Scan text for signed decimal numbers (`-?digits[.digits]`).
fn scan_numbers(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut numbers = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let negative = bytes[i] == b'-';
        let digits_at = if negative { i + 1 } else { i };
        if digits_at >= bytes.len() || !bytes[digits_at].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        i = digits_at;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        // Fractional part only when a digit follows the dot.
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }

        // The scanned slice is a valid decimal literal.
        let value: f64 = text[start..i].parse().unwrap_or(0.0);
        numbers.push(value);
    }

    numbers
}

/// Scale pixel-space vertices to grid scale.
///
/// Division keeps sub-cell precision; vertices are not rounded to cells.
pub fn to_grid_scale(polygon_in_pixels: &[MapPoint], cell_size_px: u32) -> Vec<MapPoint> {
    let cell = cell_size_px as f64;
    polygon_in_pixels
        .iter()
        .map(|p| MapPoint::new(p.x / cell, p.y / cell))
        .collect()
}

/// Mark every cell whose center lies inside the polygon as occupied.
///
/// Union-only: the overlay never clears a cell. Polygons with fewer than
/// 3 vertices leave the layer unchanged.
pub fn overlay_polygon(layer: &mut OccupancyGrid, polygon_in_grid: &[MapPoint]) {
    if polygon_in_grid.len() < 3 {
        return;
    }

    for y in 0..layer.height_cells() {
        let center_y = y as f64 + 0.5;
        for x in 0..layer.width_cells() {
            let center_x = x as f64 + 0.5;
            if point_in_polygon(center_x, center_y, polygon_in_grid) {
                layer.set_occupied(x, y);
            }
        }
    }
}

/// Even-odd ray cast toward +x.
///
/// The epsilon in the denominator guards near-horizontal edges against
/// division by zero; vertices on the ray toggle per the strict/non-strict
/// comparison split.
fn point_in_polygon(x: f64, y: f64, polygon: &[MapPoint]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / ((yj - yi) + 1e-12) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
