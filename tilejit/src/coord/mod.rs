//! Tile grid resolution
//!
//! Converts geographic bounding boxes into the set of web-Mercator tile
//! coordinates covering them at a given zoom level, and derives a zoom
//! level from a query extent's mercator width.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, EARTH_RADIUS, MAX_EXTENT, MAX_LATITUDE, MAX_ZOOM,
    MIN_ZOOM, TILE_SIZE,
};

use std::f64::consts::PI;

/// Projects a longitude/latitude corner into pixel space at the given zoom.
///
/// The world at zoom `z` is a square of `256 * 2^z` pixels with the origin
/// at the north-west corner; `y` grows southward.
fn to_pixel(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
    let world_px = TILE_SIZE * 2.0_f64.powi(zoom as i32);
    let d = world_px / 2.0;
    let bc = world_px / 360.0;
    let cc = world_px / (2.0 * PI);

    // Clamp the sine to keep atanh finite at the poles.
    let f = (lat.to_radians().sin()).clamp(-0.999_999_99, 0.999_999_9);

    let px = d + lon * bc;
    let py = d - cc * (0.5 * ((1.0 + f) / (1.0 - f)).ln());
    (px, py)
}

/// Resolves the set of tile coordinates covering `bbox` at `zoom`.
///
/// The two diagonal corners are projected into pixel space, divided by the
/// tile size, and floored/ceiled to an inclusive integer range. A degenerate
/// box (zero width or height) resolves to no coverage: an empty vector, not
/// an error.
pub fn tiles_for_bbox(bbox: &BoundingBox, zoom: u8) -> Result<Vec<TileCoord>, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if bbox.is_degenerate() {
        return Ok(Vec::new());
    }

    // Northern latitudes project to smaller pixel rows.
    let (min_px, min_py) = to_pixel(bbox.minx, bbox.maxy, zoom);
    let (max_px, max_py) = to_pixel(bbox.maxx, bbox.miny, zoom);

    let max_index = (1u64 << zoom) - 1;
    let clamp = |v: f64| -> u32 { (v.max(0.0) as u64).min(max_index) as u32 };

    let tx_min = clamp((min_px / TILE_SIZE).floor());
    let ty_min = clamp((min_py / TILE_SIZE).floor());
    let tx_max = clamp((max_px / TILE_SIZE).ceil() - 1.0).max(tx_min);
    let ty_max = clamp((max_py / TILE_SIZE).ceil() - 1.0).max(ty_min);

    let mut tiles =
        Vec::with_capacity(((tx_max - tx_min + 1) as usize) * ((ty_max - ty_min + 1) as usize));
    for y in ty_min..=ty_max {
        for x in tx_min..=tx_max {
            tiles.push(TileCoord::new(x, y, zoom));
        }
    }
    Ok(tiles)
}

/// Derives a zoom level from the mercator width of a query extent.
///
/// A box spanning the whole world maps to zoom 0, half the world to zoom 1,
/// and so on. This is the resolution hint implied by the caller's bounding
/// box when no explicit zoom is given.
pub fn zoom_for_extent(bbox: &BoundingBox) -> u8 {
    let merc_width = EARTH_RADIUS * bbox.width().to_radians();
    if merc_width <= 0.0 {
        return MIN_ZOOM;
    }
    let z = (-((merc_width / MAX_EXTENT).ln() - 2.0_f64.ln()) / 2.0_f64.ln())
        .ceil()
        .abs();
    (z as u32).min(MAX_ZOOM as u32) as u8
}
