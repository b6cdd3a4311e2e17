//! Coordinate types shared across the library.

use std::fmt;
use thiserror::Error;

/// Minimum supported zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level the tile grid math supports.
///
/// Beyond this the pixel grid no longer fits the f64 mantissa cleanly.
pub const MAX_ZOOM: u8 = 30;

/// Pixel edge length of one tile.
pub const TILE_SIZE: f64 = 256.0;

/// Half the web-Mercator world extent in meters.
pub const MAX_EXTENT: f64 = 20_037_508.34;

/// Latitude of the web-Mercator world edge in degrees; `MAX_EXTENT` in
/// degree space.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Earth radius used by the spherical Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Zoom level outside the supported range
    #[error("zoom level {0} not supported (max {MAX_ZOOM})")]
    InvalidZoom(u8),
    /// Bounding box corners are not ordered min <= max
    #[error("invalid extent: ({minx}, {miny}) to ({maxx}, {maxy})")]
    InvalidExtent {
        minx: f64,
        miny: f64,
        maxx: f64,
        maxy: f64,
    },
}

/// A tile address in the `z/x/y` web-Mercator grid.
///
/// Invariant: `x` and `y` are within `0..2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Column, increasing eastward
    pub x: u32,
    /// Row, increasing southward
    pub y: u32,
    /// Zoom level
    pub z: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A geographic bounding box in longitude/latitude degrees (WGS84).
///
/// Projection conversions from other spatial reference systems are the
/// caller's concern; queries arrive here already in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    /// Create a bounding box, validating corner ordering.
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<Self, CoordError> {
        let finite =
            minx.is_finite() && miny.is_finite() && maxx.is_finite() && maxy.is_finite();
        if minx > maxx || miny > maxy || !finite {
            return Err(CoordError::InvalidExtent {
                minx,
                miny,
                maxx,
                maxy,
            });
        }
        Ok(Self {
            minx,
            miny,
            maxx,
            maxy,
        })
    }

    /// The full web-Mercator world coverage.
    pub fn world() -> Self {
        Self {
            minx: -180.0,
            miny: -MAX_LATITUDE,
            maxx: 180.0,
            maxy: MAX_LATITUDE,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// A zero-width or zero-height box marks a degenerate query that must
    /// short-circuit to an empty result rather than an error.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}
