//! Affine georeferencing transform.

use geo::{coord, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Smallest determinant accepted as an invertible transform
const MIN_DETERMINANT: f64 = 1e-18;

/// Six-coefficient affine transform from pixel to map coordinates.
///
/// ```text
/// x = top_left_x + col * pixel_width + row * rotation_x
/// y = top_left_y + col * rotation_y  + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Build from GDAL coefficient order
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    /// Coefficients in GDAL order
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation_x != 0.0 || self.rotation_y != 0.0
    }

    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y
    }

    /// Map area covered by a single pixel
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// Pixel (col, row) to map coordinates
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        coord! {
            x: self.top_left_x + col * self.pixel_width + row * self.rotation_x,
            y: self.top_left_y + col * self.rotation_y + row * self.pixel_height,
        }
    }

    /// Map coordinates to fractional pixel (col, row).
    ///
    /// Returns `None` for a degenerate transform.
    pub fn to_pixel(&self, point: Coord<f64>) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det.abs() < MIN_DETERMINANT {
            return None;
        }
        let dx = point.x - self.top_left_x;
        let dy = point.y - self.top_left_y;
        let col = (self.pixel_height * dx - self.rotation_x * dy) / det;
        let row = (self.pixel_width * dy - self.rotation_y * dx) / det;
        Some((col, row))
    }

    /// Transform whose origin is moved to pixel (col, row) of this one
    pub fn translated(&self, col: u32, row: u32) -> Self {
        self.offset(col as f64, row as f64)
    }

    /// Transform whose origin is moved to the fractional pixel (col, row)
    pub fn offset(&self, col: f64, row: f64) -> Self {
        let origin = self.apply(col, row);
        Self {
            top_left_x: origin.x,
            top_left_y: origin.y,
            ..*self
        }
    }

    /// Transform for the same extent resampled by the given factors
    pub fn scaled(&self, col_factor: f64, row_factor: f64) -> Self {
        Self {
            pixel_width: self.pixel_width * col_factor,
            rotation_y: self.rotation_y * col_factor,
            rotation_x: self.rotation_x * row_factor,
            pixel_height: self.pixel_height * row_factor,
            ..*self
        }
    }

    /// Geographic footprint of a `width` x `height` raster
    pub fn footprint(&self, width: u32, height: u32) -> Polygon<f64> {
        let (w, h) = (width as f64, height as f64);
        let ring = vec![
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(w, h),
            self.apply(0.0, h),
            self.apply(0.0, 0.0),
        ];
        Polygon::new(LineString::new(ring), vec![])
    }
}
