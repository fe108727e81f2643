//! # Overlap Module
//!
//! Intersects two raster footprints and maps the intersection back into each
//! raster's pixel grid.
//!
//! The pixel window is the bounding box of the intersection polygon's
//! vertices in fractional pixel coordinates, rounded to the nearest pixel
//! edge and clamped to the raster. Rotated rasters therefore get the
//! smallest axis-aligned window containing the overlap.

use crate::core::raster::{PixelWindow, RasterImage};
use crate::error::ProcessError;
use geo::{Area, BooleanOps, BoundingRect, CoordsIter, MultiPolygon, Rect};

/// Overlap between two rasters
#[derive(Debug, Clone)]
pub struct OverlapRegion {
    /// Intersection of the footprints in map coordinates
    pub polygon: MultiPolygon<f64>,
    /// Window in the first raster
    pub window_a: PixelWindow,
    /// Window in the second raster
    pub window_b: PixelWindow,
}

impl OverlapRegion {
    /// Map-coordinate bounds of the intersection
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }
}

fn no_overlap(a: &RasterImage, b: &RasterImage) -> ProcessError {
    ProcessError::NoOverlap {
        left: a.name.clone(),
        right: b.name.clone(),
    }
}

/// Pixel window of `raster` covering `polygon`.
///
/// `None` if the transform cannot be inverted.
pub fn pixel_window(raster: &RasterImage, polygon: &MultiPolygon<f64>) -> Option<PixelWindow> {
    let mut min_col = f64::INFINITY;
    let mut min_row = f64::INFINITY;
    let mut max_col = f64::NEG_INFINITY;
    let mut max_row = f64::NEG_INFINITY;

    for point in polygon.exterior_coords_iter() {
        let (col, row) = raster.transform.to_pixel(point)?;
        min_col = min_col.min(col);
        min_row = min_row.min(row);
        max_col = max_col.max(col);
        max_row = max_row.max(row);
    }

    if !min_col.is_finite() || !min_row.is_finite() {
        return Some(PixelWindow::new(0, 0, 0, 0));
    }

    let clamp = |v: f64, limit: u32| v.round().clamp(0.0, limit as f64) as u32;
    let col0 = clamp(min_col, raster.width);
    let col1 = clamp(max_col, raster.width);
    let row0 = clamp(min_row, raster.height);
    let row1 = clamp(max_row, raster.height);

    Some(PixelWindow::new(col0, row0, col1 - col0, row1 - row0))
}

/// Compute the overlap of two rasters.
///
/// Fails with `NoOverlap` when the footprints do not intersect or the
/// intersection is thinner than a pixel in either raster, and with
/// `UnsupportedImage` when the rasters use different spatial references.
pub fn compute_overlap(a: &RasterImage, b: &RasterImage) -> Result<OverlapRegion, ProcessError> {
    if let (Some(epsg_a), Some(epsg_b)) = (a.epsg, b.epsg) {
        if epsg_a != epsg_b {
            return Err(ProcessError::UnsupportedImage {
                name: b.name.clone(),
                reason: format!("spatial reference EPSG:{} differs from EPSG:{}", epsg_b, epsg_a),
            });
        }
    }

    let polygon = a.footprint().intersection(&b.footprint());
    if polygon.0.is_empty() || polygon.unsigned_area() <= 0.0 {
        return Err(no_overlap(a, b));
    }

    let degenerate = |raster: &RasterImage| ProcessError::UnsupportedImage {
        name: raster.name.clone(),
        reason: "georeferencing transform is not invertible".to_string(),
    };
    let window_a = pixel_window(a, &polygon).ok_or_else(|| degenerate(a))?;
    let window_b = pixel_window(b, &polygon).ok_or_else(|| degenerate(b))?;

    if window_a.is_empty() || window_b.is_empty() {
        return Err(no_overlap(a, b));
    }

    tracing::debug!(
        a = %a.name,
        b = %b.name,
        window_a = ?window_a,
        window_b = ?window_b,
        "computed overlap"
    );

    Ok(OverlapRegion {
        polygon,
        window_a,
        window_b,
    })
}
