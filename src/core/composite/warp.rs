//! Geometric resampling of a crop onto another crop's pixel grid.
//!
//! Used when the two grids differ in orientation (flipped axes or rotation),
//! where a plain resize would composite unrelated ground. Every output pixel
//! centre is mapped to map coordinates through the reference transform and
//! back into the source grid through the inverse of the source transform.

use super::Resampling;
use crate::core::raster::GeoTransform;
use image::{GrayImage, ImageBuffer, Luma, Pixel};

/// Whether two grids share axis directions, so a resize lines them up
pub fn same_orientation(a: &GeoTransform, b: &GeoTransform) -> bool {
    !a.is_rotated()
        && !b.is_rotated()
        && a.pixel_width.signum() == b.pixel_width.signum()
        && a.pixel_height.signum() == b.pixel_height.signum()
}

/// Source-grid coordinates of each reference pixel centre
pub struct GridMapping {
    width: u32,
    height: u32,
    coords: Vec<Option<(f64, f64)>>,
}

impl GridMapping {
    /// Map a `width` x `height` reference grid into a `src_width` x
    /// `src_height` source grid. Centres landing outside the source are
    /// `None`, as is everything when the source transform is degenerate.
    pub fn new(
        reference: &GeoTransform,
        width: u32,
        height: u32,
        source: &GeoTransform,
        (src_width, src_height): (u32, u32),
    ) -> Self {
        let mut coords = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                let point = reference.apply(col as f64 + 0.5, row as f64 + 0.5);
                let coord = source.to_pixel(point).filter(|&(x, y)| {
                    x >= 0.0 && y >= 0.0 && x < src_width as f64 && y < src_height as f64
                });
                coords.push(coord);
            }
        }
        Self {
            width,
            height,
            coords,
        }
    }

    /// 255 where the reference pixel falls inside the source grid
    pub fn coverage(&self) -> GrayImage {
        let mut mask = GrayImage::new(self.width, self.height);
        for (i, coord) in self.coords.iter().enumerate() {
            if coord.is_some() {
                mask.put_pixel(i as u32 % self.width, i as u32 / self.width, Luma([255]));
            }
        }
        mask
    }

    /// Sample `source` at every mapped position; unmapped pixels stay zero
    pub fn warp<P>(
        &self,
        source: &ImageBuffer<P, Vec<u8>>,
        resampling: Resampling,
    ) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8>,
    {
        let mut out = ImageBuffer::new(self.width, self.height);
        for (i, coord) in self.coords.iter().enumerate() {
            let Some((x, y)) = *coord else {
                continue;
            };
            let pixel = match resampling {
                Resampling::Nearest => *source.get_pixel(x as u32, y as u32),
                Resampling::Bilinear => bilinear(source, x, y),
            };
            out.put_pixel(i as u32 % self.width, i as u32 / self.width, pixel);
        }
        out
    }
}

fn bilinear<P>(source: &ImageBuffer<P, Vec<u8>>, x: f64, y: f64) -> P
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = source.dimensions();
    // Sample positions are pixel centres
    let fx = (x - 0.5).clamp(0.0, (width - 1) as f64);
    let fy = (y - 0.5).clamp(0.0, (height - 1) as f64);
    let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (tx, ty) = (fx - x0 as f64, fy - y0 as f64);

    let p00 = source.get_pixel(x0, y0).channels();
    let p10 = source.get_pixel(x1, y0).channels();
    let p01 = source.get_pixel(x0, y1).channels();
    let p11 = source.get_pixel(x1, y1).channels();

    let channels = P::CHANNEL_COUNT as usize;
    let mut values = [0u8; 4];
    for c in 0..channels {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        values[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    *P::from_slice(&values[..channels])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| Luma([(y * 50) as u8]))
    }

    #[test]
    fn flipped_rows_are_mapped_back() {
        let north_up = GeoTransform::north_up(0.0, 4.0, 1.0, 1.0);
        let south_up = GeoTransform::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let mapping = GridMapping::new(&north_up, 4, 4, &south_up, (4, 4));

        let warped = mapping.warp(&rows(4, 4), Resampling::Nearest);

        // Row 0 of the north-up grid is the top, stored last in the south-up one
        assert_eq!(warped.get_pixel(0, 0).0[0], 150);
        assert_eq!(warped.get_pixel(2, 3).0[0], 0);
        assert!(mapping.coverage().pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn pixels_outside_source_are_uncovered() {
        let reference = GeoTransform::north_up(0.0, 4.0, 1.0, 1.0);
        let shifted = GeoTransform::north_up(2.0, 4.0, 1.0, 1.0);
        let mapping = GridMapping::new(&reference, 4, 4, &shifted, (4, 4));

        let coverage = mapping.coverage();
        assert_eq!(coverage.get_pixel(0, 0).0[0], 0);
        assert_eq!(coverage.get_pixel(3, 0).0[0], 255);
        assert_eq!(mapping.warp(&rows(4, 4), Resampling::Nearest).get_pixel(1, 2).0[0], 0);
    }

    #[test]
    fn bilinear_blends_neighbours() {
        let reference = GeoTransform::north_up(0.5, 2.0, 1.0, 1.0);
        let source = GeoTransform::north_up(0.0, 2.0, 1.0, 1.0);
        let image = GrayImage::from_fn(2, 2, |x, _| Luma([(x * 100) as u8]));
        let mapping = GridMapping::new(&reference, 1, 2, &source, (2, 2));

        let warped = mapping.warp(&image, Resampling::Bilinear);
        assert_eq!(warped.get_pixel(0, 0).0[0], 50);
    }

    #[test]
    fn orientation_check() {
        let north_up = GeoTransform::north_up(0.0, 0.0, 1.0, 1.0);
        let coarse = GeoTransform::north_up(0.0, 0.0, 3.0, 3.0);
        let south_up = GeoTransform::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let rotated = GeoTransform::from_gdal([0.0, 1.0, 0.2, 0.0, 0.2, -1.0]);

        assert!(same_orientation(&north_up, &coarse));
        assert!(!same_orientation(&north_up, &south_up));
        assert!(!same_orientation(&north_up, &rotated));
    }
}
