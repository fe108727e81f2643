//! Color-multiview composite.
//!
//! Band 1 holds the luminance of the first scene, bands 2 and 3 the
//! luminance of the second. Unchanged ground renders gray; anything that
//! moved between acquisitions shows up red where it was and cyan where it
//! went.

use crate::core::raster::{GeoTransform, RasterImage, Samples};
use crate::error::ProcessError;
use image::GrayImage;

/// Interleave two luminance crops into a three-band raster
pub fn build_cmv(
    name: &str,
    luma_a: &GrayImage,
    luma_b: &GrayImage,
    transform: GeoTransform,
    epsg: Option<u16>,
) -> Result<RasterImage, ProcessError> {
    if luma_a.dimensions() != luma_b.dimensions() {
        return Err(ProcessError::UnsupportedImage {
            name: name.to_string(),
            reason: format!(
                "crop sizes differ: {:?} vs {:?}",
                luma_a.dimensions(),
                luma_b.dimensions()
            ),
        });
    }

    let (width, height) = luma_a.dimensions();
    let data: Vec<u8> = luma_a
        .as_raw()
        .iter()
        .zip(luma_b.as_raw())
        .flat_map(|(&a, &b)| [a, b, b])
        .collect();

    RasterImage::new(name, width, height, 3, Samples::U8(data), transform, epsg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn band_layout() {
        let a = GrayImage::from_pixel(2, 2, Luma([200]));
        let b = GrayImage::from_pixel(2, 2, Luma([50]));
        let cmv = build_cmv("cmv", &a, &b, GeoTransform::north_up(0.0, 0.0, 1.0, 1.0), None).unwrap();

        assert_eq!(cmv.bands, 3);
        let Samples::U8(data) = &cmv.samples else {
            panic!("expected 8-bit samples");
        };
        assert_eq!(&data[..3], &[200, 50, 50]);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let a = GrayImage::new(2, 2);
        let b = GrayImage::new(3, 2);
        assert!(build_cmv("cmv", &a, &b, GeoTransform::north_up(0.0, 0.0, 1.0, 1.0), None).is_err());
    }
}
