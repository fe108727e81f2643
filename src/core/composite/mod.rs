//! # Composite Module
//!
//! Turns two overlap crops into comparison artifacts.
//!
//! - `flicker` - two-frame looping GIF
//! - `cmv` - three-band color-multiview raster
//! - `resample` - brings crops of different resolution to a common size
//! - `warp` - maps a crop onto a differently oriented grid
//!
//! Crops are aligned to the finer-resolution crop and the output inherits
//! its transform. A crop whose grid shares the reference's axis directions
//! is resized to the reference dimensions; a flipped or rotated one is
//! resampled geometrically, pixel centre by pixel centre. Pixels that are
//! not valid in both crops (transparent, or outside the warped grid) are
//! blanked in every output.

mod cmv;
mod flicker;
mod resample;
mod warp;

pub use cmv::build_cmv;
pub use flicker::{write_flicker, DEFAULT_FRAME_DELAY_MS};
pub use resample::{CropResampler, Resampling};
pub use warp::{same_orientation, GridMapping};

use crate::core::raster::{GeoTransform, RasterImage};
use crate::error::ProcessError;
use image::{GrayImage, Luma, RgbaImage};

/// Two crops brought onto the same pixel grid
#[derive(Debug, Clone)]
pub struct AlignedPair {
    /// RGBA rendering of the first crop
    pub frame_a: RgbaImage,
    /// RGBA rendering of the second crop
    pub frame_b: RgbaImage,
    pub luma_a: GrayImage,
    pub luma_b: GrayImage,
    /// Transform of the common grid
    pub transform: GeoTransform,
    pub epsg: Option<u16>,
}

impl AlignedPair {
    pub fn dimensions(&self) -> (u32, u32) {
        self.luma_a.dimensions()
    }
}

fn combine_masks(a: Option<GrayImage>, b: Option<GrayImage>) -> Option<GrayImage> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            for (pa, pb) in a.pixels_mut().zip(b.pixels()) {
                pa.0[0] = pa.0[0].min(pb.0[0]);
            }
            Some(a)
        }
        (Some(mask), None) | (None, Some(mask)) => Some(mask),
        (None, None) => None,
    }
}

/// One crop rendered on the reference grid
struct GridCrop {
    luma: GrayImage,
    frame: RgbaImage,
    /// Validity mask, `None` when every pixel is valid
    mask: Option<GrayImage>,
}

fn onto_grid(
    crop: &RasterImage,
    reference: &RasterImage,
    resampler: &mut CropResampler,
    resampling: Resampling,
) -> Result<GridCrop, ProcessError> {
    let (width, height) = (reference.width, reference.height);

    if same_orientation(&crop.transform, &reference.transform) {
        let mask = crop
            .alpha_mask()
            .map(|m| resampler.resize_mask(&m, width, height))
            .transpose()?;
        return Ok(GridCrop {
            luma: resampler.resize_gray(&crop.luminance(), width, height)?,
            frame: resampler.resize_rgba(&crop.to_rgba8(), width, height)?,
            mask,
        });
    }

    tracing::debug!(
        crop = %crop.name,
        reference = %reference.name,
        "grid orientations differ, warping"
    );

    let mapping = GridMapping::new(
        &reference.transform,
        width,
        height,
        &crop.transform,
        (crop.width, crop.height),
    );
    let coverage = mapping.coverage();
    let mask = match crop.alpha_mask() {
        Some(alpha) => combine_masks(
            Some(coverage),
            Some(mapping.warp(&alpha, Resampling::Nearest)),
        ),
        None => Some(coverage),
    };

    Ok(GridCrop {
        luma: mapping.warp(&crop.luminance(), resampling),
        frame: mapping.warp(&crop.to_rgba8(), resampling),
        mask,
    })
}

/// Align two overlap crops onto the finer crop's grid
pub fn align_crops(
    crop_a: &RasterImage,
    crop_b: &RasterImage,
    resampling: Resampling,
) -> Result<AlignedPair, ProcessError> {
    let reference = if crop_a.transform.pixel_area() <= crop_b.transform.pixel_area() {
        crop_a
    } else {
        crop_b
    };
    let (width, height) = (reference.width, reference.height);

    let mut resampler = CropResampler::new(resampling);
    let a = onto_grid(crop_a, reference, &mut resampler, resampling)?;
    let b = onto_grid(crop_b, reference, &mut resampler, resampling)?;

    let (mut luma_a, mut luma_b) = (a.luma, b.luma);
    let (mut frame_a, mut frame_b) = (a.frame, b.frame);

    if let Some(mask) = combine_masks(a.mask, b.mask) {
        for (x, y, Luma([valid])) in mask.enumerate_pixels() {
            if *valid == 0 {
                luma_a.put_pixel(x, y, Luma([0]));
                luma_b.put_pixel(x, y, Luma([0]));
                frame_a.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
                frame_b.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }
    }

    tracing::debug!(
        width,
        height,
        reference = %reference.name,
        "aligned overlap crops"
    );

    Ok(AlignedPair {
        frame_a,
        frame_b,
        luma_a,
        luma_b,
        transform: reference.transform,
        epsg: reference.epsg,
    })
}
