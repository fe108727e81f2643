//! Crop resampling using SIMD-accelerated fast_image_resize.

use crate::error::ProcessError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{GrayImage, ImageBuffer, RgbaImage};
use serde::{Deserialize, Serialize};

/// Resampling filter used to bring both crops to a common size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resampling {
    /// Nearest neighbour, keeps original sample values
    #[default]
    Nearest,
    /// Bilinear, smoother flicker for mixed resolutions
    Bilinear,
}

impl Resampling {
    fn algorithm(self) -> ResizeAlg {
        match self {
            Resampling::Nearest => ResizeAlg::Nearest,
            Resampling::Bilinear => ResizeAlg::Convolution(FilterType::Bilinear),
        }
    }
}

/// Reusable resizer for overlap crops
pub struct CropResampler {
    resizer: Resizer,
    resampling: Resampling,
}

impl CropResampler {
    pub fn new(resampling: Resampling) -> Self {
        Self {
            resizer: Resizer::new(),
            resampling,
        }
    }

    fn resize_raw(
        &mut self,
        src: Vec<u8>,
        (src_width, src_height): (u32, u32),
        (width, height): (u32, u32),
        pixel_type: PixelType,
        algorithm: ResizeAlg,
    ) -> Result<Vec<u8>, ProcessError> {
        if src_width == 0 || src_height == 0 || width == 0 || height == 0 {
            return Err(ProcessError::Resample(format!(
                "cannot resize {}x{} to {}x{}",
                src_width, src_height, width, height
            )));
        }

        let src_image = Image::from_vec_u8(src_width, src_height, src, pixel_type)
            .map_err(|e| ProcessError::Resample(format!("invalid source buffer: {}", e)))?;
        let mut dst_image = Image::new(width, height, pixel_type);

        let options = ResizeOptions::new().resize_alg(algorithm);
        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| ProcessError::Resample(e.to_string()))?;

        Ok(dst_image.into_vec())
    }

    /// Resize a grayscale crop
    pub fn resize_gray(
        &mut self,
        image: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, ProcessError> {
        if image.dimensions() == (width, height) {
            return Ok(image.clone());
        }
        let data = self.resize_raw(
            image.as_raw().clone(),
            image.dimensions(),
            (width, height),
            PixelType::U8,
            self.resampling.algorithm(),
        )?;
        ImageBuffer::from_raw(width, height, data)
            .ok_or_else(|| ProcessError::Resample("result buffer size mismatch".to_string()))
    }

    /// Resize a validity mask; always nearest so the mask stays binary
    pub fn resize_mask(
        &mut self,
        mask: &GrayImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, ProcessError> {
        if mask.dimensions() == (width, height) {
            return Ok(mask.clone());
        }
        let data = self.resize_raw(
            mask.as_raw().clone(),
            mask.dimensions(),
            (width, height),
            PixelType::U8,
            ResizeAlg::Nearest,
        )?;
        ImageBuffer::from_raw(width, height, data)
            .ok_or_else(|| ProcessError::Resample("result buffer size mismatch".to_string()))
    }

    /// Resize an RGBA frame
    pub fn resize_rgba(
        &mut self,
        image: &RgbaImage,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, ProcessError> {
        if image.dimensions() == (width, height) {
            return Ok(image.clone());
        }
        let data = self.resize_raw(
            image.as_raw().clone(),
            image.dimensions(),
            (width, height),
            PixelType::U8x4,
            self.resampling.algorithm(),
        )?;
        ImageBuffer::from_raw(width, height, data)
            .ok_or_else(|| ProcessError::Resample("result buffer size mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    fn checker(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn resize_produces_requested_dimensions() {
        let mut resampler = CropResampler::new(Resampling::Bilinear);
        let resized = resampler.resize_gray(&checker(10, 6), 20, 12).unwrap();
        assert_eq!(resized.dimensions(), (20, 12));
    }

    #[test]
    fn nearest_upscale_keeps_sample_values() {
        let mut resampler = CropResampler::new(Resampling::Nearest);
        let resized = resampler.resize_gray(&checker(4, 4), 8, 8).unwrap();
        assert!(resized.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn same_size_is_a_copy() {
        let mut resampler = CropResampler::new(Resampling::Bilinear);
        let source = checker(5, 5);
        assert_eq!(resampler.resize_gray(&source, 5, 5).unwrap(), source);
    }

    #[test]
    fn mask_stays_binary_with_bilinear() {
        let mut resampler = CropResampler::new(Resampling::Bilinear);
        let resized = resampler.resize_mask(&checker(3, 3), 7, 7).unwrap();
        assert!(resized.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn rgba_resize() {
        let mut resampler = CropResampler::new(Resampling::Nearest);
        let source = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let resized = resampler.resize_rgba(&source, 6, 4).unwrap();
        assert_eq!(resized.dimensions(), (6, 4));
        assert_eq!(resized.get_pixel(5, 3), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn zero_target_is_an_error() {
        let mut resampler = CropResampler::new(Resampling::Nearest);
        assert!(resampler.resize_gray(&checker(3, 3), 0, 3).is_err());
    }
}
