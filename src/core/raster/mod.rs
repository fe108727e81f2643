//! # Raster Module
//!
//! Georeferenced raster images: pixel samples, affine transform and
//! spatial reference.
//!
//! ## Supported Layouts
//! | Bands | Interpretation     |
//! |-------|--------------------|
//! | 1     | Gray               |
//! | 2     | Gray + alpha       |
//! | 3     | RGB                |
//! | 4     | RGB + alpha        |
//!
//! Samples are 8- or 16-bit unsigned, pixel-interleaved.

mod geotiff;
mod transform;

pub use geotiff::{read_geotiff, write_geotiff};
pub use transform::GeoTransform;

use crate::error::ProcessError;
use geo::Polygon;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::path::PathBuf;

/// Pixel samples, interleaved by band
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl Samples {
    /// Bits per sample
    pub fn bit_depth(&self) -> u8 {
        match self {
            Samples::U8(_) => 8,
            Samples::U16(_) => 16,
        }
    }

    fn len(&self) -> usize {
        match self {
            Samples::U8(data) => data.len(),
            Samples::U16(data) => data.len(),
        }
    }

    /// Sample at `index`, scaled to 8 bits
    fn get_u8(&self, index: usize) -> u8 {
        match self {
            Samples::U8(data) => data[index],
            Samples::U16(data) => (data[index] / 257) as u8,
        }
    }

    /// Whether the sample at `index` holds the maximum value for its type
    fn is_max(&self, index: usize) -> bool {
        match self {
            Samples::U8(data) => data[index] == u8::MAX,
            Samples::U16(data) => data[index] == u16::MAX,
        }
    }
}

/// Rectangular pixel window inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelWindow {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    pub fn new(col: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            col,
            row,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A georeferenced raster loaded into memory
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// Display name, usually the file stem
    pub name: String,
    /// Source file, if the raster was read from disk
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    /// Number of interleaved bands (1-4)
    pub bands: u8,
    pub samples: Samples,
    pub transform: GeoTransform,
    /// EPSG code of the spatial reference, when known
    pub epsg: Option<u16>,
}

impl RasterImage {
    /// Create a raster from interleaved samples, validating the layout
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        bands: u8,
        samples: Samples,
        transform: GeoTransform,
        epsg: Option<u16>,
    ) -> Result<Self, ProcessError> {
        let name = name.into();

        if !(1..=4).contains(&bands) {
            return Err(ProcessError::UnsupportedImage {
                name,
                reason: format!("{} bands (expected 1-4)", bands),
            });
        }

        let expected = width as usize * height as usize * bands as usize;
        if samples.len() != expected {
            return Err(ProcessError::UnsupportedImage {
                name,
                reason: format!(
                    "sample buffer holds {} values, expected {}",
                    samples.len(),
                    expected
                ),
            });
        }

        Ok(Self {
            name,
            path: None,
            width,
            height,
            bands,
            samples,
            transform,
            epsg,
        })
    }

    /// Attach the source path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn has_alpha(&self) -> bool {
        self.bands == 2 || self.bands == 4
    }

    fn color_bands(&self) -> u8 {
        if self.has_alpha() {
            self.bands - 1
        } else {
            self.bands
        }
    }

    /// Geographic footprint derived from the affine transform
    pub fn footprint(&self) -> Polygon<f64> {
        self.transform.footprint(self.width, self.height)
    }

    /// Full-extent window
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::new(0, 0, self.width, self.height)
    }

    /// Copy of the pixels inside `window`, georeferenced to the window origin.
    ///
    /// The window is clamped to the raster bounds.
    pub fn crop(&self, window: &PixelWindow) -> RasterImage {
        let col = window.col.min(self.width);
        let row = window.row.min(self.height);
        let width = window.width.min(self.width - col);
        let height = window.height.min(self.height - row);

        let bands = self.bands as usize;
        let src_stride = self.width as usize * bands;
        let span = width as usize * bands;

        macro_rules! crop_rows {
            ($data:expr) => {{
                let mut out = Vec::with_capacity(span * height as usize);
                for r in row as usize..(row + height) as usize {
                    let start = r * src_stride + col as usize * bands;
                    out.extend_from_slice(&$data[start..start + span]);
                }
                out
            }};
        }

        let samples = match &self.samples {
            Samples::U8(data) => Samples::U8(crop_rows!(data)),
            Samples::U16(data) => Samples::U16(crop_rows!(data)),
        };

        RasterImage {
            name: self.name.clone(),
            path: self.path.clone(),
            width,
            height,
            bands: self.bands,
            samples,
            transform: self.transform.translated(col, row),
            epsg: self.epsg,
        }
    }

    /// Rec. 601 luminance, scaled to 8 bits
    pub fn luminance(&self) -> GrayImage {
        let bands = self.bands as usize;
        let color = self.color_bands();

        GrayImage::from_fn(self.width, self.height, |x, y| {
            let base = (y as usize * self.width as usize + x as usize) * bands;
            let value = if color == 1 {
                self.samples.get_u8(base)
            } else {
                let r = self.samples.get_u8(base) as f32;
                let g = self.samples.get_u8(base + 1) as f32;
                let b = self.samples.get_u8(base + 2) as f32;
                (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8
            };
            Luma([value])
        })
    }

    /// Validity mask from the alpha band: 255 where fully opaque, 0 elsewhere.
    ///
    /// `None` when the raster has no alpha band.
    pub fn alpha_mask(&self) -> Option<GrayImage> {
        if !self.has_alpha() {
            return None;
        }
        let bands = self.bands as usize;
        let alpha = bands - 1;

        Some(GrayImage::from_fn(self.width, self.height, |x, y| {
            let base = (y as usize * self.width as usize + x as usize) * bands;
            if self.samples.is_max(base + alpha) {
                Luma([255])
            } else {
                Luma([0])
            }
        }))
    }

    /// 8-bit RGBA rendering of the color bands, fully opaque
    pub fn to_rgba8(&self) -> RgbaImage {
        let bands = self.bands as usize;
        let color = self.color_bands();

        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let base = (y as usize * self.width as usize + x as usize) * bands;
            if color == 1 {
                let v = self.samples.get_u8(base);
                Rgba([v, v, v, 255])
            } else {
                Rgba([
                    self.samples.get_u8(base),
                    self.samples.get_u8(base + 1),
                    self.samples.get_u8(base + 2),
                    255,
                ])
            }
        })
    }
}
