//! Pair processing options.

use crate::core::composite::{Resampling, DEFAULT_FRAME_DELAY_MS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to render for a pair and where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Output directory (None = directory of the first image)
    pub out_dir: Option<PathBuf>,
    /// Write the flicker GIF
    pub flicker: bool,
    /// Write the color-multiview GeoTIFF
    pub composite: bool,
    /// Delay between flicker frames
    pub frame_delay_ms: u32,
    /// Filter for aligning crops of different resolution
    pub resampling: Resampling,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            out_dir: None,
            flicker: true,
            composite: true,
            frame_delay_ms: DEFAULT_FRAME_DELAY_MS,
            resampling: Resampling::Nearest,
        }
    }
}

impl ProcessOptions {
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    pub fn with_flicker(mut self, enabled: bool) -> Self {
        self.flicker = enabled;
        self
    }

    pub fn with_composite(mut self, enabled: bool) -> Self {
        self.composite = enabled;
        self
    }

    pub fn with_frame_delay_ms(mut self, delay_ms: u32) -> Self {
        self.frame_delay_ms = delay_ms;
        self
    }

    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }
}
