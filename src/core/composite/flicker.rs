//! Flicker animation: the two overlap crops as an endlessly looping GIF.

use crate::error::ProcessError;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::io::Write;
use std::path::Path;

/// Default delay between frames
pub const DEFAULT_FRAME_DELAY_MS: u32 = 500;

/// NeuQuant speed passed to the GIF encoder (1 = best, 30 = fastest)
const QUANTIZER_SPEED: i32 = 10;

/// Encode `frames` as a looping GIF with a fixed delay between frames
pub fn write_flicker<W: Write>(
    writer: W,
    frames: &[RgbaImage],
    frame_delay_ms: u32,
    target: &Path,
) -> Result<(), ProcessError> {
    let encode_error = |e: image::ImageError| ProcessError::Encode {
        path: target.to_path_buf(),
        reason: e.to_string(),
    };

    let mut encoder = GifEncoder::new_with_speed(writer, QUANTIZER_SPEED);
    encoder.set_repeat(Repeat::Infinite).map_err(encode_error)?;

    let delay = Delay::from_numer_denom_ms(frame_delay_ms, 1);
    encoder
        .encode_frames(
            frames
                .iter()
                .map(|f| Frame::from_parts(f.clone(), 0, 0, delay)),
        )
        .map_err(encode_error)
}
