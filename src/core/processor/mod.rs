//! # Processor Module
//!
//! Renders comparison artifacts for one pair of overlapping rasters.
//!
//! ## Steps
//! 1. Intersect the two footprints
//! 2. Map the intersection into each pixel grid and crop
//! 3. Align the crops onto the finer grid
//! 4. Write `<a>__<b>.gif` (flicker) and `<a>__<b>.tif` (color multiview)
//!
//! Outputs are staged as temporary files in the output directory and only
//! moved into place once every requested artifact encoded successfully, so
//! a failing pair leaves nothing behind.

mod options;

pub use options::ProcessOptions;

use crate::core::composite::{align_crops, build_cmv, write_flicker, AlignedPair};
use crate::core::overlap::{compute_overlap, OverlapRegion};
use crate::core::raster::{read_geotiff, write_geotiff, PixelWindow, RasterImage};
use crate::error::ProcessError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Files and geometry produced for one pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairOutputs {
    /// Shared stem of the output files
    pub basename: String,
    /// Flicker GIF, if requested
    pub flicker: Option<PathBuf>,
    /// Color-multiview GeoTIFF, if requested
    pub composite: Option<PathBuf>,
    /// Overlap window in the first raster
    pub window_a: PixelWindow,
    /// Overlap window in the second raster
    pub window_b: PixelWindow,
    /// Output raster size
    pub width: u32,
    pub height: u32,
}

/// Check that both rasters use the same band layout and sample type
pub fn check_compatible(a: &RasterImage, b: &RasterImage) -> Result<(), ProcessError> {
    if a.bands != b.bands {
        return Err(ProcessError::UnsupportedImage {
            name: b.name.clone(),
            reason: format!("{} bands, but {} has {}", b.bands, a.name, a.bands),
        });
    }
    if a.samples.bit_depth() != b.samples.bit_depth() {
        return Err(ProcessError::UnsupportedImage {
            name: b.name.clone(),
            reason: format!(
                "{}-bit samples, but {} has {}-bit",
                b.samples.bit_depth(),
                a.name,
                a.samples.bit_depth()
            ),
        });
    }
    Ok(())
}

/// Output basename for two rasters: `<stem a>__<stem b>`
pub fn pair_basename(a: &RasterImage, b: &RasterImage) -> String {
    format!("{}__{}", a.name, b.name)
}

/// Read two GeoTIFFs and render their comparison artifacts.
///
/// Outputs go to `options.out_dir`, or next to the first image when unset.
pub fn process_pair(
    path_a: &Path,
    path_b: &Path,
    options: &ProcessOptions,
) -> Result<PairOutputs, ProcessError> {
    let a = read_geotiff(path_a)?;
    let b = read_geotiff(path_b)?;

    let out_dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => path_a
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    process_rasters(&a, &b, &pair_basename(&a, &b), &out_dir, options)
}

/// Render comparison artifacts for two rasters already in memory
pub fn process_rasters(
    a: &RasterImage,
    b: &RasterImage,
    basename: &str,
    out_dir: &Path,
    options: &ProcessOptions,
) -> Result<PairOutputs, ProcessError> {
    check_compatible(a, b)?;

    let overlap = compute_overlap(a, b)?;
    let aligned = crop_and_align(a, b, &overlap, options)?;
    let (width, height) = aligned.dimensions();

    fs::create_dir_all(out_dir).map_err(|e| ProcessError::Io {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let flicker_path = out_dir.join(format!("{}.gif", basename));
    let composite_path = out_dir.join(format!("{}.tif", basename));

    let mut staged: Vec<(NamedTempFile, PathBuf)> = Vec::new();

    if options.flicker {
        let mut file = stage(out_dir, ".gif")?;
        let frames = [aligned.frame_a.clone(), aligned.frame_b.clone()];
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            write_flicker(&mut writer, &frames, options.frame_delay_ms, &flicker_path)?;
            writer.flush().map_err(|e| ProcessError::Io {
                path: flicker_path.clone(),
                source: e,
            })?;
        }
        staged.push((file, flicker_path.clone()));
    }

    if options.composite {
        let mut cmv = build_cmv(
            basename,
            &aligned.luma_a,
            &aligned.luma_b,
            aligned.transform,
            aligned.epsg,
        )?;
        cmv.path = Some(composite_path.clone());

        let mut file = stage(out_dir, ".tif")?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            write_geotiff(&mut writer, &cmv)?;
            writer.flush().map_err(|e| ProcessError::Io {
                path: composite_path.clone(),
                source: e,
            })?;
        }
        staged.push((file, composite_path.clone()));
    }

    let written = persist_all(staged)?;

    tracing::info!(
        basename,
        width,
        height,
        files = written.len(),
        "processed pair"
    );

    Ok(PairOutputs {
        basename: basename.to_string(),
        flicker: options.flicker.then_some(flicker_path),
        composite: options.composite.then_some(composite_path),
        window_a: overlap.window_a,
        window_b: overlap.window_b,
        width,
        height,
    })
}

fn crop_and_align(
    a: &RasterImage,
    b: &RasterImage,
    overlap: &OverlapRegion,
    options: &ProcessOptions,
) -> Result<AlignedPair, ProcessError> {
    let crop_a = a.crop(&overlap.window_a);
    let crop_b = b.crop(&overlap.window_b);
    align_crops(&crop_a, &crop_b, options.resampling)
}

fn stage(out_dir: &Path, suffix: &str) -> Result<NamedTempFile, ProcessError> {
    tempfile::Builder::new()
        .prefix(".scene-pairs-")
        .suffix(suffix)
        .tempfile_in(out_dir)
        .map_err(|e| ProcessError::Io {
            path: out_dir.to_path_buf(),
            source: e,
        })
}

/// Move staged files into place; on failure remove the ones already moved
fn persist_all(staged: Vec<(NamedTempFile, PathBuf)>) -> Result<Vec<PathBuf>, ProcessError> {
    let mut written: Vec<PathBuf> = Vec::new();

    for (file, target) in staged {
        if let Err(e) = file.persist(&target) {
            for path in &written {
                let _ = fs::remove_file(path);
            }
            return Err(ProcessError::Io {
                path: target,
                source: e.error,
            });
        }
        written.push(target);
    }

    Ok(written)
}
