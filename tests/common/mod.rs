//! Shared fixtures for integration tests.

#![allow(dead_code)]

use scene_pairs::core::raster::{write_geotiff, GeoTransform, RasterImage, Samples};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// UTM zone 10N
pub const EPSG: u16 = 32610;

/// Single-band 8-bit raster with a horizontal gradient, 1 m pixels
pub fn gradient(name: &str, width: u32, height: u32, x: f64, y: f64) -> RasterImage {
    let data = (0..height)
        .flat_map(|_| (0..width).map(|col| (col % 256) as u8))
        .collect();
    RasterImage::new(
        name,
        width,
        height,
        1,
        Samples::U8(data),
        GeoTransform::north_up(x, y, 1.0, 1.0),
        Some(EPSG),
    )
    .unwrap()
}

/// Write a raster to `<dir>/<name>.tif`
pub fn write_tif(dir: &Path, raster: &RasterImage) -> PathBuf {
    let path = dir.join(format!("{}.tif", raster.name));
    let mut writer = BufWriter::new(File::create(&path).unwrap());
    write_geotiff(&mut writer, raster).unwrap();
    path
}
