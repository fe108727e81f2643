//! GeoTIFF reading and writing on top of the tiff crate.
//!
//! Georeferencing is read from ModelTransformation, or from ModelPixelScale
//! plus ModelTiepoint. The spatial reference is taken from the
//! GeoKeyDirectory (ProjectedCSType, then GeographicType). Tiepoints of
//! PixelIsPoint rasters name pixel centres and are moved to the corner.

use super::{GeoTransform, RasterImage, Samples};
use crate::error::ProcessError;
use std::fs::File;
use std::io::{BufReader, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tiff::{ColorType, TiffResult};

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// Read a GeoTIFF into memory
pub fn read_geotiff(path: &Path) -> Result<RasterImage, ProcessError> {
    let read_error = |reason: String| ProcessError::ImageRead {
        path: path.to_path_buf(),
        reason,
    };
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let file = File::open(path).map_err(|e| read_error(e.to_string()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| read_error(format!("not a TIFF: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| read_error(e.to_string()))?;
    let color_type = decoder
        .colortype()
        .map_err(|e| read_error(e.to_string()))?;

    let bands = match color_type {
        ColorType::Gray(8 | 16) => 1,
        ColorType::GrayA(8 | 16) => 2,
        ColorType::RGB(8 | 16) => 3,
        ColorType::RGBA(8 | 16) => 4,
        other => {
            return Err(ProcessError::UnsupportedImage {
                name,
                reason: format!("color type {:?}", other),
            })
        }
    };

    let keys = GeoKeys::read(&mut decoder);
    let mut transform = read_transform(&mut decoder).map_err(read_error)?;
    if keys.get(GT_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        transform = transform.offset(-0.5, -0.5);
    }
    let epsg = keys.epsg();

    let samples = match decoder
        .read_image()
        .map_err(|e| read_error(format!("failed to decode pixels: {}", e)))?
    {
        DecodingResult::U8(data) => Samples::U8(data),
        DecodingResult::U16(data) => Samples::U16(data),
        _ => {
            return Err(ProcessError::UnsupportedImage {
                name,
                reason: "sample format is not 8- or 16-bit unsigned".to_string(),
            })
        }
    };

    tracing::debug!(
        path = %path.display(),
        width,
        height,
        bands,
        epsg = ?epsg,
        "read raster"
    );

    Ok(RasterImage::new(name, width, height, bands, samples, transform, epsg)?.with_path(path))
}

fn read_transform<R: std::io::Read + Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform, String> {
    if let Some(value) = decoder
        .find_tag(Tag::ModelTransformationTag)
        .map_err(|e| e.to_string())?
    {
        let m = value.into_f64_vec().map_err(|e| e.to_string())?;
        if m.len() < 8 {
            return Err(format!("ModelTransformation has {} values", m.len()));
        }
        return Ok(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
    }

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "missing georeferencing tags".to_string())?
        .into_f64_vec()
        .map_err(|e| e.to_string())?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "missing ModelTiepoint tag".to_string())?
        .into_f64_vec()
        .map_err(|e| e.to_string())?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err("malformed ModelPixelScale/ModelTiepoint tags".to_string());
    }

    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (sx, sy) = (scale[0], scale[1]);
    Ok(GeoTransform::north_up(x - i * sx, y + j * sy, sx, sy))
}

/// Entries of the GeoKeyDirectory that hold their value inline
#[derive(Debug, Default)]
struct GeoKeys {
    entries: Vec<(u16, u16)>,
}

impl GeoKeys {
    fn read<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> Self {
        let keys = decoder
            .find_tag(Tag::GeoKeyDirectoryTag)
            .ok()
            .flatten()
            .and_then(|value| value.into_u16_vec().ok())
            .unwrap_or_default();

        let entries = keys
            .get(4..)
            .unwrap_or_default()
            .chunks_exact(4)
            .filter(|e| e[1] == 0)
            .map(|e| (e[0], e[3]))
            .collect();
        Self { entries }
    }

    fn get(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, value)| *value)
    }

    fn epsg(&self) -> Option<u16> {
        let code = |key| self.get(key).filter(|v| *v != USER_DEFINED);
        code(PROJECTED_CS_TYPE).or_else(|| code(GEOGRAPHIC_TYPE))
    }
}

/// GeoKeyDirectory entries describing `epsg`
fn geo_key_directory(epsg: Option<u16>) -> Vec<u16> {
    let mut keys = vec![(GT_RASTER_TYPE, RASTER_PIXEL_IS_AREA)];
    if let Some(code) = epsg {
        if (4000..5000).contains(&code) {
            keys.push((GT_MODEL_TYPE, MODEL_TYPE_GEOGRAPHIC));
            keys.push((GEOGRAPHIC_TYPE, code));
        } else {
            keys.push((GT_MODEL_TYPE, MODEL_TYPE_PROJECTED));
            keys.push((PROJECTED_CS_TYPE, code));
        }
    }
    keys.sort_by_key(|(key, _)| *key);

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    for (key, value) in keys {
        directory.extend_from_slice(&[key, 0, 1, value]);
    }
    directory
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    directory: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    epsg: Option<u16>,
) -> TiffResult<()> {
    if transform.is_rotated() {
        let gt = transform;
        let matrix = [
            gt.pixel_width,
            gt.rotation_x,
            0.0,
            gt.top_left_x,
            gt.rotation_y,
            gt.pixel_height,
            0.0,
            gt.top_left_y,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ];
        directory.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    } else {
        let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, transform.top_left_x, transform.top_left_y, 0.0];
        directory.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        directory.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    }
    directory.write_tag(Tag::GeoKeyDirectoryTag, &geo_key_directory(epsg)[..])?;
    Ok(())
}

fn encode<C, W>(
    encoder: &mut TiffEncoder<W>,
    raster: &RasterImage,
    data: &[C::Inner],
) -> TiffResult<()>
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
    W: Write + Seek,
{
    let mut image = encoder.new_image::<C>(raster.width, raster.height)?;
    write_geo_tags(image.encoder(), &raster.transform, raster.epsg)?;
    image.write_data(data)
}

/// Write a raster as a GeoTIFF.
///
/// Two-band (gray + alpha) rasters cannot be written.
pub fn write_geotiff<W: Write + Seek>(writer: W, raster: &RasterImage) -> Result<(), ProcessError> {
    let target = raster
        .path
        .clone()
        .unwrap_or_else(|| raster.name.clone().into());
    let encode_error = |e: tiff::TiffError| ProcessError::Encode {
        path: target.clone(),
        reason: e.to_string(),
    };

    let mut encoder = TiffEncoder::new(writer).map_err(encode_error)?;

    let result = match (&raster.samples, raster.bands) {
        (Samples::U8(data), 1) => encode::<colortype::Gray8, _>(&mut encoder, raster, data),
        (Samples::U8(data), 3) => encode::<colortype::RGB8, _>(&mut encoder, raster, data),
        (Samples::U8(data), 4) => encode::<colortype::RGBA8, _>(&mut encoder, raster, data),
        (Samples::U16(data), 1) => encode::<colortype::Gray16, _>(&mut encoder, raster, data),
        (Samples::U16(data), 3) => encode::<colortype::RGB16, _>(&mut encoder, raster, data),
        (Samples::U16(data), 4) => encode::<colortype::RGBA16, _>(&mut encoder, raster, data),
        (_, bands) => {
            return Err(ProcessError::UnsupportedImage {
                name: raster.name.clone(),
                reason: format!("cannot write {}-band TIFF", bands),
            })
        }
    };

    result.map_err(encode_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn sample_raster(transform: GeoTransform, epsg: Option<u16>) -> RasterImage {
        let data: Vec<u8> = (0..6 * 4 * 3).map(|i| (i * 3 % 256) as u8).collect();
        RasterImage::new("sample", 6, 4, 3, Samples::U8(data), transform, epsg).unwrap()
    }

    fn write_to(dir: &TempDir, name: &str, raster: &RasterImage) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let file = File::create(&path).unwrap();
        write_geotiff(file, raster).unwrap();
        path
    }

    #[test]
    fn north_up_raster_round_trips() {
        let dir = TempDir::new().unwrap();
        let original = sample_raster(
            GeoTransform::north_up(552_000.0, 4_180_000.0, 3.0, 3.0),
            Some(32610),
        );
        let path = write_to(&dir, "north_up.tif", &original);

        let read = read_geotiff(&path).unwrap();

        assert_eq!(read.name, "north_up");
        assert_eq!((read.width, read.height, read.bands), (6, 4, 3));
        assert_eq!(read.samples, original.samples);
        assert_eq!(read.epsg, Some(32610));
        assert_relative_eq!(read.transform.top_left_x, 552_000.0);
        assert_relative_eq!(read.transform.top_left_y, 4_180_000.0);
        assert_relative_eq!(read.transform.pixel_width, 3.0);
        assert_relative_eq!(read.transform.pixel_height, -3.0);
    }

    #[test]
    fn rotated_raster_uses_model_transformation() {
        let dir = TempDir::new().unwrap();
        let transform = GeoTransform::from_gdal([10.0, 2.0, 0.5, 50.0, 0.25, -2.0]);
        let path = write_to(&dir, "rotated.tif", &sample_raster(transform, Some(4326)));

        let read = read_geotiff(&path).unwrap();

        for (got, want) in read.transform.to_gdal().iter().zip(transform.to_gdal()) {
            assert_relative_eq!(*got, want);
        }
        assert_eq!(read.epsg, Some(4326));
    }

    #[test]
    fn missing_file_is_image_read_error() {
        let result = read_geotiff(Path::new("/nonexistent/scene.tif"));
        assert!(matches!(result, Err(ProcessError::ImageRead { .. })));
    }

    #[test]
    fn corrupt_file_is_image_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.tif");
        std::fs::write(&path, b"this is not a tiff").unwrap();

        let result = read_geotiff(&path);
        assert!(matches!(result, Err(ProcessError::ImageRead { .. })));
    }

    #[test]
    fn geo_key_directory_without_epsg_has_raster_type_only() {
        assert_eq!(geo_key_directory(None), vec![1, 1, 0, 1, 1025, 0, 1, 1]);
    }

    #[test]
    fn pixel_is_point_origin_moves_to_corner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("point.tif");

        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        let mut image = encoder.new_image::<colortype::Gray8>(2, 2).unwrap();
        #[rustfmt::skip]
        let keys: [u16; 12] = [
            1, 1, 0, 2,
            GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_POINT,
            PROJECTED_CS_TYPE, 0, 1, 32610,
        ];
        let directory = image.encoder();
        directory.write_tag(Tag::ModelPixelScaleTag, &[10.0, 10.0, 0.0][..]).unwrap();
        directory
            .write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, 1_000.0, 2_000.0, 0.0][..])
            .unwrap();
        directory.write_tag(Tag::GeoKeyDirectoryTag, &keys[..]).unwrap();
        image.write_data(&[0u8, 1, 2, 3]).unwrap();

        let read = read_geotiff(&path).unwrap();

        assert_relative_eq!(read.transform.top_left_x, 995.0);
        assert_relative_eq!(read.transform.top_left_y, 2_005.0);
        assert_eq!(read.epsg, Some(32610));
    }

    #[test]
    fn pixel_is_area_origin_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_to(
            &dir,
            "area.tif",
            &sample_raster(GeoTransform::north_up(1_000.0, 2_000.0, 10.0, 10.0), None),
        );

        let read = read_geotiff(&path).unwrap();

        assert_relative_eq!(read.transform.top_left_x, 1_000.0);
        assert_relative_eq!(read.transform.top_left_y, 2_000.0);
        assert_eq!(read.epsg, None);
    }
}
