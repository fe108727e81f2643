//! # Error Module
//!
//! Error types for pair discovery and pair processing.
//!
//! ## Design Principles
//! - **Never panic** on catalog or raster data - return errors instead
//! - **Include context** - paths, record ids, what went wrong
//! - **Terminal per pair** - a failed pair never aborts a batch

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while processing an image pair
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read image {path}: {reason}")]
    ImageRead { path: PathBuf, reason: String },

    #[error("Images do not overlap: {left} and {right}")]
    NoOverlap { left: String, right: String },

    #[error("Unsupported image {name}: {reason}")]
    UnsupportedImage { name: String, reason: String },

    #[error("Failed to resample overlap crop: {0}")]
    Resample(String),

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while searching or downloading from a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Search results not found: {path}")]
    SearchFileNotFound { path: PathBuf },

    #[error("Failed to parse search results {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("No raster found for scene {id}")]
    RasterNotFound { id: String },

    #[error("Failed to load raster for scene {id}: {source}")]
    Download {
        id: String,
        #[source]
        source: ProcessError,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_read_error_includes_path() {
        let error = ProcessError::ImageRead {
            path: PathBuf::from("/scenes/broken.tif"),
            reason: "not a TIFF".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/scenes/broken.tif"));
        assert!(message.contains("not a TIFF"));
    }

    #[test]
    fn no_overlap_names_both_images() {
        let error = ProcessError::NoOverlap {
            left: "20170101_1".to_string(),
            right: "20170101_2".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("20170101_1"));
        assert!(message.contains("20170101_2"));
    }

    #[test]
    fn catalog_errors_wrap_into_scene_error() {
        let error: SceneError = CatalogError::RasterNotFound {
            id: "scene_a".to_string(),
        }
        .into();
        assert!(error.to_string().contains("scene_a"));
    }
}
