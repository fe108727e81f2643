//! # Core Module
//!
//! The front-end-agnostic scene pairing engine.
//!
//! ## Modules
//! - `catalog` - Scene records, search queries and the provider boundary
//! - `matcher` - Finds same-strip pairs acquired moments apart
//! - `raster` - Georeferenced rasters and GeoTIFF I/O
//! - `overlap` - Intersects footprints and maps them to pixel windows
//! - `composite` - Flicker GIF and color-multiview rendering
//! - `processor` - Renders one pair end to end
//! - `pipeline` - Orchestrates search, matching and processing

pub mod catalog;
pub mod composite;
pub mod matcher;
pub mod overlap;
pub mod pipeline;
pub mod processor;
pub mod raster;

// Re-export commonly used types
pub use catalog::{ImageCatalog, ImageRecord, LocalCatalog, SearchQuery};
pub use matcher::{find_pairs, ImagePair, PairCriteria, StripCriteria};
pub use overlap::{compute_overlap, OverlapRegion};
pub use processor::{process_pair, PairOutputs, ProcessOptions};
pub use raster::{GeoTransform, PixelWindow, RasterImage};
