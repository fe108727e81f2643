//! # Catalog Module
//!
//! Image metadata records and the boundary to an imagery provider.
//!
//! The pair finder and processor never talk to a provider directly. They go
//! through [`ImageCatalog`], which exposes only a search and a download.
//! [`LocalCatalog`] implements it over a saved search-result file and a
//! directory of GeoTIFFs named after the scene ids.
//!
//! ## Example
//! ```rust,ignore
//! let catalog = LocalCatalog::open("search.json", "scenes/")?;
//! let records = catalog.search(&SearchQuery::default())?;
//! let raster = catalog.download(&records[0])?;
//! ```

mod feature;
mod filter;
mod local;

pub use feature::{parse_acquired, parse_polygon_geojson, parse_search_results};
pub use filter::RasterFilter;
pub use local::LocalCatalog;

use crate::core::raster::RasterImage;
use crate::error::CatalogError;
use chrono::{DateTime, Utc};
use geo::{Intersects, Polygon};

/// Metadata of one scene as returned by a catalog search
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Scene identifier
    pub id: String,
    pub satellite_id: String,
    /// Identifier of the scan pass the scene belongs to
    pub strip_id: String,
    /// Acquisition time; `None` when the catalog omitted or garbled it
    pub acquired: Option<DateTime<Utc>>,
    /// Geographic footprint; `None` unless the catalog gave a polygon
    pub footprint: Option<Polygon<f64>>,
    pub provider: Option<String>,
    pub item_type: Option<String>,
}

impl ImageRecord {
    /// Create a record without timestamp or footprint
    pub fn new(
        id: impl Into<String>,
        satellite_id: impl Into<String>,
        strip_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            satellite_id: satellite_id.into(),
            strip_id: strip_id.into(),
            acquired: None,
            footprint: None,
            provider: None,
            item_type: None,
        }
    }

    pub fn with_acquired(mut self, acquired: DateTime<Utc>) -> Self {
        self.acquired = Some(acquired);
        self
    }

    pub fn with_footprint(mut self, footprint: Polygon<f64>) -> Self {
        self.footprint = Some(footprint);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }
}

/// Search filter applied by a catalog
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Keep scenes whose footprint intersects this area
    pub aoi: Option<Polygon<f64>>,
    /// Keep scenes of these item types (empty = all)
    pub item_types: Vec<String>,
    /// Keep scenes acquired at or after this time
    pub acquired_after: Option<DateTime<Utc>>,
    /// Keep scenes acquired at or before this time
    pub acquired_before: Option<DateTime<Utc>>,
}

impl SearchQuery {
    /// Check whether a record passes every filter of the query
    pub fn matches(&self, record: &ImageRecord) -> bool {
        if let Some(aoi) = &self.aoi {
            match &record.footprint {
                Some(footprint) if footprint.intersects(aoi) => {}
                _ => return false,
            }
        }

        if !self.item_types.is_empty() {
            match &record.item_type {
                Some(kind) if self.item_types.contains(kind) => {}
                _ => return false,
            }
        }

        if self.acquired_after.is_some() || self.acquired_before.is_some() {
            let Some(acquired) = record.acquired else {
                return false;
            };
            if self.acquired_after.is_some_and(|after| acquired < after) {
                return false;
            }
            if self.acquired_before.is_some_and(|before| acquired > before) {
                return false;
            }
        }

        true
    }
}

/// Access to an imagery provider
pub trait ImageCatalog: Send + Sync {
    /// Records matching the query, in the provider's order
    fn search(&self, query: &SearchQuery) -> Result<Vec<ImageRecord>, CatalogError>;

    /// Raster data of a record
    fn download(&self, record: &ImageRecord) -> Result<RasterImage, CatalogError>;
}
