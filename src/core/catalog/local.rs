//! Catalog backed by a saved search result and a local raster directory.

use super::{feature, ImageCatalog, ImageRecord, RasterFilter, SearchQuery};
use crate::core::raster::{read_geotiff, RasterImage};
use crate::error::CatalogError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Catalog over a search-result JSON file and an optional raster directory.
///
/// A record downloads from the raster whose file stem equals its id, or
/// failing that, starts with `<id>_` (provider asset suffixes such as
/// `_3B_Visual`).
pub struct LocalCatalog {
    records: Vec<ImageRecord>,
    rasters: HashMap<String, PathBuf>,
}

impl LocalCatalog {
    /// Load search results without any rasters
    pub fn from_search_file(search_path: &Path) -> Result<Self, CatalogError> {
        if !search_path.exists() {
            return Err(CatalogError::SearchFileNotFound {
                path: search_path.to_path_buf(),
            });
        }

        let json = fs::read_to_string(search_path).map_err(|e| CatalogError::Io {
            path: search_path.to_path_buf(),
            source: e,
        })?;
        let records =
            feature::parse_search_results(&json).map_err(|e| CatalogError::Parse {
                path: search_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            path = %search_path.display(),
            records = records.len(),
            "loaded search results"
        );

        Ok(Self {
            records,
            rasters: HashMap::new(),
        })
    }

    /// Load search results and index the GeoTIFFs under `raster_dir`
    pub fn open(search_path: &Path, raster_dir: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::from_search_file(search_path)?;
        catalog.index_rasters(raster_dir)?;
        Ok(catalog)
    }

    /// Build a catalog from records already in memory
    pub fn from_records(records: Vec<ImageRecord>) -> Self {
        Self {
            records,
            rasters: HashMap::new(),
        }
    }

    /// Index every GeoTIFF below `raster_dir` by file stem
    pub fn index_rasters(&mut self, raster_dir: &Path) -> Result<usize, CatalogError> {
        if !raster_dir.is_dir() {
            return Err(CatalogError::Io {
                path: raster_dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let filter = RasterFilter::new();
        let mut indexed = 0;

        for entry in WalkDir::new(raster_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || !filter.should_include(path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.rasters.insert(stem.to_string(), path.to_path_buf());
                indexed += 1;
            }
        }

        tracing::debug!(dir = %raster_dir.display(), indexed, "indexed rasters");
        Ok(indexed)
    }

    /// Path of the raster holding a record's pixels
    pub fn locate(&self, record: &ImageRecord) -> Option<&Path> {
        if let Some(path) = self.rasters.get(&record.id) {
            return Some(path);
        }

        let prefix = format!("{}_", record.id);
        let mut candidates: Vec<(&String, &PathBuf)> = self
            .rasters
            .iter()
            .filter(|(stem, _)| stem.starts_with(&prefix))
            .collect();
        candidates.sort();
        candidates.first().map(|(_, path)| path.as_path())
    }

    /// All records, unfiltered
    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }
}

impl ImageCatalog for LocalCatalog {
    fn search(&self, query: &SearchQuery) -> Result<Vec<ImageRecord>, CatalogError> {
        Ok(self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    fn download(&self, record: &ImageRecord) -> Result<RasterImage, CatalogError> {
        let path = self
            .locate(record)
            .ok_or_else(|| CatalogError::RasterNotFound {
                id: record.id.clone(),
            })?;

        read_geotiff(path).map_err(|e| CatalogError::Download {
            id: record.id.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SEARCH: &str = r#"[
        {"id": "scene_a", "properties": {"satellite_id": "s", "strip_id": "1", "item_type": "PSScene3Band"}},
        {"id": "scene_b", "properties": {"satellite_id": "s", "strip_id": "1", "item_type": "PSScene4Band"}}
    ]"#;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let search = dir.path().join("search.json");
        fs::write(&search, SEARCH).unwrap();
        let rasters = dir.path().join("rasters");
        fs::create_dir_all(rasters.join("nested")).unwrap();
        fs::write(rasters.join("scene_a.tif"), b"").unwrap();
        fs::write(rasters.join("nested").join("scene_b_3B_Visual.tif"), b"").unwrap();
        fs::write(rasters.join("scene_b.json"), b"{}").unwrap();
        (dir, search, rasters)
    }

    #[test]
    fn missing_search_file_is_reported() {
        let result = LocalCatalog::from_search_file(Path::new("/nonexistent/search.json"));
        assert!(matches!(result, Err(CatalogError::SearchFileNotFound { .. })));
    }

    #[test]
    fn malformed_search_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let search = dir.path().join("search.json");
        fs::write(&search, "{ nope").unwrap();

        let result = LocalCatalog::from_search_file(&search);
        assert!(matches!(result, Err(CatalogError::Parse { .. })));
    }

    #[test]
    fn search_applies_query() {
        let (_dir, search, _) = setup();
        let catalog = LocalCatalog::from_search_file(&search).unwrap();

        let all = catalog.search(&SearchQuery::default()).unwrap();
        assert_eq!(all.len(), 2);

        let query = SearchQuery {
            item_types: vec!["PSScene4Band".to_string()],
            ..Default::default()
        };
        let filtered = catalog.search(&query).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "scene_b");
    }

    #[test]
    fn locate_matches_exact_and_suffixed_stems() {
        let (_dir, search, rasters) = setup();
        let catalog = LocalCatalog::open(&search, &rasters).unwrap();
        let records = catalog.records();

        assert!(catalog.locate(&records[0]).unwrap().ends_with("scene_a.tif"));
        assert!(catalog
            .locate(&records[1])
            .unwrap()
            .ends_with("scene_b_3B_Visual.tif"));
    }

    #[test]
    fn download_without_raster_is_not_found() {
        let (_dir, search, _) = setup();
        let catalog = LocalCatalog::from_search_file(&search).unwrap();
        let result = catalog.download(&catalog.records()[0]);
        assert!(matches!(result, Err(CatalogError::RasterNotFound { .. })));
    }

    #[test]
    fn download_of_corrupt_raster_reports_read_error() {
        let (_dir, search, rasters) = setup();
        let catalog = LocalCatalog::open(&search, &rasters).unwrap();
        let result = catalog.download(&catalog.records()[0]);
        assert!(matches!(result, Err(CatalogError::Download { .. })));
    }
}
