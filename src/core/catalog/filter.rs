//! File filtering for raster directories.

use std::collections::HashSet;
use std::path::Path;

/// Decides which files in a raster directory are candidate scenes
pub struct RasterFilter {
    /// File extensions to include (lowercase, without dot)
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl RasterFilter {
    /// Create a filter accepting GeoTIFF extensions
    pub fn new() -> Self {
        Self {
            extensions: ["tif", "tiff"].iter().map(|e| e.to_string()).collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for RasterFilter {
    fn default() -> Self {
        Self::new()
    }
}
