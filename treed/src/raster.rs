//! Raster access.
//!
//! The pipeline never touches pixel values; all it needs from the raster is
//! its dimensions, band count and geo-transform. The dataset handle is
//! opened, summarized and dropped immediately.

use std::path::{Path, PathBuf};

use gdal::{Dataset, GeoTransform};

use crate::TreedError;

/// Raster file extensions tried when discovering the image, in priority
/// order.
pub const RASTER_EXTENSIONS: [&str; 5] = ["tif", "tiff", "jpg", "jpeg", "png"];

/// Summary of a raster image, extracted once at open time.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    /// File name without directory.
    pub file_name: String,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Ground resolution: the geo-transform's x-scale.
    pub resolution: f64,
    /// Number of raster bands.
    pub band_count: usize,
}

impl RasterSummary {
    /// Opens the raster just long enough to read its summary.
    pub fn open(path: impl AsRef<Path>) -> Result<RasterSummary, TreedError> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let (width, height) = dataset.raster_size();
        let transform = dataset.geo_transform()?;

        Ok(RasterSummary {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width,
            height,
            resolution: transform[1],
            band_count: dataset.raster_count(),
        })
    }
}

/// Opens the raster just long enough to read its geo-transform.
pub fn read_geo_transform(path: impl AsRef<Path>) -> Result<GeoTransform, TreedError> {
    Ok(Dataset::open(path.as_ref())?.geo_transform()?)
}

/// Locates the single raster image in a folder.
///
/// Extensions are tried in [`RASTER_EXTENSIONS`] order; the first extension
/// with any match wins, and within an extension the lexicographically first
/// file is taken so discovery is deterministic.
pub fn discover_raster(folder: impl AsRef<Path>) -> Result<PathBuf, TreedError> {
    let folder = folder.as_ref();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    for wanted in RASTER_EXTENSIONS {
        // Extensions match case-sensitively, as with a shell glob.
        let found = entries.iter().find(|path| {
            path.extension()
                .map(|ext| ext == wanted)
                .unwrap_or(false)
        });
        if let Some(path) = found {
            return Ok(path.clone());
        }
    }

    Err(TreedError::NoRasterFound(folder.to_path_buf()))
}
