//! Error type used by the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Error enum.
///
/// Every variant is abort-level: the run produces no output once one of
/// these is returned. Per-feature problems (bad geometry, unknown species)
/// are not errors; they are logged, counted and skipped by the assembler.
#[derive(Debug, Error)]
pub enum TreedError {
    /// An input table is missing a required column.
    #[error("invalid table schema: {0}")]
    Schema(String),

    /// A table row violates a data requirement.
    #[error("invalid table row: {0}")]
    Validation(String),

    /// A geometry could not be projected into pixel space.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// No raster image was found in the image folder.
    #[error("no raster image found in {0}")]
    NoRasterFound(PathBuf),

    /// The image record could not be resolved from raster and metadata.
    #[error("could not resolve image record for {0}")]
    ImageResolution(String),

    /// CSV reading failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// GDAL raster or vector access failed.
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
