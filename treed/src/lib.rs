//! Converts tree-crown polygon surveys into COCO-style JSON annotation files.
//!
//! The pipeline takes a vector feature source (a shapefile of crown
//! outlines), a folder containing the orthomosaic the outlines were drawn
//! over, and two CSV tables (taxonomy and per-image metadata). It produces a
//! single self-contained dataset document: one image record with resolved
//! spectral bands, one category per taxonomy row, and one annotation per
//! valid crown polygon, with segmentation, bounding box and area expressed
//! in pixel coordinates.
//!
//! [`assembler::Assembler`] drives the whole run; the other modules are its
//! building blocks and are usable on their own.

pub mod assembler;
pub mod bands;
pub mod dataset;
pub mod metadata;
pub mod projector;
pub mod raster;
pub mod taxonomy;
pub mod vector;

mod error;
pub use error::TreedError;
