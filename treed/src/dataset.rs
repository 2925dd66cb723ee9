//! Output dataset model.
//!
//! A COCO-style schema variant: `info`, `licenses`, `categories`, `images`,
//! `annotations`. Field names and nesting are a stable contract for
//! downstream ML consumers, so everything here serializes exactly as the
//! format prescribes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::metadata::MetaValue;
use crate::taxonomy::Category;
use crate::TreedError;

/// Default dataset URL used when the caller does not override it.
pub const DEFAULT_URL: &str = "https://github.com/smk0061/TREE-D";

/// Default dataset description used when the caller does not override it.
pub const DEFAULT_DESCRIPTION: &str = "TREE-D Contribution";

/// Provenance block of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Human-readable dataset description.
    pub description: String,
    /// Dataset home URL.
    pub url: String,
    /// Schema version.
    pub version: String,
    /// Year of creation.
    pub year: String,
    /// Contributor name, possibly empty.
    pub contributor: String,
    /// Creation date, `YYYY-MM-DD`.
    pub date_created: String,
}

impl Default for DatasetInfo {
    fn default() -> Self {
        let now = Local::now();
        DatasetInfo {
            description: DEFAULT_DESCRIPTION.to_string(),
            url: DEFAULT_URL.to_string(),
            version: "1.0".to_string(),
            year: now.year().to_string(),
            contributor: String::new(),
            date_created: now.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One entry of the license list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License identifier referenced by image records.
    pub id: u32,
    /// License name.
    pub name: String,
    /// License URL.
    pub url: String,
}

impl License {
    /// The fixed single license entry every dataset carries.
    pub fn mit() -> License {
        License {
            id: 1,
            name: "MIT License".to_string(),
            url: "https://opensource.org/licenses/MIT".to_string(),
        }
    }
}

/// Descriptor of one spectral band of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralBand {
    /// Center wavelength in nanometers, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wavelength: Option<f64>,
    /// Bandwidth in nanometers, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<f64>,
    /// Display/order index, 1-based.
    pub order: u32,
}

/// The single image record of a dataset.
///
/// Besides the fixed raster-derived fields, the record carries every
/// metadata column that is not reserved for spectral-band derivation in the
/// `extra` map, flattened into the record on serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Image identifier. Always 1 in a single-image dataset.
    pub id: u32,
    /// Raster file name, without directory.
    pub file_name: String,
    /// Raster width in pixels.
    pub width: usize,
    /// Raster height in pixels.
    pub height: usize,
    /// Ground resolution, from the affine transform's x-scale.
    pub resolution: f64,
    /// License identifier.
    pub license: u32,
    /// Pass-through metadata fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,
    /// Spectral bands by name.
    pub spectral_bands: BTreeMap<String, SpectralBand>,
}

impl ImageRecord {
    /// Seeds the fields every image record is expected to carry, even when
    /// the metadata table leaves them out.
    pub fn skeleton_extra() -> BTreeMap<String, MetaValue> {
        let empty = |k: &str| (k.to_string(), MetaValue::String(String::new()));
        let mut extra: BTreeMap<String, MetaValue> = [
            "date_captured",
            "julian_day",
            "time_captured",
            "sensor",
            "state",
            "county",
            "location_description",
        ]
        .iter()
        .map(|k| empty(k))
        .collect();
        extra.insert("altitude".to_string(), MetaValue::Number(0.0));
        extra
    }
}

/// One crown-outline annotation in pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Sequential identifier, 1-based.
    pub id: u32,
    /// Identifier of the annotated image.
    pub image_id: u32,
    /// Category of the annotated crown.
    pub category_id: i64,
    /// Single flattened exterior ring, `[[x1, y1, x2, y2, ...]]`.
    pub segmentation: Vec<Vec<f64>>,
    /// Polygon area in square pixels.
    pub area: f64,
    /// Axis-aligned `[min_x, min_y, width, height]` in pixels.
    pub bbox: [f64; 4],
    /// Always 0; crowd regions are not produced.
    pub iscrowd: u32,
}

/// The root dataset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Provenance block.
    pub info: DatasetInfo,
    /// Fixed single-entry license list.
    pub licenses: Vec<License>,
    /// Categories in taxonomy-table order.
    pub categories: Vec<Category>,
    /// The single image record.
    pub images: Vec<ImageRecord>,
    /// Annotations in feature-source order.
    pub annotations: Vec<Annotation>,
}

impl Dataset {
    /// Creates an empty dataset carrying the given info block.
    pub fn new(info: DatasetInfo) -> Dataset {
        Dataset {
            info,
            licenses: vec![License::mit()],
            categories: Vec::new(),
            images: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Writes the dataset as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TreedError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
