//! Vector feature source access.
//!
//! Reads the crown-outline shapefile (or any OGR-readable layer) into plain
//! [`CrownFeature`] values so the rest of the pipeline never handles GDAL
//! types. The layer schema must expose a `species_id` field; features whose
//! geometry or species cannot be used are still returned and left for the
//! assembler to skip, so skip accounting happens in one place.

use std::path::Path;

use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use geo_types::Geometry;

use crate::TreedError;

/// Name of the required per-feature species attribute.
pub const SPECIES_FIELD: &str = "species_id";

/// One feature read from the vector source.
#[derive(Debug, Clone)]
pub struct CrownFeature {
    /// Species identifier, when the field carried a usable value.
    pub species_id: Option<i64>,
    /// Feature geometry, when one could be read.
    pub geometry: Option<Geometry<f64>>,
}

/// Reads all features of the first layer, in source order.
///
/// Fails if the source cannot be opened or its schema lacks the
/// `species_id` field.
pub fn read_features(path: impl AsRef<Path>) -> Result<Vec<CrownFeature>, TreedError> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    let mut layer = dataset.layer(0)?;

    let has_species = layer.defn().fields().any(|f| f.name() == SPECIES_FIELD);
    if !has_species {
        return Err(TreedError::Schema(format!(
            "vector source {path:?} missing required field '{SPECIES_FIELD}'"
        )));
    }

    let mut features = Vec::new();
    for feature in layer.features() {
        let species_id = feature
            .field(SPECIES_FIELD)
            .ok()
            .flatten()
            .and_then(field_to_i64);
        let geometry = feature.geometry().and_then(|g| g.to_geo().ok());
        features.push(CrownFeature {
            species_id,
            geometry,
        });
    }

    log::info!("Loaded shapefile with {} features", features.len());
    Ok(features)
}

/// Species identifiers arrive as whatever field type the shapefile was
/// authored with; integers in any width and integral reals are accepted.
fn field_to_i64(value: FieldValue) -> Option<i64> {
    match value {
        FieldValue::IntegerValue(v) => Some(i64::from(v)),
        FieldValue::Integer64Value(v) => Some(v),
        FieldValue::RealValue(v) if v.fract() == 0.0 && v.is_finite() => Some(v as i64),
        FieldValue::StringValue(s) => s.trim().parse().ok(),
        _ => None,
    }
}
