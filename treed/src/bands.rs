//! Spectral band resolution.
//!
//! Builds the [`ImageRecord`] for the discovered raster by merging the
//! raster summary with the image's metadata row. Metadata columns named
//! `<prefix>_<suffix>` for a recognized band prefix are reserved for
//! spectral-band derivation and excluded from the generic field copy; all
//! other columns pass through into the record verbatim.
//!
//! Resolution mirrors the tolerant semantics of the annotation format: a
//! missing metadata row or sensor, an unknown image type, or a multispectral
//! image without any usable band fields make the whole image unresolvable
//! (`None`), while an RGB band-count shortfall or an individual band missing
//! its wavelength/bandwidth only degrades the band map.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::dataset::{ImageRecord, SpectralBand};
use crate::metadata::{MetaValue, MetadataRow};
use crate::raster::RasterSummary;

lazy_static! {
    /// Recognized band-name tokens: the named visible/NIR bands plus the
    /// generic `band_1`..`band_19` slots.
    static ref BAND_PREFIXES: Vec<String> = ["blue", "green", "red", "redEdge", "nir"]
        .iter()
        .map(|p| p.to_string())
        .chain((1..=19).map(|i| format!("band_{i}")))
        .collect();
}

/// Returns the recognized band prefix of a metadata column name, if the
/// column is a reserved `<prefix>_<suffix>` band field.
fn band_prefix_of(column: &str) -> Option<&'static str> {
    BAND_PREFIXES.iter().find_map(|prefix| {
        let rest = column.strip_prefix(prefix.as_str())?;
        let suffix = rest.strip_prefix('_')?;
        (!suffix.is_empty()).then_some(prefix.as_str())
    })
}

fn band_value(meta: &MetadataRow, band: &str, field: &str) -> Option<f64> {
    let key = format!("{band}_{field}");
    let value = meta.get(&key)?;
    let parsed = value.as_f64();
    if parsed.is_none() {
        log::warn!("Ignoring non-numeric {key} metadata value {value:?}");
    }
    parsed
}

/// Integer-valued record field: the metadata cell wins over the raster
/// summary when it carries a usable value.
fn integer_override(meta: &MetadataRow, key: &str, fallback: usize) -> usize {
    let Some(value) = meta.get(key) else {
        return fallback;
    };
    match value.as_f64() {
        Some(v) if v >= 0.0 && v.fract() == 0.0 => v as usize,
        _ => {
            log::warn!("Ignoring non-integer {key} metadata value {value:?}");
            fallback
        }
    }
}

fn resolution_override(meta: &MetadataRow, fallback: f64) -> f64 {
    let Some(value) = meta.get("resolution") else {
        return fallback;
    };
    match value.as_f64() {
        Some(v) if v.is_finite() => v,
        _ => {
            log::warn!("Ignoring non-numeric resolution metadata value {value:?}");
            fallback
        }
    }
}

/// Resolves the image record for a raster from its metadata row.
///
/// Returns `None` (with the reason logged) when the record cannot be
/// resolved; the caller treats that as an abort condition.
pub fn resolve_image(
    raster: &RasterSummary,
    image_id: u32,
    meta: Option<&MetadataRow>,
) -> Option<ImageRecord> {
    let file_name = &raster.file_name;

    let Some(meta) = meta else {
        log::error!("Required metadata missing for image: {file_name}");
        return None;
    };
    if !meta.contains_key("sensor") {
        log::error!("Required field 'sensor' missing from metadata for {file_name}");
        return None;
    }

    let mut extra = ImageRecord::skeleton_extra();
    for (key, value) in meta {
        if key == "file_name" || band_prefix_of(key).is_some() {
            continue;
        }
        // These columns overwrite the typed record fields below instead of
        // passing through the extension map.
        if matches!(key.as_str(), "id" | "width" | "height" | "resolution" | "license") {
            continue;
        }
        extra.insert(key.clone(), value.clone());
    }

    // Metadata wins over the raster summary, as the table is the curated
    // source. The image id is the one exception: annotations reference it,
    // so it stays assigned by the run.
    if meta.contains_key("id") {
        log::warn!("Image id is assigned sequentially; ignoring 'id' metadata column for {file_name}");
    }
    let width = integer_override(meta, "width", raster.width);
    let height = integer_override(meta, "height", raster.height);
    let resolution = resolution_override(meta, raster.resolution);
    let license = integer_override(meta, "license", 1) as u32;

    let image_type = meta
        .get("image_type")
        .and_then(MetaValue::as_str)
        .unwrap_or("RGB")
        .to_lowercase();

    let spectral_bands = match image_type.as_str() {
        "rgb" => resolve_rgb(raster, meta),
        "multispectral" => resolve_multispectral(file_name, meta)?,
        other => {
            log::error!(
                "Unknown image type '{other}' for {file_name}. Must be 'RGB' or 'Multispectral'."
            );
            return None;
        }
    };

    Some(ImageRecord {
        id: image_id,
        file_name: file_name.clone(),
        width,
        height,
        resolution,
        license,
        extra,
        spectral_bands,
    })
}

/// Fixed red/green/blue bands with orders 1/2/3; wavelength and bandwidth
/// come from the metadata row when present. A band-count shortfall leaves
/// the band map empty but does not fail the record.
fn resolve_rgb(raster: &RasterSummary, meta: &MetadataRow) -> BTreeMap<String, SpectralBand> {
    if raster.band_count < 3 {
        log::warn!(
            "RGB image {} has fewer than 3 bands ({})",
            raster.file_name,
            raster.band_count
        );
        return BTreeMap::new();
    }

    ["red", "green", "blue"]
        .iter()
        .zip(1..)
        .map(|(band, order)| {
            (
                band.to_string(),
                SpectralBand {
                    wavelength: band_value(meta, band, "wavelength"),
                    bandwidth: band_value(meta, band, "bandwidth"),
                    order,
                },
            )
        })
        .collect()
}

/// Bands discovered from reserved metadata columns, ordered alphabetically.
/// A band missing either wavelength or bandwidth is dropped; order indexes
/// count only the bands that survive.
fn resolve_multispectral(
    file_name: &str,
    meta: &MetadataRow,
) -> Option<BTreeMap<String, SpectralBand>> {
    let mut available: Vec<&str> = meta.keys().filter_map(|k| band_prefix_of(k)).collect();
    available.sort_unstable();
    available.dedup();

    if available.is_empty() {
        log::error!("No band information found for multispectral image {file_name}");
        return None;
    }

    let mut bands = BTreeMap::new();
    let mut order = 1;
    for band in available {
        let wavelength = band_value(meta, band, "wavelength");
        let bandwidth = band_value(meta, band, "bandwidth");
        let (Some(wavelength), Some(bandwidth)) = (wavelength, bandwidth) else {
            log::warn!("Skipping band {band} due to missing wavelength or bandwidth");
            continue;
        };

        bands.insert(
            band.to_string(),
            SpectralBand {
                wavelength: Some(wavelength),
                bandwidth: Some(bandwidth),
                order,
            },
        );
        order += 1;
    }

    if bands.is_empty() {
        log::error!("No valid bands found for multispectral image {file_name}");
        return None;
    }
    Some(bands)
}
