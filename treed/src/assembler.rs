//! Dataset assembly.
//!
//! [`Assembler::run`] drives the whole conversion: load the taxonomy and
//! image-metadata tables, discover and summarize the raster, resolve the
//! image record, then walk the vector features projecting each crown
//! outline into pixel space. Any failure up to that point aborts the run
//! with no output; per-feature problems are counted and skipped.

use std::collections::BTreeMap;
use std::path::Path;

use gdal::GeoTransform;
use geo_types::Geometry;

use crate::bands::resolve_image;
use crate::dataset::{Annotation, Dataset, DatasetInfo};
use crate::metadata::MetadataIndex;
use crate::projector::PixelProjector;
use crate::raster::{discover_raster, read_geo_transform, RasterSummary};
use crate::taxonomy::{SpeciesIndex, Taxonomy};
use crate::vector::{read_features, CrownFeature};
use crate::TreedError;

/// The single image of a dataset always gets this identifier.
pub const IMAGE_ID: u32 = 1;

/// Why a feature was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    /// Geometry was absent or not a single polygon.
    NotAPolygon,
    /// `species_id` was absent or unknown to the taxonomy.
    UnknownSpecies,
    /// The outline could not be projected into pixel space.
    Projection,
}

/// Outcome of one feature attempt.
#[derive(Debug)]
pub enum FeatureOutcome {
    /// The feature produced an annotation.
    Created(Annotation),
    /// The feature was skipped.
    Skipped(SkipReason),
}

/// Counts reported after a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Annotations written.
    pub annotations: usize,
    /// Features skipped, total.
    pub skipped: usize,
    /// Features skipped, by reason.
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
    /// Categories loaded from the taxonomy.
    pub categories: usize,
}

/// Builds one dataset from a vector source, an image folder and the two
/// CSV tables.
#[derive(Debug, Default)]
pub struct Assembler {
    info: DatasetInfo,
}

impl Assembler {
    /// Creates an assembler with the given info-block overrides.
    pub fn new(info: DatasetInfo) -> Assembler {
        Assembler { info }
    }

    /// Runs the full conversion and writes the dataset JSON.
    ///
    /// No output file is written when any abort-level step fails.
    pub fn run(
        &self,
        shapefile: impl AsRef<Path>,
        image_folder: impl AsRef<Path>,
        output: impl AsRef<Path>,
        taxonomy_csv: impl AsRef<Path>,
        metadata_csv: impl AsRef<Path>,
    ) -> Result<RunSummary, TreedError> {
        let taxonomy = Taxonomy::from_path(taxonomy_csv)?;
        let metadata = MetadataIndex::from_path(metadata_csv)?;

        let raster_path = discover_raster(image_folder)?;
        log::info!("Found image: {}", raster_path.display());

        let raster = RasterSummary::open(&raster_path)?;
        let image = resolve_image(&raster, IMAGE_ID, metadata.get(&raster.file_name))
            .ok_or_else(|| TreedError::ImageResolution(raster.file_name.clone()))?;

        // The transform is read through a fresh handle on purpose: summary
        // extraction and annotation projection are separate failure points.
        let transform = read_geo_transform(&raster_path)?;

        let features = read_features(shapefile)?;
        log::info!("Processing annotations for image");

        let (dataset, summary) = self.assemble(&features, taxonomy, image, transform)?;

        dataset.write_json(output)?;
        log::info!(
            "Converted {} annotations; skipped {} features; dataset includes 1 image and {} species",
            summary.annotations,
            summary.skipped,
            summary.categories
        );
        Ok(summary)
    }

    /// Assembles the dataset from already-loaded inputs.
    pub fn assemble(
        &self,
        features: &[CrownFeature],
        taxonomy: Taxonomy,
        image: crate::dataset::ImageRecord,
        transform: GeoTransform,
    ) -> Result<(Dataset, RunSummary), TreedError> {
        let projector = PixelProjector::new(transform)?;

        let mut dataset = Dataset::new(self.info.clone());
        let mut summary = RunSummary {
            categories: taxonomy.categories.len(),
            ..RunSummary::default()
        };
        dataset.categories = taxonomy.categories;
        dataset.images.push(image);

        let mut next_id = 1;
        for (index, feature) in features.iter().enumerate() {
            match process_feature(feature, index, &taxonomy.species_index, &projector, next_id) {
                FeatureOutcome::Created(annotation) => {
                    dataset.annotations.push(annotation);
                    next_id += 1;
                    summary.annotations += 1;
                }
                FeatureOutcome::Skipped(reason) => {
                    summary.skipped += 1;
                    *summary.skipped_by_reason.entry(reason).or_default() += 1;
                }
            }
        }

        Ok((dataset, summary))
    }
}

/// Attempts one feature: polygon check, species lookup, projection.
fn process_feature(
    feature: &CrownFeature,
    index: usize,
    species_index: &SpeciesIndex,
    projector: &PixelProjector,
    annotation_id: u32,
) -> FeatureOutcome {
    let Some(Geometry::Polygon(polygon)) = &feature.geometry else {
        log::warn!("Skipping non-polygon geometry at index {index}");
        return FeatureOutcome::Skipped(SkipReason::NotAPolygon);
    };

    let category_id = feature
        .species_id
        .and_then(|species_id| species_index.get(&species_id).copied());
    let Some(category_id) = category_id else {
        log::warn!(
            "Species ID {:?} not found in taxonomy mapping. Skipping.",
            feature.species_id
        );
        return FeatureOutcome::Skipped(SkipReason::UnknownSpecies);
    };

    let ring = match projector.project_ring(&polygon.exterior().0) {
        Ok(ring) => ring,
        Err(e) => {
            log::warn!("Error converting coordinates for polygon at index {index}: {e}");
            return FeatureOutcome::Skipped(SkipReason::Projection);
        }
    };

    let mut flat = Vec::with_capacity(ring.vertices.len() * 2);
    for v in &ring.vertices {
        flat.push(v.x);
        flat.push(v.y);
    }

    FeatureOutcome::Created(Annotation {
        id: annotation_id,
        image_id: IMAGE_ID,
        category_id,
        segmentation: vec![flat],
        area: ring.area,
        bbox: ring.bbox,
        iscrowd: 0,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo_types::{polygon, Coord, LineString};

    use super::*;
    use crate::dataset::ImageRecord;
    use crate::metadata::MetaValue;
    use crate::taxonomy::Category;

    // 0.5 m pixels, origin (1000, 2000), north-up.
    const TRANSFORM: GeoTransform = [1000.0, 0.5, 0.0, 2000.0, 0.0, -0.5];

    fn taxonomy() -> Taxonomy {
        let mut taxonomy = Taxonomy::default();
        taxonomy.categories.push(Category {
            id: 1,
            family: "Fagaceae".into(),
            genus: "Quercus".into(),
            species: "alba".into(),
        });
        taxonomy.species_index.insert(1, 1);
        taxonomy
    }

    fn image() -> ImageRecord {
        ImageRecord {
            id: IMAGE_ID,
            file_name: "ortho.tif".into(),
            width: 100,
            height: 100,
            resolution: 0.5,
            license: 1,
            extra: Default::default(),
            spectral_bands: Default::default(),
        }
    }

    fn square_crown(species_id: i64) -> CrownFeature {
        CrownFeature {
            species_id: Some(species_id),
            geometry: Some(Geometry::Polygon(polygon![
                (x: 1005.0, y: 1995.0),
                (x: 1010.0, y: 1995.0),
                (x: 1010.0, y: 1990.0),
                (x: 1005.0, y: 1990.0),
            ])),
        }
    }

    #[test]
    fn end_to_end_square_crown() {
        let assembler = Assembler::default();
        let (dataset, summary) = assembler
            .assemble(&[square_crown(1)], taxonomy(), image(), TRANSFORM)
            .unwrap();

        assert_eq!(summary.annotations, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.categories, 1);
        assert_eq!(dataset.categories[0].genus, "Quercus");
        assert_eq!(dataset.images.len(), 1);

        let annotation = &dataset.annotations[0];
        assert_eq!(annotation.id, 1);
        assert_eq!(annotation.image_id, IMAGE_ID);
        assert_eq!(annotation.category_id, 1);
        assert_eq!(annotation.iscrowd, 0);
        assert_abs_diff_eq!(annotation.area, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(annotation.bbox[0], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(annotation.bbox[1], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(annotation.bbox[2], 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(annotation.bbox[3], 10.0, epsilon = 1e-9);

        // geo-types closes the ring, so 5 vertices -> 10 values.
        assert_eq!(annotation.segmentation.len(), 1);
        assert_eq!(annotation.segmentation[0].len(), 10);
    }

    #[test]
    fn skip_histogram_and_dense_ids() {
        let not_a_polygon = CrownFeature {
            species_id: Some(1),
            geometry: Some(Geometry::LineString(LineString::from(vec![
                Coord { x: 1005.0, y: 1995.0 },
                Coord { x: 1010.0, y: 1990.0 },
            ]))),
        };

        let features = [
            square_crown(1),
            not_a_polygon,
            square_crown(99),
            square_crown(1),
        ];
        let assembler = Assembler::default();
        let (dataset, summary) = assembler
            .assemble(&features, taxonomy(), image(), TRANSFORM)
            .unwrap();

        assert_eq!(summary.annotations, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.skipped_by_reason[&SkipReason::NotAPolygon], 1);
        assert_eq!(summary.skipped_by_reason[&SkipReason::UnknownSpecies], 1);

        // Ids stay dense across skips.
        let ids: Vec<u32> = dataset.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn missing_geometry_counts_as_non_polygon() {
        let feature = CrownFeature {
            species_id: Some(1),
            geometry: None,
        };
        let assembler = Assembler::default();
        let (_, summary) = assembler
            .assemble(&[feature], taxonomy(), image(), TRANSFORM)
            .unwrap();
        assert_eq!(summary.skipped_by_reason[&SkipReason::NotAPolygon], 1);
    }

    #[test]
    fn degenerate_polygon_counts_as_projection_skip() {
        let feature = CrownFeature {
            species_id: Some(1),
            geometry: Some(Geometry::Polygon(geo_types::Polygon::new(
                LineString::from(vec![
                    Coord { x: 1005.0, y: 1995.0 },
                    Coord { x: 1005.0, y: 1995.0 },
                ]),
                vec![],
            ))),
        };
        let assembler = Assembler::default();
        let (dataset, summary) = assembler
            .assemble(&[feature], taxonomy(), image(), TRANSFORM)
            .unwrap();
        assert!(dataset.annotations.is_empty());
        assert_eq!(summary.skipped_by_reason[&SkipReason::Projection], 1);
    }

    #[test]
    fn info_overrides_carried_into_dataset() {
        let info = DatasetInfo {
            description: "WVU flight 12".into(),
            contributor: "NRAC".into(),
            ..DatasetInfo::default()
        };
        let assembler = Assembler::new(info);
        let (dataset, _) = assembler
            .assemble(&[], taxonomy(), image(), TRANSFORM)
            .unwrap();
        assert_eq!(dataset.info.description, "WVU flight 12");
        assert_eq!(dataset.info.contributor, "NRAC");
        assert_eq!(dataset.info.version, "1.0");
    }

    #[test]
    fn image_extra_fields_serialize_flat() {
        let mut image = image();
        image
            .extra
            .insert("sensor".into(), MetaValue::String("X".into()));
        let assembler = Assembler::default();
        let (dataset, _) = assembler
            .assemble(&[], taxonomy(), image, TRANSFORM)
            .unwrap();
        let json = serde_json::to_value(&dataset).unwrap();
        assert_eq!(json["images"][0]["sensor"], "X");
    }
}
