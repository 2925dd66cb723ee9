//! End-to-end pipeline tests over in-memory inputs.
//!
//! GDAL file formats are deliberately not involved: tables load from CSV
//! text and features are constructed directly, which covers everything from
//! table validation through projection and dataset serialization.

use approx::assert_abs_diff_eq;
use geo_types::{polygon, Geometry};
use treed::assembler::{Assembler, IMAGE_ID};
use treed::bands::resolve_image;
use treed::dataset::DatasetInfo;
use treed::metadata::MetadataIndex;
use treed::raster::RasterSummary;
use treed::taxonomy::Taxonomy;
use treed::vector::CrownFeature;

const TAXONOMY_CSV: &str = "id,family,genus,species\n1,Fagaceae,Quercus,alba\n";
const METADATA_CSV: &str = "file_name,sensor,image_type\northo.tif,X,RGB\n";

// 3-band 100x100 raster with 1 m pixels anchored at the origin, north-up.
const TRANSFORM: [f64; 6] = [0.0, 1.0, 0.0, 100.0, 0.0, -1.0];

fn raster() -> RasterSummary {
    RasterSummary {
        file_name: "ortho.tif".to_string(),
        width: 100,
        height: 100,
        resolution: 1.0,
        band_count: 3,
    }
}

/// One square crown covering geographic (10, 80)-(20, 90), which the
/// transform maps to pixel region (10, 10)-(20, 20).
fn square_feature(species_id: i64) -> CrownFeature {
    CrownFeature {
        species_id: Some(species_id),
        geometry: Some(Geometry::Polygon(polygon![
            (x: 10.0, y: 90.0),
            (x: 20.0, y: 90.0),
            (x: 20.0, y: 80.0),
            (x: 10.0, y: 80.0),
        ])),
    }
}

#[test]
fn rgb_end_to_end() {
    let taxonomy = Taxonomy::from_reader(TAXONOMY_CSV.as_bytes()).unwrap();
    let metadata = MetadataIndex::from_reader(METADATA_CSV.as_bytes()).unwrap();
    let raster = raster();

    let image = resolve_image(&raster, IMAGE_ID, metadata.get(&raster.file_name)).unwrap();
    assert_eq!(image.spectral_bands["red"].order, 1);
    assert_eq!(image.spectral_bands["green"].order, 2);
    assert_eq!(image.spectral_bands["blue"].order, 3);

    let assembler = Assembler::default();
    let (dataset, summary) = assembler
        .assemble(&[square_feature(1)], taxonomy, image, TRANSFORM)
        .unwrap();

    assert_eq!(summary.categories, 1);
    assert_eq!(summary.annotations, 1);
    assert_eq!(summary.skipped, 0);

    assert_eq!(dataset.categories.len(), 1);
    assert_eq!(dataset.categories[0].genus, "Quercus");
    assert_eq!(dataset.categories[0].species, "alba");
    assert_eq!(dataset.images.len(), 1);

    let annotation = &dataset.annotations[0];
    assert_abs_diff_eq!(annotation.bbox[0], 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(annotation.bbox[1], 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(annotation.bbox[2], 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(annotation.bbox[3], 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(annotation.area, 100.0, epsilon = 1e-9);
}

#[test]
fn unknown_species_skipped_without_annotation() {
    let taxonomy = Taxonomy::from_reader(TAXONOMY_CSV.as_bytes()).unwrap();
    let metadata = MetadataIndex::from_reader(METADATA_CSV.as_bytes()).unwrap();
    let raster = raster();
    let image = resolve_image(&raster, IMAGE_ID, metadata.get(&raster.file_name)).unwrap();

    let assembler = Assembler::default();
    let (dataset, summary) = assembler
        .assemble(&[square_feature(42)], taxonomy, image, TRANSFORM)
        .unwrap();

    assert!(dataset.annotations.is_empty());
    assert_eq!(summary.skipped, 1);
}

#[test]
fn multispectral_without_band_columns_aborts() {
    let metadata_csv = "file_name,sensor,image_type\northo.tif,MicaSense,Multispectral\n";
    let metadata = MetadataIndex::from_reader(metadata_csv.as_bytes()).unwrap();
    let raster = raster();

    assert!(resolve_image(&raster, IMAGE_ID, metadata.get(&raster.file_name)).is_none());
}

#[test]
fn output_json_matches_annotation_contract() {
    let taxonomy = Taxonomy::from_reader(TAXONOMY_CSV.as_bytes()).unwrap();
    let metadata = MetadataIndex::from_reader(METADATA_CSV.as_bytes()).unwrap();
    let raster = raster();
    let image = resolve_image(&raster, IMAGE_ID, metadata.get(&raster.file_name)).unwrap();

    let info = DatasetInfo {
        contributor: "NRAC".into(),
        ..DatasetInfo::default()
    };
    let (dataset, _) = Assembler::new(info)
        .assemble(&[square_feature(1)], taxonomy, image, TRANSFORM)
        .unwrap();

    let json = serde_json::to_value(&dataset).unwrap();
    assert_eq!(json["info"]["contributor"], "NRAC");
    assert_eq!(json["licenses"][0]["id"], 1);
    assert_eq!(json["images"][0]["id"], 1);
    assert_eq!(json["images"][0]["file_name"], "ortho.tif");
    assert_eq!(json["images"][0]["sensor"], "X");
    assert_eq!(json["images"][0]["spectral_bands"]["red"]["order"], 1);
    assert_eq!(json["annotations"][0]["image_id"], 1);
    assert_eq!(json["annotations"][0]["iscrowd"], 0);

    let segmentation = json["annotations"][0]["segmentation"]
        .as_array()
        .expect("segmentation is a list of rings");
    assert_eq!(segmentation.len(), 1);
    assert_eq!(segmentation[0].as_array().map(Vec::len), Some(10));
}
