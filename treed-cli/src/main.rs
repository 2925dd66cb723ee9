//! Command line wrapper around the `treed` pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use treed::assembler::Assembler;
use treed::dataset::{DatasetInfo, DEFAULT_DESCRIPTION, DEFAULT_URL};

/// Convert tree-crown shapefiles to annotation JSON.
#[derive(Debug, Parser)]
#[command(name = "treed", version, about)]
struct Args {
    /// Path to the input shapefile.
    shapefile: PathBuf,

    /// Path to the folder containing the image.
    image_folder: PathBuf,

    /// Path to the output JSON file.
    output: PathBuf,

    /// Path to the CSV file with taxonomic information.
    #[arg(long, required = true)]
    taxonomy: PathBuf,

    /// Path to the CSV file with additional image metadata.
    #[arg(long = "image-metadata", required = true)]
    image_metadata: PathBuf,

    /// URL for the dataset.
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    /// Description of the dataset.
    #[arg(long, default_value = DEFAULT_DESCRIPTION)]
    description: String,

    /// Name of the contributor.
    #[arg(long)]
    contributor: Option<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let info = DatasetInfo {
        description: args.description,
        url: args.url,
        contributor: args.contributor.unwrap_or_default(),
        ..DatasetInfo::default()
    };

    let start = Instant::now();
    let assembler = Assembler::new(info);
    match assembler.run(
        &args.shapefile,
        &args.image_folder,
        &args.output,
        &args.taxonomy,
        &args.image_metadata,
    ) {
        Ok(summary) => {
            for (reason, count) in &summary.skipped_by_reason {
                log::info!("Skipped {count} features: {reason:?}");
            }
            log::info!(
                "Conversion completed in {:.2} seconds",
                start.elapsed().as_secs_f64()
            );
            log::info!("Annotation JSON created successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Conversion failed: {e}");
            ExitCode::FAILURE
        }
    }
}
