use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::{
    geofile::{
        gdal_geofile::{read_features_from_geofile, remove_geofile, write_features_to_geofile},
        geojson::{write_collection_to_geojson, FeatureCollection},
    },
    simplify::{geo2topo::Geo2TopoSimplifier, simplifier::GeometrySimplifier},
    transform::transform::transform,
};

use super::config::{Config, ExtractionConfig};

/// Read the dataset of `extraction` from `data_dir`, transform it and write the output file.
/// The simplifier is only used by geometry extractions. Returns the path of the written file.
pub fn run_extraction(
    data_dir: &Path,
    extraction: &ExtractionConfig,
    simplifier: &dyn GeometrySimplifier,
) -> anyhow::Result<PathBuf> {
    let input_path = extraction.input_path(data_dir);
    let output_path = extraction.output_path(data_dir);

    log::info!("Reading features from {:?}", input_path);
    let features = read_features_from_geofile(&input_path)?;
    let num_features = features.len();

    let mode = extraction.transform_mode();
    let features = transform(features, &mode)
        .with_context(|| format!("Transforming features of {:?}", input_path))?;
    log::info!(
        "Kept {} out of {} features from {}",
        features.len(),
        num_features,
        extraction.dataset_name()
    );

    let collection = FeatureCollection::from(features);
    log::info!("Writing {} to {:?}", mode_label(extraction), output_path);
    match extraction {
        ExtractionConfig::Geometry {
            simplifier: simplifier_config,
            ..
        } => {
            log::info!(
                "Simplifying geometry with quantization {}",
                simplifier_config.quantization
            );
            let topology = simplifier.simplify(&collection, simplifier_config.quantization)?;
            fs::write(&output_path, topology)
                .with_context(|| format!("Writing output file {:?}", output_path))?;
        }
        ExtractionConfig::Cities { format, .. } | ExtractionConfig::Countries { format, .. } => {
            match format.gdal_driver() {
                Some(driver) => {
                    remove_geofile(&output_path, &driver)
                        .with_context(|| format!("Removing old output {:?}", output_path))?;
                    write_features_to_geofile(
                        &collection.features,
                        &output_path,
                        None,
                        driver.name(),
                    )?
                }
                None => write_collection_to_geojson(&collection, &output_path)
                    .with_context(|| format!("Writing output file {:?}", output_path))?,
            }
        }
    }
    Ok(output_path)
}

fn mode_label(extraction: &ExtractionConfig) -> &'static str {
    match extraction {
        ExtractionConfig::Cities { .. } => "cities",
        ExtractionConfig::Countries { .. } => "countries",
        ExtractionConfig::Geometry { .. } => "geometry",
    }
}

/// Run all extractions of the config in order, stopping at the first failure.
pub fn run_all(config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut output_paths = Vec::with_capacity(config.extractions.len());
    for extraction in &config.extractions {
        let simplifier = match extraction {
            ExtractionConfig::Geometry { simplifier, .. } => Geo2TopoSimplifier::from(simplifier),
            _ => Geo2TopoSimplifier::default(),
        };
        let output_path = run_extraction(&config.data_dir, extraction, &simplifier)
            .with_context(|| format!("Extracting {}", mode_label(extraction)))?;
        output_paths.push(output_path);
    }
    Ok(output_paths)
}
