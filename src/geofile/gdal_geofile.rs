use anyhow::{anyhow, Context};
use gdal::vector::{FieldValue, LayerAccess, OGRFieldType};
use indexmap::IndexMap;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;

use super::feature::{AttributeValue, Feature, FeatureMap};
use crate::error::ExtractError;

pub enum GdalDriverType {
    GeoPackage,
    Shapefile,
}

impl GdalDriverType {
    pub fn name(&self) -> &'static str {
        match self {
            GdalDriverType::GeoPackage => "GPKG",
            GdalDriverType::Shapefile => "ESRI Shapefile",
        }
    }

    /// Extensions of the files that make up one dataset next to the main file.
    fn sidecar_extensions(&self) -> &'static [&'static str] {
        match self {
            GdalDriverType::GeoPackage => &["gpkg-wal", "gpkg-shm", "gpkg-journal"],
            GdalDriverType::Shapefile => &["shx", "dbf", "prj", "cpg", "qix", "sbn", "sbx"],
        }
    }
}

/// Remove a dataset written by `driver` at `filepath`, including its sidecar files, so that a
/// new one can be created in its place. GDAL drivers refuse to create over an existing file.
pub fn remove_geofile(filepath: &Path, driver: &GdalDriverType) -> std::io::Result<()> {
    let sidecars = driver
        .sidecar_extensions()
        .iter()
        .map(|extension| filepath.with_extension(extension));
    for path in std::iter::once(filepath.to_path_buf()).chain(sidecars) {
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed {:?}", path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub fn write_features_to_geofile(
    features: &Vec<Feature>,
    output_filepath: &Path,
    crs: Option<&gdal::spatial_ref::SpatialRef>,
    driver: &str,
) -> anyhow::Result<()> {
    let driver = gdal::DriverManager::get_driver_by_name(driver).context("Getting GDAL driver")?;

    // An empty output still gets a dataset and a (point) layer so that readers find a file.
    let layer_type = {
        use gdal::vector::OGRwkbGeometryType::*;
        match features.first().map(|feature| &feature.geometry) {
            None => wkbPoint,
            Some(geometry) => match geometry {
                geo::Geometry::Point(_) => wkbPoint,
                geo::Geometry::LineString(_) => wkbLineString,
                geo::Geometry::Polygon(_) => wkbPolygon,
                geo::Geometry::MultiPoint(_) => wkbMultiPoint,
                geo::Geometry::MultiLineString(_) => wkbMultiLineString,
                geo::Geometry::MultiPolygon(_) => wkbMultiPolygon,
                _ => {
                    return Err(anyhow!("Cannot write geometry type {:?} to file.", {
                        geometry
                    }))
                }
            },
        }
    };

    let crs = match crs {
        Some(crs) => crs.clone(),
        None => gdal::spatial_ref::SpatialRef::from_epsg(4326)?,
    };
    let crs_name = crs.name()?;
    log::debug!("Using spatial ref {} for writing geofile", crs_name);

    let mut dataset = driver.create_vector_only(output_filepath)?;
    let layer_name = output_filepath
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("");
    let layer_options = gdal::LayerOptions {
        name: layer_name,
        srs: Some(&crs),
        ty: layer_type,
        options: None,
    };

    let mut layer = dataset.create_layer(layer_options)?;

    // Create the fields based on all attributes of all features.
    log::info!("Setting up fields");
    let field_types = get_field_types(features);
    let field_definitions: Vec<(&str, OGRFieldType::Type)> = field_types
        .iter()
        .map(|(field_name, field_type)| (field_name as &str, *field_type))
        .collect();
    layer.create_defn_fields(&field_definitions)?;

    log::info!(
        "Writing {} features to {:?}",
        features.len(),
        output_filepath
    );
    unsafe {
        // Start a transaction in case the driver supports transactions, e.g. GeoPackage.
        // Committing all features once as opposed to per-feature is a massive speedup for these drivers.
        gdal_sys::OGR_L_StartTransaction(layer.c_layer());
    };
    let bar = ProgressBar::new(features.len() as u64);
    for feature in features {
        let wkb = wkb::geom_to_wkb(&feature.geometry)
            .map_err(|err| anyhow!("Could not write geometry to WKB, {:?}", err))?;
        let geometry = gdal::vector::Geometry::from_wkb(&wkb)?;

        match &feature.attributes {
            Some(attributes) => {
                let mut field_names = Vec::new();
                let mut values = Vec::new();
                for (key, value) in attributes {
                    // Null fields are left unset.
                    if let Some(value) = to_gdal_field_value(value) {
                        field_names.push(key.as_str());
                        values.push(value);
                    }
                }
                layer.create_feature_fields(geometry, &field_names, &values)?;
            }
            None => layer.create_feature(geometry)?,
        }

        bar.inc(1);
    }
    unsafe {
        gdal_sys::OGR_L_CommitTransaction(layer.c_layer());
    };
    bar.finish_and_clear();
    Ok(())
}

fn to_gdal_field_value(value: &AttributeValue) -> Option<FieldValue> {
    match value {
        AttributeValue::String(value) => Some(FieldValue::StringValue(value.to_owned())),
        AttributeValue::Integer(value) => Some(FieldValue::Integer64Value(*value)),
        AttributeValue::Real(value) => Some(FieldValue::RealValue(*value)),
        AttributeValue::Null => None,
    }
}

fn field_type_of(value: &AttributeValue) -> Option<OGRFieldType::Type> {
    match value {
        AttributeValue::String(_) => Some(OGRFieldType::OFTString),
        AttributeValue::Integer(_) => Some(OGRFieldType::OFTInteger64),
        AttributeValue::Real(_) => Some(OGRFieldType::OFTReal),
        AttributeValue::Null => None,
    }
}

/// Field names and types over all features, in order of first appearance. The type of a field
/// is taken from its first non-null value; fields that are null everywhere become strings.
fn get_field_types(features: &Vec<Feature>) -> Vec<(String, OGRFieldType::Type)> {
    let per_feature: Vec<Vec<(String, Option<OGRFieldType::Type>)>> = features
        .par_iter()
        .filter_map(|feature| feature.attributes.as_ref())
        .map(|attributes| {
            attributes
                .iter()
                .map(|(key, value)| (key.clone(), field_type_of(value)))
                .collect()
        })
        .collect();

    let mut fields: IndexMap<String, Option<OGRFieldType::Type>> = IndexMap::new();
    for (key, field_type) in per_feature.into_iter().flatten() {
        let entry = fields.entry(key).or_insert(None);
        if entry.is_none() {
            *entry = field_type;
        }
    }
    fields
        .into_iter()
        .map(|(key, field_type)| (key, field_type.unwrap_or(OGRFieldType::OFTString)))
        .collect()
}

fn from_gdal_field_value(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::StringValue(value)) => AttributeValue::String(value),
        Some(FieldValue::IntegerValue(value)) => AttributeValue::Integer(value as i64),
        Some(FieldValue::Integer64Value(value)) => AttributeValue::Integer(value),
        Some(FieldValue::RealValue(value)) => AttributeValue::Real(value),
        Some(FieldValue::DateValue(value)) => AttributeValue::String(value.to_string()),
        Some(FieldValue::DateTimeValue(value)) => AttributeValue::String(value.to_rfc3339()),
        Some(other) => {
            log::debug!("Storing list field value {:?} as a string", other);
            AttributeValue::String(format!("{:?}", other))
        }
    }
}

/// Read all features of a single-layer vector dataset, e.g. a shapefile.
///
/// Attributes are kept in the field order of the dataset. Any failure to open or decode the
/// dataset is reported as [`ExtractError::SourceRead`].
pub fn read_features_from_geofile(filepath: &Path) -> Result<Vec<Feature>, ExtractError> {
    if !filepath.exists() {
        return Err(ExtractError::source_read(filepath, "file not found"));
    }
    gdal::DriverManager::register_all();
    let open_options = gdal::DatasetOptions {
        open_flags: gdal::GdalOpenFlags::GDAL_OF_VECTOR,
        ..Default::default()
    };
    let dataset = gdal::Dataset::open_ex(filepath, open_options)
        .map_err(|err| ExtractError::source_read(filepath, err))?;

    let layer_count = dataset.layer_count();
    if 1 != layer_count {
        return Err(ExtractError::source_read(
            filepath,
            format!("found {} layers, only one layer is supported", layer_count),
        ));
    }
    let mut layer = dataset
        .layer(0)
        .map_err(|err| ExtractError::source_read(filepath, err))?;

    let mut features = Vec::new();
    for (index, gdal_feature) in layer.features().enumerate() {
        let gdal_geometry = gdal_feature.geometry().ok_or_else(|| {
            ExtractError::source_read(filepath, format!("feature {} has no geometry", index))
        })?;
        let wkb = gdal_geometry
            .wkb()
            .map_err(|err| ExtractError::source_read(filepath, err))?;
        let geometry = wkb::wkb_to_geom(&mut wkb.as_slice()).map_err(|err| {
            ExtractError::source_read(
                filepath,
                format!("could not decode geometry of feature {}, {:?}", index, err),
            )
        })?;

        let attributes: FeatureMap = gdal_feature
            .fields()
            .map(|(name, value)| (name, from_gdal_field_value(value)))
            .collect();
        features.push(Feature::new(geometry, attributes).with_id(index.to_string()));
    }
    log::debug!("Read {} features from {:?}", features.len(), filepath);
    Ok(features)
}
