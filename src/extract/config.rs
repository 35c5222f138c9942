use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{
    geofile::gdal_geofile::GdalDriverType,
    simplify::{geo2topo::Geo2TopoSimplifier, simplifier::DEFAULT_QUANTIZATION},
    transform::{
        anchor::AnchorPoint,
        transform::{MissingPropertyPolicy, TransformMode, PLACES_MAX_SCALERANK},
    },
};

const PLACES_DATASET: &str = "ne_50m_populated_places_simple";
const COUNTRIES_DATASET: &str = "ne_50m_admin_0_countries";

fn default_places_dataset() -> String {
    PLACES_DATASET.to_string()
}

fn default_countries_dataset() -> String {
    COUNTRIES_DATASET.to_string()
}

fn default_cities_output() -> String {
    "cities.geo.json".to_string()
}

fn default_countries_output() -> String {
    "countries.geo.json".to_string()
}

fn default_geometry_output() -> String {
    "geometry.json".to_string()
}

fn default_max_scalerank() -> f64 {
    PLACES_MAX_SCALERANK
}

/// File format of point outputs.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    GeoJson,
    GeoPackage,
    Shapefile,
}

impl OutputFormat {
    /// GDAL driver used to write the format, None for GeoJSON which is serialized directly.
    pub fn gdal_driver(&self) -> Option<GdalDriverType> {
        match self {
            OutputFormat::GeoJson => None,
            OutputFormat::GeoPackage => Some(GdalDriverType::GeoPackage),
            OutputFormat::Shapefile => Some(GdalDriverType::Shapefile),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Directory holding one sub-directory per dataset; outputs are written here as well.
    pub data_dir: PathBuf,
    pub extractions: Vec<ExtractionConfig>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimplifierConfig {
    pub command: Vec<String>,
    pub quantization: f64,
    pub object_name: String,
    pub timeout_secs: u64,
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        Self {
            command: vec!["geo2topo".to_string()],
            quantization: DEFAULT_QUANTIZATION,
            object_name: "geometry".to_string(),
            timeout_secs: 300,
        }
    }
}

impl From<&SimplifierConfig> for Geo2TopoSimplifier {
    fn from(config: &SimplifierConfig) -> Self {
        Self {
            command: config.command.clone(),
            object_name: config.object_name.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// One shapefile to output file conversion.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionConfig {
    Cities {
        #[serde(default = "default_places_dataset")]
        dataset_name: String,
        #[serde(default = "default_cities_output")]
        output_filename: String,
        #[serde(default = "default_max_scalerank")]
        max_scalerank: f64,
        #[serde(default)]
        on_missing_property: MissingPropertyPolicy,
        #[serde(default)]
        format: OutputFormat,
    },
    Countries {
        #[serde(default = "default_countries_dataset")]
        dataset_name: String,
        #[serde(default = "default_countries_output")]
        output_filename: String,
        #[serde(default)]
        anchor: AnchorPoint,
        #[serde(default)]
        format: OutputFormat,
    },
    Geometry {
        #[serde(default = "default_countries_dataset")]
        dataset_name: String,
        #[serde(default = "default_geometry_output")]
        output_filename: String,
        #[serde(default)]
        simplifier: SimplifierConfig,
    },
}

impl ExtractionConfig {
    pub fn dataset_name(&self) -> &str {
        match self {
            ExtractionConfig::Cities { dataset_name, .. }
            | ExtractionConfig::Countries { dataset_name, .. }
            | ExtractionConfig::Geometry { dataset_name, .. } => dataset_name,
        }
    }

    pub fn output_filename(&self) -> &str {
        match self {
            ExtractionConfig::Cities {
                output_filename, ..
            }
            | ExtractionConfig::Countries {
                output_filename, ..
            }
            | ExtractionConfig::Geometry {
                output_filename, ..
            } => output_filename,
        }
    }

    /// `<data_dir>/<dataset>/<dataset>.shp`, the layout of the Natural Earth downloads.
    pub fn input_path(&self, data_dir: &Path) -> PathBuf {
        let dataset_name = self.dataset_name();
        data_dir
            .join(dataset_name)
            .join(format!("{}.shp", dataset_name))
    }

    pub fn output_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.output_filename())
    }

    pub fn transform_mode(&self) -> TransformMode {
        match self {
            ExtractionConfig::Cities {
                max_scalerank,
                on_missing_property,
                ..
            } => TransformMode::PlacesFilter {
                max_scalerank: *max_scalerank,
                on_missing: *on_missing_property,
            },
            ExtractionConfig::Countries { anchor, .. } => {
                TransformMode::CountriesCentroid { anchor: *anchor }
            }
            ExtractionConfig::Geometry { .. } => TransformMode::GeometryOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Config, ExtractionConfig, OutputFormat, SimplifierConfig};
    use crate::transform::{
        anchor::AnchorPoint,
        transform::{MissingPropertyPolicy, TransformMode},
    };

    #[test]
    fn test_parse_config_with_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
data_dir: geo-data
extractions:
  - kind: cities
  - kind: countries
  - kind: geometry
"#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("geo-data"));
        assert_eq!(
            config.extractions,
            vec![
                ExtractionConfig::Cities {
                    dataset_name: "ne_50m_populated_places_simple".to_string(),
                    output_filename: "cities.geo.json".to_string(),
                    max_scalerank: 8.0,
                    on_missing_property: MissingPropertyPolicy::Fail,
                    format: OutputFormat::GeoJson,
                },
                ExtractionConfig::Countries {
                    dataset_name: "ne_50m_admin_0_countries".to_string(),
                    output_filename: "countries.geo.json".to_string(),
                    anchor: AnchorPoint::RepresentativePoint,
                    format: OutputFormat::GeoJson,
                },
                ExtractionConfig::Geometry {
                    dataset_name: "ne_50m_admin_0_countries".to_string(),
                    output_filename: "geometry.json".to_string(),
                    simplifier: SimplifierConfig::default(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_config_overrides() {
        let config: Config = serde_yaml::from_str(
            r#"
data_dir: /data
extractions:
  - kind: cities
    max_scalerank: 5
    on_missing_property: skip
  - kind: countries
    anchor: centroid
    format: geopackage
    output_filename: countries.gpkg
  - kind: geometry
    output_filename: topo.json
    simplifier:
      command: [npx, geo2topo]
      quantization: 1e4
"#,
        )
        .unwrap();

        assert_eq!(
            config.extractions[0].transform_mode(),
            TransformMode::PlacesFilter {
                max_scalerank: 5.0,
                on_missing: MissingPropertyPolicy::Skip,
            }
        );
        assert_eq!(
            config.extractions[1].transform_mode(),
            TransformMode::CountriesCentroid {
                anchor: AnchorPoint::Centroid
            }
        );
        assert!(matches!(
            config.extractions[1],
            ExtractionConfig::Countries {
                format: OutputFormat::GeoPackage,
                ..
            }
        ));
        match &config.extractions[2] {
            ExtractionConfig::Geometry {
                output_filename,
                simplifier,
                ..
            } => {
                assert_eq!(output_filename, "topo.json");
                assert_eq!(simplifier.command, vec!["npx", "geo2topo"]);
                assert_eq!(simplifier.quantization, 1e4);
                assert_eq!(simplifier.object_name, "geometry");
                assert_eq!(simplifier.timeout_secs, 300);
            }
            other => panic!("Expected geometry extraction, got {:?}", other),
        }
    }

    #[test]
    fn test_paths() {
        let extraction: ExtractionConfig = serde_yaml::from_str("kind: countries").unwrap();
        let data_dir = Path::new("/data");
        assert_eq!(
            extraction.input_path(data_dir),
            PathBuf::from("/data/ne_50m_admin_0_countries/ne_50m_admin_0_countries.shp")
        );
        assert_eq!(
            extraction.output_path(data_dir),
            PathBuf::from("/data/countries.geo.json")
        );
    }
}
