use serde::Deserialize;

use crate::{
    error::ExtractError,
    geofile::feature::{AttributeValue, Feature, FeatureMap},
};

use super::{anchor::AnchorPoint, keys::PropertyKeySet};

pub const SCALERANK_KEY: &str = "scalerank";
/// Places with a scalerank at or above this value are dropped.
pub const PLACES_MAX_SCALERANK: f64 = 8.0;

/// What to do with a feature that lacks a property needed for filtering.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingPropertyPolicy {
    /// Abort the whole run with [`ExtractError::MissingProperty`].
    #[default]
    Fail,
    /// Drop the feature and log a warning.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformMode {
    PlacesFilter {
        max_scalerank: f64,
        on_missing: MissingPropertyPolicy,
    },
    CountriesCentroid {
        anchor: AnchorPoint,
    },
    GeometryOnly,
}

impl TransformMode {
    /// Whether the feature at `feature_index` belongs in the output.
    fn keep(&self, feature: &Feature, feature_index: usize) -> Result<bool, ExtractError> {
        match self {
            TransformMode::PlacesFilter {
                max_scalerank,
                on_missing,
            } => match feature.attribute(SCALERANK_KEY) {
                None | Some(AttributeValue::Null) => match on_missing {
                    MissingPropertyPolicy::Fail => Err(ExtractError::MissingProperty {
                        key: SCALERANK_KEY.to_string(),
                        feature_index,
                    }),
                    MissingPropertyPolicy::Skip => {
                        log::warn!(
                            "Skipping feature {} without a '{}' property",
                            feature_index,
                            SCALERANK_KEY
                        );
                        Ok(false)
                    }
                },
                Some(value) => match value.as_f64() {
                    Some(scalerank) => Ok(scalerank < *max_scalerank),
                    None => Err(ExtractError::NonNumericProperty {
                        key: SCALERANK_KEY.to_string(),
                        feature_index,
                        value: value.clone(),
                    }),
                },
            },
            TransformMode::CountriesCentroid { .. } | TransformMode::GeometryOnly => Ok(true),
        }
    }

    fn map(&self, mut feature: Feature, feature_index: usize) -> Result<Feature, ExtractError> {
        match self {
            TransformMode::PlacesFilter { .. } => {
                if let Some(attributes) = feature.attributes.as_mut() {
                    PropertyKeySet::places().retain_in(attributes);
                }
                Ok(feature)
            }
            TransformMode::CountriesCentroid { anchor } => {
                let point = anchor
                    .point_of(&feature.geometry)
                    .ok_or(ExtractError::EmptyGeometry { feature_index })?;
                let mut attributes = lowercase_keys(feature.attributes.take().unwrap_or_default());
                PropertyKeySet::countries().retain_in(&mut attributes);
                Ok(Feature {
                    id: feature.id,
                    ..Feature::new(geo::Geometry::Point(point), attributes)
                })
            }
            TransformMode::GeometryOnly => Ok(Feature {
                id: feature.id,
                ..Feature::from(feature.geometry)
            }),
        }
    }
}

/// Lower-case all keys. On a collision the later key in field order wins, at the position of
/// the earlier one.
fn lowercase_keys(attributes: FeatureMap) -> FeatureMap {
    let mut lowercased = FeatureMap::with_capacity(attributes.len());
    for (key, value) in attributes {
        lowercased.insert(key.to_lowercase(), value);
    }
    lowercased
}

/// Apply `mode` to every feature in a single pass, preserving order.
pub fn transform(features: Vec<Feature>, mode: &TransformMode) -> Result<Vec<Feature>, ExtractError> {
    let mut output = Vec::with_capacity(features.len());
    for (feature_index, feature) in features.into_iter().enumerate() {
        if mode.keep(&feature, feature_index)? {
            output.push(mode.map(feature, feature_index)?);
        }
    }
    Ok(output)
}
