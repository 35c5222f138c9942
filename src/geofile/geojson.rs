use std::{fs, io, path::Path};

use super::feature::Feature;

/// Ordered features of one dataset, serialized as a GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl From<&Feature> for geojson::Feature {
    fn from(feature: &Feature) -> Self {
        let properties = feature.attributes.as_ref().map(|attributes| {
            attributes
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                .collect::<geojson::JsonObject>()
        });
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
            id: feature.id.clone().map(geojson::feature::Id::String),
            properties,
            foreign_members: None,
        }
    }
}

impl FeatureCollection {
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        self.features.iter().map(geojson::Feature::from).collect()
    }

    pub fn to_geojson_string(&self) -> String {
        geojson::GeoJson::from(self.to_geojson()).to_string()
    }
}

pub fn write_collection_to_geojson(
    collection: &FeatureCollection,
    output_filepath: &Path,
) -> io::Result<()> {
    fs::write(output_filepath, collection.to_geojson_string())
}

#[cfg(test)]
mod tests {
    use testdir::testdir;

    use super::{write_collection_to_geojson, FeatureCollection};
    use crate::geofile::feature::{AttributeValue, Feature, FeatureMap};

    fn city() -> Feature {
        Feature::new(
            geo::Geometry::Point(geo::Point::new(2.35, 48.86)),
            FeatureMap::from([
                ("scalerank".to_string(), AttributeValue::Integer(0)),
                ("name".to_string(), AttributeValue::from("Paris")),
            ]),
        )
    }

    #[test]
    fn test_feature_collection_json() {
        let collection = FeatureCollection::from(vec![city()]);
        let json: serde_json::Value =
            serde_json::from_str(&collection.to_geojson_string()).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        let feature = &json["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Point");
        assert_eq!(feature["geometry"]["coordinates"], serde_json::json!([2.35, 48.86]));
        assert_eq!(
            feature["properties"],
            serde_json::json!({"scalerank": 0, "name": "Paris"})
        );
    }

    #[test]
    fn test_properties_keep_field_order() {
        let serialized = FeatureCollection::from(vec![city()]).to_geojson_string();
        let scalerank_position = serialized.find("\"scalerank\"").unwrap();
        let name_position = serialized.find("\"name\"").unwrap();
        assert!(scalerank_position < name_position);
    }

    #[test]
    fn test_absent_properties_serialize_as_null() {
        let feature = Feature::from(geo::Geometry::Point(geo::Point::new(0.0, 0.0)));
        let json: serde_json::Value = serde_json::from_str(
            &FeatureCollection::from(vec![feature]).to_geojson_string(),
        )
        .unwrap();
        assert!(json["features"][0]["properties"].is_null());
    }

    #[test]
    fn test_feature_id_is_written() {
        let collection = FeatureCollection::from(vec![
            city().with_id("17"),
            Feature::from(geo::Geometry::Point(geo::Point::new(0.0, 0.0))),
        ]);
        let json: serde_json::Value =
            serde_json::from_str(&collection.to_geojson_string()).unwrap();
        assert_eq!(json["features"][0]["id"], "17");
        assert!(json["features"][1].get("id").is_none());
    }

    #[test]
    fn test_write_collection_to_geojson() {
        let output_filepath = testdir!().join("cities.geo.json");
        write_collection_to_geojson(&FeatureCollection::from(vec![city()]), &output_filepath)
            .unwrap();

        let contents = std::fs::read_to_string(&output_filepath).unwrap();
        assert_eq!(contents, FeatureCollection::from(vec![city()]).to_geojson_string());
    }
}
