use indexmap::IndexMap;

/// Scalar value of a feature attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Real(f64),
    Null,
}

impl AttributeValue {
    /// Numeric value of integer and real attributes, None for anything else.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Real(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::String(value) => serde_json::Value::from(value.as_str()),
            AttributeValue::Integer(value) => serde_json::Value::from(*value),
            // Non-finite reals have no JSON representation and serialize as null.
            AttributeValue::Real(value) => serde_json::Value::from(*value),
            AttributeValue::Null => serde_json::Value::Null,
        }
    }
}

/// Attributes of a feature, in the field order of the source dataset.
pub type FeatureMap = IndexMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier in the source dataset, the feature's index for files read through GDAL.
    pub id: Option<String>,
    pub geometry: geo::Geometry,
    /// None when the feature carries no properties at all, as opposed to an empty map.
    pub attributes: Option<FeatureMap>,
}

impl Feature {
    pub fn new(geometry: geo::Geometry, attributes: FeatureMap) -> Self {
        Self {
            id: None,
            geometry,
            attributes: Some(attributes),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.as_ref().and_then(|attributes| attributes.get(key))
    }
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            id: None,
            geometry: value,
            attributes: None,
        }
    }
}
