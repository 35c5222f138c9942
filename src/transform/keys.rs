use std::collections::BTreeSet;

use crate::geofile::feature::FeatureMap;

pub const PLACES_KEYS: [&str; 4] = ["scalerank", "name", "latitude", "longitude"];
pub const COUNTRIES_KEYS: [&str; 1] = ["name"];

/// Set of property keys to retain for a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyKeySet(BTreeSet<String>);

impl PropertyKeySet {
    pub fn places() -> Self {
        Self::from_iter(PLACES_KEYS)
    }

    pub fn countries() -> Self {
        Self::from_iter(COUNTRIES_KEYS)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Drop every attribute whose key is not in the set. The order of the remaining attributes
    /// is unchanged, keys of the set which the attributes lack stay absent.
    pub fn retain_in(&self, attributes: &mut FeatureMap) {
        attributes.retain(|key, _| self.contains(key));
    }
}

impl<'a> FromIterator<&'a str> for PropertyKeySet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(keys: I) -> Self {
        Self(keys.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyKeySet;
    use crate::geofile::feature::{AttributeValue, FeatureMap};

    #[test]
    fn test_retain_in_keeps_order_and_ignores_unknown_keys() {
        let mut attributes = FeatureMap::from([
            ("featurecla".to_string(), AttributeValue::from("Admin-0 capital")),
            ("scalerank".to_string(), AttributeValue::Integer(1)),
            ("name".to_string(), AttributeValue::from("Lima")),
            ("pop_max".to_string(), AttributeValue::Integer(8_012_000)),
            ("longitude".to_string(), AttributeValue::Real(-77.05)),
        ]);
        PropertyKeySet::places().retain_in(&mut attributes);

        let keys: Vec<&str> = attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["scalerank", "name", "longitude"]);
    }
}
