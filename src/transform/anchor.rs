use geo::{Centroid, InteriorPoint};
use serde::Deserialize;

/// How a country polygon is reduced to a single point.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorPoint {
    /// A point guaranteed to lie inside the geometry.
    #[default]
    RepresentativePoint,
    /// The arithmetic centroid, which can fall outside non-convex shapes.
    Centroid,
}

impl AnchorPoint {
    /// None if the geometry is empty.
    pub fn point_of(&self, geometry: &geo::Geometry) -> Option<geo::Point> {
        match self {
            AnchorPoint::RepresentativePoint => geometry.interior_point(),
            AnchorPoint::Centroid => geometry.centroid(),
        }
    }
}
