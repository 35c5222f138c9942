use crate::{error::ExtractError, geofile::geojson::FeatureCollection};

/// Quantization passed to the simplifier for the country geometry output.
pub const DEFAULT_QUANTIZATION: f64 = 1e5;

/// Turns a feature collection into a simplified encoding, e.g. TopoJSON.
pub trait GeometrySimplifier {
    fn simplify(
        &self,
        collection: &FeatureCollection,
        quantization: f64,
    ) -> Result<Vec<u8>, ExtractError>;
}
