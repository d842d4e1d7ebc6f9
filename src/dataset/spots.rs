//! Spot features: one decoded transcript per item

use super::FeatureFile;
use serde::Deserialize;

/// One spot as stored on disk, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawSpot {
    /// `[row, col]` in background pixels
    pub coordinates: [f32; 2],
    pub radius: f32,
    pub category: String,
    pub quality: f32,
}

#[derive(Deserialize)]
struct SpotFeature {
    geometry: PointGeometry,
    properties: SpotProperties,
}

#[derive(Deserialize)]
struct PointGeometry {
    coordinates: [f32; 2],
}

#[derive(Deserialize)]
struct SpotProperties {
    #[serde(alias = "category")]
    gene: String,
    radius: f32,
    #[serde(alias = "quality", default)]
    qual: f32,
}

impl From<SpotFeature> for RawSpot {
    fn from(feature: SpotFeature) -> Self {
        Self {
            coordinates: feature.geometry.coordinates,
            radius: feature.properties.radius,
            category: feature.properties.gene,
            quality: feature.properties.qual,
        }
    }
}

/// Parse a spots document (bare array or `{"features": [...]}`)
pub fn parse_spots(text: &str) -> serde_json::Result<Vec<RawSpot>> {
    let file: FeatureFile<SpotFeature> = serde_json::from_str(text)?;
    Ok(file.into_features().into_iter().map(RawSpot::from).collect())
}
