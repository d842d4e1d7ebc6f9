//! Region features: one segmented cell or tissue outline per item

use super::FeatureFile;
use serde::Deserialize;

/// One region ring as stored on disk, `[row, col]` per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub ring: Vec<[f32; 2]>,
}

#[derive(Deserialize)]
struct RegionFeature {
    geometry: RegionGeometry,
}

#[derive(Deserialize)]
struct RegionGeometry {
    coordinates: RingCoordinates,
}

/// Either a bare ring or a polygon whose first ring is the outer boundary
#[derive(Deserialize)]
#[serde(untagged)]
enum RingCoordinates {
    Ring(Vec<[f32; 2]>),
    Polygon(Vec<Vec<[f32; 2]>>),
}

impl From<RegionFeature> for RawRegion {
    fn from(feature: RegionFeature) -> Self {
        let mut ring = match feature.geometry.coordinates {
            RingCoordinates::Ring(ring) => ring,
            RingCoordinates::Polygon(rings) => rings.into_iter().next().unwrap_or_default(),
        };
        // Closed rings repeat the first vertex; the loop is closed at draw time
        if ring.len() >= 2 && ring.first() == ring.last() {
            ring.pop();
        }
        Self { ring }
    }
}

/// Parse a regions document (bare array or `{"features": [...]}`)
pub fn parse_regions(text: &str) -> serde_json::Result<Vec<RawRegion>> {
    let file: FeatureFile<RegionFeature> = serde_json::from_str(text)?;
    Ok(file.into_features().into_iter().map(RawRegion::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_ring() {
        let text = r#"[{"geometry": {"coordinates": [[0, 0], [0, 10], [10, 10], [10, 0]]}}]"#;
        let regions = parse_regions(text).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].ring.len(), 4);
        assert_eq!(regions[0].ring[1], [0.0, 10.0]);
    }

    #[test]
    fn test_parse_polygon_takes_outer_ring_and_drops_closing_vertex() {
        let text = r#"{"features": [{"geometry": {"type": "Polygon", "coordinates": [
            [[0, 0], [0, 4], [4, 4], [0, 0]],
            [[1, 1], [1, 2], [2, 2]]
        ]}}]}"#;
        let regions = parse_regions(text).unwrap();
        assert_eq!(regions[0].ring, vec![[0.0, 0.0], [0.0, 4.0], [4.0, 4.0]]);
    }

    #[test]
    fn test_empty_polygon() {
        let text = r#"[{"geometry": {"coordinates": []}}]"#;
        assert!(parse_regions(text).unwrap()[0].ring.is_empty());
    }
}
