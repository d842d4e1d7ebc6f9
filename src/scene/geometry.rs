//! Flat GPU-ready arrays, built once after load

use super::normalize::CoordinateNormalizer;
use super::{Point, Region};
use crate::dataset::Dataset;
use earcutr::earcut;
use std::ops::Range;

/// Static scene geometry in normalized device space
#[derive(Debug, Clone, Default)]
pub struct SceneGeometry {
    pub points: Vec<Point>,
    pub regions: Vec<Region>,
    /// Per-point center, instance data for marker draws
    pub positions: Vec<[f32; 2]>,
    /// Per-point base radius
    pub sizes: Vec<f32>,
    /// Triangle list for every region, concatenated
    pub fill_vertices: Vec<[f32; 2]>,
    /// Slice of `fill_vertices` per region
    pub fill_ranges: Vec<Range<u32>>,
    /// Every ring stored closed (first vertex repeated at the end)
    pub outline_vertices: Vec<[f32; 2]>,
    /// Offset of each ring in `outline_vertices`
    pub outline_starts: Vec<u32>,
    /// Background height / width
    pub scale: f32,
}

impl SceneGeometry {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let normalizer =
            CoordinateNormalizer::new(dataset.background.width, dataset.background.height);

        let points = dataset
            .spots
            .iter()
            .map(|spot| Point {
                position: normalizer.normalize_pair(spot.coordinates),
                radius: spot.radius,
                category: spot.category.clone(),
                quality: spot.quality,
            })
            .collect();

        let regions = dataset
            .regions
            .iter()
            .map(|region| Region {
                ring: normalizer.normalize_ring(&region.ring),
            })
            .collect();

        Self::build(points, regions, dataset.background.scale())
    }

    pub fn build(points: Vec<Point>, regions: Vec<Region>, scale: f32) -> Self {
        let positions: Vec<[f32; 2]> = points.iter().map(|p| p.position.to_array()).collect();
        let sizes: Vec<f32> = points.iter().map(|p| p.radius).collect();

        let mut fill_vertices = Vec::new();
        let mut fill_ranges = Vec::with_capacity(regions.len());
        let mut outline_vertices = Vec::new();
        let mut outline_starts = Vec::with_capacity(regions.len());

        for region in &regions {
            let start = fill_vertices.len() as u32;
            fill_vertices.extend(triangulate(region));
            fill_ranges.push(start..fill_vertices.len() as u32);

            outline_starts.push(outline_vertices.len() as u32);
            outline_vertices.extend(region.ring.iter().map(|v| v.to_array()));
            if let Some(first) = region.ring.first() {
                outline_vertices.push(first.to_array());
            }
        }

        tracing::info!(
            "Scene geometry: {} points, {} regions, {} fill triangles",
            points.len(),
            regions.len(),
            fill_vertices.len() / 3
        );

        Self {
            points,
            regions,
            positions,
            sizes,
            fill_vertices,
            fill_ranges,
            outline_vertices,
            outline_starts,
            scale,
        }
    }

    /// Number of vertices in region `index`'s ring
    pub fn ring_len(&self, index: usize) -> u32 {
        self.regions[index].ring.len() as u32
    }
}

/// Ear-clipped triangle list for one ring; empty if degenerate
fn triangulate(region: &Region) -> Vec<[f32; 2]> {
    if region.ring.len() < 3 {
        return Vec::new();
    }
    let coords: Vec<f64> = region
        .ring
        .iter()
        .flat_map(|v| [v.x as f64, v.y as f64])
        .collect();

    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };

    indices
        .into_iter()
        .filter_map(|i| region.ring.get(i).map(|v| v.to_array()))
        .collect()
}
