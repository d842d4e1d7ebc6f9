//! Pixel → normalized device space mapping
//!
//! Points and region rings go through the same mapping so overlays stay
//! pixel-aligned with the background image whatever its aspect ratio.

use glam::Vec2;

/// Maps raw `[row, col]` pixel coordinates into [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateNormalizer {
    half_width: f32,
    half_height: f32,
}

impl CoordinateNormalizer {
    /// Create a normalizer for a reference image of `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            half_width: width as f32 / 2.0,
            half_height: height as f32 / 2.0,
        }
    }

    /// `x' = col / (width / 2) - 1`, `y' = row / (height / 2) - 1`
    #[inline]
    pub fn normalize(&self, row: f32, col: f32) -> Vec2 {
        Vec2::new(col / self.half_width - 1.0, row / self.half_height - 1.0)
    }

    /// Normalize a raw `[row, col]` pair
    #[inline]
    pub fn normalize_pair(&self, raw: [f32; 2]) -> Vec2 {
        self.normalize(raw[0], raw[1])
    }

    /// Normalize every vertex of a ring
    pub fn normalize_ring(&self, ring: &[[f32; 2]]) -> Vec<Vec2> {
        ring.iter().map(|&raw| self.normalize_pair(raw)).collect()
    }
}
