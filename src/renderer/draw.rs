//! Draw command variants and their screen-size laws
//!
//! A command is plain data: which shader pair to bind, how many items to
//! draw, and the per-call parameters. The renderer dispatches on the variant.

use glam::{Mat4, Vec2};

/// Pixels per unit radius at distance 1
pub const POINT_SIZE_FACTOR: f32 = 12.0;
/// Point sprites shrink with `distance^POINT_FALLOFF`
pub const POINT_FALLOFF: f32 = 2.5;

/// Multiplier applied to every point radius at `distance`
#[inline]
pub fn point_scale(distance: f32) -> f32 {
    POINT_SIZE_FACTOR / distance.powf(POINT_FALLOFF)
}

/// On-screen diameter in pixels of a point of `radius` at `distance`
#[inline]
pub fn point_size(radius: f32, distance: f32) -> f32 {
    radius * point_scale(distance)
}

/// On-screen stroke width in pixels at `distance`
#[inline]
pub fn line_width(width: f32, distance: f32) -> f32 {
    width / distance
}

/// Per-frame values shared by every command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub distance: f32,
    /// Physical pixels
    pub viewport: Vec2,
}

impl FrameUniforms {
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Spots / Circles: one sprite per point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerParams {
    pub count: u32,
    /// See [`point_scale`]
    pub point_scale: f32,
}

/// One filled region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionParams {
    pub region: usize,
    pub vertex_count: u32,
    pub color: [f32; 3],
}

/// One closed region outline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineParams {
    pub region: usize,
    pub vertex_count: u32,
    pub color: [f32; 3],
    /// Pixels, already distance-compensated
    pub width: f32,
}

/// Closed set of draw variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Background,
    Spots(MarkerParams),
    Circles(MarkerParams),
    Regions(RegionParams),
    Outlines(OutlineParams),
}

/// Variant tag without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    Background,
    Spots,
    Circles,
    Regions,
    Outlines,
}

impl DrawCommand {
    pub fn kind(&self) -> DrawKind {
        match self {
            DrawCommand::Background => DrawKind::Background,
            DrawCommand::Spots(_) => DrawKind::Spots,
            DrawCommand::Circles(_) => DrawKind::Circles,
            DrawCommand::Regions(_) => DrawKind::Regions,
            DrawCommand::Outlines(_) => DrawKind::Outlines,
        }
    }

    /// Points for marker draws, ring vertices for region draws
    pub fn item_count(&self) -> u32 {
        match self {
            DrawCommand::Background => 1,
            DrawCommand::Spots(p) | DrawCommand::Circles(p) => p.count,
            DrawCommand::Regions(p) => p.vertex_count,
            DrawCommand::Outlines(p) => p.vertex_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_size_at_unit_distance() {
        assert_eq!(point_size(5.0, 1.0), 60.0);
    }

    #[test]
    fn test_point_falloff_exponent() {
        for d in [0.1f32, 0.5, 1.0, 2.0, 3.7] {
            let expected = point_size(4.0, 1.0) / d.powf(2.5);
            assert!((point_size(4.0, d) - expected).abs() <= expected * 1e-5);
        }
    }

    #[test]
    fn test_line_width_inverse_distance() {
        assert_eq!(line_width(2.0, 1.0), 2.0);
        assert_eq!(line_width(2.0, 4.0), 0.5);
        // Lines fall off slower than points
        assert!(line_width(1.0, 2.0) > point_scale(2.0) / POINT_SIZE_FACTOR);
    }

    #[test]
    fn test_kinds() {
        let marker = MarkerParams {
            count: 3,
            point_scale: 1.0,
        };
        assert_eq!(DrawCommand::Circles(marker).kind(), DrawKind::Circles);
        assert_eq!(DrawCommand::Circles(marker).item_count(), 3);
        assert_eq!(DrawCommand::Background.kind(), DrawKind::Background);
    }
}
