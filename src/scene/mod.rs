//! Scene model: normalized geometry, panel-driven state, and point colors

pub mod colors;
pub mod geometry;
pub mod normalize;
pub mod state;

pub use colors::*;
pub use geometry::*;
pub use normalize::*;
pub use state::*;

use glam::Vec2;

/// One decoded spot in normalized device space
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub position: Vec2,
    pub radius: f32,
    pub category: String,
    pub quality: f32,
}

/// One region boundary in normalized device space
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub ring: Vec<Vec2>,
}
