//! Viewport-dependent projection

use glam::{Mat4, Vec2};

/// Render target size in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Horizontal half-extent, with `scale` = image height / width
    pub fn aspect(&self, scale: f32) -> f32 {
        self.width as f32 * scale / self.height as f32
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Orthographic projection: y spans [-1, 1], x spans ±aspect
pub fn projection(viewport: Viewport, scale: f32) -> Mat4 {
    let aspect = viewport.aspect(scale);
    Mat4::orthographic_rh(-aspect, aspect, -1.0, 1.0, -1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_aspect() {
        let viewport = Viewport::new(1600, 800);
        assert_eq!(viewport.aspect(0.5), 1.0);
        assert_eq!(viewport.aspect(1.0), 2.0);
    }

    #[test]
    fn test_image_keeps_its_proportions() {
        // 1000x500 image in a square window: the [-1,1] quad must appear 2:1
        let viewport = Viewport::new(600, 600);
        let proj = projection(viewport, 0.5);
        let corner = proj * Vec4::new(1.0, 1.0, 0.0, 1.0);
        let px_w = corner.x * 300.0;
        let px_h = corner.y * 300.0;
        assert!((px_w / px_h - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_in_range() {
        let clip = projection(Viewport::new(10, 10), 1.0) * Vec4::new(0.3, -0.2, 0.0, 1.0);
        assert!(clip.z >= 0.0 && clip.z <= 1.0);
        assert_eq!(clip.w, 1.0);
    }

    #[test]
    fn test_zero_size_viewport_is_clamped() {
        assert_eq!(Viewport::new(0, 0), Viewport::new(1, 1));
    }
}
