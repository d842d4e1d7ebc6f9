//! Per-frame composition: which draw commands run, in which order

use super::draw::{line_width, point_scale, DrawCommand, FrameUniforms, MarkerParams, OutlineParams, RegionParams};
use super::projection::{projection, Viewport};
use crate::camera::CameraController;
use crate::scene::{MarkerStyle, SceneGeometry, SceneState};
use serde::{Deserialize, Serialize};

/// Fixed colors and widths used by the composer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub clear_color: [f32; 4],
    pub region_color: [f32; 3],
    pub outline_color: [f32; 3],
    /// Outline width in pixels at distance 1
    pub line_width: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            region_color: [0.3, 0.3, 0.3],
            outline_color: [0.2, 0.2, 0.2],
            line_width: 2.0,
        }
    }
}

/// One frame's worth of work for the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    /// Color clear value; depth is always cleared to 1.0
    pub clear_color: [f32; 4],
    pub uniforms: FrameUniforms,
    pub commands: Vec<DrawCommand>,
}

impl FramePlan {
    pub fn count(&self, kind: super::draw::DrawKind) -> usize {
        self.commands.iter().filter(|c| c.kind() == kind).count()
    }
}

/// Builds a [`FramePlan`] from the current scene and camera
#[derive(Debug, Clone, Default)]
pub struct FrameComposer {
    style: RenderStyle,
}

impl FrameComposer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Plan the frame, then advance the camera by one tick
    pub fn frame(
        &self,
        scene: &SceneState,
        camera: &mut CameraController,
        geometry: &SceneGeometry,
        viewport: Viewport,
    ) -> FramePlan {
        let plan = self.compose(scene, camera, geometry, viewport);
        camera.tick();
        plan
    }

    /// Layering: Background → Spots/Circles → Regions → Outlines
    pub fn compose(
        &self,
        scene: &SceneState,
        camera: &CameraController,
        geometry: &SceneGeometry,
        viewport: Viewport,
    ) -> FramePlan {
        let distance = camera.distance();
        let uniforms = FrameUniforms {
            view: camera.view(),
            projection: projection(viewport, geometry.scale),
            distance,
            viewport: viewport.size(),
        };

        let mut commands = Vec::with_capacity(2 + 2 * geometry.regions.len());

        if scene.layers.background {
            commands.push(DrawCommand::Background);
        }

        let count = geometry.positions.len() as u32;
        if scene.layers.spots && count > 0 {
            let marker = MarkerParams {
                count,
                point_scale: point_scale(distance),
            };
            commands.push(match scene.marker_style {
                MarkerStyle::Spots => DrawCommand::Spots(marker),
                MarkerStyle::Circles => DrawCommand::Circles(marker),
            });
        }

        if scene.layers.regions {
            for (region, range) in geometry.fill_ranges.iter().enumerate() {
                if range.is_empty() {
                    continue;
                }
                commands.push(DrawCommand::Regions(RegionParams {
                    region,
                    vertex_count: geometry.ring_len(region),
                    color: self.style.region_color,
                }));
            }

            let width = line_width(self.style.line_width, distance);
            for region in 0..geometry.regions.len() {
                let vertex_count = geometry.ring_len(region);
                if vertex_count < 2 {
                    continue;
                }
                commands.push(DrawCommand::Outlines(OutlineParams {
                    region,
                    vertex_count,
                    color: self.style.outline_color,
                    width,
                }));
            }
        }

        FramePlan {
            clear_color: self.style.clear_color,
            uniforms,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::draw::DrawKind;
    use crate::scene::{Legend, LayerVisibility, Point, Region};
    use glam::Vec2;

    fn geometry(points: usize, rings: Vec<Vec<Vec2>>) -> SceneGeometry {
        let points = (0..points)
            .map(|i| Point {
                position: Vec2::new(i as f32 * 0.1, 0.0),
                radius: 5.0,
                category: "A".into(),
                quality: 1.0,
            })
            .collect();
        let regions = rings.into_iter().map(|ring| Region { ring }).collect();
        SceneGeometry::build(points, regions, 0.5)
    }

    fn quad() -> Vec<Vec2> {
        vec![
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
        ]
    }

    fn scene(layers: LayerVisibility, style: MarkerStyle) -> SceneState {
        SceneState::new(layers, style, &Legend::default())
    }

    fn kinds(plan: &FramePlan) -> Vec<DrawKind> {
        plan.commands.iter().map(|c| c.kind()).collect()
    }

    #[test]
    fn test_layer_order() {
        let geometry = geometry(3, vec![quad(), quad()]);
        let camera = CameraController::default();
        let plan = FrameComposer::default().compose(
            &scene(LayerVisibility::default(), MarkerStyle::Spots),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        assert_eq!(
            kinds(&plan),
            vec![
                DrawKind::Background,
                DrawKind::Spots,
                DrawKind::Regions,
                DrawKind::Regions,
                DrawKind::Outlines,
                DrawKind::Outlines,
            ]
        );
    }

    #[test]
    fn test_marker_styles_are_exclusive() {
        let geometry = geometry(3, Vec::new());
        let camera = CameraController::default();
        let plan = FrameComposer::default().compose(
            &scene(LayerVisibility::default(), MarkerStyle::Circles),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        assert_eq!(plan.count(DrawKind::Circles), 1);
        assert_eq!(plan.count(DrawKind::Spots), 0);
    }

    #[test]
    fn test_hidden_layers_emit_nothing() {
        let geometry = geometry(3, vec![quad()]);
        let camera = CameraController::default();
        let layers = LayerVisibility {
            spots: false,
            regions: false,
            background: true,
        };
        let plan = FrameComposer::default().compose(
            &scene(layers, MarkerStyle::Spots),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        assert_eq!(kinds(&plan), vec![DrawKind::Background]);
    }

    #[test]
    fn test_empty_geometry_is_a_noop() {
        let geometry = geometry(0, vec![Vec::new()]);
        let camera = CameraController::default();
        let plan = FrameComposer::default().compose(
            &scene(LayerVisibility::default(), MarkerStyle::Spots),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        assert_eq!(kinds(&plan), vec![DrawKind::Background]);
    }

    #[test]
    fn test_four_vertex_region_draws_once_each() {
        let geometry = geometry(0, vec![quad()]);
        let camera = CameraController::default();
        let plan = FrameComposer::default().compose(
            &scene(LayerVisibility::default(), MarkerStyle::Spots),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        let regions: Vec<_> = plan
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Regions(_) | DrawCommand::Outlines(_)))
            .collect();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind(), DrawKind::Regions);
        assert_eq!(regions[1].kind(), DrawKind::Outlines);
        assert!(regions.iter().all(|c| c.item_count() == 4));
    }

    #[test]
    fn test_sizes_follow_distance() {
        let geometry = geometry(1, vec![quad()]);
        let mut camera = CameraController::default();
        camera.set_distance(2.0);
        let plan = FrameComposer::default().compose(
            &scene(LayerVisibility::default(), MarkerStyle::Spots),
            &camera,
            &geometry,
            Viewport::new(800, 600),
        );
        for command in &plan.commands {
            match command {
                DrawCommand::Spots(p) => {
                    assert!((p.point_scale - 12.0 / 2f32.powf(2.5)).abs() < 1e-5)
                }
                DrawCommand::Outlines(p) => assert_eq!(p.width, 1.0),
                _ => {}
            }
        }
        assert_eq!(plan.uniforms.distance, 2.0);
        assert_eq!(plan.uniforms.viewport, Vec2::new(800.0, 600.0));
    }

    #[test]
    fn test_frame_ticks_camera_after_planning() {
        let geometry = geometry(1, Vec::new());
        let mut camera = CameraController::default();
        camera.set_viewport(800, 600);
        camera.begin_drag();
        camera.pan_by(50.0, 0.0);
        camera.end_drag();
        let released = camera.view();

        let plan = FrameComposer::default().frame(
            &scene(LayerVisibility::default(), MarkerStyle::Spots),
            &mut camera,
            &geometry,
            Viewport::new(800, 600),
        );
        assert_eq!(plan.uniforms.view, released);
        assert_ne!(camera.view(), released);
    }

    #[test]
    fn test_end_to_end_single_point() {
        use crate::dataset::{BackgroundImage, Dataset, RawSpot};
        use crate::scene::{ColorAssignment, LegendConfig};
        use std::sync::Arc;

        let dataset = Dataset {
            background: BackgroundImage {
                width: 1000,
                height: 500,
                rgba: Arc::new(Vec::new()),
            },
            spots: vec![RawSpot {
                coordinates: [250.0, 500.0],
                radius: 5.0,
                category: "A".into(),
                quality: 1.0,
            }],
            regions: Vec::new(),
        };
        let geometry = SceneGeometry::from_dataset(&dataset);
        assert_eq!(geometry.positions[0], [0.0, 0.0]);

        let legend = Legend::rank(&geometry.points, LegendConfig { skip: 0, size: 9 });
        let state = SceneState::new(LayerVisibility::default(), MarkerStyle::Spots, &legend);
        assert!(state.selection.is_selected("A"));

        let mut colors = ColorAssignment::default();
        colors.refresh(&geometry.points, &legend, &state.selection);
        assert_eq!(
            colors.colors()[0],
            legend.color_of("A").unwrap().darker(1.0).to_array()
        );

        let plan = FrameComposer::default().compose(
            &state,
            &CameraController::default(),
            &geometry,
            Viewport::new(1000, 500),
        );
        let DrawCommand::Spots(marker) = plan.commands[1] else {
            panic!("expected spots after background");
        };
        assert_eq!(geometry.sizes[0] * marker.point_scale, 60.0);
    }
}
