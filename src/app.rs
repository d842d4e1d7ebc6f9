//! Main application state and event handling (winit 0.29 compat)

use crate::camera::{CameraConfig, CameraController};
use crate::dataset::{BackgroundImage, Dataset, DatasetPaths};
use crate::renderer::{FrameComposer, RenderStyle, Renderer};
use crate::scene::{
    ColorAssignment, LayerVisibility, Legend, LegendConfig, MarkerStyle, SceneGeometry, SceneState,
    LABEL_SHOW_BACKGROUND, LABEL_SHOW_REGIONS, LABEL_SHOW_SPOTS,
};
use crate::ui::{PanelEvent, PanelStatus, Ui};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoopWindowTarget,
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::Window,
};

/// Viewer configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window title
    pub title: String,
    /// Window width
    pub width: u32,
    /// Window height
    pub height: u32,
    pub dataset: DatasetPaths,
    pub camera: CameraConfig,
    pub style: RenderStyle,
    pub legend: LegendConfig,
    /// Layers shown at startup
    pub layers: LayerVisibility,
    pub marker_style: MarkerStyle,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "tissue-view".to_string(),
            width: 1280,
            height: 720,
            dataset: DatasetPaths::default(),
            camera: CameraConfig::default(),
            style: RenderStyle::default(),
            legend: LegendConfig::default(),
            layers: LayerVisibility::default(),
            marker_style: MarkerStyle::default(),
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config; missing fields take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config
            .camera
            .validate()
            .with_context(|| format!("Invalid camera settings in {}", path.display()))?;
        tracing::info!("Config loaded: {}", path.display());
        Ok(config)
    }
}

/// Application state
pub struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    ui: Ui,
    background: BackgroundImage,
    geometry: SceneGeometry,
    legend: Legend,
    /// Startup state; fallback for labels the panel does not report
    defaults: SceneState,
    scene: SceneState,
    colors: ColorAssignment,
    camera: CameraController,
    composer: FrameComposer,
    // Mouse drag state
    mouse_pressed: bool,
    last_mouse_pos: Option<PhysicalPosition<f64>>,
    modifiers: ModifiersState,
    config: ViewerConfig,
}

impl App {
    /// Build the static scene from a loaded dataset. No window yet.
    pub fn new(config: ViewerConfig, dataset: Dataset) -> Self {
        let geometry = SceneGeometry::from_dataset(&dataset);
        let legend = Legend::rank(&geometry.points, config.legend);
        tracing::info!(
            "Legend: {}",
            legend
                .entries()
                .iter()
                .map(|e| format!("{} ({})", e.category, e.count))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let defaults = SceneState::new(config.layers, config.marker_style, &legend);
        let ui = Ui::new(legend.clone(), defaults.to_panel(&legend));

        let mut colors = ColorAssignment::default();
        colors.refresh(&geometry.points, &legend, &defaults.selection);

        Self {
            window: None,
            renderer: None,
            ui,
            background: dataset.background,
            geometry,
            legend,
            scene: defaults.clone(),
            defaults,
            colors,
            camera: CameraController::new(config.camera),
            composer: FrameComposer::new(config.style),
            mouse_pressed: false,
            last_mouse_pos: None,
            modifiers: ModifiersState::empty(),
            config,
        }
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// Init window and renderer
    pub fn init(&mut self, target: &EventLoopWindowTarget<()>) {
        if self.window.is_some() {
            return;
        }

        let window = match winit::window::WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .build(target)
        {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                target.exit();
                return;
            }
        };

        let mut renderer = match pollster::block_on(Renderer::new(window.clone())) {
            Ok(renderer) => renderer,
            Err(e) => {
                tracing::error!("Failed to initialize renderer: {}", e);
                target.exit();
                return;
            }
        };

        renderer.upload_scene(&self.geometry, self.colors.colors(), &self.background);
        let size = window.inner_size();
        self.camera.set_viewport(size.width, size.height);

        self.renderer = Some(renderer);
        self.window = Some(window);
    }

    /// Fold pending panel events into the scene state and point colors
    pub fn apply_panel_events(&mut self) {
        let events: Vec<PanelEvent> = self.ui.events().collect();
        for event in events {
            match event {
                PanelEvent::SelectionChanged(values) => {
                    self.scene = SceneState::from_panel(&values, &self.defaults, &self.legend);
                }
                PanelEvent::ResetCamera => self.camera.reset(),
            }
        }

        if self
            .colors
            .refresh(&self.geometry.points, &self.legend, &self.scene.selection)
        {
            if let Some(renderer) = &self.renderer {
                renderer.write_colors(self.colors.colors());
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }

        tracing::debug!("Key pressed: {:?}", key);

        match key {
            KeyCode::KeyR => {
                self.camera.reset();
                tracing::info!("Camera reset to default");
            }
            KeyCode::KeyS => self.ui.toggle(LABEL_SHOW_SPOTS),
            KeyCode::KeyG => self.ui.toggle(LABEL_SHOW_REGIONS),
            KeyCode::KeyB => self.ui.toggle(LABEL_SHOW_BACKGROUND),
            KeyCode::KeyC => self.ui.cycle_marker_style(),
            KeyCode::F11 => {
                if let Some(window) = &self.window {
                    let fullscreen = window.fullscreen();
                    window.set_fullscreen(if fullscreen.is_some() {
                        None
                    } else {
                        Some(winit::window::Fullscreen::Borderless(None))
                    });
                    tracing::info!("Fullscreen toggled");
                }
            }
            _ => {}
        }
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>) {
        if self.mouse_pressed {
            if let Some(last_pos) = self.last_mouse_pos {
                let dx = (position.x - last_pos.x) as f32;
                let dy = (position.y - last_pos.y) as f32;
                if self.modifiers.shift_key() {
                    self.camera.rotate_by(dx);
                } else {
                    self.camera.pan_by(dx, dy);
                }
            }
        }
        self.last_mouse_pos = Some(position);
    }

    fn set_dragging(&mut self, pressed: bool) {
        self.mouse_pressed = pressed;
        if pressed {
            self.camera.begin_drag();
        } else {
            self.camera.end_drag();
        }
    }

    /// Pointer bookkeeping for events the panel swallowed
    fn handle_consumed(&mut self, event: &WindowEvent) {
        match event {
            // A drag released over the panel still ends
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } if self.camera.is_dragging() => self.set_dragging(false),
            // Keep tracking so leaving the panel does not jump
            WindowEvent::CursorMoved { position, .. } => {
                self.last_mouse_pos = Some(*position);
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        self.apply_panel_events();

        let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer) else {
            return;
        };

        let plan = self.composer.frame(
            &self.scene,
            &mut self.camera,
            &self.geometry,
            renderer.viewport(),
        );

        self.ui.record_frame();
        let status = PanelStatus {
            distance: self.camera.distance(),
            rotation: self.camera.rotation(),
            points: self.geometry.points.len(),
            regions: self.geometry.regions.len(),
        };

        let ui = &mut self.ui;
        if let Err(e) = renderer.render(window, &plan, |ctx| ui.show(ctx, &status)) {
            tracing::error!("Render error: {}", e);
        }

        window.request_redraw();
    }

    /// Main event handling logic (winit 0.29 style)
    pub fn handle_event(&mut self, event: Event<()>, target: &EventLoopWindowTarget<()>) {
        // Panel sees window events first
        if let (Some(window), Some(renderer), Event::WindowEvent { event: w_event, .. }) =
            (&self.window, &mut self.renderer, &event)
        {
            let response = renderer.handle_window_event(window, w_event);
            if response.repaint {
                window.request_redraw();
            }
            if response.consumed {
                self.handle_consumed(w_event);
                return;
            }
        }

        match event {
            Event::Resumed => {
                self.init(target);
            }
            Event::AboutToWait => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(size) => {
                    if let Some(renderer) = &mut self.renderer {
                        renderer.resize(size);
                    }
                    self.camera.set_viewport(size.width, size.height);
                }
                WindowEvent::ModifiersChanged(modifiers) => {
                    self.modifiers = modifiers.state();
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(key),
                            state,
                            ..
                        },
                    ..
                } => {
                    self.handle_key(key, state == ElementState::Pressed);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                    };
                    self.camera.zoom(scroll);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    self.set_dragging(state == ElementState::Pressed);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    self.handle_cursor(position);
                }
                WindowEvent::RedrawRequested => self.redraw(),
                _ => {}
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{RawRegion, RawSpot};
    use std::io::Write;

    fn dataset() -> Dataset {
        let spot = |row: f32, col: f32, gene: &str| RawSpot {
            coordinates: [row, col],
            radius: 4.0,
            category: gene.to_string(),
            quality: 0.0,
        };
        Dataset {
            background: BackgroundImage {
                width: 100,
                height: 100,
                rgba: Arc::new(vec![0; 100 * 100 * 4]),
            },
            spots: vec![
                spot(10.0, 10.0, "none"),
                spot(10.0, 20.0, "none"),
                spot(20.0, 10.0, "Gad1"),
                spot(30.0, 30.0, "Sst"),
            ],
            regions: vec![RawRegion {
                ring: vec![[0.0, 0.0], [0.0, 50.0], [50.0, 50.0], [50.0, 0.0]],
            }],
        }
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{"title": "mouse brain", "camera": {"max_distance": 8.0}}"#)
                .unwrap();
        assert_eq!(config.title, "mouse brain");
        assert_eq!(config.camera.max_distance, 8.0);
        assert_eq!(config.camera.min_distance, CameraConfig::default().min_distance);
        assert_eq!(config.width, 1280);
        assert_eq!(config.marker_style, MarkerStyle::Spots);
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"marker_style": "circles", "layers": {{"regions": false}}}}"#
        )
        .unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.marker_style, MarkerStyle::Circles);
        assert!(!config.layers.regions);
        assert!(config.layers.spots);
    }

    #[test]
    fn test_config_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(ViewerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_config_load_rejects_inverted_distance_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"camera": {{"min_distance": 5.0}}}}"#).unwrap();
        let err = ViewerConfig::load(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("min_distance"));
    }

    #[test]
    fn test_new_app_starts_from_config() {
        let config = ViewerConfig {
            marker_style: MarkerStyle::Circles,
            ..Default::default()
        };
        let app = App::new(config, dataset());
        assert_eq!(app.scene().marker_style, MarkerStyle::Circles);
        // "none" is the most frequent category and is skipped
        assert_eq!(app.legend.len(), 2);
        assert!(app.scene().selection.is_selected("Gad1"));
        assert_eq!(app.colors.colors().len(), 4);
    }

    #[test]
    fn test_panel_events_update_scene() {
        let mut app = App::new(ViewerConfig::default(), dataset());
        app.ui.toggle(LABEL_SHOW_REGIONS);
        app.ui.cycle_marker_style();
        app.apply_panel_events();

        assert!(!app.scene().layers.regions);
        assert!(app.scene().layers.spots);
        assert_eq!(app.scene().marker_style, MarkerStyle::Circles);
    }

    #[test]
    fn test_reset_key_restores_camera() {
        let mut app = App::new(ViewerConfig::default(), dataset());
        app.camera.set_viewport(800, 600);
        app.camera.zoom(3.0);
        app.handle_key(KeyCode::KeyR, true);
        assert_eq!(app.camera().distance(), CameraConfig::default().initial_distance);
    }

    #[test]
    fn test_cursor_over_panel_keeps_tracking() {
        let mut app = App::new(ViewerConfig::default(), dataset());
        app.camera.set_viewport(800, 600);
        app.set_dragging(true);
        app.handle_cursor(PhysicalPosition::new(100.0, 100.0));
        let before = app.camera().pan();

        // Crossing the panel, then leaving it one pixel further on
        app.handle_consumed(&WindowEvent::CursorMoved {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            position: PhysicalPosition::new(400.0, 100.0),
        });
        app.handle_cursor(PhysicalPosition::new(401.0, 100.0));

        let moved = (app.camera().pan() - before).length();
        assert!((moved - 2.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_shift_drag_rotates() {
        let mut app = App::new(ViewerConfig::default(), dataset());
        app.camera.set_viewport(800, 600);
        app.modifiers = ModifiersState::SHIFT;
        app.set_dragging(true);
        app.handle_cursor(PhysicalPosition::new(100.0, 100.0));
        app.handle_cursor(PhysicalPosition::new(150.0, 100.0));

        assert!(app.camera().rotation() != 0.0);
        assert_eq!(app.camera().pan(), glam::Vec2::ZERO);
    }
}
