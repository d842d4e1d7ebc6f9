//! Pan / zoom / rotate camera for the flat scene

use anyhow::{ensure, Result};
use glam::{Mat2, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Velocity below which pan inertia stops
const REST_EPSILON: f32 = 1e-5;

/// Camera tuning, all inputs are clamped against these
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance at startup and after reset
    pub initial_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Distance factor per wheel notch
    pub zoom_step: f32,
    /// Radians per pixel of rotate-drag
    pub rotate_sensitivity: f32,
    /// Fraction of pan velocity kept each tick after release (0 = no inertia)
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_distance: 1.0,
            min_distance: 0.05,
            max_distance: 4.0,
            zoom_step: 1.1,
            rotate_sensitivity: 0.01,
            damping: 0.85,
        }
    }
}

impl CameraConfig {
    /// Reject tunings the controller cannot honor
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.initial_distance,
            self.min_distance,
            self.max_distance,
            self.zoom_step,
            self.rotate_sensitivity,
            self.damping,
        ];
        ensure!(values.iter().all(|v| v.is_finite()), "camera values must be finite");
        ensure!(self.min_distance > 0.0, "min_distance must be positive, got {}", self.min_distance);
        ensure!(
            self.min_distance <= self.max_distance,
            "min_distance {} exceeds max_distance {}",
            self.min_distance,
            self.max_distance
        );
        ensure!(self.zoom_step > 0.0, "zoom_step must be positive, got {}", self.zoom_step);
        ensure!(
            (0.0..1.0).contains(&self.damping),
            "damping must be in [0, 1), got {}",
            self.damping
        );
        Ok(())
    }
}

/// Interaction state read by every draw command once per frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// World-space point shown at the viewport center
    pub pan: Vec2,
    /// Inverse scale; larger = zoomed out
    pub distance: f32,
    /// Radians in [0, 2π)
    pub rotation: f32,
    pub dragging: bool,
}

/// Owns the camera state and applies input transitions to it
#[derive(Debug, Clone)]
pub struct CameraController {
    state: CameraState,
    config: CameraConfig,
    viewport: Vec2,
    velocity: Vec2,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            state: CameraState {
                pan: Vec2::ZERO,
                distance: 1.0,
                rotation: 0.0,
                dragging: false,
            },
            config,
            viewport: Vec2::new(1.0, 1.0),
            velocity: Vec2::ZERO,
        };
        camera.set_distance(config.initial_distance);
        camera
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn distance(&self) -> f32 {
        self.state.distance
    }

    pub fn pan(&self) -> Vec2 {
        self.state.pan
    }

    pub fn rotation(&self) -> f32 {
        self.state.rotation
    }

    pub fn is_dragging(&self) -> bool {
        self.state.dragging
    }

    /// Viewport size in physical pixels, used to convert drag deltas
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    /// Clamp into `[min_distance, max_distance]`; non-finite requests are ignored.
    /// An inverted range resolves to `max_distance` instead of panicking.
    pub fn set_distance(&mut self, distance: f32) {
        if distance.is_finite() {
            let clamped = distance.max(self.config.min_distance).min(self.config.max_distance);
            if clamped.is_finite() && clamped > 0.0 {
                self.state.distance = clamped;
            }
        }
    }

    pub fn begin_drag(&mut self) {
        self.state.dragging = true;
        self.velocity = Vec2::ZERO;
    }

    pub fn end_drag(&mut self) {
        self.state.dragging = false;
    }

    /// Drag by a pointer delta in pixels; the content follows the cursor
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        let pixel = 2.0 * self.state.distance / self.viewport.y;
        let screen = Vec2::new(-dx, dy) * pixel;
        let delta = Mat2::from_angle(-self.state.rotation) * screen;
        self.state.pan += delta;
        if self.state.dragging {
            self.velocity = delta;
        }
    }

    /// Rotate by a horizontal pointer delta in pixels
    pub fn rotate_by(&mut self, dx: f32) {
        self.set_rotation(self.state.rotation + dx * self.config.rotate_sensitivity);
    }

    pub fn set_rotation(&mut self, radians: f32) {
        if radians.is_finite() {
            self.state.rotation = radians.rem_euclid(TAU);
        }
    }

    /// Multiplicative zoom; positive scroll zooms in
    pub fn zoom(&mut self, scroll: f32) {
        self.set_distance(self.state.distance * self.config.zoom_step.powf(-scroll));
    }

    /// Per-frame step: coast on the last drag velocity after release.
    /// While held, velocity decays so a paused drag releases at rest.
    /// Returns true while the camera is still moving.
    pub fn tick(&mut self) -> bool {
        if self.state.dragging {
            self.velocity *= self.config.damping;
            if self.velocity.length() < REST_EPSILON {
                self.velocity = Vec2::ZERO;
            }
            return false;
        }
        if self.velocity == Vec2::ZERO {
            return false;
        }
        self.state.pan += self.velocity;
        self.velocity *= self.config.damping;
        if self.velocity.length() < REST_EPSILON {
            self.velocity = Vec2::ZERO;
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self {
            viewport: self.viewport,
            ..Self::new(self.config)
        };
    }

    /// `scale(1/distance) · rotate(rotation) · translate(-pan)`
    pub fn view(&self) -> Mat4 {
        let inv = 1.0 / self.state.distance;
        Mat4::from_scale(Vec3::new(inv, inv, 1.0))
            * Mat4::from_rotation_z(self.state.rotation)
            * Mat4::from_translation(-self.state.pan.extend(0.0))
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
