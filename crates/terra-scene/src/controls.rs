//! Orbit camera controls with inertial damping.
//!
//! The camera sits on a sphere around `target`, parameterised by azimuth
//! `theta` (about +Y, 0 on +Z) and polar angle `phi` (0 at +Y). Drag input
//! adds angular velocity; each tick applies a `damping_factor` share of the
//! pending velocity and keeps the rest for later ticks, so the view glides to
//! a stop after the mouse is released.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use terra_config::CameraConfig;
use terra_input::OrbitInput;

/// Polar angle margin keeping the camera off the poles.
const POLE_MARGIN: f32 = 1e-4;

/// Velocity below which the controls count as settled.
const REST_EPSILON: f32 = 1e-6;

#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub theta: f32,
    pub phi: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Share of pending velocity applied per tick. `0` disables damping.
    pub damping_factor: f32,
    /// Radians per dragged pixel.
    pub rotate_speed: f32,
    /// Distance multiplier per wheel line.
    pub zoom_speed: f32,
    pending: Vec2,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitControls {
    /// Controls looking at the origin from `config.distance` along +Z.
    pub fn from_config(config: &CameraConfig) -> Self {
        let min_distance = config.min_distance.min(config.max_distance);
        let max_distance = config.max_distance.max(config.min_distance);
        Self {
            target: Vec3::ZERO,
            theta: 0.0,
            phi: PI / 2.0,
            distance: config.distance.clamp(min_distance, max_distance),
            min_distance,
            max_distance,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pending: Vec2::ZERO,
        }
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + self.distance
                * Vec3::new(
                    sin_phi * self.theta.sin(),
                    self.phi.cos(),
                    sin_phi * self.theta.cos(),
                )
    }

    /// Whether any angular velocity remains.
    pub fn is_moving(&self) -> bool {
        self.pending.length_squared() > REST_EPSILON * REST_EPSILON
    }

    /// Advance one tick with the input gathered since the last tick.
    pub fn update(&mut self, input: &OrbitInput) {
        // Dragging right swings the camera left around the target.
        self.pending -= input.rotate * self.rotate_speed;

        if input.zoom != 0.0 && self.zoom_speed > 0.0 {
            self.distance *= self.zoom_speed.powf(input.zoom);
        }
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);

        let step = if self.damping_factor > 0.0 {
            self.pending * self.damping_factor
        } else {
            self.pending
        };
        self.theta = (self.theta + step.x).rem_euclid(std::f32::consts::TAU);
        self.phi = (self.phi + step.y).clamp(POLE_MARGIN, PI - POLE_MARGIN);

        self.pending -= step;
        if !self.is_moving() {
            self.pending = Vec2::ZERO;
        }
    }
}
