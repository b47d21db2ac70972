//! Damped orbit controls.
//!
//! Input accumulates into pending rotation/pan/zoom deltas; each
//! [`OrbitControls::update`] applies a `damping_factor` fraction of the
//! pending motion to the camera and decays the remainder, so motion eases
//! out over successive frames.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::core::Camera;
use crate::options::CameraOptions;

/// Polar angle margin that keeps the camera off the poles.
const POLE_EPSILON: f32 = 1e-6;
/// Pending motion below this is treated as settled.
const SETTLE_EPSILON: f32 = 1e-6;
/// Closest allowed orbit radius.
const MIN_DISTANCE: f32 = 0.05;

/// Orbit camera controls around a target point.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// When false, input is ignored and `update` does nothing.
    pub enabled: bool,
    target: Vec3,
    damping_factor: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    max_distance: f32,

    theta_delta: f32,
    phi_delta: f32,
    pan_offset: Vec3,
    zoom_scale: f32,

    saved_target: Vec3,
    saved_eye: Vec3,
}

impl OrbitControls {
    /// Controls targeting the origin with speeds from `options`.
    #[must_use]
    pub fn new(options: &CameraOptions) -> Self {
        Self {
            enabled: true,
            target: Vec3::ZERO,
            damping_factor: options.damping_factor.clamp(0.0, 1.0),
            rotate_speed: options.rotate_speed,
            pan_speed: options.pan_speed,
            zoom_speed: options.zoom_speed,
            max_distance: options.zfar * 0.9,
            theta_delta: 0.0,
            phi_delta: 0.0,
            pan_offset: Vec3::ZERO,
            zoom_scale: 1.0,
            saved_target: Vec3::ZERO,
            saved_eye: super::core::INITIAL_EYE,
        }
    }

    /// Current orbit target.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Move the orbit target without changing pending motion.
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Queue a rotation from a pointer drag in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        if !self.enabled {
            return;
        }
        self.theta_delta -= delta.x * self.rotate_speed;
        self.phi_delta -= delta.y * self.rotate_speed;
    }

    /// Queue a pan from a pointer drag in pixels. Pan distance scales with
    /// the current orbit radius.
    pub fn pan(&mut self, delta: Vec2, camera: &Camera) {
        if !self.enabled {
            return;
        }
        let forward = (camera.target - camera.eye).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let scale = camera.distance() * self.pan_speed;
        self.pan_offset += (right * -delta.x + up * delta.y) * scale;
    }

    /// Queue a zoom step. Positive values move the camera closer.
    pub fn zoom(&mut self, amount: f32) {
        if !self.enabled {
            return;
        }
        self.zoom_scale *= (1.0 - amount * self.zoom_speed).max(0.1);
    }

    /// Whether motion is still pending.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.theta_delta.abs() > SETTLE_EPSILON
            || self.phi_delta.abs() > SETTLE_EPSILON
            || self.pan_offset.length_squared() > SETTLE_EPSILON
            || (self.zoom_scale - 1.0).abs() > SETTLE_EPSILON
    }

    /// Apply one damped step of pending motion to `camera`. Returns whether
    /// the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if !self.enabled {
            return false;
        }
        let before = camera.eye;
        let damping = self.damping_factor;

        let offset = camera.eye - self.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI * 0.5
        };

        theta += self.theta_delta * damping;
        phi = (phi + self.phi_delta * damping).clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let radius = (radius * self.zoom_scale).clamp(MIN_DISTANCE, self.max_distance);
        self.target += self.pan_offset * damping;

        let sin_phi = phi.sin();
        let offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.eye = self.target + offset;
        camera.target = self.target;
        camera.up = Vec3::Y;

        self.theta_delta *= 1.0 - damping;
        self.phi_delta *= 1.0 - damping;
        self.pan_offset *= 1.0 - damping;
        self.zoom_scale = 1.0;

        camera.eye.distance_squared(before) > SETTLE_EPSILON * SETTLE_EPSILON
    }

    /// Remember the camera placement restored by [`Self::reset`].
    pub fn save_state(&mut self, camera: &Camera) {
        self.saved_target = self.target;
        self.saved_eye = camera.eye;
    }

    /// Drop pending motion and restore the saved placement.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.zoom_scale = 1.0;
        self.target = self.saved_target;
        camera.eye = self.saved_eye;
        camera.target = self.saved_target;
        camera.up = Vec3::Y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (OrbitControls, Camera) {
        let options = CameraOptions::default();
        (OrbitControls::new(&options), Camera::from_options(&options, 1.0))
    }

    #[test]
    fn damping_eases_rotation_out() {
        let (mut controls, mut camera) = setup();
        controls.rotate(Vec2::new(100.0, 0.0));
        assert!(controls.update(&mut camera));
        let first = camera.eye;
        assert!(controls.is_moving());

        let mut steps = 0;
        while controls.update(&mut camera) && steps < 1000 {
            steps += 1;
        }
        assert!(steps > 10);
        assert!(camera.eye != first);
        // Orbit radius is preserved by rotation.
        assert!((camera.distance() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn settles_when_idle() {
        let (mut controls, mut camera) = setup();
        assert!(!controls.update(&mut camera));
        assert!(!controls.is_moving());
        assert!((camera.eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let (mut controls, mut camera) = setup();
        controls.enabled = false;
        controls.rotate(Vec2::new(50.0, 50.0));
        controls.zoom(3.0);
        assert!(!controls.update(&mut camera));
        controls.enabled = true;
        assert!(!controls.is_moving());
    }

    #[test]
    fn zoom_changes_distance() {
        let (mut controls, mut camera) = setup();
        controls.zoom(2.0);
        let _ = controls.update(&mut camera);
        assert!(camera.distance() < 5.0);
    }

    #[test]
    fn reset_restores_saved_state() {
        let (mut controls, mut camera) = setup();
        camera.eye = Vec3::new(3.0, 1.8, 3.0);
        controls.save_state(&camera);
        controls.rotate(Vec2::new(10.0, 10.0));
        controls.pan(Vec2::new(5.0, 0.0), &camera);
        let _ = controls.update(&mut camera);
        controls.reset(&mut camera);
        assert_eq!(camera.eye, Vec3::new(3.0, 1.8, 3.0));
        assert_eq!(controls.target(), Vec3::ZERO);
        assert!(!controls.is_moving());
    }

    #[test]
    fn pan_moves_target() {
        let (mut controls, mut camera) = setup();
        controls.pan(Vec2::new(100.0, 0.0), &camera);
        let _ = controls.update(&mut camera);
        assert!(controls.target().x < 0.0);
        assert_eq!(camera.target, controls.target());
    }
}
