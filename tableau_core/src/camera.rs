//! Perspective camera and the interactive controller that moves it.
//!
//! The controller never repaints by itself. Input events only queue motion;
//! `update` (called once per scheduler tick) applies a damped share of it and
//! reports whether the camera moved, which is the stage's cue to repaint.

use crate::config::CameraConfig;
use nalgebra::{Isometry3, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3};

/// Motion below this is treated as no motion.
const EPS: f64 = 1e-6;

/// Perspective camera looking at `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
    pub up: Vector3<f64>,

    /// Vertical field of view (degrees)
    pub fov_deg: f64,

    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    /// Camera on +z at `config.distance`, looking at the origin.
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, config.distance),
            target: Vector3::zeros(),
            up: Vector3::y(),
            fov_deg: config.fov_deg,
            aspect: aspect_ratio(width, height),
            near: config.near,
            far: config.far,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Offset from the target to the camera.
    pub fn eye(&self) -> Vector3<f64> {
        self.position - self.target
    }

    pub fn distance(&self) -> f64 {
        self.eye().norm()
    }

    pub fn view(&self) -> Isometry3<f64> {
        Isometry3::look_at_rh(
            &Point3::from(self.position),
            &Point3::from(self.target),
            &self.up,
        )
    }

    pub fn projection(&self) -> Perspective3<f64> {
        Perspective3::new(self.aspect, self.fov_deg.to_radians(), self.near, self.far)
    }

    /// Normalized device coordinates of a world point, `None` if behind the camera.
    pub fn project(&self, world: &Vector3<f64>) -> Option<Point3<f64>> {
        let view_point = self.view() * Point3::from(*world);
        if view_point.z >= 0.0 {
            return None;
        }
        Some(self.projection().project_point(&view_point))
    }
}

/// Zero-sized viewports (minimized windows) count as one pixel per side.
fn aspect_ratio(width: u32, height: u32) -> f64 {
    width.max(1) as f64 / height.max(1) as f64
}

/// Raw pointer / wheel motion forwarded from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    /// Drag in normalized screen units
    Rotate { dx: f64, dy: f64 },

    /// Positive zooms in
    Zoom { delta: f64 },

    Pan { dx: f64, dy: f64 },
}

/// Interactive camera controller advanced once per scheduler tick.
pub trait CameraController: Send {
    /// Queues motion from an input event.
    fn handle_input(&mut self, input: ControlInput);

    /// Applies queued motion with damping. Returns true when the camera moved.
    fn update(&mut self, camera: &mut Camera) -> bool;
}

/// Trackball-style controller with inertia.
///
/// Every update applies the pending motion and keeps `1 - damping` of it
/// for the next tick, so a flick keeps turning the camera for a few frames.
#[derive(Debug, Clone)]
pub struct DampedOrbitController {
    rotate_speed: f64,
    zoom_speed: f64,
    pan_speed: f64,
    damping: f64,
    min_distance: f64,
    max_distance: f64,

    pending_rotate: Vector2<f64>,
    pending_zoom: f64,
    pending_pan: Vector2<f64>,
}

impl DampedOrbitController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            damping: config.damping,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            pending_rotate: Vector2::zeros(),
            pending_zoom: 0.0,
            pending_pan: Vector2::zeros(),
        }
    }

    /// True while queued motion remains.
    pub fn is_moving(&self) -> bool {
        self.pending_rotate.norm() > EPS || self.pending_zoom.abs() > EPS || self.pending_pan.norm() > EPS
    }

    fn rotate(&self, camera: &mut Camera, eye: &mut Vector3<f64>) {
        let up = camera.up.normalize();
        let sideways = up.cross(eye).normalize();
        let direction = sideways * self.pending_rotate.x + up * self.pending_rotate.y;
        let angle = self.pending_rotate.norm() * self.rotate_speed;

        if let Some(axis) = Unit::try_new(direction.cross(eye), EPS) {
            let rotation = UnitQuaternion::from_axis_angle(&axis, angle);
            *eye = rotation * *eye;
            camera.up = rotation * camera.up;
        }
    }

    fn pan(&self, camera: &mut Camera, eye: &Vector3<f64>) {
        let up = camera.up.normalize();
        let sideways = up.cross(eye).normalize();
        let offset = (sideways * self.pending_pan.x + up * self.pending_pan.y) * eye.norm() * self.pan_speed;
        camera.target += offset;
    }
}

impl CameraController for DampedOrbitController {
    fn handle_input(&mut self, input: ControlInput) {
        match input {
            ControlInput::Rotate { dx, dy } => self.pending_rotate += Vector2::new(dx, dy),
            ControlInput::Zoom { delta } => self.pending_zoom += delta,
            ControlInput::Pan { dx, dy } => self.pending_pan += Vector2::new(dx, dy),
        }
    }

    fn update(&mut self, camera: &mut Camera) -> bool {
        if !self.is_moving() {
            return false;
        }

        let before = camera.position;
        let mut eye = camera.eye();
        if eye.norm() < EPS {
            // No direction to orbit around; back off along +z
            eye = Vector3::z() * self.min_distance;
        }
        let keep = 1.0 - self.damping;

        if self.pending_rotate.norm() > EPS {
            self.rotate(camera, &mut eye);
            self.pending_rotate *= keep;
        } else {
            self.pending_rotate = Vector2::zeros();
        }

        if self.pending_zoom.abs() > EPS {
            eye *= (-self.pending_zoom * self.zoom_speed).exp();
            self.pending_zoom *= keep;
        } else {
            self.pending_zoom = 0.0;
        }

        if self.pending_pan.norm() > EPS {
            self.pan(camera, &eye);
            self.pending_pan *= keep;
        } else {
            self.pending_pan = Vector2::zeros();
        }

        let distance = eye.norm();
        if distance > self.max_distance {
            eye *= self.max_distance / distance;
        } else if distance < self.min_distance {
            eye *= self.min_distance / distance;
        }

        camera.position = camera.target + eye;
        (camera.position - before).norm_squared() > EPS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn setup() -> (Camera, DampedOrbitController) {
        let config = CameraConfig::default();
        (Camera::new(&config, 1600, 900), DampedOrbitController::new(&config))
    }

    #[test]
    fn test_camera_defaults() {
        let (camera, _) = setup();
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, 3000.0));
        assert_relative_eq!(camera.aspect, 16.0 / 9.0);
        assert_relative_eq!(camera.distance(), 3000.0);
    }

    #[test]
    fn test_zero_height_viewport() {
        let (mut camera, _) = setup();
        camera.set_viewport(800, 0);
        assert_eq!(camera.aspect, 800.0);
    }

    #[test]
    fn test_zero_width_viewport_still_projects() {
        let (mut camera, _) = setup();
        camera.set_viewport(0, 720);
        assert!(camera.aspect > 0.0);

        let ndc = camera.project(&Vector3::zeros()).unwrap();
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zoom_from_target_recovers() {
        let (mut camera, mut controller) = setup();
        camera.position = camera.target;
        controller.handle_input(ControlInput::Zoom { delta: 0.1 });

        assert!(controller.update(&mut camera));
        assert!(camera.position.iter().all(|v| v.is_finite()));
        assert_relative_eq!(camera.distance(), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_project_origin_to_center() {
        let (camera, _) = setup();
        let ndc = camera.project(&Vector3::zeros()).unwrap();
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-9);
        assert!(camera.project(&Vector3::new(0.0, 0.0, 4000.0)).is_none());
    }

    #[test]
    fn test_idle_controller_reports_no_change() {
        let (mut camera, mut controller) = setup();
        assert!(!controller.update(&mut camera));
        assert_eq!(camera.position, Vector3::new(0.0, 0.0, 3000.0));
    }

    #[test]
    fn test_rotation_keeps_distance() {
        let (mut camera, mut controller) = setup();
        controller.handle_input(ControlInput::Rotate { dx: 0.1, dy: 0.05 });

        assert!(controller.update(&mut camera));
        assert_relative_eq!(camera.distance(), 3000.0, epsilon = 1e-6);
        assert!(camera.position.x.abs() > 1.0);
    }

    #[test]
    fn test_zoom_clamped_to_min_distance() {
        let (mut camera, mut controller) = setup();
        for _ in 0..50 {
            controller.handle_input(ControlInput::Zoom { delta: 0.5 });
            controller.update(&mut camera);
        }
        assert_relative_eq!(camera.distance(), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pan_moves_target() {
        let (mut camera, mut controller) = setup();
        controller.handle_input(ControlInput::Pan { dx: 0.0, dy: 0.1 });
        assert!(controller.update(&mut camera));
        assert!(camera.target.y > 0.0);
        assert_relative_eq!(camera.distance(), 3000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inertia_decays() {
        let (mut camera, mut controller) = setup();
        controller.handle_input(ControlInput::Rotate { dx: 0.2, dy: 0.0 });

        let mut moving_ticks = 0;
        while controller.update(&mut camera) {
            moving_ticks += 1;
            assert!(moving_ticks < 1000, "controller never settled");
        }

        assert!(moving_ticks > 1);
        assert!(!controller.is_moving());
    }
}
