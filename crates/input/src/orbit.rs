use crate::{Action, InputError};
use glam::{Vec2, Vec3};
use glyphfield_scene::PerspectiveCamera;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Minimum squared camera displacement that counts as movement.
const MOVE_EPSILON: f32 = 1e-6;
/// Keeps the polar angle off the poles, where the view basis degenerates.
const POLE_EPSILON: f32 = 1e-3;

/// Anything that moves the camera once per frame.
pub trait Controls {
    /// Advance one frame. Returns whether the camera moved.
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool;
}

/// Orbit the camera around a target point, with optional damping.
///
/// Gestures accumulate a pending rotation, pan and dolly. Each
/// [`update`](Controls::update) applies `damping_factor` of what is pending
/// and keeps the rest, so the camera glides to a stop. Without damping the
/// whole pending motion is applied at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits, in radians from +y.
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    /// Height of the viewport in logical pixels. Drag deltas are relative to it.
    pub viewport_height: f32,

    #[serde(skip)]
    pending_theta: f32,
    #[serde(skip)]
    pending_phi: f32,
    #[serde(skip)]
    pending_pan: Vec3,
    #[serde(skip)]
    pending_scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            viewport_height: 1.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vec3::ZERO,
            pending_scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Controls orbiting whatever `camera` currently looks at.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        Self {
            target: camera.target,
            ..Self::default()
        }
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if height.is_finite() && height > 0.0 {
            self.viewport_height = height;
        }
    }

    /// Check the configured limits. Limits are also ordered at update time,
    /// so this only reports them.
    pub fn validate(&self) -> Result<(), InputError> {
        let polar = self.min_polar_angle <= self.max_polar_angle;
        let distance = self.min_distance >= 0.0 && self.min_distance <= self.max_distance;
        let factor = (0.0..=1.0).contains(&self.damping_factor);
        if polar && distance && factor {
            return Ok(());
        }
        Err(InputError::InvalidLimits(format!(
            "polar {}..{}, distance {}..{}, damping {}",
            self.min_polar_angle,
            self.max_polar_angle,
            self.min_distance,
            self.max_distance,
            self.damping_factor
        )))
    }

    /// Polar range inside the poles. NaN limits fall back to the poles.
    fn polar_range(&self) -> (f32, f32) {
        let lo = self.min_polar_angle.max(POLE_EPSILON).min(PI - POLE_EPSILON);
        let hi = self.max_polar_angle.min(PI - POLE_EPSILON).max(lo);
        (lo, hi)
    }

    /// Distance range. NaN limits mean unbounded.
    fn distance_range(&self) -> (f32, f32) {
        let lo = self.min_distance.max(0.0);
        let hi = if self.max_distance.is_nan() {
            f32::INFINITY
        } else {
            self.max_distance.max(lo)
        };
        (lo, hi)
    }

    /// Queue a gesture. Nothing moves until the next update.
    pub fn handle(&mut self, action: Action, camera: &PerspectiveCamera) {
        match action {
            Action::Rotate(delta) => self.rotate(delta),
            Action::Pan(delta) => self.pan(delta, camera),
            Action::Dolly(steps) => self.dolly(steps),
        }
    }

    /// Whether any queued motion is still above the movement threshold.
    pub fn is_settled(&self) -> bool {
        self.pending_theta.abs() < MOVE_EPSILON
            && self.pending_phi.abs() < MOVE_EPSILON
            && self.pending_pan.length_squared() < MOVE_EPSILON
            && self.pending_scale == 1.0
    }

    fn rotate(&mut self, delta: Vec2) {
        let h = self.viewport_height;
        self.pending_theta -= TAU * delta.x / h * self.rotate_speed;
        self.pending_phi -= TAU * delta.y / h * self.rotate_speed;
    }

    fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera) {
        // Scale pixels so the target plane moves with the pointer.
        let distance = (camera.position - self.target).length() * (camera.fov * 0.5).tan();
        let per_pixel = 2.0 * distance / self.viewport_height * self.pan_speed;
        let right = camera.right();
        let up = right.cross(camera.forward());
        self.pending_pan += -right * delta.x * per_pixel + up * delta.y * per_pixel;
    }

    fn dolly(&mut self, steps: f32) {
        // Positive steps move closer.
        self.pending_scale *= 0.95_f32.powf(self.zoom_speed * steps);
    }
}

impl Controls for OrbitControls {
    fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let f = if self.enable_damping {
            self.damping_factor.clamp(0.0, 1.0)
        } else {
            1.0
        };

        theta += self.pending_theta * f;
        phi += self.pending_phi * f;
        let (min_phi, max_phi) = self.polar_range();
        phi = phi.clamp(min_phi, max_phi);
        let (min_radius, max_radius) = self.distance_range();
        let radius = (radius * self.pending_scale).clamp(min_radius, max_radius);
        self.target += self.pending_pan * f;

        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let position = self.target + offset;

        if self.enable_damping {
            self.pending_theta *= 1.0 - f;
            self.pending_phi *= 1.0 - f;
            self.pending_pan *= 1.0 - f;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_pan = Vec3::ZERO;
        }
        self.pending_scale = 1.0;

        let moved = position.distance_squared(camera.position) > MOVE_EPSILON
            || self.target.distance_squared(camera.target) > MOVE_EPSILON;
        camera.position = position;
        camera.look_at(self.target);
        if moved {
            tracing::trace!(position = ?camera.position, target = ?self.target, "camera moved");
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(damping: bool) -> (OrbitControls, PerspectiveCamera) {
        let camera = PerspectiveCamera::default();
        let mut controls = OrbitControls::new(&camera);
        controls.enable_damping = damping;
        controls.set_viewport_height(800.0);
        (controls, camera)
    }

    fn azimuth(camera: &PerspectiveCamera) -> f32 {
        let o = camera.position - camera.target;
        o.x.atan2(o.z)
    }

    #[test]
    fn idle_update_does_not_move() {
        let (mut controls, mut camera) = setup(true);
        let before = camera.position;
        assert!(!controls.update(&mut camera));
        assert!(camera.position.distance(before) < 1e-5);
        assert!(controls.is_settled());
    }

    #[test]
    fn undamped_rotate_applies_at_once() {
        let (mut controls, mut camera) = setup(false);
        let start = azimuth(&camera);
        let distance = camera.distance();
        // a quarter of the viewport height is a quarter turn
        controls.handle(Action::Rotate(Vec2::new(200.0, 0.0)), &camera);
        assert!(controls.update(&mut camera));

        let turned = start - azimuth(&camera);
        assert!((turned.rem_euclid(TAU) - PI / 2.0).abs() < 1e-4);
        assert!((camera.distance() - distance).abs() < 1e-4);
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn damping_glides_to_the_full_rotation() {
        let (mut controls, mut camera) = setup(true);
        let start = azimuth(&camera);
        controls.handle(Action::Rotate(Vec2::new(200.0, 0.0)), &camera);

        assert!(controls.update(&mut camera));
        let first = (start - azimuth(&camera)).rem_euclid(TAU);
        assert!((first - PI / 2.0 * 0.05).abs() < 1e-4);

        // keeps moving with no new input
        assert!(controls.update(&mut camera));
        for _ in 0..500 {
            controls.update(&mut camera);
        }
        let total = (start - azimuth(&camera)).rem_euclid(TAU);
        assert!((total - PI / 2.0).abs() < 1e-3);
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn polar_angle_is_clamped() {
        let (mut controls, mut camera) = setup(false);
        controls.handle(Action::Rotate(Vec2::new(0.0, 10_000.0)), &camera);
        controls.update(&mut camera);
        let offset = camera.position - camera.target;
        assert!(!offset.is_nan());
        assert!(offset.y > camera.distance() * 0.99);
        assert!(Vec2::new(offset.x, offset.z).length() > 0.0);
    }

    #[test]
    fn dolly_moves_closer_within_limits() {
        let (mut controls, mut camera) = setup(false);
        let distance = camera.distance();
        controls.handle(Action::Dolly(1.0), &camera);
        controls.update(&mut camera);
        assert!((camera.distance() - distance * 0.95).abs() < 1e-4);

        controls.min_distance = 1.0;
        controls.handle(Action::Dolly(100.0), &camera);
        controls.update(&mut camera);
        assert!((camera.distance() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_target_and_camera_together() {
        let (mut controls, mut camera) = setup(false);
        let offset = camera.position - camera.target;
        controls.handle(Action::Pan(Vec2::new(50.0, 0.0)), &camera);
        assert!(controls.update(&mut camera));

        assert_ne!(controls.target, Vec3::ZERO);
        assert_eq!(camera.target, controls.target);
        assert!((camera.position - camera.target - offset).length() < 1e-4);
        // dragging right slides the target to the camera's left
        assert!(controls.target.dot(camera.right()) < 0.0);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let json = r#"{ "enable_damping": false }"#;
        let controls: OrbitControls = serde_json::from_str(json).unwrap();
        assert!(!controls.enable_damping);
        assert_eq!(controls.damping_factor, 0.05);
        assert!(controls.is_settled());
    }

    #[test]
    fn inverted_limits_do_not_panic() {
        for json in [
            r#"{ "min_distance": 10, "max_distance": 5 }"#,
            r#"{ "min_polar_angle": 2, "max_polar_angle": 1 }"#,
        ] {
            let mut controls: OrbitControls = serde_json::from_str(json).unwrap();
            assert!(controls.validate().is_err());

            let mut camera = PerspectiveCamera::default();
            controls.handle(Action::Rotate(Vec2::new(30.0, 30.0)), &camera);
            controls.update(&mut camera);
            assert!(!camera.position.is_nan());
        }
    }

    #[test]
    fn inverted_distance_pins_to_the_minimum() {
        let (mut controls, mut camera) = setup(false);
        controls.min_distance = 10.0;
        controls.max_distance = 5.0;
        controls.update(&mut camera);
        assert!((camera.distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn nan_limits_fall_back_to_defaults() {
        let (mut controls, mut camera) = setup(false);
        let distance = camera.distance();
        controls.min_polar_angle = f32::NAN;
        controls.max_distance = f32::NAN;
        controls.update(&mut camera);
        assert!((camera.distance() - distance).abs() < 1e-4);
        assert!(OrbitControls::default().validate().is_ok());
    }
}
