use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Perspective camera looking from `position` at `target`.
///
/// The projection matrix is cached; call [`update_projection`] after changing
/// `fov`, `aspect`, `near` or `far`.
///
/// [`update_projection`]: PerspectiveCamera::update_projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CameraSettings", into = "CameraSettings")]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    projection: Mat4,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        CameraSettings::default().into()
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::Z,
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: fov_degrees.to_radians(),
            near,
            far,
            aspect: sanitize_aspect(aspect),
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Set the aspect ratio. Takes effect on the next [`update_projection`].
    ///
    /// [`update_projection`]: PerspectiveCamera::update_projection
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = sanitize_aspect(aspect);
    }

    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or(Vec3::X)
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

/// Serialized camera parameters, with the field of view in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct CameraSettings {
    position: Vec3,
    target: Vec3,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(1.0, 1.0, 2.0),
            target: Vec3::ZERO,
            fov_degrees: 75.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl From<CameraSettings> for PerspectiveCamera {
    fn from(s: CameraSettings) -> Self {
        let mut camera = PerspectiveCamera::new(s.fov_degrees, s.aspect, s.near, s.far);
        camera.position = s.position;
        camera.target = s.target;
        camera
    }
}

impl From<PerspectiveCamera> for CameraSettings {
    fn from(c: PerspectiveCamera) -> Self {
        Self {
            position: c.position,
            target: c.target,
            fov_degrees: c.fov.to_degrees(),
            aspect: c.aspect,
            near: c.near,
            far: c.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera() {
        let cam = PerspectiveCamera::default();
        assert_eq!(cam.position, Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(cam.target, Vec3::ZERO);
        assert!((cam.fov.to_degrees() - 75.0).abs() < 1e-4);
        assert_eq!(cam.near, 0.1);
        assert_eq!(cam.far, 100.0);
        assert!(!cam.view_projection().is_nan());
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cam = PerspectiveCamera::default();
        let clip = cam.view_projection() * cam.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn aspect_applies_on_update() {
        let mut cam = PerspectiveCamera::default();
        let before = cam.projection_matrix();
        cam.set_aspect(2.0);
        assert_eq!(cam.projection_matrix(), before);
        cam.update_projection();
        assert_eq!(
            cam.projection_matrix(),
            Mat4::perspective_rh(cam.fov, 2.0, cam.near, cam.far)
        );
    }

    #[test]
    fn invalid_aspect_is_ignored() {
        let mut cam = PerspectiveCamera::default();
        cam.set_aspect(0.0);
        assert_eq!(cam.aspect(), 1.0);
        cam.set_aspect(f32::NAN);
        assert_eq!(cam.aspect(), 1.0);
    }

    #[test]
    fn settings_round_trip_through_json() {
        let json = r#"{ "position": [0.0, 0.0, 5.0], "fov_degrees": 60.0 }"#;
        let cam: PerspectiveCamera = serde_json::from_str(json).unwrap();
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 5.0));
        assert!((cam.fov.to_degrees() - 60.0).abs() < 1e-4);
        assert_eq!(cam.far, 100.0);
    }
}
