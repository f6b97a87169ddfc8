use glyphfield_scene::PerspectiveCamera;

/// Drawable area in logical pixels plus the pixel ratio used for the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

impl Viewport {
    /// Upper bound on the pixel ratio. Denser displays render at this ratio.
    pub const MAX_PIXEL_RATIO: f32 = 2.0;

    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let mut viewport = Self {
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
        };
        viewport.resize(width, height, device_pixel_ratio);
        viewport
    }

    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) {
        self.width = width;
        self.height = height;
        self.pixel_ratio = clamp_pixel_ratio(device_pixel_ratio);
        tracing::debug!(
            width,
            height,
            pixel_ratio = self.pixel_ratio,
            "viewport resized"
        );
    }

    /// Logical size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Width over height. A zero height counts as one pixel.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Surface size in physical pixels, never zero.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    /// Whether there is anything to draw into.
    pub fn is_visible(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Match the camera's aspect to this viewport and rebuild its projection.
    pub fn apply_to(&self, camera: &mut PerspectiveCamera) {
        camera.set_aspect(self.aspect());
        camera.update_projection();
    }
}

fn clamp_pixel_ratio(dpr: f64) -> f32 {
    if dpr.is_finite() && dpr > 0.0 {
        (dpr as f32).min(Viewport::MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}
