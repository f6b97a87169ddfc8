use crate::AssetError;
use glam::Vec3;
use std::path::Path;

/// A lit-sphere texture sampled by view-space normal. Stored as tightly
/// packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MatcapTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl MatcapTexture {
    /// Decode an encoded image (PNG) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::decode(&bytes)
    }

    /// Procedural grey-clay matcap used when the texture file cannot be loaded.
    pub fn fallback(size: u32) -> Self {
        let size = size.max(1);
        let light = Vec3::new(-0.4, 0.6, 0.7).normalize();
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                // Map the pixel to [-1, 1], with +y pointing up.
                let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let v = 1.0 - (y as f32 + 0.5) / size as f32 * 2.0;
                let r2 = (u * u + v * v).min(1.0);
                let normal = Vec3::new(u, v, (1.0 - r2).sqrt()).normalize_or_zero();

                let diffuse = normal.dot(light).max(0.0);
                let rim = (1.0 - normal.z).powi(3) * 0.25;
                let shade = (0.18 + 0.72 * diffuse + rim).clamp(0.0, 1.0);
                let c = (shade * 255.0).round() as u8;
                rgba.extend_from_slice(&[c, c, (c as f32 * 0.95) as u8, 255]);
            }
        }

        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    /// Pixel at integer coordinates, clamped to the edges.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.rgba[i],
            self.rgba[i + 1],
            self.rgba[i + 2],
            self.rgba[i + 3],
        ]
    }
}
