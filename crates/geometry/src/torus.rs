use crate::{Geometry, GeometryError};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Torus lying in the xy plane, centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorusParams {
    /// Distance from the center to the middle of the tube.
    pub radius: f32,
    pub tube: f32,
    /// Segments around the tube cross-section.
    pub radial_segments: u32,
    /// Segments around the ring.
    pub tubular_segments: u32,
    /// Sweep of the ring in radians.
    pub arc: f32,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius: 0.3,
            tube: 0.2,
            radial_segments: 20,
            tubular_segments: 45,
            arc: TAU,
        }
    }
}

pub fn torus(params: &TorusParams) -> Result<Geometry, GeometryError> {
    if !(params.radius.is_finite() && params.tube.is_finite() && params.arc.is_finite()) {
        return Err(GeometryError::InvalidParams("torus parameters must be finite".into()));
    }
    if params.radial_segments < 2 || params.tubular_segments < 3 {
        return Err(GeometryError::InvalidParams(format!(
            "torus needs at least 2 radial and 3 tubular segments, got {} and {}",
            params.radial_segments, params.tubular_segments
        )));
    }

    let radial = params.radial_segments;
    let tubular = params.tubular_segments;
    let mut geometry = Geometry::with_capacity(
        ((radial + 1) * (tubular + 1)) as usize,
        (radial * tubular * 6) as usize,
    );

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * params.arc;
            let ring = params.radius + params.tube * v.cos();
            let position = Vec3::new(ring * u.cos(), ring * u.sin(), params.tube * v.sin());
            let center = Vec3::new(params.radius * u.cos(), params.radius * u.sin(), 0.0);
            let normal = (position - center).normalize_or_zero();
            let uv = Vec2::new(i as f32 / tubular as f32, j as f32 / radial as f32);
            geometry.push_vertex(position, normal, uv);
        }
    }

    let row = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = row * j + i - 1;
            let b = row * (j - 1) + i - 1;
            let c = row * (j - 1) + i;
            let d = row * j + i;
            geometry.push_triangle(a, b, d);
            geometry.push_triangle(b, c, d);
        }
    }

    Ok(geometry)
}
