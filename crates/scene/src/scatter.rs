use crate::{MatcapMaterial, Mesh, MeshId, Scene, SceneError};
use glam::Vec3;
use glyphfield_common::Transform;
use glyphfield_geometry::Geometry;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Instant;

/// Ranges for randomly placed instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterParams {
    pub count: usize,
    /// Positions are drawn from [-half_extent, half_extent] on each axis.
    pub half_extent: f32,
    /// Rotations are drawn from [0, max_rotation] on each axis.
    pub max_rotation: f32,
    /// Uniform scale is drawn from [0, max_scale].
    pub max_scale: f32,
}

impl Default for ScatterParams {
    fn default() -> Self {
        Self {
            count: 200,
            half_extent: 5.0,
            max_rotation: PI,
            max_scale: 1.0,
        }
    }
}

impl ScatterParams {
    pub fn validate(&self) -> Result<(), SceneError> {
        // The sampled range width, up to 2 * half_extent, must stay finite too.
        let ok = [self.half_extent, self.max_rotation, self.max_scale]
            .iter()
            .all(|v| (2.0 * v).is_finite() && *v >= 0.0);
        if !ok {
            return Err(SceneError::InvalidScatter(format!(
                "ranges must be finite and non-negative: {self:?}"
            )));
        }
        Ok(())
    }

    /// Draw one transform.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Transform {
        let e = self.half_extent;
        let position = Vec3::new(
            rng.gen_range(-e..=e),
            rng.gen_range(-e..=e),
            rng.gen_range(-e..=e),
        );
        let rotation = Vec3::new(
            rng.gen_range(0.0..=self.max_rotation),
            rng.gen_range(0.0..=self.max_rotation),
            rng.gen_range(0.0..=self.max_rotation),
        );
        let scale = Vec3::splat(rng.gen_range(0.0..=self.max_scale));
        Transform {
            position,
            rotation,
            scale,
        }
    }
}

/// Append `params.count` meshes sharing `geometry` and `material`, each with
/// a random transform. Returns the new ids in insertion order.
pub fn populate_scatter<R: Rng + ?Sized>(
    scene: &mut Scene,
    geometry: &Arc<Geometry>,
    material: &Arc<MatcapMaterial>,
    params: &ScatterParams,
    rng: &mut R,
) -> Result<Vec<MeshId>, SceneError> {
    params.validate()?;
    let started = Instant::now();

    let ids = (0..params.count)
        .map(|i| {
            let mesh = Mesh::new(format!("torus-{i}"), geometry.clone(), material.clone())
                .with_transform(params.sample(rng));
            scene.add(mesh)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        count = ids.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "scatter populated"
    );
    Ok(ids)
}
