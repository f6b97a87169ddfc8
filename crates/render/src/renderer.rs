use glyphfield_scene::{PerspectiveCamera, Scene};
use std::fmt::Write;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads the scene and the camera, then produces output.
/// It never mutates either.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` as seen from `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Self::Output;
}

/// Text renderer for headless runs and tests.
///
/// Produces a human-readable summary of the scene and camera. With
/// `list_meshes`, every mesh transform is printed as well.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    pub list_meshes: bool,
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh_list(mut self) -> Self {
        self.list_meshes = true;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> String {
        self.frames += 1;
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame {} ===", self.frames);
        let _ = writeln!(out, "Meshes: {}", scene.len());
        let p = camera.position;
        let t = camera.target;
        let _ = writeln!(
            out,
            "Camera: eye=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2}) fov={:.0} aspect={:.3}",
            p.x,
            p.y,
            p.z,
            t.x,
            t.y,
            t.z,
            camera.fov.to_degrees(),
            camera.aspect()
        );

        for batch in scene.batches() {
            let _ = writeln!(
                out,
                "  batch material={} vertices={} triangles={} instances={}",
                batch.material.name,
                batch.geometry.vertex_count(),
                batch.geometry.triangle_count(),
                batch.models.len()
            );
        }

        if self.list_meshes {
            for mesh in scene.meshes() {
                let tr = &mesh.transform;
                let _ = writeln!(
                    out,
                    "  [{}] pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}) scale={:.2}",
                    mesh.name,
                    tr.position.x,
                    tr.position.y,
                    tr.position.z,
                    tr.rotation.x,
                    tr.rotation.y,
                    tr.rotation.z,
                    tr.scale.x
                );
            }
        }

        out
    }
}
