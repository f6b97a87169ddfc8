//! Scene: the meshes on screen, the camera that looks at them, and the
//! startup sequence that fills the scene once the font has loaded.
//!
//! # Invariants
//! - Meshes are only ever appended; a `MeshId` stays valid for the scene's lifetime.
//! - Geometry and materials are shared through `Arc` and are read-only once shared.
//! - The text mesh is built at most once, and only after the font load resolves.

mod camera;
mod material;
mod scatter;
#[allow(clippy::module_inception)]
mod scene;
mod setup;

pub use camera::PerspectiveCamera;
pub use material::MatcapMaterial;
pub use scatter::{ScatterParams, populate_scatter};
pub use scene::{Batch, Mesh, MeshId, Scene};
pub use setup::{DemoScene, FALLBACK_MATCAP_SIZE, SceneConfig, TextStatus, matcap_or_fallback};

/// Errors from scene construction.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("geometry error: {0}")]
    Geometry(#[from] glyphfield_geometry::GeometryError),
    #[error("invalid scatter parameters: {0}")]
    InvalidScatter(String),
}
