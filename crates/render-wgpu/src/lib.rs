//! wgpu render backend for the demo.
//!
//! Draws every scene mesh with the matcap shader. Meshes that share geometry
//! and material are drawn as one instanced call.
//!
//! # Invariants
//! - Renderer never mutates the scene.
//! - GPU buffers are uploaded once per shared geometry and material.

mod gpu;
mod shaders;
mod surface;

pub use gpu::{FrameReport, WgpuRenderer};
pub use surface::acquire_frame;
