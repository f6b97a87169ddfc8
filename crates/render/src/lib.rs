//! Rendering Adapter: renderer-agnostic interface, viewport sizing and the
//! frame loop that drives controls and rendering.
//!
//! # Invariants
//! - A renderer reads the scene and camera; it never mutates them.
//! - Each frame updates the controls exactly once, then renders exactly once.
//! - A stopped loop renders nothing further.

mod frame_loop;
mod renderer;
mod viewport;

pub use frame_loop::{FrameOutcome, FrameStats, RenderLoop, StopToken};
pub use renderer::{DebugTextRenderer, Renderer};
pub use viewport::Viewport;

/// Errors from presenting a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface lost or outdated")]
    SurfaceLost,
    #[error("surface timed out")]
    Timeout,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("device request failed: {0}")]
    Device(String),
    #[error("surface error: {0}")]
    Surface(String),
}
