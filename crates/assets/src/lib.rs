//! Asset loading for the demo: typeface fonts and matcap textures.
//!
//! Loads run on a background thread and hand their result back through a
//! [`LoadHandle`], which can be awaited or polled once per frame.
//!
//! # Invariants
//! - A handle yields its result exactly once.
//! - Parsed assets are immutable; consumers share them by reference.

mod font;
mod loader;
mod texture;

use std::path::PathBuf;

pub use font::{Font, FontBounds, Glyph, OutlineCommand};
pub use loader::{LoadHandle, load_font, load_texture};
pub use texture::MatcapTexture;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("malformed outline for glyph {glyph:?}: {message}")]
    Outline { glyph: char, message: String },
    #[error("invalid font: {0}")]
    InvalidFont(String),
    #[error("loader for {0} exited without a result")]
    LoaderGone(PathBuf),
    #[error("load result for {0} was already taken")]
    Consumed(PathBuf),
}
