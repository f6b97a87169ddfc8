//! Shared types for the glyphfield workspace.

mod types;

pub use types::{Aabb, Transform};
