//! Mesh geometry for the demo: indexed triangle buffers, text extrusion
//! with bevels, and the torus primitive.
//!
//! # Invariants
//! - Every vertex has exactly one position, normal, and uv.
//! - Indices always reference existing vertices.
//! - Geometry is built once and not mutated after it is shared.

mod buffer;
mod extrude;
mod outline;
mod torus;

pub use buffer::Geometry;
pub use extrude::{TextGeometry, TextParams, build_text, extrude_contours};
pub use outline::{Contour, TextOutline, layout_text};
pub use torus::{TorusParams, torus};

/// Errors from geometry construction.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("cap tessellation failed: {0}")]
    Tessellation(String),
}

#[cfg(test)]
mod test_font {
    use glyphfield_assets::Font;

    /// "o" is a 700-unit square with a 300-unit square hole; "r" is the same
    /// shape with reversed winding; "c" has one quadratic edge.
    pub(crate) fn test_font() -> Font {
        Font::parse(
            r#"{
            "familyName": "Geometry Test",
            "resolution": 1000,
            "underlineThickness": 50,
            "boundingBox": { "xMin": 0, "xMax": 800, "yMin": -200, "yMax": 800 },
            "glyphs": {
                "o": { "ha": 800, "o": "m 0 0 l 700 0 l 700 700 l 0 700 l 0 0 m 200 200 l 200 500 l 500 500 l 500 200 l 200 200" },
                "r": { "ha": 800, "o": "m 0 0 l 0 700 l 700 700 l 700 0 l 0 0 m 200 200 l 500 200 l 500 500 l 200 500 l 200 200" },
                "c": { "ha": 600, "o": "m 0 0 l 500 0 q 500 500 600 250 l 0 500 l 0 0" },
                " ": { "ha": 300 }
            }
        }"#,
        )
        .expect("test font parses")
    }
}
