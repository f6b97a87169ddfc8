use crate::AssetError;
use glam::Vec2;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One drawing command of a glyph outline, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { ctrl: Vec2, to: Vec2 },
    CubicTo { ctrl1: Vec2, ctrl2: Vec2, to: Vec2 },
}

/// A single glyph: horizontal advance plus its outline commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub advance: f32,
    pub x_min: f32,
    pub x_max: f32,
    pub outline: Vec<OutlineCommand>,
}

/// Font-wide bounding box in font units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FontBounds {
    #[serde(rename = "xMin")]
    pub x_min: f32,
    #[serde(rename = "xMax")]
    pub x_max: f32,
    #[serde(rename = "yMin")]
    pub y_min: f32,
    #[serde(rename = "yMax")]
    pub y_max: f32,
}

/// A parsed typeface font. Outlines are parsed eagerly so malformed data
/// surfaces at load time instead of during geometry construction.
#[derive(Debug, Clone)]
pub struct Font {
    pub family_name: String,
    pub resolution: f32,
    pub bounds: FontBounds,
    pub underline_thickness: f32,
    glyphs: HashMap<char, Glyph>,
}

#[derive(Deserialize)]
struct TypefaceJson {
    glyphs: BTreeMap<String, GlyphJson>,
    #[serde(rename = "familyName", default)]
    family_name: String,
    resolution: f32,
    #[serde(rename = "boundingBox")]
    bounding_box: FontBounds,
    #[serde(rename = "underlineThickness", default)]
    underline_thickness: f32,
}

#[derive(Deserialize)]
struct GlyphJson {
    ha: f32,
    #[serde(default)]
    x_min: f32,
    #[serde(default)]
    x_max: f32,
    #[serde(default)]
    o: Option<String>,
}

impl Font {
    /// Parse a typeface JSON document.
    pub fn parse(json: &str) -> Result<Self, AssetError> {
        let raw: TypefaceJson = serde_json::from_str(json)?;
        if raw.resolution.is_nan() || raw.resolution <= 0.0 {
            return Err(AssetError::InvalidFont(format!(
                "resolution must be positive, got {}",
                raw.resolution
            )));
        }

        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, glyph) in raw.glyphs {
            let mut chars = key.chars();
            let ch = match (chars.next(), chars.next()) {
                (Some(ch), None) => ch,
                _ => {
                    tracing::warn!("skipping glyph with multi-character key {key:?}");
                    continue;
                }
            };
            let outline = match glyph.o.as_deref() {
                Some(o) => parse_outline(ch, o)?,
                None => Vec::new(),
            };
            glyphs.insert(
                ch,
                Glyph {
                    advance: glyph.ha,
                    x_min: glyph.x_min,
                    x_max: glyph.x_max,
                    outline,
                },
            );
        }

        tracing::debug!(
            family = %raw.family_name,
            glyphs = glyphs.len(),
            "parsed typeface font"
        );

        Ok(Self {
            family_name: raw.family_name,
            resolution: raw.resolution,
            bounds: raw.bounding_box,
            underline_thickness: raw.underline_thickness,
            glyphs,
        })
    }

    /// Read and parse a typeface JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&data)
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Distance between baselines in font units.
    pub fn line_height(&self) -> f32 {
        self.bounds.y_max - self.bounds.y_min + self.underline_thickness
    }
}

/// Parse the compact outline string: `m x y`, `l x y`, `q x y cx cy`,
/// `b x y c1x c1y c2x c2y`. Curve end points come before control points.
fn parse_outline(glyph: char, outline: &str) -> Result<Vec<OutlineCommand>, AssetError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    while let Some(op) = tokens.next() {
        let command = match op {
            "m" => OutlineCommand::MoveTo(next_point(&mut tokens, glyph, op)?),
            "l" => OutlineCommand::LineTo(next_point(&mut tokens, glyph, op)?),
            "q" => {
                let to = next_point(&mut tokens, glyph, op)?;
                let ctrl = next_point(&mut tokens, glyph, op)?;
                OutlineCommand::QuadTo { ctrl, to }
            }
            "b" => {
                let to = next_point(&mut tokens, glyph, op)?;
                let ctrl1 = next_point(&mut tokens, glyph, op)?;
                let ctrl2 = next_point(&mut tokens, glyph, op)?;
                OutlineCommand::CubicTo { ctrl1, ctrl2, to }
            }
            "z" => continue,
            other => {
                return Err(AssetError::Outline {
                    glyph,
                    message: format!("unknown command {other:?}"),
                });
            }
        };
        commands.push(command);
    }

    Ok(commands)
}

fn next_point(
    tokens: &mut std::str::SplitWhitespace<'_>,
    glyph: char,
    op: &str,
) -> Result<Vec2, AssetError> {
    let mut coord = || -> Result<f32, AssetError> {
        let token = tokens.next().ok_or_else(|| AssetError::Outline {
            glyph,
            message: format!("'{op}' is missing a coordinate"),
        })?;
        token.parse::<f32>().map_err(|_| AssetError::Outline {
            glyph,
            message: format!("'{op}' has non-numeric coordinate {token:?}"),
        })
    };
    let x = coord()?;
    let y = coord()?;
    Ok(Vec2::new(x, y))
}
