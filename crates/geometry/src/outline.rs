use glam::Vec2;
use glyphfield_assets::{Font, OutlineCommand};
use lyon_geom::{CubicBezierSegment, QuadraticBezierSegment, point};

const EPSILON: f32 = 1e-7;

/// A closed polygon. Solids wind counter-clockwise, holes clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Vec2>,
    pub hole: bool,
}

impl Contour {
    /// Signed area; positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f32 {
        signed_area(&self.points)
    }
}

/// Flattened outline of a laid-out string.
#[derive(Debug, Clone, Default)]
pub struct TextOutline {
    pub contours: Vec<Contour>,
    /// Characters that had no glyph in the font. They are drawn with the
    /// font's `?` glyph, or skipped when it has none.
    pub missing: Vec<char>,
}

/// Lay out `text` with `font` at `size` world units per em and flatten the
/// glyph outlines. Curves are sampled at `curve_segments` divisions.
pub fn layout_text(text: &str, font: &Font, size: f32, curve_segments: u32) -> TextOutline {
    let scale = size / font.resolution;
    let line_height = font.line_height() * scale;
    let divisions = curve_segments.max(1);

    let mut out = TextOutline::default();
    let mut cursor = Vec2::ZERO;

    for ch in text.chars() {
        if ch == '\n' {
            cursor.x = 0.0;
            cursor.y -= line_height;
            continue;
        }
        let glyph = match font.glyph(ch) {
            Some(glyph) => glyph,
            None => {
                tracing::warn!(
                    "character {ch:?} does not exist in font family {:?}",
                    font.family_name
                );
                out.missing.push(ch);
                match font.glyph('?') {
                    Some(glyph) => glyph,
                    None => continue,
                }
            }
        };

        let paths = flatten(&glyph.outline, scale, cursor, divisions);
        out.contours.extend(classify(paths));
        cursor.x += glyph.advance * scale;
    }

    out
}

fn flatten(commands: &[OutlineCommand], scale: f32, offset: Vec2, divisions: u32) -> Vec<Vec<Vec2>> {
    let place = |p: Vec2| p * scale + offset;
    let mut paths: Vec<Vec<Vec2>> = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();

    for command in commands {
        match *command {
            OutlineCommand::MoveTo(p) => {
                if !current.is_empty() {
                    paths.push(std::mem::take(&mut current));
                }
                current.push(place(p));
            }
            OutlineCommand::LineTo(p) => current.push(place(p)),
            OutlineCommand::QuadTo { ctrl, to } => {
                let Some(&from) = current.last() else { continue };
                let (c, t) = (place(ctrl), place(to));
                let seg = QuadraticBezierSegment {
                    from: point(from.x, from.y),
                    ctrl: point(c.x, c.y),
                    to: point(t.x, t.y),
                };
                for i in 1..=divisions {
                    let p = seg.sample(i as f32 / divisions as f32);
                    current.push(Vec2::new(p.x, p.y));
                }
            }
            OutlineCommand::CubicTo { ctrl1, ctrl2, to } => {
                let Some(&from) = current.last() else { continue };
                let (c1, c2, t) = (place(ctrl1), place(ctrl2), place(to));
                let seg = CubicBezierSegment {
                    from: point(from.x, from.y),
                    ctrl1: point(c1.x, c1.y),
                    ctrl2: point(c2.x, c2.y),
                    to: point(t.x, t.y),
                };
                for i in 1..=divisions {
                    let p = seg.sample(i as f32 / divisions as f32);
                    current.push(Vec2::new(p.x, p.y));
                }
            }
        }
    }
    if !current.is_empty() {
        paths.push(current);
    }

    paths.into_iter().filter_map(clean).collect()
}

/// Drop consecutive duplicates and the closing duplicate of the first point.
fn clean(points: Vec<Vec2>) -> Option<Vec<Vec2>> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_none_or(|last| last.distance_squared(p) > EPSILON) {
            out.push(p);
        }
    }
    while out.len() > 1 && out[0].distance_squared(out[out.len() - 1]) <= EPSILON {
        out.pop();
    }
    (out.len() >= 3 && signed_area(&out).abs() > EPSILON).then_some(out)
}

/// Within one glyph, contours winding like the largest contour are solids and
/// the rest are holes. Solids come out counter-clockwise, holes clockwise.
fn classify(paths: Vec<Vec<Vec2>>) -> Vec<Contour> {
    let Some(solid_sign) = paths
        .iter()
        .map(|p| signed_area(p))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .map(f32::signum)
    else {
        return Vec::new();
    };

    paths
        .into_iter()
        .map(|mut points| {
            let area = signed_area(&points);
            let hole = area.signum() != solid_sign;
            if (area > 0.0) == hole {
                points.reverse();
            }
            Contour { points, hole }
        })
        .collect()
}

pub(crate) fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_font::test_font;

    #[test]
    fn square_with_hole_is_classified() {
        let font = test_font();
        let outline = layout_text("o", &font, 1.0, 1);
        assert_eq!(outline.contours.len(), 2);

        let solid = &outline.contours[0];
        let hole = &outline.contours[1];
        assert!(!solid.hole);
        assert!(hole.hole);
        assert!(solid.signed_area() > 0.0);
        assert!(hole.signed_area() < 0.0);
        // closing duplicate removed
        assert_eq!(solid.points.len(), 4);
        assert!((solid.signed_area() - 0.49).abs() < 1e-5);
        assert!((hole.signed_area() + 0.09).abs() < 1e-5);
    }

    #[test]
    fn reversed_font_winding_still_finds_holes() {
        let font = test_font();
        // "r" is "o" drawn with the opposite winding convention.
        let outline = layout_text("r", &font, 1.0, 1);
        assert_eq!(outline.contours.len(), 2);
        assert!(!outline.contours[0].hole);
        assert!(outline.contours[0].signed_area() > 0.0);
        assert!(outline.contours[1].hole);
        assert!(outline.contours[1].signed_area() < 0.0);
    }

    #[test]
    fn advance_and_scale() {
        let font = test_font();
        let outline = layout_text("oo", &font, 0.5, 1);
        assert_eq!(outline.contours.len(), 4);
        let second = &outline.contours[2];
        let min_x = second.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        // advance 800 font units at 0.5 / 1000 scale
        assert!((min_x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn newline_moves_down_one_line() {
        let font = test_font();
        let outline = layout_text("o\no", &font, 1.0, 1);
        let second = &outline.contours[2];
        let min_x = second.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = second.points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        assert!(min_x.abs() < 1e-6);
        assert!((min_y + 1.05).abs() < 1e-6);
    }

    #[test]
    fn curve_segments_control_sampling() {
        let font = test_font();
        let coarse = layout_text("c", &font, 1.0, 1);
        let fine = layout_text("c", &font, 1.0, 8);
        // one quadratic: 1 sample vs 8 samples
        assert_eq!(fine.contours[0].points.len(), coarse.contours[0].points.len() + 7);
    }

    #[test]
    fn missing_glyphs_are_skipped_without_a_question_mark() {
        let font = test_font();
        let outline = layout_text("ox", &font, 1.0, 1);
        assert_eq!(outline.missing, vec!['x']);
        assert_eq!(outline.contours.len(), 2);
    }

    #[test]
    fn missing_glyphs_draw_the_question_mark() {
        let font = Font::parse(
            r#"{
            "familyName": "Fallback Test",
            "resolution": 1000,
            "underlineThickness": 50,
            "boundingBox": { "xMin": 0, "xMax": 800, "yMin": -200, "yMax": 800 },
            "glyphs": {
                "o": { "ha": 800, "o": "m 0 0 l 700 0 l 700 700 l 0 700 l 0 0" },
                "?": { "ha": 500, "o": "m 0 0 l 400 0 l 400 700 l 0 700 l 0 0" }
            }
        }"#,
        )
        .unwrap();
        let outline = layout_text("xo", &font, 1.0, 1);
        assert_eq!(outline.missing, vec!['x']);
        assert_eq!(outline.contours.len(), 2);
        // the stand-in advances the cursor by its own width
        let min_x = outline.contours[1]
            .points
            .iter()
            .map(|p| p.x)
            .fold(f32::INFINITY, f32::min);
        assert!((min_x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn whitespace_has_no_contours() {
        let font = test_font();
        let outline = layout_text(" ", &font, 1.0, 1);
        assert!(outline.contours.is_empty());
        assert!(outline.missing.is_empty());
    }

    #[test]
    fn degenerate_paths_are_dropped() {
        let points = vec![Vec2::ZERO, Vec2::X, Vec2::X * 2.0];
        assert!(clean(points).is_none());
        let two = vec![Vec2::ZERO, Vec2::X, Vec2::ZERO];
        assert!(clean(two).is_none());
    }
}
