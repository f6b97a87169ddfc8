use crate::outline::{Contour, layout_text};
use crate::{Geometry, GeometryError};
use glam::{Vec2, Vec3};
use glyphfield_assets::Font;
use glyphfield_common::Aabb;
use lyon_path::Path;
use lyon_path::math::point;
use lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Text extrusion parameters, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParams {
    /// Em size of the glyphs.
    pub size: f32,
    /// Extrusion depth along +z, not counting the bevel.
    pub depth: f32,
    /// Samples per quadratic/cubic curve.
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    /// How far the bevel extends along z beyond each face.
    pub bevel_thickness: f32,
    /// How far the bevel extends outward from the outline.
    pub bevel_size: f32,
    /// Outline offset at the start of the bevel.
    pub bevel_offset: f32,
    pub bevel_segments: u32,
    /// Subdivisions of the extruded body.
    pub steps: u32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            size: 0.5,
            depth: 0.2,
            curve_segments: 1,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 1,
            steps: 1,
        }
    }
}

impl TextParams {
    pub fn validate(&self) -> Result<(), GeometryError> {
        let finite = [
            self.size,
            self.depth,
            self.bevel_thickness,
            self.bevel_size,
            self.bevel_offset,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(GeometryError::InvalidParams(
                "text parameters must be finite".into(),
            ));
        }
        if self.size <= 0.0 {
            return Err(GeometryError::InvalidParams(format!(
                "size must be positive, got {}",
                self.size
            )));
        }
        if self.depth < 0.0 || self.bevel_thickness < 0.0 || self.bevel_size < 0.0 {
            return Err(GeometryError::InvalidParams(
                "depth and bevel extents must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// (z, outline offset) for each ring of the extrusion, front to back.
    fn layers(&self) -> Vec<(f32, f32)> {
        let steps = self.steps.max(1);
        let mut layers = Vec::new();

        if !self.bevel_enabled {
            for s in 0..=steps {
                layers.push((self.depth * s as f32 / steps as f32, 0.0));
            }
            return layers;
        }

        let segments = self.bevel_segments.max(1);
        let bevel = |b: u32| {
            let t = b as f32 / segments as f32;
            let z = self.bevel_thickness * (t * FRAC_PI_2).cos();
            let offset = self.bevel_size * (t * FRAC_PI_2).sin() + self.bevel_offset;
            (z, offset)
        };

        for b in 0..segments {
            let (z, offset) = bevel(b);
            layers.push((-z, offset));
        }
        let body = self.bevel_size + self.bevel_offset;
        for s in 0..=steps {
            layers.push((self.depth * s as f32 / steps as f32, body));
        }
        for b in (0..segments).rev() {
            let (z, offset) = bevel(b);
            layers.push((self.depth + z, offset));
        }
        layers
    }
}

/// Extruded text plus the bounds of its unbeveled outline.
#[derive(Debug, Clone)]
pub struct TextGeometry {
    pub geometry: Geometry,
    /// Bounds of the nominal outline extruded from 0 to `depth`, ignoring
    /// the bevel. Tracks the geometry through [`TextGeometry::center`].
    pub outline_bounds: Aabb,
    /// Characters the font had no glyph for.
    pub missing: Vec<char>,
}

impl TextGeometry {
    /// Center the geometry on its bounding-box midpoint. The box includes
    /// the bevel, so the nominal outline is only approximately centered.
    pub fn center(&mut self) -> Vec3 {
        let offset = self.geometry.center();
        self.outline_bounds = self.outline_bounds.translated(offset);
        offset
    }

    /// Distance of the nominal outline's center from the local origin.
    pub fn centering_error(&self) -> Vec3 {
        self.outline_bounds.center()
    }
}

/// Lay out `text` and extrude it into beveled 3D geometry.
pub fn build_text(text: &str, font: &Font, params: &TextParams) -> Result<TextGeometry, GeometryError> {
    params.validate()?;
    let outline = layout_text(text, font, params.size, params.curve_segments);
    let geometry = extrude_contours(&outline.contours, params)?;

    let outline_bounds = Aabb::from_points(outline.contours.iter().flat_map(|c| {
        c.points
            .iter()
            .flat_map(|p| [p.extend(0.0), p.extend(params.depth)])
    }));

    tracing::debug!(
        chars = text.chars().count(),
        contours = outline.contours.len(),
        vertices = geometry.vertex_count(),
        triangles = geometry.triangle_count(),
        "built text geometry"
    );

    Ok(TextGeometry {
        geometry,
        outline_bounds,
        missing: outline.missing,
    })
}

/// Extrude closed contours along +z with optional bevels.
pub fn extrude_contours(contours: &[Contour], params: &TextParams) -> Result<Geometry, GeometryError> {
    params.validate()?;
    if contours.is_empty() {
        return Ok(Geometry::new());
    }

    let layers = params.layers();
    let directions: Vec<Vec<Vec2>> = contours.iter().map(|c| miters(&c.points)).collect();

    let mut geometry = caps(contours, &directions, &layers)?;
    geometry.append(&walls(contours, &directions, &layers));
    Ok(geometry)
}

fn caps(contours: &[Contour], miters: &[Vec<Vec2>], layers: &[(f32, f32)]) -> Result<Geometry, GeometryError> {
    let (front_z, offset) = layers[0];
    let back_z = layers[layers.len() - 1].0;

    let rings: Vec<Vec<Vec2>> = contours
        .iter()
        .zip(miters)
        .map(|(c, m)| c.points.iter().zip(m).map(|(p, m)| *p + *m * offset).collect())
        .collect();
    let (vertices, indices) = tessellate(&rings)?;

    let mut geometry = Geometry::with_capacity(vertices.len() * 2, indices.len() * 2);
    for (z, normal) in [(front_z, Vec3::NEG_Z), (back_z, Vec3::Z)] {
        let base = geometry.vertex_count() as u32;
        for v in &vertices {
            geometry.push_vertex(v.extend(z), normal, *v);
        }
        for tri in indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            let (pa, pb, pc) = (vertices[a as usize], vertices[b as usize], vertices[c as usize]);
            let ccw = (pb - pa).perp_dot(pc - pa) > 0.0;
            // Counter-clockwise in the xy plane faces +z.
            if ccw == (normal.z > 0.0) {
                geometry.push_triangle(base + a, base + b, base + c);
            } else {
                geometry.push_triangle(base + a, base + c, base + b);
            }
        }
    }
    Ok(geometry)
}

fn walls(contours: &[Contour], miters: &[Vec<Vec2>], layers: &[(f32, f32)]) -> Geometry {
    let mut geometry = Geometry::new();

    for (contour, miter) in contours.iter().zip(miters) {
        let n = contour.points.len();
        let ring = |layer: (f32, f32), i: usize| (contour.points[i] + miter[i] * layer.1).extend(layer.0);

        for pair in layers.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            for i in 0..n {
                let j = (i + 1) % n;
                let quad = [ring(lower, i), ring(lower, j), ring(upper, j), ring(upper, i)];
                let horizontal = (quad[0].y - quad[1].y).abs() < (quad[0].x - quad[1].x).abs();
                let uv = |p: Vec3| {
                    if horizontal {
                        Vec2::new(p.x, 1.0 - p.z)
                    } else {
                        Vec2::new(p.y, 1.0 - p.z)
                    }
                };
                let [a, b, c, d] = quad.map(|p| geometry.push_vertex(p, Vec3::ZERO, uv(p)));
                geometry.push_triangle(a, b, c);
                geometry.push_triangle(a, c, d);
            }
        }
    }

    // Quads share no vertices with their neighbours, so this gives faceted walls.
    geometry.compute_vertex_normals();
    geometry
}

/// Per-vertex offset directions: the miter of the two adjacent outward edge
/// normals, scaled so each edge moves by one unit, capped at length √2.
fn miters(points: &[Vec2]) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            let n0 = outward_normal(prev, cur);
            let n1 = outward_normal(cur, next);

            let denom = 1.0 + n0.dot(n1);
            if denom < 1e-6 {
                return n0;
            }
            let m = (n0 + n1) / denom;
            let len2 = m.length_squared();
            if len2 > 2.0 { m * (2.0 / len2).sqrt() } else { m }
        })
        .collect()
}

/// Right-hand normal of the edge. Points away from the filled region for
/// counter-clockwise solids and clockwise holes.
fn outward_normal(from: Vec2, to: Vec2) -> Vec2 {
    let d = (to - from).normalize_or_zero();
    Vec2::new(d.y, -d.x)
}

fn tessellate(rings: &[Vec<Vec2>]) -> Result<(Vec<Vec2>, Vec<u32>), GeometryError> {
    let mut builder = Path::builder();
    for ring in rings {
        let Some((first, rest)) = ring.split_first() else { continue };
        builder.begin(point(first.x, first.y));
        for p in rest {
            builder.line_to(point(p.x, p.y));
        }
        builder.close();
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::non_zero(),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| {
                Vec2::new(v.position().x, v.position().y)
            }),
        )
        .map_err(|e| GeometryError::Tessellation(format!("{e:?}")))?;

    Ok((buffers.vertices, buffers.indices))
}
