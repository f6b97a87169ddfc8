use glam::{Vec2, Vec3};
use glyphfield_common::Aabb;

/// Indexed triangle geometry with per-vertex normals and uvs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        debug_assert!(
            (a.max(b).max(c) as usize) < self.positions.len(),
            "triangle references a missing vertex"
        );
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    pub fn translate(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            *p += offset;
        }
    }

    /// Move the bounding-box midpoint to the origin. Returns the applied offset.
    pub fn center(&mut self) -> Vec3 {
        let offset = -self.bounding_box().center();
        self.translate(offset);
        offset
    }

    /// Recompute normals by accumulating area-weighted face normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    /// Append another geometry, offsetting its indices.
    pub fn append(&mut self, other: &Geometry) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Geometry {
        let mut g = Geometry::new();
        let a = g.push_vertex(Vec3::new(0.0, 0.0, 0.0), Vec3::ZERO, Vec2::ZERO);
        let b = g.push_vertex(Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO, Vec2::X);
        let c = g.push_vertex(Vec3::new(2.0, 4.0, 0.0), Vec3::ZERO, Vec2::ONE);
        let d = g.push_vertex(Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO, Vec2::Y);
        g.push_triangle(a, b, c);
        g.push_triangle(a, c, d);
        g
    }

    #[test]
    fn counts() {
        let g = quad();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.triangle_count(), 2);
        assert!(!g.is_empty());
        assert!(Geometry::new().is_empty());
    }

    #[test]
    fn center_moves_bbox_midpoint_to_origin() {
        let mut g = quad();
        let offset = g.center();
        assert_eq!(offset, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(g.bounding_box().center(), Vec3::ZERO);
    }

    #[test]
    fn counter_clockwise_faces_point_up_z() {
        let mut g = quad();
        g.compute_vertex_normals();
        for n in g.normals() {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn append_offsets_indices() {
        let mut g = quad();
        let other = quad();
        g.append(&other);
        assert_eq!(g.vertex_count(), 8);
        assert_eq!(&g.indices()[6..9], &[4, 5, 6]);
    }
}
