use crate::MatcapMaterial;
use glam::Mat4;
use glyphfield_common::{Aabb, Transform};
use glyphfield_geometry::Geometry;
use std::sync::Arc;

/// Index of a mesh in its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

/// A drawable: shared geometry and material placed by a transform.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub geometry: Arc<Geometry>,
    pub material: Arc<MatcapMaterial>,
    pub transform: Transform,
}

impl Mesh {
    pub fn new(
        name: impl Into<String>,
        geometry: Arc<Geometry>,
        material: Arc<MatcapMaterial>,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// World-space bounds of the transformed geometry.
    pub fn world_bounds(&self) -> Aabb {
        let m = self.transform.matrix();
        Aabb::from_points(
            self.geometry
                .positions()
                .iter()
                .map(|p| m.transform_point3(*p)),
        )
    }
}

/// Meshes that share one geometry and one material, drawn together.
#[derive(Debug)]
pub struct Batch<'a> {
    pub geometry: &'a Arc<Geometry>,
    pub material: &'a Arc<MatcapMaterial>,
    pub models: Vec<Mat4>,
}

/// Append-only container of everything visible.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        tracing::trace!(id = id.0, name = %mesh.name, "mesh added");
        self.meshes.push(mesh);
        id
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<(MeshId, &Mesh)> {
        self.meshes
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
            .map(|(i, m)| (MeshId(i), m))
    }

    /// Group meshes by shared geometry and material, in order of first
    /// appearance. Sharing is by identity, not by value.
    pub fn batches(&self) -> Vec<Batch<'_>> {
        let mut batches: Vec<Batch<'_>> = Vec::new();
        for mesh in &self.meshes {
            let model = mesh.transform.matrix();
            match batches.iter_mut().find(|b| {
                Arc::ptr_eq(b.geometry, &mesh.geometry) && Arc::ptr_eq(b.material, &mesh.material)
            }) {
                Some(batch) => batch.models.push(model),
                None => batches.push(Batch {
                    geometry: &mesh.geometry,
                    material: &mesh.material,
                    models: vec![model],
                }),
            }
        }
        batches
    }

    /// Number of distinct geometry allocations referenced by the scene.
    pub fn unique_geometries(&self) -> usize {
        let mut seen: Vec<*const Geometry> = Vec::new();
        for mesh in &self.meshes {
            let ptr = Arc::as_ptr(&mesh.geometry);
            if !seen.contains(&ptr) {
                seen.push(ptr);
            }
        }
        seen.len()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.world_bounds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use glyphfield_assets::MatcapTexture;

    fn triangle() -> Arc<Geometry> {
        let mut g = Geometry::new();
        let a = g.push_vertex(Vec3::ZERO, Vec3::Z, Vec2::ZERO);
        let b = g.push_vertex(Vec3::X, Vec3::Z, Vec2::X);
        let c = g.push_vertex(Vec3::Y, Vec3::Z, Vec2::Y);
        g.push_triangle(a, b, c);
        Arc::new(g)
    }

    fn material() -> Arc<MatcapMaterial> {
        Arc::new(MatcapMaterial::new("clay", MatcapTexture::fallback(4)))
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut scene = Scene::new();
        let (g, m) = (triangle(), material());
        let a = scene.add(Mesh::new("a", g.clone(), m.clone()));
        let b = scene.add(Mesh::new("b", g, m));
        assert_eq!(a, MeshId(0));
        assert_eq!(b, MeshId(1));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.get(b).unwrap().name, "b");
        assert!(scene.get(MeshId(2)).is_none());
    }

    #[test]
    fn batches_group_by_identity() {
        let mut scene = Scene::new();
        let shared = triangle();
        let m = material();
        scene.add(Mesh::new("a", shared.clone(), m.clone()));
        scene.add(Mesh::new("own", triangle(), m.clone()));
        scene.add(Mesh::new("b", shared.clone(), m.clone()));

        let batches = scene.batches();
        assert_eq!(batches.len(), 2);
        assert!(Arc::ptr_eq(batches[0].geometry, &shared));
        assert_eq!(batches[0].models.len(), 2);
        assert_eq!(batches[1].models.len(), 1);
        assert_eq!(scene.unique_geometries(), 2);
    }

    #[test]
    fn world_bounds_follow_transform() {
        let mut scene = Scene::new();
        let mesh = Mesh::new("t", triangle(), material())
            .with_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        scene.add(mesh);
        let b = scene.bounding_box();
        assert_eq!(b.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(b.max, Vec3::new(11.0, 1.0, 0.0));
    }

    #[test]
    fn find_by_name() {
        let mut scene = Scene::new();
        scene.add(Mesh::new("x", triangle(), material()));
        let (id, mesh) = scene.find("x").unwrap();
        assert_eq!(id, MeshId(0));
        assert_eq!(mesh.name, "x");
        assert!(scene.find("y").is_none());
    }
}
