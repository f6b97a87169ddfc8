use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use glyphfield_assets::MatcapTexture;
use glyphfield_geometry::Geometry;
use glyphfield_scene::{Batch, MatcapMaterial, PerspectiveCamera, Scene};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
}

impl InstanceData {
    fn new(model: &Mat4, color: [f32; 4]) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            color,
        }
    }
}

/// Identity of a shared resource: the address of its `Arc` allocation.
type ResourceKey = usize;

fn geometry_key(geometry: &Arc<Geometry>) -> ResourceKey {
    Arc::as_ptr(geometry) as ResourceKey
}

fn material_key(material: &Arc<MatcapMaterial>) -> ResourceKey {
    Arc::as_ptr(material) as ResourceKey
}

/// One instanced draw into the shared instance buffer.
#[derive(Debug, Clone, PartialEq)]
struct Draw {
    geometry: ResourceKey,
    material: ResourceKey,
    instances: Range<u32>,
}

/// Every instance of the frame, laid out so each batch is contiguous.
#[derive(Debug, Default)]
struct DrawList {
    instances: Vec<InstanceData>,
    draws: Vec<Draw>,
}

fn build_draw_list(batches: &[Batch<'_>]) -> DrawList {
    let mut list = DrawList::default();
    for batch in batches {
        if batch.geometry.is_empty() || batch.models.is_empty() {
            continue;
        }
        let start = list.instances.len() as u32;
        let color = batch.material.color;
        list.instances
            .extend(batch.models.iter().map(|m| InstanceData::new(m, color)));
        list.draws.push(Draw {
            geometry: geometry_key(batch.geometry),
            material: material_key(batch.material),
            instances: start..list.instances.len() as u32,
        });
    }
    list
}

struct GpuMesh {
    // Held so the key's allocation cannot be reused while cached.
    _geometry: Arc<Geometry>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuMaterial {
    _material: Arc<MatcapMaterial>,
    bind_group: wgpu::BindGroup,
}

/// What one call to [`WgpuRenderer::render`] drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub draw_calls: u32,
    pub instances: u32,
}

/// wgpu-based scene renderer.
pub struct WgpuRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    meshes: HashMap<ResourceKey, GpuMesh>,
    materials: HashMap<ResourceKey, GpuMaterial>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u64,
    depth_texture: wgpu::TextureView,
    surface_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view: Mat4::IDENTITY.to_cols_array_2d(),
                proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("matcap_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("matcap_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("matcap_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MATCAP_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("matcap_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let instance_capacity = 256;
        let instance_buffer = Self::create_instance_buffer(device, instance_capacity);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            material_layout,
            sampler,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            instance_buffer,
            instance_capacity,
            depth_texture,
            surface_format,
            clear_color: wgpu::Color::BLACK,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Number of geometries and materials resident on the GPU.
    pub fn cached(&self) -> (usize, usize) {
        (self.meshes.len(), self.materials.len())
    }

    /// Render one frame of `scene` from `camera` into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> FrameReport {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view: camera.view_matrix().to_cols_array_2d(),
                proj: camera.projection_matrix().to_cols_array_2d(),
            }),
        );

        let batches = scene.batches();
        for batch in &batches {
            self.upload_geometry(device, batch.geometry);
            self.upload_material(device, queue, batch.material);
        }
        let list = build_draw_list(&batches);

        if !list.instances.is_empty() {
            self.reserve_instances(device, list.instances.len() as u64);
            queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&list.instances),
            );
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        let mut report = FrameReport::default();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for draw in &list.draws {
                let (Some(mesh), Some(material)) =
                    (self.meshes.get(&draw.geometry), self.materials.get(&draw.material))
                else {
                    continue;
                };
                pass.set_bind_group(1, &material.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, draw.instances.clone());
                report.draw_calls += 1;
                report.instances += draw.instances.len() as u32;
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        report
    }

    fn upload_geometry(&mut self, device: &wgpu::Device, geometry: &Arc<Geometry>) {
        if geometry.is_empty() {
            return;
        }
        let key = geometry_key(geometry);
        if self.meshes.contains_key(&key) {
            return;
        }

        let vertices: Vec<Vertex> = geometry
            .positions()
            .iter()
            .zip(geometry.normals())
            .map(|(p, n)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertex_buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_index_buffer"),
            contents: bytemuck::cast_slice(geometry.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        tracing::debug!(
            vertices = vertices.len(),
            triangles = geometry.triangle_count(),
            "geometry uploaded"
        );
        self.meshes.insert(
            key,
            GpuMesh {
                _geometry: Arc::clone(geometry),
                vertex_buffer,
                index_buffer,
                index_count: geometry.indices().len() as u32,
            },
        );
    }

    fn upload_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material: &Arc<MatcapMaterial>,
    ) {
        let key = material_key(material);
        if self.materials.contains_key(&key) {
            return;
        }

        let view = Self::create_matcap_texture(device, queue, &material.matcap);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("matcap_bind_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        tracing::debug!(name = %material.name, "material uploaded");
        self.materials.insert(
            key,
            GpuMaterial {
                _material: Arc::clone(material),
                bind_group,
            },
        );
    }

    fn reserve_instances(&mut self, device: &wgpu::Device, needed: u64) {
        if needed <= self.instance_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        tracing::debug!(capacity, "growing instance buffer");
        self.instance_buffer = Self::create_instance_buffer(device, capacity);
        self.instance_capacity = capacity;
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_matcap_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        matcap: &MatcapTexture,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: matcap.width,
            height: matcap.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("matcap_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &matcap.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * matcap.width),
                rows_per_image: Some(matcap.height),
            },
            size,
        );
        texture.create_view(&Default::default())
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};
    use glyphfield_common::Transform;
    use glyphfield_scene::Mesh;

    fn triangle() -> Arc<Geometry> {
        let mut g = Geometry::new();
        let a = g.push_vertex(Vec3::ZERO, Vec3::Z, Vec2::ZERO);
        let b = g.push_vertex(Vec3::X, Vec3::Z, Vec2::X);
        let c = g.push_vertex(Vec3::Y, Vec3::Z, Vec2::Y);
        g.push_triangle(a, b, c);
        Arc::new(g)
    }

    fn material() -> Arc<MatcapMaterial> {
        Arc::new(MatcapMaterial::new("clay", MatcapTexture::fallback(2)))
    }

    #[test]
    fn batches_become_contiguous_instance_ranges() {
        let (shared, other, m) = (triangle(), triangle(), material());
        let mut scene = Scene::new();
        for i in 0..3 {
            let t = Transform::from_position(Vec3::new(i as f32, 0.0, 0.0));
            scene.add(Mesh::new("a", shared.clone(), m.clone()).with_transform(t));
        }
        scene.add(Mesh::new("b", other.clone(), m.clone()));

        let list = build_draw_list(&scene.batches());
        assert_eq!(list.instances.len(), 4);
        assert_eq!(list.draws.len(), 2);
        assert_eq!(list.draws[0].instances, 0..3);
        assert_eq!(list.draws[0].geometry, geometry_key(&shared));
        assert_eq!(list.draws[1].instances, 3..4);
        assert_eq!(list.draws[1].material, material_key(&m));
        // translation lives in the last column
        assert_eq!(list.instances[2].model_3, [2.0, 0.0, 0.0, 1.0]);
        assert_eq!(list.instances[0].color, m.color);
    }

    #[test]
    fn empty_geometry_is_not_drawn() {
        let mut scene = Scene::new();
        scene.add(Mesh::new("empty", Arc::new(Geometry::new()), material()));
        let list = build_draw_list(&scene.batches());
        assert!(list.draws.is_empty());
        assert!(list.instances.is_empty());
    }

    #[test]
    fn instance_layout_matches_shader_attributes() {
        // five vec4 attributes at locations 2..=6
        assert_eq!(std::mem::size_of::<InstanceData>(), 5 * 16);
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<Uniforms>(), 128);
    }

    #[test]
    fn shader_declares_entry_points_and_bindings() {
        let src = shaders::MATCAP_SHADER;
        assert!(src.contains("fn vs_main"));
        assert!(src.contains("fn fs_main"));
        assert!(src.contains("@group(1) @binding(1)"));
    }
}
