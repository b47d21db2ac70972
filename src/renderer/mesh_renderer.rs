//! wgpu implementation of [`RenderBackend`].
//!
//! Geometry is uploaded once per handle into its own vertex/index buffers
//! and destroyed on dispose. Materials are plain parameter records. Each
//! frame writes one [`DrawUniform`] per mesh node into a storage buffer and
//! issues one indexed draw per node, using the instance index to select its
//! uniform. Opaque triangles are drawn first, then lines and wireframes
//! with blending and without depth writes.

use rustc_hash::FxHashMap;
use wgpu::util::DeviceExt;

use super::mesh::{mesh_vertex_buffer_layout, MeshData, Topology};
use crate::camera::core::{Camera, CameraUniform};
use crate::gpu::dynamic_buffer::DynamicBuffer;
use crate::gpu::render_context::RenderContext;
use crate::gpu::resources::{
    wireframe_indices, GeometryHandle, MaterialDesc, MaterialHandle,
    MaterialKind, RenderBackend, RenderError, ResourceAllocator,
};
use crate::gpu::texture::DepthTarget;
use crate::scene::Scene;

/// Viewport clear color.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.043,
    g: 0.059,
    b: 0.098,
    a: 1.0,
};

// ── GPU-side records ──

/// Scene lights as seen by the shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniform {
    ambient: [f32; 4],
    key_direction: [f32; 4],
    key_color: [f32; 4],
}

impl LightUniform {
    fn from_scene(scene: &Scene) -> Self {
        let (direction, color) = scene
            .key_light()
            .unwrap_or((glam::Vec3::Y, glam::Vec3::ZERO));
        Self {
            ambient: scene.ambient().extend(0.0).to_array(),
            key_direction: direction.extend(0.0).to_array(),
            key_color: color.extend(0.0).to_array(),
        }
    }
}

/// Per-draw model matrix and material parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    /// Local-to-world matrix.
    pub model: [[f32; 4]; 4],
    /// Linear RGB plus opacity.
    pub color: [f32; 4],
    /// Metalness, roughness, unlit flag, unused.
    pub params: [f32; 4],
}

impl DrawUniform {
    fn new(model: glam::Mat4, material: &MaterialDesc) -> Self {
        let [r, g, b] = material.color;
        let unlit = if material.kind == MaterialKind::Line { 1.0 } else { 0.0 };
        Self {
            model: model.to_cols_array_2d(),
            color: [r, g, b, material.opacity],
            params: [material.metalness, material.roughness, unlit, 0.0],
        }
    }
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    /// Line-list edges of a triangle mesh, for wireframe materials.
    edge_buffer: Option<wgpu::Buffer>,
    edge_count: u32,
    topology: Topology,
}

impl GpuGeometry {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        if let Some(edges) = self.edge_buffer {
            edges.destroy();
        }
    }
}

/// One draw call of the current frame.
struct DrawCall {
    geometry: GeometryHandle,
    edges: bool,
}

// ── Backend ──

/// Window renderer for the molecule scene.
pub struct WgpuBackend {
    context: RenderContext,
    depth: DepthTarget,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    draw_buffer: DynamicBuffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    triangle_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    geometries: FxHashMap<GeometryHandle, GpuGeometry>,
    materials: FxHashMap<MaterialHandle, MaterialDesc>,
    next_id: u64,
}

impl WgpuBackend {
    /// Create pipelines and per-frame buffers on `context`.
    #[must_use]
    pub fn new(context: RenderContext) -> Self {
        let device = &context.device;
        let (width, height) = context.size();
        let depth = DepthTarget::new(device, width, height);

        let camera_uniform = CameraUniform::new();
        let camera_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let light_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Buffer"),
                contents: bytemuck::cast_slice(&[LightUniform::from_scene(
                    &Scene::new(),
                )]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let draw_buffer = DynamicBuffer::new(
            device,
            "Draw Uniforms",
            size_of::<DrawUniform>() * 256,
            wgpu::BufferUsages::STORAGE,
        );

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Mesh Bind Group Layout"),
                entries: &[
                    buffer_entry(0, wgpu::BufferBindingType::Uniform),
                    buffer_entry(1, wgpu::BufferBindingType::Uniform),
                    buffer_entry(
                        2,
                        wgpu::BufferBindingType::Storage { read_only: true },
                    ),
                ],
            });
        let bind_group = create_bind_group(
            device,
            &bind_group_layout,
            &camera_buffer,
            &light_buffer,
            draw_buffer.buffer(),
        );

        let shader = device.create_shader_module(wgpu::include_wgsl!(
            "../../assets/shaders/mesh.wgsl"
        ));
        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Mesh Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
        let format = context.format();
        let triangle_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            format,
            PipelineKind::Triangles,
        );
        let line_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader,
            format,
            PipelineKind::Lines,
        );

        Self {
            context,
            depth,
            camera_uniform,
            camera_buffer,
            light_buffer,
            draw_buffer,
            bind_group_layout,
            bind_group,
            triangle_pipeline,
            line_pipeline,
            geometries: FxHashMap::default(),
            materials: FxHashMap::default(),
            next_id: 0,
        }
    }

    /// The GPU context.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Resolve the scene into draw uniforms, opaque draws first.
    fn collect_draws(
        &self,
        scene: &Scene,
    ) -> Result<(Vec<DrawUniform>, Vec<DrawCall>, usize), RenderError> {
        let mut opaque = Vec::new();
        let mut blended = Vec::new();
        for (world, node) in scene.draw_list() {
            let geometry = self.geometries.get(&node.geometry).ok_or_else(|| {
                RenderError::UnknownHandle(format!("{:?}", node.geometry))
            })?;
            let material = self.materials.get(&node.material).ok_or_else(|| {
                RenderError::UnknownHandle(format!("{:?}", node.material))
            })?;
            let uniform = DrawUniform::new(world, material);
            let lines = geometry.topology == Topology::Lines || material.wireframe;
            let call = DrawCall {
                geometry: node.geometry,
                edges: material.wireframe && geometry.topology == Topology::Triangles,
            };
            if lines || material.is_translucent() {
                blended.push((uniform, call));
            } else {
                opaque.push((uniform, call));
            }
        }
        let split = opaque.len();
        let (uniforms, calls) = opaque.into_iter().chain(blended).unzip();
        Ok((uniforms, calls, split))
    }
}

impl ResourceAllocator for WgpuBackend {
    fn create_geometry(&mut self, mesh: &MeshData, label: &str) -> GeometryHandle {
        let device = &self.context.device;
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let (edge_buffer, edge_count) = match mesh.topology {
            Topology::Triangles => {
                let edges = wireframe_indices(mesh);
                let buffer =
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytemuck::cast_slice(&edges),
                        usage: wgpu::BufferUsages::INDEX,
                    });
                (Some(buffer), edges.len() as u32)
            }
            Topology::Lines => (None, 0),
        };
        let gpu = GpuGeometry {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            edge_buffer,
            edge_count,
            topology: mesh.topology,
        };
        let handle = GeometryHandle(self.next_id());
        let _ = self.geometries.insert(handle, gpu);
        handle
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> MaterialHandle {
        let handle = MaterialHandle(self.next_id());
        let _ = self.materials.insert(handle, *desc);
        handle
    }

    fn dispose_geometry(&mut self, handle: GeometryHandle) {
        match self.geometries.remove(&handle) {
            Some(gpu) => gpu.destroy(),
            None => log::warn!("dispose of unknown geometry {handle:?}"),
        }
    }

    fn dispose_material(&mut self, handle: MaterialHandle) {
        if self.materials.remove(&handle).is_none() {
            log::warn!("dispose of unknown material {handle:?}");
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        let (uniforms, calls, opaque_count) = self.collect_draws(scene)?;

        self.camera_uniform.update_view_proj(camera);
        let queue = &self.context.queue;
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::cast_slice(&[LightUniform::from_scene(scene)]),
        );
        if self
            .draw_buffer
            .write(&self.context.device, &self.context.queue, &uniforms)
        {
            self.bind_group = create_bind_group(
                &self.context.device,
                &self.bind_group_layout,
                &self.camera_buffer,
                &self.light_buffer,
                self.draw_buffer.buffer(),
            );
        }

        let frame = match self.context.get_next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                if matches!(e, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.context.reconfigure();
                }
                return Err(e.into());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.context.create_encoder();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Molecule Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(
                    wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    },
                ),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.bind_group, &[]);

            for (i, call) in calls.iter().enumerate() {
                let Some(gpu) = self.geometries.get(&call.geometry) else {
                    continue;
                };
                let pipeline = if i < opaque_count {
                    &self.triangle_pipeline
                } else if gpu.topology == Topology::Lines || call.edges {
                    &self.line_pipeline
                } else {
                    // Translucent triangles share the opaque pipeline.
                    &self.triangle_pipeline
                };
                let (indices, count) = match (&gpu.edge_buffer, call.edges) {
                    (Some(edges), true) => (edges, gpu.edge_count),
                    _ => (&gpu.index_buffer, gpu.index_count),
                };
                let instance = i as u32;
                pass.set_pipeline(pipeline);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..count, 0, instance..instance + 1);
            }
        }
        self.context.submit(encoder);
        frame.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.context.resize(width, height) {
            self.depth = DepthTarget::new(&self.context.device, width, height);
        }
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        if !self.geometries.is_empty() {
            log::debug!("releasing {} geometries on drop", self.geometries.len());
        }
        for (_, gpu) in self.geometries.drain() {
            gpu.destroy();
        }
    }
}

// ── Pipeline helpers ──

#[derive(Clone, Copy, PartialEq, Eq)]
enum PipelineKind {
    Triangles,
    Lines,
}

fn buffer_entry(
    binding: u32,
    ty: wgpu::BufferBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    camera: &wgpu::Buffer,
    lights: &wgpu::Buffer,
    draws: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Mesh Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: camera.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lights.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: draws.as_entire_binding(),
            },
        ],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    let (label, topology, blend, depth_write, cull_mode) = match kind {
        PipelineKind::Triangles => (
            "Mesh Triangle Pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            true,
            Some(wgpu::Face::Back),
        ),
        PipelineKind::Lines => (
            "Mesh Line Pipeline",
            wgpu::PrimitiveTopology::LineList,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            false,
            None,
        ),
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[mesh_vertex_buffer_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(DepthTarget::depth_stencil_state(depth_write)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_layouts_match_shader() {
        assert_eq!(size_of::<DrawUniform>(), 96);
        assert_eq!(size_of::<LightUniform>(), 48);
    }

    #[test]
    fn line_materials_are_unlit() {
        let line = DrawUniform::new(glam::Mat4::IDENTITY, &MaterialDesc::line([1.0; 3], 0.3));
        assert_eq!(line.params[2], 1.0);
        assert_eq!(line.color[3], 0.3);
        let lit = DrawUniform::new(
            glam::Mat4::IDENTITY,
            &MaterialDesc::standard([0.5; 3], 0.2, 0.5),
        );
        assert_eq!(lit.params, [0.2, 0.5, 0.0, 0.0]);
    }
}
