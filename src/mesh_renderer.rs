//! Surface mesh rendering with depth testing and hover highlight.
//!
//! The renderer owns the GPU copies of one [`SurfaceMesh`]: positions and
//! normals (static), per-vertex colors (rewritten whenever the frame or mode
//! changes), and region labels (static, used for highlighting).
//!
//! # Matrix convention
//!
//! The uniform matrix comes from [`Projection::gpu_matrix`], the same builder
//! the picker uses, so a vertex is rasterized exactly where it is hit-tested.
//!
//! # Bindings
//!
//! | Slot            | Contents                          |
//! |-----------------|-----------------------------------|
//! | group 0         | [`SurfaceUniforms`]               |
//! | vertex buffer 0 | [`SurfaceVertex`] (position, normal) |
//! | vertex buffer 1 | RGBA color per vertex             |
//! | vertex buffer 2 | `i32` region label per vertex     |

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::error::{Result, ViewerError};
use crate::gpu::{DEPTH_FORMAT, GpuContext};
use crate::payload::{RenderMode, SurfaceMesh};
use crate::projection::Projection;

/// Static per-vertex geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl SurfaceVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<SurfaceVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };
}

const COLOR_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<[f32; 4]>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x4,
    }],
};

const LABEL_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<i32>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 3,
        format: wgpu::VertexFormat::Sint32,
    }],
};

/// Uniforms for the surface shader. Layout matches `shaders/surface.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceUniforms {
    pub clip_from_model: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub mode: f32,
    pub highlight: [f32; 4],
    pub hovered: i32,
    pub _padding: [i32; 3],
}

/// Per-draw camera parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshDraw {
    pub projection: Projection,
    pub aspect: f32,
    pub view: Mat4,
    pub model: Mat4,
    pub eye: Vec3,
}

impl MeshDraw {
    /// Uniform block for this draw.
    pub fn uniforms(&self, mode: RenderMode, hovered: i32, highlight: [f32; 4]) -> SurfaceUniforms {
        let clip = self.projection.gpu_matrix(self.aspect, self.view, self.model);
        SurfaceUniforms {
            clip_from_model: clip.to_cols_array_2d(),
            model: self.model.to_cols_array_2d(),
            camera_pos: self.eye.to_array(),
            mode: mode.shader_value(),
            highlight,
            hovered,
            _padding: [0; 3],
        }
    }
}

/// GPU pipeline and buffers for one labeled surface.
pub struct MeshRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    color_buffer: wgpu::Buffer,
    label_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: usize,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    mode: RenderMode,
    hovered: i32,
    highlight: [f32; 4],
}

impl MeshRenderer {
    /// Upload the mesh and build the pipeline for `gpu`'s target format.
    ///
    /// Colors start out mid-grey until the first [`Self::update_colors`].
    pub fn new(gpu: &GpuContext, mesh: &SurfaceMesh, highlight: [f32; 4]) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Surface Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/surface.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Surface Uniforms"),
            size: std::mem::size_of::<SurfaceUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Surface Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Surface Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertices: Vec<SurfaceVertex> = mesh
            .vertices()
            .iter()
            .zip(mesh.normals())
            .map(|(p, n)| SurfaceVertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let colors = vec![[0.5f32, 0.5, 0.5, 1.0]; mesh.vertex_count()];
        let color_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Colors"),
            contents: bytemuck::cast_slice(&colors),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let label_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Labels"),
            contents: bytemuck::cast_slice(mesh.labels()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let indices: Vec<u32> = mesh.faces().iter().flatten().copied().collect();
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Surface Indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Surface Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[SurfaceVertex::LAYOUT, COLOR_LAYOUT, LABEL_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Cortical surfaces are open and viewed from both sides.
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_size = (gpu.width(), gpu.height());
        let depth_view = create_depth_view(device, depth_size);

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            color_buffer,
            label_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            vertex_count: mesh.vertex_count(),
            depth_view,
            depth_size,
            mode: RenderMode::default(),
            hovered: -1,
            highlight,
        }
    }

    /// Replace the per-vertex colors. `colors` must have one entry per vertex.
    pub fn update_colors(&mut self, gpu: &GpuContext, colors: &[[f32; 4]]) -> Result<()> {
        if colors.len() != self.vertex_count {
            return Err(ViewerError::shape(
                "color upload",
                self.vertex_count,
                colors.len(),
            ));
        }
        gpu.queue
            .write_buffer(&self.color_buffer, 0, bytemuck::cast_slice(colors));
        Ok(())
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.mode = mode;
    }

    /// Region to highlight, or a negative id for none.
    pub fn set_hovered(&mut self, region_id: i32) {
        self.hovered = region_id;
    }

    fn ensure_depth_size(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        if self.depth_size != size {
            self.depth_view = create_depth_view(device, size);
            self.depth_size = size;
        }
    }

    /// Clear `target` to `background` and draw the surface over it.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        target: &wgpu::TextureView,
        size: (u32, u32),
        params: &MeshDraw,
        background: [f32; 4],
    ) {
        self.ensure_depth_size(&gpu.device, size);

        let uniforms = params.uniforms(self.mode, self.hovered, self.highlight);
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Surface Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(to_wgpu_color(background)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.index_count > 0 {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, self.color_buffer.slice(..));
                render_pass.set_vertex_buffer(2, self.label_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..self.index_count, 0, 0..1);
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

pub(crate) fn to_wgpu_color(c: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: c[0] as f64,
        g: c[1] as f64,
        b: c[2] as f64,
        a: c[3] as f64,
    }
}

fn create_depth_view(device: &wgpu::Device, (width, height): (u32, u32)) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Surface Depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
