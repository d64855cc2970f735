use glam::Vec2;

use crate::font::FontAtlas;
use crate::gpu::GpuContext;

/// A rectangle in screen-space pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    /// Semi-transparent dark backdrop for overlays.
    pub const BACKDROP: Color = Color::rgba(0.0, 0.0, 0.0, 0.55);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Vertex for 2D colored geometry and text.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    fn colored(p: Vec2, color: [f32; 4]) -> Self {
        Self {
            position: p.to_array(),
            uv: [0.0, 0.0],
            color,
        }
    }
}

/// Two triangles covering the axis-aligned quad `(x0, y0)..(x1, y1)`.
fn quad(x0: f32, y0: f32, x1: f32, y1: f32, uv: [f32; 4], color: [f32; 4]) -> [Vertex2d; 6] {
    let [u0, v0, u1, v1] = uv;
    let v = |x, y, u, w| Vertex2d {
        position: [x, y],
        uv: [u, w],
        color,
    };
    [
        v(x0, y0, u0, v0),
        v(x1, y0, u1, v0),
        v(x0, y1, u0, v1),
        v(x1, y0, u1, v0),
        v(x1, y1, u1, v1),
        v(x0, y1, u0, v1),
    ]
}

/// A line segment as a quad of the given thickness. Empty for zero length.
pub fn line_quad(a: Vec2, b: Vec2, thickness: f32, color: Color) -> Option<[Vertex2d; 6]> {
    let dir = (b - a).try_normalize()?;
    let n = dir.perp() * (thickness * 0.5);
    let c = color.to_array();
    let v = |p: Vec2| Vertex2d::colored(p, c);
    Some([
        v(a + n),
        v(b + n),
        v(a - n),
        v(b + n),
        v(b - n),
        v(a - n),
    ])
}

/// Glyph quads for `text` with its top-left corner at `(x, y)`.
pub fn layout_text(font: &FontAtlas, x: f32, y: f32, text: &str, color: Color) -> Vec<Vertex2d> {
    let c = color.to_array();
    let mut vertices = Vec::with_capacity(text.len() * 6);
    let mut cursor_x = x;
    let baseline_y = y + font.size();

    for ch in text.chars() {
        let Some(glyph) = font.glyph(ch) else {
            cursor_x += font.size() * 0.5;
            continue;
        };

        if glyph.width > 0 && glyph.height > 0 {
            let gx = cursor_x + glyph.offset_x;
            // fontdue's ymin is measured up from the baseline to the glyph bottom.
            let gy = baseline_y - glyph.offset_y - glyph.height as f32;
            let [u0, v0, du, dv] = glyph.uv;
            vertices.extend_from_slice(&quad(
                gx,
                gy,
                gx + glyph.width as f32,
                gy + glyph.height as f32,
                [u0, v0, u0 + du, v0 + dv],
                c,
            ));
        }

        cursor_x += glyph.advance;
    }
    vertices
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const INITIAL_VERTICES: usize = 16384;

/// Immediate-mode 2D drawing for overlays.
///
/// Geometry is collected on the CPU, then drawn in one pass by
/// [`Draw2d::render`]: colored geometry first, text on top.
pub struct Draw2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    font_bind_group: Option<wgpu::BindGroup>,

    colored_vertices: Vec<Vertex2d>,
    text_vertices: Vec<Vertex2d>,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Uniform bind group layout (group 0)
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
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
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        // Font atlas bind group layout (group 1)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
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

        let colored_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Colored Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fs: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.format(),
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let colored_pipeline =
            pipeline("Draw2d Colored Pipeline", &colored_pipeline_layout, "fs_colored");
        let textured_pipeline =
            pipeline("Draw2d Textured Pipeline", &textured_pipeline_layout, "fs_textured");

        let vertex_buffer = create_vertex_buffer(device, INITIAL_VERTICES);

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTICES,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            font_bind_group: None,
            colored_vertices: Vec::with_capacity(1024),
            text_vertices: Vec::new(),
        }
    }

    /// Bind the atlas sampled by text from [`layout_text`].
    pub fn set_font(&mut self, gpu: &GpuContext, font: &FontAtlas) {
        self.font_bind_group = Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Font Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&font.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&font.sampler),
                },
            ],
        }));
    }

    /// Clear all batched geometry.
    pub fn clear(&mut self) {
        self.colored_vertices.clear();
        self.text_vertices.clear();
    }

    pub fn rect(&mut self, rect: Rect, color: Color) {
        self.colored_vertices.extend_from_slice(&quad(
            rect.x,
            rect.y,
            rect.right(),
            rect.bottom(),
            [0.0; 4],
            color.to_array(),
        ));
    }

    pub fn line(&mut self, a: Vec2, b: Vec2, thickness: f32, color: Color) {
        if let Some(vertices) = line_quad(a, b, thickness, color) {
            self.colored_vertices.extend_from_slice(&vertices);
        }
    }

    /// Connected segments through `points`.
    pub fn polyline(&mut self, points: &[Vec2], thickness: f32, color: Color) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], thickness, color);
        }
    }

    /// Queue text laid out earlier by [`layout_text`].
    pub fn push_text(&mut self, vertices: &[Vertex2d]) {
        self.text_vertices.extend_from_slice(vertices);
    }

    /// Draw everything batched so far into `render_pass`.
    pub fn render(&mut self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass, size: (u32, u32)) {
        let total = self.colored_vertices.len() + self.text_vertices.len();
        if total == 0 {
            return;
        }
        if total > self.vertex_capacity {
            self.vertex_capacity = total.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&gpu.device, self.vertex_capacity);
        }

        let uniforms = Draw2dUniforms {
            resolution: [size.0 as f32, size.1 as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let colored = self.colored_vertices.len();
        if colored > 0 {
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.colored_vertices),
            );
            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..colored as u32, 0..1);
        }

        if !self.text_vertices.is_empty()
            && let Some(bind_group) = &self.font_bind_group
        {
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                (colored * std::mem::size_of::<Vertex2d>()) as u64,
                bytemuck::cast_slice(&self.text_vertices),
            );
            render_pass.set_pipeline(&self.textured_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_bind_group(1, bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(colored as u32..total as u32, 0..1);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertices: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw2d Vertex Buffer"),
        size: (vertices * std::mem::size_of::<Vertex2d>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_corners() {
        let v = quad(1.0, 2.0, 5.0, 7.0, [0.0; 4], [1.0; 4]);
        let xs: Vec<f32> = v.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        assert!(xs.iter().all(|&x| x == 1.0 || x == 5.0));
        assert!(ys.iter().all(|&y| y == 2.0 || y == 7.0));
    }

    #[test]
    fn line_quad_has_requested_thickness() {
        let v = line_quad(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0, Color::WHITE).unwrap();
        let ys: Vec<f32> = v.iter().map(|v| v.position[1]).collect();
        assert!(ys.iter().all(|y| (y.abs() - 1.0).abs() < 1e-6));
        assert!(line_quad(Vec2::ONE, Vec2::ONE, 2.0, Color::WHITE).is_none());
    }
}
