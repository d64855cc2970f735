//! The GPU side of the render loop.
//!
//! [`FrameBackend`] is everything [`crate::viewport`] needs to draw a frame.
//! [`GpuBackend`] implements it with wgpu; tests drive the loop with a
//! recording backend instead.

use crate::config::RenderConfig;
use crate::draw2d::Draw2d;
use crate::error::Result;
use crate::font::{FontAtlas, find_system_font};
use crate::gpu::{Frame, GpuContext};
use crate::mesh_renderer::{MeshDraw, MeshRenderer, to_wgpu_color};
use crate::overlay::{TextOverlay, TraceOverlay};
use crate::payload::{Payload, RenderMode};

/// Drawing operations for one frame, in the order the loop calls them.
pub trait FrameBackend {
    /// A drawable color target.
    type Target;

    /// Next target, or `None` to skip this frame.
    fn acquire(&mut self) -> Result<Option<Self::Target>>;

    /// Target size in pixels.
    fn target_size(&self, target: &Self::Target) -> (u32, u32);

    /// Replace the per-vertex colors.
    fn upload_colors(&mut self, colors: &[[f32; 4]]) -> Result<()>;

    fn set_mode(&mut self, mode: RenderMode);

    /// Region to highlight, `-1` for none.
    fn set_hover(&mut self, region_id: i32);

    /// Clear the target and draw the surface.
    fn draw_mesh(&mut self, target: &Self::Target, draw: &MeshDraw) -> Result<()>;

    /// Draw the trace strip with the cursor at `frame`.
    fn draw_traces(&mut self, target: &Self::Target, frame: usize) -> Result<()>;

    /// Draw the hover label. Empty text draws nothing.
    fn draw_text(&mut self, target: &Self::Target, text: &str) -> Result<()>;

    /// Fill the target with a solid color.
    fn clear(&mut self, target: &Self::Target, color: [f32; 4]);

    /// Present the target, or read it back.
    fn finish(&mut self, target: Self::Target) -> Result<()>;
}

/// wgpu implementation of [`FrameBackend`].
pub struct GpuBackend {
    gpu: GpuContext,
    mesh: MeshRenderer,
    draw2d: Draw2d,
    traces: TraceOverlay,
    text: TextOverlay,
    frame_count: usize,
    background: [f32; 4],
}

impl GpuBackend {
    /// Upload `payload`'s mesh and set up the overlays.
    ///
    /// A font that cannot be loaded disables the text overlay with a warning.
    pub fn new(gpu: GpuContext, payload: &Payload, render: &RenderConfig) -> Self {
        let mesh = MeshRenderer::new(&gpu, &payload.mesh, render.highlight);
        let mut draw2d = Draw2d::new(&gpu);

        let font = load_font(&gpu, render);
        if let Some(font) = &font {
            draw2d.set_font(&gpu, font);
        }

        let traces = TraceOverlay::new(
            payload.traces.clone().unwrap_or_default(),
            render.trace_height,
        );

        Self {
            gpu,
            mesh,
            draw2d,
            traces,
            text: TextOverlay::new(font),
            frame_count: payload.frame_count(),
            background: render.background,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut GpuContext {
        &mut self.gpu
    }

    /// Draw the batched 2D geometry over `frame` and reset the batch.
    fn flush_overlay(&mut self, frame: &Frame) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw2d
                .render(&self.gpu, &mut render_pass, (frame.width, frame.height));
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.draw2d.clear();
    }
}

fn load_font(gpu: &GpuContext, render: &RenderConfig) -> Option<FontAtlas> {
    let Some(path) = render.font_path.clone().or_else(find_system_font) else {
        log::warn!("No font found, hover labels disabled");
        return None;
    };
    match FontAtlas::load(gpu, &path, render.font_size) {
        Ok(font) => {
            log::info!("Loaded font {}", path.display());
            Some(font)
        }
        Err(e) => {
            log::warn!("{}, hover labels disabled", e);
            None
        }
    }
}

impl FrameBackend for GpuBackend {
    type Target = Frame;

    fn acquire(&mut self) -> Result<Option<Frame>> {
        self.gpu.acquire()
    }

    fn target_size(&self, target: &Frame) -> (u32, u32) {
        (target.width, target.height)
    }

    fn upload_colors(&mut self, colors: &[[f32; 4]]) -> Result<()> {
        self.mesh.update_colors(&self.gpu, colors)
    }

    fn set_mode(&mut self, mode: RenderMode) {
        self.mesh.set_mode(mode);
    }

    fn set_hover(&mut self, region_id: i32) {
        self.mesh.set_hovered(region_id);
    }

    fn draw_mesh(&mut self, target: &Frame, draw: &MeshDraw) -> Result<()> {
        self.mesh.draw(
            &self.gpu,
            &target.view,
            (target.width, target.height),
            draw,
            self.background,
        );
        Ok(())
    }

    fn draw_traces(&mut self, target: &Frame, frame: usize) -> Result<()> {
        if self.traces.is_empty() {
            return Ok(());
        }
        self.traces.draw(
            &mut self.draw2d,
            (target.width, target.height),
            frame,
            self.frame_count,
        );
        self.flush_overlay(target);
        Ok(())
    }

    fn draw_text(&mut self, target: &Frame, text: &str) -> Result<()> {
        if text.is_empty() || self.text.font().is_none() {
            return Ok(());
        }
        self.text.draw(&mut self.draw2d, text);
        self.flush_overlay(target);
        Ok(())
    }

    fn clear(&mut self, target: &Frame, color: [f32; 4]) {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_wgpu_color(color)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.draw2d.clear();
    }

    fn finish(&mut self, target: Frame) -> Result<()> {
        self.gpu.finish(target)
    }
}
