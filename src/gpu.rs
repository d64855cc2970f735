//! Core GPU context and draw-target management.
//!
//! [`GpuContext`] holds the wgpu device and queue plus one draw target: a
//! window surface, or an offscreen texture that is read back after every
//! frame. Both targets hand out a [`Frame`] through [`GpuContext::acquire`] and
//! take it back through [`GpuContext::finish`], so the render loop does not
//! care which one it is driving.
//!
//! # Example
//!
//! ```no_run
//! use cortexview::GpuContext;
//!
//! let mut gpu = GpuContext::new_headless(320, 240)?;
//! if let Some(frame) = gpu.acquire()? {
//!     gpu.finish(frame)?;
//! }
//! let image = gpu.last_readback();
//! assert_eq!(image.rgba.len(), 320 * 240 * 4);
//! # Ok::<(), cortexview::ViewerError>(())
//! ```

use std::sync::Arc;
use winit::window::Window;

use crate::error::{Result, ViewerError};

/// Depth buffer format shared by every pass that tests depth.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Format of the offscreen target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Tightly packed RGBA8 pixels from the last offscreen frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Readback {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Readback {
    /// Opaque black image, what the target shows before anything is drawn.
    pub fn black(width: u32, height: u32) -> Self {
        let rgba = [0, 0, 0, 255].repeat((width * height) as usize);
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.rgba.get(i..i + 4).and_then(|p| p.try_into().ok())
    }
}

/// Bytes per row rounded up to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop row padding and convert to RGBA.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_row: u32, bgra: bool) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_row as usize;
        out.extend_from_slice(&data[start..start + row_bytes]);
    }
    if bgra {
        for px in out.chunks_exact_mut(4) {
            px.swap(0, 2);
        }
    }
    out
}

/// Offscreen color target plus the buffer it is copied into.
struct Offscreen {
    texture: wgpu::Texture,
    buffer: wgpu::Buffer,
    padded_row: u32,
    last: Readback,
}

impl Offscreen {
    fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: config.usage,
            view_formats: &[],
        });
        let padded_row = padded_bytes_per_row(config.width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Readback"),
            size: (padded_row * config.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            texture,
            buffer,
            padded_row,
            last: Readback::black(config.width, config.height),
        }
    }
}

enum Presenter {
    Window(wgpu::Surface<'static>),
    Offscreen(Offscreen),
}

enum FrameKind {
    Surface(wgpu::SurfaceTexture),
    Offscreen,
}

/// A color target acquired for one frame.
pub struct Frame {
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    kind: FrameKind,
}

/// Core GPU context holding wgpu resources.
///
/// `config` describes the current target (format and size) for both the
/// window and offscreen cases.
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current target configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    presenter: Presenter,
    /// Set while the window is minimized; frames are skipped.
    zero_sized: bool,
}

fn device_descriptor(label: &str) -> wgpu::DeviceDescriptor<'_> {
    wgpu::DeviceDescriptor {
        label: Some(label),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }
}

impl GpuContext {
    /// Create a context that presents to a winit window.
    ///
    /// Prefers an sRGB surface format and Fifo presentation.
    pub fn new_windowed(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|_| ViewerError::AdapterUnavailable)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) =
            pollster::block_on(adapter.request_device(&device_descriptor("Cortexview Device")))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(ViewerError::SurfaceUnsupported)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {:?} {}x{}",
            config.format,
            config.width,
            config.height
        );

        Ok(Self {
            device,
            queue,
            config,
            presenter: Presenter::Window(surface),
            zero_sized: size.width == 0 || size.height == 0,
        })
    }

    /// Create a context that renders into an offscreen texture.
    pub fn new_headless(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|_| ViewerError::AdapterUnavailable)?;
        log::info!("Using adapter (headless): {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(
            adapter.request_device(&device_descriptor("Cortexview Device (headless)")),
        )?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: OFFSCREEN_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let offscreen = Offscreen::new(&device, &config);

        Ok(Self {
            device,
            queue,
            config,
            presenter: Presenter::Offscreen(offscreen),
            zero_sized: width == 0 || height == 0,
        })
    }

    /// Resize the target.
    ///
    /// A zero dimension is remembered and makes [`Self::acquire`] skip frames
    /// until a real size arrives.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.zero_sized = width == 0 || height == 0;
        if self.zero_sized || (width, height) == (self.config.width, self.config.height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        match &mut self.presenter {
            Presenter::Window(surface) => surface.configure(&self.device, &self.config),
            Presenter::Offscreen(offscreen) => *offscreen = Offscreen::new(&self.device, &self.config),
        }
        log::debug!("Target resized to {}x{}", width, height);
    }

    /// Returns the current target width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current target height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Get the next color target.
    ///
    /// `Ok(None)` means skip this frame: the target is zero-sized, or the
    /// surface was outdated and has just been reconfigured.
    pub fn acquire(&mut self) -> Result<Option<Frame>> {
        if self.zero_sized {
            return Ok(None);
        }
        let (width, height) = (self.config.width, self.config.height);
        match &self.presenter {
            Presenter::Window(surface) => match surface.get_current_texture() {
                Ok(texture) => {
                    let view = texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    Ok(Some(Frame {
                        view,
                        width,
                        height,
                        kind: FrameKind::Surface(texture),
                    }))
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::debug!("Surface lost or outdated, reconfiguring");
                    surface.configure(&self.device, &self.config);
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            },
            Presenter::Offscreen(offscreen) => {
                let view = offscreen
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(Frame {
                    view,
                    width,
                    height,
                    kind: FrameKind::Offscreen,
                }))
            }
        }
    }

    /// Present the frame, or read it back for an offscreen target.
    pub fn finish(&mut self, frame: Frame) -> Result<()> {
        match frame.kind {
            FrameKind::Surface(texture) => {
                texture.present();
                Ok(())
            }
            FrameKind::Offscreen => self.read_back(),
        }
    }

    /// Last frame read back from the offscreen target.
    ///
    /// Opaque black before the first frame, and for window targets.
    pub fn last_readback(&self) -> Readback {
        match &self.presenter {
            Presenter::Offscreen(offscreen) => offscreen.last.clone(),
            Presenter::Window(_) => Readback::black(self.width(), self.height()),
        }
    }

    fn read_back(&mut self) -> Result<()> {
        let Presenter::Offscreen(offscreen) = &mut self.presenter else {
            return Ok(());
        };
        let (width, height) = (self.config.width, self.config.height);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &offscreen.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &offscreen.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(offscreen.padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = offscreen.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| ViewerError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| ViewerError::Readback(e.to_string()))?
            .map_err(|e| ViewerError::Readback(e.to_string()))?;

        let bgra = matches!(
            self.config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let rgba = {
            let data = slice.get_mapped_range();
            unpad_rows(&data, width, height, offscreen.padded_row, bgra)
        };
        offscreen.buffer.unmap();

        offscreen.last = Readback {
            width,
            height,
            rgba,
        };
        Ok(())
    }
}
