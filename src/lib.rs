//! # Cortexview
//!
//! **An interactive wgpu viewer for animated, labeled cortical surfaces.**
//!
//! Hand it a triangle mesh with one region label per vertex plus per-frame
//! vertex colors, and it plays the animation, orbits with the mouse, and names
//! the region under the cursor.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cortexview::*;
//!
//! fn main() -> Result<(), ViewerError> {
//!     let payload = demo::hemisphere(&demo::DemoSettings::default())?;
//!     run(ViewerConfig::load_default(), payload)
//! }
//! ```
//!
//! ## Layout
//!
//! - [`ViewportContext`] holds all per-viewport state and [`render_frame`]
//!   draws one frame from it through a [`FrameBackend`].
//! - [`GpuBackend`] is the wgpu backend, targeting a window or an offscreen
//!   texture ([`GpuContext::new_headless`]).
//! - Picking and rendering share one matrix builder ([`Projection`]), so hover
//!   always matches what is on screen.
//! - Controls: `T` toggles dynamic/atlas colors, `P` the trace plot, `Space`
//!   play/pause, arrows step, `Home` rewinds, `PageUp`/`PageDown` scrub.

mod app;
mod backend;
mod config;
mod controls;
pub mod demo;
mod draw2d;
mod error;
mod font;
mod gpu;
mod input;
mod mesh_renderer;
mod orbit_camera;
mod overlay;
mod payload;
mod picking;
mod projection;
mod timeline;
mod viewport;

pub use app::run;
pub use backend::{FrameBackend, GpuBackend};
pub use config::{
    CameraConfig, ConfigError, PickingConfig, PlaybackConfig, ProjectionConfig, RenderConfig,
    ViewerConfig, WindowConfig,
};
pub use controls::{PlayButton, PlaybackSlider};
pub use draw2d::{Color, Draw2d, Rect};
pub use error::{Result, ViewerError};
pub use font::FontAtlas;
pub use gpu::{Frame, GpuContext, Readback};
pub use input::{Command, Input, InputAction};
pub use mesh_renderer::{MeshDraw, MeshRenderer};
pub use orbit_camera::{OrbitCamera, PointerButton, PointerEvent};
pub use overlay::{TextOverlay, TraceOverlay, cursor_x, trace_lines};
pub use payload::{
    AtlasColors, ColorFrames, HoverState, Payload, RenderMode, SurfaceMesh, Traces, Transform,
};
pub use picking::{PickHit, PickResult, Picker, screen_to_ndc};
pub use projection::{DepthRange, Projection, project};
pub use timeline::{FrameThrottle, PlayState, Timeline};
pub use viewport::{
    FrameOutcome, LoopState, RenderLoop, UploadState, ViewerEvent, ViewportContext, render_frame,
};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3};
