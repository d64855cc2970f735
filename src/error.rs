//! Error taxonomy for the viewer.
//!
//! Errors are split into two families: fatal ones that stop the viewport until
//! it is rebuilt, and transient ones that only cost a single frame.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced by the viewer core.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("no suitable GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface reports no supported formats")]
    SurfaceUnsupported,
    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("offscreen readback failed: {0}")]
    Readback(String),
    #[error("{what}: expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: String,
        actual: String,
    },
    #[error("failed to load font: {0}")]
    Font(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

impl ViewerError {
    pub(crate) fn shape(
        what: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::Shape {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this error should halt the render loop.
    ///
    /// Device and surface setup failures need external reinitialization. Frame
    /// acquisition and readback failures are retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        match self {
            ViewerError::Surface(wgpu::SurfaceError::OutOfMemory) => true,
            ViewerError::Surface(_) | ViewerError::Readback(_) => false,
            ViewerError::AdapterUnavailable
            | ViewerError::Device(_)
            | ViewerError::CreateSurface(_)
            | ViewerError::SurfaceUnsupported
            | ViewerError::EventLoop(_)
            | ViewerError::Window(_) => true,
            ViewerError::Shape { .. } | ViewerError::Font(_) | ViewerError::Config(_) => true,
        }
    }
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_timeouts_are_transient() {
        assert!(!ViewerError::Surface(wgpu::SurfaceError::Timeout).is_fatal());
        assert!(!ViewerError::Surface(wgpu::SurfaceError::Outdated).is_fatal());
        assert!(!ViewerError::Readback("map".into()).is_fatal());
    }

    #[test]
    fn setup_failures_are_fatal() {
        assert!(ViewerError::AdapterUnavailable.is_fatal());
        assert!(ViewerError::SurfaceUnsupported.is_fatal());
        assert!(ViewerError::Surface(wgpu::SurfaceError::OutOfMemory).is_fatal());
    }

    #[test]
    fn shape_error_message() {
        let err = ViewerError::shape("labels", 4, 3);
        assert_eq!(err.to_string(), "labels: expected 4, got 3");
    }
}
