//! The one place model-view-projection matrices are built.
//!
//! Both the mesh renderer and the picker go through [`Projection`], so a vertex
//! lands on the same NDC position whether it is rasterized or hit-tested.
//!
//! Convention: glam column vectors, `clip = P * V * M * v`.
//!
//! Two depth ranges are supported:
//!
//! - [`DepthRange::ZeroToOne`]: `perspective_rh`, NDC depth in `[0, 1]`, which
//!   is what wgpu rasterizes natively. No correction.
//! - [`DepthRange::NegOneToOne`]: `perspective_rh_gl`, NDC depth in `[-1, 1]`.
//!   The renderer prepends [`Projection::depth_correction`] before upload so the
//!   GPU still sees `[0, 1]`. Picking works on the uncorrected matrix and
//!   filters against `[-1, 1]`.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;

/// Smallest `|w|` used in the perspective divide.
pub const W_EPSILON: f32 = 1e-10;

/// Remaps GL clip depth `[-w, w]` to wgpu's `[0, w]`.
#[rustfmt::skip]
pub const GL_TO_WGPU: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

/// NDC depth range produced by the projection matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthRange {
    #[default]
    ZeroToOne,
    NegOneToOne,
}

impl DepthRange {
    pub fn bounds(self) -> (f32, f32) {
        match self {
            DepthRange::ZeroToOne => (0.0, 1.0),
            DepthRange::NegOneToOne => (-1.0, 1.0),
        }
    }

    /// Inclusive depth test.
    pub fn contains(self, z: f32) -> bool {
        let (lo, hi) = self.bounds();
        z >= lo && z <= hi
    }
}

/// Perspective projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub depth_range: DepthRange,
}

impl Default for Projection {
    fn default() -> Self {
        Self::from_config(&ProjectionConfig::default())
    }
}

impl Projection {
    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self {
            fov_y: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            depth_range: config.depth_range,
        }
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        match self.depth_range {
            DepthRange::ZeroToOne => Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far),
            DepthRange::NegOneToOne => {
                Mat4::perspective_rh_gl(self.fov_y, aspect, self.near, self.far)
            }
        }
    }

    /// `P * V * M` in this projection's depth convention.
    pub fn clip_from_model(&self, aspect: f32, view: Mat4, model: Mat4) -> Mat4 {
        self.projection_matrix(aspect) * view * model
    }

    pub fn depth_correction(&self) -> Mat4 {
        match self.depth_range {
            DepthRange::ZeroToOne => Mat4::IDENTITY,
            DepthRange::NegOneToOne => GL_TO_WGPU,
        }
    }

    /// The matrix the renderer uploads: [`Self::clip_from_model`] mapped to wgpu depth.
    pub fn gpu_matrix(&self, aspect: f32, view: Mat4, model: Mat4) -> Mat4 {
        self.depth_correction() * self.clip_from_model(aspect, view, model)
    }
}

/// Transform a point to NDC.
///
/// The divisor is clamped away from zero (keeping its sign) so points on the
/// camera plane come out huge instead of infinite or NaN. Returns `None` only
/// for non-finite input.
pub fn project(clip_from_model: &Mat4, point: Vec3) -> Option<Vec3> {
    let clip: Vec4 = *clip_from_model * point.extend(1.0);
    let w = if clip.w.abs() < W_EPSILON {
        if clip.w.is_sign_negative() {
            -W_EPSILON
        } else {
            W_EPSILON
        }
    } else {
        clip.w
    };
    let ndc = clip.truncate() / w;
    ndc.is_finite().then_some(ndc)
}

/// Whether a clip-space point lies in front of the camera.
///
/// Perspective division flips points behind the eye back into the depth range,
/// so the sign of `w` is checked separately.
pub fn in_front(clip_from_model: &Mat4, point: Vec3) -> bool {
    (*clip_from_model * point.extend(1.0)).w > 0.0
}
