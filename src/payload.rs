//! Session data handed over by the loading collaborator.
//!
//! Everything here is immutable once the viewport starts: one mesh topology,
//! its labels, and the color sources for both render modes. Shape checks run in
//! the constructors so the render loop never has to.

use glam::{Mat4, Quat, Vec3};

use crate::error::{Result, ViewerError};

/// Placement of the mesh in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Model matrix: scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Triangle surface with one region label per vertex.
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    vertices: Vec<Vec3>,
    faces: Vec<[u32; 3]>,
    labels: Vec<i32>,
    region_names: Vec<String>,
    pub transform: Transform,
}

impl SurfaceMesh {
    /// Validates and wraps a mesh payload.
    ///
    /// Labels may hold sentinels outside `[0, region_names.len())`; those
    /// vertices are simply never pickable.
    pub fn new(
        vertices: Vec<Vec3>,
        faces: Vec<[u32; 3]>,
        labels: Vec<i32>,
        region_names: Vec<String>,
    ) -> Result<Self> {
        if labels.len() != vertices.len() {
            return Err(ViewerError::shape(
                "labels per vertex",
                vertices.len(),
                labels.len(),
            ));
        }
        if let Some(bad) = faces
            .iter()
            .flatten()
            .find(|&&i| i as usize >= vertices.len())
        {
            return Err(ViewerError::shape(
                "face index",
                format!("< {}", vertices.len()),
                bad,
            ));
        }
        Ok(Self {
            vertices,
            faces,
            labels,
            region_names,
            transform: Transform::default(),
        })
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn region_names(&self) -> &[String] {
        &self.region_names
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn region_count(&self) -> usize {
        self.region_names.len()
    }

    /// Name of a region, or `None` for labels outside `[0, region_count)`.
    pub fn region_name(&self, label: i32) -> Option<&str> {
        usize::try_from(label)
            .ok()
            .and_then(|i| self.region_names.get(i))
            .map(String::as_str)
    }

    /// Axis-aligned bounds in model space, `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &p in &self.vertices {
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Radius of the bounding sphere around [`Self::center`].
    pub fn radius(&self) -> f32 {
        let (min, max) = self.bounds();
        (max - min).length() * 0.5
    }

    /// Smooth per-vertex normals, area weighted.
    ///
    /// Vertices that belong to no face get `+Y`.
    pub fn normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for &[a, b, c] in &self.faces {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            let p0 = self.vertices[a];
            let face_normal = (self.vertices[b] - p0).cross(self.vertices[c] - p0);
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }
        normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
            .collect()
    }
}

/// Expands `channels` samples into RGBA.
fn to_rgba(samples: &[f32]) -> [f32; 4] {
    match *samples {
        [v] => [v, v, v, 1.0],
        [r, g, b] => [r, g, b, 1.0],
        [r, g, b, a] => [r, g, b, a],
        _ => [0.0, 0.0, 0.0, 1.0],
    }
}

fn check_channels(what: &'static str, channels: usize) -> Result<()> {
    match channels {
        1 | 3 | 4 => Ok(()),
        other => Err(ViewerError::shape(what, "1, 3 or 4 channels", other)),
    }
}

/// Animated per-vertex colors, shape `(vertex, frame, channel)`, row major.
#[derive(Clone, Debug)]
pub struct ColorFrames {
    data: Vec<f32>,
    vertex_count: usize,
    frame_count: usize,
    channels: usize,
}

impl ColorFrames {
    pub fn new(
        data: Vec<f32>,
        vertex_count: usize,
        frame_count: usize,
        channels: usize,
    ) -> Result<Self> {
        check_channels("color frame channels", channels)?;
        if frame_count == 0 {
            return Err(ViewerError::shape("color frame count", ">= 1", 0));
        }
        let expected = vertex_count * frame_count * channels;
        if data.len() != expected {
            return Err(ViewerError::shape("color frame samples", expected, data.len()));
        }
        Ok(Self {
            data,
            vertex_count,
            frame_count,
            channels,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// RGBA of one vertex at one frame.
    pub fn sample(&self, vertex: usize, frame: usize) -> [f32; 4] {
        let start = (vertex * self.frame_count + frame) * self.channels;
        to_rgba(&self.data[start..start + self.channels])
    }

    /// Fill `out` with the slice `[:, frame, :]` as RGBA.
    ///
    /// Reuses the caller's buffer so the per-frame path does not allocate once
    /// warmed up. Out-of-range frames wrap.
    pub fn write_frame(&self, frame: usize, out: &mut Vec<[f32; 4]>) {
        let frame = frame % self.frame_count;
        out.clear();
        out.extend((0..self.vertex_count).map(|v| self.sample(v, frame)));
    }
}

/// Static per-vertex colors for atlas mode, shape `(vertex, channel)`.
#[derive(Clone, Debug)]
pub struct AtlasColors {
    colors: Vec<[f32; 4]>,
}

impl AtlasColors {
    pub fn new(data: Vec<f32>, vertex_count: usize, channels: usize) -> Result<Self> {
        check_channels("atlas channels", channels)?;
        if data.len() != vertex_count * channels {
            return Err(ViewerError::shape(
                "atlas samples",
                vertex_count * channels,
                data.len(),
            ));
        }
        Ok(Self {
            colors: data.chunks_exact(channels).map(to_rgba).collect(),
        })
    }

    pub fn as_rgba(&self) -> &[[f32; 4]] {
        &self.colors
    }

    pub fn vertex_count(&self) -> usize {
        self.colors.len()
    }
}

/// Channel by sample matrix for the butterfly overlay.
#[derive(Clone, Debug, Default)]
pub struct Traces {
    channels: Vec<Vec<f32>>,
}

impl Traces {
    /// All channels must have the same length.
    pub fn new(channels: Vec<Vec<f32>>) -> Result<Self> {
        if let Some(first) = channels.first() {
            if let Some(bad) = channels.iter().find(|c| c.len() != first.len()) {
                return Err(ViewerError::shape("trace samples", first.len(), bad.len()));
            }
        }
        Ok(Self { channels })
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn sample_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    /// `(min, max)` over all finite samples, `None` when there are none.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.channels
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Everything the viewport needs for one session.
#[derive(Clone, Debug)]
pub struct Payload {
    pub mesh: SurfaceMesh,
    pub color_frames: Option<ColorFrames>,
    pub atlas_colors: Option<AtlasColors>,
    pub traces: Option<Traces>,
}

impl Payload {
    pub fn new(mesh: SurfaceMesh) -> Self {
        Self {
            mesh,
            color_frames: None,
            atlas_colors: None,
            traces: None,
        }
    }

    pub fn with_color_frames(mut self, frames: ColorFrames) -> Self {
        self.color_frames = Some(frames);
        self
    }

    pub fn with_atlas_colors(mut self, atlas: AtlasColors) -> Self {
        self.atlas_colors = Some(atlas);
        self
    }

    pub fn with_traces(mut self, traces: Traces) -> Self {
        self.traces = Some(traces);
        self
    }

    /// Number of animation frames; 1 when there is no dynamic data.
    pub fn frame_count(&self) -> usize {
        self.color_frames.as_ref().map_or(1, ColorFrames::frame_count)
    }

    /// Cross-checks vertex counts between the mesh and its color sources.
    pub fn validate(&self) -> Result<()> {
        let n = self.mesh.vertex_count();
        if let Some(frames) = &self.color_frames {
            if frames.vertex_count() != n {
                return Err(ViewerError::shape(
                    "color frame vertices",
                    n,
                    frames.vertex_count(),
                ));
            }
        }
        if let Some(atlas) = &self.atlas_colors {
            if atlas.vertex_count() != n {
                return Err(ViewerError::shape("atlas vertices", n, atlas.vertex_count()));
            }
        }
        Ok(())
    }
}

/// Region under the cursor. `region_id` is -1 when nothing is hovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverState {
    pub region_id: i32,
    pub region_name: String,
}

impl HoverState {
    pub const NONE: HoverState = HoverState {
        region_id: -1,
        region_name: String::new(),
    };

    pub fn is_none(&self) -> bool {
        self.region_id < 0
    }
}

impl Default for HoverState {
    fn default() -> Self {
        Self::NONE
    }
}

/// Which color source feeds the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Dynamic,
    Atlas,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Dynamic => RenderMode::Atlas,
            RenderMode::Atlas => RenderMode::Dynamic,
        }
    }

    /// Value passed to the surface shader.
    pub fn shader_value(self) -> f32 {
        match self {
            RenderMode::Dynamic => 0.0,
            RenderMode::Atlas => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetra() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
                Vec3::new(0.0, 0.0, 6.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
            vec![0, 1, -1, 2],
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap()
    }

    #[test]
    fn mesh_bounds_and_center() {
        let mesh = tetra();
        let (min, max) = mesh.bounds();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(mesh.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn region_name_bounds_check() {
        let mesh = tetra();
        assert_eq!(mesh.region_name(0), Some("a"));
        assert_eq!(mesh.region_name(2), Some("c"));
        assert_eq!(mesh.region_name(3), None);
        assert_eq!(mesh.region_name(-1), None);
        assert_eq!(mesh.region_name(i32::MIN), None);
    }

    #[test]
    fn rejects_mismatched_labels_and_bad_faces() {
        let err = SurfaceMesh::new(vec![Vec3::ZERO; 3], vec![], vec![0, 0], vec![]).unwrap_err();
        assert!(matches!(err, ViewerError::Shape { .. }));

        let err =
            SurfaceMesh::new(vec![Vec3::ZERO; 3], vec![[0, 1, 3]], vec![0; 3], vec![]).unwrap_err();
        assert!(matches!(err, ViewerError::Shape { what: "face index", .. }));
    }

    #[test]
    fn normals_are_unit_and_outward() {
        let mesh = tetra();
        let normals = mesh.normals();
        let center = mesh.vertices().iter().copied().sum::<Vec3>() / 4.0;
        for (p, n) in mesh.vertices().iter().zip(&normals) {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.dot(*p - center) > 0.0);
        }
    }

    #[test]
    fn isolated_vertex_normal_defaults_up() {
        let mesh = SurfaceMesh::new(vec![Vec3::ZERO], vec![], vec![0], vec![]).unwrap();
        assert_eq!(mesh.normals(), vec![Vec3::Y]);
    }

    #[test]
    fn color_frame_slicing() {
        // 2 vertices, 3 frames, 1 channel: value = vertex * 10 + frame.
        let data = vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        let frames = ColorFrames::new(data, 2, 3, 1).unwrap();
        let mut out = Vec::new();
        frames.write_frame(1, &mut out);
        assert_eq!(out, vec![[1.0, 1.0, 1.0, 1.0], [11.0, 11.0, 11.0, 1.0]]);

        frames.write_frame(5, &mut out);
        assert_eq!(out[1], [12.0, 12.0, 12.0, 1.0]);
    }

    #[test]
    fn color_frames_check_shape() {
        assert!(ColorFrames::new(vec![0.0; 5], 2, 3, 1).is_err());
        assert!(ColorFrames::new(vec![0.0; 12], 2, 3, 2).is_err());
        assert!(ColorFrames::new(vec![], 2, 0, 4).is_err());
    }

    #[test]
    fn atlas_expands_rgb() {
        let atlas = AtlasColors::new(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 2, 3).unwrap();
        assert_eq!(atlas.as_rgba()[1], [0.4, 0.5, 0.6, 1.0]);
    }

    #[test]
    fn payload_cross_checks_vertex_counts() {
        let payload = Payload::new(tetra())
            .with_atlas_colors(AtlasColors::new(vec![1.0; 3], 3, 1).unwrap());
        assert!(payload.validate().is_err());

        let payload = Payload::new(tetra())
            .with_color_frames(ColorFrames::new(vec![0.0; 4 * 7 * 4], 4, 7, 4).unwrap());
        payload.validate().unwrap();
        assert_eq!(payload.frame_count(), 7);
    }

    #[test]
    fn trace_range_skips_non_finite() {
        let traces = Traces::new(vec![vec![1.0, -2.0, f32::NAN], vec![0.5, 3.0, 0.0]]).unwrap();
        assert_eq!(traces.value_range(), Some((-2.0, 3.0)));
        assert_eq!(traces.sample_count(), 3);
        assert!(Traces::new(vec![vec![1.0], vec![]]).is_err());
    }

    #[test]
    fn render_mode_toggle() {
        assert_eq!(RenderMode::Dynamic.toggled(), RenderMode::Atlas);
        assert_eq!(RenderMode::Atlas.toggled().shader_value(), 0.0);
        assert!(HoverState::default().is_none());
    }
}
