//! Screen-space vertex picking for hover detection.
//!
//! Picking projects every mesh vertex with the same matrix the renderer
//! uploads (see [`crate::projection`]) and looks for vertices near the cursor in
//! NDC. Among those, the one nearest the camera wins, so a surface in front
//! shadows whatever lies behind it at the same screen position.
//!
//! # Example
//!
//! ```
//! use cortexview::{screen_to_ndc, Vec2};
//!
//! let ndc = screen_to_ndc(400.0, 300.0, 800.0, 600.0);
//! assert_eq!(ndc, Vec2::ZERO);
//! ```

use glam::{Mat4, Vec2, Vec3};

use crate::payload::{HoverState, SurfaceMesh};
use crate::projection::{self, DepthRange};

/// Default pick radius in NDC units.
///
/// Fixed in NDC, so it covers a larger pixel area on larger viewports.
pub const DEFAULT_THRESHOLD: f32 = 0.05;

/// Convert window pixels to normalized device coordinates.
///
/// Screen Y grows downward, NDC Y grows upward.
pub fn screen_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    let ndc_x = (x / width) * 2.0 - 1.0;
    let ndc_y = -((y / height) * 2.0 - 1.0);
    Vec2::new(ndc_x, ndc_y)
}

/// A vertex that survived projection, ready for candidate selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedVertex {
    pub index: usize,
    /// NDC position; `z` is depth in the projection's convention.
    pub ndc: Vec3,
}

/// Information about the picked vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct PickHit {
    pub vertex: usize,
    pub region_id: i32,
    pub region_name: String,
    /// NDC depth of the vertex.
    pub depth: f32,
}

impl From<PickHit> for HoverState {
    fn from(hit: PickHit) -> Self {
        HoverState {
            region_id: hit.region_id,
            region_name: hit.region_name,
        }
    }
}

/// Result of a pick: `None` means nothing labeled under the cursor.
pub type PickResult = Option<PickHit>;

/// Vertex picker with a fixed NDC threshold.
#[derive(Clone, Copy, Debug)]
pub struct Picker {
    pub threshold: f32,
    pub depth_range: DepthRange,
}

impl Default for Picker {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            depth_range: DepthRange::default(),
        }
    }
}

impl Picker {
    pub fn new(threshold: f32, depth_range: DepthRange) -> Self {
        Self {
            threshold,
            depth_range,
        }
    }

    /// Project mesh vertices, dropping those behind the camera or outside the
    /// depth range.
    pub fn project_vertices<'a>(
        &'a self,
        mesh: &'a SurfaceMesh,
        clip_from_model: &'a Mat4,
    ) -> impl Iterator<Item = ProjectedVertex> + 'a {
        mesh.vertices()
            .iter()
            .enumerate()
            .filter(|(_, p)| projection::in_front(clip_from_model, **p))
            .filter_map(|(index, &p)| {
                projection::project(clip_from_model, p).map(|ndc| ProjectedVertex { index, ndc })
            })
            .filter(|v| self.depth_range.contains(v.ndc.z))
    }

    /// Frontmost point strictly inside the threshold around `cursor`.
    ///
    /// Ties on depth keep the earlier point.
    pub fn select_frontmost(
        &self,
        points: impl IntoIterator<Item = ProjectedVertex>,
        cursor: Vec2,
    ) -> Option<ProjectedVertex> {
        let threshold_sq = self.threshold * self.threshold;
        points
            .into_iter()
            .filter(|p| p.ndc.truncate().distance_squared(cursor) < threshold_sq)
            .fold(None, |best: Option<ProjectedVertex>, p| match best {
                Some(b) if b.ndc.z <= p.ndc.z => Some(b),
                _ => Some(p),
            })
    }

    /// Find the labeled region under a cursor.
    ///
    /// `clip_from_model` must be [`crate::Projection::clip_from_model`] for the
    /// frame being displayed. Returns `None` for an empty viewport, no nearby
    /// vertex, or a frontmost vertex whose label has no region.
    pub fn pick(
        &self,
        mesh: &SurfaceMesh,
        clip_from_model: &Mat4,
        cursor: Vec2,
        viewport: (u32, u32),
    ) -> PickResult {
        let (width, height) = viewport;
        if width == 0 || height == 0 {
            return None;
        }
        let cursor_ndc = screen_to_ndc(cursor.x, cursor.y, width as f32, height as f32);
        let best = self.select_frontmost(self.project_vertices(mesh, clip_from_model), cursor_ndc)?;

        let region_id = mesh.labels()[best.index];
        let region_name = mesh.region_name(region_id)?;
        Some(PickHit {
            vertex: best.index,
            region_id,
            region_name: region_name.to_string(),
            depth: best.ndc.z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit_camera::OrbitCamera;
    use crate::projection::Projection;

    const W: u32 = 800;
    const H: u32 = 600;

    fn projected(index: usize, x: f32, y: f32, z: f32) -> ProjectedVertex {
        ProjectedVertex {
            index,
            ndc: Vec3::new(x, y, z),
        }
    }

    /// Inverse of `screen_to_ndc`.
    fn ndc_to_screen(ndc: Vec3) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * W as f32,
            (1.0 - ndc.y) * 0.5 * H as f32,
        )
    }

    fn region_names() -> Vec<String> {
        let mut names: Vec<String> = (0..8).map(|i| format!("region_{i}")).collect();
        names[7] = "motor_cortex".to_string();
        names
    }

    /// Eye at (0, 0, 5) looking at the origin.
    fn front_camera() -> OrbitCamera {
        let mut camera = OrbitCamera::new().distance(5.0);
        camera.yaw = 0.0;
        camera.pitch = 0.0;
        camera
    }

    fn scene() -> (SurfaceMesh, Mat4) {
        let mesh = SurfaceMesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.5, 0.5, 0.2),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            vec![0, 3, 7, 8],
            region_names(),
        )
        .unwrap();
        let clip = Projection::default().clip_from_model(
            W as f32 / H as f32,
            front_camera().view_matrix(),
            mesh.transform.matrix(),
        );
        (mesh, clip)
    }

    #[test]
    fn ndc_conversion_corners() {
        for (w, h) in [(800.0, 600.0), (1.0, 1.0), (1920.0, 37.0)] {
            assert_eq!(screen_to_ndc(w / 2.0, h / 2.0, w, h), Vec2::ZERO);
            assert_eq!(screen_to_ndc(0.0, 0.0, w, h), Vec2::new(-1.0, 1.0));
            assert_eq!(screen_to_ndc(w, h, w, h), Vec2::new(1.0, -1.0));
        }
    }

    #[test]
    fn frontmost_beats_closest() {
        let picker = Picker::default();
        let points = [
            projected(0, 0.005, 0.0, 0.8),
            projected(1, 0.009, 0.0, 0.3),
            projected(2, 0.02, 0.02, 0.5),
        ];
        let best = picker.select_frontmost(points, Vec2::ZERO).unwrap();
        assert_eq!(best.index, 1);
    }

    #[test]
    fn outside_threshold_is_ignored() {
        let picker = Picker::default();
        let points = [projected(0, 0.06, 0.0, 0.1), projected(1, 0.04, 0.0, 0.9)];
        assert_eq!(picker.select_frontmost(points, Vec2::ZERO).unwrap().index, 1);

        // Exactly on the threshold does not count.
        let points = [projected(0, 0.05, 0.0, 0.1)];
        assert!(picker.select_frontmost(points, Vec2::ZERO).is_none());
    }

    #[test]
    fn end_to_end_motor_cortex() {
        let (mesh, clip) = scene();
        let ndc = projection::project(&clip, mesh.vertices()[2]).unwrap();
        let hit = Picker::default()
            .pick(&mesh, &clip, ndc_to_screen(ndc), (W, H))
            .unwrap();
        assert_eq!(hit.vertex, 2);
        assert_eq!(hit.region_id, 7);
        assert_eq!(hit.region_name, "motor_cortex");
    }

    #[test]
    fn cursor_on_any_vertex_hits_it() {
        let (mesh, clip) = scene();
        let picker = Picker::new(0.01, DepthRange::ZeroToOne);
        for (i, &p) in mesh.vertices().iter().enumerate() {
            let ndc = projection::project(&clip, p).unwrap();
            let hit = picker.pick(&mesh, &clip, ndc_to_screen(ndc), (W, H));
            // Vertex 3 carries label 8, which has no region.
            match mesh.region_name(mesh.labels()[i]) {
                Some(name) => assert_eq!(hit.unwrap().region_name, name),
                None => assert!(hit.is_none()),
            }
        }
    }

    #[test]
    fn out_of_range_labels_never_pick() {
        let mesh = SurfaceMesh::new(
            vec![Vec3::ZERO, Vec3::new(0.01, 0.0, 0.0)],
            vec![],
            vec![2, -1],
            vec!["a".into(), "b".into()],
        )
        .unwrap();
        let (_, clip) = scene();
        let picker = Picker::new(1.0, DepthRange::ZeroToOne);
        for (x, y) in [(0.0, 0.0), (400.0, 300.0), (800.0, 600.0), (123.0, 456.0)] {
            assert!(picker.pick(&mesh, &clip, Vec2::new(x, y), (W, H)).is_none());
        }
    }

    #[test]
    fn empty_space_and_empty_viewport_miss() {
        let (mesh, clip) = scene();
        let picker = Picker::default();
        assert!(picker.pick(&mesh, &clip, Vec2::new(0.0, 0.0), (W, H)).is_none());
        assert!(picker.pick(&mesh, &clip, Vec2::new(400.0, 300.0), (0, H)).is_none());
    }

    #[test]
    fn nearer_surface_wins_over_hidden_one() {
        // Two vertices on the view axis; the one nearer the eye (+Z) must win.
        let mesh = SurfaceMesh::new(
            vec![Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0)],
            vec![],
            vec![0, 1],
            vec!["back".into(), "front".into()],
        )
        .unwrap();
        let (_, clip) = scene();
        let hit = Picker::default()
            .pick(&mesh, &clip, Vec2::new(400.0, 300.0), (W, H))
            .unwrap();
        assert_eq!(hit.region_name, "front");
    }

    #[test]
    fn behind_camera_is_rejected() {
        let mesh = SurfaceMesh::new(
            vec![Vec3::new(0.0, 0.0, 8.0)],
            vec![],
            vec![0],
            vec!["ghost".into()],
        )
        .unwrap();
        let (_, clip) = scene();
        let picker = Picker::new(2.0, DepthRange::NegOneToOne);
        assert!(picker.pick(&mesh, &clip, Vec2::new(400.0, 300.0), (W, H)).is_none());
    }

    #[test]
    fn gl_depth_range_picks_identically() {
        let (mesh, _) = scene();
        let projection = Projection {
            depth_range: DepthRange::NegOneToOne,
            ..Projection::default()
        };
        let clip = projection.clip_from_model(
            W as f32 / H as f32,
            front_camera().view_matrix(),
            Mat4::IDENTITY,
        );
        let ndc = projection::project(&clip, mesh.vertices()[2]).unwrap();
        let hit = Picker::new(DEFAULT_THRESHOLD, DepthRange::NegOneToOne)
            .pick(&mesh, &clip, ndc_to_screen(ndc), (W, H))
            .unwrap();
        assert_eq!(hit.region_name, "motor_cortex");
    }
}
