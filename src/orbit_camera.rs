use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Wheel units per notch (the usual 120-per-detent convention).
const WHEEL_NOTCH: f32 = 120.0;

/// Mouse button as seen by the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Other,
}

/// Pointer input in window pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, button: PointerButton },
    Up { x: f32, y: f32, button: PointerButton },
    Move { x: f32, y: f32 },
    /// Positive `delta_y` zooms out.
    Wheel { x: f32, y: f32, delta_y: f32 },
}

impl PointerEvent {
    pub fn position(&self) -> Vec2 {
        match *self {
            PointerEvent::Down { x, y, .. }
            | PointerEvent::Up { x, y, .. }
            | PointerEvent::Move { x, y }
            | PointerEvent::Wheel { x, y, .. } => Vec2::new(x, y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Drag {
    Orbit { last: Vec2 },
    Pan { last: Vec2 },
}

/// A camera that orbits, pans and zooms around a target point.
///
/// State changes only through [`OrbitCamera::handle_event`]; the view matrix is
/// derived on every call.
///
/// # Example
/// ```
/// use cortexview::{OrbitCamera, PointerButton, PointerEvent};
///
/// let mut orbit = OrbitCamera::new().distance(5.0);
/// orbit.handle_event(PointerEvent::Down { x: 10.0, y: 10.0, button: PointerButton::Primary });
/// orbit.handle_event(PointerEvent::Move { x: 30.0, y: 10.0 });
/// let view = orbit.view_matrix();
/// # let _ = view;
/// ```
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Point the camera orbits around (before panning).
    pub target: Vec3,
    /// Distance from target, kept in `[min_distance, max_distance]`.
    pub distance: f32,
    /// Horizontal angle in radians.
    pub yaw: f32,
    /// Vertical angle in radians, clamped short of the poles.
    pub pitch: f32,
    /// Offset added to the target by panning, in world units.
    pub pan: Vec3,
    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    /// Distance multiplier per wheel notch, > 1.
    pub zoom_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    drag: Option<Drag>,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let min_distance = config.min_distance.max(f32::EPSILON);
        let max_distance = config.max_distance.max(min_distance);
        Self {
            target: Vec3::ZERO,
            distance: config.distance.unwrap_or(5.0).clamp(min_distance, max_distance),
            yaw: config.yaw,
            pitch: config.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            pan: Vec3::ZERO,
            orbit_sensitivity: config.orbit_sensitivity,
            pan_sensitivity: config.pan_sensitivity,
            zoom_factor: config.zoom_factor.max(1.0 + f32::EPSILON),
            min_distance,
            max_distance,
            drag: None,
        }
    }

    /// Set the distance from target.
    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self
    }

    /// Aim at a bounding sphere so it fills the view at the given field of view.
    pub fn frame_bounds(&mut self, center: Vec3, radius: f32, fov_y: f32) {
        self.target = center;
        self.pan = Vec3::ZERO;
        let half = (fov_y * 0.5).max(0.05);
        let fit = radius.max(f32::EPSILON) / half.sin() * 1.1;
        self.distance = fit.clamp(self.min_distance, self.max_distance);
    }

    /// Feed one pointer event.
    pub fn handle_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { x, y, button } => {
                let last = Vec2::new(x, y);
                self.drag = match button {
                    PointerButton::Primary => Some(Drag::Orbit { last }),
                    PointerButton::Secondary => Some(Drag::Pan { last }),
                    PointerButton::Other => self.drag,
                };
            }
            PointerEvent::Up { .. } => {
                self.drag = None;
            }
            PointerEvent::Move { x, y } => {
                let pos = Vec2::new(x, y);
                match self.drag {
                    Some(Drag::Orbit { last }) => {
                        let delta = pos - last;
                        self.yaw -= delta.x * self.orbit_sensitivity;
                        self.pitch = (self.pitch + delta.y * self.orbit_sensitivity)
                            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
                        self.drag = Some(Drag::Orbit { last: pos });
                    }
                    Some(Drag::Pan { last }) => {
                        let delta = pos - last;
                        let (right, up) = self.screen_axes();
                        let scale = self.pan_sensitivity * self.distance;
                        self.pan += (-right * delta.x + up * delta.y) * scale;
                        self.drag = Some(Drag::Pan { last: pos });
                    }
                    None => {}
                }
            }
            PointerEvent::Wheel { delta_y, .. } => {
                if !delta_y.is_finite() || delta_y == 0.0 {
                    return;
                }
                let factor = self.zoom_factor.powf(delta_y / WHEEL_NOTCH);
                let distance = self.distance * factor;
                self.distance = if distance.is_finite() {
                    distance.clamp(self.min_distance, self.max_distance)
                } else if delta_y > 0.0 {
                    self.max_distance
                } else {
                    self.min_distance
                };
            }
        }
    }

    /// Point the camera looks at (target plus pan).
    pub fn focus(&self) -> Vec3 {
        self.target + self.pan
    }

    /// World position of the eye.
    pub fn position(&self) -> Vec3 {
        // Spherical to Cartesian conversion
        let offset = Vec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        );
        self.focus() + offset
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.focus(), Vec3::Y)
    }

    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = (self.focus() - self.position()).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
        let up = right.cross(forward);
        (right, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(button: PointerButton, x: f32, y: f32) -> PointerEvent {
        PointerEvent::Down { x, y, button }
    }

    fn wheel(delta_y: f32) -> PointerEvent {
        PointerEvent::Wheel { x: 0.0, y: 0.0, delta_y }
    }

    #[test]
    fn move_without_drag_is_noop() {
        let mut cam = OrbitCamera::new();
        let before = cam.view_matrix();
        cam.handle_event(PointerEvent::Move { x: 100.0, y: 50.0 });
        assert_eq!(cam.view_matrix(), before);
    }

    #[test]
    fn primary_drag_orbits_relative_to_previous_move() {
        let mut cam = OrbitCamera::new();
        let (yaw, pitch) = (cam.yaw, cam.pitch);
        cam.handle_event(down(PointerButton::Primary, 10.0, 10.0));
        cam.handle_event(PointerEvent::Move { x: 20.0, y: 10.0 });
        cam.handle_event(PointerEvent::Move { x: 30.0, y: 14.0 });

        let s = cam.orbit_sensitivity;
        assert!((cam.yaw - (yaw - 20.0 * s)).abs() < 1e-6);
        assert!((cam.pitch - (pitch + 4.0 * s)).abs() < 1e-6);
        assert_eq!(cam.pan, Vec3::ZERO);

        cam.handle_event(PointerEvent::Up { x: 30.0, y: 14.0, button: PointerButton::Primary });
        let yaw_after = cam.yaw;
        cam.handle_event(PointerEvent::Move { x: 90.0, y: 90.0 });
        assert_eq!(cam.yaw, yaw_after);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = OrbitCamera::new();
        cam.handle_event(down(PointerButton::Primary, 0.0, 0.0));
        cam.handle_event(PointerEvent::Move { x: 0.0, y: 1.0e6 });
        assert!(cam.pitch <= PITCH_LIMIT);
        cam.handle_event(PointerEvent::Move { x: 0.0, y: -1.0e6 });
        assert!(cam.pitch >= -PITCH_LIMIT);
        assert!(cam.view_matrix().is_finite());
    }

    #[test]
    fn secondary_drag_pans_focus() {
        let mut cam = OrbitCamera::new();
        let yaw = cam.yaw;
        cam.handle_event(down(PointerButton::Secondary, 0.0, 0.0));
        cam.handle_event(PointerEvent::Move { x: 50.0, y: 0.0 });
        assert_eq!(cam.yaw, yaw);
        assert!(cam.pan.length() > 0.0);
        // Dragging right moves the focus to the camera's left.
        let (right, _) = cam.screen_axes();
        assert!(cam.pan.dot(right) < 0.0);
    }

    #[test]
    fn zoom_never_reaches_zero() {
        let mut cam = OrbitCamera::new();
        for _ in 0..10_000 {
            cam.handle_event(wheel(-1.0e4));
        }
        assert!(cam.distance > 0.0);
        assert_eq!(cam.distance, cam.min_distance);

        cam.handle_event(wheel(-f32::MAX));
        assert!(cam.distance > 0.0);
        cam.handle_event(wheel(f32::NAN));
        assert!(cam.distance > 0.0);
    }

    #[test]
    fn zoom_is_multiplicative() {
        let mut cam = OrbitCamera::new().distance(10.0);
        cam.handle_event(wheel(120.0));
        assert!((cam.distance - 10.0 * cam.zoom_factor).abs() < 1e-4);
        cam.handle_event(wheel(-120.0));
        assert!((cam.distance - 10.0).abs() < 1e-4);
    }

    #[test]
    fn view_matrix_tracks_state() {
        let mut cam = OrbitCamera::new();
        let before = cam.view_matrix();
        cam.handle_event(wheel(240.0));
        assert_ne!(cam.view_matrix(), before);
        let eye = cam.view_matrix().transform_point3(cam.position());
        assert!(eye.length() < 1e-4);
    }

    #[test]
    fn frame_bounds_fits_sphere() {
        let mut cam = OrbitCamera::new();
        cam.frame_bounds(Vec3::new(1.0, 2.0, 3.0), 2.0, 45f32.to_radians());
        assert_eq!(cam.focus(), Vec3::new(1.0, 2.0, 3.0));
        assert!(cam.distance > 2.0);
    }
}
