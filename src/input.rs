use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::orbit_camera::{PointerButton, PointerEvent};
use crate::payload::RenderMode;

/// Wheel units reported for one line of scrolling.
const LINE_UNITS: f32 = 120.0;

/// Viewer-level commands, from the keyboard or a host UI.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    /// Normalized position in `[0, 1]`.
    Seek(f64),
    /// Relative step in frames.
    Step(isize),
    SetMode(RenderMode),
    ToggleMode,
    SetTracesVisible(bool),
    ToggleTraces,
}

/// What a window event means to the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputAction {
    Pointer(PointerEvent),
    Command(Command),
}

/// Key bindings.
pub fn command_for_key(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::KeyT => Some(Command::ToggleMode),
        KeyCode::KeyP => Some(Command::ToggleTraces),
        KeyCode::Space => Some(Command::TogglePlay),
        KeyCode::ArrowLeft => Some(Command::Step(-1)),
        KeyCode::ArrowRight => Some(Command::Step(1)),
        KeyCode::Home => Some(Command::Seek(0.0)),
        _ => None,
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

/// Convert a winit scroll to camera wheel units. Scrolling up zooms in.
pub fn wheel_units(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_UNITS,
        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
    }
}

/// Translates window events into pointer events and commands.
///
/// Mouse button and wheel events carry no position in winit, so the last
/// cursor position is tracked here.
#[derive(Default)]
pub struct Input {
    cursor: Vec2,
    keys_down: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(key) => self.key(key, event.state),
                PhysicalKey::Unidentified(_) => None,
            },
            WindowEvent::MouseInput { state, button, .. } => Some(self.button(*button, *state)),
            WindowEvent::CursorMoved { position, .. } => {
                Some(self.cursor_moved(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(*delta),
            WindowEvent::Focused(false) => {
                self.focus_lost();
                None
            }
            _ => None,
        }
    }

    /// Key transitions. Auto-repeat presses are ignored.
    pub fn key(&mut self, key: KeyCode, state: ElementState) -> Option<InputAction> {
        match state {
            ElementState::Pressed => {
                if !self.keys_down.insert(key) {
                    return None;
                }
                command_for_key(key).map(InputAction::Command)
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
                None
            }
        }
    }

    /// Forget held keys. Releases that happen while unfocused never arrive.
    pub fn focus_lost(&mut self) {
        self.keys_down.clear();
    }

    pub fn button(&mut self, button: MouseButton, state: ElementState) -> InputAction {
        let Vec2 { x, y } = self.cursor;
        let button = pointer_button(button);
        InputAction::Pointer(match state {
            ElementState::Pressed => PointerEvent::Down { x, y, button },
            ElementState::Released => PointerEvent::Up { x, y, button },
        })
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) -> InputAction {
        self.cursor = Vec2::new(x, y);
        InputAction::Pointer(PointerEvent::Move { x, y })
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta) -> Option<InputAction> {
        let delta_y = wheel_units(delta);
        if delta_y == 0.0 {
            return None;
        }
        let Vec2 { x, y } = self.cursor;
        Some(InputAction::Pointer(PointerEvent::Wheel { x, y, delta_y }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(command_for_key(KeyCode::KeyT), Some(Command::ToggleMode));
        assert_eq!(command_for_key(KeyCode::KeyP), Some(Command::ToggleTraces));
        assert_eq!(command_for_key(KeyCode::Space), Some(Command::TogglePlay));
        assert_eq!(command_for_key(KeyCode::ArrowLeft), Some(Command::Step(-1)));
        assert_eq!(command_for_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn held_key_fires_once() {
        let mut input = Input::new();
        let first = input.key(KeyCode::Space, ElementState::Pressed);
        assert_eq!(first, Some(InputAction::Command(Command::TogglePlay)));
        assert_eq!(input.key(KeyCode::Space, ElementState::Pressed), None);
        input.key(KeyCode::Space, ElementState::Released);
        assert!(input.key(KeyCode::Space, ElementState::Pressed).is_some());
    }

    #[test]
    fn focus_loss_releases_held_keys() {
        let mut input = Input::new();
        assert!(input.key(KeyCode::KeyT, ElementState::Pressed).is_some());
        // The release is lost while another window has focus.
        assert_eq!(input.handle_event(&WindowEvent::Focused(false)), None);
        assert_eq!(
            input.key(KeyCode::KeyT, ElementState::Pressed),
            Some(InputAction::Command(Command::ToggleMode))
        );
    }

    #[test]
    fn buttons_use_last_cursor_position() {
        let mut input = Input::new();
        input.cursor_moved(12.0, 34.0);
        assert_eq!(
            input.button(MouseButton::Right, ElementState::Pressed),
            InputAction::Pointer(PointerEvent::Down {
                x: 12.0,
                y: 34.0,
                button: PointerButton::Secondary
            })
        );
        assert_eq!(
            input.button(MouseButton::Left, ElementState::Released),
            InputAction::Pointer(PointerEvent::Up {
                x: 12.0,
                y: 34.0,
                button: PointerButton::Primary
            })
        );
    }

    #[test]
    fn scrolling_up_zooms_in() {
        assert_eq!(wheel_units(MouseScrollDelta::LineDelta(0.0, 1.0)), -120.0);
        assert_eq!(
            wheel_units(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -60.0))),
            60.0
        );
        let mut input = Input::new();
        assert_eq!(input.wheel(MouseScrollDelta::LineDelta(3.0, 0.0)), None);
    }
}
