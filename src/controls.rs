//! UI-facing playback state for a host toolkit.
//!
//! The viewport emits frame notifications and accepts seeks. A slider that
//! both displays the frame and issues seeks would feed its own updates back
//! into the timeline, so [`PlaybackSlider`] swallows the echo of every value
//! it applies.

use crate::input::Command;

/// Slider ticks spanning the whole timeline.
pub const DEFAULT_RESOLUTION: u32 = 100;

/// Slider model mapping between integer ticks and timeline positions.
#[derive(Clone, Debug)]
pub struct PlaybackSlider {
    resolution: u32,
    value: u32,
    pending_echo: Option<u32>,
}

impl Default for PlaybackSlider {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl PlaybackSlider {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution: resolution.max(1),
            value: 0,
            pending_echo: None,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Move the slider to show `frame`. Returns the new tick value if it
    /// changed, or `None` if the slider already showed it.
    ///
    /// A changed value is reported back by the widget once; that report is
    /// swallowed by [`Self::user_moved`].
    pub fn apply_frame(&mut self, frame: usize, frame_count: usize) -> Option<u32> {
        let value = if frame_count <= 1 {
            0
        } else {
            let t = frame.min(frame_count - 1) as f64 / (frame_count - 1) as f64;
            (t * self.resolution as f64).round() as u32
        };
        if value == self.value {
            return None;
        }
        self.value = value;
        self.pending_echo = Some(value);
        Some(value)
    }

    /// The widget reported a new value. Returns a seek position in `[0, 1]`,
    /// or `None` when this is the echo of [`Self::apply_frame`].
    pub fn user_moved(&mut self, value: u32) -> Option<f64> {
        if self.pending_echo.take() == Some(value) {
            return None;
        }
        self.value = value.min(self.resolution);
        Some(self.value as f64 / self.resolution as f64)
    }

    /// Like [`Self::user_moved`], wrapped as a viewer command.
    pub fn seek_command(&mut self, value: u32) -> Option<Command> {
        self.user_moved(value).map(Command::Seek)
    }
}

/// Play/pause toggle button state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayButton {
    playing: bool,
}

impl PlayButton {
    pub fn new(playing: bool) -> Self {
        Self { playing }
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Shows the action a click would take.
    pub fn label(&self) -> &'static str {
        if self.playing { "Pause" } else { "Play" }
    }

    pub fn clicked(&mut self) -> Command {
        self.playing = !self.playing;
        if self.playing {
            Command::Play
        } else {
            Command::Pause
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_value_echo_is_swallowed() {
        let mut slider = PlaybackSlider::default();
        assert_eq!(slider.apply_frame(50, 101), Some(50));
        assert_eq!(slider.user_moved(50), None);
        // The next genuine move goes through.
        assert_eq!(slider.user_moved(50), Some(0.5));
    }

    #[test]
    fn user_drag_seeks() {
        let mut slider = PlaybackSlider::new(10);
        slider.apply_frame(3, 11);
        assert_eq!(slider.user_moved(7), Some(0.7));
        assert_eq!(slider.seek_command(25), Some(Command::Seek(1.0)));
    }

    #[test]
    fn unchanged_value_expects_no_echo() {
        let mut slider = PlaybackSlider::default();
        assert_eq!(slider.apply_frame(0, 10), None);
        assert_eq!(slider.user_moved(0), Some(0.0));
    }

    #[test]
    fn apply_then_seek_round_trips_frame() {
        let frame_count = 40;
        let mut slider = PlaybackSlider::default();
        slider.apply_frame(13, frame_count);
        let value = slider.value();
        let position = value as f64 / slider.resolution() as f64;
        let frame = (position * (frame_count - 1) as f64).round() as usize;
        assert!(frame.abs_diff(13) <= 1);
    }

    #[test]
    fn play_button_label_follows_state() {
        let mut button = PlayButton::new(true);
        assert_eq!(button.label(), "Pause");
        assert_eq!(button.clicked(), Command::Pause);
        assert_eq!(button.label(), "Play");
        assert_eq!(button.clicked(), Command::Play);
    }
}
