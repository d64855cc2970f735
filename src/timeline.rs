//! Wall-clock driven playback over a fixed number of animation frames.
//!
//! While playing, the current frame is recomputed from an anchor on every
//! tick instead of accumulating deltas, so long sessions never drift.

use std::time::Instant;

/// Playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

/// Maps wall-clock time (or a scrubbed position) to a frame index.
///
/// Every operation has an `_at` form taking the current instant; the plain
/// forms use [`Instant::now`].
#[derive(Clone, Debug)]
pub struct Timeline {
    frame_count: usize,
    fps: f64,
    speed: f64,
    state: PlayState,
    current_frame: usize,
    /// `current_frame` was `anchor_frame` at `anchor`.
    anchor: Instant,
    anchor_frame: usize,
}

impl Timeline {
    /// Starts playing at frame 0.
    pub fn new(frame_count: usize, fps: f64, speed: f64) -> Self {
        Self::new_at(frame_count, fps, speed, Instant::now())
    }

    pub fn new_at(frame_count: usize, fps: f64, speed: f64, now: Instant) -> Self {
        Self {
            frame_count: frame_count.max(1),
            fps: if fps > 0.0 { fps } else { 30.0 },
            speed: if speed > 0.0 { speed } else { 1.0 },
            state: PlayState::Playing,
            current_frame: 0,
            anchor: now,
            anchor_frame: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    /// Last computed frame. Only [`Self::tick`] advances it.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    /// Resume from the frozen frame. No-op while already playing.
    pub fn play_at(&mut self, now: Instant) {
        if self.is_playing() {
            return;
        }
        self.reanchor(now);
        self.state = PlayState::Playing;
        log::debug!("Playback resumed at frame {}", self.current_frame);
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Freeze the frame reached at `now`. A second pause changes nothing.
    pub fn pause_at(&mut self, now: Instant) {
        if !self.is_playing() {
            return;
        }
        self.tick_at(now);
        self.state = PlayState::Paused;
        log::debug!("Playback paused at frame {}", self.current_frame);
    }

    pub fn toggle_at(&mut self, now: Instant) {
        match self.state {
            PlayState::Playing => self.pause_at(now),
            PlayState::Paused => self.play_at(now),
        }
    }

    pub fn seek(&mut self, position: f64) -> usize {
        self.seek_at(position, Instant::now())
    }

    /// Jump to `round(position * (frame_count - 1))`, keeping the play state.
    ///
    /// Out-of-range or NaN positions are clamped to `[0, 1]`.
    pub fn seek_at(&mut self, position: f64, now: Instant) -> usize {
        let position = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, 1.0)
        };
        let frame = (position * (self.frame_count - 1) as f64).round() as usize;
        self.seek_frame_at(frame, now)
    }

    /// Jump to an absolute frame, wrapping out-of-range values.
    pub fn seek_frame_at(&mut self, frame: usize, now: Instant) -> usize {
        self.current_frame = frame % self.frame_count;
        self.reanchor(now);
        log::debug!("Seek to frame {}", self.current_frame);
        self.current_frame
    }

    /// Step by `delta` frames, wrapping in both directions.
    pub fn step_at(&mut self, delta: isize, now: Instant) -> usize {
        if self.is_playing() {
            self.tick_at(now);
        }
        let n = self.frame_count as isize;
        let frame = (self.current_frame as isize + delta).rem_euclid(n) as usize;
        self.seek_frame_at(frame, now)
    }

    pub fn tick(&mut self) -> usize {
        self.tick_at(Instant::now())
    }

    /// Recompute the frame from the anchor. Returns the frozen frame when paused.
    pub fn tick_at(&mut self, now: Instant) -> usize {
        if self.is_playing() {
            let elapsed = now.saturating_duration_since(self.anchor).as_secs_f64();
            let advanced = (elapsed * self.fps * self.speed).floor() as usize % self.frame_count;
            self.current_frame = (self.anchor_frame + advanced) % self.frame_count;
        }
        self.current_frame
    }

    fn reanchor(&mut self, now: Instant) {
        self.anchor = now;
        self.anchor_frame = self.current_frame;
    }
}

/// Thins out frame-change notifications.
///
/// A frame is reported when it differs from the last one seen and is a
/// multiple of `every`. Seeks are always reported.
#[derive(Clone, Debug)]
pub struct FrameThrottle {
    every: usize,
    last: Option<usize>,
}

impl FrameThrottle {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            last: None,
        }
    }

    /// Frame reached by playback.
    pub fn observe(&mut self, frame: usize) -> Option<usize> {
        if self.last == Some(frame) {
            return None;
        }
        self.last = Some(frame);
        (frame % self.every == 0).then_some(frame)
    }

    /// Frame set explicitly by a seek.
    pub fn observe_seek(&mut self, frame: usize) -> Option<usize> {
        if self.last == Some(frame) {
            return None;
        }
        self.last = Some(frame);
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn starts_playing_at_zero() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(10, 30.0, 1.0, t0);
        assert_eq!(tl.state(), PlayState::Playing);
        assert_eq!(tl.tick_at(t0), 0);
    }

    #[test]
    fn tick_counts_whole_frames_and_loops() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(10, 10.0, 1.0, t0);
        assert_eq!(tl.tick_at(t0 + secs(0.35)), 3);
        assert_eq!(tl.tick_at(t0 + secs(0.99)), 9);
        assert_eq!(tl.tick_at(t0 + secs(1.05)), 0);
        assert_eq!(tl.tick_at(t0 + secs(2.55)), 5);
    }

    #[test]
    fn speed_scales_playback() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(100, 10.0, 2.0, t0);
        assert_eq!(tl.tick_at(t0 + secs(1.0)), 20);
    }

    #[test]
    fn seek_play_pause_resumes_without_jump() {
        let frame_count = 100;
        let fps = 30.0;
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(frame_count, fps, 1.0, t0);
        tl.pause_at(t0);
        let sought = tl.seek_at(0.5, t0 + secs(1.0));
        assert_eq!(sought, 50);

        let start = t0 + secs(2.0);
        tl.play_at(start);
        let t = 0.8;
        tl.pause_at(start + secs(t));
        let expected = (sought + (t * fps).floor() as usize) % frame_count;
        assert_eq!(tl.current_frame(), expected);
    }

    #[test]
    fn seek_while_playing_reanchors() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(11, 10.0, 1.0, t0);
        tl.seek_at(0.5, t0 + secs(3.0));
        assert_eq!(tl.current_frame(), 5);
        assert_eq!(tl.tick_at(t0 + secs(3.25)), 7);
    }

    #[test]
    fn pause_twice_is_idempotent() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(50, 10.0, 1.0, t0);
        tl.pause_at(t0 + secs(1.25));
        let frozen = tl.current_frame();
        assert_eq!(frozen, 12);
        tl.pause_at(t0 + secs(4.0));
        assert_eq!(tl.current_frame(), frozen);
        assert_eq!(tl.tick_at(t0 + secs(9.0)), frozen);
    }

    #[test]
    fn resume_continues_from_pause() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(50, 10.0, 1.0, t0);
        tl.pause_at(t0 + secs(0.5));
        tl.play_at(t0 + secs(10.0));
        assert_eq!(tl.tick_at(t0 + secs(10.0)), 5);
        assert_eq!(tl.tick_at(t0 + secs(10.35)), 8);
    }

    #[test]
    fn seek_clamps_and_handles_single_frame() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(5, 10.0, 1.0, t0);
        assert_eq!(tl.seek_at(2.0, t0), 4);
        assert_eq!(tl.seek_at(-1.0, t0), 0);
        assert_eq!(tl.seek_at(f64::NAN, t0), 0);

        let mut single = Timeline::new_at(0, 10.0, 1.0, t0);
        assert_eq!(single.frame_count(), 1);
        assert_eq!(single.seek_at(0.7, t0), 0);
        assert_eq!(single.tick_at(t0 + secs(5.0)), 0);
    }

    #[test]
    fn step_wraps_both_ways() {
        let t0 = Instant::now();
        let mut tl = Timeline::new_at(4, 10.0, 1.0, t0);
        tl.pause_at(t0);
        assert_eq!(tl.step_at(-1, t0), 3);
        assert_eq!(tl.step_at(2, t0), 1);
    }

    #[test]
    fn throttle_reports_multiples_and_seeks() {
        let mut throttle = FrameThrottle::new(5);
        let reported: Vec<_> = (0..12).filter_map(|f| throttle.observe(f)).collect();
        assert_eq!(reported, vec![0, 5, 10]);
        assert_eq!(throttle.observe(10), None);
        assert_eq!(throttle.observe_seek(7), Some(7));
        assert_eq!(throttle.observe_seek(7), None);
    }
}
