//! 2D overlays drawn on top of the surface.
//!
//! - [`TraceOverlay`]: butterfly plot of all trace channels in a strip along
//!   the bottom of the target, with a cursor at the current frame.
//! - [`TextOverlay`]: the hovered region's name in the top-left corner.
//!
//! Layout is computed by pure functions ([`trace_lines`], [`cursor_x`],
//! [`strip_rect`]) and cached until its inputs change.

use glam::Vec2;

use crate::draw2d::{Color, Draw2d, Rect, Vertex2d, layout_text};
use crate::font::FontAtlas;
use crate::payload::Traces;

const TRACE_THICKNESS: f32 = 1.0;
const CURSOR_THICKNESS: f32 = 2.0;
const STRIP_MARGIN: f32 = 8.0;
const TEXT_MARGIN: f32 = 10.0;
const TEXT_PADDING: f32 = 6.0;

/// Cycled per channel.
const PALETTE: [Color; 6] = [
    Color::rgba(0.40, 0.76, 1.00, 0.85),
    Color::rgba(1.00, 0.60, 0.30, 0.85),
    Color::rgba(0.55, 0.90, 0.45, 0.85),
    Color::rgba(0.95, 0.45, 0.65, 0.85),
    Color::rgba(0.75, 0.65, 1.00, 0.85),
    Color::rgba(0.95, 0.90, 0.40, 0.85),
];

/// Bottom strip of a `width` by `height` target covering `fraction` of its height.
pub fn strip_rect(width: u32, height: u32, fraction: f32) -> Rect {
    let (w, h) = (width as f32, height as f32);
    let strip_h = (h * fraction.clamp(0.0, 1.0) - STRIP_MARGIN).max(0.0);
    Rect::new(
        STRIP_MARGIN,
        h - strip_h - STRIP_MARGIN,
        (w - 2.0 * STRIP_MARGIN).max(0.0),
        strip_h,
    )
}

/// Polyline per channel, normalized to the global value range and fit to `rect`.
///
/// Samples spread evenly across the width; larger values sit higher. A flat
/// or non-finite range puts every sample on the middle line.
pub fn trace_lines(traces: &Traces, rect: Rect) -> Vec<Vec<Vec2>> {
    let n = traces.sample_count();
    if n == 0 {
        return Vec::new();
    }
    let (lo, hi) = traces.value_range().unwrap_or((0.0, 0.0));
    let span = hi - lo;

    let x_at = |i: usize| {
        if n == 1 {
            rect.x + rect.width * 0.5
        } else {
            rect.x + rect.width * i as f32 / (n - 1) as f32
        }
    };
    let y_at = |v: f32| {
        let t = if span > 0.0 && v.is_finite() {
            (v - lo) / span
        } else {
            0.5
        };
        rect.bottom() - t * rect.height
    };

    traces
        .channels()
        .iter()
        .map(|channel| {
            channel
                .iter()
                .enumerate()
                .map(|(i, &v)| Vec2::new(x_at(i), y_at(v)))
                .collect()
        })
        .collect()
}

/// Horizontal position of the playback cursor for `frame` out of `frame_count`.
pub fn cursor_x(frame: usize, frame_count: usize, rect: Rect) -> f32 {
    if frame_count <= 1 {
        return rect.x;
    }
    let t = frame.min(frame_count - 1) as f32 / (frame_count - 1) as f32;
    rect.x + t * rect.width
}

/// Butterfly plot of the trace channels.
#[derive(Default)]
pub struct TraceOverlay {
    traces: Traces,
    fraction: f32,
    cached: Option<(Rect, Vec<Vec<Vec2>>)>,
}

impl TraceOverlay {
    pub fn new(traces: Traces, fraction: f32) -> Self {
        Self {
            traces,
            fraction,
            cached: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Queue the plot for a target of `size`.
    pub fn draw(&mut self, draw: &mut Draw2d, size: (u32, u32), frame: usize, frame_count: usize) {
        if self.traces.is_empty() {
            return;
        }
        let rect = strip_rect(size.0, size.1, self.fraction);
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let lines = match &self.cached {
            Some((cached_rect, lines)) if *cached_rect == rect => lines,
            _ => {
                let lines = trace_lines(&self.traces, rect);
                &self.cached.insert((rect, lines)).1
            }
        };

        draw.rect(rect, Color::BACKDROP);
        for (i, line) in lines.iter().enumerate() {
            draw.polyline(line, TRACE_THICKNESS, PALETTE[i % PALETTE.len()]);
        }
        let x = cursor_x(frame, frame_count, rect);
        draw.line(
            Vec2::new(x, rect.y),
            Vec2::new(x, rect.bottom()),
            CURSOR_THICKNESS,
            Color::WHITE,
        );
    }
}

/// Remembers the last label so layout only reruns when it changes.
#[derive(Debug, Default)]
pub struct LabelCache {
    text: String,
    layouts: usize,
}

impl LabelCache {
    /// Store `text`. Returns true when it differs from the previous label.
    pub fn update(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text.clear();
        self.text.push_str(text);
        self.layouts += 1;
        true
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// How many times the label changed.
    pub fn layouts(&self) -> usize {
        self.layouts
    }
}

/// Hover label with a dark backdrop.
pub struct TextOverlay {
    font: Option<FontAtlas>,
    label: LabelCache,
    glyphs: Vec<Vertex2d>,
    backdrop: Rect,
}

impl TextOverlay {
    /// `None` disables the overlay; labels are still tracked.
    pub fn new(font: Option<FontAtlas>) -> Self {
        Self {
            font,
            label: LabelCache::default(),
            glyphs: Vec::new(),
            backdrop: Rect::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn font(&self) -> Option<&FontAtlas> {
        self.font.as_ref()
    }

    pub fn label(&self) -> &str {
        self.label.text()
    }

    /// Queue `text`. Empty text draws nothing.
    pub fn draw(&mut self, draw: &mut Draw2d, text: &str) {
        let Some(font) = &self.font else {
            return;
        };
        if self.label.update(text) {
            self.glyphs = layout_text(font, TEXT_MARGIN, TEXT_MARGIN, text, Color::WHITE);
            self.backdrop = Rect::new(
                TEXT_MARGIN - TEXT_PADDING,
                TEXT_MARGIN - TEXT_PADDING,
                font.measure(text) + 2.0 * TEXT_PADDING,
                font.line_height() + 2.0 * TEXT_PADDING,
            );
        }
        if text.is_empty() {
            return;
        }
        draw.rect(self.backdrop, Color::BACKDROP);
        draw.push_text(&self.glyphs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        Rect::new(10.0, 100.0, 200.0, 50.0)
    }

    #[test]
    fn strip_sits_at_bottom() {
        let r = strip_rect(800, 600, 0.25);
        assert!((r.bottom() - (600.0 - STRIP_MARGIN)).abs() < 1e-4);
        assert!((r.height - (150.0 - STRIP_MARGIN)).abs() < 1e-4);
        assert_eq!(r.x, STRIP_MARGIN);
    }

    #[test]
    fn traces_fill_rect_with_extremes_on_edges() {
        let traces = Traces::new(vec![vec![0.0, 2.0, 1.0], vec![-2.0, 0.0, 4.0]]).unwrap();
        let lines = trace_lines(&traces, rect());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 3);

        // x spans the rect.
        assert_eq!(lines[0][0].x, 10.0);
        assert_eq!(lines[0][2].x, 210.0);
        // Global min at the bottom, global max at the top.
        assert_eq!(lines[1][0].y, rect().bottom());
        assert_eq!(lines[1][2].y, rect().y);
        // 0.0 is a third of the way up from -2 to 4.
        assert!((lines[0][0].y - (150.0 - 50.0 / 3.0)).abs() < 1e-4);
    }

    #[test]
    fn flat_traces_sit_mid_height() {
        let traces = Traces::new(vec![vec![3.0, 3.0]]).unwrap();
        let lines = trace_lines(&traces, rect());
        assert!(lines[0].iter().all(|p| p.y == 125.0));
        assert!(trace_lines(&Traces::default(), rect()).is_empty());
    }

    #[test]
    fn cursor_tracks_frame() {
        let r = rect();
        assert_eq!(cursor_x(0, 11, r), 10.0);
        assert_eq!(cursor_x(10, 11, r), 210.0);
        assert_eq!(cursor_x(5, 11, r), 110.0);
        assert_eq!(cursor_x(99, 11, r), 210.0);
        assert_eq!(cursor_x(3, 1, r), 10.0);
    }

    #[test]
    fn label_relayouts_only_on_change() {
        let mut cache = LabelCache::default();
        assert!(!cache.update(""));
        assert!(cache.update("motor_cortex"));
        assert!(!cache.update("motor_cortex"));
        assert!(cache.update(""));
        assert_eq!(cache.layouts(), 2);
    }
}
