//! Viewport state and the per-frame render loop.
//!
//! [`ViewportContext`] owns everything one viewport needs: the backend, the
//! payload, camera, timeline and hover state. [`render_frame`] draws one frame
//! from it, and [`RenderLoop`] turns repeated frames into a small
//! `Running`/`Stopped` state machine.
//!
//! Input and host commands mutate the context directly; notifications flow back
//! out through a single listener.

use std::time::Instant;

use glam::Mat4;

use crate::backend::FrameBackend;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::input::Command;
use crate::mesh_renderer::MeshDraw;
use crate::orbit_camera::{OrbitCamera, PointerEvent};
use crate::payload::{HoverState, Payload, RenderMode};
use crate::picking::Picker;
use crate::projection::Projection;
use crate::timeline::{FrameThrottle, PlayState, Timeline};

/// Notifications for the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    /// Throttled frame-change notification.
    Frame(usize),
    /// The hovered region changed. [`HoverState::NONE`] means no region.
    Hover(HoverState),
    PlayState(PlayState),
}

/// Which colors the backend currently holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    None,
    Frame(usize),
    Atlas,
}

type Listener = Box<dyn FnMut(ViewerEvent)>;

/// Explicit state for one viewport.
pub struct ViewportContext<B: FrameBackend> {
    backend: B,
    payload: Payload,
    camera: OrbitCamera,
    projection: Projection,
    picker: Picker,
    timeline: Timeline,
    throttle: FrameThrottle,
    mode: RenderMode,
    traces_visible: bool,
    hover: HoverState,
    uploaded: UploadState,
    scratch: Vec<[f32; 4]>,
    background: [f32; 4],
    listener: Option<Listener>,
}

impl<B: FrameBackend> ViewportContext<B> {
    /// Build a viewport for `payload`.
    ///
    /// Fails if the payload's color sources disagree with the mesh.
    pub fn new(backend: B, payload: Payload, config: &ViewerConfig) -> Result<Self> {
        Self::new_at(backend, payload, config, Instant::now())
    }

    pub fn new_at(
        backend: B,
        payload: Payload,
        config: &ViewerConfig,
        now: Instant,
    ) -> Result<Self> {
        payload.validate()?;
        config.validate().map_err(ViewerError::Config)?;

        let projection = Projection::from_config(&config.projection);
        let mut camera = OrbitCamera::from_config(&config.camera);
        if config.camera.distance.is_none() {
            let model = payload.mesh.transform.matrix();
            let center = model.transform_point3(payload.mesh.center());
            let radius = payload.mesh.radius() * payload.mesh.transform.scale.max_element();
            camera.frame_bounds(center, radius, projection.fov_y);
        }

        let playback = &config.playback;
        let mut timeline =
            Timeline::new_at(payload.frame_count(), playback.fps, playback.speed, now);
        if !playback.autoplay {
            timeline.pause_at(now);
        }

        // Start in atlas mode when there is nothing to animate.
        let mode = if payload.color_frames.is_none() && payload.atlas_colors.is_some() {
            RenderMode::Atlas
        } else {
            RenderMode::Dynamic
        };

        let mut ctx = Self {
            backend,
            payload,
            camera,
            projection,
            picker: Picker::new(config.picking.threshold, projection.depth_range),
            timeline,
            throttle: FrameThrottle::new(playback.notify_every),
            mode,
            traces_visible: config.render.show_traces,
            hover: HoverState::NONE,
            uploaded: UploadState::None,
            scratch: Vec::new(),
            background: config.render.background,
            listener: None,
        };
        ctx.backend.set_mode(mode);
        ctx.backend.set_hover(-1);
        Ok(ctx)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn traces_visible(&self) -> bool {
        self.traces_visible
    }

    pub fn uploaded(&self) -> UploadState {
        self.uploaded
    }

    /// Receive frame, hover and play state notifications.
    pub fn set_listener(&mut self, listener: impl FnMut(ViewerEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn emit(&mut self, event: ViewerEvent) {
        if let Some(listener) = &mut self.listener {
            listener(event);
        }
    }

    /// The matrix shared by picking and the renderer for a target of `size`.
    pub fn clip_from_model(&self, size: (u32, u32)) -> Mat4 {
        self.projection.clip_from_model(
            aspect(size),
            self.camera.view_matrix(),
            self.payload.mesh.transform.matrix(),
        )
    }

    /// Feed a pointer event to the camera, then re-pick on moves and zooms.
    pub fn handle_pointer(&mut self, event: PointerEvent, viewport: (u32, u32)) {
        self.camera.handle_event(event);
        if let PointerEvent::Move { .. } | PointerEvent::Wheel { .. } = event {
            let clip = self.clip_from_model(viewport);
            let hover = self
                .picker
                .pick(&self.payload.mesh, &clip, event.position(), viewport)
                .map_or(HoverState::NONE, HoverState::from);
            self.set_hover(hover);
        }
    }

    fn set_hover(&mut self, hover: HoverState) {
        if hover.region_id == self.hover.region_id {
            return;
        }
        log::debug!("Hover: {:?}", hover.region_name);
        self.backend.set_hover(hover.region_id);
        self.hover = hover.clone();
        self.emit(ViewerEvent::Hover(hover));
    }

    pub fn play(&mut self) {
        self.apply(Command::Play);
    }

    pub fn pause(&mut self) {
        self.apply(Command::Pause);
    }

    pub fn toggle_play(&mut self) {
        self.apply(Command::TogglePlay);
    }

    /// Jump to a normalized position. Returns the new frame.
    pub fn seek(&mut self, position: f64) -> usize {
        self.apply(Command::Seek(position));
        self.timeline.current_frame()
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.apply(Command::SetMode(mode));
    }

    pub fn set_traces_visible(&mut self, visible: bool) {
        self.apply(Command::SetTracesVisible(visible));
    }

    pub fn apply(&mut self, command: Command) {
        self.apply_at(command, Instant::now());
    }

    /// Run a command as of `now`.
    pub fn apply_at(&mut self, command: Command, now: Instant) {
        let was = self.timeline.state();
        match command {
            Command::Play => self.timeline.play_at(now),
            Command::Pause => self.timeline.pause_at(now),
            Command::TogglePlay => self.timeline.toggle_at(now),
            Command::Seek(position) => {
                let frame = self.timeline.seek_at(position, now);
                self.notify_seek(frame);
            }
            Command::Step(delta) => {
                let frame = self.timeline.step_at(delta, now);
                self.notify_seek(frame);
            }
            Command::SetMode(mode) => self.change_mode(mode),
            Command::ToggleMode => self.change_mode(self.mode.toggled()),
            Command::SetTracesVisible(visible) => self.show_traces(visible),
            Command::ToggleTraces => self.show_traces(!self.traces_visible),
        }
        let state = self.timeline.state();
        if state != was {
            log::info!("Playback {:?} at frame {}", state, self.timeline.current_frame());
            self.emit(ViewerEvent::PlayState(state));
        }
    }

    fn notify_seek(&mut self, frame: usize) {
        if let Some(frame) = self.throttle.observe_seek(frame) {
            self.emit(ViewerEvent::Frame(frame));
        }
    }

    fn change_mode(&mut self, mode: RenderMode) {
        if mode == self.mode {
            return;
        }
        log::info!("Render mode: {:?}", mode);
        self.mode = mode;
        self.backend.set_mode(mode);
    }

    fn show_traces(&mut self, visible: bool) {
        if visible != self.traces_visible {
            log::info!("Trace overlay {}", if visible { "shown" } else { "hidden" });
        }
        self.traces_visible = visible;
    }

    /// Advance playback when it drives the colors.
    fn advance(&mut self, now: Instant) -> usize {
        if self.mode != RenderMode::Dynamic || !self.timeline.is_playing() {
            return self.timeline.current_frame();
        }
        let frame = self.timeline.tick_at(now);
        if let Some(frame) = self.throttle.observe(frame) {
            self.emit(ViewerEvent::Frame(frame));
        }
        frame
    }

    /// Push colors for the current mode unless the backend already has them.
    fn sync_colors(&mut self, frame: usize) -> Result<()> {
        match self.mode {
            RenderMode::Dynamic => {
                if self.uploaded == UploadState::Frame(frame) {
                    return Ok(());
                }
                let Some(frames) = &self.payload.color_frames else {
                    return Ok(());
                };
                frames.write_frame(frame, &mut self.scratch);
                self.backend.upload_colors(&self.scratch)?;
                self.uploaded = UploadState::Frame(frame);
            }
            RenderMode::Atlas => {
                if self.uploaded == UploadState::Atlas {
                    return Ok(());
                }
                let Some(atlas) = &self.payload.atlas_colors else {
                    return Ok(());
                };
                self.backend.upload_colors(atlas.as_rgba())?;
                self.uploaded = UploadState::Atlas;
            }
        }
        Ok(())
    }

    fn draw(&mut self, target: &B::Target, now: Instant) -> Result<()> {
        let frame = self.advance(now);
        self.sync_colors(frame)?;

        let size = self.backend.target_size(target);
        let draw = MeshDraw {
            projection: self.projection,
            aspect: aspect(size),
            view: self.camera.view_matrix(),
            model: self.payload.mesh.transform.matrix(),
            eye: self.camera.position(),
        };
        self.backend.draw_mesh(target, &draw)?;

        if self.traces_visible {
            self.backend.draw_traces(target, frame)?;
        }
        self.backend.draw_text(target, &self.hover.region_name)
    }
}

fn aspect((width, height): (u32, u32)) -> f32 {
    if width == 0 || height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

/// Result of one pass through [`render_frame`].
#[derive(Debug)]
pub enum FrameOutcome {
    Drawn,
    /// No target was available.
    Skipped,
    Failed(ViewerError),
}

/// Draw one frame.
///
/// A failure after the target was acquired clears it to the background color
/// and still presents it.
pub fn render_frame<B: FrameBackend>(ctx: &mut ViewportContext<B>, now: Instant) -> FrameOutcome {
    let target = match ctx.backend.acquire() {
        Ok(Some(target)) => target,
        Ok(None) => {
            log::debug!("No target available, skipping frame");
            return FrameOutcome::Skipped;
        }
        Err(e) => return FrameOutcome::Failed(e),
    };

    let drawn = ctx.draw(&target, now);
    if let Err(e) = &drawn {
        log::error!("Frame draw failed: {}", e);
        ctx.backend.clear(&target, ctx.background);
    }
    let finished = ctx.backend.finish(target);

    match (drawn, finished) {
        (Ok(()), Ok(())) => FrameOutcome::Drawn,
        (Err(e), _) | (Ok(()), Err(e)) => FrameOutcome::Failed(e),
    }
}

/// Whether the loop should schedule another frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Free-running frame scheduler.
///
/// Transient failures only count toward a streak; fatal ones stop the loop
/// until the viewport is rebuilt.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    failures: u32,
    warn_every: u32,
}

impl RenderLoop {
    pub fn new(warn_every: u32) -> Self {
        Self {
            state: LoopState::Running,
            failures: 0,
            warn_every: warn_every.max(1),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Consecutive failed frames.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn step<B: FrameBackend>(&mut self, ctx: &mut ViewportContext<B>, now: Instant) -> LoopState {
        if self.state == LoopState::Stopped {
            return self.state;
        }
        match render_frame(ctx, now) {
            FrameOutcome::Drawn => self.failures = 0,
            FrameOutcome::Skipped => {}
            FrameOutcome::Failed(e) if e.is_fatal() => {
                log::error!("Stopping render loop: {}", e);
                self.state = LoopState::Stopped;
            }
            FrameOutcome::Failed(e) => {
                self.failures += 1;
                if self.failures % self.warn_every == 0 {
                    log::warn!("{} consecutive frames failed, last: {}", self.failures, e);
                }
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AtlasColors, ColorFrames, SurfaceMesh, Traces};
    use glam::{Vec2, Vec3};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Duration;

    const SIZE: (u32, u32) = (800, 600);

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Upload(usize, [f32; 4]),
        Mode(RenderMode),
        Hover(i32),
        Mesh,
        Traces(usize),
        Text(String),
        Clear,
        Finish,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        acquires: VecDeque<Result<Option<(u32, u32)>>>,
        fail_mesh: Option<fn() -> ViewerError>,
    }

    impl Recorder {
        fn draws(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| !matches!(c, Call::Mode(_) | Call::Hover(_)))
                .collect()
        }

        fn uploads(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Upload(..)))
                .collect()
        }
    }

    impl FrameBackend for Recorder {
        type Target = (u32, u32);

        fn acquire(&mut self) -> Result<Option<(u32, u32)>> {
            self.acquires.pop_front().unwrap_or(Ok(Some(SIZE)))
        }

        fn target_size(&self, target: &(u32, u32)) -> (u32, u32) {
            *target
        }

        fn upload_colors(&mut self, colors: &[[f32; 4]]) -> Result<()> {
            self.calls.push(Call::Upload(colors.len(), colors[0]));
            Ok(())
        }

        fn set_mode(&mut self, mode: RenderMode) {
            self.calls.push(Call::Mode(mode));
        }

        fn set_hover(&mut self, region_id: i32) {
            self.calls.push(Call::Hover(region_id));
        }

        fn draw_mesh(&mut self, _: &(u32, u32), _: &MeshDraw) -> Result<()> {
            self.calls.push(Call::Mesh);
            match self.fail_mesh {
                Some(err) => Err(err()),
                None => Ok(()),
            }
        }

        fn draw_traces(&mut self, _: &(u32, u32), frame: usize) -> Result<()> {
            self.calls.push(Call::Traces(frame));
            Ok(())
        }

        fn draw_text(&mut self, _: &(u32, u32), text: &str) -> Result<()> {
            self.calls.push(Call::Text(text.to_string()));
            Ok(())
        }

        fn clear(&mut self, _: &(u32, u32), _: [f32; 4]) {
            self.calls.push(Call::Clear);
        }

        fn finish(&mut self, _: (u32, u32)) -> Result<()> {
            self.calls.push(Call::Finish);
            Ok(())
        }
    }

    const FRAMES: usize = 10;

    /// Unit square facing +Z, one label per corner, the last one unnamed.
    fn payload() -> Payload {
        let mesh = SurfaceMesh::new(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
            vec![0, 1, 7, -1],
            ["visual", "auditory", "insula", "cingulate", "precuneus", "frontal", "parietal", "motor_cortex"]
                .map(String::from)
                .to_vec(),
        )
        .unwrap();
        // Grey ramp: vertex colors at frame f are all f / 10.
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend((0..FRAMES).map(|f| f as f32 / 10.0));
        }
        Payload::new(mesh)
            .with_color_frames(ColorFrames::new(data, 4, FRAMES, 1).unwrap())
            .with_atlas_colors(AtlasColors::new(vec![0.9; 4 * 3], 4, 3).unwrap())
            .with_traces(Traces::new(vec![vec![0.0, 1.0]]).unwrap())
    }

    fn config() -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.playback.fps = 10.0;
        config.playback.notify_every = 1;
        config.camera.distance = Some(6.0);
        config.camera.yaw = 0.0;
        config.camera.pitch = 0.0;
        config
    }

    fn context(t0: Instant) -> ViewportContext<Recorder> {
        ViewportContext::new_at(Recorder::default(), payload(), &config(), t0).unwrap()
    }

    fn recorded_events(ctx: &mut ViewportContext<Recorder>) -> Rc<RefCell<Vec<ViewerEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        ctx.set_listener(move |e| sink.borrow_mut().push(e));
        events
    }

    fn screen_position(ctx: &ViewportContext<Recorder>, vertex: usize) -> Vec2 {
        let clip = ctx.clip_from_model(SIZE);
        let p = ctx.payload().mesh.vertices()[vertex];
        let ndc = crate::projection::project(&clip, p).unwrap();
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * SIZE.0 as f32,
            (1.0 - ndc.y) * 0.5 * SIZE.1 as f32,
        )
    }

    fn move_to(ctx: &mut ViewportContext<Recorder>, at: Vec2) {
        ctx.handle_pointer(PointerEvent::Move { x: at.x, y: at.y }, SIZE);
    }

    #[test]
    fn frame_steps_run_in_order() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.backend_mut().calls.clear();

        let outcome = render_frame(&mut ctx, t0);
        assert!(matches!(outcome, FrameOutcome::Drawn));
        assert_eq!(
            ctx.backend().draws(),
            vec![
                &Call::Upload(4, [0.0, 0.0, 0.0, 1.0]),
                &Call::Mesh,
                &Call::Traces(0),
                &Call::Text(String::new()),
                &Call::Finish,
            ]
        );
    }

    #[test]
    fn dynamic_frames_upload_only_on_change() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        render_frame(&mut ctx, t0);
        render_frame(&mut ctx, t0 + Duration::from_millis(50));
        render_frame(&mut ctx, t0 + Duration::from_millis(250));

        let grey = |v: f32| [v, v, v, 1.0];
        assert_eq!(
            ctx.backend().uploads(),
            vec![&Call::Upload(4, grey(0.0)), &Call::Upload(4, grey(0.2))]
        );
        assert_eq!(ctx.uploaded(), UploadState::Frame(2));
    }

    #[test]
    fn atlas_uploads_once_and_freezes_playback() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.set_mode(RenderMode::Atlas);
        for i in 0..5 {
            render_frame(&mut ctx, t0 + Duration::from_millis(300 * i));
        }
        assert_eq!(ctx.backend().uploads(), vec![&Call::Upload(4, [0.9, 0.9, 0.9, 1.0])]);
        assert_eq!(ctx.timeline().current_frame(), 0);
        assert!(ctx.backend().calls.contains(&Call::Mode(RenderMode::Atlas)));

        // Leaving atlas mode re-uploads the dynamic frame.
        ctx.apply_at(Command::ToggleMode, t0);
        render_frame(&mut ctx, t0 + Duration::from_millis(1500));
        assert_eq!(ctx.uploaded(), UploadState::Frame(5));
    }

    #[test]
    fn missing_target_skips_frame() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.backend_mut().calls.clear();
        ctx.backend_mut().acquires.push_back(Ok(None));

        assert!(matches!(render_frame(&mut ctx, t0), FrameOutcome::Skipped));
        assert!(ctx.backend().calls.is_empty());
    }

    #[test]
    fn draw_failure_clears_and_keeps_running() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.backend_mut().fail_mesh = Some(|| ViewerError::Readback("lost".into()));
        let mut render_loop = RenderLoop::new(3);

        for _ in 0..4 {
            assert_eq!(render_loop.step(&mut ctx, t0), LoopState::Running);
        }
        assert_eq!(render_loop.failures(), 4);
        let calls = &ctx.backend().calls;
        let mesh = calls.iter().position(|c| *c == Call::Mesh).unwrap();
        assert_eq!(calls[mesh + 1], Call::Clear);
        assert_eq!(calls[mesh + 2], Call::Finish);

        ctx.backend_mut().fail_mesh = None;
        render_loop.step(&mut ctx, t0);
        assert_eq!(render_loop.failures(), 0);
    }

    #[test]
    fn fatal_error_stops_loop() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.backend_mut()
            .acquires
            .push_back(Err(ViewerError::SurfaceUnsupported));
        let mut render_loop = RenderLoop::new(10);

        assert_eq!(render_loop.step(&mut ctx, t0), LoopState::Stopped);
        ctx.backend_mut().calls.clear();
        assert_eq!(render_loop.step(&mut ctx, t0), LoopState::Stopped);
        assert!(ctx.backend().calls.is_empty());
    }

    #[test]
    fn transient_acquire_error_keeps_running() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.backend_mut()
            .acquires
            .push_back(Err(ViewerError::Surface(wgpu::SurfaceError::Timeout)));
        let mut render_loop = RenderLoop::new(10);

        assert_eq!(render_loop.step(&mut ctx, t0), LoopState::Running);
        assert_eq!(render_loop.failures(), 1);
    }

    #[test]
    fn hover_events_fire_only_on_region_change() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        let events = recorded_events(&mut ctx);

        let at_motor = screen_position(&ctx, 2);
        move_to(&mut ctx, at_motor);
        move_to(&mut ctx, at_motor + Vec2::new(0.5, 0.0));
        assert_eq!(ctx.hover().region_name, "motor_cortex");
        assert_eq!(ctx.hover().region_id, 7);

        // Unnamed sentinel label counts as no region.
        let at_sentinel = screen_position(&ctx, 3);
        move_to(&mut ctx, at_sentinel);
        move_to(&mut ctx, Vec2::new(400.0, 300.0));

        let hovers: Vec<i32> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::Hover(h) => Some(h.region_id),
                _ => None,
            })
            .collect();
        assert_eq!(hovers, vec![7, -1]);
        assert!(ctx.backend().calls.contains(&Call::Hover(7)));

        render_frame(&mut ctx, t0);
        assert!(ctx.backend().calls.contains(&Call::Text(String::new())));
    }

    #[test]
    fn zooming_re_picks_under_cursor() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        let events = recorded_events(&mut ctx);

        let at = screen_position(&ctx, 2);
        move_to(&mut ctx, at);
        assert_eq!(ctx.hover().region_id, 7);

        // Zooming out pulls the quad toward the centre, away from the cursor.
        ctx.handle_pointer(PointerEvent::Wheel { x: at.x, y: at.y, delta_y: 2400.0 }, SIZE);
        assert_eq!(*ctx.hover(), HoverState::NONE);
        let hovers: Vec<i32> = events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ViewerEvent::Hover(h) => Some(h.region_id),
                _ => None,
            })
            .collect();
        assert_eq!(hovers, vec![7, -1]);
    }

    #[test]
    fn hover_label_is_drawn() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        let at = screen_position(&ctx, 1);
        move_to(&mut ctx, at);
        render_frame(&mut ctx, t0);
        assert!(ctx.backend().calls.contains(&Call::Text("auditory".into())));
    }

    #[test]
    fn seek_notifies_and_resumes_from_position() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        let events = recorded_events(&mut ctx);

        ctx.apply_at(Command::Pause, t0);
        ctx.apply_at(Command::Seek(0.5), t0);
        assert_eq!(ctx.timeline().current_frame(), 5);
        ctx.apply_at(Command::Play, t0);
        render_frame(&mut ctx, t0 + Duration::from_millis(250));
        assert_eq!(ctx.timeline().current_frame(), 7);

        assert_eq!(
            *events.borrow(),
            vec![
                ViewerEvent::PlayState(PlayState::Paused),
                ViewerEvent::Frame(5),
                ViewerEvent::PlayState(PlayState::Playing),
                ViewerEvent::Frame(7),
            ]
        );
    }

    #[test]
    fn traces_toggle_off() {
        let t0 = Instant::now();
        let mut ctx = context(t0);
        ctx.apply_at(Command::ToggleTraces, t0);
        assert!(!ctx.traces_visible());
        render_frame(&mut ctx, t0);
        assert!(!ctx.backend().calls.iter().any(|c| matches!(c, Call::Traces(_))));
    }

    #[test]
    fn mismatched_payload_is_rejected() {
        let mut payload = payload();
        payload.atlas_colors = Some(AtlasColors::new(vec![0.5; 3], 3, 1).unwrap());
        let result = ViewportContext::new(Recorder::default(), payload, &config());
        assert!(matches!(result, Err(ViewerError::Shape { .. })));
    }
}
