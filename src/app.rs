use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::backend::GpuBackend;
use crate::config::ViewerConfig;
use crate::controls::{PlayButton, PlaybackSlider};
use crate::error::{Result, ViewerError};
use crate::gpu::GpuContext;
use crate::input::{Command, Input, InputAction};
use crate::payload::Payload;
use crate::timeline::PlayState;
use crate::viewport::{LoopState, RenderLoop, ViewerEvent, ViewportContext};

/// Slider ticks moved by PageUp/PageDown.
const SLIDER_NUDGE: i32 = 10;

/// Open a window and run the viewer until it is closed.
///
/// ```no_run
/// use cortexview::{ViewerConfig, demo};
///
/// let payload = demo::hemisphere(&demo::DemoSettings::default()).unwrap();
/// cortexview::run(ViewerConfig::default(), payload).unwrap();
/// ```
pub fn run(config: ViewerConfig, payload: Payload) -> Result<()> {
    config.validate()?;
    payload.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = CortexviewApp::Pending {
        config,
        payload: Some(payload),
    };
    event_loop.run_app(&mut app)?;

    match app {
        CortexviewApp::Exited(Some(e)) => Err(e),
        _ => Ok(()),
    }
}

/// Playback controls and hover readout shown in the window title.
struct HostControls {
    title: String,
    frame_count: usize,
    slider: PlaybackSlider,
    button: PlayButton,
    region: String,
}

impl HostControls {
    fn new(title: &str, frame_count: usize, playing: bool) -> Self {
        Self {
            title: title.to_string(),
            frame_count,
            slider: PlaybackSlider::default(),
            button: PlayButton::new(playing),
            region: String::new(),
        }
    }

    /// Mirror a viewer notification.
    ///
    /// Returns the seek the title widget reported back, if the echo guard let
    /// one through.
    fn on_event(&mut self, event: &ViewerEvent) -> Option<Command> {
        match event {
            ViewerEvent::Frame(frame) => {
                // The title reports a changed value back like a slider widget would.
                let value = self.slider.apply_frame(*frame, self.frame_count)?;
                return self.slider.user_moved(value).map(Command::Seek);
            }
            ViewerEvent::Hover(hover) => self.region = hover.region_name.clone(),
            ViewerEvent::PlayState(state) => self.button.set_playing(*state == PlayState::Playing),
        }
        None
    }

    fn clicked(&mut self) -> Command {
        self.button.clicked()
    }

    /// Seek command for a slider nudge by `delta` ticks.
    fn nudge(&mut self, delta: i32) -> Option<Command> {
        let value = self.slider.value().saturating_add_signed(delta);
        self.slider
            .seek_command(value.min(self.slider.resolution()))
    }

    fn caption(&self) -> String {
        let percent = self.slider.value() * 100 / self.slider.resolution();
        let mut caption = format!("{} | {} | {}%", self.title, self.button.label(), percent);
        if !self.region.is_empty() {
            caption.push_str(" | ");
            caption.push_str(&self.region);
        }
        caption
    }
}

enum CortexviewApp {
    Pending {
        config: ViewerConfig,
        payload: Option<Payload>,
    },
    Running {
        window: Arc<Window>,
        viewport: ViewportContext<GpuBackend>,
        render_loop: RenderLoop,
        input: Input,
        controls: Rc<RefCell<HostControls>>,
    },
    Exited(Option<ViewerError>),
}

impl CortexviewApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &ViewerConfig,
        payload: Payload,
    ) -> Result<CortexviewApp> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = GpuContext::new_windowed(window.clone())?;
        let backend = GpuBackend::new(gpu, &payload, &config.render);
        let frame_count = payload.frame_count();
        let mut viewport = ViewportContext::new(backend, payload, config)?;

        let controls = Rc::new(RefCell::new(HostControls::new(
            &config.window.title,
            frame_count,
            viewport.timeline().is_playing(),
        )));
        window.set_title(&controls.borrow().caption());

        let listener_controls = Rc::clone(&controls);
        let listener_window = Arc::clone(&window);
        viewport.set_listener(move |event| {
            log::debug!("{:?}", event);
            let mut controls = listener_controls.borrow_mut();
            if let Some(Command::Seek(position)) = controls.on_event(&event) {
                log::warn!("Slider echo leaked as a seek to {:.3}", position);
            }
            listener_window.set_title(&controls.caption());
        });

        log::info!(
            "Viewer started: {} vertices, {} frames",
            viewport.payload().mesh.vertex_count(),
            frame_count
        );

        Ok(CortexviewApp::Running {
            window,
            viewport,
            render_loop: RenderLoop::new(config.render.failure_warn_every),
            input: Input::new(),
            controls,
        })
    }
}

impl ApplicationHandler for CortexviewApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let CortexviewApp::Pending { config, payload } = self {
            let Some(payload) = payload.take() else {
                return;
            };
            *self = match CortexviewApp::start(event_loop, config, payload) {
                Ok(running) => running,
                Err(e) => {
                    log::error!("Failed to start viewer: {}", e);
                    event_loop.exit();
                    CortexviewApp::Exited(Some(e))
                }
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let CortexviewApp::Running {
            window,
            viewport,
            render_loop,
            input,
            controls,
        } = self
        else {
            return;
        };

        let size = window.inner_size();
        match input.handle_event(&event) {
            Some(InputAction::Pointer(pointer)) => {
                viewport.handle_pointer(pointer, (size.width, size.height));
            }
            Some(InputAction::Command(Command::TogglePlay)) => {
                let command = controls.borrow_mut().clicked();
                viewport.apply(command);
            }
            Some(InputAction::Command(command)) => viewport.apply(command),
            None => {}
        }

        match event {
            WindowEvent::CloseRequested => {
                render_loop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewport
                    .backend_mut()
                    .gpu_mut()
                    .resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event: key, .. }
                if key.state == ElementState::Pressed && !key.repeat =>
            {
                let delta = match key.physical_key {
                    PhysicalKey::Code(KeyCode::PageUp) => SLIDER_NUDGE,
                    PhysicalKey::Code(KeyCode::PageDown) => -SLIDER_NUDGE,
                    _ => return,
                };
                let command = controls.borrow_mut().nudge(delta);
                if let Some(command) = command {
                    viewport.apply(command);
                }
            }
            WindowEvent::RedrawRequested => {
                match render_loop.step(viewport, Instant::now()) {
                    LoopState::Running => window.request_redraw(),
                    LoopState::Stopped => {
                        log::error!("Render loop stopped");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }
}
