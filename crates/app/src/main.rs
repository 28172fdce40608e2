//! Manaburn - Main Entry Point
//!
//! Opens a window, renders the default scene every frame, and moves the
//! camera with WASD and the mouse wheel.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use manaburn_core::{EngineConfig, FrameTimer};
use manaburn_platform::{EngineEvent, EventTranslator, KeyCode, Window};
use manaburn_renderer::Renderer;
use manaburn_scene::Camera;

/// How long the loop sleeps per iteration while the window is minimized.
const MINIMIZED_IDLE: Duration = Duration::from_millis(100);

/// Applies a camera control for `event`. Returns whether the camera moved.
fn apply_camera_control(camera: &mut Camera, event: EngineEvent) -> bool {
    match event {
        EngineEvent::KeyDown(KeyCode::KeyA) => camera.move_left(),
        EngineEvent::KeyDown(KeyCode::KeyD) => camera.move_right(),
        EngineEvent::KeyDown(KeyCode::KeyW) => camera.move_up(),
        EngineEvent::KeyDown(KeyCode::KeyS) => camera.move_down(),
        EngineEvent::MouseWheel(delta) => camera.zoom(delta),
        _ => return false,
    }
    true
}

struct App {
    config: EngineConfig,
    // Renderer is declared first so it drops before the window
    renderer: Option<Renderer>,
    window: Option<Window>,
    events: EventTranslator,
    camera: Camera,
    timer: FrameTimer,
    stop_rendering: bool,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            events: EventTranslator::new(),
            camera: Camera::new(),
            timer: FrameTimer::new(Duration::from_secs(1)),
            stop_rendering: false,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        error!("{:#}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Window::new(event_loop, &self.config).context("Failed to create window")?;
        let renderer =
            Renderer::new(&window, &self.config).context("Failed to initialize renderer")?;

        info!("Initialization complete, entering main loop");
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn handle_engine_event(&mut self, event_loop: &ActiveEventLoop, event: EngineEvent) {
        match event {
            EngineEvent::Quit => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            EngineEvent::Minimized => {
                debug!("Window minimized, pausing rendering");
                self.stop_rendering = true;
            }
            EngineEvent::Maximized | EngineEvent::Restored => {
                debug!("Window {:?}, resuming rendering", event);
                self.stop_rendering = false;
                self.request_resize();
            }
            EngineEvent::Resized(extent) => {
                debug!("Window resized to {}x{}", extent.width, extent.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.request_resize(extent);
                }
            }
            EngineEvent::KeyDown(KeyCode::Escape) => event_loop.exit(),
            other => {
                if apply_camera_control(&mut self.camera, other) {
                    debug!("Camera at {:?}", self.camera.position);
                }
            }
        }
    }

    fn request_resize(&mut self) {
        if let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) {
            renderer.request_resize(window.inner_size());
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.stop_rendering {
            return;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        match renderer.draw(&self.camera) {
            Ok(_) => {
                self.timer.tick();
                if let Some(fps) = self.timer.take_fps() {
                    debug!("{:.1} fps (frame {})", fps, renderer.frame_number());
                }
            }
            Err(e) => self.fail(event_loop, anyhow::Error::new(e).context("Frame failed")),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let WindowEvent::RedrawRequested = event {
            self.redraw(event_loop);
            return;
        }

        let is_maximized = self.window.as_ref().is_some_and(Window::is_maximized);
        if let Some(engine_event) = self.events.translate_window_event(&event, is_maximized) {
            self.handle_engine_event(event_loop, engine_event);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.events.input_mut().begin_frame();

        if self.stop_rendering {
            std::thread::sleep(MINIMIZED_IDLE);
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    manaburn_core::init_logging();

    let config = EngineConfig::default();
    config.validate()?;
    info!("Starting {}", config.application_name());

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(e) = app.fatal.take() {
        return Err(e);
    }

    info!("Shut down cleanly");
    Ok(())
}
