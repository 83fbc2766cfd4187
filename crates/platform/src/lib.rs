//! Platform layer: window, event loop, input, and the per-frame drive of the
//! renderer.
//!
//! - Keyboard: WASD move, Space/Shift up/down, Tab toggles mouse capture, Esc exits.
//! - Mouse motion looks around while captured; the wheel zooms.
//! - Surface loss reconfigures the swapchain and skips the frame.

pub mod controls;
pub mod overlay;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use asset::{FurLayerSet, MeshData, TextureData};
use corelib::{FlyCamera, FrameClock, InputState, Transform, Vec3};
use renderer::{
    BudgetPolicy, FrameMatrices, FrameStats, GpuState, RendererSetup, ShaderProgram,
    ShellParameters,
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use controls::{FpsCounter, KeyAction, apply_key};
use overlay::{Overlay, PanelInfo};

/// Pixels of touchpad scroll per wheel line.
const PIXELS_PER_LINE: f64 = 50.0;

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
    /// Show the egui panel.
    pub show_ui: bool,
    /// Put the FPS in the window title.
    pub show_fps: bool,
    pub params: ShellParameters,
    /// Model rotation about +Y, radians per second.
    pub spin_rate: f32,
    pub camera_position: Vec3,
    pub clear_color: wgpu::Color,
    pub budget_policy: BudgetPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            title: "furshell".to_owned(),
            width: 800,
            height: 600,
            backends: wgpu::Backends::all(),
            show_ui: false,
            show_fps: false,
            params: ShellParameters::default(),
            spin_rate: 0.3,
            camera_position: Vec3::new(0.0, 0.0, 3.0),
            clear_color: wgpu::Color {
                r: 0.05,
                g: 0.05,
                b: 0.05,
                a: 1.0,
            },
            budget_policy: BudgetPolicy::Clamp,
        }
    }
}

/// Static data handed to the renderer once the window exists.
pub struct SceneAssets {
    pub fur: FurLayerSet,
    pub mesh: MeshData,
    pub diffuse: Option<TextureData>,
    pub program: ShaderProgram,
}

struct App {
    config: RunConfig,
    assets: Option<SceneAssets>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    overlay: Option<Overlay>,

    params: ShellParameters,
    input: InputState,
    camera: FlyCamera,
    clock: FrameClock,
    fps: FpsCounter,
    last_stats: FrameStats,
    captured: bool,

    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: RunConfig, assets: SceneAssets) -> Self {
        Self {
            params: config.params,
            camera: FlyCamera::new(config.camera_position),
            assets: Some(assets),
            window: None,
            gpu: None,
            overlay: None,
            input: InputState::new(),
            clock: FrameClock::default(),
            fps: FpsCounter::default(),
            last_stats: FrameStats::default(),
            captured: false,
            error: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let assets = self
            .assets
            .take()
            .ok_or_else(|| anyhow!("renderer already initialised"))?;
        let setup = RendererSetup {
            backends: self.config.backends,
            fur: &assets.fur,
            mesh: &assets.mesh,
            diffuse: assets.diffuse.as_ref(),
            program: assets.program,
            budget_policy: self.config.budget_policy,
            clear_color: self.config.clear_color,
        };
        let gpu = pollster::block_on(GpuState::new(window.clone(), setup))?;

        if self.config.show_ui {
            self.overlay = Some(Overlay::new(&window, gpu.device(), gpu.surface_format()));
        } else {
            self.set_capture(&window, true);
        }

        self.clock = FrameClock::new(Instant::now());
        window.request_redraw();
        self.gpu = Some(gpu);
        self.window = Some(window);
        Ok(())
    }

    fn set_capture(&mut self, window: &Window, capture: bool) {
        if capture {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
            if let Err(e) = grabbed {
                log::warn!("Cursor grab unavailable: {e}");
            }
        } else if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Cursor release failed: {e}");
        }
        window.set_cursor_visible(!capture);
        self.captured = capture;
        self.input.look_active = capture;
    }

    fn on_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        match apply_key(&mut self.input, code, pressed, event.repeat) {
            KeyAction::Exit => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            KeyAction::ToggleCapture => {
                if let Some(window) = self.window.clone() {
                    self.set_capture(&window, !self.captured);
                }
            }
            KeyAction::None => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu)) = (self.window.as_ref(), self.gpu.as_mut()) else {
            return;
        };

        let dt = self.clock.tick(Instant::now());
        if let Some(fps) = self.fps.tick(dt) {
            log::debug!("{fps:.1} fps, {} draws", self.last_stats.draws);
            if self.config.show_fps {
                window.set_title(&format!("{} | {fps:.1} fps", self.config.title));
            }
        }

        self.camera.process_input(&self.input, dt);
        self.input.reset_deltas();

        self.params.view_pos = self.camera.position;
        let matrices = FrameMatrices {
            view: self.camera.view(),
            projection: self.camera.projection(gpu.aspect()),
            model: Transform::spinning_y(self.clock.elapsed_secs(), self.config.spin_rate).matrix(),
        };

        let result = match self.overlay.as_mut() {
            Some(overlay) => {
                let info = PanelInfo {
                    fps: self.fps.fps(),
                    stats: self.last_stats,
                    fur_textures: gpu.bound_fur_layers(),
                    shader_linked: gpu.program().is_linked(),
                };
                overlay.prepare(window, &mut self.params, info);
                gpu.render(&self.params, &matrices, |target| overlay.paint(target))
            }
            None => gpu.render(&self.params, &matrices, |_| Vec::new()),
        };

        match result {
            Ok(stats) => self.last_stats = stats,
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Reconfiguring.");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow!("GPU out of memory"));
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
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
        if let (Some(overlay), Some(window)) = (self.overlay.as_mut(), self.window.as_ref()) {
            if overlay.on_window_event(window, &event) && !self.captured {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::info!("Resized: {}x{}", size.width, size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.on_key(event_loop, &event),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.input.add_scroll(lines);
            }
            WindowEvent::Focused(false) => {
                // Keys released while unfocused never arrive.
                self.input = InputState {
                    look_active: self.captured,
                    ..InputState::new()
                };
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.captured {
                self.input.add_mouse_motion(dx as f32, dy as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

/// Open the window, hand `assets` to the renderer, and run until exit.
pub fn run_with_renderer(config: RunConfig, assets: SceneAssets) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    log::info!(
        "Starting event loop: backends {:?}, {}x{}, ui={}",
        config.backends,
        config.width,
        config.height,
        config.show_ui
    );
    let mut app = App::new(config, assets);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
