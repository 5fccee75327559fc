//! Window creation and event handling via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]: it opens the
//! window, brings up the GPU on `resumed`, routes mouse input to the orbit
//! controls and draws the earth scene on every redraw. Edits to `config.ron`
//! are picked up about once a second and whenever the window gains focus.

use std::sync::Arc;
use std::time::{Duration, Instant};

use terra_config::{Config, ConfigReloader};
use terra_input::MouseState;
use terra_render::{
    Camera, RenderContext, RenderContextError, RendererError, RendererOptions, SceneRenderer,
    SurfaceError, SurfaceOptions, SurfaceWrapper, init_render_context_blocking,
};
use terra_scene::{EarthScene, OrbitControls, SceneError, restart_required};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::game_loop::GameLoop;

/// How often redraws check `config.ron` for edits.
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("scene setup failed: {0}")]
    Scene(#[from] SceneError),
    #[error("GPU initialization failed: {0}")]
    RenderContext(#[from] RenderContextError),
    #[error("renderer setup failed: {0}")]
    Renderer(#[from] RendererError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

/// Frames-per-second over one-second windows.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
        }
    }

    /// Count a frame. Returns the rate once a full window has elapsed.
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Self::WINDOW {
            return None;
        }
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}

/// Everything the viewer owns between frames.
pub struct AppState {
    pub config: Config,
    pub window: Option<Arc<Window>>,
    pub gpu: Option<RenderContext>,
    pub renderer: Option<SceneRenderer>,
    pub surface_wrapper: SurfaceWrapper,
    pub earth: EarthScene,
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub mouse: MouseState,
    pub game_loop: GameLoop,
    /// Error that stopped the event loop, reported by [`run_with_config`].
    pub fatal: Option<AppError>,
    reloader: Option<ConfigReloader>,
    last_config_poll: Instant,
    fps: FpsCounter,
}

impl AppState {
    /// Build the scene and camera. GPU resources wait for `resumed`.
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        let earth = EarthScene::from_config(&config)?;
        let orbit = OrbitControls::from_config(&config.camera);
        let mut camera = Camera::perspective(
            config.camera.fov_y_deg,
            config.camera.near,
            config.camera.far,
            orbit.eye(),
        );
        camera.target = orbit.target;
        camera.set_viewport(config.window.width, config.window.height);
        info!(
            "Scene ready: {} nodes, {} stars",
            earth.scene.len(),
            config.scene.num_stars
        );

        Ok(Self {
            surface_wrapper: SurfaceWrapper::new(config.window.width, config.window.height, 1.0),
            window: None,
            gpu: None,
            renderer: None,
            earth,
            camera,
            orbit,
            mouse: MouseState::new(),
            game_loop: GameLoop::new(),
            fatal: None,
            reloader: None,
            last_config_poll: Instant::now(),
            fps: FpsCounter::new(Instant::now()),
            config,
        })
    }

    /// Watch the config file for live edits.
    pub fn with_reloader(mut self, reloader: ConfigReloader) -> Self {
        info!("Watching {} for changes", reloader.path().display());
        self.reloader = Some(reloader);
        self
    }

    /// Check the config file and apply its live settings if it changed.
    ///
    /// Returns whether a new config took effect. A broken or invalid file is
    /// logged and the running config stays as it is.
    pub fn reload_config(&mut self) -> bool {
        let Some(reloader) = &mut self.reloader else {
            return false;
        };
        match reloader.poll() {
            Ok(Some(config)) => self.apply_reloaded_config(config),
            Ok(None) => false,
            Err(e) => {
                warn!("Config reload failed: {e}");
                false
            }
        }
    }

    fn apply_reloaded_config(&mut self, config: Config) -> bool {
        if let Err(e) = self.earth.apply_live_settings(&config.scene) {
            warn!("Ignoring reloaded config: {e}");
            return false;
        }
        let pending = restart_required(&self.config.scene, &config.scene);
        if !pending.is_empty() {
            warn!("Restart to apply: {}", pending.join(", "));
        }
        info!(
            "Live settings applied: earth spin {}, cloud spin {}, cloud opacity {}",
            config.scene.earth_spin, config.scene.cloud_spin, config.scene.cloud_opacity
        );
        self.config = config;
        true
    }

    /// Run the due simulation ticks and move the camera to the orbit eye.
    ///
    /// `frame_time` overrides the wall clock.
    pub fn simulate(&mut self, frame_time: Option<f64>) -> u32 {
        let earth = &mut self.earth;
        let orbit = &mut self.orbit;
        let mouse = &mut self.mouse;
        let step = |_dt: f64, _sim_time: f64| {
            orbit.update(&mouse.orbit_input());
            mouse.clear_transients();
            earth.tick();
        };
        let steps = match frame_time {
            Some(frame_time) => self.game_loop.advance(frame_time, step),
            None => self.game_loop.tick(step),
        };

        self.camera.position = self.orbit.eye();
        self.camera.target = self.orbit.target;
        steps
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);

        let scale_factor = window.scale_factor();
        let inner_size = window.inner_size();
        self.surface_wrapper =
            SurfaceWrapper::new(inner_size.width, inner_size.height, scale_factor);
        self.camera.set_viewport(inner_size.width, inner_size.height);
        info!(
            "Surface wrapper initialized: {}x{} (scale: {:.2})",
            inner_size.width, inner_size.height, scale_factor
        );

        let gpu = init_render_context_blocking(
            Arc::clone(&window),
            SurfaceOptions {
                vsync: self.config.window.vsync,
                wireframe: self.config.render.wireframe,
            },
        )?;

        let size = self.surface_wrapper.physical_size();
        let renderer = SceneRenderer::new(
            &gpu.device,
            &gpu.queue,
            gpu.surface_format,
            (size.width, size.height),
            &self.earth.scene,
            &RendererOptions {
                texture_dir: self.config.scene.texture_dir.clone(),
                clear_color: self.config.render.clear_color,
                wireframe: self.config.render.wireframe && gpu.wireframe_supported,
            },
        )?;
        info!("Renderer ready with {} draws", renderer.draw_count());

        self.gpu = Some(gpu);
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!("{err}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn apply_resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
            if let Some(renderer) = &mut self.renderer {
                renderer.resize(&gpu.device, width, height);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now.saturating_duration_since(self.last_config_poll) >= CONFIG_POLL_INTERVAL {
            self.last_config_poll = now;
            self.reload_config();
        }
        self.simulate(None);

        let (Some(gpu), Some(renderer)) = (&self.gpu, &mut self.renderer) else {
            return;
        };
        match renderer.render(gpu, &self.earth.scene, &self.camera, &self.earth.sun) {
            Ok(()) => {}
            Err(SurfaceError::Timeout) => {
                warn!("Surface timeout, skipping frame");
                return;
            }
            Err(e) => {
                error!("Render error: {e}");
                event_loop.exit();
                return;
            }
        }

        if let Some(fps) = self.fps.record(Instant::now())
            && self.config.debug.show_fps
        {
            info!(
                "{fps:.1} fps ({} frames, {} ticks)",
                self.game_loop.frame_count(),
                self.game_loop.update_count()
            );
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(resize) = self
                    .surface_wrapper
                    .handle_resize(new_size.width, new_size.height)
                {
                    let w = resize.physical.width;
                    let h = resize.physical.height;
                    self.apply_resize(w, h);
                    info!(
                        "Window resized to {}x{} (scale: {:.2})",
                        w, h, resize.scale_factor
                    );
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let Some(inner) = self.window.as_ref().map(|w| w.inner_size()) else {
                    return;
                };
                if let Some(resize) = self.surface_wrapper.handle_scale_factor_changed(
                    scale_factor,
                    inner.width,
                    inner.height,
                ) {
                    let w = resize.physical.width;
                    let h = resize.physical.height;
                    self.apply_resize(w, h);
                    info!(
                        "Scale factor changed to {:.2}, resized to {}x{}",
                        scale_factor, w, h
                    );
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.on_cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse.on_button(button, state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.mouse.on_scroll(delta);
            }
            WindowEvent::CursorEntered { .. } => {
                self.mouse.on_cursor_entered();
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse.on_cursor_left();
            }
            WindowEvent::Focused(true) => {
                self.reload_config();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the viewer window and block until it closes.
///
/// With a `reloader`, edits to the config file are applied while running.
///
/// # Errors
///
/// Returns [`AppError`] if the scene cannot be built, the event loop fails,
/// or window/GPU setup fails during `resumed`.
#[instrument(skip(config, reloader))]
pub fn run_with_config(
    config: Config,
    reloader: Option<ConfigReloader>,
) -> Result<(), AppError> {
    let mut app = AppState::with_config(config)?;
    if let Some(reloader) = reloader {
        app = app.with_reloader(reloader);
    }
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
