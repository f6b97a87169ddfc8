use crate::config::DemoConfig;
use crate::loading::SceneLoader;
use anyhow::{Context as _, Result};
use egui::Context as EguiContext;
use glam::Vec2;
use glyphfield_input::{Action, OrbitControls, PointerButton, PointerState};
use glyphfield_render::{FrameOutcome, RenderError, RenderLoop, Viewport};
use glyphfield_render_wgpu::{FrameReport, WgpuRenderer, acquire_frame};
use glyphfield_scene::{DemoScene, PerspectiveCamera, Scene, TextStatus};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixel scroll distance that counts as one wheel step.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

/// Everything the demo owns apart from the GPU.
pub struct AppState {
    pub config: DemoConfig,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub pointer: PointerState,
    pub viewport: Viewport,
    pub render_loop: RenderLoop,
    pub demo: Option<DemoScene>,
    pub status: String,
    pub show_panel: bool,
    pub last_report: FrameReport,
    loader: Option<SceneLoader>,
    empty: Scene,
}

impl AppState {
    /// Start loading assets. Frames render an empty scene until they arrive.
    pub fn new(config: DemoConfig) -> Self {
        let loader = SceneLoader::start(&config);
        let (camera, controls) = initial_view(&config);
        let viewport = Viewport::new(config.window.width, config.window.height, 1.0);

        let mut state = Self {
            config,
            camera,
            controls,
            pointer: PointerState::new(),
            viewport,
            render_loop: RenderLoop::new(),
            demo: None,
            status: "Loading font...".into(),
            show_panel: true,
            last_report: FrameReport::default(),
            loader: Some(loader),
            empty: Scene::new(),
        };
        state.apply_viewport();
        state
    }

    /// The populated scene, or an empty one while loading.
    pub fn scene(&self) -> &Scene {
        self.demo.as_ref().map_or(&self.empty, |demo| &demo.scene)
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    /// Pick up finished asset loads. Returns true on the frame the scene is
    /// built.
    pub fn poll_loading(&mut self) -> bool {
        let Some(result) = self.loader.as_mut().and_then(SceneLoader::poll) else {
            return false;
        };
        self.loader = None;

        match result {
            Ok(demo) => {
                self.status = match &demo.text {
                    TextStatus::Built { missing, .. } if missing.is_empty() => "Text ready".into(),
                    TextStatus::Built { missing, .. } => {
                        format!("Text ready, {} glyphs missing", missing.len())
                    }
                    TextStatus::FontFailed(e) => format!("No text: {e}"),
                    TextStatus::GeometryFailed(e) => format!("No text: {e}"),
                };
                self.demo = Some(demo);
            }
            Err(e) => {
                tracing::error!("scene setup failed: {e}");
                self.status = format!("Setup failed: {e}");
            }
        }
        true
    }

    /// Update the controls, then render the current scene with `render`.
    pub fn frame<T>(
        &mut self,
        render: impl FnOnce(&Scene, &PerspectiveCamera) -> T,
    ) -> FrameOutcome<T> {
        let scene = match &self.demo {
            Some(demo) => &demo.scene,
            None => &self.empty,
        };
        self.render_loop
            .run_frame(&mut self.controls, &mut self.camera, |camera| {
                render(scene, camera)
            })
    }

    /// Window resized, in physical pixels.
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        let logical: LogicalSize<u32> =
            winit::dpi::PhysicalSize::new(width, height).to_logical(scale_factor);
        self.viewport
            .resize(logical.width, logical.height, scale_factor);
        self.apply_viewport();
    }

    fn apply_viewport(&mut self) {
        if !self.viewport.is_visible() {
            return;
        }
        self.viewport.apply_to(&mut self.camera);
        self.controls
            .set_viewport_height(self.viewport.size().1 as f32);
    }

    pub fn reset_camera(&mut self) {
        let (camera, controls) = initial_view(&self.config);
        self.camera = camera;
        self.controls = controls;
        self.apply_viewport();
    }

    fn handle_action(&mut self, action: Option<Action>) {
        if let Some(action) = action {
            self.controls.handle(action, &self.camera);
        }
    }

    /// Pointer moved, in logical pixels.
    pub fn on_pointer_moved(&mut self, position: Vec2) {
        let action = self.pointer.on_moved(position);
        self.handle_action(action);
    }

    pub fn on_pointer_button(&mut self, button: PointerButton, pressed: bool) {
        self.pointer.on_button(button, pressed);
    }

    pub fn on_wheel(&mut self, steps: f32) {
        let action = self.pointer.on_wheel(steps);
        self.handle_action(action);
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed && key == KeyCode::F1 {
            self.show_panel = !self.show_panel;
        }
    }
}

/// The configured camera, with the controls orbiting what it looks at.
fn initial_view(config: &DemoConfig) -> (PerspectiveCamera, OrbitControls) {
    let camera = config.camera.clone();
    let mut controls = config.controls.clone();
    controls.target = camera.target;
    (camera, controls)
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
    }
}

/// Window plus everything created against it.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, state: &mut AppState, egui_ctx: &EguiContext) -> Result<Self> {
        let window_config = &state.config.window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(LogicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let size = window.inner_size();
        state.resize(size.width, size.height, window.scale_factor());
        let (width, height) = state.viewport.physical_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glyphfield_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| RenderError::Device(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut renderer = WgpuRenderer::new(&device, format, width, height);
        renderer.clear_color = wgpu::Color {
            r: 0.02,
            g: 0.02,
            b: 0.03,
            a: 1.0,
        };

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        tracing::info!(
            width,
            height,
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            surface_config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    /// Reconfigure the surface for a new physical size.
    fn configure(&mut self, (width, height): (u32, u32)) {
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.renderer.resize(&self.device, width, height);
    }
}

pub struct GpuApp {
    state: AppState,
    egui_ctx: EguiContext,
    gpu: Option<Gpu>,
}

impl GpuApp {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            state: AppState::new(config),
            egui_ctx: EguiContext::default(),
            gpu: None,
        }
    }

    fn resize(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let size = gpu.window.inner_size();
        self.state
            .resize(size.width, size.height, gpu.window.scale_factor());
        if self.state.viewport.is_visible() {
            gpu.configure(self.state.viewport.physical_size());
        }
    }

    fn redraw(&mut self) {
        if self.state.poll_loading() {
            tracing::info!(status = %self.state.status, "scene loaded");
        }

        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if !self.state.viewport.is_visible() {
            return;
        }

        let output = match acquire_frame(&gpu.surface) {
            Ok(t) => t,
            Err(RenderError::SurfaceLost) => {
                gpu.surface.configure(&gpu.device, &gpu.surface_config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let outcome = self.state.frame(|scene, camera| {
            gpu.renderer
                .render(&gpu.device, &gpu.queue, &view, scene, camera)
        });
        match outcome {
            FrameOutcome::Continue(report) => self.state.last_report = report,
            FrameOutcome::Stopped => return,
        }

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            crate::ui::draw_panel(ctx, &mut self.state);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        // The surface is sized with the clamped pixel ratio, not the native one.
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.surface_config.width, gpu.surface_config.height],
            pixels_per_point: full_output.pixels_per_point * self.state.viewport.pixel_ratio()
                / gpu.window.scale_factor() as f32,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &mut self.state, &self.egui_ctx) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to start renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state.render_loop.stop();
                tracing::info!(frames = self.state.render_loop.stats().frames, "closing");
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                self.state
                    .handle_key(key, key_state == ElementState::Pressed);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = pointer_button(button) {
                    self.state
                        .on_pointer_button(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = self
                    .gpu
                    .as_ref()
                    .map_or(1.0, |gpu| gpu.window.scale_factor());
                let logical = position.to_logical::<f32>(scale);
                self.state
                    .on_pointer_moved(Vec2::new(logical.x, logical.y));
            }
            WindowEvent::CursorLeft { .. } => {
                self.state.pointer.on_left();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.state.on_wheel(wheel_steps(delta));
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn missing_assets() -> (tempfile::TempDir, DemoConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = DemoConfig {
            font: dir.path().join("font.json"),
            texture: dir.path().join("matcap.png"),
            seed: Some(3),
            ..DemoConfig::default()
        };
        (dir, config)
    }

    fn wait_for_scene(state: &mut AppState) {
        for _ in 0..1000 {
            if state.poll_loading() {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("scene never loaded");
    }

    #[test]
    fn frames_render_empty_until_loaded() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);

        let meshes = state.frame(|scene, _| scene.len());
        assert_eq!(meshes, FrameOutcome::Continue(0));

        wait_for_scene(&mut state);
        assert!(!state.is_loading());
        assert!(state.status.starts_with("No text"));
        let meshes = state.frame(|scene, _| scene.len());
        assert_eq!(meshes, FrameOutcome::Continue(200));
        assert_eq!(state.render_loop.stats().frames, 2);
        assert!(!state.poll_loading());
    }

    #[test]
    fn resize_clamps_pixel_ratio_and_updates_aspect() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);

        state.resize(3840, 1080, 3.0);
        assert_eq!(state.viewport.size(), (1280, 360));
        assert_eq!(state.viewport.pixel_ratio(), 2.0);
        assert_eq!(state.viewport.physical_size(), (2560, 720));
        assert!((state.camera.aspect() - 1280.0 / 360.0).abs() < 1e-5);
        assert_eq!(state.controls.viewport_height, 360.0);
    }

    #[test]
    fn minimized_window_keeps_the_last_projection() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);
        let aspect = state.camera.aspect();

        state.resize(0, 0, 1.0);
        assert!(!state.viewport.is_visible());
        assert_eq!(state.camera.aspect(), aspect);
    }

    #[test]
    fn drag_orbits_the_camera() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);
        state.controls.enable_damping = false;
        let before = state.camera.position;

        state.on_pointer_moved(Vec2::new(100.0, 100.0));
        state.on_pointer_button(PointerButton::Primary, true);
        state.on_pointer_moved(Vec2::new(160.0, 100.0));
        state.frame(|_, _| ());

        assert_ne!(state.camera.position, before);
        assert!((state.camera.distance() - before.length()).abs() < 1e-4);
    }

    #[test]
    fn f1_toggles_the_panel() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);
        assert!(state.show_panel);
        state.handle_key(KeyCode::F1, true);
        state.handle_key(KeyCode::F1, false);
        assert!(!state.show_panel);
    }

    #[test]
    fn reset_restores_the_configured_view() {
        let (_dir, config) = missing_assets();
        let mut state = AppState::new(config);
        state.controls.enable_damping = false;
        state.on_wheel(5.0);
        state.frame(|_, _| ());
        assert!(state.camera.distance() < state.config.camera.distance());

        state.reset_camera();
        assert_eq!(state.camera.position, state.config.camera.position);
        assert!(state.controls.enable_damping);
    }

    #[test]
    fn wheel_deltas_become_steps() {
        assert_eq!(wheel_steps(MouseScrollDelta::LineDelta(0.0, 2.0)), 2.0);
        let pixels = winit::dpi::PhysicalPosition::new(0.0, -100.0);
        assert_eq!(wheel_steps(MouseScrollDelta::PixelDelta(pixels)), -2.0);
    }
}
