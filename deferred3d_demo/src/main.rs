//! Deferred 3D demo
//!
//! Opens a 1280x720 window, loads the baked scene and renders it through the
//! deferred or forward path.
//!
//! Controls: WASD move, E/Q up/down, Shift fast, Ctrl slow, right mouse
//! toggles mouse look, 1-9/0 switch views and render types, Escape quits.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use deferred_3d_engine::deferred3d::{
    Engine, EngineConfig, Error, Renderer, Result,
    builder::ShaderLibrary,
    camera::{Camera, CameraInput},
    frame::{FrameRenderer, FrameStatus, KeyAction},
    render::RendererConfig,
    resource::load_baked_model,
    scene::{ImageFileLoader, Scene, default_light_rig},
};
use deferred_3d_engine::{engine_debug, engine_error, engine_info};
use deferred_3d_engine_renderer_vulkan::{print_validation_stats_report, VulkanRenderer};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const SOURCE: &str = "deferred3d::demo";

/// Everything that exists once the window is up
///
/// Field order is drop order: GPU users go before the renderer.
struct DemoState {
    frame: FrameRenderer,
    scene: Scene,
    camera: Camera,
    renderer: Arc<Mutex<dyn Renderer>>,
    window: Arc<Window>,
}

impl DemoState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let config = EngineConfig::default();
        let renderer_config = RendererConfig {
            app_name: "Deferred 3D".to_string(),
            ..RendererConfig::default()
        };
        let renderer = Engine::create_renderer(VulkanRenderer::new(window.as_ref(), renderer_config)?)?;

        let (frame, scene, camera) = {
            let mut guard = lock(&renderer)?;
            let renderer: &mut dyn Renderer = &mut *guard;

            let model = load_baked_model(&config.scene_file())?;
            let mut scene = Scene::new(renderer)?;
            scene.add_model(renderer, &model, &ImageFileLoader)?;
            for light in default_light_rig() {
                scene.add_light(light)?;
            }

            let camera = Camera::new(renderer, config.camera_position, config.camera_direction)?;
            let swapchain = renderer.create_swapchain(&window)?;
            let shaders = ShaderLibrary::new(config.shader_dir.clone());
            let frame = FrameRenderer::new(
                renderer,
                swapchain,
                &scene,
                &camera,
                config,
                shaders,
                Box::new(ImageFileLoader),
            )?;
            (frame, scene, camera)
        };

        Ok(Self { frame, scene, camera, renderer, window })
    }

    fn redraw(&mut self, dt: f32) -> Result<()> {
        let mut guard = lock(&self.renderer)?;
        self.frame.update(&*guard, dt, &mut self.scene, &mut self.camera)?;
        let status = self.frame.render_frame(&mut *guard, &self.scene, &self.camera)?;
        if status != FrameStatus::Presented {
            engine_debug!(SOURCE, "Frame {:?}", status);
        }
        Ok(())
    }
}

fn lock(renderer: &Arc<Mutex<dyn Renderer>>) -> Result<std::sync::MutexGuard<'_, dyn Renderer + 'static>> {
    renderer
        .lock()
        .map_err(|_| Error::BackendError("Renderer lock poisoned".to_string()))
}

/// Camera flag driven by a movement key
fn camera_flag(code: KeyCode) -> Option<CameraInput> {
    match code {
        KeyCode::KeyW => Some(CameraInput::FORWARD),
        KeyCode::KeyS => Some(CameraInput::BACKWARD),
        KeyCode::KeyA => Some(CameraInput::LEFT),
        KeyCode::KeyD => Some(CameraInput::RIGHT),
        KeyCode::KeyE => Some(CameraInput::UP),
        KeyCode::KeyQ => Some(CameraInput::DOWN),
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Some(CameraInput::FAST),
        KeyCode::ControlLeft | KeyCode::ControlRight => Some(CameraInput::SLOW),
        _ => None,
    }
}

fn digit(code: KeyCode) -> Option<u8> {
    let digit = match code {
        KeyCode::Digit0 => 0,
        KeyCode::Digit1 => 1,
        KeyCode::Digit2 => 2,
        KeyCode::Digit3 => 3,
        KeyCode::Digit4 => 4,
        KeyCode::Digit5 => 5,
        KeyCode::Digit6 => 6,
        KeyCode::Digit7 => 7,
        KeyCode::Digit8 => 8,
        KeyCode::Digit9 => 9,
        _ => return None,
    };
    Some(digit)
}

#[derive(Default)]
struct App {
    state: Option<DemoState>,
    last_frame: Option<Instant>,
    fatal: Option<Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        engine_error!(SOURCE, "Fatal: {}", error);
        self.fatal = Some(error);
        // Release GPU objects while the window still exists
        self.state = None;
        event_loop.exit();
    }

    fn keyboard(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;

        if code == KeyCode::Escape && pressed {
            event_loop.exit();
        } else if let Some(flag) = camera_flag(code) {
            state.camera.set_input(flag, pressed);
        } else if let Some(digit) = digit(code) {
            if pressed && !event.repeat {
                state.frame.handle_key(KeyAction::Digit(digit));
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Deferred 3D")
            .with_inner_size(PhysicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, Error::InitializationFailed(format!("Failed to create window: {}", e)));
                return;
            }
        };

        match DemoState::new(window) {
            Ok(state) => {
                engine_info!(SOURCE, "Demo ready, {} meshes", state.scene.mesh_count());
                self.state = Some(state);
                self.last_frame = Some(Instant::now());
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => self.keyboard(event_loop, event),
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Right, .. } => {
                if let Some(state) = self.state.as_mut() {
                    state.camera.toggle_mouselook();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(state) = self.state.as_mut() {
                    state.camera.cursor_moved(position.x as f32, position.y as f32);
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.frame.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = self.last_frame.map(|last| (now - last).as_secs_f32()).unwrap_or(0.0);
                self.last_frame = Some(now);

                let result = match self.state.as_mut() {
                    Some(state) => state.redraw(dt),
                    None => Ok(()),
                };
                if let Err(e) = result {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

fn run() -> Result<()> {
    Engine::initialize()?;

    let event_loop = EventLoop::new()
        .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    let run_result = event_loop.run_app(&mut app);

    // Scene, passes and camera go before the renderer singleton
    app.state = None;
    Engine::shutdown();
    if cfg!(debug_assertions) {
        print_validation_stats_report();
    }

    if let Some(error) = app.fatal {
        return Err(error);
    }
    run_result.map_err(|e| Error::BackendError(format!("Event loop error: {}", e)))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}
