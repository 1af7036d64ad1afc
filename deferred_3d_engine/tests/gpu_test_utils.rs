#![allow(dead_code)]
//! GPU test utilities - a shared VulkanRenderer for integration tests
//!
//! `ash-window` refuses to create several surfaces for one window on some
//! platforms, so resource tests share a single renderer and window for the
//! whole process.

use deferred_3d_engine::deferred3d::render::RendererConfig;
use deferred_3d_engine_renderer_vulkan::VulkanRenderer;
use std::sync::{Arc, Mutex, OnceLock};
use winit::event_loop::EventLoop;
use winit::window::Window;

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;

static GPU_RENDERER: OnceLock<Arc<Mutex<VulkanRenderer>>> = OnceLock::new();

/// Keeps the window of the shared renderer alive
static GPU_WINDOW: OnceLock<Window> = OnceLock::new();

/// Shared renderer, created on first use
///
/// The event loop is leaked on purpose: it cannot live in a static, and the
/// window must outlive the renderer.
pub fn get_test_renderer() -> Arc<Mutex<VulkanRenderer>> {
    GPU_RENDERER
        .get_or_init(|| {
            let (window, event_loop) = create_test_window();
            let config = RendererConfig { enable_validation: true, ..RendererConfig::default() };
            let renderer = VulkanRenderer::new(&window, config).expect("Failed to create VulkanRenderer for tests");
            std::mem::forget(event_loop);
            GPU_WINDOW.set(window).ok();
            Arc::new(Mutex::new(renderer))
        })
        .clone()
}

/// Hidden 800x600 window; the event loop may be created off the main thread
#[allow(deprecated)]
pub fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = {
        #[cfg(target_os = "windows")]
        {
            EventLoop::builder().with_any_thread(true).build().unwrap()
        }
        #[cfg(not(target_os = "windows"))]
        {
            EventLoop::builder().build().unwrap()
        }
    };

    let attributes = Window::default_attributes()
        .with_title("GPU Test Window")
        .with_inner_size(winit::dpi::PhysicalSize::new(800, 600))
        .with_visible(false);
    let window = event_loop.create_window(attributes).unwrap();
    (window, event_loop)
}
