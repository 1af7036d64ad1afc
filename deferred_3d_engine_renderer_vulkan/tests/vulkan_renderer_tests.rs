//! GPU tests for VulkanRenderer
//!
//! These tests create a real device and need a GPU and a display, so they
//! are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_renderer_tests -- --ignored

use deferred_3d_engine::deferred3d::Renderer;
use deferred_3d_engine::deferred3d::render::{
    AcquireOutcome, BufferDesc, BufferUsage, RendererConfig, TextureData, TextureDesc, TextureFormat,
    TextureUsage, full_mip_chain,
};
use deferred_3d_engine_renderer_vulkan::VulkanRenderer;
use winit::event_loop::EventLoop;
use winit::window::Window;

#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let attributes = Window::default_attributes()
        .with_title("Vulkan renderer test")
        .with_inner_size(winit::dpi::PhysicalSize::new(320, 240))
        .with_visible(false);
    let window = event_loop.create_window(attributes).unwrap();
    (window, event_loop)
}

fn create_renderer(window: &Window) -> VulkanRenderer {
    let config = RendererConfig {
        enable_validation: false,
        ..RendererConfig::default()
    };
    VulkanRenderer::new(window, config).unwrap()
}

fn sampled_texture(name: &str, width: u32, height: u32) -> TextureDesc {
    TextureDesc {
        name: name.to_string(),
        width,
        height,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLED,
        array_layers: 1,
        mip_levels: 1,
        cube_compatible: false,
        data: None,
    }
}

#[test]
#[ignore] // Requires GPU
fn test_texture_with_mip_chain() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let mut desc = sampled_texture("mips", 64, 32);
    desc.mip_levels = full_mip_chain(64, 32);
    desc.data = Some(TextureData::Single(vec![255u8; 64 * 32 * 4]));

    let texture = renderer.create_texture(desc).unwrap();
    assert_eq!(texture.info().mip_levels, 7);
    assert_eq!(renderer.stats().textures, 1);

    drop(texture);
    assert_eq!(renderer.stats().textures, 0);
}

#[test]
#[ignore] // Requires GPU
fn test_cubemap_upload() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let face = vec![128u8; 8 * 8 * 4];
    let mut desc = sampled_texture("cube", 8, 8);
    desc.array_layers = 6;
    desc.cube_compatible = true;
    desc.data = Some(TextureData::Layers(vec![face; 6]));

    let texture = renderer.create_texture(desc).unwrap();
    assert!(texture.info().cube_compatible);
}

#[test]
#[ignore] // Requires GPU
fn test_wrong_layer_size_rejected() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let mut desc = sampled_texture("bad", 8, 8);
    desc.data = Some(TextureData::Single(vec![0u8; 10]));
    assert!(renderer.create_texture(desc).is_err());
    assert_eq!(renderer.stats().textures, 0);
}

#[test]
#[ignore] // Requires GPU
fn test_depth_render_target() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let texture = renderer
        .create_texture(TextureDesc::render_target("depth", 320, 240, TextureFormat::D32_SFLOAT))
        .unwrap();
    assert!(texture.info().usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT));
}

#[test]
#[ignore] // Requires GPU
fn test_buffer_update_bounds() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let buffer = renderer
        .create_buffer(BufferDesc { name: "vertices".to_string(), size: 64, usage: BufferUsage::Vertex })
        .unwrap();
    buffer.update(0, &[1u8; 64]).unwrap();
    buffer.update(60, &[1u8; 4]).unwrap();
    assert!(buffer.update(61, &[1u8; 4]).is_err());
    assert_eq!(renderer.stats().buffers, 1);
}

#[test]
#[ignore] // Requires GPU
fn test_zero_sized_buffer_rejected() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    assert!(renderer.create_buffer(BufferDesc::uniform("empty", 0)).is_err());
}

#[test]
#[ignore] // Requires GPU
fn test_swapchain_acquire() {
    let (window, _event_loop) = create_test_window();
    let mut renderer = create_renderer(&window);

    let mut swapchain = renderer.create_swapchain(&window).unwrap();
    assert!(swapchain.image_count() >= 2);
    assert_eq!(swapchain.images().len(), swapchain.image_count());

    renderer.wait_for_frame(0).unwrap();
    match swapchain.acquire_next_image(0).unwrap() {
        AcquireOutcome::Image(index) => assert!((index as usize) < swapchain.image_count()),
        AcquireOutcome::OutOfDate => {}
    }
    assert!(swapchain.acquire_next_image(5).is_err());
    renderer.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_frame_slot_bounds() {
    let (window, _event_loop) = create_test_window();
    let renderer = create_renderer(&window);

    renderer.wait_for_frame(0).unwrap();
    renderer.wait_for_frame(1).unwrap();
    assert!(renderer.wait_for_frame(2).is_err());
    assert_eq!(renderer.stats().frames_submitted, 0);
}
