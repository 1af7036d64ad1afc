//! Integration tests for render targets, render passes and command recording
//! against the Vulkan backend
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test resource_integration_tests -- --ignored

mod gpu_test_utils;

use deferred_3d_engine::deferred3d::Renderer;
use deferred_3d_engine::deferred3d::builder::RenderPassBuilder;
use deferred_3d_engine::deferred3d::render::{
    ClearValue, FramebufferDesc, ImageLayout, LoadOp, Rect2D, StoreOp, TextureDesc, TextureFormat,
    Viewport,
};
use gpu_test_utils::get_test_renderer;
use serial_test::serial;

fn gbuffer_like_pass(renderer: &mut dyn Renderer) -> std::sync::Arc<dyn deferred_3d_engine::deferred3d::render::RenderPass> {
    RenderPassBuilder::new("test_gbuffer")
        .add_attachment(
            TextureFormat::R16G16B16A16_SFLOAT, 1,
            LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
        )
        .add_attachment(
            TextureFormat::R8G8B8A8_UNORM, 1,
            LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
        )
        .add_attachment(
            TextureFormat::D32_SFLOAT, 1,
            LoadOp::Load, StoreOp::None,
            ImageLayout::DepthStencilReadOnly, ImageLayout::DepthStencilReadOnly,
        )
        .build(renderer)
        .unwrap()
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_render_pass_and_framebuffer() {
    let shared = get_test_renderer();
    let mut renderer = shared.lock().unwrap();

    let render_pass = gbuffer_like_pass(&mut *renderer);
    assert_eq!(render_pass.color_attachment_count(), 2);

    let attachments = vec![
        renderer.create_texture(TextureDesc::render_target("normals", 256, 128, TextureFormat::R16G16B16A16_SFLOAT)).unwrap(),
        renderer.create_texture(TextureDesc::render_target("albedo", 256, 128, TextureFormat::R8G8B8A8_UNORM)).unwrap(),
        renderer.create_texture(TextureDesc::render_target("depth", 256, 128, TextureFormat::D32_SFLOAT)).unwrap(),
    ];
    let framebuffer = renderer
        .create_framebuffer(&FramebufferDesc {
            render_pass: &render_pass,
            attachments: attachments.clone(),
            width: 256,
            height: 128,
        })
        .unwrap();
    assert_eq!(framebuffer.attachment_formats(), render_pass.attachment_formats());

    // Wrong order is rejected before reaching the driver
    let mut swapped = attachments.clone();
    swapped.swap(0, 1);
    let result = renderer.create_framebuffer(&FramebufferDesc {
        render_pass: &render_pass,
        attachments: swapped,
        width: 256,
        height: 128,
    });
    assert!(result.is_err());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_integration_record_render_pass() {
    let shared = get_test_renderer();
    let mut renderer = shared.lock().unwrap();

    let render_pass = gbuffer_like_pass(&mut *renderer);
    let attachments = vec![
        renderer.create_texture(TextureDesc::render_target("normals", 64, 64, TextureFormat::R16G16B16A16_SFLOAT)).unwrap(),
        renderer.create_texture(TextureDesc::render_target("albedo", 64, 64, TextureFormat::R8G8B8A8_UNORM)).unwrap(),
        renderer.create_texture(TextureDesc::render_target("depth", 64, 64, TextureFormat::D32_SFLOAT)).unwrap(),
    ];
    let framebuffer = renderer
        .create_framebuffer(&FramebufferDesc { render_pass: &render_pass, attachments, width: 64, height: 64 })
        .unwrap();

    let mut cmd = renderer.create_command_list().unwrap();
    cmd.begin().unwrap();

    // Clear values must cover every attachment
    let too_few = [ClearValue::Color([0.0; 4])];
    assert!(cmd.begin_render_pass(&render_pass, &framebuffer, &too_few).is_err());

    let clears = [
        ClearValue::Color([0.0; 4]),
        ClearValue::Color([0.0; 4]),
        ClearValue::DepthStencil { depth: 0.0, stencil: 0 },
    ];
    cmd.begin_render_pass(&render_pass, &framebuffer, &clears).unwrap();
    cmd.set_viewport(Viewport::full(64, 64)).unwrap();
    cmd.set_scissor(Rect2D::full(64, 64)).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();
}
