/// Unit tests for MockRenderer and associated mock types.

use crate::renderer::mock_renderer::*;
use crate::renderer::{
    Renderer, Buffer, Texture, CommandList, Swapchain,
    BufferDesc, TextureDesc, TextureFormat,
    RenderPass, RenderPassDesc, AttachmentDesc, LoadOp, StoreOp, ImageLayout, FramebufferDesc,
    AcquireOutcome, PresentOutcome,
};
use std::sync::Arc;

fn color_attachment(format: TextureFormat) -> AttachmentDesc {
    AttachmentDesc {
        format,
        samples: 1,
        load_op: LoadOp::Clear,
        store_op: StoreOp::Store,
        initial_layout: ImageLayout::Undefined,
        final_layout: ImageLayout::ShaderReadOnly,
    }
}

#[test]
fn test_mock_buffer_keeps_contents() {
    let buffer = MockBuffer::new(8, "ubo".to_string());
    buffer.update(2, &[1, 2, 3]).unwrap();
    assert_eq!(buffer.contents(), vec![0, 0, 1, 2, 3, 0, 0, 0]);
    assert_eq!(buffer.size(), 8);
}

#[test]
fn test_mock_buffer_rejects_out_of_range_update() {
    let buffer = MockBuffer::new(4, "ubo".to_string());
    assert!(buffer.update(2, &[1, 2, 3]).is_err());
}

#[test]
fn test_texture_leaves_live_set_on_drop() {
    let mut renderer = MockRenderer::new();
    let texture = renderer
        .create_texture(TextureDesc::render_target("t", 4, 4, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();
    let id = texture.id();
    assert!(renderer.is_texture_live(id));
    drop(texture);
    assert!(!renderer.is_texture_live(id));
}

#[test]
fn test_zero_extent_texture_rejected() {
    let mut renderer = MockRenderer::new();
    let result = renderer.create_texture(TextureDesc::render_target("t", 0, 4, TextureFormat::D32_SFLOAT));
    assert!(result.is_err());
}

#[test]
fn test_framebuffer_validated_against_render_pass() {
    let mut renderer = MockRenderer::new();
    let render_pass = renderer
        .create_render_pass(&RenderPassDesc {
            name: "rp".to_string(),
            color_attachments: vec![color_attachment(TextureFormat::R16G16B16A16_SFLOAT)],
            depth_attachment: None,
            dependencies: Vec::new(),
        })
        .unwrap();

    let good = renderer
        .create_texture(TextureDesc::render_target("good", 64, 64, TextureFormat::R16G16B16A16_SFLOAT))
        .unwrap();
    let bad = renderer
        .create_texture(TextureDesc::render_target("bad", 64, 64, TextureFormat::R8G8B8A8_SRGB))
        .unwrap();

    assert!(renderer
        .create_framebuffer(&FramebufferDesc {
            render_pass: &render_pass,
            attachments: vec![good],
            width: 64,
            height: 64,
        })
        .is_ok());
    assert!(renderer
        .create_framebuffer(&FramebufferDesc {
            render_pass: &render_pass,
            attachments: vec![bad],
            width: 64,
            height: 64,
        })
        .is_err());
}

#[test]
fn test_command_list_records_into_shared_log() {
    let mut renderer = MockRenderer::new();
    let mut cmd = renderer.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.begin_label("ShadowMap");
    cmd.draw(3, 0).unwrap();
    cmd.end_label();
    cmd.end().unwrap();

    assert_eq!(
        renderer.commands(),
        vec!["begin", "begin_label:ShadowMap", "draw:3", "end_label", "end"]
    );
}

#[test]
fn test_command_list_rejects_double_begin() {
    let mut renderer = MockRenderer::new();
    let mut cmd = renderer.create_command_list().unwrap();
    cmd.begin().unwrap();
    assert!(cmd.begin().is_err());
}

#[test]
fn test_swapchain_out_of_date_then_recovers() {
    let renderer = MockRenderer::new();
    let mut swapchain = MockSwapchain::new(&renderer, 800, 600, 2);
    renderer.state.lock().unwrap().out_of_date_acquires = 1;

    assert_eq!(swapchain.acquire_next_image(0).unwrap(), AcquireOutcome::OutOfDate);
    assert_eq!(swapchain.acquire_next_image(0).unwrap(), AcquireOutcome::Image(0));
    assert_eq!(swapchain.acquire_next_image(1).unwrap(), AcquireOutcome::Image(1));
    assert_eq!(swapchain.present(1).unwrap(), PresentOutcome::Presented);
}

#[test]
fn test_swapchain_recreate_replaces_images() {
    let renderer = MockRenderer::new();
    let mut swapchain = MockSwapchain::new(&renderer, 800, 600, 2);
    let old_ids: Vec<u64> = swapchain.images().iter().map(|t| t.id()).collect();

    swapchain.recreate(1024, 768).unwrap();

    assert_eq!(swapchain.width(), 1024);
    assert_eq!(swapchain.images()[0].info().height, 768);
    for id in old_ids {
        assert!(!renderer.is_texture_live(id));
    }
    assert_eq!(renderer.state.lock().unwrap().swapchain_recreations, vec![(1024, 768)]);
}

#[test]
fn test_submit_frame_records_slot() {
    let mut renderer = MockRenderer::new();
    let swapchain = MockSwapchain::new(&renderer, 800, 600, 2);
    let cmd = renderer.create_command_list().unwrap();
    renderer.submit_frame(cmd.as_ref(), &swapchain, 1, 0).unwrap();

    assert_eq!(renderer.state.lock().unwrap().submissions, vec![(1, 0)]);
    assert_eq!(renderer.stats().frames_submitted, 1);
}

#[test]
fn test_buffer_names_tracked() {
    let mut renderer = MockRenderer::new();
    let buffer: Arc<dyn Buffer> = renderer.create_buffer(BufferDesc::uniform("camera_0", 64)).unwrap();
    assert_eq!(buffer.size(), 64);
    assert_eq!(renderer.state.lock().unwrap().created_buffers, vec!["camera_0"]);
}

#[test]
fn test_mock_render_pass_keeps_depth_format() {
    let mut renderer = MockRenderer::new();
    let desc = RenderPassDesc {
        name: "depth".to_string(),
        color_attachments: vec![color_attachment(TextureFormat::R8G8B8A8_UNORM)],
        depth_attachment: Some(color_attachment(TextureFormat::D32_SFLOAT)),
        dependencies: Vec::new(),
    };
    let render_pass = renderer.create_render_pass(&desc).unwrap();

    assert_eq!(render_pass.depth_format(), Some(TextureFormat::D32_SFLOAT));
    assert_eq!(
        render_pass.attachment_formats(),
        vec![TextureFormat::R8G8B8A8_UNORM, TextureFormat::D32_SFLOAT]
    );
    // The description is only borrowed
    assert!(desc.depth_attachment.is_some());
}
