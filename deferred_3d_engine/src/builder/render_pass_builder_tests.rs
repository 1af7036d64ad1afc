/// Tests for RenderPassBuilder

use super::*;
use crate::renderer::mock_renderer::MockRenderer;

fn clear_store(builder: RenderPassBuilder, format: TextureFormat) -> RenderPassBuilder {
    builder.add_attachment(format, 1, LoadOp::Clear, StoreOp::Store,
        ImageLayout::Undefined, ImageLayout::ShaderReadOnly)
}

#[test]
fn test_depth_attachment_split_from_colors() {
    let builder = clear_store(RenderPassBuilder::new("gbuffer"), TextureFormat::R8G8B8A8_SRGB);
    let builder = clear_store(builder, TextureFormat::D32_SFLOAT);
    let builder = clear_store(builder, TextureFormat::A2R10G10B10_UNORM_PACK32);

    let desc = builder.desc().unwrap();
    let colors: Vec<_> = desc.color_attachments.iter().map(|a| a.format).collect();
    assert_eq!(colors, vec![TextureFormat::R8G8B8A8_SRGB, TextureFormat::A2R10G10B10_UNORM_PACK32]);
    assert_eq!(desc.depth_attachment.map(|a| a.format), Some(TextureFormat::D32_SFLOAT));
}

#[test]
fn test_two_depth_attachments_rejected() {
    let builder = clear_store(RenderPassBuilder::new("bad"), TextureFormat::D32_SFLOAT);
    let builder = clear_store(builder, TextureFormat::D32_SFLOAT);
    assert!(matches!(builder.desc(), Err(Error::InvalidResource(_))));
}

#[test]
fn test_empty_render_pass_rejected() {
    let mut renderer = MockRenderer::new();
    assert!(RenderPassBuilder::new("empty").build(&mut renderer).is_err());
}

#[test]
fn test_dependencies_passed_verbatim() {
    let mut renderer = MockRenderer::new();
    let builder = clear_store(RenderPassBuilder::new("shadow"), TextureFormat::D32_SFLOAT)
        .add_dependency(
            SubpassRef::External, SubpassRef::Index(0),
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStages::EARLY_FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            DependencyFlags::empty(),
        )
        .add_dependency(
            SubpassRef::Index(0), SubpassRef::External,
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStages::FRAGMENT_SHADER, AccessFlags::SHADER_READ,
            DependencyFlags::empty(),
        );

    let desc = builder.desc().unwrap();
    assert_eq!(desc.dependencies.len(), 2);
    assert_eq!(desc.dependencies[1].dst_access, AccessFlags::SHADER_READ);

    let render_pass = builder.build(&mut renderer).unwrap();
    assert_eq!(render_pass.attachment_formats(), vec![TextureFormat::D32_SFLOAT]);
    assert_eq!(render_pass.color_attachment_count(), 0);
    assert_eq!(renderer.state.lock().unwrap().created_render_passes, vec!["shadow"]);
}
