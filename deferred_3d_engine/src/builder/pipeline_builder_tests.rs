/// Tests for PipelineBuilder

use super::*;
use crate::builder::RenderPassBuilder;
use crate::renderer::mock_renderer::{MockPipeline, MockRenderer};
use crate::renderer::{ImageLayout, LoadOp, StoreOp, TextureFormat};

fn two_color_pass(renderer: &mut MockRenderer) -> Arc<dyn RenderPass> {
    RenderPassBuilder::new("two_color")
        .add_attachment(TextureFormat::R16G16B16A16_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly)
        .add_attachment(TextureFormat::R16G16B16A16_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly)
        .build(renderer)
        .unwrap()
}

fn base(render_pass: &Arc<dyn RenderPass>) -> PipelineBuilder {
    PipelineBuilder::new("lighting")
        .add_shader(ShaderStage::Vertex, "fs_tri.vert.spv")
        .add_shader(ShaderStage::Fragment, "def_lighting.frag.spv")
        .rasterization(PolygonMode::Fill, CullMode::None, FrontFace::CounterClockwise)
        .render_pass(render_pass)
}

#[test]
fn test_build_creates_pipeline_with_matching_blends() {
    let mut renderer = MockRenderer::new();
    let shaders = ShaderLibrary::stub();
    let render_pass = two_color_pass(&mut renderer);

    let pipeline = base(&render_pass)
        .add_default_blend_attachment()
        .add_default_blend_attachment()
        .push_constant_range(ShaderStageFlags::ALL_GRAPHICS, 96)
        .build(&mut renderer, &shaders)
        .unwrap();

    assert_eq!(pipeline.name(), "lighting");
    assert_eq!(pipeline.push_constant_stages(), ShaderStageFlags::ALL_GRAPHICS);
    let state = renderer.state.lock().unwrap();
    assert_eq!(state.created_shaders, vec!["fs_tri.vert.spv", "def_lighting.frag.spv"]);
    assert_eq!(state.created_pipelines, vec!["lighting"]);
}

#[test]
fn test_blend_count_mismatch_rejected() {
    let mut renderer = MockRenderer::new();
    let shaders = ShaderLibrary::stub();
    let render_pass = two_color_pass(&mut renderer);

    let result = base(&render_pass)
        .add_default_blend_attachment()
        .build(&mut renderer, &shaders);

    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("1 blend attachments for 2")));
    assert!(renderer.state.lock().unwrap().created_pipelines.is_empty());
}

#[test]
fn test_missing_shaders_rejected() {
    let mut renderer = MockRenderer::new();
    let shaders = ShaderLibrary::stub();
    let render_pass = two_color_pass(&mut renderer);

    let result = PipelineBuilder::new("empty")
        .add_default_blend_attachment()
        .add_default_blend_attachment()
        .render_pass(&render_pass)
        .build(&mut renderer, &shaders);
    assert!(matches!(result, Err(Error::InvalidResource(_))));

    let result = PipelineBuilder::new("fragment_only")
        .add_shader(ShaderStage::Fragment, "x.frag.spv")
        .add_default_blend_attachment()
        .add_default_blend_attachment()
        .render_pass(&render_pass)
        .build(&mut renderer, &shaders);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_missing_render_pass_rejected() {
    let mut renderer = MockRenderer::new();
    let result = PipelineBuilder::new("no_pass")
        .add_shader(ShaderStage::Vertex, "default.vert.spv")
        .build(&mut renderer, &ShaderLibrary::stub());
    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("no render pass")));
}

#[test]
fn test_missing_shader_file_is_fatal() {
    let mut renderer = MockRenderer::new();
    let render_pass = two_color_pass(&mut renderer);
    let shaders = ShaderLibrary::new(std::env::temp_dir().join("deferred3d_no_such_shader_dir"));

    let result = base(&render_pass)
        .add_default_blend_attachment()
        .add_default_blend_attachment()
        .build(&mut renderer, &shaders);
    assert!(matches!(result, Err(Error::AssetError(_))));
}

#[test]
fn test_variants_derive_from_clone() {
    let mut renderer = MockRenderer::new();
    let shaders = ShaderLibrary::stub();
    let render_pass = two_color_pass(&mut renderer);

    let common = base(&render_pass)
        .add_default_blend_attachment()
        .add_default_blend_attachment();
    let additive = common
        .clone()
        .name("additive")
        .add_shader(ShaderStage::Fragment, "overdraw.frag.spv")
        .add_shader(ShaderStage::Geometry, "density.geom.spv")
        .set_all_blend_attachments(ColorBlendState::ADDITIVE)
        .build(&mut renderer, &shaders)
        .unwrap();
    common.build(&mut renderer, &shaders).unwrap();

    let additive = additive.as_ref() as *const dyn Pipeline as *const MockPipeline;
    let additive = unsafe { &*additive };
    assert_eq!(additive.stages, vec![ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Geometry]);
    assert_eq!(additive.color_blend_count, 2);

    // Loading is cached per file name
    assert_eq!(shaders.cached_count(), 4);
}
