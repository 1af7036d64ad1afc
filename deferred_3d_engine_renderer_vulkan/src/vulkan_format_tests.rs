//! Unit tests for the Vulkan conversion functions
//!
//! Pure mappings only; no GPU required.

use super::*;

#[test]
fn test_texture_formats_map_one_to_one() {
    assert_eq!(format_to_vk(TextureFormat::R16G16B16A16_SFLOAT), vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::A2R10G10B10_UNORM_PACK32), vk::Format::A2R10G10B10_UNORM_PACK32);
    assert_eq!(format_to_vk(TextureFormat::D32_SFLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R8G8_UNORM), vk::Format::R8G8_UNORM);
    assert_eq!(format_to_vk(TextureFormat::R8G8B8_UINT), vk::Format::R8G8B8_UINT);
}

#[test]
fn test_vertex_attribute_formats() {
    assert_eq!(format_to_vk(TextureFormat::R32G32_SFLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32A32_SFLOAT), vk::Format::R32G32B32A32_SFLOAT);
}

#[test]
fn test_surface_formats_round_trip_through_engine_format() {
    for format in [
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
    ] {
        assert_eq!(vk_surface_format(format_to_vk(format)), Some(format));
    }
    assert_eq!(vk_surface_format(vk::Format::R5G6B5_UNORM_PACK16), None);
}

#[test]
fn test_depth_selects_depth_aspect_and_read_only_layout() {
    assert_eq!(aspect_for(TextureFormat::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(aspect_for(TextureFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(sampled_layout(TextureFormat::D32_SFLOAT), vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);
    assert_eq!(sampled_layout(TextureFormat::R16G16B16A16_SFLOAT), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
}

#[test]
fn test_image_usage_combines_flags() {
    let usage = image_usage_to_vk(TextureUsage::SAMPLED_COLOR_TARGET | TextureUsage::TRANSFER_SRC);
    assert_eq!(
        usage,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_SRC
    );
    assert_eq!(
        image_usage_to_vk(TextureUsage::SAMPLED_DEPTH_TARGET),
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
    );
    assert_eq!(image_usage_to_vk(TextureUsage::empty()), vk::ImageUsageFlags::empty());
}

#[test]
fn test_shader_stages_include_geometry() {
    assert_eq!(shader_stage_to_vk(ShaderStage::Geometry), vk::ShaderStageFlags::GEOMETRY);
    assert_eq!(
        stage_flags_to_vk(ShaderStageFlags::ALL_GRAPHICS),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::GEOMETRY | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::FRAGMENT), vk::ShaderStageFlags::FRAGMENT);
}

#[test]
fn test_binding_types() {
    assert_eq!(binding_type_to_vk(BindingType::SampledImage), vk::DescriptorType::SAMPLED_IMAGE);
    assert_eq!(binding_type_to_vk(BindingType::Sampler), vk::DescriptorType::SAMPLER);
    assert_eq!(binding_type_to_vk(BindingType::CombinedImageSampler), vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(binding_type_to_vk(BindingType::UniformBuffer), vk::DescriptorType::UNIFORM_BUFFER);
}

#[test]
fn test_store_op_none_for_read_only_attachments() {
    assert_eq!(store_op_to_vk(StoreOp::None), vk::AttachmentStoreOp::NONE);
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
    assert_eq!(image_layout_to_vk(ImageLayout::DepthStencilReadOnly), vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_sample_counts() {
    assert_eq!(samples_to_vk(1), Some(vk::SampleCountFlags::TYPE_1));
    assert_eq!(samples_to_vk(8), Some(vk::SampleCountFlags::TYPE_8));
    assert_eq!(samples_to_vk(3), None);
}

#[test]
fn test_subpass_dependency_scopes() {
    assert_eq!(subpass_to_vk(SubpassRef::External), vk::SUBPASS_EXTERNAL);
    assert_eq!(subpass_to_vk(SubpassRef::Index(0)), 0);

    assert_eq!(
        pipeline_stages_to_vk(PipelineStages::FRAGMENT_TESTS),
        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
    );
    assert_eq!(
        pipeline_stages_to_vk(PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::FRAGMENT_SHADER),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::FRAGMENT_SHADER
    );
    assert_eq!(
        access_flags_to_vk(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
    );
    assert_eq!(access_flags_to_vk(AccessFlags::empty()), vk::AccessFlags::empty());
    assert_eq!(dependency_flags_to_vk(DependencyFlags::BY_REGION), vk::DependencyFlags::BY_REGION);
}

#[test]
fn test_fixed_function_state() {
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(front_face_to_vk(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
    assert_eq!(polygon_mode_to_vk(PolygonMode::Line), vk::PolygonMode::LINE);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(compare_op_to_vk(CompareOp::Greater), vk::CompareOp::GREATER);
    assert_eq!(blend_factor_to_vk(BlendFactor::OneMinusSrcAlpha), vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(blend_op_to_vk(BlendOp::Max), vk::BlendOp::MAX);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
}
