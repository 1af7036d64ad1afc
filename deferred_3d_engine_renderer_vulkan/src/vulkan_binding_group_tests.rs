/// Tests for binding resource validation (no GPU)

use super::*;
use deferred_3d_engine::deferred3d::render::{
    BindingSlotDesc, SamplerType, ShaderStageFlags, TextureDesc, TextureFormat, TextureInfo,
};

struct FakeTexture(TextureInfo);

impl RendererTexture for FakeTexture {
    fn info(&self) -> &TextureInfo {
        &self.0
    }

    fn id(&self) -> u64 {
        7
    }
}

struct FakeBuffer;

impl RendererBuffer for FakeBuffer {
    fn size(&self) -> u64 {
        64
    }

    fn update(&self, _offset: u64, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}

fn texture() -> FakeTexture {
    FakeTexture(TextureInfo::from_desc(&TextureDesc::render_target("t", 4, 4, TextureFormat::R8G8B8A8_UNORM)))
}

fn material_layout() -> BindingGroupLayoutDesc {
    BindingGroupLayoutDesc::new(vec![
        BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::array(1, BindingType::SampledImage, 4, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::new(2, BindingType::Sampler, ShaderStageFlags::FRAGMENT),
    ])
}

#[test]
fn test_matching_resources_accepted() {
    let (buffer, albedo, normal) = (FakeBuffer, texture(), texture());
    let resources = [
        BindingResource::UniformBuffer(&buffer),
        BindingResource::TextureArray(vec![&albedo, &normal]),
        BindingResource::Sampler(SamplerType::RepeatAniso),
    ];
    validate_resources(&material_layout(), &resources).unwrap();
}

#[test]
fn test_resource_count_mismatch_rejected() {
    let buffer = FakeBuffer;
    let resources = [BindingResource::UniformBuffer(&buffer)];
    assert!(matches!(validate_resources(&material_layout(), &resources), Err(Error::InvalidResource(_))));
}

#[test]
fn test_wrong_resource_type_rejected() {
    let (buffer, albedo) = (FakeBuffer, texture());
    let resources = [
        BindingResource::SampledTexture(&albedo, SamplerType::LinearClamp),
        BindingResource::TextureArray(vec![&albedo]),
        BindingResource::Sampler(SamplerType::RepeatAniso),
    ];
    assert!(validate_resources(&material_layout(), &resources).is_err());

    let resources = [
        BindingResource::UniformBuffer(&buffer),
        BindingResource::TextureArray(vec![&albedo]),
        BindingResource::UniformBuffer(&buffer),
    ];
    assert!(validate_resources(&material_layout(), &resources).is_err());
}

#[test]
fn test_texture_array_bounds() {
    let (buffer, t) = (FakeBuffer, texture());
    let empty = [
        BindingResource::UniformBuffer(&buffer),
        BindingResource::TextureArray(Vec::new()),
        BindingResource::Sampler(SamplerType::RepeatAniso),
    ];
    assert!(validate_resources(&material_layout(), &empty).is_err());

    let too_many = [
        BindingResource::UniformBuffer(&buffer),
        BindingResource::TextureArray(vec![&t, &t, &t, &t, &t]),
        BindingResource::Sampler(SamplerType::RepeatAniso),
    ];
    assert!(validate_resources(&material_layout(), &too_many).is_err());
}
