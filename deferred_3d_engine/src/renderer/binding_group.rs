/// BindingGroup trait and binding group layout description
///
/// A BindingGroup is a descriptor set allocated against one set of a
/// pipeline layout. Unlike the pipeline, it can be repointed at new
/// resources with `Renderer::update_binding_group` after render targets are
/// recreated.

use crate::renderer::{Texture, Buffer, SamplerType, ShaderStageFlags};

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer,
    /// Texture and sampler in one binding
    CombinedImageSampler,
    /// Texture without sampler (descriptor arrays)
    SampledImage,
    /// Standalone sampler
    Sampler,
}

/// Description of a single binding slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingSlotDesc {
    /// `layout(binding = N)` in GLSL
    pub binding: u32,
    pub binding_type: BindingType,
    /// Array length, 1 for plain bindings
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

impl BindingSlotDesc {
    pub fn new(binding: u32, binding_type: BindingType, stage_flags: ShaderStageFlags) -> Self {
        Self { binding, binding_type, count: 1, stage_flags }
    }

    pub fn array(binding: u32, binding_type: BindingType, count: u32, stage_flags: ShaderStageFlags) -> Self {
        Self { binding, binding_type, count, stage_flags }
    }
}

/// Blueprint of one descriptor set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingGroupLayoutDesc {
    pub entries: Vec<BindingSlotDesc>,
}

impl BindingGroupLayoutDesc {
    pub fn new(entries: Vec<BindingSlotDesc>) -> Self {
        Self { entries }
    }
}

/// A concrete resource written into a binding slot, in slot order
pub enum BindingResource<'a> {
    UniformBuffer(&'a dyn Buffer),
    /// Texture sampled through one of the shared samplers
    SampledTexture(&'a dyn Texture, SamplerType),
    /// Array of textures; slots past the end reuse the first texture
    TextureArray(Vec<&'a dyn Texture>),
    Sampler(SamplerType),
}

impl BindingResource<'_> {
    /// Ids of every texture referenced by this resource
    pub fn texture_ids(&self) -> Vec<u64> {
        match self {
            BindingResource::SampledTexture(texture, _) => vec![texture.id()],
            BindingResource::TextureArray(textures) => textures.iter().map(|t| t.id()).collect(),
            BindingResource::UniformBuffer(_) | BindingResource::Sampler(_) => Vec::new(),
        }
    }
}

/// Descriptor set bound to one set index of a pipeline
pub trait BindingGroup: Send + Sync {
    fn set_index(&self) -> u32;
}
