/// BindingGroup - Vulkan implementation of the BindingGroup trait
///
/// Descriptor sets come from a list of fixed-size pools that grows when the
/// current pool runs out. Sets are never freed individually; they live as
/// long as the renderer.

use deferred_3d_engine::deferred3d::{
    Result,
    Error,
    render::{
        BindingGroup as RendererBindingGroup, BindingGroupLayoutDesc, BindingResource, BindingType,
        Buffer as RendererBuffer, Texture as RendererTexture,
    },
};
use deferred_3d_engine::{engine_err, engine_error, engine_info};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{binding_type_to_vk, sampled_layout};
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_texture::Texture;

const SOURCE: &str = "deferred3d::vulkan";

/// Sets per pool
const SETS_PER_POOL: u32 = 1024;

/// Vulkan binding group implementation
pub struct BindingGroup {
    pub(crate) descriptor_set: vk::DescriptorSet,
    set_index: u32,
    layout: BindingGroupLayoutDesc,
}

impl BindingGroup {
    pub(crate) fn from_dyn(binding_group: &Arc<dyn RendererBindingGroup>) -> &BindingGroup {
        unsafe { &*(Arc::as_ptr(binding_group) as *const BindingGroup) }
    }
}

impl RendererBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

/// Growing list of descriptor pools
pub(crate) struct DescriptorPools {
    ctx: Arc<GpuContext>,
    pools: Vec<vk::DescriptorPool>,
}

impl DescriptorPools {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let first = create_descriptor_pool(&ctx.device)?;
        Ok(Self { ctx, pools: vec![first] })
    }

    fn allocate(&mut self, set_layout: vk::DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let layouts = [set_layout];
        let current_pool = *self
            .pools
            .last()
            .ok_or_else(|| engine_err!(SOURCE, "No descriptor pool available"))?;
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(current_pool)
            .set_layouts(&layouts);

        let sets = unsafe {
            match self.ctx.device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) => sets,
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let new_pool = create_descriptor_pool(&self.ctx.device)?;
                    self.pools.push(new_pool);
                    engine_info!(SOURCE,
                        "Descriptor pool exhausted, created new pool (total: {})", self.pools.len());
                    let retry_info = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(new_pool)
                        .set_layouts(&layouts);
                    self.ctx
                        .device
                        .allocate_descriptor_sets(&retry_info)
                        .map_err(|e| engine_err!(SOURCE,
                            "Failed to allocate descriptor set after pool growth: {:?}", e))?
                }
                Err(e) => return Err(engine_err!(SOURCE, "Failed to allocate descriptor set: {:?}", e)),
            }
        };
        sets.first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Driver returned no descriptor set"))
    }

    /// Allocate a set for `layout` and write `resources` into it
    pub(crate) fn create_binding_group(
        &mut self,
        samplers: &SamplerCache,
        set_layout: vk::DescriptorSetLayout,
        layout: &BindingGroupLayoutDesc,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<BindingGroup> {
        validate_resources(layout, resources)?;
        let descriptor_set = self.allocate(set_layout)?;
        write_descriptor_set(&self.ctx.device, samplers, descriptor_set, layout, resources)?;
        Ok(BindingGroup { descriptor_set, set_index, layout: layout.clone() })
    }

    /// Rewrite every binding of an existing group
    pub(crate) fn update_binding_group(
        &self,
        samplers: &SamplerCache,
        binding_group: &BindingGroup,
        resources: &[BindingResource],
    ) -> Result<()> {
        validate_resources(&binding_group.layout, resources)?;
        write_descriptor_set(&self.ctx.device, samplers, binding_group.descriptor_set, &binding_group.layout, resources)
    }
}

impl Drop for DescriptorPools {
    fn drop(&mut self) {
        for pool in self.pools.drain(..) {
            unsafe { self.ctx.device.destroy_descriptor_pool(pool, None); }
        }
    }
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 2048,
        },
        // Material texture arrays take most of these
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::SAMPLED_IMAGE,
            descriptor_count: 4096,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::SAMPLER,
            descriptor_count: 256,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1024,
        },
    ];
    let info = vk::DescriptorPoolCreateInfo::default()
        .pool_sizes(&pool_sizes)
        .max_sets(SETS_PER_POOL);

    unsafe {
        device.create_descriptor_pool(&info, None).map_err(|e| {
            engine_error!(SOURCE, "Failed to create descriptor pool: {:?}", e);
            Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
        })
    }
}

/// Check that `resources` fill `layout` one-to-one, in entry order
pub(crate) fn validate_resources(layout: &BindingGroupLayoutDesc, resources: &[BindingResource]) -> Result<()> {
    if layout.entries.len() != resources.len() {
        return Err(invalid(format!(
            "binding group layout has {} entries but {} resources were given",
            layout.entries.len(), resources.len()
        )));
    }

    for (entry, resource) in layout.entries.iter().zip(resources) {
        let compatible = match resource {
            BindingResource::UniformBuffer(_) => entry.binding_type == BindingType::UniformBuffer,
            BindingResource::SampledTexture(..) => entry.binding_type == BindingType::CombinedImageSampler,
            BindingResource::TextureArray(textures) => {
                if textures.is_empty() || textures.len() > entry.count as usize {
                    return Err(invalid(format!(
                        "binding {}: texture array of {} for a slot of {}",
                        entry.binding, textures.len(), entry.count
                    )));
                }
                entry.binding_type == BindingType::SampledImage
            }
            BindingResource::Sampler(_) => entry.binding_type == BindingType::Sampler,
        };
        if !compatible {
            return Err(invalid(format!(
                "binding {} is {:?} but the resource does not match",
                entry.binding, entry.binding_type
            )));
        }
    }
    Ok(())
}

fn invalid(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::InvalidResource(message)
}

enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Images(Vec<vk::DescriptorImageInfo>),
}

fn write_descriptor_set(
    device: &ash::Device,
    samplers: &SamplerCache,
    descriptor_set: vk::DescriptorSet,
    layout: &BindingGroupLayoutDesc,
    resources: &[BindingResource],
) -> Result<()> {
    // Infos must outlive the writes that point at them
    let mut infos = Vec::with_capacity(resources.len());
    for (entry, resource) in layout.entries.iter().zip(resources) {
        let info = match resource {
            BindingResource::UniformBuffer(buffer) => {
                let buffer = unsafe { &*(*buffer as *const dyn RendererBuffer as *const Buffer) };
                DescriptorInfo::Buffer(vk::DescriptorBufferInfo::default()
                    .buffer(buffer.buffer)
                    .offset(0)
                    .range(vk::WHOLE_SIZE))
            }
            BindingResource::SampledTexture(texture, sampler_type) => {
                let texture = Texture::from_dyn(*texture);
                DescriptorInfo::Images(vec![vk::DescriptorImageInfo::default()
                    .image_layout(sampled_layout(texture.info().format))
                    .image_view(texture.view)
                    .sampler(samplers.get(*sampler_type)?)])
            }
            BindingResource::TextureArray(textures) => {
                let views: Vec<&Texture> = textures.iter().map(|t| Texture::from_dyn(*t)).collect();
                let padded = (0..entry.count as usize)
                    .map(|slot| {
                        let texture = views.get(slot).unwrap_or(&views[0]);
                        vk::DescriptorImageInfo::default()
                            .image_layout(sampled_layout(texture.info().format))
                            .image_view(texture.view)
                    })
                    .collect();
                DescriptorInfo::Images(padded)
            }
            BindingResource::Sampler(sampler_type) => {
                DescriptorInfo::Images(vec![vk::DescriptorImageInfo::default()
                    .sampler(samplers.get(*sampler_type)?)])
            }
        };
        infos.push(info);
    }

    let writes: Vec<vk::WriteDescriptorSet> = layout
        .entries
        .iter()
        .zip(&infos)
        .map(|(entry, info)| {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(entry.binding)
                .dst_array_element(0)
                .descriptor_type(binding_type_to_vk(entry.binding_type));
            match info {
                DescriptorInfo::Buffer(buffer_info) => write.buffer_info(std::slice::from_ref(buffer_info)),
                DescriptorInfo::Images(image_infos) => write.image_info(image_infos),
            }
        })
        .collect();

    unsafe {
        device.update_descriptor_sets(&writes, &[]);
    }
    Ok(())
}

#[cfg(test)]
#[path = "vulkan_binding_group_tests.rs"]
mod tests;
