/// SamplerCache - the five shared VkSamplers
///
/// All presets are created when the renderer starts; passes only ever refer
/// to a `SamplerType`.

use deferred_3d_engine::deferred3d::{Result, render::SamplerType};
use deferred_3d_engine::engine_err;
use crate::vulkan_context::GpuContext;
use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

const SOURCE: &str = "deferred3d::vulkan";

/// Filtering and addressing of one preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SamplerParams {
    pub filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode: vk::SamplerAddressMode,
    pub max_anisotropy: Option<f32>,
    pub compare_op: Option<vk::CompareOp>,
}

impl SamplerParams {
    pub(crate) fn for_type(sampler_type: SamplerType) -> Self {
        match sampler_type {
            SamplerType::RepeatAniso => Self {
                filter: vk::Filter::LINEAR,
                mipmap_mode: vk::SamplerMipmapMode::LINEAR,
                address_mode: vk::SamplerAddressMode::REPEAT,
                max_anisotropy: Some(16.0),
                compare_op: None,
            },
            SamplerType::Repeat => Self {
                filter: vk::Filter::LINEAR,
                mipmap_mode: vk::SamplerMipmapMode::LINEAR,
                address_mode: vk::SamplerAddressMode::REPEAT,
                max_anisotropy: None,
                compare_op: None,
            },
            // Reversed-Z shadow lookups
            SamplerType::ClampToEdge => Self {
                filter: vk::Filter::LINEAR,
                mipmap_mode: vk::SamplerMipmapMode::NEAREST,
                address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                max_anisotropy: None,
                compare_op: Some(vk::CompareOp::GREATER),
            },
            SamplerType::LinearClamp => Self {
                filter: vk::Filter::LINEAR,
                mipmap_mode: vk::SamplerMipmapMode::LINEAR,
                address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                max_anisotropy: None,
                compare_op: None,
            },
            SamplerType::NearestClamp => Self {
                filter: vk::Filter::NEAREST,
                mipmap_mode: vk::SamplerMipmapMode::NEAREST,
                address_mode: vk::SamplerAddressMode::CLAMP_TO_EDGE,
                max_anisotropy: None,
                compare_op: None,
            },
        }
    }
}

pub(crate) struct SamplerCache {
    ctx: Arc<GpuContext>,
    samplers: FxHashMap<SamplerType, vk::Sampler>,
}

impl SamplerCache {
    /// Create every preset up front
    ///
    /// Anisotropy is clamped to the device limit, or dropped if the feature
    /// was not enabled.
    pub(crate) fn new(ctx: Arc<GpuContext>, anisotropy_supported: bool) -> Result<Self> {
        let max_device_anisotropy = unsafe {
            ctx.instance
                .get_physical_device_properties(ctx.physical_device)
                .limits
                .max_sampler_anisotropy
        };

        let mut cache = Self {
            ctx,
            samplers: FxHashMap::default(),
        };
        for sampler_type in SamplerType::ALL {
            let mut params = SamplerParams::for_type(sampler_type);
            params.max_anisotropy = params
                .max_anisotropy
                .filter(|_| anisotropy_supported)
                .map(|a| a.min(max_device_anisotropy));
            let sampler = cache.create_vk_sampler(sampler_type, &params)?;
            cache.samplers.insert(sampler_type, sampler);
        }
        Ok(cache)
    }

    pub(crate) fn get(&self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        self.samplers
            .get(&sampler_type)
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Sampler {:?} was not created", sampler_type))
    }

    fn create_vk_sampler(&self, sampler_type: SamplerType, params: &SamplerParams) -> Result<vk::Sampler> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(params.filter)
            .min_filter(params.filter)
            .mipmap_mode(params.mipmap_mode)
            .address_mode_u(params.address_mode)
            .address_mode_v(params.address_mode)
            .address_mode_w(params.address_mode)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(params.compare_op.is_some())
            .compare_op(params.compare_op.unwrap_or(vk::CompareOp::ALWAYS))
            .anisotropy_enable(params.max_anisotropy.is_some())
            .max_anisotropy(params.max_anisotropy.unwrap_or(1.0));

        let sampler = unsafe {
            self.ctx
                .device
                .create_sampler(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create sampler {:?}: {:?}", sampler_type, e))?
        };
        self.ctx.set_object_name(sampler, &format!("sampler_{:?}", sampler_type));
        Ok(sampler)
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        for (_, sampler) in self.samplers.drain() {
            unsafe { self.ctx.device.destroy_sampler(sampler, None); }
        }
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
