/// Texture - Vulkan implementation of the Texture trait
///
/// Owned textures hold their image, memory and view. Swapchain images are
/// wrapped without ownership so they can be used as framebuffer attachments.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{
        Texture as RendererTexture, TextureData, TextureDesc, TextureInfo, TextureUsage,
        next_texture_id,
    },
};
use deferred_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveCounters};
use crate::vulkan_format::{aspect_for, format_to_vk, image_usage_to_vk, sampled_layout};

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan texture implementation
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    /// False for swapchain images (image and view belong to the swapchain)
    owned: bool,
    id: u64,
    info: TextureInfo,
}

impl Texture {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: TextureDesc) -> Result<Self> {
        let info = TextureInfo::from_desc(&desc);
        let upload = validate_desc(&desc)?;

        let mut usage = image_usage_to_vk(desc.usage);
        if !upload.is_empty() {
            usage |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        if desc.mip_levels > 1 {
            usage |= vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
        }

        let flags = if desc.cube_compatible {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };

        let image_create_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(desc.mip_levels)
            .array_layers(desc.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            ctx.device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture '{}': {:?}", desc.name, e))?
        };

        let allocation = match ctx.allocate_image(&desc.name, image) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { ctx.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on Drop releases the image and its memory on every error path
        let mut texture = Self {
            ctx,
            image,
            view: vk::ImageView::null(),
            allocation: Some(allocation),
            owned: true,
            id: next_texture_id(),
            info,
        };
        LiveCounters::created(&texture.ctx.counters.textures);
        texture.view = texture.create_view()?;
        texture.ctx.set_object_name(image, &desc.name);

        if !upload.is_empty() {
            texture.upload(&upload)?;
        } else if desc.usage.contains(TextureUsage::SAMPLED) {
            // Sampling before the first write must see a valid layout
            texture.transition_to_sampled()?;
        }
        Ok(texture)
    }

    /// Wrap a swapchain image; the swapchain keeps ownership of image and view
    pub(crate) fn from_swapchain(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        info: TextureInfo,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: None,
            owned: false,
            id: next_texture_id(),
            info,
        }
    }

    /// Reinterpret a texture created by this backend (or a swapchain image)
    pub(crate) fn from_dyn(texture: &dyn RendererTexture) -> &Texture {
        unsafe { &*(texture as *const dyn RendererTexture as *const Texture) }
    }

    fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: aspect_for(self.info.format),
            base_mip_level: 0,
            level_count: self.info.mip_levels,
            base_array_layer: 0,
            layer_count: self.info.array_layers,
        }
    }

    fn create_view(&self) -> Result<vk::ImageView> {
        let view_type = if self.info.cube_compatible {
            vk::ImageViewType::CUBE
        } else if self.info.array_layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(format_to_vk(self.info.format))
            .components(vk::ComponentMapping::default())
            .subresource_range(self.full_range());

        unsafe {
            self.ctx
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create texture image view: {:?}", e))
        }
    }

    fn transition_to_sampled(&self) -> Result<()> {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(sampled_layout(self.info.format))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(self.full_range())
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::SHADER_READ);

        self.ctx.submit_one_shot(|command_buffer| {
            unsafe {
                self.ctx.device.cmd_pipeline_barrier(
                    command_buffer,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[barrier],
                );
            }
            Ok(())
        })
    }

    /// Copy every layer into mip 0, blit the remaining levels and leave the
    /// whole image in SHADER_READ_ONLY_OPTIMAL
    fn upload(&self, layers: &[&[u8]]) -> Result<()> {
        let mut staging = Vec::with_capacity(layers.len());
        for (layer, data) in layers.iter().enumerate() {
            staging.push(StagingBuffer::new(self.ctx.clone(), data, layer)?);
        }

        let device = &self.ctx.device;
        let aspect_mask = aspect_for(self.info.format);
        let (width, height) = (self.info.width, self.info.height);
        let mip_levels = self.info.mip_levels;
        let layer_count = self.info.array_layers;

        self.ctx.submit_one_shot(|command_buffer| unsafe {
            self.barrier(
                command_buffer,
                self.full_range(),
                (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
                (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
                (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
            );

            for (layer, buffer) in staging.iter().enumerate() {
                let region = vk::BufferImageCopy::default()
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask,
                        mip_level: 0,
                        base_array_layer: layer as u32,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D { width, height, depth: 1 });
                device.cmd_copy_buffer_to_image(
                    command_buffer,
                    buffer.buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            for mip in 1..mip_levels {
                let src_mip = mip - 1;
                let src_range = vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: src_mip,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count,
                };
                self.barrier(
                    command_buffer,
                    src_range,
                    (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
                    (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_READ),
                    (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
                );

                let blit = vk::ImageBlit::default()
                    .src_subresource(vk::ImageSubresourceLayers {
                        aspect_mask,
                        mip_level: src_mip,
                        base_array_layer: 0,
                        layer_count,
                    })
                    .src_offsets([vk::Offset3D::default(), mip_extent(width, height, src_mip)])
                    .dst_subresource(vk::ImageSubresourceLayers {
                        aspect_mask,
                        mip_level: mip,
                        base_array_layer: 0,
                        layer_count,
                    })
                    .dst_offsets([vk::Offset3D::default(), mip_extent(width, height, mip)]);
                device.cmd_blit_image(
                    command_buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    vk::Filter::LINEAR,
                );

                self.barrier(
                    command_buffer,
                    src_range,
                    (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                    (vk::AccessFlags::TRANSFER_READ, vk::AccessFlags::SHADER_READ),
                    (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
                );
            }

            // Last level was only ever written
            let last_range = vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: mip_levels - 1,
                level_count: 1,
                base_array_layer: 0,
                layer_count,
            };
            self.barrier(
                command_buffer,
                last_range,
                (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
                (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
            );
            Ok(())
        })
    }

    unsafe fn barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        range: vk::ImageSubresourceRange,
        (old_layout, new_layout): (vk::ImageLayout, vk::ImageLayout),
        (src_access, dst_access): (vk::AccessFlags, vk::AccessFlags),
        (src_stage, dst_stage): (vk::PipelineStageFlags, vk::PipelineStageFlags),
    ) {
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(range)
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);
        self.ctx.device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

fn mip_extent(width: u32, height: u32, mip: u32) -> vk::Offset3D {
    vk::Offset3D {
        x: (width >> mip).max(1) as i32,
        y: (height >> mip).max(1) as i32,
        z: 1,
    }
}

/// Check a descriptor and return the per-layer upload slices (empty when no data)
pub(crate) fn validate_desc(desc: &TextureDesc) -> Result<Vec<&[u8]>> {
    if desc.width == 0 || desc.height == 0 {
        engine_bail!(SOURCE, "Texture '{}' has zero extent {}x{}", desc.name, desc.width, desc.height);
    }
    if desc.array_layers == 0 || desc.mip_levels == 0 {
        engine_bail!(SOURCE, "Texture '{}' needs at least one layer and one mip level", desc.name);
    }
    if desc.cube_compatible && desc.array_layers != 6 {
        engine_bail!(SOURCE, "Cube texture '{}' has {} layers, expected 6", desc.name, desc.array_layers);
    }

    let layers: Vec<&[u8]> = match &desc.data {
        None => return Ok(Vec::new()),
        Some(TextureData::Single(data)) => vec![data.as_slice()],
        Some(TextureData::Layers(layers)) => layers.iter().map(Vec::as_slice).collect(),
    };
    if layers.len() > desc.array_layers as usize {
        engine_bail!(
            SOURCE,
            "Texture '{}' has {} data layers but only {} array layers",
            desc.name, layers.len(), desc.array_layers
        );
    }

    let layer_size = desc.width as usize * desc.height as usize * desc.format.bytes_per_texel() as usize;
    for (layer, data) in layers.iter().enumerate() {
        if data.len() != layer_size {
            engine_bail!(
                SOURCE,
                "Texture '{}' layer {} has {} bytes, expected {}",
                desc.name, layer, data.len(), layer_size
            );
        }
    }
    Ok(layers)
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_image(self.image, None);
        }
        LiveCounters::dropped(&self.ctx.counters.textures);
    }
}

/// Host-visible source buffer for one upload, released when dropped
struct StagingBuffer {
    ctx: Arc<GpuContext>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

impl StagingBuffer {
    fn new(ctx: Arc<GpuContext>, data: &[u8], layer: usize) -> Result<Self> {
        let create_info = vk::BufferCreateInfo::default()
            .size(data.len() as u64)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe {
            ctx.device
                .create_buffer(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create staging buffer for layer {}: {:?}", layer, e))?
        };

        let mut staging = Self { ctx, buffer, allocation: None };
        let allocation = staging.allocation.insert(
            staging
                .ctx
                .allocate_buffer("texture_staging_buffer", buffer, MemoryLocation::CpuToGpu)?,
        );
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!(SOURCE, "Staging buffer is not mapped for layer {}", layer))?
            .as_ptr() as *mut u8;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr, data.len());
        }
        Ok(staging)
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_texture_tests.rs"]
mod tests;
