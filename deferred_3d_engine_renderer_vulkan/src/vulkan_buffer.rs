/// Buffer - Vulkan implementation of the Buffer trait
///
/// Every buffer is host-visible (CpuToGpu) and persistently mapped.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{Buffer as RendererBuffer, BufferDesc, BufferUsage},
};
use deferred_3d_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveCounters};

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan buffer implementation
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
}

impl Buffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            engine_bail!(SOURCE, "Buffer '{}' has zero size", desc.name);
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
            BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        };
        let create_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            ctx.device
                .create_buffer(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer '{}': {:?}", desc.name, e))?
        };

        let allocation = match ctx.allocate_buffer(&desc.name, buffer, MemoryLocation::CpuToGpu) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { ctx.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        ctx.set_object_name(buffer, &desc.name);
        LiveCounters::created(&ctx.counters.buffers);

        Ok(Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size: desc.size,
        })
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_bail!(
                SOURCE,
                "Buffer update out of range: offset {} + {} bytes > size {}",
                offset, data.len(), self.size
            );
        }

        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer update failed: no GPU allocation"))?;
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
        unsafe {
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
        LiveCounters::dropped(&self.ctx.counters.buffers);
    }
}
