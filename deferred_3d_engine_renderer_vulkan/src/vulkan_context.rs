/// GpuContext - Vulkan objects shared by every backend resource
///
/// Textures, buffers, pipelines and the swapchain each hold an
/// `Arc<GpuContext>`, so the device, allocator and instance outlive the last
/// resource no matter in which order the application drops things.

use deferred_3d_engine::deferred3d::{Error, Result};
use deferred_3d_engine::{engine_err, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

const SOURCE: &str = "deferred3d::vulkan";

/// Live object counters reported through `Renderer::stats`
#[derive(Default)]
pub(crate) struct LiveCounters {
    pub textures: AtomicU32,
    pub buffers: AtomicU32,
    pub pipelines: AtomicU32,
}

impl LiveCounters {
    pub fn created(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped(counter: &AtomicU32) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Shared GPU context
pub struct GpuContext {
    /// Keeps the Vulkan loader alive for the instance
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    /// Wrapped in ManuallyDrop so its memory blocks are released before the device
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    pub(crate) present_queue: vk::Queue,

    /// TRANSIENT + RESET_COMMAND_BUFFER pool for one-shot uploads
    upload_command_pool: Mutex<vk::CommandPool>,

    /// Validation messenger (instance level)
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    /// Object names and command labels (device level)
    pub(crate) debug_utils: Option<ash::ext::debug_utils::Device>,

    pub(crate) counters: LiveCounters,
}

/// Everything `GpuContext::new` takes ownership of
pub(crate) struct GpuContextParts {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: ash::Device,
    pub allocator: Allocator,
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    pub present_queue: vk::Queue,
    pub upload_command_pool: vk::CommandPool,
    pub debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    pub(crate) fn new(parts: GpuContextParts) -> Self {
        let debug_utils = parts
            .debug_messenger
            .as_ref()
            .map(|_| ash::ext::debug_utils::Device::new(&parts.instance, &parts.device));
        Self {
            entry: parts.entry,
            instance: parts.instance,
            physical_device: parts.physical_device,
            device: parts.device,
            allocator: ManuallyDrop::new(Mutex::new(parts.allocator)),
            graphics_queue: parts.graphics_queue,
            graphics_queue_family: parts.graphics_queue_family,
            present_queue: parts.present_queue,
            upload_command_pool: Mutex::new(parts.upload_command_pool),
            debug_messenger: parts.debug_messenger,
            debug_utils,
            counters: LiveCounters::default(),
        }
    }

    fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!(SOURCE, "GPU allocator lock poisoned"))
    }

    /// Allocate and bind memory for `buffer`
    pub(crate) fn allocate_buffer(
        &self,
        name: &str,
        buffer: vk::Buffer,
        location: MemoryLocation,
    ) -> Result<Allocation> {
        unsafe {
            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = self
                .allocator()?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    engine_warn!(SOURCE, "Out of GPU memory for buffer '{}' ({} bytes): {}", name, requirements.size, e);
                    Error::OutOfMemory
                })?;
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!(SOURCE, "Failed to bind memory of buffer '{}': {:?}", name, e))?;
            Ok(allocation)
        }
    }

    /// Allocate and bind device-local memory for `image`
    pub(crate) fn allocate_image(&self, name: &str, image: vk::Image) -> Result<Allocation> {
        unsafe {
            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = self
                .allocator()?
                .allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::GpuOnly,
                    linear: false,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|e| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_warn!(SOURCE, "Out of GPU memory for texture '{}' ({:.2} MB): {}", name, size_mb, e);
                    Error::OutOfMemory
                })?;
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!(SOURCE, "Failed to bind memory of texture '{}': {:?}", name, e))?;
            Ok(allocation)
        }
    }

    /// Return an allocation to the allocator; failures are logged, not propagated
    pub(crate) fn free(&self, allocation: Allocation) {
        match self.allocator.lock() {
            Ok(mut allocator) => {
                if let Err(e) = allocator.free(allocation) {
                    engine_warn!(SOURCE, "Failed to free GPU allocation: {}", e);
                }
            }
            Err(_) => engine_warn!(SOURCE, "GPU allocator lock poisoned, leaking allocation"),
        }
    }

    /// Record commands into a one-shot command buffer, submit and wait
    pub(crate) fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<()>,
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Upload command pool lock poisoned"))?;
        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to allocate upload command buffer: {:?}", e))?[0];

            let result = self.record_and_wait(command_buffer, record);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn record_and_wait<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<()>,
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!(SOURCE, "Failed to begin upload command buffer: {:?}", e))?;

        record(command_buffer)?;

        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| engine_err!(SOURCE, "Failed to end upload command buffer: {:?}", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        self.device
            .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
            .map_err(|e| engine_err!(SOURCE, "Failed to submit upload commands: {:?}", e))?;
        self.device
            .queue_wait_idle(self.graphics_queue)
            .map_err(|e| engine_err!(SOURCE, "Failed to wait for upload completion: {:?}", e))
    }

    /// Attach a debug name to a Vulkan object (no-op without validation)
    pub(crate) fn set_object_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            if let Err(e) = debug_utils.set_debug_utils_object_name(&info) {
                engine_warn!(SOURCE, "Failed to name Vulkan object: {:?}", e);
            }
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Memory blocks go back to the driver while the device still exists
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            crate::debug::cleanup_debug_config();
            if let Some((debug_instance, messenger)) = self.debug_messenger.take() {
                debug_instance.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
