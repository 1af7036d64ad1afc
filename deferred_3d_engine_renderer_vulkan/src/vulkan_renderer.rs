/// VulkanRenderer - Vulkan implementation of the Renderer trait
///
/// Creates the instance, device and allocator, and owns everything shared by
/// the resources it hands out: the descriptor pools, the sampler presets and
/// one fence per frame slot.

use deferred_3d_engine::deferred3d::{
    Error,
    Renderer,
    Result,
    render::{
        BindingGroup as RendererBindingGroup, BindingResource, Buffer as RendererBuffer, BufferDesc,
        CommandList as RendererCommandList, Framebuffer as RendererFramebuffer, FramebufferDesc,
        MAX_FRAMES_IN_FLIGHT, Pipeline as RendererPipeline, PipelineDesc,
        RenderPass as RendererRenderPass, RenderPassDesc, RendererConfig, RendererStats,
        Shader as RendererShader, ShaderDesc, Swapchain as RendererSwapchain,
        Texture as RendererTexture, TextureDesc,
    },
};
use deferred_3d_engine::{engine_bail, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use winit::window::Window;

use crate::debug::{init_debug_config, vulkan_debug_callback, DebugSeverity};
use crate::vulkan_binding_group::{BindingGroup, DescriptorPools};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{GpuContext, GpuContextParts};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::Texture;

const SOURCE: &str = "deferred3d::vulkan";

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan renderer
pub struct VulkanRenderer {
    ctx: Arc<GpuContext>,
    descriptor_pools: DescriptorPools,
    samplers: SamplerCache,
    /// Signalled when the last submission of the slot completes
    frame_fences: [vk::Fence; MAX_FRAMES_IN_FLIGHT],
    frames_submitted: u64,
}

/// Device picked for rendering
struct DeviceChoice {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    anisotropy: bool,
    geometry_shader: bool,
}

impl VulkanRenderer {
    /// Create a renderer able to present to `window`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if no device with a graphics queue that can
    /// present to the window exists, or if the device lacks Vulkan 1.3.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: RendererConfig) -> Result<Self> {
        let enable_validation = config.enable_validation || cfg!(feature = "vulkan-validation");

        let entry = unsafe {
            ash::Entry::load().map_err(|e| init_failed(format!("Failed to load Vulkan library: {:?}", e)))?
        };

        let display_handle = window
            .display_handle()
            .map_err(|e| init_failed(format!("Failed to get display handle: {}", e)))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| init_failed(format!("Failed to get window handle: {}", e)))?;

        let instance = create_instance(&entry, &config, display_handle.as_raw(), enable_validation)?;

        // From here on, failures must tear down what was created
        let debug_messenger = if enable_validation {
            match create_debug_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };
        let destroy_instance = |messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>| unsafe {
            if let Some((loader, messenger)) = messenger {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            instance.destroy_instance(None);
        };

        let surface = unsafe {
            ash_window::create_surface(&entry, &instance, display_handle.as_raw(), window_handle.as_raw(), None)
        };
        let surface = match surface {
            Ok(surface) => surface,
            Err(e) => {
                destroy_instance(debug_messenger);
                return Err(init_failed(format!("Failed to create surface: {:?}", e)));
            }
        };
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let choice = pick_device(&instance, &surface_loader, surface);
        // The surface only served device selection; swapchains create their own
        unsafe { surface_loader.destroy_surface(surface, None) };
        let choice = match choice {
            Ok(choice) => choice,
            Err(e) => {
                destroy_instance(debug_messenger);
                return Err(e);
            }
        };

        let device = match create_device(&instance, &choice) {
            Ok(device) => device,
            Err(e) => {
                destroy_instance(debug_messenger);
                return Err(e);
            }
        };
        let destroy_device = |messenger| {
            unsafe { device.destroy_device(None) };
            destroy_instance(messenger);
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: choice.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                destroy_device(debug_messenger);
                return Err(init_failed(format!("Failed to create GPU allocator: {:?}", e)));
            }
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(choice.queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let upload_command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                destroy_device(debug_messenger);
                return Err(init_failed(format!("Failed to create upload command pool: {:?}", e)));
            }
        };

        let queue = unsafe { device.get_device_queue(choice.queue_family, 0) };

        // GpuContext now owns the device and instance
        let ctx = Arc::new(GpuContext::new(GpuContextParts {
            entry,
            instance,
            physical_device: choice.physical_device,
            device,
            allocator,
            graphics_queue: queue,
            graphics_queue_family: choice.queue_family,
            present_queue: queue,
            upload_command_pool,
            debug_messenger,
        }));

        let frame_fences = create_frame_fences(&ctx)?;
        let descriptor_pools = match DescriptorPools::new(ctx.clone()) {
            Ok(pools) => pools,
            Err(e) => {
                destroy_fences(&ctx, &frame_fences);
                return Err(e);
            }
        };
        let samplers = match SamplerCache::new(ctx.clone(), choice.anisotropy) {
            Ok(samplers) => samplers,
            Err(e) => {
                destroy_fences(&ctx, &frame_fences);
                return Err(e);
            }
        };

        engine_info!(SOURCE, "Vulkan renderer ready (validation: {}, anisotropy: {}, geometry shaders: {})",
            enable_validation, choice.anisotropy, choice.geometry_shader);

        Ok(Self {
            ctx,
            descriptor_pools,
            samplers,
            frame_fences,
            frames_submitted: 0,
        })
    }

    fn frame_fence(&self, frame_slot: usize) -> Result<vk::Fence> {
        match self.frame_fences.get(frame_slot) {
            Some(&fence) => Ok(fence),
            None => Err(engine_err!(SOURCE,
                "Frame slot {} out of range (max {})", frame_slot, MAX_FRAMES_IN_FLIGHT)),
        }
    }
}

impl Renderer for VulkanRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(Texture::new(self.ctx.clone(), desc)?))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        Ok(Arc::new(Buffer::new(self.ctx.clone(), &desc)?))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        Ok(Arc::new(Shader::new(self.ctx.clone(), desc)?))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        Ok(Arc::new(Pipeline::new(self.ctx.clone(), desc)?))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        Ok(Arc::new(RenderPass::new(self.ctx.clone(), desc)?))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        Ok(Arc::new(Framebuffer::new(self.ctx.clone(), desc)?))
    }

    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn RendererBindingGroup>> {
        let layout = pipeline.binding_group_layouts().get(set_index as usize).cloned();
        let vk_pipeline = Pipeline::from_dyn(pipeline);
        let (Some(layout), Some(&set_layout)) = (layout, vk_pipeline.set_layouts.get(set_index as usize)) else {
            engine_error!(SOURCE, "Pipeline '{}' has no binding group {}", pipeline.name(), set_index);
            return Err(Error::InvalidResource(format!(
                "pipeline '{}' has no binding group {}", pipeline.name(), set_index
            )));
        };
        let group = self
            .descriptor_pools
            .create_binding_group(&self.samplers, set_layout, &layout, set_index, resources)?;
        Ok(Arc::new(group))
    }

    fn update_binding_group(
        &mut self,
        binding_group: &Arc<dyn RendererBindingGroup>,
        resources: &[BindingResource],
    ) -> Result<()> {
        let group = BindingGroup::from_dyn(binding_group);
        self.descriptor_pools.update_binding_group(&self.samplers, group, resources)
    }

    fn create_command_list(&mut self) -> Result<Box<dyn RendererCommandList>> {
        Ok(Box::new(CommandList::new(self.ctx.clone())?))
    }

    fn create_swapchain(&mut self, window: &Window) -> Result<Box<dyn RendererSwapchain>> {
        let display_handle = window
            .display_handle()
            .map_err(|e| engine_err!(SOURCE, "Failed to get display handle: {}", e))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| engine_err!(SOURCE, "Failed to get window handle: {}", e))?;
        let surface = unsafe {
            ash_window::create_surface(
                &self.ctx.entry,
                &self.ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| engine_err!(SOURCE, "Failed to create surface: {:?}", e))?
        };
        let size = window.inner_size();
        Ok(Box::new(Swapchain::new(self.ctx.clone(), surface, size.width, size.height)?))
    }

    fn wait_for_frame(&self, frame_slot: usize) -> Result<()> {
        let fence = self.frame_fence(frame_slot)?;
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for frame fence {}: {:?}", frame_slot, e))
        }
    }

    fn submit_frame(
        &mut self,
        commands: &dyn RendererCommandList,
        swapchain: &dyn RendererSwapchain,
        image_index: u32,
        frame_slot: usize,
    ) -> Result<()> {
        let fence = self.frame_fence(frame_slot)?;
        let Some(swapchain) = swapchain.as_any().downcast_ref::<Swapchain>() else {
            engine_bail!(SOURCE, "submit_frame needs a Vulkan swapchain");
        };
        let (Some(wait), Some(signal)) =
            (swapchain.image_available(frame_slot), swapchain.render_finished(image_index))
        else {
            engine_bail!(SOURCE, "Swapchain image {} or frame slot {} out of range", image_index, frame_slot);
        };

        let commands = unsafe { &*(commands as *const dyn RendererCommandList as *const CommandList) };
        if !commands.is_executable() {
            engine_bail!(SOURCE, "Command list submitted while still recording");
        }

        let wait_semaphores = [wait];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [commands.command_buffer()];
        let signal_semaphores = [signal];
        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!(SOURCE, "Failed to reset frame fence: {:?}", e))?;
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit frame: {:?}", e))?;
        }
        self.frames_submitted += 1;
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }

    fn stats(&self) -> RendererStats {
        RendererStats {
            frames_submitted: self.frames_submitted,
            textures: self.ctx.counters.textures.load(Ordering::Relaxed),
            buffers: self.ctx.counters.buffers.load(Ordering::Relaxed),
            pipelines: self.ctx.counters.pipelines.load(Ordering::Relaxed),
        }
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.ctx.device.device_wait_idle() {
                engine_warn!(SOURCE, "device_wait_idle failed during shutdown: {:?}", e);
            }
        }
        destroy_fences(&self.ctx, &self.frame_fences);
        // Pools, samplers and finally the context drop after this
    }
}

fn init_failed(message: String) -> Error {
    engine_error!(SOURCE, "{}", message);
    Error::InitializationFailed(message)
}

fn create_instance(
    entry: &ash::Entry,
    config: &RendererConfig,
    display_handle: raw_window_handle::RawDisplayHandle,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(config.app_name.as_str()).unwrap_or_else(|_| c"Deferred3D".to_owned());
    let (major, minor, patch) = config.app_version;
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, major, minor, patch))
        .engine_name(c"Deferred3D")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_3);

    let mut extension_names = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| init_failed(format!("Failed to get required instance extensions: {}", e)))?
        .to_vec();
    if enable_validation {
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
    }
    let layer_names = if enable_validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names);

    unsafe {
        entry
            .create_instance(&create_info, None)
            .map_err(|e| init_failed(format!("Failed to create Vulkan instance: {:?}", e)))
    }
}

fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    init_debug_config(DebugSeverity::ErrorsAndWarnings);

    let loader = ash::ext::debug_utils::Instance::new(entry, instance);
    let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe {
        loader
            .create_debug_utils_messenger(&info, None)
            .map_err(|e| init_failed(format!("Failed to create debug messenger: {:?}", e)))?
    };
    Ok((loader, messenger))
}

/// First device with a graphics queue able to present, discrete GPUs first
fn pick_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<DeviceChoice> {
    let devices = unsafe {
        instance
            .enumerate_physical_devices()
            .map_err(|e| init_failed(format!("Failed to enumerate physical devices: {:?}", e)))?
    };

    let mut candidates: Vec<(vk::PhysicalDevice, vk::PhysicalDeviceProperties)> = devices
        .into_iter()
        .map(|device| (device, unsafe { instance.get_physical_device_properties(device) }))
        .filter(|(_, props)| props.api_version >= vk::API_VERSION_1_3)
        .collect();
    candidates.sort_by_key(|(_, props)| props.device_type != vk::PhysicalDeviceType::DISCRETE_GPU);

    for (physical_device, props) in candidates {
        let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let queue_family = (0..families.len() as u32).find(|&index| {
            families[index as usize].queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && unsafe {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, index, surface)
                        .unwrap_or(false)
                }
        });
        let Some(queue_family) = queue_family else {
            continue;
        };

        let features = unsafe { instance.get_physical_device_features(physical_device) };
        let name = props
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        engine_info!(SOURCE, "Using GPU '{}' (queue family {})", name, queue_family);
        if features.geometry_shader == vk::FALSE {
            engine_warn!(SOURCE, "GPU '{}' has no geometry shaders; the mesh density view will fail", name);
        }

        return Ok(DeviceChoice {
            physical_device,
            queue_family,
            anisotropy: features.sampler_anisotropy == vk::TRUE,
            geometry_shader: features.geometry_shader == vk::TRUE,
        });
    }

    Err(init_failed("No Vulkan 1.3 GPU with a graphics queue that can present".to_string()))
}

fn create_device(instance: &ash::Instance, choice: &DeviceChoice) -> Result<ash::Device> {
    let priorities = [1.0];
    let queue_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(choice.queue_family)
        .queue_priorities(&priorities)];
    let extension_names = [ash::khr::swapchain::NAME.as_ptr()];
    let features = vk::PhysicalDeviceFeatures::default()
        .sampler_anisotropy(choice.anisotropy)
        .geometry_shader(choice.geometry_shader);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    unsafe {
        instance
            .create_device(choice.physical_device, &create_info, None)
            .map_err(|e| init_failed(format!("Failed to create logical device: {:?}", e)))
    }
}

fn create_frame_fences(ctx: &GpuContext) -> Result<[vk::Fence; MAX_FRAMES_IN_FLIGHT]> {
    // Signalled so the first wait on each slot returns immediately
    let info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
    let mut fences = [vk::Fence::null(); MAX_FRAMES_IN_FLIGHT];
    for slot in 0..MAX_FRAMES_IN_FLIGHT {
        match unsafe { ctx.device.create_fence(&info, None) } {
            Ok(fence) => fences[slot] = fence,
            Err(e) => {
                destroy_fences(ctx, &fences);
                return Err(init_failed(format!("Failed to create frame fence: {:?}", e)));
            }
        }
    }
    Ok(fences)
}

fn destroy_fences(ctx: &GpuContext, fences: &[vk::Fence]) {
    for &fence in fences {
        if fence != vk::Fence::null() {
            unsafe { ctx.device.destroy_fence(fence, None) };
        }
    }
}
