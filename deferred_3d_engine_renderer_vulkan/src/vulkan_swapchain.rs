/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the surface, the swapchain images and their views, and the
/// presentation semaphores: one image-available semaphore per frame slot and
/// one render-finished semaphore per swapchain image.

use deferred_3d_engine::deferred3d::{
    Error,
    Result,
    render::{
        AcquireOutcome, MAX_FRAMES_IN_FLIGHT, PresentOutcome, Swapchain as RendererSwapchain,
        Texture as RendererTexture, TextureFormat, TextureInfo, TextureUsage,
    },
};
use deferred_3d_engine::{engine_bail, engine_err, engine_error, engine_info};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_surface_format;
use crate::vulkan_texture::Texture;

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan swapchain implementation
pub struct Swapchain {
    ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    extent: vk::Extent2D,
    image_views: Vec<vk::ImageView>,
    textures: Vec<Arc<dyn RendererTexture>>,
    image_available: [vk::Semaphore; MAX_FRAMES_IN_FLIGHT],
    render_finished: Vec<vk::Semaphore>,
}

impl Swapchain {
    /// Create a swapchain on `surface`, taking ownership of the surface
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let supported = unsafe {
            surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.graphics_queue_family, surface)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { surface_loader.destroy_surface(surface, None) };
            engine_bail!(SOURCE, "Graphics queue family cannot present to this surface");
        }

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(ctx.physical_device, surface)
        };
        let surface_format = match formats.map(|formats| choose_surface_format(&formats)) {
            Ok(Some(format)) => format,
            Ok(None) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(Error::InitializationFailed("Surface reports no formats".to_string()));
            }
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(engine_err!(SOURCE, "Failed to query surface formats: {:?}", e));
            }
        };
        let Some(format) = vk_surface_format(surface_format.format) else {
            unsafe { surface_loader.destroy_surface(surface, None) };
            engine_bail!(SOURCE, "Unsupported surface format {:?}", surface_format.format);
        };

        // Drop now owns the surface
        let mut swapchain = Self {
            ctx,
            surface,
            surface_loader,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            surface_format,
            format,
            extent: vk::Extent2D { width, height },
            image_views: Vec::new(),
            textures: Vec::new(),
            image_available: [vk::Semaphore::null(); MAX_FRAMES_IN_FLIGHT],
            render_finished: Vec::new(),
        };
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            swapchain.image_available[slot] = swapchain.create_semaphore()?;
        }
        swapchain.build(width, height)?;

        engine_info!(SOURCE, "Swapchain created: {}x{}, {} images, {:?}",
            swapchain.extent.width, swapchain.extent.height,
            swapchain.textures.len(), surface_format.format);
        Ok(swapchain)
    }

    /// Semaphore signalled when the image acquired for `frame_slot` is ready
    pub(crate) fn image_available(&self, frame_slot: usize) -> Option<vk::Semaphore> {
        self.image_available.get(frame_slot).copied()
    }

    /// Semaphore signalled when rendering into `image_index` has finished
    pub(crate) fn render_finished(&self, image_index: u32) -> Option<vk::Semaphore> {
        self.render_finished.get(image_index as usize).copied()
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe {
            self.ctx
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create semaphore: {:?}", e))
        }
    }

    /// (Re)create the swapchain, its views and the per-image semaphores
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?
        };

        let extent = choose_extent(&capabilities, width, height);
        let image_count = choose_image_count(&capabilities);
        let old_swapchain = self.swapchain;

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?
        };

        // The old swapchain is retired even when the rest of the rebuild fails
        self.destroy_views();
        unsafe {
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
        }
        self.swapchain = swapchain;
        self.extent = extent;

        let images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?
        };

        let info = TextureInfo {
            width: extent.width,
            height: extent.height,
            format: self.format,
            usage: TextureUsage::COLOR_ATTACHMENT,
            array_layers: 1,
            mip_levels: 1,
            cube_compatible: false,
        };
        for &image in &images {
            let view = self.create_view(image)?;
            self.image_views.push(view);
            self.textures.push(Arc::new(Texture::from_swapchain(self.ctx.clone(), image, view, info.clone())));
        }

        if self.render_finished.len() != images.len() {
            self.destroy_render_finished();
            for _ in 0..images.len() {
                let semaphore = self.create_semaphore()?;
                self.render_finished.push(semaphore);
            }
        }
        Ok(())
    }

    fn create_view(&self, image: vk::Image) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(self.surface_format.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        unsafe {
            self.ctx
                .device
                .create_image_view(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain image view: {:?}", e))
        }
    }

    fn destroy_views(&mut self) {
        self.textures.clear();
        for view in self.image_views.drain(..) {
            unsafe { self.ctx.device.destroy_image_view(view, None) };
        }
    }

    fn destroy_render_finished(&mut self) {
        for semaphore in self.render_finished.drain(..) {
            unsafe { self.ctx.device.destroy_semaphore(semaphore, None) };
        }
    }
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self, frame_slot: usize) -> Result<AcquireOutcome> {
        let Some(semaphore) = self.image_available(frame_slot) else {
            engine_bail!(SOURCE, "Frame slot {} out of range", frame_slot);
        };
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            ) {
                // Suboptimal images are still rendered; present reports it
                Ok((index, _suboptimal)) => Ok(AcquireOutcome::Image(index)),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
                Err(e) => Err(engine_err!(SOURCE, "Failed to acquire swapchain image: {:?}", e)),
            }
        }
    }

    fn present(&mut self, image_index: u32) -> Result<PresentOutcome> {
        let Some(wait) = self.render_finished(image_index) else {
            engine_bail!(SOURCE, "Swapchain image {} out of range", image_index);
        };
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) {
                Ok(false) => Ok(PresentOutcome::Presented),
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
                Err(e) => Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }
        self.build(width, height)?;
        engine_info!(SOURCE, "Swapchain recreated: {}x{}", self.extent.width, self.extent.height);
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.textures.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn images(&self) -> Vec<Arc<dyn RendererTexture>> {
        self.textures.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }
        self.destroy_views();
        self.destroy_render_finished();
        unsafe {
            for semaphore in self.image_available {
                if semaphore != vk::Semaphore::null() {
                    self.ctx.device.destroy_semaphore(semaphore, None);
                }
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Prefer B8G8R8A8_SRGB with a non-linear sRGB color space, else the first
/// format the surface reports
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// Window size clamped to the surface limits, unless the surface fixes it
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum when there is one
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
