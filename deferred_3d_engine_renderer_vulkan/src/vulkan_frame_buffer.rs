/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Keeps its attachments alive; the image views it references belong to them.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{Framebuffer as RendererFramebuffer, FramebufferDesc, Texture as RendererTexture, validate_framebuffer_desc},
};
use deferred_3d_engine::{engine_err, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan framebuffer implementation
pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    attachments: Vec<Arc<dyn RendererTexture>>,
}

impl Framebuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &FramebufferDesc) -> Result<Self> {
        if let Err(e) = validate_framebuffer_desc(desc) {
            engine_error!(SOURCE, "Invalid framebuffer: {}", e);
            return Err(e);
        }

        let render_pass = RenderPass::from_dyn(desc.render_pass);
        let views: Vec<vk::ImageView> = desc
            .attachments
            .iter()
            .map(|texture| Texture::from_dyn(texture.as_ref()).view)
            .collect();

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            ctx.device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Self {
            ctx,
            framebuffer,
            width: desc.width,
            height: desc.height,
            attachments: desc.attachments.clone(),
        })
    }

    pub(crate) fn from_dyn(framebuffer: &Arc<dyn RendererFramebuffer>) -> &Framebuffer {
        unsafe { &*(Arc::as_ptr(framebuffer) as *const Framebuffer) }
    }
}

impl RendererFramebuffer for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachments(&self) -> &[Arc<dyn RendererTexture>] {
        &self.attachments
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
