/// Framebuffer trait and descriptor

use std::sync::Arc;
use crate::renderer::{RenderPass, Texture, TextureFormat};

/// Descriptor for creating a framebuffer
///
/// `attachments` must match the render pass attachment list in count, format
/// and order (colors, then depth).
pub struct FramebufferDesc<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub attachments: Vec<Arc<dyn Texture>>,
    pub width: u32,
    pub height: u32,
}

/// Framebuffer trait
///
/// Holds strong references to its attachments so their views outlive it.
pub trait Framebuffer: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Attachments bound to this framebuffer, in render pass order
    fn attachments(&self) -> &[Arc<dyn Texture>];

    fn attachment_formats(&self) -> Vec<TextureFormat> {
        self.attachments().iter().map(|a| a.info().format).collect()
    }
}

/// Validate a framebuffer descriptor against its render pass
///
/// Backends call this before creating the GPU object.
pub fn validate_framebuffer_desc(desc: &FramebufferDesc) -> crate::error::Result<()> {
    let expected = desc.render_pass.attachment_formats();
    let actual: Vec<TextureFormat> = desc.attachments.iter().map(|a| a.info().format).collect();
    if expected != actual {
        return Err(crate::error::Error::InvalidResource(format!(
            "framebuffer attachments {:?} do not match render pass {:?}",
            actual, expected
        )));
    }
    for attachment in &desc.attachments {
        let info = attachment.info();
        if !info.usage.is_attachment() {
            return Err(crate::error::Error::InvalidResource(format!(
                "texture {} is not usable as an attachment ({:?})",
                attachment.id(), info.usage
            )));
        }
        if info.width != desc.width || info.height != desc.height {
            return Err(crate::error::Error::InvalidResource(format!(
                "attachment {}x{} does not match framebuffer {}x{}",
                info.width, info.height, desc.width, desc.height
            )));
        }
    }
    Ok(())
}
