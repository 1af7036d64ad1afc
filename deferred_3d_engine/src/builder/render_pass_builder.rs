/// Fluent render pass builder
///
/// Attachments are declared in framebuffer order. The one with a depth
/// format becomes the depth attachment; all others are colour attachments in
/// declaration order. Dependencies are handed to the backend as declared:
/// a pass that writes a target sampled later must declare the transition
/// itself, nothing is inferred.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::renderer::{
    AccessFlags, AttachmentDesc, DependencyFlags, ImageLayout, LoadOp, PipelineStages,
    RenderPass, RenderPassDesc, Renderer, StoreOp, SubpassDependency, SubpassRef, TextureFormat,
};
use crate::{engine_debug, engine_error};

pub struct RenderPassBuilder {
    name: String,
    attachments: Vec<AttachmentDesc>,
    dependencies: Vec<SubpassDependency>,
}

impl RenderPassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attachments: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn add_attachment(
        mut self,
        format: TextureFormat,
        samples: u32,
        load_op: LoadOp,
        store_op: StoreOp,
        initial_layout: ImageLayout,
        final_layout: ImageLayout,
    ) -> Self {
        self.attachments.push(AttachmentDesc {
            format,
            samples,
            load_op,
            store_op,
            initial_layout,
            final_layout,
        });
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_dependency(
        mut self,
        src_subpass: SubpassRef,
        dst_subpass: SubpassRef,
        src_stages: PipelineStages,
        src_access: AccessFlags,
        dst_stages: PipelineStages,
        dst_access: AccessFlags,
        flags: DependencyFlags,
    ) -> Self {
        self.dependencies.push(SubpassDependency {
            src_subpass,
            dst_subpass,
            src_stages,
            src_access,
            dst_stages,
            dst_access,
            flags,
        });
        self
    }

    /// Append several prepared dependencies
    pub fn add_dependencies(mut self, dependencies: impl IntoIterator<Item = SubpassDependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Split the attachments into the render pass descriptor
    ///
    /// # Errors
    ///
    /// `InvalidResource` if no attachment is declared, more than one has a
    /// depth format, or an attachment has a sample count of 0.
    pub fn desc(&self) -> Result<RenderPassDesc> {
        if self.attachments.is_empty() {
            return Err(invalid(format!("Render pass '{}' has no attachments", self.name)));
        }

        let mut color_attachments = Vec::new();
        let mut depth_attachment = None;
        for attachment in &self.attachments {
            if attachment.samples == 0 {
                return Err(invalid(format!(
                    "Render pass '{}': attachment {:?} has 0 samples", self.name, attachment.format
                )));
            }
            if attachment.format.is_depth() {
                if depth_attachment.is_some() {
                    return Err(invalid(format!(
                        "Render pass '{}' declares more than one depth attachment", self.name
                    )));
                }
                depth_attachment = Some(attachment.clone());
            } else {
                color_attachments.push(attachment.clone());
            }
        }

        Ok(RenderPassDesc {
            name: self.name.clone(),
            color_attachments,
            depth_attachment,
            dependencies: self.dependencies.clone(),
        })
    }

    pub fn build(&self, renderer: &mut dyn Renderer) -> Result<Arc<dyn RenderPass>> {
        let desc = self.desc()?;
        let render_pass = renderer.create_render_pass(&desc)?;
        engine_debug!("deferred3d::RenderPassBuilder",
            "Created render pass '{}' ({} colour, depth: {}, {} dependencies)",
            self.name, desc.color_attachments.len(), desc.depth_attachment.is_some(),
            desc.dependencies.len());
        Ok(render_pass)
    }
}

fn invalid(message: String) -> Error {
    engine_error!("deferred3d::RenderPassBuilder", "{}", message);
    Error::InvalidResource(message)
}

#[cfg(test)]
#[path = "render_pass_builder_tests.rs"]
mod tests;
