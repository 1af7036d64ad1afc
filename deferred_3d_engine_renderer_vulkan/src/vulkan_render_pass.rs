/// RenderPass - Vulkan implementation of the RenderPass trait
///
/// One graphics subpass; dependencies come from the descriptor unchanged.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{
        AttachmentDesc, RenderPass as RendererRenderPass, RenderPassDesc, StoreOp, TextureFormat,
    },
};
use deferred_3d_engine::{engine_bail, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    access_flags_to_vk, dependency_flags_to_vk, format_to_vk, image_layout_to_vk, load_op_to_vk,
    pipeline_stages_to_vk, samples_to_vk, store_op_to_vk, subpass_to_vk,
};

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan render pass implementation
pub struct RenderPass {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    color_formats: Vec<TextureFormat>,
    depth_format: Option<TextureFormat>,
}

impl RenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: &RenderPassDesc) -> Result<Self> {
        let mut attachments = Vec::with_capacity(desc.color_attachments.len() + 1);
        let mut color_refs = Vec::with_capacity(desc.color_attachments.len());

        for (index, color) in desc.color_attachments.iter().enumerate() {
            if color.format.is_depth() {
                engine_bail!(SOURCE, "Render pass '{}': color attachment {} has depth format {:?}",
                    desc.name, index, color.format);
            }
            attachments.push(attachment_to_vk(&desc.name, color)?);
            color_refs.push(vk::AttachmentReference::default()
                .attachment(index as u32)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        }

        let depth_ref = match &desc.depth_attachment {
            Some(depth) => {
                if !depth.format.is_depth() {
                    engine_bail!(SOURCE, "Render pass '{}': depth attachment has color format {:?}",
                        desc.name, depth.format);
                }
                attachments.push(attachment_to_vk(&desc.name, depth)?);
                Some(vk::AttachmentReference::default()
                    .attachment(attachments.len() as u32 - 1)
                    .layout(depth_subpass_layout(depth)))
            }
            None => None,
        };

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(depth_ref) = &depth_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|dep| {
                vk::SubpassDependency::default()
                    .src_subpass(subpass_to_vk(dep.src_subpass))
                    .dst_subpass(subpass_to_vk(dep.dst_subpass))
                    .src_stage_mask(pipeline_stages_to_vk(dep.src_stages))
                    .src_access_mask(access_flags_to_vk(dep.src_access))
                    .dst_stage_mask(pipeline_stages_to_vk(dep.dst_stages))
                    .dst_access_mask(access_flags_to_vk(dep.dst_access))
                    .dependency_flags(dependency_flags_to_vk(dep.flags))
            })
            .collect();

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe {
            ctx.device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create render pass '{}': {:?}", desc.name, e))?
        };
        ctx.set_object_name(render_pass, &desc.name);

        Ok(Self {
            ctx,
            render_pass,
            color_formats: desc.color_attachments.iter().map(|a| a.format).collect(),
            depth_format: desc.depth_attachment.as_ref().map(|a| a.format),
        })
    }

    /// Reinterpret a backend-agnostic render pass created by this backend
    pub(crate) fn from_dyn(render_pass: &Arc<dyn RendererRenderPass>) -> &RenderPass {
        unsafe { &*(Arc::as_ptr(render_pass) as *const RenderPass) }
    }
}

fn attachment_to_vk(pass_name: &str, attachment: &AttachmentDesc) -> Result<vk::AttachmentDescription> {
    let samples = samples_to_vk(attachment.samples).ok_or_else(|| {
        engine_err!(SOURCE, "Render pass '{}': unsupported sample count {}", pass_name, attachment.samples)
    })?;
    Ok(vk::AttachmentDescription::default()
        .format(format_to_vk(attachment.format))
        .samples(samples)
        .load_op(load_op_to_vk(attachment.load_op))
        .store_op(store_op_to_vk(attachment.store_op))
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(image_layout_to_vk(attachment.initial_layout))
        .final_layout(image_layout_to_vk(attachment.final_layout)))
}

/// Layout of the depth attachment during the subpass
///
/// A depth buffer that is only tested (STORE_OP_NONE) stays read-only so it
/// can be sampled in the same frame without a layout change.
pub(crate) fn depth_subpass_layout(depth: &AttachmentDesc) -> vk::ImageLayout {
    if depth.store_op == StoreOp::None {
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    } else {
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    }
}

impl RendererRenderPass for RenderPass {
    fn color_formats(&self) -> &[TextureFormat] {
        &self.color_formats
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
