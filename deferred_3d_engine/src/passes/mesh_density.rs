/// Mesh density view
///
/// Colours each triangle by its screen-space area, with a geometry shader
/// computing the per-triangle size. Depth comes from the prepass, loaded
/// read-only, so only the visible surface is shaded.

use std::sync::Arc;
use crate::builder::RenderPassBuilder;
use crate::error::{Error, Result};
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue,
    CommandList, CompareOp, DependencyFlags, Framebuffer, ImageLayout, LoadOp, Pipeline,
    PipelineStages, RenderPass, ShaderStage, ShaderStageFlags, StoreOp, SubpassRef, TextureFormat,
    MAX_FRAMES_IN_FLIGHT,
};
use crate::target::RenderTargetKey;
use super::common::{
    begin_pass, create_framebuffer, end_pass, input_key, log_resized, mesh_color_dependencies,
    mesh_pipeline, target_names, OwnedTarget, SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "MeshDensity";

pub(crate) fn mesh_density_render_pass(color_format: TextureFormat) -> RenderPassBuilder {
    RenderPassBuilder::new(NAME)
        .add_attachment(
            color_format, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
        )
        .add_attachment(
            TextureFormat::D32_SFLOAT, 1, LoadOp::Load, StoreOp::None,
            ImageLayout::DepthStencilReadOnly, ImageLayout::DepthStencilAttachment,
        )
        .add_dependencies(mesh_color_dependencies())
        .add_dependency(
            SubpassRef::External, SubpassRef::Index(0),
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            DependencyFlags::empty(),
        )
        .add_dependency(
            SubpassRef::Index(0), SubpassRef::External,
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            DependencyFlags::empty(),
        )
}

pub struct MeshDensityPass {
    color: OwnedTarget,
    prepass_depth: RenderTargetKey,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl MeshDensityPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let prepass_depth = input_key(ctx.registry, NAME, target_names::PREPASS_DEPTH)?;

        let (width, height, format) = (ctx.width, ctx.height, ctx.swapchain_format);
        let color = OwnedTarget::create(ctx, NAME, target_names::MESH_DENSITY, format, width, height)?;
        let render_pass = mesh_density_render_pass(format).build(ctx.renderer)?;

        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::ALL_GRAPHICS),
        ]);
        let pipeline = mesh_pipeline("mesh_density", "mesh_density.vert.spv", &render_pass, layout)
            .add_shader(ShaderStage::Geometry, "mesh_density.geom.spv")
            .add_shader(ShaderStage::Fragment, "mesh_density.frag.spv")
            .depth_state(true, false, CompareOp::LessOrEqual)
            .build(ctx.renderer, ctx.shaders)?;

        let mut bindings = SlotBindings::new(0);
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            bindings.write(ctx.renderer, &pipeline, slot, &[
                BindingResource::UniformBuffer(ctx.camera.uniform_buffer(slot).as_ref()),
            ])?;
        }

        let framebuffer = Self::framebuffer(ctx, &render_pass, &color, prepass_depth)?;
        Ok(Self { color, prepass_depth, render_pass, framebuffer, pipeline, bindings })
    }

    /// Own colour target plus the prepass depth currently in the registry
    fn framebuffer(
        ctx: &mut PassContext,
        render_pass: &Arc<dyn RenderPass>,
        color: &OwnedTarget,
        prepass_depth: RenderTargetKey,
    ) -> Result<Arc<dyn Framebuffer>> {
        let color = color.texture(ctx.registry)?;
        let depth = ctx.registry.get(prepass_depth)?;
        if (depth.info().width, depth.info().height) != (color.info().width, color.info().height) {
            return Err(Error::InvalidResource(format!(
                "{}: prepass depth is {}x{}, colour target is {}x{}",
                NAME, depth.info().width, depth.info().height, color.info().width, color.info().height
            )));
        }
        create_framebuffer(ctx.renderer, render_pass, vec![color, depth])
    }
}

impl Pass for MeshDensityPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK, ClearValue::DEPTH_ONE])?;
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_binding_group(&self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        frame.scene.render_front_meshes(cmd, &self.pipeline)?;
        frame.scene.render_back_meshes(cmd, &self.pipeline)?;
        end_pass(cmd)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        self.color.recreate(ctx, NAME, width, height)?;
        self.framebuffer = Self::framebuffer(ctx, &self.render_pass, &self.color, self.prepass_depth)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mesh_density_tests.rs"]
mod tests;
