/// Depth prepass
///
/// Vertex-only depth render of the whole scene at swapchain extent. The
/// mesh density view loads this depth instead of clearing its own.

use std::sync::Arc;
use crate::builder::RenderPassBuilder;
use crate::error::Result;
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue,
    CommandList, DependencyFlags, Framebuffer, ImageLayout, LoadOp, Pipeline, PipelineStages,
    RenderPass, ShaderStageFlags, StoreOp, SubpassRef, TextureFormat, MAX_FRAMES_IN_FLIGHT,
};
use super::common::{
    begin_pass, create_framebuffer, end_pass, log_resized, mesh_pipeline, target_names, OwnedTarget,
    SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "DepthPrepass";

pub struct DepthPrepass {
    depth: OwnedTarget,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl DepthPrepass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let (width, height) = (ctx.width, ctx.height);
        let depth = OwnedTarget::create(ctx, NAME, target_names::PREPASS_DEPTH, TextureFormat::D32_SFLOAT, width, height)?;

        let render_pass = RenderPassBuilder::new(NAME)
            .add_attachment(
                TextureFormat::D32_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
                ImageLayout::Undefined, ImageLayout::DepthStencilReadOnly,
            )
            .add_dependency(
                SubpassRef::External, SubpassRef::Index(0),
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                DependencyFlags::empty(),
            )
            .add_dependency(
                SubpassRef::Index(0), SubpassRef::External,
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
                DependencyFlags::empty(),
            )
            .build(ctx.renderer)?;

        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
        ]);
        let pipeline = mesh_pipeline("depth_prepass", "default.vert.spv", &render_pass, layout)
            .build(ctx.renderer, ctx.shaders)?;

        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![depth.texture(ctx.registry)?])?;

        let mut bindings = SlotBindings::new(0);
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let camera = ctx.camera.uniform_buffer(slot);
            bindings.write(ctx.renderer, &pipeline, slot, &[BindingResource::UniformBuffer(camera.as_ref())])?;
        }

        Ok(Self { depth, render_pass, framebuffer, pipeline, bindings })
    }
}

impl Pass for DepthPrepass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::DEPTH_ONE])?;
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_binding_group(&self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        frame.scene.render_front_meshes(cmd, &self.pipeline)?;
        frame.scene.render_back_meshes(cmd, &self.pipeline)?;
        end_pass(cmd)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        self.depth.recreate(ctx, NAME, width, height)?;
        self.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![self.depth.texture(ctx.registry)?])?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "depth_prepass_tests.rs"]
mod tests;
