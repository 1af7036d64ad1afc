/// Shadow map pass
///
/// Renders scene depth from the sun into a fixed-size depth target that the
/// forward and deferred lighting shaders sample. Front faces are culled to
/// push acne behind the lit surface.

use std::sync::Arc;
use crate::builder::RenderPassBuilder;
use crate::error::Result;
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue,
    CommandList, CullMode, DependencyFlags, Framebuffer, FrontFace, ImageLayout, LoadOp, Pipeline,
    PipelineStages, PolygonMode, RenderPass, ShaderStage, ShaderStageFlags, StoreOp, SubpassRef,
    TextureFormat, MAX_FRAMES_IN_FLIGHT,
};
use crate::engine_info;
use super::common::{
    begin_pass, create_framebuffer, end_pass, log_resized, mesh_pipeline, target_names, OwnedTarget,
    SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "ShadowMap";

pub struct ShadowMapPass {
    target: OwnedTarget,
    size: u32,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl ShadowMapPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let size = ctx.config.shadow_map_size;
        let target = OwnedTarget::create(ctx, NAME, target_names::SHADOW_MAP, TextureFormat::D32_SFLOAT, size, size)?;

        let render_pass = RenderPassBuilder::new(NAME)
            .add_attachment(
                TextureFormat::D32_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
                ImageLayout::Undefined, ImageLayout::DepthStencilReadOnly,
            )
            .add_dependency(
                SubpassRef::External, SubpassRef::Index(0),
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                PipelineStages::EARLY_FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                DependencyFlags::BY_REGION,
            )
            .add_dependency(
                SubpassRef::Index(0), SubpassRef::External,
                PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                PipelineStages::FRAGMENT_SHADER, AccessFlags::SHADER_READ,
                DependencyFlags::BY_REGION,
            )
            .build(ctx.renderer)?;

        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
        ]);
        let pipeline = mesh_pipeline("shadow_map", "shadow_map.vert.spv", &render_pass, layout)
            .add_shader(ShaderStage::Fragment, "shadow_map.frag.spv")
            .rasterization(PolygonMode::Fill, CullMode::Front, FrontFace::CounterClockwise)
            .build(ctx.renderer, ctx.shaders)?;

        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![target.texture(ctx.registry)?])?;

        let mut bindings = SlotBindings::new(0);
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let lights = ctx.scene.light_buffer(slot);
            bindings.write(ctx.renderer, &pipeline, slot, &[BindingResource::UniformBuffer(lights.as_ref())])?;
        }

        engine_info!("deferred3d::ShadowMap", "Shadow map {}x{}", size, size);
        Ok(Self { target, size, render_pass, framebuffer, pipeline, bindings })
    }
}

impl Pass for ShadowMapPass {
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

    /// Recreated at the configured size; the window extent does not apply
    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        self.target.recreate(ctx, NAME, self.size, self.size)?;
        self.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![self.target.texture(ctx.registry)?])?;
        log_resized(NAME, self.size, self.size);
        Ok(())
    }
}

#[cfg(test)]
#[path = "shadow_map_tests.rs"]
mod tests;
