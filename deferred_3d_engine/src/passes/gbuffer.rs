/// Geometry buffer pass
///
/// Writes albedo, packed normals, emissive and metal/roughness plus depth
/// for the deferred branch. Opaque meshes use `gbuffer.frag`; alpha-masked
/// meshes use `gbuffer_alpha.frag`, which discards masked texels.

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue,
    CommandList, DependencyFlags, Framebuffer, ImageLayout, LoadOp, Pipeline, PipelineStages,
    RenderPass, SamplerType, ShaderStage, ShaderStageFlags, StoreOp, SubpassDependency, SubpassRef,
    Texture, TextureFormat, MAX_FRAMES_IN_FLIGHT,
};
use crate::builder::RenderPassBuilder;
use crate::scene::MAX_SCENE_TEXTURES;
use super::common::{
    begin_pass, create_framebuffer, end_pass, log_resized, mesh_color_dependencies, mesh_pipeline,
    target_names, OwnedTarget, SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "GBuffer";

/// Colour attachments in attachment order
const COLOR_TARGETS: [(&str, TextureFormat); 4] = [
    (target_names::GBUFFER_ALBEDO, TextureFormat::R8G8B8A8_SRGB),
    (target_names::GBUFFER_NORMAL, TextureFormat::A2R10G10B10_UNORM_PACK32),
    (target_names::GBUFFER_EMISSIVE, TextureFormat::R16G16B16A16_SFLOAT),
    (target_names::GBUFFER_METAL_ROUGHNESS, TextureFormat::R8G8_UNORM),
];

fn depth_dependencies() -> [SubpassDependency; 2] {
    [
        SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_stages: PipelineStages::FRAGMENT_TESTS,
            dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            flags: DependencyFlags::empty(),
        },
        // Deferred lighting and the screen-space passes sample the depth
        SubpassDependency {
            src_subpass: SubpassRef::Index(0),
            dst_subpass: SubpassRef::External,
            src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_stages: PipelineStages::FRAGMENT_TESTS | PipelineStages::FRAGMENT_SHADER,
            dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
                | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | AccessFlags::SHADER_READ,
            flags: DependencyFlags::empty(),
        },
    ]
}

pub struct GBufferPass {
    colors: Vec<OwnedTarget>,
    depth: OwnedTarget,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    opaque_pipeline: Arc<dyn Pipeline>,
    alpha_pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl GBufferPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let (width, height) = (ctx.width, ctx.height);
        let colors = COLOR_TARGETS
            .iter()
            .map(|&(name, format)| OwnedTarget::create(ctx, NAME, name, format, width, height))
            .collect::<Result<Vec<_>>>()?;
        let depth = OwnedTarget::create(ctx, NAME, target_names::GBUFFER_DEPTH, TextureFormat::D32_SFLOAT, width, height)?;

        let render_pass = COLOR_TARGETS
            .iter()
            .fold(RenderPassBuilder::new(NAME), |builder, &(_, format)| {
                builder.add_attachment(
                    format, 1, LoadOp::Clear, StoreOp::Store,
                    ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
                )
            })
            .add_attachment(
                TextureFormat::D32_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
                ImageLayout::Undefined, ImageLayout::DepthStencilReadOnly,
            )
            .add_dependencies(mesh_color_dependencies())
            .add_dependencies(depth_dependencies())
            .build(ctx.renderer)?;

        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
            BindingSlotDesc::array(1, BindingType::SampledImage, MAX_SCENE_TEXTURES as u32, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(2, BindingType::Sampler, ShaderStageFlags::FRAGMENT),
        ]);
        let base = mesh_pipeline("gbuffer", "default.vert.spv", &render_pass, layout);
        let opaque_pipeline = base
            .clone()
            .add_shader(ShaderStage::Fragment, "gbuffer.frag.spv")
            .build(ctx.renderer, ctx.shaders)?;
        let alpha_pipeline = base
            .name("gbuffer_alpha")
            .add_shader(ShaderStage::Fragment, "gbuffer_alpha.frag.spv")
            .build(ctx.renderer, ctx.shaders)?;

        let mut pass = Self {
            framebuffer: Self::framebuffer(ctx, &render_pass, &colors, &depth)?,
            colors,
            depth,
            render_pass,
            opaque_pipeline,
            alpha_pipeline,
            bindings: SlotBindings::new(0),
        };
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let camera = ctx.camera.uniform_buffer(slot);
            let textures: Vec<&dyn Texture> = ctx.scene.textures().iter().map(|t| &**t).collect();
            pass.bindings.write(ctx.renderer, &pass.opaque_pipeline, slot, &[
                BindingResource::UniformBuffer(camera.as_ref()),
                BindingResource::TextureArray(textures),
                BindingResource::Sampler(SamplerType::RepeatAniso),
            ])?;
        }
        Ok(pass)
    }

    fn framebuffer(
        ctx: &mut PassContext,
        render_pass: &Arc<dyn RenderPass>,
        colors: &[OwnedTarget],
        depth: &OwnedTarget,
    ) -> Result<Arc<dyn Framebuffer>> {
        let attachments = colors
            .iter()
            .chain(std::iter::once(depth))
            .map(|target| target.texture(ctx.registry))
            .collect::<Result<Vec<_>>>()?;
        create_framebuffer(ctx.renderer, render_pass, attachments)
    }
}

impl Pass for GBufferPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        let clears = [
            ClearValue::BLACK,
            ClearValue::BLACK,
            ClearValue::BLACK,
            ClearValue::BLACK,
            ClearValue::DEPTH_ONE,
        ];
        let group = self.bindings.get(frame.frame_slot)?;
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &clears)?;

        cmd.bind_pipeline(&self.opaque_pipeline)?;
        cmd.bind_binding_group(&self.opaque_pipeline, group)?;
        frame.scene.render_front_meshes(cmd, &self.opaque_pipeline)?;

        cmd.bind_pipeline(&self.alpha_pipeline)?;
        cmd.bind_binding_group(&self.alpha_pipeline, group)?;
        frame.scene.render_back_meshes(cmd, &self.alpha_pipeline)?;

        end_pass(cmd)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        for target in self.colors.iter().chain(std::iter::once(&self.depth)) {
            target.recreate(ctx, NAME, width, height)?;
        }
        self.framebuffer = Self::framebuffer(ctx, &self.render_pass, &self.colors, &self.depth)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "gbuffer_tests.rs"]
mod tests;
