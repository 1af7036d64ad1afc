/// Forward pass
///
/// Shades the scene directly against the light list and the shadow map,
/// then draws the skybox. The fragment shader is chosen per frame by the
/// debug view; with the default view the alpha-masked meshes use the
/// alpha-masking shader instead.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::builder::{PipelineBuilder, RenderPassBuilder};
use crate::error::{Error, Result};
use crate::frame::DebugView;
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue,
    ColorBlendState, CommandList, CompareOp, CullMode, DependencyFlags, Framebuffer, FrontFace,
    ImageLayout, LoadOp, Pipeline, PipelineStages, PolygonMode, RenderPass, SamplerType, ShaderStage,
    ShaderStageFlags, StoreOp, SubpassRef, Texture, TextureFormat, MAX_FRAMES_IN_FLIGHT,
};
use crate::scene::MAX_SCENE_TEXTURES;
use crate::target::RenderTargetKey;
use super::common::{
    begin_pass, create_framebuffer, end_pass, input_key, log_resized, mesh_color_dependencies,
    mesh_pipeline, target_names, OwnedTarget, SlotBindings,
};
use super::skybox::Skybox;
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "ForwardPass";
const MESH_VERTEX_SHADER: &str = "default.vert.spv";

/// Colour target in the swapchain format plus a private depth buffer
pub(crate) fn forward_render_pass(color_format: TextureFormat) -> RenderPassBuilder {
    let depth_access = AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE | AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
    RenderPassBuilder::new(NAME)
        .add_attachment(
            color_format, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
        )
        .add_attachment(
            TextureFormat::D32_SFLOAT, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::DepthStencilAttachment,
        )
        .add_dependencies(mesh_color_dependencies())
        .add_dependency(
            SubpassRef::External, SubpassRef::Index(0),
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStages::FRAGMENT_TESTS, depth_access,
            DependencyFlags::empty(),
        )
        .add_dependency(
            SubpassRef::Index(0), SubpassRef::External,
            PipelineStages::FRAGMENT_TESTS, AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            PipelineStages::FRAGMENT_TESTS, depth_access,
            DependencyFlags::empty(),
        )
}

fn mesh_layout() -> BindingGroupLayoutDesc {
    BindingGroupLayoutDesc::new(vec![
        BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::ALL_GRAPHICS),
        BindingSlotDesc::new(1, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::array(2, BindingType::SampledImage, MAX_SCENE_TEXTURES as u32, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::new(3, BindingType::Sampler, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::new(4, BindingType::Sampler, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::new(5, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
    ])
}

/// Pipeline name of a debug view: the fragment shader file without `.frag.spv`
fn pipeline_name(view: DebugView) -> &'static str {
    let shader = view.fragment_shader();
    shader.strip_suffix(".frag.spv").unwrap_or(shader)
}

fn debug_pipeline(base: &PipelineBuilder, view: DebugView) -> PipelineBuilder {
    let builder = base
        .clone()
        .name(pipeline_name(view))
        .add_shader(ShaderStage::Fragment, view.fragment_shader());
    match view {
        DebugView::Overshading => builder
            .set_all_blend_attachments(ColorBlendState::ADDITIVE)
            .depth_state(false, false, CompareOp::LessOrEqual),
        DebugView::Overdraw => builder.set_all_blend_attachments(ColorBlendState::ADDITIVE),
        _ => builder,
    }
}

pub struct ForwardPass {
    color: OwnedTarget,
    depth: OwnedTarget,
    shadow_map: RenderTargetKey,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipelines: FxHashMap<DebugView, Arc<dyn Pipeline>>,
    alpha_masking: Arc<dyn Pipeline>,
    bindings: SlotBindings,
    skybox: Skybox,
}

impl ForwardPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let shadow_map = input_key(ctx.registry, NAME, target_names::SHADOW_MAP)?;

        let (width, height, format) = (ctx.width, ctx.height, ctx.swapchain_format);
        let color = OwnedTarget::create(ctx, NAME, target_names::FORWARD_COLOR, format, width, height)?;
        let depth = OwnedTarget::create(ctx, NAME, target_names::FORWARD_DEPTH, TextureFormat::D32_SFLOAT, width, height)?;

        let render_pass = forward_render_pass(format).build(ctx.renderer)?;

        let base = mesh_pipeline("forward", MESH_VERTEX_SHADER, &render_pass, mesh_layout());
        let mut pipelines = FxHashMap::default();
        for view in DebugView::ALL {
            pipelines.insert(view, debug_pipeline(&base, view).build(ctx.renderer, ctx.shaders)?);
        }
        let alpha_masking = base
            .name("alpha_masking")
            .add_shader(ShaderStage::Fragment, "alpha_masking.frag.spv")
            .rasterization(PolygonMode::Fill, CullMode::None, FrontFace::CounterClockwise)
            .build(ctx.renderer, ctx.shaders)?;

        let skybox = Skybox::new(ctx, &render_pass)?;
        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![
            color.texture(ctx.registry)?,
            depth.texture(ctx.registry)?,
        ])?;

        let mut pass = Self {
            color,
            depth,
            shadow_map,
            render_pass,
            framebuffer,
            pipelines,
            alpha_masking,
            bindings: SlotBindings::new(0),
            skybox,
        };
        pass.write_bindings(ctx)?;
        Ok(pass)
    }

    fn pipeline(&self, view: DebugView) -> Result<&Arc<dyn Pipeline>> {
        self.pipelines
            .get(&view)
            .ok_or_else(|| Error::InvalidResource(format!("no forward pipeline for {:?}", view)))
    }

    /// Shadow map is the only registry input; rewritten after every resize
    fn write_bindings(&mut self, ctx: &mut PassContext) -> Result<()> {
        let shadow_map = ctx.registry.get(self.shadow_map)?;
        let pipeline = Arc::clone(self.pipeline(DebugView::Default)?);
        let textures: Vec<&dyn Texture> = ctx.scene.textures().iter().map(|t| &**t).collect();
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            self.bindings.write(ctx.renderer, &pipeline, slot, &[
                BindingResource::UniformBuffer(ctx.camera.uniform_buffer(slot).as_ref()),
                BindingResource::UniformBuffer(ctx.scene.light_buffer(slot).as_ref()),
                BindingResource::TextureArray(textures.clone()),
                BindingResource::Sampler(SamplerType::RepeatAniso),
                BindingResource::Sampler(SamplerType::Repeat),
                BindingResource::SampledTexture(shadow_map.as_ref(), SamplerType::ClampToEdge),
            ])?;
        }
        Ok(())
    }
}

impl Pass for ForwardPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        let view = frame.settings.debug_view;
        let front = self.pipeline(view)?;
        let back = if view == DebugView::Default { &self.alpha_masking } else { front };
        let group = self.bindings.get(frame.frame_slot)?;

        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK, ClearValue::DEPTH_ONE])?;

        cmd.bind_pipeline(front)?;
        cmd.bind_binding_group(front, group)?;
        frame.scene.render_front_meshes(cmd, front)?;

        cmd.bind_pipeline(back)?;
        cmd.bind_binding_group(back, group)?;
        frame.scene.render_back_meshes(cmd, back)?;

        self.skybox.record(cmd, frame)?;
        end_pass(cmd)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height, format) = (ctx.width, ctx.height, ctx.swapchain_format);
        if format != self.color.format {
            return Err(Error::InvalidResource(format!(
                "swapchain format changed from {:?} to {:?}", self.color.format, format
            )));
        }
        self.color.recreate(ctx, NAME, width, height)?;
        self.depth.recreate(ctx, NAME, width, height)?;
        self.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![
            self.color.texture(ctx.registry)?,
            self.depth.texture(ctx.registry)?,
        ])?;
        self.write_bindings(ctx)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "forward_tests.rs"]
mod tests;
