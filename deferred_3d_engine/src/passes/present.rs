/// Present pass
///
/// Final full-screen draw into the acquired swapchain image. The shader
/// picks the forward, deferred composite or mesh density result by the
/// render type and applies tone mapping when post-processing is on.

use std::sync::Arc;
use crate::builder::RenderPassBuilder;
use crate::error::{Error, Result};
use crate::frame::RenderType;
use crate::renderer::{
    AccessFlags, BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, Buffer,
    ClearValue, CommandList, DependencyFlags, Framebuffer, ImageLayout, LoadOp, Pipeline,
    PipelineStages, RenderPass, SamplerType, ShaderStageFlags, StoreOp, SubpassRef, TextureFormat,
    MAX_FRAMES_IN_FLIGHT,
};
use crate::target::RenderTargetKey;
use crate::engine_debug;
use super::common::{
    begin_pass, create_framebuffer, draw_fullscreen, end_pass, fullscreen_color_dependencies,
    fullscreen_pipeline, input_key, log_resized, slot_uniforms, target_names, SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "PresentPass";

/// Sampled inputs in binding order (bindings 0..=2)
const INPUTS: [&str; 3] = [
    target_names::FORWARD_COLOR,
    target_names::COMPOSITE,
    target_names::MESH_DENSITY,
];

/// std140 block selecting the displayed result
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PresentSettings {
    pub render_type: u32,
    pub post_process: u32,
    _pad: [u32; 2],
}

impl PresentSettings {
    pub fn new(render_type: RenderType, post_process: bool) -> Self {
        Self { render_type: render_type as u32, post_process: post_process as u32, _pad: [0; 2] }
    }
}

pub(crate) fn present_render_pass(format: TextureFormat) -> RenderPassBuilder {
    RenderPassBuilder::new(NAME)
        .add_attachment(
            format, 1, LoadOp::Clear, StoreOp::Store,
            ImageLayout::Undefined, ImageLayout::PresentSrc,
        )
        // Waits on the image-available semaphore at colour output
        .add_dependency(
            SubpassRef::External, SubpassRef::Index(0),
            PipelineStages::COLOR_ATTACHMENT_OUTPUT, AccessFlags::empty(),
            PipelineStages::COLOR_ATTACHMENT_OUTPUT, AccessFlags::COLOR_ATTACHMENT_WRITE,
            DependencyFlags::empty(),
        )
        .add_dependencies(fullscreen_color_dependencies())
}

pub struct PresentPass {
    inputs: Vec<RenderTargetKey>,
    settings: Vec<Arc<dyn Buffer>>,
    render_pass: Arc<dyn RenderPass>,
    /// One per swapchain image, indexed by image index
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl PresentPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let inputs = INPUTS
            .iter()
            .map(|name| input_key(ctx.registry, NAME, name))
            .collect::<Result<Vec<_>>>()?;

        let settings = slot_uniforms(ctx.renderer, "present_settings", std::mem::size_of::<PresentSettings>() as u64)?;
        let initial = PresentSettings::new(RenderType::default(), true);
        for buffer in &settings {
            buffer.update(0, bytemuck::bytes_of(&initial))?;
        }

        let render_pass = present_render_pass(ctx.swapchain_format).build(ctx.renderer)?;
        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(1, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(2, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(3, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
        ]);
        let pipeline = fullscreen_pipeline("present", "present.frag.spv", &render_pass, layout)
            .build(ctx.renderer, ctx.shaders)?;

        let mut pass = Self {
            inputs,
            settings,
            framebuffers: Self::framebuffers(ctx, &render_pass)?,
            render_pass,
            pipeline,
            bindings: SlotBindings::new(0),
        };
        pass.write_bindings(ctx)?;
        Ok(pass)
    }

    fn framebuffers(ctx: &mut PassContext, render_pass: &Arc<dyn RenderPass>) -> Result<Vec<Arc<dyn Framebuffer>>> {
        let mut framebuffers = Vec::with_capacity(ctx.swapchain_images.len());
        for image in &ctx.swapchain_images {
            framebuffers.push(create_framebuffer(ctx.renderer, render_pass, vec![Arc::clone(image)])?);
        }
        engine_debug!("deferred3d::PresentPass", "{} swapchain framebuffers", framebuffers.len());
        Ok(framebuffers)
    }

    fn write_bindings(&mut self, ctx: &mut PassContext) -> Result<()> {
        let textures = self
            .inputs
            .iter()
            .map(|&key| ctx.registry.get(key))
            .collect::<Result<Vec<_>>>()?;
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let mut resources: Vec<BindingResource> = textures
                .iter()
                .map(|texture| BindingResource::SampledTexture(texture.as_ref(), SamplerType::LinearClamp))
                .collect();
            resources.push(BindingResource::UniformBuffer(self.settings[slot].as_ref()));
            self.bindings.write(ctx.renderer, &self.pipeline, slot, &resources)?;
        }
        Ok(())
    }
}

impl Pass for PresentPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        let framebuffer = self.framebuffers.get(frame.image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "swapchain image {} out of range ({} framebuffers)",
                frame.image_index, self.framebuffers.len()
            ))
        })?;
        begin_pass(cmd, NAME, &self.render_pass, framebuffer, &[ClearValue::BLACK])?;
        draw_fullscreen(cmd, &self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        end_pass(cmd)
    }

    fn update(&mut self, frame: &FrameContext) -> Result<()> {
        let settings = PresentSettings::new(frame.settings.render_type, frame.settings.post_process);
        self.settings[frame.frame_slot].update(0, bytemuck::bytes_of(&settings))
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        self.framebuffers = Self::framebuffers(ctx, &self.render_pass)?;
        self.write_bindings(ctx)?;
        log_resized(NAME, ctx.width, ctx.height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "present_tests.rs"]
mod tests;
