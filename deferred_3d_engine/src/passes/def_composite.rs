/// Deferred composite pass
///
/// Combines the lit colour with bloom, reflections and ambient occlusion.
/// With post-processing off the shader passes the lit colour through.

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{
    BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, Buffer, ClearValue,
    CommandList, Framebuffer, Pipeline, RenderPass, SamplerType, ShaderStageFlags, TextureFormat,
    MAX_FRAMES_IN_FLIGHT,
};
use crate::target::RenderTargetKey;
use super::common::{
    begin_pass, create_framebuffer, draw_fullscreen, end_pass, fullscreen_pipeline,
    fullscreen_render_pass, input_key, log_resized, slot_uniforms, target_names, OwnedTarget,
    SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "DefComposite";

/// Sampled inputs in binding order (bindings 0..=3)
const INPUTS: [&str; 4] = [
    target_names::LIT,
    target_names::BLOOM_BLUR_Y,
    target_names::SSR,
    target_names::SSAO,
];

/// std140 block of the composite settings
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeSettings {
    pub post_process: u32,
    _pad: [u32; 3],
}

impl CompositeSettings {
    pub fn new(post_process: bool) -> Self {
        Self { post_process: post_process as u32, _pad: [0; 3] }
    }
}

pub struct DefCompositePass {
    target: OwnedTarget,
    inputs: Vec<RenderTargetKey>,
    settings: Vec<Arc<dyn Buffer>>,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl DefCompositePass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let inputs = INPUTS
            .iter()
            .map(|name| input_key(ctx.registry, NAME, name))
            .collect::<Result<Vec<_>>>()?;

        let (width, height) = (ctx.width, ctx.height);
        let format = TextureFormat::R16G16B16A16_SFLOAT;
        let target = OwnedTarget::create(ctx, NAME, target_names::COMPOSITE, format, width, height)?;
        let settings = slot_uniforms(ctx.renderer, "composite_settings", std::mem::size_of::<CompositeSettings>() as u64)?;
        for buffer in &settings {
            buffer.update(0, bytemuck::bytes_of(&CompositeSettings::new(true)))?;
        }

        let render_pass = fullscreen_render_pass(NAME, &[format]).build(ctx.renderer)?;
        let mut entries: Vec<BindingSlotDesc> = (0..INPUTS.len() as u32)
            .map(|binding| BindingSlotDesc::new(binding, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT))
            .collect();
        entries.push(BindingSlotDesc::new(INPUTS.len() as u32, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT));
        let pipeline = fullscreen_pipeline("def_composite", "defComposite.frag.spv", &render_pass, BindingGroupLayoutDesc::new(entries))
            .build(ctx.renderer, ctx.shaders)?;
        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![target.texture(ctx.registry)?])?;

        let mut pass = Self {
            target,
            inputs,
            settings,
            render_pass,
            framebuffer,
            pipeline,
            bindings: SlotBindings::new(0),
        };
        pass.write_bindings(ctx)?;
        Ok(pass)
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

impl Pass for DefCompositePass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK])?;
        draw_fullscreen(cmd, &self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        end_pass(cmd)
    }

    fn update(&mut self, frame: &FrameContext) -> Result<()> {
        let settings = CompositeSettings::new(frame.settings.post_process);
        self.settings[frame.frame_slot].update(0, bytemuck::bytes_of(&settings))
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        self.target.recreate(ctx, NAME, width, height)?;
        self.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![self.target.texture(ctx.registry)?])?;
        self.write_bindings(ctx)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "def_composite_tests.rs"]
mod tests;
