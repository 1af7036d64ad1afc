/// Screen-space reflections
///
/// Marches the view ray reflected off each G-buffer texel through the depth
/// buffer and samples the lit colour where it hits.

use std::sync::Arc;
use crate::config::SsrSettings;
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

const NAME: &str = "SSR";

/// Sampled inputs in binding order (bindings 2..=5)
const INPUTS: [(&str, SamplerType); 4] = [
    (target_names::LIT, SamplerType::LinearClamp),
    (target_names::GBUFFER_DEPTH, SamplerType::NearestClamp),
    (target_names::GBUFFER_NORMAL, SamplerType::NearestClamp),
    (target_names::GBUFFER_METAL_ROUGHNESS, SamplerType::NearestClamp),
];

pub struct SsrPass {
    target: OwnedTarget,
    inputs: Vec<RenderTargetKey>,
    settings: Vec<Arc<dyn Buffer>>,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl SsrPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let inputs = INPUTS
            .iter()
            .map(|(name, _)| input_key(ctx.registry, NAME, name))
            .collect::<Result<Vec<_>>>()?;

        let (width, height) = (ctx.width, ctx.height);
        let format = TextureFormat::R16G16B16A16_SFLOAT;
        let target = OwnedTarget::create(ctx, NAME, target_names::SSR, format, width, height)?;
        let settings = slot_uniforms(ctx.renderer, "ssr_settings", std::mem::size_of::<SsrSettings>() as u64)?;
        for buffer in &settings {
            buffer.update(0, bytemuck::bytes_of(&ctx.config.ssr))?;
        }

        let render_pass = fullscreen_render_pass(NAME, &[format]).build(ctx.renderer)?;
        let mut entries = vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
            BindingSlotDesc::new(1, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
        ];
        entries.extend((2..2 + INPUTS.len() as u32).map(|binding| {
            BindingSlotDesc::new(binding, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT)
        }));
        let pipeline = fullscreen_pipeline("ssr", "ssr.frag.spv", &render_pass, BindingGroupLayoutDesc::new(entries))
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
            let mut resources = vec![
                BindingResource::UniformBuffer(ctx.camera.uniform_buffer(slot).as_ref()),
                BindingResource::UniformBuffer(self.settings[slot].as_ref()),
            ];
            resources.extend(
                textures
                    .iter()
                    .zip(INPUTS.iter())
                    .map(|(texture, (_, sampler))| BindingResource::SampledTexture(texture.as_ref(), *sampler)),
            );
            self.bindings.write(ctx.renderer, &self.pipeline, slot, &resources)?;
        }
        Ok(())
    }
}

impl Pass for SsrPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK])?;
        draw_fullscreen(cmd, &self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        end_pass(cmd)
    }

    fn update(&mut self, frame: &FrameContext) -> Result<()> {
        self.settings[frame.frame_slot].update(0, bytemuck::bytes_of(&frame.settings.ssr))
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
#[path = "ssr_tests.rs"]
mod tests;
