/// Deferred lighting pass
///
/// Full-screen resolve of the G-buffer against the light list and the
/// shadow map. Writes the lit colour and a brightness target holding the
/// texels above the bloom threshold.

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{
    BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, ClearValue, CommandList,
    Framebuffer, Pipeline, RenderPass, SamplerType, ShaderStageFlags, TextureFormat,
    MAX_FRAMES_IN_FLIGHT,
};
use crate::target::RenderTargetKey;
use super::common::{
    begin_pass, create_framebuffer, draw_fullscreen, end_pass, fullscreen_pipeline,
    fullscreen_render_pass, input_key, log_resized, target_names, OwnedTarget, SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "DeferredLighting";

/// Sampled inputs in binding order (bindings 2..=7)
const INPUTS: [(&str, SamplerType); 6] = [
    (target_names::GBUFFER_DEPTH, SamplerType::NearestClamp),
    (target_names::GBUFFER_ALBEDO, SamplerType::NearestClamp),
    (target_names::GBUFFER_NORMAL, SamplerType::NearestClamp),
    (target_names::GBUFFER_METAL_ROUGHNESS, SamplerType::NearestClamp),
    (target_names::GBUFFER_EMISSIVE, SamplerType::NearestClamp),
    (target_names::SHADOW_MAP, SamplerType::ClampToEdge),
];

pub struct DeferredLightingPass {
    lit: OwnedTarget,
    brightness: OwnedTarget,
    inputs: Vec<RenderTargetKey>,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl DeferredLightingPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let inputs = INPUTS
            .iter()
            .map(|(name, _)| input_key(ctx.registry, NAME, name))
            .collect::<Result<Vec<_>>>()?;

        let (width, height) = (ctx.width, ctx.height);
        let format = TextureFormat::R16G16B16A16_SFLOAT;
        let lit = OwnedTarget::create(ctx, NAME, target_names::LIT, format, width, height)?;
        let brightness = OwnedTarget::create(ctx, NAME, target_names::BRIGHTNESS, format, width, height)?;

        let render_pass = fullscreen_render_pass(NAME, &[format, format]).build(ctx.renderer)?;

        let mut entries = vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
            BindingSlotDesc::new(1, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
        ];
        entries.extend((2..2 + INPUTS.len() as u32).map(|binding| {
            BindingSlotDesc::new(binding, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT)
        }));
        let pipeline = fullscreen_pipeline("deferred_lighting", "defLighting.frag.spv", &render_pass, BindingGroupLayoutDesc::new(entries))
            .build(ctx.renderer, ctx.shaders)?;

        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![
            lit.texture(ctx.registry)?,
            brightness.texture(ctx.registry)?,
        ])?;

        let mut pass = Self {
            lit,
            brightness,
            inputs,
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
                BindingResource::UniformBuffer(ctx.scene.light_buffer(slot).as_ref()),
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

impl Pass for DeferredLightingPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK, ClearValue::BLACK])?;
        draw_fullscreen(cmd, &self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        end_pass(cmd)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        self.lit.recreate(ctx, NAME, width, height)?;
        self.brightness.recreate(ctx, NAME, width, height)?;
        self.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![
            self.lit.texture(ctx.registry)?,
            self.brightness.texture(ctx.registry)?,
        ])?;
        self.write_bindings(ctx)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "deferred_lighting_tests.rs"]
mod tests;
