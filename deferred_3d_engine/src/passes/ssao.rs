/// Screen-space ambient occlusion
///
/// Samples the G-buffer depth and normals around each pixel, rotated per
/// pixel by a tiling 4x4 noise texture.

use std::sync::Arc;
use glam::Vec4;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use crate::error::Result;
use crate::renderer::{
    BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, Buffer, ClearValue,
    CommandList, Framebuffer, Pipeline, RenderPass, Renderer, SamplerType, ShaderStageFlags, Texture,
    TextureData, TextureDesc, TextureFormat, TextureUsage, MAX_FRAMES_IN_FLIGHT,
};
use crate::config::SsaoSettings;
use crate::target::RenderTargetKey;
use super::common::{
    begin_pass, create_framebuffer, draw_fullscreen, end_pass, fullscreen_pipeline,
    fullscreen_render_pass, input_key, log_resized, slot_uniforms, target_names, OwnedTarget,
    SlotBindings,
};
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "SSAO";

/// Edge length of the rotation noise texture
pub const NOISE_SIZE: u32 = 4;
const NOISE_SEED: u64 = 12345;

/// Random rotation vectors: xy in [-1, 1), z = 0, w = 1
pub fn generate_noise() -> Vec<Vec4> {
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    (0..NOISE_SIZE * NOISE_SIZE)
        .map(|_| Vec4::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), 0.0, 1.0))
        .collect()
}

fn create_noise_texture(renderer: &mut dyn Renderer) -> Result<Arc<dyn Texture>> {
    let noise = generate_noise();
    renderer.create_texture(TextureDesc {
        name: "ssao_noise".to_string(),
        width: NOISE_SIZE,
        height: NOISE_SIZE,
        format: TextureFormat::R32G32B32A32_SFLOAT,
        usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
        array_layers: 1,
        mip_levels: 1,
        cube_compatible: false,
        data: Some(TextureData::Single(bytemuck::cast_slice(&noise).to_vec())),
    })
}

pub struct SsaoPass {
    target: OwnedTarget,
    depth: RenderTargetKey,
    normal: RenderTargetKey,
    noise: Arc<dyn Texture>,
    settings: Vec<Arc<dyn Buffer>>,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl SsaoPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let depth = input_key(ctx.registry, NAME, target_names::GBUFFER_DEPTH)?;
        let normal = input_key(ctx.registry, NAME, target_names::GBUFFER_NORMAL)?;

        let (width, height) = (ctx.width, ctx.height);
        let format = TextureFormat::R16G16B16A16_SFLOAT;
        let target = OwnedTarget::create(ctx, NAME, target_names::SSAO, format, width, height)?;
        let noise = create_noise_texture(ctx.renderer)?;
        let settings = slot_uniforms(ctx.renderer, "ssao_settings", std::mem::size_of::<SsaoSettings>() as u64)?;
        for buffer in &settings {
            buffer.update(0, bytemuck::bytes_of(&ctx.config.ssao))?;
        }

        let render_pass = fullscreen_render_pass(NAME, &[format]).build(ctx.renderer)?;
        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
            BindingSlotDesc::new(1, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(2, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(3, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
            BindingSlotDesc::new(4, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
        ]);
        let pipeline = fullscreen_pipeline("ssao", "SSAO.frag.spv", &render_pass, layout)
            .build(ctx.renderer, ctx.shaders)?;
        let framebuffer = create_framebuffer(ctx.renderer, &render_pass, vec![target.texture(ctx.registry)?])?;

        let mut pass = Self {
            target,
            depth,
            normal,
            noise,
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
        let depth = ctx.registry.get(self.depth)?;
        let normal = ctx.registry.get(self.normal)?;
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            self.bindings.write(ctx.renderer, &self.pipeline, slot, &[
                BindingResource::UniformBuffer(ctx.camera.uniform_buffer(slot).as_ref()),
                BindingResource::UniformBuffer(self.settings[slot].as_ref()),
                BindingResource::SampledTexture(depth.as_ref(), SamplerType::NearestClamp),
                BindingResource::SampledTexture(normal.as_ref(), SamplerType::NearestClamp),
                BindingResource::SampledTexture(self.noise.as_ref(), SamplerType::Repeat),
            ])?;
        }
        Ok(())
    }
}

impl Pass for SsaoPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        begin_pass(cmd, NAME, &self.render_pass, &self.framebuffer, &[ClearValue::BLACK])?;
        draw_fullscreen(cmd, &self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        end_pass(cmd)
    }

    fn update(&mut self, frame: &FrameContext) -> Result<()> {
        let settings = SsaoSettings { time: frame.time, ..frame.settings.ssao };
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
#[path = "ssao_tests.rs"]
mod tests;
