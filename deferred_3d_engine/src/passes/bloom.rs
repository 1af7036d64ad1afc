/// Bloom pass
///
/// Separable Gaussian blur of the brightness target: a horizontal pass into
/// `bloom_blur_x`, then a vertical pass reading it into `bloom_blur_y`.
/// Both draws share one render pass; the reduced kernel is uploaded once at
/// construction.

use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{
    BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, Buffer, ClearValue,
    CommandList, Framebuffer, Pipeline, RenderPass, SamplerType, ShaderStageFlags, TextureFormat,
    MAX_FRAMES_IN_FLIGHT,
};
use crate::target::RenderTargetKey;
use crate::engine_debug;
use super::common::{
    begin_pass, create_framebuffer, draw_fullscreen, end_pass, fullscreen_pipeline,
    fullscreen_render_pass, input_key, log_resized, slot_uniforms, target_names, OwnedTarget,
    SlotBindings,
};
use super::gaussian::GaussianWeights;
use super::{FrameContext, Pass, PassContext};

const NAME: &str = "Bloom";
const HORIZONTAL_LABEL: &str = "BloomHorizontalBlur";
const VERTICAL_LABEL: &str = "BloomVerticalBlur";
const FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

/// One blur direction: target, framebuffer, pipeline and bindings
struct BlurStage {
    target: OwnedTarget,
    framebuffer: Arc<dyn Framebuffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl BlurStage {
    /// `shader` names both the pipeline and its fragment shader file
    fn new(ctx: &mut PassContext, render_pass: &Arc<dyn RenderPass>, name: &'static str, shader: &str) -> Result<Self> {
        let (width, height) = (ctx.width, ctx.height);
        let target = OwnedTarget::create(ctx, NAME, name, FORMAT, width, height)?;
        let pipeline = fullscreen_pipeline(shader, &format!("{}.frag.spv", shader), render_pass, blur_layout())
            .build(ctx.renderer, ctx.shaders)?;
        let framebuffer = create_framebuffer(ctx.renderer, render_pass, vec![target.texture(ctx.registry)?])?;
        Ok(Self { target, framebuffer, pipeline, bindings: SlotBindings::new(0) })
    }
}

pub struct BloomPass {
    brightness: RenderTargetKey,
    weights: Vec<Arc<dyn Buffer>>,
    render_pass: Arc<dyn RenderPass>,
    horizontal: BlurStage,
    vertical: BlurStage,
}

fn blur_layout() -> BindingGroupLayoutDesc {
    BindingGroupLayoutDesc::new(vec![
        BindingSlotDesc::new(0, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
        BindingSlotDesc::new(1, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT),
    ])
}

impl BloomPass {
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let brightness = input_key(ctx.registry, NAME, target_names::BRIGHTNESS)?;

        let kernel = GaussianWeights::new(ctx.config.gaussian_sigma, ctx.config.gaussian_kernel_size)?;
        let weights = slot_uniforms(ctx.renderer, "gaussian_weights", std::mem::size_of::<GaussianWeights>() as u64)?;
        for buffer in &weights {
            buffer.update(0, bytemuck::bytes_of(&kernel))?;
        }
        engine_debug!("deferred3d::Bloom",
            "Gaussian kernel sigma {} size {}", ctx.config.gaussian_sigma, ctx.config.gaussian_kernel_size);

        let render_pass = fullscreen_render_pass(NAME, &[FORMAT]).build(ctx.renderer)?;

        let horizontal = BlurStage::new(ctx, &render_pass, target_names::BLOOM_BLUR_X, "bloom_blur_x")?;
        let vertical = BlurStage::new(ctx, &render_pass, target_names::BLOOM_BLUR_Y, "bloom_blur_y")?;

        let mut pass = Self { brightness, weights, render_pass, horizontal, vertical };
        pass.write_bindings(ctx)?;
        Ok(pass)
    }

    /// X reads the brightness target, Y reads the X result
    fn write_bindings(&mut self, ctx: &mut PassContext) -> Result<()> {
        let brightness = ctx.registry.get(self.brightness)?;
        let blur_x = self.horizontal.target.texture(ctx.registry)?;
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let weights = self.weights[slot].as_ref();
            self.horizontal.bindings.write(ctx.renderer, &self.horizontal.pipeline, slot, &[
                BindingResource::SampledTexture(brightness.as_ref(), SamplerType::LinearClamp),
                BindingResource::UniformBuffer(weights),
            ])?;
            self.vertical.bindings.write(ctx.renderer, &self.vertical.pipeline, slot, &[
                BindingResource::SampledTexture(blur_x.as_ref(), SamplerType::LinearClamp),
                BindingResource::UniformBuffer(weights),
            ])?;
        }
        Ok(())
    }

    fn record_stage(&self, cmd: &mut dyn CommandList, stage: &BlurStage, label: &str, frame_slot: usize) -> Result<()> {
        begin_pass(cmd, label, &self.render_pass, &stage.framebuffer, &[ClearValue::BLACK])?;
        draw_fullscreen(cmd, &stage.pipeline, stage.bindings.get(frame_slot)?)?;
        end_pass(cmd)
    }
}

impl Pass for BloomPass {
    fn name(&self) -> &'static str {
        NAME
    }

    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        self.record_stage(cmd, &self.horizontal, HORIZONTAL_LABEL, frame.frame_slot)?;
        self.record_stage(cmd, &self.vertical, VERTICAL_LABEL, frame.frame_slot)
    }

    fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        let (width, height) = (ctx.width, ctx.height);
        for stage in [&mut self.horizontal, &mut self.vertical] {
            stage.target.recreate(ctx, NAME, width, height)?;
            stage.framebuffer = create_framebuffer(ctx.renderer, &self.render_pass, vec![stage.target.texture(ctx.registry)?])?;
        }
        self.write_bindings(ctx)?;
        log_resized(NAME, width, height);
        Ok(())
    }
}

#[cfg(test)]
#[path = "bloom_tests.rs"]
mod tests;
