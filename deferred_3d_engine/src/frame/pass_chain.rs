/// Every pass of the frame, built and resized in dependency order

use crate::error::Result;
use crate::passes::{
    BloomPass, DefCompositePass, DeferredLightingPass, DepthPrepass, ForwardPass, FrameContext,
    GBufferPass, MeshDensityPass, Pass, PassContext, PresentPass, ShadowMapPass, SsaoPass, SsrPass,
};
use crate::engine_info;
use super::RenderType;

pub struct PassChain {
    shadow_map: ShadowMapPass,
    depth_prepass: DepthPrepass,
    gbuffer: GBufferPass,
    deferred_lighting: DeferredLightingPass,
    ssao: SsaoPass,
    ssr: SsrPass,
    bloom: BloomPass,
    composite: DefCompositePass,
    forward: ForwardPass,
    mesh_density: MeshDensityPass,
    present: PresentPass,
}

impl PassChain {
    /// Build every pass; producers come before their consumers
    pub fn new(ctx: &mut PassContext) -> Result<Self> {
        let chain = Self {
            shadow_map: ShadowMapPass::new(ctx)?,
            depth_prepass: DepthPrepass::new(ctx)?,
            gbuffer: GBufferPass::new(ctx)?,
            deferred_lighting: DeferredLightingPass::new(ctx)?,
            ssao: SsaoPass::new(ctx)?,
            ssr: SsrPass::new(ctx)?,
            bloom: BloomPass::new(ctx)?,
            composite: DefCompositePass::new(ctx)?,
            forward: ForwardPass::new(ctx)?,
            mesh_density: MeshDensityPass::new(ctx)?,
            present: PresentPass::new(ctx)?,
        };
        engine_info!("deferred3d::PassChain",
            "Built {} passes at {}x{}", chain.all().len(), ctx.width, ctx.height);
        Ok(chain)
    }

    /// All passes in construction order
    pub fn all(&self) -> [&dyn Pass; 11] {
        [
            &self.shadow_map,
            &self.depth_prepass,
            &self.gbuffer,
            &self.deferred_lighting,
            &self.ssao,
            &self.ssr,
            &self.bloom,
            &self.composite,
            &self.forward,
            &self.mesh_density,
            &self.present,
        ]
    }

    fn all_mut(&mut self) -> [&mut dyn Pass; 11] {
        [
            &mut self.shadow_map,
            &mut self.depth_prepass,
            &mut self.gbuffer,
            &mut self.deferred_lighting,
            &mut self.ssao,
            &mut self.ssr,
            &mut self.bloom,
            &mut self.composite,
            &mut self.forward,
            &mut self.mesh_density,
            &mut self.present,
        ]
    }

    /// Passes recorded for one frame, in recording order
    pub fn frame_passes(&self, render_type: RenderType) -> Vec<&dyn Pass> {
        let mut passes: Vec<&dyn Pass> = vec![&self.shadow_map, &self.depth_prepass];
        match render_type {
            RenderType::Forward => passes.push(&self.forward),
            RenderType::MeshDensity => passes.push(&self.mesh_density),
            RenderType::Deferred => passes.extend([
                &self.gbuffer as &dyn Pass,
                &self.deferred_lighting,
                &self.ssao,
                &self.ssr,
                &self.bloom,
                &self.composite,
            ]),
        }
        passes.push(&self.present);
        passes
    }

    /// Write the per-frame uniforms of every pass
    pub fn update(&mut self, frame: &FrameContext) -> Result<()> {
        for pass in self.all_mut() {
            pass.update(frame)?;
        }
        Ok(())
    }

    /// Resize every pass in construction order
    pub fn resize(&mut self, ctx: &mut PassContext) -> Result<()> {
        for pass in self.all_mut() {
            pass.resize(ctx)?;
        }
        Ok(())
    }
}
