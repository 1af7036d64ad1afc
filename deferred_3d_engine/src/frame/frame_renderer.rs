/// Frame renderer
///
/// Owns the swapchain, one command list per frame slot and the pass chain.
/// `update` waits on the slot fence before it rewrites that slot's uniform
/// buffers. `render_frame` waits too unless `update` already did, then
/// acquires an image, records the passes of the current render type, submits
/// and presents.

use std::time::Instant;
use crate::builder::ShaderLibrary;
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::passes::{FrameContext, PassContext};
use crate::renderer::{AcquireOutcome, CommandList, PresentOutcome, Renderer, Swapchain, MAX_FRAMES_IN_FLIGHT};
use crate::scene::{Scene, TextureLoader};
use crate::target::RenderTargetRegistry;
use crate::{engine_debug, engine_info};
use super::{FrameSettings, KeyAction, PassChain, RenderType, RendererState};

/// What `render_frame` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// Presented, then the swapchain was recreated (out of date or suboptimal)
    Recreated,
    /// Nothing recorded: the acquire was out of date or the window is minimized
    Skipped,
}

pub struct FrameRenderer {
    swapchain: Box<dyn Swapchain>,
    command_lists: Vec<Box<dyn CommandList>>,
    registry: RenderTargetRegistry,
    shaders: ShaderLibrary,
    config: EngineConfig,
    texture_loader: Box<dyn TextureLoader>,
    chain: PassChain,
    state: RendererState,
    /// Window extent the swapchain is recreated at
    extent: (u32, u32),
    /// The current slot's fence has been waited on since the slot was entered
    slot_ready: bool,
    start: Instant,
    time: f32,
}

impl FrameRenderer {
    /// Build every pass against `swapchain`
    pub fn new(
        renderer: &mut dyn Renderer,
        swapchain: Box<dyn Swapchain>,
        scene: &Scene,
        camera: &Camera,
        config: EngineConfig,
        shaders: ShaderLibrary,
        texture_loader: Box<dyn TextureLoader>,
    ) -> Result<Self> {
        let command_lists = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| renderer.create_command_list())
            .collect::<Result<Vec<_>>>()?;

        let mut registry = RenderTargetRegistry::new();
        let chain = {
            let mut ctx = PassContext {
                renderer,
                registry: &mut registry,
                shaders: &shaders,
                scene,
                camera,
                config: &config,
                texture_loader: texture_loader.as_ref(),
                width: swapchain.width(),
                height: swapchain.height(),
                swapchain_format: swapchain.format(),
                swapchain_images: swapchain.images(),
            };
            PassChain::new(&mut ctx)?
        };

        engine_info!("deferred3d::FrameRenderer",
            "Frame renderer ready: {} swapchain images, {} render targets, {} shaders",
            swapchain.image_count(), registry.len(), shaders.cached_count());

        Ok(Self {
            extent: (swapchain.width(), swapchain.height()),
            swapchain,
            command_lists,
            registry,
            state: RendererState::new(FrameSettings::from_config(&config)),
            shaders,
            config,
            texture_loader,
            chain,
            slot_ready: false,
            start: Instant::now(),
            time: 0.0,
        })
    }

    /// Record the window extent; the swapchain follows on the next recreate
    pub fn resize(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
    }

    /// Advance the camera, the lights and every pass's uniforms of the
    /// current frame slot
    ///
    /// Blocks until the GPU is done with the slot's previous frame.
    pub fn update(&mut self, renderer: &dyn Renderer, dt: f32, scene: &mut Scene, camera: &mut Camera) -> Result<()> {
        let slot = self.state.frame_slot;
        self.wait_for_slot(renderer)?;
        self.time = self.start.elapsed().as_secs_f32();

        camera.update(dt, self.swapchain.width(), self.swapchain.height());
        camera.write_uniform(slot)?;
        scene.update(slot)?;

        let frame = FrameContext {
            frame_slot: slot,
            image_index: 0,
            settings: &self.state.settings,
            scene,
            camera,
            time: self.time,
        };
        self.chain.update(&frame)
    }

    pub fn render_frame(&mut self, renderer: &mut dyn Renderer, scene: &Scene, camera: &Camera) -> Result<FrameStatus> {
        let (width, height) = self.extent;
        if width == 0 || height == 0 {
            return Ok(FrameStatus::Skipped);
        }

        let slot = self.state.frame_slot;
        self.wait_for_slot(renderer)?;

        // The slot fence stays signalled, so retrying this slot cannot deadlock
        let image_index = match self.swapchain.acquire_next_image(slot)? {
            AcquireOutcome::Image(index) => index,
            AcquireOutcome::OutOfDate => {
                engine_debug!("deferred3d::FrameRenderer", "Acquire out of date, skipping frame");
                self.recreate_swapchain(renderer, scene, camera)?;
                return Ok(FrameStatus::Skipped);
            }
        };

        let frame = FrameContext {
            frame_slot: slot,
            image_index,
            settings: &self.state.settings,
            scene,
            camera,
            time: self.time,
        };
        let cmd = self.command_lists[slot].as_mut();
        cmd.begin()?;
        for pass in self.chain.frame_passes(self.state.settings.render_type) {
            pass.execute(cmd, &frame)?;
        }
        cmd.end()?;
        renderer.submit_frame(cmd, self.swapchain.as_ref(), image_index, slot)?;

        let status = match self.swapchain.present(image_index)? {
            PresentOutcome::Presented => FrameStatus::Presented,
            PresentOutcome::OutOfDate => {
                self.recreate_swapchain(renderer, scene, camera)?;
                FrameStatus::Recreated
            }
        };
        self.state.advance_slot();
        self.slot_ready = false;
        Ok(status)
    }

    fn wait_for_slot(&mut self, renderer: &dyn Renderer) -> Result<()> {
        if !self.slot_ready {
            renderer.wait_for_frame(self.state.frame_slot)?;
            self.slot_ready = true;
        }
        Ok(())
    }

    /// Wait for the GPU, recreate the swapchain at the window extent and
    /// resize every pass
    pub fn recreate_swapchain(&mut self, renderer: &mut dyn Renderer, scene: &Scene, camera: &Camera) -> Result<()> {
        let (width, height) = self.extent;
        renderer.wait_idle()?;
        self.swapchain.recreate(width, height)?;

        let mut ctx = PassContext {
            renderer,
            registry: &mut self.registry,
            shaders: &self.shaders,
            scene,
            camera,
            config: &self.config,
            texture_loader: self.texture_loader.as_ref(),
            width: self.swapchain.width(),
            height: self.swapchain.height(),
            swapchain_format: self.swapchain.format(),
            swapchain_images: self.swapchain.images(),
        };
        self.chain.resize(&mut ctx)?;
        engine_info!("deferred3d::FrameRenderer",
            "Swapchain recreated at {}x{}", self.swapchain.width(), self.swapchain.height());
        Ok(())
    }

    pub fn handle_key(&mut self, action: KeyAction) -> bool {
        self.state.handle_key(action)
    }

    /// Names of the passes a frame of `render_type` records, in order
    pub fn executed_passes(&self, render_type: RenderType) -> Vec<&'static str> {
        self.chain.frame_passes(render_type).iter().map(|pass| pass.name()).collect()
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.state.settings
    }

    pub fn frame_slot(&self) -> usize {
        self.state.frame_slot
    }

    pub fn registry(&self) -> &RenderTargetRegistry {
        &self.registry
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
