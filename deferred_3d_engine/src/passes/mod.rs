//! Render passes of the deferred and forward pipelines.
//!
//! Every pass owns its render pass object, framebuffers, pipelines, the
//! render targets it writes and one binding group per frame slot. Targets
//! are published in the [`RenderTargetRegistry`]; a pass that samples
//! another pass's output holds only the registry key and resolves it when
//! it (re)writes its binding groups.
//!
//! Passes are built, and resized, in dependency order: a consumer must be
//! constructed after every producer it reads from.

mod common;
pub mod gaussian;
mod shadow_map;
mod depth_prepass;
mod gbuffer;
mod deferred_lighting;
mod ssao;
mod ssr;
mod bloom;
mod def_composite;
mod skybox;
mod forward;
mod mesh_density;
mod present;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;
use crate::builder::ShaderLibrary;
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::frame::FrameSettings;
use crate::renderer::{CommandList, Renderer, Texture, TextureFormat};
use crate::scene::{Scene, TextureLoader};
use crate::target::RenderTargetRegistry;

pub use common::target_names;
pub use gaussian::{gaussian_kernel_1d, reduce_for_linear_sampling, GaussianWeights, GAUSSIAN_TAPS};
pub use shadow_map::ShadowMapPass;
pub use depth_prepass::DepthPrepass;
pub use gbuffer::GBufferPass;
pub use deferred_lighting::DeferredLightingPass;
pub use ssao::SsaoPass;
pub use ssr::SsrPass;
pub use bloom::BloomPass;
pub use def_composite::DefCompositePass;
pub use skybox::Skybox;
pub use forward::ForwardPass;
pub use mesh_density::MeshDensityPass;
pub use present::PresentPass;

/// Everything a pass needs to build or rebuild its GPU objects
pub struct PassContext<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub registry: &'a mut RenderTargetRegistry,
    pub shaders: &'a ShaderLibrary,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub config: &'a EngineConfig,
    pub texture_loader: &'a dyn TextureLoader,
    /// Current swapchain extent
    pub width: u32,
    pub height: u32,
    pub swapchain_format: TextureFormat,
    pub swapchain_images: Vec<Arc<dyn Texture>>,
}

/// Per-frame inputs handed to `update` and `execute`
pub struct FrameContext<'a> {
    /// Frame-in-flight slot selecting uniform buffers and binding groups
    pub frame_slot: usize,
    /// Acquired swapchain image
    pub image_index: u32,
    pub settings: &'a FrameSettings,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Seconds since the renderer started
    pub time: f32,
}

/// One stage of the frame
pub trait Pass {
    /// Label used for debug markers and pass ordering
    fn name(&self) -> &'static str;

    /// Record the pass into `cmd`
    ///
    /// Must not touch resources of any frame slot other than
    /// `frame.frame_slot`.
    fn execute(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()>;

    /// Write the per-frame uniforms of `frame.frame_slot`
    fn update(&mut self, _frame: &FrameContext) -> Result<()> {
        Ok(())
    }

    /// Recreate extent-dependent targets and framebuffers, then repoint
    /// every binding group at the current registry textures
    fn resize(&mut self, ctx: &mut PassContext) -> Result<()>;
}
