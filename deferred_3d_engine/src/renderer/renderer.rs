/// Renderer trait - main rendering factory interface

use std::sync::Arc;
use winit::window::Window;

use crate::error::Result;
use crate::renderer::{
    Buffer, Texture, Shader, Pipeline, RenderPass, Framebuffer, BindingGroup,
    CommandList, Swapchain,
    BufferDesc, TextureDesc, ShaderDesc, PipelineDesc, RenderPassDesc, FramebufferDesc,
    BindingResource,
};

/// Number of frames the CPU may record ahead of the GPU
///
/// Every per-frame resource (fence, semaphores, uniform buffers, binding
/// groups, command lists) exists once per slot.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Deferred3D Application".to_string(),
            app_version: (1, 0, 0),
        }
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Frames submitted since creation
    pub frames_submitted: u64,
    /// Live textures
    pub textures: u32,
    /// Live buffers
    pub buffers: u32,
    /// Live pipelines
    pub pipelines: u32,
}

/// Main renderer trait
///
/// Central factory for GPU resources and owner of the per-slot frame fences.
/// Implemented by backend-specific renderers (e.g., VulkanRenderer).
pub trait Renderer: Send + Sync {
    /// Create a texture, uploading `desc.data` if present
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a host-visible buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a shader module from SPIR-V
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a graphics pipeline
    ///
    /// # Errors
    ///
    /// Fails if the number of blend states differs from the render pass
    /// color attachment count.
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a render pass with one subpass and explicit dependencies
    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create a framebuffer; attachments must match the render pass formats
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Allocate a binding group for `set_index` of `pipeline` and write `resources`
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline providing the layout
    /// * `set_index` - Set number in the pipeline layout
    /// * `resources` - One resource per layout entry, in entry order
    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Rewrite every entry of an existing binding group
    ///
    /// Used after a resize when upstream render targets were recreated.
    fn update_binding_group(
        &mut self,
        binding_group: &Arc<dyn BindingGroup>,
        resources: &[BindingResource],
    ) -> Result<()>;

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>>;

    fn create_swapchain(&mut self, window: &Window) -> Result<Box<dyn Swapchain>>;

    /// Block until the GPU has finished the last submission of `frame_slot`
    fn wait_for_frame(&self, frame_slot: usize) -> Result<()>;

    /// Submit a recorded frame
    ///
    /// Resets the slot fence, waits on the image-available semaphore of the
    /// slot and signals the render-finished semaphore of `image_index`.
    fn submit_frame(
        &mut self,
        commands: &dyn CommandList,
        swapchain: &dyn Swapchain,
        image_index: u32,
        frame_slot: usize,
    ) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;

    fn stats(&self) -> RendererStats;
}
