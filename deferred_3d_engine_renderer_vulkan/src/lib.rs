/*!
# Deferred 3D Engine - Vulkan Renderer Backend

Vulkan implementation of the `deferred_3d_engine` renderer traits, built on
`ash` for the bindings and `gpu-allocator` for memory.

```no_run
use deferred_3d_engine::deferred3d::render::RendererConfig;
use deferred_3d_engine_renderer_vulkan::VulkanRenderer;
# fn run(window: &winit::window::Window) -> deferred_3d_engine::deferred3d::Result<()> {
let renderer = VulkanRenderer::new(window, RendererConfig::default())?;
# Ok(())
# }
```

Validation layers are enabled by `RendererConfig::enable_validation` or,
unconditionally, by the `vulkan-validation` feature.
*/

mod debug;
mod vulkan_binding_group;
mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_context;
mod vulkan_format;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_renderer;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_texture;

pub use vulkan_renderer::VulkanRenderer;
pub use vulkan_swapchain::Swapchain as VulkanSwapchain;

pub use debug::{get_validation_stats, print_validation_stats_report, DebugSeverity, ValidationStats};
