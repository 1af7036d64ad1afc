/// Renderer module - backend-agnostic GPU abstraction

pub mod renderer;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod sampler;
pub mod pipeline;
pub mod binding_group;
pub mod render_pass;
pub mod frame_buffer;
pub mod command_list;
pub mod swapchain;
pub mod mock_renderer;

pub use renderer::*;
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use sampler::*;
pub use pipeline::*;
pub use binding_group::*;
pub use render_pass::*;
pub use frame_buffer::*;
pub use command_list::*;
pub use swapchain::*;
