/// Fluent builders for pipelines and render passes, and the shader binary library

pub mod shader_library;
pub mod pipeline_builder;
pub mod render_pass_builder;

pub use shader_library::*;
pub use pipeline_builder::*;
pub use render_pass_builder::*;
