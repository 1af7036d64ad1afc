pub mod render_target_registry;

pub use render_target_registry::{RenderTargetRegistry, RenderTargetKey};
