//! Frame orchestration: renderer state, the pass chain and the per-frame
//! acquire / record / submit / present loop.

mod state;
mod pass_chain;
mod frame_renderer;

pub use state::{DebugView, FrameSettings, KeyAction, RenderType, RendererState};
pub use pass_chain::PassChain;
pub use frame_renderer::{FrameRenderer, FrameStatus};
