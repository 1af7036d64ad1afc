/// Runtime-mutable renderer state: which branch runs, which debug view the
/// forward pass uses, and the post-process toggle.

use crate::config::{EngineConfig, SsaoSettings, SsrSettings};
use crate::renderer::MAX_FRAMES_IN_FLIGHT;
use crate::engine_info;

/// Branch of the frame between the depth prepass and the present pass
///
/// The discriminant is what the present shader reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum RenderType {
    Forward = 0,
    #[default]
    Deferred = 1,
    MeshDensity = 2,
}

/// Fragment shader variant of the forward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DebugView {
    #[default]
    Default,
    LinearDepth,
    MipLevel,
    PartialDerivative,
    /// Additive, depth test off
    Overshading,
    /// Additive, depth test on
    Overdraw,
}

impl DebugView {
    pub const ALL: [DebugView; 6] = [
        DebugView::Default,
        DebugView::LinearDepth,
        DebugView::MipLevel,
        DebugView::PartialDerivative,
        DebugView::Overshading,
        DebugView::Overdraw,
    ];

    pub fn fragment_shader(&self) -> &'static str {
        match self {
            DebugView::Default => "default.frag.spv",
            DebugView::LinearDepth => "linearized_depth.frag.spv",
            DebugView::MipLevel => "mipmap.frag.spv",
            DebugView::PartialDerivative => "pd.frag.spv",
            DebugView::Overshading => "overshading.frag.spv",
            DebugView::Overdraw => "overdraw.frag.spv",
        }
    }
}

/// Settings read by the passes every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub render_type: RenderType,
    pub debug_view: DebugView,
    pub post_process: bool,
    pub ssr: SsrSettings,
    pub ssao: SsaoSettings,
}

impl FrameSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            render_type: RenderType::default(),
            debug_view: DebugView::default(),
            post_process: true,
            ssr: config.ssr,
            ssao: config.ssao,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Number keys understood by [`RendererState::handle_key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Digit(u8),
}

/// Frame slot plus the mutable settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererState {
    pub frame_slot: usize,
    pub settings: FrameSettings,
}

impl RendererState {
    pub fn new(settings: FrameSettings) -> Self {
        Self { frame_slot: 0, settings }
    }

    pub fn advance_slot(&mut self) {
        self.frame_slot = (self.frame_slot + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    /// Apply a key press; returns false if the key maps to nothing
    ///
    /// 1-4, 6 and 7 pick the forward debug view, 5 toggles post-processing,
    /// 8, 9 and 0 switch to mesh density, forward and deferred.
    pub fn handle_key(&mut self, action: KeyAction) -> bool {
        let KeyAction::Digit(digit) = action;
        let settings = &mut self.settings;
        match digit {
            1 => settings.debug_view = DebugView::Default,
            2 => settings.debug_view = DebugView::LinearDepth,
            3 => settings.debug_view = DebugView::MipLevel,
            4 => settings.debug_view = DebugView::PartialDerivative,
            5 => settings.post_process = !settings.post_process,
            6 => settings.debug_view = DebugView::Overshading,
            7 => settings.debug_view = DebugView::Overdraw,
            8 => settings.render_type = RenderType::MeshDensity,
            9 => settings.render_type = RenderType::Forward,
            0 => settings.render_type = RenderType::Deferred,
            _ => return false,
        }
        engine_info!("deferred3d::RendererState",
            "Key {}: {:?}, view {:?}, post-process {}",
            digit, settings.render_type, settings.debug_view, settings.post_process);
        true
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
