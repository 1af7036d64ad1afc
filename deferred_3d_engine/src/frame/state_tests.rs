/// Tests for key mapping and frame slot rotation

use super::*;

fn state() -> RendererState {
    RendererState::new(FrameSettings::default())
}

#[test]
fn test_defaults() {
    let state = state();
    assert_eq!(state.settings.render_type, RenderType::Deferred);
    assert_eq!(state.settings.debug_view, DebugView::Default);
    assert!(state.settings.post_process);
    assert_eq!(state.frame_slot, 0);
}

#[test]
fn test_render_type_keys() {
    let mut state = state();
    assert!(state.handle_key(KeyAction::Digit(9)));
    assert_eq!(state.settings.render_type, RenderType::Forward);
    state.handle_key(KeyAction::Digit(8));
    assert_eq!(state.settings.render_type, RenderType::MeshDensity);
    state.handle_key(KeyAction::Digit(0));
    assert_eq!(state.settings.render_type, RenderType::Deferred);
}

#[test]
fn test_debug_view_keys() {
    let mut state = state();
    let expected = [
        (2, DebugView::LinearDepth),
        (3, DebugView::MipLevel),
        (4, DebugView::PartialDerivative),
        (6, DebugView::Overshading),
        (7, DebugView::Overdraw),
        (1, DebugView::Default),
    ];
    for (digit, view) in expected {
        state.handle_key(KeyAction::Digit(digit));
        assert_eq!(state.settings.debug_view, view, "key {}", digit);
    }
    assert_eq!(state.settings.render_type, RenderType::Deferred);
}

#[test]
fn test_post_process_toggle() {
    let mut state = state();
    state.handle_key(KeyAction::Digit(5));
    assert!(!state.settings.post_process);
    state.handle_key(KeyAction::Digit(5));
    assert!(state.settings.post_process);
}

#[test]
fn test_unmapped_key_ignored() {
    let mut state = state();
    let before = state;
    assert!(!state.handle_key(KeyAction::Digit(42)));
    assert_eq!(state, before);
}

#[test]
fn test_slot_wraps() {
    let mut state = state();
    for expected in [1, 0, 1, 0] {
        state.advance_slot();
        assert_eq!(state.frame_slot, expected);
    }
}

#[test]
fn test_render_type_discriminants() {
    assert_eq!(RenderType::Forward as u32, 0);
    assert_eq!(RenderType::Deferred as u32, 1);
    assert_eq!(RenderType::MeshDensity as u32, 2);
}
