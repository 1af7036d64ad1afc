/// Tests for pipeline state conversion

use super::*;
use deferred_3d_engine::deferred3d::render::{BlendFactor, BlendOp};

#[test]
fn test_replace_blend_writes_all_channels_without_blending() {
    let state = blend_attachment_to_vk(&ColorBlendState::REPLACE);
    assert_eq!(state.blend_enable, vk::FALSE);
    assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);
}

#[test]
fn test_additive_blend_for_density_counters() {
    let state = blend_attachment_to_vk(&ColorBlendState::ADDITIVE);
    assert_eq!(state.blend_enable, vk::TRUE);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE);
    assert_eq!(state.dst_alpha_blend_factor, vk::BlendFactor::ZERO);
    assert_eq!(state.color_blend_op, vk::BlendOp::ADD);
}

#[test]
fn test_alpha_blend_factors_carried_over() {
    let blend = ColorBlendState {
        blend_enable: true,
        src_color_factor: BlendFactor::SrcAlpha,
        dst_color_factor: BlendFactor::OneMinusSrcAlpha,
        color_blend_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
        alpha_blend_op: BlendOp::Max,
    };
    let state = blend_attachment_to_vk(&blend);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(state.alpha_blend_op, vk::BlendOp::MAX);
}
