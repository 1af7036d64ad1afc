/// Tests for the G-buffer pass

use super::*;
use crate::passes::test_support::{PassFixture, WIDTH};

#[test]
fn test_registers_four_colour_targets_and_depth() {
    let mut fixture = PassFixture::new();
    let _pass = GBufferPass::new(&mut fixture.ctx()).unwrap();

    for (name, format) in COLOR_TARGETS {
        let target = fixture.target(name);
        assert_eq!(target.info().format, format, "{}", name);
        assert_eq!(target.info().width, WIDTH);
    }
    assert_eq!(fixture.target(target_names::GBUFFER_DEPTH).info().format, TextureFormat::D32_SFLOAT);
    assert_eq!(fixture.registry.len(), 5);
}

#[test]
fn test_opaque_then_alpha_pipeline() {
    let mut fixture = PassFixture::new();
    let pass = GBufferPass::new(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    let relevant: Vec<&str> = commands
        .iter()
        .map(String::as_str)
        .filter(|c| c.starts_with("bind_pipeline") || c.starts_with("draw_indexed"))
        .collect();
    assert_eq!(relevant, vec![
        "bind_pipeline:gbuffer",
        "draw_indexed:6",
        "bind_pipeline:gbuffer_alpha",
        "draw_indexed:3",
    ]);
}

#[test]
fn test_binding_group_holds_scene_textures() {
    let mut fixture = PassFixture::new();
    let pass = GBufferPass::new(&mut fixture.ctx()).unwrap();

    let group = PassFixture::bound_groups(&fixture.record(&pass, 0))[0];
    let scene_ids: Vec<u64> = fixture.scene.textures().iter().map(|t| t.id()).collect();
    assert_eq!(fixture.group_textures(group), scene_ids);
}

#[test]
fn test_resize_republishes_every_target() {
    let mut fixture = PassFixture::new();
    let mut pass = GBufferPass::new(&mut fixture.ctx()).unwrap();
    let old: Vec<u64> = COLOR_TARGETS.iter().map(|(name, _)| fixture.target(name).id()).collect();

    fixture.resize_swapchain(1024, 768);
    pass.resize(&mut fixture.ctx()).unwrap();

    for ((name, _), old_id) in COLOR_TARGETS.iter().zip(old) {
        let target = fixture.target(name);
        assert_eq!(target.info().width, 1024);
        assert!(!fixture.renderer.is_texture_live(old_id));
    }
    let commands = fixture.record(&pass, 0);
    assert!(commands.contains(&"begin_render_pass:1024x768".to_string()));
}
