/// Tests for the shadow map pass

use super::*;
use crate::passes::test_support::PassFixture;

#[test]
fn test_target_has_fixed_size() {
    let mut fixture = PassFixture::new();
    let _pass = ShadowMapPass::new(&mut fixture.ctx()).unwrap();

    let target = fixture.target(target_names::SHADOW_MAP);
    assert_eq!(target.info().width, 256);
    assert_eq!(target.info().height, 256);
    assert_eq!(target.info().format, TextureFormat::D32_SFLOAT);
}

#[test]
fn test_draws_front_then_back() {
    let mut fixture = PassFixture::new();
    let pass = ShadowMapPass::new(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    let draws: Vec<&String> = commands.iter().filter(|c| c.starts_with("draw")).collect();
    assert_eq!(draws, vec!["draw_indexed:6", "draw_indexed:3"]);
    assert_eq!(commands[0], "begin_label:ShadowMap");
    assert_eq!(commands[1], "begin_render_pass:256x256");
    assert_eq!(commands.last().unwrap(), "end_label");
}

#[test]
fn test_resize_keeps_size_and_replaces_texture() {
    let mut fixture = PassFixture::new();
    let mut pass = ShadowMapPass::new(&mut fixture.ctx()).unwrap();
    let old_id = fixture.target(target_names::SHADOW_MAP).id();

    fixture.resize_swapchain(640, 480);
    pass.resize(&mut fixture.ctx()).unwrap();

    let target = fixture.target(target_names::SHADOW_MAP);
    assert_ne!(target.id(), old_id);
    assert_eq!(target.info().width, 256);
    assert!(!fixture.renderer.is_texture_live(old_id));
    assert!(fixture.record(&pass, 1).contains(&"begin_render_pass:256x256".to_string()));
}

#[test]
fn test_pipeline_shaders() {
    let mut fixture = PassFixture::new();
    let _pass = ShadowMapPass::new(&mut fixture.ctx()).unwrap();
    let state = fixture.renderer.state.lock().unwrap();
    assert_eq!(state.created_pipelines, vec!["shadow_map"]);
    assert_eq!(state.created_shaders, vec!["shadow_map.vert.spv", "shadow_map.frag.spv"]);
}

#[test]
fn test_one_binding_group_per_slot() {
    let mut fixture = PassFixture::new();
    let pass = ShadowMapPass::new(&mut fixture.ctx()).unwrap();
    let first = PassFixture::bound_groups(&fixture.record(&pass, 0));
    let second = PassFixture::bound_groups(&fixture.record(&pass, 1));
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_ne!(first, second);
}
