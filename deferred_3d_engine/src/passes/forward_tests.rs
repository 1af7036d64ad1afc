/// Tests for the forward pass

use super::*;
use crate::passes::test_support::{PassFixture, HEIGHT, WIDTH};
use crate::passes::ShadowMapPass;
use crate::renderer::Swapchain;

fn build(fixture: &mut PassFixture) -> (ShadowMapPass, ForwardPass) {
    let shadow = ShadowMapPass::new(&mut fixture.ctx()).unwrap();
    let forward = ForwardPass::new(&mut fixture.ctx()).unwrap();
    (shadow, forward)
}

fn bound_pipelines(commands: &[String]) -> Vec<&str> {
    commands.iter().filter_map(|c| c.strip_prefix("bind_pipeline:")).collect()
}

#[test]
fn test_targets_follow_swapchain() {
    let mut fixture = PassFixture::new();
    let _passes = build(&mut fixture);

    let color = fixture.target(target_names::FORWARD_COLOR);
    assert_eq!(color.info().format, fixture.swapchain.format());
    assert_eq!((color.info().width, color.info().height), (WIDTH, HEIGHT));
    assert_eq!(fixture.target(target_names::FORWARD_DEPTH).info().format, TextureFormat::D32_SFLOAT);
}

#[test]
fn test_render_pass_layouts_and_dependencies() {
    let desc = forward_render_pass(TextureFormat::B8G8R8A8_SRGB).desc().unwrap();
    assert_eq!(desc.color_attachments[0].final_layout, ImageLayout::ShaderReadOnly);
    let depth = desc.depth_attachment.unwrap();
    assert_eq!(depth.final_layout, ImageLayout::DepthStencilAttachment);
    assert_eq!(desc.dependencies.len(), 4);
    assert_eq!(desc.dependencies[1].dst_access, AccessFlags::SHADER_READ);
    assert!(desc.dependencies[2].dst_access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ));
}

#[test]
fn test_default_view_uses_alpha_masking_for_back_meshes() {
    let mut fixture = PassFixture::new();
    let (_shadow, pass) = build(&mut fixture);

    let commands = fixture.record(&pass, 0);
    assert_eq!(bound_pipelines(&commands), vec!["default", "alpha_masking", "skybox"]);
    let draws: Vec<&String> = commands.iter().filter(|c| c.starts_with("draw")).collect();
    assert_eq!(draws, vec!["draw_indexed:6", "draw_indexed:3", "draw:36"]);
    assert_eq!(commands[0], "begin_label:ForwardPass");
}

#[test]
fn test_debug_view_applies_to_both_mesh_sets() {
    let mut fixture = PassFixture::new();
    let (_shadow, pass) = build(&mut fixture);

    for view in [DebugView::LinearDepth, DebugView::MipLevel, DebugView::PartialDerivative, DebugView::Overdraw] {
        fixture.settings.debug_view = view;
        let commands = fixture.record(&pass, 1);
        let name = pipeline_name(view);
        assert_eq!(bound_pipelines(&commands), vec![name, name, "skybox"]);
    }
}

#[test]
fn test_builds_every_view_once() {
    let mut fixture = PassFixture::new();
    let (_shadow, pass) = build(&mut fixture);

    assert_eq!(pass.pipelines.len(), DebugView::ALL.len());
    let created = fixture.renderer.state.lock().unwrap().created_pipelines.clone();
    for name in ["default", "linearized_depth", "mipmap", "pd", "overshading", "overdraw", "alpha_masking", "skybox"] {
        assert_eq!(created.iter().filter(|p| *p == name).count(), 1, "{}", name);
    }
}

#[test]
fn test_bindings_reference_shadow_map_and_lights() {
    let mut fixture = PassFixture::new();
    let (_shadow, pass) = build(&mut fixture);

    let group = PassFixture::bound_groups(&fixture.record(&pass, 1))[0];
    let mut expected: Vec<u64> = fixture.scene.textures().iter().map(|t| t.id()).collect();
    expected.push(fixture.target(target_names::SHADOW_MAP).id());
    assert_eq!(fixture.group_textures(group), expected);
    assert_eq!(fixture.group_buffers(group), vec![
        PassFixture::buffer_id(fixture.camera.uniform_buffer(1)),
        PassFixture::buffer_id(fixture.scene.light_buffer(1)),
    ]);
}

#[test]
fn test_requires_shadow_map() {
    let mut fixture = PassFixture::new();
    let result = ForwardPass::new(&mut fixture.ctx());
    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("shadow_map")));
}

#[test]
fn test_resize() {
    let mut fixture = PassFixture::new();
    let (mut shadow, mut pass) = build(&mut fixture);

    fixture.resize_swapchain(800, 600);
    shadow.resize(&mut fixture.ctx()).unwrap();
    pass.resize(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    assert!(commands.contains(&"begin_render_pass:800x600".to_string()));
    assert!(fixture.all_group_textures_live());
}
