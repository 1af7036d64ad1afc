/// Tests for the mesh density pass

use super::*;
use crate::passes::test_support::PassFixture;
use crate::passes::DepthPrepass;

#[test]
fn test_loads_prepass_depth_read_only() {
    let desc = mesh_density_render_pass(TextureFormat::B8G8R8A8_SRGB).desc().unwrap();
    let depth = desc.depth_attachment.unwrap();
    assert_eq!(depth.load_op, LoadOp::Load);
    assert_eq!(depth.store_op, StoreOp::None);
    assert_eq!(depth.initial_layout, ImageLayout::DepthStencilReadOnly);
    assert_eq!(depth.final_layout, ImageLayout::DepthStencilAttachment);
}

#[test]
fn test_requires_depth_prepass() {
    let mut fixture = PassFixture::new();
    let result = MeshDensityPass::new(&mut fixture.ctx());
    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains(target_names::PREPASS_DEPTH)));
}

#[test]
fn test_draws_every_mesh_with_one_pipeline() {
    let mut fixture = PassFixture::new();
    let _prepass = DepthPrepass::new(&mut fixture.ctx()).unwrap();
    let pass = MeshDensityPass::new(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    let pipelines: Vec<&str> = commands.iter().filter_map(|c| c.strip_prefix("bind_pipeline:")).collect();
    assert_eq!(pipelines, vec!["mesh_density"]);
    assert_eq!(commands.iter().filter(|c| c.starts_with("draw_indexed")).count(), 2);

    let state = fixture.renderer.state.lock().unwrap();
    assert!(state.created_shaders.iter().any(|s| s == "mesh_density.geom.spv"));
}

#[test]
fn test_resize_follows_prepass() {
    let mut fixture = PassFixture::new();
    let mut prepass = DepthPrepass::new(&mut fixture.ctx()).unwrap();
    let mut pass = MeshDensityPass::new(&mut fixture.ctx()).unwrap();

    fixture.resize_swapchain(500, 400);
    prepass.resize(&mut fixture.ctx()).unwrap();
    pass.resize(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 1);
    assert!(commands.contains(&"begin_render_pass:500x400".to_string()));
    assert_eq!(fixture.target(target_names::MESH_DENSITY).info().width, 500);
}

#[test]
fn test_resize_before_prepass_is_rejected() {
    let mut fixture = PassFixture::new();
    let _prepass = DepthPrepass::new(&mut fixture.ctx()).unwrap();
    let mut pass = MeshDensityPass::new(&mut fixture.ctx()).unwrap();

    fixture.resize_swapchain(500, 400);
    assert!(pass.resize(&mut fixture.ctx()).is_err());
}
