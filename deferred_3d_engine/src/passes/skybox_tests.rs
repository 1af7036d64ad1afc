/// Tests for the skybox

use super::*;
use crate::passes::forward::forward_render_pass;
use crate::passes::test_support::PassFixture;
use crate::renderer::{Renderer, Swapchain};
use crate::scene::StubTextureLoader;

fn build(fixture: &mut PassFixture) -> Result<Skybox> {
    let render_pass = forward_render_pass(fixture.swapchain.format()).build(&mut fixture.renderer)?;
    Skybox::new(&mut fixture.ctx(), &render_pass)
}

#[test]
fn test_cubemap_has_six_cube_compatible_layers() {
    let mut fixture = PassFixture::new();
    let skybox = build(&mut fixture).unwrap();

    let info = skybox.cubemap().info();
    assert_eq!(info.array_layers, 6);
    assert!(info.cube_compatible);
    assert_eq!((info.width, info.height), (4, 4));
    assert_eq!(info.format, TextureFormat::R8G8B8A8_SRGB);
}

#[test]
fn test_face_size_mismatch_is_an_asset_error() {
    let mut fixture = PassFixture::new();
    fixture.loader = StubTextureLoader { size: 8 };

    let result = build(&mut fixture);
    assert!(matches!(result, Err(Error::AssetError(msg)) if msg.contains("8x8")));
}

#[test]
fn test_records_one_cube_draw() {
    let mut fixture = PassFixture::new();
    let skybox = build(&mut fixture).unwrap();

    let mut cmd = fixture.renderer.create_command_list().unwrap();
    fixture.renderer.clear_commands();
    skybox.record(cmd.as_mut(), &fixture.frame(1)).unwrap();

    let commands = fixture.renderer.commands();
    assert_eq!(commands.first().map(String::as_str), Some("begin_label:Skybox"));
    assert!(commands.contains(&"bind_pipeline:skybox".to_string()));
    assert!(commands.contains(&"bind_vertex_buffer:432".to_string()));
    assert!(commands.contains(&format!("draw:{}", SKYBOX_VERTEX_COUNT)));
    assert_eq!(SKYBOX_VERTEX_COUNT, 36);
}

#[test]
fn test_group_per_slot_uses_that_slots_camera() {
    let mut fixture = PassFixture::new();
    let skybox = build(&mut fixture).unwrap();

    for slot in 0..MAX_FRAMES_IN_FLIGHT {
        let group = skybox.bindings.get(slot).unwrap();
        let id = {
            let mut cmd = fixture.renderer.create_command_list().unwrap();
            fixture.renderer.clear_commands();
            cmd.bind_binding_group(&skybox.pipeline, group).unwrap();
            PassFixture::bound_groups(&fixture.renderer.commands())[0]
        };
        assert_eq!(fixture.group_buffers(id), vec![PassFixture::buffer_id(fixture.camera.uniform_buffer(slot))]);
        assert_eq!(fixture.group_textures(id), vec![skybox.cubemap().id()]);
    }
}
