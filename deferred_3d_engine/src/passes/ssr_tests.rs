/// Tests for the SSR pass

use super::*;
use crate::passes::test_support::PassFixture;

fn settings_of(pass: &SsrPass, slot: usize) -> SsrSettings {
    bytemuck::pod_read_unaligned(&PassFixture::buffer_contents(&pass.settings[slot]))
}

#[test]
fn test_default_settings_uploaded_to_every_slot() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let pass = SsrPass::new(&mut fixture.ctx()).unwrap();

    for slot in 0..MAX_FRAMES_IN_FLIGHT {
        let settings = settings_of(&pass, slot);
        assert_eq!(settings.max_steps, 20);
        assert_eq!(settings.binary_search_iterations, 1);
        assert_eq!(settings.max_distance, 1.0);
        assert_eq!(settings.thickness, 0.001);
        assert_eq!(settings.step_size, 0.001);
    }
}

#[test]
fn test_update_uses_frame_settings() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let mut pass = SsrPass::new(&mut fixture.ctx()).unwrap();

    fixture.settings.ssr = SsrSettings::new(64, 4, 5.0, 0.01, 0.05);
    pass.update(&fixture.frame(0)).unwrap();

    assert_eq!(settings_of(&pass, 0).max_steps, 64);
    assert_eq!(settings_of(&pass, 1).max_steps, 20);
}

#[test]
fn test_reads_lit_colour_and_gbuffer() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let pass = SsrPass::new(&mut fixture.ctx()).unwrap();

    let group = PassFixture::bound_groups(&fixture.record(&pass, 1))[0];
    let expected: Vec<u64> = INPUTS.iter().map(|(name, _)| fixture.target(name).id()).collect();
    assert_eq!(fixture.group_textures(group), expected);
    assert_eq!(fixture.target(target_names::SSR).info().format, TextureFormat::R16G16B16A16_SFLOAT);
}
