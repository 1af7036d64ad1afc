/// Tests for the SSAO pass

use super::*;
use crate::passes::test_support::PassFixture;
use crate::passes::GBufferPass;

fn settings_of(pass: &SsaoPass, slot: usize) -> SsaoSettings {
    bytemuck::pod_read_unaligned(&PassFixture::buffer_contents(&pass.settings[slot]))
}

#[test]
fn test_noise_is_deterministic_and_in_range() {
    let noise = generate_noise();
    assert_eq!(noise.len(), 16);
    assert_eq!(noise, generate_noise());
    for texel in noise {
        assert!((-1.0..1.0).contains(&texel.x));
        assert!((-1.0..1.0).contains(&texel.y));
        assert_eq!(texel.z, 0.0);
        assert_eq!(texel.w, 1.0);
    }
}

#[test]
fn test_bindings_reference_gbuffer_and_noise() {
    let mut fixture = PassFixture::new();
    let _gbuffer = GBufferPass::new(&mut fixture.ctx()).unwrap();
    let pass = SsaoPass::new(&mut fixture.ctx()).unwrap();

    let group = PassFixture::bound_groups(&fixture.record(&pass, 0))[0];
    assert_eq!(fixture.group_textures(group), vec![
        fixture.target(target_names::GBUFFER_DEPTH).id(),
        fixture.target(target_names::GBUFFER_NORMAL).id(),
        pass.noise.id(),
    ]);
    assert_eq!(pass.noise.info().format, TextureFormat::R32G32B32A32_SFLOAT);
}

#[test]
fn test_update_writes_time_into_own_slot_only() {
    let mut fixture = PassFixture::new();
    let _gbuffer = GBufferPass::new(&mut fixture.ctx()).unwrap();
    let mut pass = SsaoPass::new(&mut fixture.ctx()).unwrap();

    pass.update(&fixture.frame(1)).unwrap();

    assert_eq!(settings_of(&pass, 1).time, 1.5);
    assert_eq!(settings_of(&pass, 1).radius, fixture.config.ssao.radius);
    assert_eq!(settings_of(&pass, 0).time, 0.0);
}

#[test]
fn test_requires_gbuffer() {
    let mut fixture = PassFixture::new();
    assert!(SsaoPass::new(&mut fixture.ctx()).is_err());
}
