/// Tests for the composite pass

use super::*;
use crate::passes::test_support::PassFixture;
use crate::passes::{BloomPass, SsaoPass, SsrPass};

fn post_process_of(pass: &DefCompositePass, slot: usize) -> u32 {
    let settings: CompositeSettings = bytemuck::pod_read_unaligned(&PassFixture::buffer_contents(&pass.settings[slot]));
    settings.post_process
}

/// Lighting chain plus the screen-space effects the composite reads
fn deferred_chain(fixture: &mut PassFixture) -> Vec<Box<dyn Pass>> {
    let mut chain = fixture.lighting_chain();
    chain.push(Box::new(SsaoPass::new(&mut fixture.ctx()).unwrap()));
    chain.push(Box::new(SsrPass::new(&mut fixture.ctx()).unwrap()));
    chain.push(Box::new(BloomPass::new(&mut fixture.ctx()).unwrap()));
    chain
}

#[test]
fn test_settings_block_layout() {
    assert_eq!(std::mem::size_of::<CompositeSettings>(), 16);
    assert_eq!(CompositeSettings::new(true).post_process, 1);
    assert_eq!(CompositeSettings::new(false).post_process, 0);
}

#[test]
fn test_samples_lit_bloom_ssr_ssao() {
    let mut fixture = PassFixture::new();
    let _chain = deferred_chain(&mut fixture);
    let pass = DefCompositePass::new(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    assert!(commands.contains(&"bind_pipeline:def_composite".to_string()));
    let group = PassFixture::bound_groups(&commands)[0];
    let expected: Vec<u64> = INPUTS.iter().map(|name| fixture.target(name).id()).collect();
    assert_eq!(fixture.group_textures(group), expected);
    assert_eq!(fixture.group_buffers(group), vec![PassFixture::buffer_id(&pass.settings[0])]);
}

#[test]
fn test_post_process_flag_follows_frame_settings() {
    let mut fixture = PassFixture::new();
    let _chain = deferred_chain(&mut fixture);
    let mut pass = DefCompositePass::new(&mut fixture.ctx()).unwrap();
    assert_eq!(post_process_of(&pass, 0), 1);

    fixture.settings.post_process = false;
    pass.update(&fixture.frame(0)).unwrap();

    assert_eq!(post_process_of(&pass, 0), 0);
    assert_eq!(post_process_of(&pass, 1), 1);
}

#[test]
fn test_requires_bloom() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let err = DefCompositePass::new(&mut fixture.ctx()).err().unwrap();
    assert!(err.to_string().contains(target_names::BLOOM_BLUR_Y));
}

#[test]
fn test_resize_repoints_inputs() {
    let mut fixture = PassFixture::new();
    let mut chain = deferred_chain(&mut fixture);
    let mut pass = DefCompositePass::new(&mut fixture.ctx()).unwrap();

    fixture.resize_swapchain(64, 48);
    for producer in chain.iter_mut() {
        producer.resize(&mut fixture.ctx()).unwrap();
    }
    pass.resize(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 1);
    assert!(commands.contains(&"begin_render_pass:64x48".to_string()));
    assert_eq!(fixture.target(target_names::COMPOSITE).info().width, 64);
    assert!(fixture.all_group_textures_live());
}
