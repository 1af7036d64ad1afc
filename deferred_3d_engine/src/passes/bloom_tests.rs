/// Tests for the bloom pass

use super::*;
use crate::passes::test_support::PassFixture;
use crate::passes::GAUSSIAN_TAPS;

#[test]
fn test_horizontal_then_vertical() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let pass = BloomPass::new(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    let labels: Vec<&str> = commands.iter().filter_map(|c| c.strip_prefix("begin_label:")).collect();
    assert_eq!(labels, vec![HORIZONTAL_LABEL, VERTICAL_LABEL]);
    let pipelines: Vec<&str> = commands.iter().filter_map(|c| c.strip_prefix("bind_pipeline:")).collect();
    assert_eq!(pipelines, vec!["bloom_blur_x", "bloom_blur_y"]);
    assert_eq!(commands.iter().filter(|c| *c == "draw:3").count(), 2);
}

#[test]
fn test_vertical_reads_horizontal_result() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let pass = BloomPass::new(&mut fixture.ctx()).unwrap();

    let groups = PassFixture::bound_groups(&fixture.record(&pass, 1));
    assert_eq!(fixture.group_textures(groups[0]), vec![fixture.target(target_names::BRIGHTNESS).id()]);
    assert_eq!(fixture.group_textures(groups[1]), vec![fixture.target(target_names::BLOOM_BLUR_X).id()]);
}

#[test]
fn test_weights_uploaded_to_every_slot() {
    let mut fixture = PassFixture::new();
    let _chain = fixture.lighting_chain();
    let pass = BloomPass::new(&mut fixture.ctx()).unwrap();

    let expected = GaussianWeights::new(9.0, 43).unwrap();
    for buffer in &pass.weights {
        let block: GaussianWeights = bytemuck::pod_read_unaligned(&PassFixture::buffer_contents(buffer));
        assert_eq!(block, expected);
        assert_eq!(block.offsets[0], 0.0);
        assert!(block.weights[GAUSSIAN_TAPS - 1] > 0.0);
    }
}

#[test]
fn test_resize_keeps_chain_consistent() {
    let mut fixture = PassFixture::new();
    let mut chain = fixture.lighting_chain();
    let mut pass = BloomPass::new(&mut fixture.ctx()).unwrap();

    fixture.resize_swapchain(200, 100);
    for producer in chain.iter_mut() {
        producer.resize(&mut fixture.ctx()).unwrap();
    }
    pass.resize(&mut fixture.ctx()).unwrap();

    let commands = fixture.record(&pass, 0);
    assert_eq!(commands.iter().filter(|c| *c == "begin_render_pass:200x100").count(), 2);
    let groups = PassFixture::bound_groups(&commands);
    assert_eq!(fixture.group_textures(groups[1]), vec![fixture.target(target_names::BLOOM_BLUR_X).id()]);
    assert!(fixture.all_group_textures_live());
}
