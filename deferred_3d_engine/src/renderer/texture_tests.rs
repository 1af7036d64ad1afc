use super::*;

#[test]
fn test_depth_format_detection() {
    assert!(TextureFormat::D32_SFLOAT.is_depth());
    assert!(!TextureFormat::R16G16B16A16_SFLOAT.is_depth());
    assert!(!TextureFormat::A2R10G10B10_UNORM_PACK32.is_depth());
}

#[test]
fn test_bytes_per_texel() {
    assert_eq!(TextureFormat::R8G8B8A8_SRGB.bytes_per_texel(), 4);
    assert_eq!(TextureFormat::R8G8_UNORM.bytes_per_texel(), 2);
    assert_eq!(TextureFormat::R16G16B16A16_SFLOAT.bytes_per_texel(), 8);
    assert_eq!(TextureFormat::R32G32B32_SFLOAT.bytes_per_texel(), 12);
}

#[test]
fn test_render_target_desc_usage_follows_format() {
    let color = TextureDesc::render_target("lit", 800, 600, TextureFormat::R16G16B16A16_SFLOAT);
    assert!(color.usage.contains(TextureUsage::COLOR_ATTACHMENT));
    assert!(color.usage.contains(TextureUsage::SAMPLED));
    assert!(!color.usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT));

    let depth = TextureDesc::render_target("depth", 800, 600, TextureFormat::D32_SFLOAT);
    assert_eq!(depth.usage, TextureUsage::SAMPLED_DEPTH_TARGET);
    assert!(depth.usage.is_attachment());
    assert_eq!(depth.array_layers, 1);
    assert_eq!(depth.mip_levels, 1);
}

#[test]
fn test_full_mip_chain() {
    assert_eq!(full_mip_chain(1, 1), 1);
    assert_eq!(full_mip_chain(2, 1), 2);
    assert_eq!(full_mip_chain(1024, 512), 11);
    assert_eq!(full_mip_chain(1000, 3), 10);
}

#[test]
fn test_sampled_only_is_not_attachment() {
    assert!(!TextureUsage::SAMPLED.is_attachment());
    assert!(!(TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST).is_attachment());
}
