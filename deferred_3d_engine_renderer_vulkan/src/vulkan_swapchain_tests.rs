/// Tests for swapchain parameter selection (no GPU)

use super::*;

fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR { format, color_space }
}

fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
        min_image_extent: vk::Extent2D { width: 16, height: 16 },
        max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
        ..Default::default()
    }
}

#[test]
fn test_prefers_srgb_bgra() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
    ];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
}

#[test]
fn test_falls_back_to_first_format() {
    let formats = [surface_format(vk::Format::A2R10G10B10_UNORM_PACK32, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::A2R10G10B10_UNORM_PACK32);
    assert!(choose_surface_format(&[]).is_none());
}

#[test]
fn test_extent_clamped_to_surface_limits() {
    let caps = capabilities(2, 3);
    let extent = choose_extent(&caps, 8000, 4);
    assert_eq!((extent.width, extent.height), (4096, 16));
}

#[test]
fn test_fixed_surface_extent_wins() {
    let mut caps = capabilities(2, 3);
    caps.current_extent = vk::Extent2D { width: 1280, height: 720 };
    let extent = choose_extent(&caps, 640, 480);
    assert_eq!((extent.width, extent.height), (1280, 720));
}

#[test]
fn test_image_count() {
    assert_eq!(choose_image_count(&capabilities(2, 3)), 3);
    assert_eq!(choose_image_count(&capabilities(3, 3)), 3);
    // Zero means no upper limit
    assert_eq!(choose_image_count(&capabilities(2, 0)), 3);
}
