/// Tests for RenderTargetRegistry

use super::*;
use crate::renderer::mock_renderer::MockRenderer;
use crate::renderer::{Renderer, TextureDesc, TextureFormat};

fn texture(renderer: &mut MockRenderer, name: &str, width: u32) -> Arc<dyn Texture> {
    renderer
        .create_texture(TextureDesc::render_target(name, width, 64, TextureFormat::R16G16B16A16_SFLOAT))
        .unwrap()
}

#[test]
fn test_register_and_get() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    let lit = texture(&mut renderer, "lit", 64);
    let key = registry.register("DeferredLighting", "lit", Arc::clone(&lit)).unwrap();

    assert_eq!(registry.get(key).unwrap().id(), lit.id());
    assert_eq!(registry.key_by_name("lit"), Some(key));
    assert_eq!(registry.generation(key), Some(0));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_duplicate_name_rejected() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    registry.register("A", "lit", texture(&mut renderer, "a", 64)).unwrap();
    assert!(registry.register("B", "lit", texture(&mut renderer, "b", 64)).is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_publish_bumps_generation_and_releases_old_texture() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    let key = registry.register("Bloom", "bloom_blur_x", texture(&mut renderer, "old", 64)).unwrap();
    let old_id = registry.get(key).unwrap().id();

    registry.publish("Bloom", key, texture(&mut renderer, "new", 128)).unwrap();

    assert_eq!(registry.generation(key), Some(1));
    assert_eq!(registry.get(key).unwrap().info().width, 128);
    assert!(!renderer.is_texture_live(old_id));
}

#[test]
fn test_publish_by_non_owner_rejected() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    let key = registry.register("GBuffer", "albedo", texture(&mut renderer, "albedo", 64)).unwrap();

    let result = registry.publish("DeferredLighting", key, texture(&mut renderer, "x", 64));
    assert!(result.is_err());
    assert_eq!(registry.generation(key), Some(0));
}

#[test]
fn test_removed_key_is_stale() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    let key = registry.register("SSAO", "ssao", texture(&mut renderer, "ssao", 64)).unwrap();

    assert!(registry.remove(key).is_some());
    assert!(registry.get(key).is_err());
    assert_eq!(registry.generation(key), None);
    assert_eq!(registry.key_by_name("ssao"), None);
    assert!(registry.is_empty());
}

#[test]
fn test_clear() {
    let mut renderer = MockRenderer::new();
    let mut registry = RenderTargetRegistry::new();
    registry.register("A", "a", texture(&mut renderer, "a", 64)).unwrap();
    registry.register("B", "b", texture(&mut renderer, "b", 64)).unwrap();
    registry.clear();
    assert_eq!(registry.len(), 0);
    assert!(registry.texture_ids().is_empty());
}
