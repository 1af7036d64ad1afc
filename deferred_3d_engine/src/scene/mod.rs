//! Scene module - uploaded models, mesh partitions and lights.

mod scene;
mod light;
mod texture_loader;

pub use scene::{Scene, MeshPushConstants, partition_meshes, MAX_SCENE_TEXTURES};
pub use light::{Light, LightType, GpuLight, LightBuffer, NUM_LIGHTS, default_light_rig};
pub use texture_loader::{TextureLoader, ImageFileLoader, LoadedImage};
#[cfg(test)]
pub use texture_loader::StubTextureLoader;
