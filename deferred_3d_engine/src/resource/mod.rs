//! Asset-side data: the baked model format and the GPU vertex layout.

pub mod baked_model;
pub mod vertex;

pub use baked_model::{
    BakedModel, BakedMeshData, BakedMaterialInfo, BakedTextureInfo, TextureSpace,
    load_baked_model, read_baked_model, write_baked_model, NO_TEXTURE,
};
pub use vertex::Vertex;
