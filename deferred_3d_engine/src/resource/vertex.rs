//! Interleaved GPU vertex used by every mesh pipeline.

use glam::{Vec2, Vec3};
use crate::renderer::{TextureFormat, VertexAttribute, VertexBinding, VertexLayout};

/// Mesh vertex, 36 bytes
///
/// `tbn` holds the packed tangent-frame quaternion read by the shaders as
/// `uvec3` (R8G8B8_UINT); the fourth byte is padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
    pub tbn: [u8; 4],
}

impl Vertex {
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    pub fn new(position: Vec3, texcoord: Vec2, normal: Vec3, tbn: [u8; 3]) -> Self {
        Self {
            position: position.to_array(),
            texcoord: texcoord.to_array(),
            normal: normal.to_array(),
            tbn: [tbn[0], tbn[1], tbn[2], 0],
        }
    }

    /// Binding 0, locations 0..=3
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding { binding: 0, stride: Self::STRIDE }],
            attributes: vec![
                VertexAttribute { location: 0, binding: 0, format: TextureFormat::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, binding: 0, format: TextureFormat::R32G32_SFLOAT, offset: 12 },
                VertexAttribute { location: 2, binding: 0, format: TextureFormat::R32G32B32_SFLOAT, offset: 20 },
                VertexAttribute { location: 3, binding: 0, format: TextureFormat::R8G8B8_UINT, offset: 32 },
            ],
        }
    }
}
