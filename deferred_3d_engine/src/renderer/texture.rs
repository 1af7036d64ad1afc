/// Texture trait, texture descriptor, and texture info

use std::sync::atomic::{AtomicU64, Ordering};
use bitflags::bitflags;

/// Texture and vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    // Color formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    A2R10G10B10_UNORM_PACK32,
    R16G16B16A16_SFLOAT,

    // Depth formats
    D32_SFLOAT,

    // Vertex attribute formats
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R8G8B8_UINT,
}

impl TextureFormat {
    /// True for depth formats (selects the depth aspect and depth attachment slot)
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_SFLOAT)
    }

    /// Size of one texel (or vertex attribute) in bytes
    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::R8_UNORM => 1,
            TextureFormat::R8G8_UNORM => 2,
            TextureFormat::R8G8B8_UINT => 3,
            TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::A2R10G10B10_UNORM_PACK32
            | TextureFormat::D32_SFLOAT => 4,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::R32G32_SFLOAT => 8,
            TextureFormat::R32G32B32_SFLOAT => 12,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 0x01;
        const COLOR_ATTACHMENT = 0x02;
        const DEPTH_STENCIL_ATTACHMENT = 0x04;
        const TRANSFER_SRC = 0x08;
        const TRANSFER_DST = 0x10;
        const STORAGE = 0x20;
    }
}

impl TextureUsage {
    /// Color render target that later passes sample
    pub const SAMPLED_COLOR_TARGET: Self = Self::SAMPLED.union(Self::COLOR_ATTACHMENT);
    /// Depth render target that later passes sample
    pub const SAMPLED_DEPTH_TARGET: Self = Self::SAMPLED.union(Self::DEPTH_STENCIL_ATTACHMENT);

    /// True if the texture can be bound as a framebuffer attachment
    pub fn is_attachment(&self) -> bool {
        self.intersects(Self::COLOR_ATTACHMENT | Self::DEPTH_STENCIL_ATTACHMENT)
    }
}

// ===== TEXTURE DATA =====

/// Initial pixel data
#[derive(Debug, Clone)]
pub enum TextureData {
    /// Single image (layer 0)
    Single(Vec<u8>),
    /// One tightly packed image per array layer, in layer order
    Layers(Vec<Vec<u8>>),
}

// ===== TEXTURE DESC =====

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// Number of array layers (6 for a cubemap)
    pub array_layers: u32,
    /// Number of mip levels; levels past 0 are generated by blitting
    pub mip_levels: u32,
    /// Create as a cube-compatible image with a cube view
    pub cube_compatible: bool,
    /// Optional initial data
    pub data: Option<TextureData>,
}

impl TextureDesc {
    /// Single-layer, single-mip render target without initial data
    pub fn render_target(
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        let usage = if format.is_depth() {
            TextureUsage::SAMPLED_DEPTH_TARGET
        } else {
            TextureUsage::SAMPLED_COLOR_TARGET | TextureUsage::TRANSFER_SRC
        };
        Self {
            name: name.into(),
            width,
            height,
            format,
            usage,
            array_layers: 1,
            mip_levels: 1,
            cube_compatible: false,
            data: None,
        }
    }
}

/// Number of mip levels for a full chain down to 1×1
pub fn full_mip_chain(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique texture id (backends call this once per texture)
pub fn next_texture_id() -> u64 {
    NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)
}

// ===== TEXTURE INFO =====

/// Read-only properties of a created texture
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub cube_compatible: bool,
}

impl TextureInfo {
    pub fn from_desc(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            array_layers: desc.array_layers,
            mip_levels: desc.mip_levels,
            cube_compatible: desc.cube_compatible,
        }
    }
}

// ===== TEXTURE TRAIT =====

/// Texture resource trait
///
/// Backend textures own their image, memory and view, and destroy them on drop.
/// Swapchain images are exposed through the same trait but are not owned.
pub trait Texture: Send + Sync {
    fn info(&self) -> &TextureInfo;

    /// Process-unique identifier, stable for the lifetime of the texture
    fn id(&self) -> u64;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
