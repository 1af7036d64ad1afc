/// Shader trait and shader descriptor

use bitflags::bitflags;

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

bitflags! {
    /// Set of shader stages (binding visibility, push constant ranges)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const GEOMETRY = 0x08;
        const FRAGMENT = 0x10;
    }
}

impl ShaderStageFlags {
    pub const VERTEX_FRAGMENT: Self = Self::VERTEX.union(Self::FRAGMENT);
    /// Stages that read mesh push constants
    pub const ALL_GRAPHICS: Self = Self::VERTEX.union(Self::GEOMETRY).union(Self::FRAGMENT);
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Geometry => ShaderStageFlags::GEOMETRY,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }
}

/// Descriptor for creating a shader module
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    /// Debug name (usually the file name)
    pub name: &'a str,
    /// Stage the module is compiled for
    pub stage: ShaderStage,
    /// SPIR-V bytes
    pub code: &'a [u8],
    /// Entry point name
    pub entry_point: &'a str,
}

/// Shader module trait
///
/// Shader modules are transient: pipelines are built from them and they are
/// dropped immediately afterwards.
pub trait Shader: Send + Sync {
    fn stage(&self) -> ShaderStage;
}
