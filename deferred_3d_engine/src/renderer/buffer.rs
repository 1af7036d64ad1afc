/// Buffer trait and buffer descriptor

use crate::error::Result;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform buffer (camera, lights, per-effect settings)
    Uniform,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name (attached to the GPU object when validation is on)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn uniform(name: impl Into<String>, size: u64) -> Self {
        Self { name: name.into(), size, usage: BufferUsage::Uniform }
    }
}

/// Buffer resource trait
///
/// Host-visible; `update` writes through a persistent mapping.
/// The GPU buffer is destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Write `data` at `offset`
    ///
    /// # Errors
    ///
    /// Fails if `offset + data.len()` exceeds the buffer size.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;
}
