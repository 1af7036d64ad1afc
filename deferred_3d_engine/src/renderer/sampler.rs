/// Sampler presets shared by every pass
///
/// Samplers are created once by the backend and reused read-only; passes
/// refer to them by type only.

/// Predefined sampler configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    /// Trilinear, repeat addressing, 16x anisotropy (material textures)
    RepeatAniso,
    /// Trilinear, repeat addressing, no anisotropy
    Repeat,
    /// Clamp to edge with a GREATER depth compare (shadow map lookups)
    ClampToEdge,
    /// Bilinear, clamp to edge (full-screen render target reads)
    LinearClamp,
    /// Point filtering, clamp to edge (depth and noise reads)
    NearestClamp,
}

impl SamplerType {
    pub const ALL: [SamplerType; 5] = [
        SamplerType::RepeatAniso,
        SamplerType::Repeat,
        SamplerType::ClampToEdge,
        SamplerType::LinearClamp,
        SamplerType::NearestClamp,
    ];
}
