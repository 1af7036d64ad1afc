/// Pipeline trait and pipeline descriptor

use std::sync::Arc;
use crate::renderer::{
    Shader, ShaderStageFlags, TextureFormat, RenderPass, BindingGroupLayoutDesc,
};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

// ===== VERTEX INPUT =====

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    pub binding: u32,
    pub format: TextureFormat,
    /// Byte offset inside the vertex
    pub offset: u32,
}

/// Vertex buffer binding (per-vertex rate only)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBinding {
    pub binding: u32,
    pub stride: u32,
}

/// Vertex input layout; empty for full-screen triangles generated in the shader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// Push constant range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

// ===== RASTERIZATION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            polygon_mode: PolygonMode::Fill,
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
        }
    }
}

// ===== DEPTH =====

/// Comparison operator for depth tests and compare samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Depth testing state (stencil is never used)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub test_enable: bool,
    pub write_enable: bool,
    pub compare_op: CompareOp,
}

impl DepthState {
    pub const DISABLED: Self = Self {
        test_enable: false,
        write_enable: false,
        compare_op: CompareOp::LessOrEqual,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enable: true,
            write_enable: true,
            compare_op: CompareOp::LessOrEqual,
        }
    }
}

// ===== COLOR BLEND =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Per-attachment color blend state (all channels written)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
}

impl ColorBlendState {
    /// Blending disabled, source replaces destination
    pub const REPLACE: Self = Self {
        blend_enable: false,
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::Zero,
        color_blend_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::Zero,
        alpha_blend_op: BlendOp::Add,
    };

    /// color = src + dst, alpha = src (overdraw / overshading counters)
    pub const ADDITIVE: Self = Self {
        blend_enable: true,
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::One,
        color_blend_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::Zero,
        alpha_blend_op: BlendOp::Add,
    };
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self::REPLACE
    }
}

// ===== PIPELINE DESCRIPTOR =====

/// Descriptor for creating a graphics pipeline
///
/// Viewport and scissor are always dynamic.
#[derive(Clone)]
pub struct PipelineDesc {
    /// Debug name
    pub name: String,
    /// One module per stage
    pub shaders: Vec<Arc<dyn Shader>>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub depth: DepthState,
    /// One blend state per color attachment of `render_pass`
    pub color_blends: Vec<ColorBlendState>,
    /// Binding group layouts, indexed by set number
    pub binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    /// Render pass the pipeline is compatible with
    pub render_pass: Arc<dyn RenderPass>,
}

/// Pipeline resource trait
///
/// Owns the pipeline object, its layout and its binding group layouts.
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Layouts the pipeline was built with, indexed by set number
    fn binding_group_layouts(&self) -> &[BindingGroupLayoutDesc];

    /// Union of the stages of every push constant range
    fn push_constant_stages(&self) -> ShaderStageFlags;
}
