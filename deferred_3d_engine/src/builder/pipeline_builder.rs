/// Fluent graphics pipeline builder
///
/// Collects shader file names and fixed-function state, then resolves the
/// shaders through a [`ShaderLibrary`] and creates the pipeline. The builder
/// is `Clone`, so a pass can configure a base once and derive variants from it
/// (the forward debug views differ only in fragment shader and blending).
///
/// ```ignore
/// let pipeline = PipelineBuilder::new("shadow_map")
///     .add_shader(ShaderStage::Vertex, "shadow.vert.spv")
///     .add_shader(ShaderStage::Fragment, "shadow.frag.spv")
///     .rasterization(PolygonMode::Fill, CullMode::Front, FrontFace::CounterClockwise)
///     .vertex_layout(Vertex::layout())
///     .binding_group_layout(layout)
///     .push_constant_range(ShaderStageFlags::ALL_GRAPHICS, MeshPushConstants::SIZE)
///     .render_pass(&render_pass)
///     .build(renderer, shaders)?;
/// ```

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::renderer::{
    BindingGroupLayoutDesc, ColorBlendState, CompareOp, CullMode, DepthState,
    FrontFace, Pipeline, PipelineDesc, PolygonMode, PrimitiveTopology, PushConstantRange,
    RasterizationState, RenderPass, Renderer, ShaderDesc, ShaderStage, ShaderStageFlags,
    VertexLayout,
};
use crate::{engine_debug, engine_error};
use super::ShaderLibrary;

/// Entry point of every shader module
pub const SHADER_ENTRY_POINT: &str = "main";

fn invalid(message: String) -> Error {
    engine_error!("deferred3d::PipelineBuilder", "{}", message);
    Error::InvalidResource(message)
}

#[derive(Clone)]
pub struct PipelineBuilder {
    name: String,
    shaders: Vec<(ShaderStage, String)>,
    vertex_layout: VertexLayout,
    topology: PrimitiveTopology,
    rasterization: RasterizationState,
    depth: DepthState,
    color_blends: Vec<ColorBlendState>,
    binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    push_constant_ranges: Vec<PushConstantRange>,
    render_pass: Option<Arc<dyn RenderPass>>,
}

impl PipelineBuilder {
    /// New builder: triangle list, fill, back-face culling, no depth test,
    /// no blend attachments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shaders: Vec::new(),
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            rasterization: RasterizationState::default(),
            depth: DepthState::DISABLED,
            color_blends: Vec::new(),
            binding_group_layouts: Vec::new(),
            push_constant_ranges: Vec::new(),
            render_pass: None,
        }
    }

    /// Rename (used when deriving variants from a shared base)
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a shader stage, replacing any shader already set for `stage`
    pub fn add_shader(mut self, stage: ShaderStage, file: impl Into<String>) -> Self {
        let file = file.into();
        match self.shaders.iter_mut().find(|(s, _)| *s == stage) {
            Some(entry) => entry.1 = file,
            None => self.shaders.push((stage, file)),
        }
        self
    }

    pub fn topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn rasterization(mut self, polygon_mode: PolygonMode, cull_mode: CullMode, front_face: FrontFace) -> Self {
        self.rasterization.polygon_mode = polygon_mode;
        self.rasterization.cull_mode = cull_mode;
        self.rasterization.front_face = front_face;
        self
    }

    /// Append the blend state of the next colour attachment
    pub fn add_blend_attachment(mut self, state: ColorBlendState) -> Self {
        self.color_blends.push(state);
        self
    }

    /// Append a blend state with blending disabled
    pub fn add_default_blend_attachment(self) -> Self {
        self.add_blend_attachment(ColorBlendState::REPLACE)
    }

    /// Replace every blend state with `state`, keeping the attachment count
    pub fn set_all_blend_attachments(mut self, state: ColorBlendState) -> Self {
        for blend in &mut self.color_blends {
            *blend = state;
        }
        self
    }

    pub fn depth_state(mut self, test_enable: bool, write_enable: bool, compare_op: CompareOp) -> Self {
        self.depth = DepthState { test_enable, write_enable, compare_op };
        self
    }

    /// Append the layout of the next set
    pub fn binding_group_layout(mut self, layout: BindingGroupLayoutDesc) -> Self {
        self.binding_group_layouts.push(layout);
        self
    }

    /// Push constant range starting at offset 0
    pub fn push_constant_range(mut self, stages: ShaderStageFlags, size: u32) -> Self {
        self.push_constant_ranges.push(PushConstantRange { stages, offset: 0, size });
        self
    }

    pub fn vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    pub fn render_pass(mut self, render_pass: &Arc<dyn RenderPass>) -> Self {
        self.render_pass = Some(Arc::clone(render_pass));
        self
    }

    /// Validate, load shaders, and create the pipeline
    ///
    /// Shader modules only live for the duration of this call.
    ///
    /// # Errors
    ///
    /// * `InvalidResource` - no shaders, no render pass, or a blend state
    ///   count different from the render pass colour-attachment count
    /// * `AssetError` - a shader binary is missing
    /// * Backend errors from shader or pipeline creation
    pub fn build(&self, renderer: &mut dyn Renderer, shaders: &ShaderLibrary) -> Result<Arc<dyn Pipeline>> {
        // ========== VALIDATION 1: At least one shader stage ==========
        if self.shaders.is_empty() {
            return Err(invalid(format!("Pipeline '{}' has no shader stages", self.name)));
        }
        if !self.shaders.iter().any(|(stage, _)| *stage == ShaderStage::Vertex) {
            return Err(invalid(format!("Pipeline '{}' has no vertex shader", self.name)));
        }

        // ========== VALIDATION 2: Render pass set ==========
        let Some(render_pass) = &self.render_pass else {
            return Err(invalid(format!("Pipeline '{}' has no render pass", self.name)));
        };

        // ========== VALIDATION 3: One blend state per colour attachment ==========
        let expected = render_pass.color_attachment_count();
        if self.color_blends.len() != expected {
            return Err(invalid(format!(
                "Pipeline '{}': {} blend attachments for {} colour attachments",
                self.name, self.color_blends.len(), expected
            )));
        }

        // ========== CREATE SHADER MODULES ==========
        let mut modules = Vec::with_capacity(self.shaders.len());
        for (stage, file) in &self.shaders {
            let code = shaders.load(file)?;
            modules.push(renderer.create_shader(ShaderDesc {
                name: file,
                stage: *stage,
                code: &code,
                entry_point: SHADER_ENTRY_POINT,
            })?);
        }

        let pipeline = renderer.create_pipeline(PipelineDesc {
            name: self.name.clone(),
            shaders: modules,
            vertex_layout: self.vertex_layout.clone(),
            topology: self.topology,
            rasterization: self.rasterization,
            depth: self.depth,
            color_blends: self.color_blends.clone(),
            binding_group_layouts: self.binding_group_layouts.clone(),
            push_constant_ranges: self.push_constant_ranges.clone(),
            render_pass: Arc::clone(render_pass),
        })?;

        engine_debug!("deferred3d::PipelineBuilder",
            "Created pipeline '{}' ({} stages, {} attachments)",
            self.name, self.shaders.len(), expected);
        Ok(pipeline)
    }
}

#[cfg(test)]
#[path = "pipeline_builder_tests.rs"]
mod tests;
