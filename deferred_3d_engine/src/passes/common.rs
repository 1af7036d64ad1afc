/// Helpers shared by the passes: owned targets, per-slot binding groups,
/// full-screen and mesh pipeline bases, and render pass recording.

use std::sync::Arc;
use crate::builder::{PipelineBuilder, RenderPassBuilder};
use crate::error::{Error, Result};
use crate::renderer::{
    AccessFlags, BindingGroup, BindingGroupLayoutDesc, BindingResource, Buffer, BufferDesc,
    ClearValue, CommandList, CompareOp, CullMode, DependencyFlags, Framebuffer, FramebufferDesc,
    FrontFace, ImageLayout, LoadOp, Pipeline, PipelineStages, PolygonMode, Rect2D, RenderPass,
    Renderer, ShaderStage, ShaderStageFlags, StoreOp, SubpassDependency, SubpassRef, Texture,
    TextureDesc, TextureFormat, Viewport, MAX_FRAMES_IN_FLIGHT,
};
use crate::resource::Vertex;
use crate::scene::MeshPushConstants;
use crate::target::{RenderTargetKey, RenderTargetRegistry};
use crate::{engine_debug, engine_error};
use super::PassContext;

/// Registry names of every render target
pub mod target_names {
    pub const SHADOW_MAP: &str = "shadow_map";
    pub const PREPASS_DEPTH: &str = "prepass_depth";
    pub const GBUFFER_ALBEDO: &str = "gbuffer_albedo";
    pub const GBUFFER_NORMAL: &str = "gbuffer_normal";
    pub const GBUFFER_EMISSIVE: &str = "gbuffer_emissive";
    pub const GBUFFER_METAL_ROUGHNESS: &str = "gbuffer_metal_roughness";
    pub const GBUFFER_DEPTH: &str = "gbuffer_depth";
    pub const LIT: &str = "lit";
    pub const BRIGHTNESS: &str = "brightness";
    pub const SSAO: &str = "ssao";
    pub const SSR: &str = "ssr";
    pub const BLOOM_BLUR_X: &str = "bloom_blur_x";
    pub const BLOOM_BLUR_Y: &str = "bloom_blur_y";
    pub const COMPOSITE: &str = "composite";
    pub const FORWARD_COLOR: &str = "forward_color";
    pub const FORWARD_DEPTH: &str = "forward_depth";
    pub const MESH_DENSITY: &str = "mesh_density";
}

/// Vertex shader of every full-screen pass (one oversized triangle)
pub(crate) const FULLSCREEN_VERTEX_SHADER: &str = "fs_tri.vert.spv";

// ===== TARGETS =====

/// A render target a pass writes and publishes
#[derive(Debug, Clone, Copy)]
pub(crate) struct OwnedTarget {
    pub key: RenderTargetKey,
    pub name: &'static str,
    pub format: TextureFormat,
}

impl OwnedTarget {
    /// Create the texture and register it under `name`
    pub fn create(
        ctx: &mut PassContext,
        owner: &str,
        name: &'static str,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let texture = ctx.renderer.create_texture(TextureDesc::render_target(name, width, height, format))?;
        let key = ctx.registry.register(owner, name, texture)?;
        Ok(Self { key, name, format })
    }

    /// Replace the texture with a new one of the given extent
    pub fn recreate(&self, ctx: &mut PassContext, owner: &str, width: u32, height: u32) -> Result<()> {
        let texture = ctx.renderer.create_texture(TextureDesc::render_target(self.name, width, height, self.format))?;
        ctx.registry.publish(owner, self.key, texture)
    }

    pub fn texture(&self, registry: &RenderTargetRegistry) -> Result<Arc<dyn Texture>> {
        registry.get(self.key)
    }
}

/// Key of a target produced by an earlier pass
pub(crate) fn input_key(registry: &RenderTargetRegistry, consumer: &str, name: &str) -> Result<RenderTargetKey> {
    registry.key_by_name(name).ok_or_else(|| {
        let message = format!("{} reads '{}', which no earlier pass registered", consumer, name);
        engine_error!("deferred3d::Pass", "{}", message);
        Error::InvalidResource(message)
    })
}

/// Framebuffer sized after its first attachment
pub(crate) fn create_framebuffer(
    renderer: &mut dyn Renderer,
    render_pass: &Arc<dyn RenderPass>,
    attachments: Vec<Arc<dyn Texture>>,
) -> Result<Arc<dyn Framebuffer>> {
    let (width, height) = match attachments.first() {
        Some(texture) => (texture.info().width, texture.info().height),
        None => return Err(Error::InvalidResource("framebuffer without attachments".to_string())),
    };
    renderer.create_framebuffer(&FramebufferDesc { render_pass, attachments, width, height })
}

/// One uniform buffer per frame slot
pub(crate) fn slot_uniforms(renderer: &mut dyn Renderer, name: &str, size: u64) -> Result<Vec<Arc<dyn Buffer>>> {
    (0..MAX_FRAMES_IN_FLIGHT)
        .map(|slot| renderer.create_buffer(BufferDesc::uniform(format!("{}_{}", name, slot), size)))
        .collect()
}

// ===== BINDING GROUPS =====

/// One binding group per frame slot for a single set of a pipeline
///
/// The first write allocates the groups; later writes (after a resize)
/// rewrite them in place.
pub(crate) struct SlotBindings {
    set_index: u32,
    groups: Vec<Arc<dyn BindingGroup>>,
}

impl SlotBindings {
    pub fn new(set_index: u32) -> Self {
        Self { set_index, groups: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT) }
    }

    /// Write the resources of `frame_slot`, allocating its group if needed
    pub fn write(
        &mut self,
        renderer: &mut dyn Renderer,
        pipeline: &Arc<dyn Pipeline>,
        frame_slot: usize,
        resources: &[BindingResource],
    ) -> Result<()> {
        if let Some(group) = self.groups.get(frame_slot) {
            return renderer.update_binding_group(group, resources);
        }
        if frame_slot != self.groups.len() {
            return Err(Error::InvalidResource(format!(
                "binding groups must be allocated in slot order (slot {} of {})",
                frame_slot, self.groups.len()
            )));
        }
        let group = renderer.create_binding_group(pipeline, self.set_index, resources)?;
        self.groups.push(group);
        Ok(())
    }

    pub fn get(&self, frame_slot: usize) -> Result<&Arc<dyn BindingGroup>> {
        self.groups
            .get(frame_slot)
            .ok_or_else(|| Error::InvalidResource(format!("no binding group for frame slot {}", frame_slot)))
    }
}

// ===== RENDER PASS / PIPELINE BASES =====

/// Colour dependencies of a pass whose outputs are sampled downstream
pub(crate) fn fullscreen_color_dependencies() -> [SubpassDependency; 2] {
    [
        SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::FRAGMENT_SHADER,
            src_access: AccessFlags::SHADER_READ,
            dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            flags: DependencyFlags::BY_REGION,
        },
        SubpassDependency {
            src_subpass: SubpassRef::Index(0),
            dst_subpass: SubpassRef::External,
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            dst_access: AccessFlags::SHADER_READ,
            flags: DependencyFlags::BY_REGION,
        },
    ]
}

/// Colour dependencies of mesh passes (write-after-write on entry)
pub(crate) fn mesh_color_dependencies() -> [SubpassDependency; 2] {
    [
        SubpassDependency {
            src_subpass: SubpassRef::External,
            dst_subpass: SubpassRef::Index(0),
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::empty(),
            dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            flags: DependencyFlags::BY_REGION,
        },
        SubpassDependency {
            src_subpass: SubpassRef::Index(0),
            dst_subpass: SubpassRef::External,
            src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            dst_access: AccessFlags::SHADER_READ,
            flags: DependencyFlags::BY_REGION,
        },
    ]
}

/// Render pass writing sampled colour targets, cleared on load
pub(crate) fn fullscreen_render_pass(name: &str, formats: &[TextureFormat]) -> RenderPassBuilder {
    formats
        .iter()
        .fold(RenderPassBuilder::new(name), |builder, &format| {
            builder.add_attachment(
                format, 1, LoadOp::Clear, StoreOp::Store,
                ImageLayout::Undefined, ImageLayout::ShaderReadOnly,
            )
        })
        .add_dependencies(fullscreen_color_dependencies())
}

/// Full-screen triangle pipeline: no vertex input, no culling, no depth,
/// one opaque blend state per colour attachment
pub(crate) fn fullscreen_pipeline(
    name: &str,
    fragment: &str,
    render_pass: &Arc<dyn RenderPass>,
    layout: BindingGroupLayoutDesc,
) -> PipelineBuilder {
    (0..render_pass.color_attachment_count())
        .fold(PipelineBuilder::new(name), |builder, _| builder.add_default_blend_attachment())
        .add_shader(ShaderStage::Vertex, FULLSCREEN_VERTEX_SHADER)
        .add_shader(ShaderStage::Fragment, fragment)
        .rasterization(PolygonMode::Fill, CullMode::None, FrontFace::CounterClockwise)
        .depth_state(false, false, CompareOp::Always)
        .binding_group_layout(layout)
        .render_pass(render_pass)
}

/// Mesh pipeline: baked vertex layout, mesh push constants, back-face
/// culling, depth test and write, one opaque blend state per colour attachment
pub(crate) fn mesh_pipeline(
    name: &str,
    vertex: &str,
    render_pass: &Arc<dyn RenderPass>,
    layout: BindingGroupLayoutDesc,
) -> PipelineBuilder {
    (0..render_pass.color_attachment_count())
        .fold(PipelineBuilder::new(name), |builder, _| builder.add_default_blend_attachment())
        .add_shader(ShaderStage::Vertex, vertex)
        .vertex_layout(Vertex::layout())
        .push_constant_range(ShaderStageFlags::ALL_GRAPHICS, MeshPushConstants::SIZE)
        .rasterization(PolygonMode::Fill, CullMode::Back, FrontFace::CounterClockwise)
        .depth_state(true, true, CompareOp::LessOrEqual)
        .binding_group_layout(layout)
        .render_pass(render_pass)
}

// ===== RECORDING =====

/// Open a labelled render pass with a viewport covering the framebuffer
pub(crate) fn begin_pass(
    cmd: &mut dyn CommandList,
    label: &str,
    render_pass: &Arc<dyn RenderPass>,
    framebuffer: &Arc<dyn Framebuffer>,
    clear_values: &[ClearValue],
) -> Result<()> {
    cmd.begin_label(label);
    cmd.begin_render_pass(render_pass, framebuffer, clear_values)?;
    cmd.set_viewport(Viewport::full(framebuffer.width(), framebuffer.height()))?;
    cmd.set_scissor(Rect2D::full(framebuffer.width(), framebuffer.height()))
}

pub(crate) fn end_pass(cmd: &mut dyn CommandList) -> Result<()> {
    cmd.end_render_pass()?;
    cmd.end_label();
    Ok(())
}

/// Bind and draw the full-screen triangle
pub(crate) fn draw_fullscreen(
    cmd: &mut dyn CommandList,
    pipeline: &Arc<dyn Pipeline>,
    group: &Arc<dyn BindingGroup>,
) -> Result<()> {
    cmd.bind_pipeline(pipeline)?;
    cmd.bind_binding_group(pipeline, group)?;
    cmd.draw(3, 0)
}

pub(crate) fn log_resized(pass: &str, width: u32, height: u32) {
    engine_debug!("deferred3d::Pass", "{} resized to {}x{}", pass, width, height);
}
