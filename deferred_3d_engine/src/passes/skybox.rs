/// Skybox
///
/// A unit cube sampled through a cubemap, drawn last inside the forward
/// render pass at the far plane. Not a pass of its own: it owns no target.

use std::sync::Arc;
use crate::builder::PipelineBuilder;
use crate::error::{Error, Result};
use crate::renderer::{
    BindingGroupLayoutDesc, BindingResource, BindingSlotDesc, BindingType, Buffer, BufferDesc,
    BufferUsage, CommandList, CompareOp, CullMode, FrontFace, Pipeline, PolygonMode, RenderPass,
    SamplerType, ShaderStage, ShaderStageFlags, Texture, TextureData, TextureDesc, TextureFormat,
    TextureUsage, VertexAttribute, VertexBinding, VertexLayout, MAX_FRAMES_IN_FLIGHT,
};
use crate::{engine_error, engine_info};
use super::common::SlotBindings;
use super::{FrameContext, PassContext};

const LABEL: &str = "Skybox";

/// Unit cube as 12 triangles
#[rustfmt::skip]
const CUBE_POSITIONS: [[f32; 3]; 36] = [
    [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0],

    [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],

    [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],

    [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],

    [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],
];

pub const SKYBOX_VERTEX_COUNT: u32 = CUBE_POSITIONS.len() as u32;

/// Position-only vertex input of the cube
fn cube_layout() -> VertexLayout {
    VertexLayout {
        bindings: vec![VertexBinding { binding: 0, stride: 12 }],
        attributes: vec![
            VertexAttribute { location: 0, binding: 0, format: TextureFormat::R32G32B32_SFLOAT, offset: 0 },
        ],
    }
}

pub struct Skybox {
    cubemap: Arc<dyn Texture>,
    vertex_buffer: Arc<dyn Buffer>,
    pipeline: Arc<dyn Pipeline>,
    bindings: SlotBindings,
}

impl Skybox {
    /// Load the six faces (+X, -X, +Y, -Y, +Z, -Z) and build the pipeline
    /// against `render_pass`, the forward pass's colour + depth pass
    pub fn new(ctx: &mut PassContext, render_pass: &Arc<dyn RenderPass>) -> Result<Self> {
        let cubemap = load_cubemap(ctx)?;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&CUBE_POSITIONS);
        let vertex_buffer = ctx.renderer.create_buffer(BufferDesc {
            name: "skybox_vertices".to_string(),
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::Vertex,
        })?;
        vertex_buffer.update(0, vertex_bytes)?;

        let layout = BindingGroupLayoutDesc::new(vec![
            BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT),
            BindingSlotDesc::new(1, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT),
        ]);
        let pipeline = PipelineBuilder::new("skybox")
            .add_shader(ShaderStage::Vertex, "skybox.vert.spv")
            .add_shader(ShaderStage::Fragment, "skybox.frag.spv")
            .vertex_layout(cube_layout())
            .rasterization(PolygonMode::Fill, CullMode::None, FrontFace::CounterClockwise)
            .depth_state(true, false, CompareOp::LessOrEqual)
            .add_default_blend_attachment()
            .binding_group_layout(layout)
            .render_pass(render_pass)
            .build(ctx.renderer, ctx.shaders)?;

        let mut bindings = SlotBindings::new(0);
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            bindings.write(ctx.renderer, &pipeline, slot, &[
                BindingResource::UniformBuffer(ctx.camera.uniform_buffer(slot).as_ref()),
                BindingResource::SampledTexture(cubemap.as_ref(), SamplerType::LinearClamp),
            ])?;
        }

        Ok(Self { cubemap, vertex_buffer, pipeline, bindings })
    }

    pub fn cubemap(&self) -> &Arc<dyn Texture> {
        &self.cubemap
    }

    /// Draw the cube; the caller has the forward render pass open
    pub fn record(&self, cmd: &mut dyn CommandList, frame: &FrameContext) -> Result<()> {
        cmd.begin_label(LABEL);
        cmd.bind_pipeline(&self.pipeline)?;
        cmd.bind_binding_group(&self.pipeline, self.bindings.get(frame.frame_slot)?)?;
        cmd.bind_vertex_buffer(&self.vertex_buffer, 0)?;
        cmd.draw(SKYBOX_VERTEX_COUNT, 0)?;
        cmd.end_label();
        Ok(())
    }
}

fn load_cubemap(ctx: &mut PassContext) -> Result<Arc<dyn Texture>> {
    let size = ctx.config.skybox_face_size;
    let mut layers = Vec::with_capacity(6);
    for path in ctx.config.skybox_files() {
        let face = ctx.texture_loader.load_rgba8(&path)?;
        if face.width != size || face.height != size {
            let message = format!(
                "Skybox face '{}' is {}x{}, expected {}x{}",
                path.display(), face.width, face.height, size, size
            );
            engine_error!("deferred3d::Skybox", "{}", message);
            return Err(Error::AssetError(message));
        }
        layers.push(face.rgba);
    }

    let cubemap = ctx.renderer.create_texture(TextureDesc {
        name: "skybox".to_string(),
        width: size,
        height: size,
        format: TextureFormat::R8G8B8A8_SRGB,
        usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
        array_layers: 6,
        mip_levels: 1,
        cube_compatible: true,
        data: Some(TextureData::Layers(layers)),
    })?;
    engine_info!("deferred3d::Skybox", "Loaded cubemap with {}x{} faces", size, size);
    Ok(cubemap)
}

#[cfg(test)]
#[path = "skybox_tests.rs"]
mod tests;
