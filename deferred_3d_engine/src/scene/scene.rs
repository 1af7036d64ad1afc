/// Scene - GPU-resident baked models and the light list.
///
/// Meshes are split once, when their model is added, into a front list
/// (opaque materials) and a back list (alpha-masked materials). Draws are
/// issued in insertion order within each list; nothing is sorted.

use std::sync::Arc;
use glam::Mat4;
use crate::error::Result;
use crate::renderer::{
    Buffer, BufferDesc, BufferUsage, CommandList, IndexType, Pipeline, Renderer,
    Texture, TextureData, TextureDesc, TextureFormat, TextureUsage,
    MAX_FRAMES_IN_FLIGHT, full_mip_chain,
};
use crate::resource::{BakedModel, TextureSpace, NO_TEXTURE};
use crate::{engine_bail, engine_debug, engine_info};
use super::light::{Light, LightBuffer, LightType, NUM_LIGHTS};
use super::texture_loader::TextureLoader;

/// Size of the texture descriptor arrays bound by the mesh passes
pub const MAX_SCENE_TEXTURES: usize = 200;

/// Per-draw push constants (vertex, geometry and fragment stages)
///
/// Texture ids index the scene texture array; absent maps hold `NO_TEXTURE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshPushConstants {
    pub model: Mat4,
    pub diffuse: u32,
    pub metalness: u32,
    pub roughness: u32,
    pub emissive: u32,
    pub normal_map: u32,
    _pad: [u32; 3],
}

impl MeshPushConstants {
    pub const SIZE: u32 = std::mem::size_of::<MeshPushConstants>() as u32;

    /// Identity transform and no textures
    pub fn identity() -> Self {
        Self {
            model: Mat4::IDENTITY,
            diffuse: NO_TEXTURE,
            metalness: NO_TEXTURE,
            roughness: NO_TEXTURE,
            emissive: NO_TEXTURE,
            normal_map: NO_TEXTURE,
            _pad: [0; 3],
        }
    }
}

/// Mesh uploaded to the GPU
struct SceneMesh {
    vertex_buffer: Arc<dyn Buffer>,
    index_buffer: Arc<dyn Buffer>,
    index_count: u32,
    push_constants: MeshPushConstants,
}

/// Split mesh indices by material alpha mask: (front = opaque, back = alpha-masked)
pub fn partition_meshes(model: &BakedModel) -> (Vec<usize>, Vec<usize>) {
    let mut front = Vec::new();
    let mut back = Vec::new();
    for (index, mesh) in model.meshes.iter().enumerate() {
        let masked = model
            .materials
            .get(mesh.material_id as usize)
            .is_some_and(|material| material.is_alpha_masked());
        if masked {
            back.push(index);
        } else {
            front.push(index);
        }
    }
    (front, back)
}

fn offset_texture_id(id: u32, base: u32) -> u32 {
    if id == NO_TEXTURE { NO_TEXTURE } else { id + base }
}

pub struct Scene {
    textures: Vec<Arc<dyn Texture>>,
    meshes: Vec<SceneMesh>,
    front: Vec<usize>,
    back: Vec<usize>,
    lights: Vec<Light>,
    light_buffers: Vec<Arc<dyn Buffer>>,
}

impl Scene {
    /// Create an empty scene and its per-slot light uniform buffers
    pub fn new(renderer: &mut dyn Renderer) -> Result<Self> {
        let size = std::mem::size_of::<LightBuffer>() as u64;
        let light_buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|slot| renderer.create_buffer(BufferDesc::uniform(format!("lights_{}", slot), size)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            textures: Vec::new(),
            meshes: Vec::new(),
            front: Vec::new(),
            back: Vec::new(),
            lights: Vec::new(),
            light_buffers,
        })
    }

    /// Upload a baked model
    ///
    /// Must run before the passes are built: they snapshot `textures()`
    /// into their binding groups.
    ///
    /// # Errors
    ///
    /// Fails before uploading anything if the model references a material or
    /// texture it does not contain, or if the scene would exceed
    /// [`MAX_SCENE_TEXTURES`]. Also fails if a texture cannot be decoded or on
    /// GPU allocation failure.
    pub fn add_model(
        &mut self,
        renderer: &mut dyn Renderer,
        model: &BakedModel,
        loader: &dyn TextureLoader,
    ) -> Result<()> {
        model.validate()?;
        if self.textures.len() + model.textures.len() > MAX_SCENE_TEXTURES {
            engine_bail!("deferred3d::Scene",
                "Scene texture limit {} exceeded ({} + {})",
                MAX_SCENE_TEXTURES, self.textures.len(), model.textures.len());
        }
        let texture_base = self.textures.len() as u32;

        for info in &model.textures {
            let image = loader.load_rgba8(&info.path)?;
            let format = match info.space {
                TextureSpace::Srgb => TextureFormat::R8G8B8A8_SRGB,
                TextureSpace::Unorm => TextureFormat::R8G8B8A8_UNORM,
            };
            let texture = renderer.create_texture(TextureDesc {
                name: info.path.display().to_string(),
                width: image.width,
                height: image.height,
                format,
                usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST | TextureUsage::TRANSFER_SRC,
                array_layers: 1,
                mip_levels: full_mip_chain(image.width, image.height),
                cube_compatible: false,
                data: Some(TextureData::Single(image.rgba)),
            })?;
            self.textures.push(texture);
        }

        let (front, back) = partition_meshes(model);
        let mesh_base = self.meshes.len();

        for (index, mesh) in model.meshes.iter().enumerate() {
            let vertices = mesh.vertices();
            let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
            let vertex_buffer = renderer.create_buffer(BufferDesc {
                name: format!("mesh_{}_vertices", mesh_base + index),
                size: vertex_bytes.len().max(1) as u64,
                usage: BufferUsage::Vertex,
            })?;
            vertex_buffer.update(0, vertex_bytes)?;

            let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);
            let index_buffer = renderer.create_buffer(BufferDesc {
                name: format!("mesh_{}_indices", mesh_base + index),
                size: index_bytes.len().max(1) as u64,
                usage: BufferUsage::Index,
            })?;
            index_buffer.update(0, index_bytes)?;

            let Some(material) = model.materials.get(mesh.material_id as usize) else {
                engine_bail!("deferred3d::Scene", "Mesh {} has no material {}", index, mesh.material_id);
            };
            let push_constants = MeshPushConstants {
                diffuse: offset_texture_id(material.base_color_texture_id, texture_base),
                metalness: offset_texture_id(material.metalness_texture_id, texture_base),
                roughness: offset_texture_id(material.roughness_texture_id, texture_base),
                emissive: offset_texture_id(material.emissive_texture_id, texture_base),
                normal_map: offset_texture_id(material.normal_map_texture_id, texture_base),
                ..MeshPushConstants::identity()
            };

            self.meshes.push(SceneMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                push_constants,
            });
        }

        self.front.extend(front.iter().map(|i| mesh_base + i));
        self.back.extend(back.iter().map(|i| mesh_base + i));

        engine_info!("deferred3d::Scene",
            "Added model: {} textures, {} front meshes, {} back meshes",
            model.textures.len(), front.len(), back.len());
        Ok(())
    }

    fn render_meshes(&self, indices: &[usize], cmd: &mut dyn CommandList, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        let stages = pipeline.push_constant_stages();
        for &index in indices {
            let mesh = &self.meshes[index];
            cmd.push_constants(pipeline, stages, 0, bytemuck::bytes_of(&mesh.push_constants))?;
            cmd.bind_vertex_buffer(&mesh.vertex_buffer, 0)?;
            cmd.bind_index_buffer(&mesh.index_buffer, 0, IndexType::U32)?;
            cmd.draw_indexed(mesh.index_count, 0, 0)?;
        }
        Ok(())
    }

    /// Draw every opaque mesh with `pipeline` bound
    pub fn render_front_meshes(&self, cmd: &mut dyn CommandList, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.render_meshes(&self.front, cmd, pipeline)
    }

    /// Draw every alpha-masked mesh with `pipeline` bound
    pub fn render_back_meshes(&self, cmd: &mut dyn CommandList, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.render_meshes(&self.back, cmd, pipeline)
    }

    /// Append a light, returning its index
    pub fn add_light(&mut self, light: Light) -> Result<usize> {
        if self.lights.len() >= NUM_LIGHTS {
            engine_bail!("deferred3d::Scene", "Light limit {} reached", NUM_LIGHTS);
        }
        self.lights.push(light);
        engine_debug!("deferred3d::Scene", "Light {} added ({:?})", self.lights.len() - 1, light.light_type);
        Ok(self.lights.len() - 1)
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// The sun, by convention light 0; None if light 0 is not directional
    pub fn directional_light(&self) -> Option<&Light> {
        self.lights.first().filter(|light| light.light_type == LightType::Directional)
    }

    /// Recompute light-space matrices and upload the lights for `frame_slot`
    pub fn update(&mut self, frame_slot: usize) -> Result<()> {
        let mut block: LightBuffer = bytemuck::Zeroable::zeroed();
        for (i, light) in self.lights.iter_mut().enumerate() {
            light.light_space_matrix = light.compute_light_space_matrix();
            block.lights[i] = light.to_gpu();
        }
        self.light_buffer(frame_slot).update(0, bytemuck::bytes_of(&block))
    }

    pub fn light_buffer(&self, frame_slot: usize) -> &Arc<dyn Buffer> {
        &self.light_buffers[frame_slot % self.light_buffers.len()]
    }

    /// Every uploaded texture, in texture-id order
    pub fn textures(&self) -> &[Arc<dyn Texture>] {
        &self.textures
    }

    pub fn front_meshes(&self) -> &[usize] {
        &self.front
    }

    pub fn back_meshes(&self) -> &[usize] {
        &self.back
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
