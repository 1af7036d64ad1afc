//! Baked model file format.
//!
//! Little-endian binary produced by the offline baker:
//!
//! ```text
//! magic    16 bytes  "\0\0COMP5892Mmesh\0"
//! variant  16 bytes  "default-a12" NUL padded
//! u32 texture count, per texture: string path, u8 colour space, u8 channels
//! u32 material count, per material: 6 x u32 texture ids
//!     (base colour, roughness, metalness, alpha mask, normal map, emissive)
//! u32 mesh count, per mesh: u32 material, u32 V, u32 I,
//!     V x vec3 position, V x vec3 normal, V x vec2 texcoord,
//!     V x [u8; 3] packed tangent frame, I x u32 index
//! ```
//!
//! Strings are a u32 length (including the terminating NUL) followed by the
//! bytes. Trailing bytes after the last mesh are tolerated.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use glam::{Vec2, Vec3};
use crate::error::{Error, Result};
use crate::{engine_error, engine_info, engine_warn};
use super::vertex::Vertex;

/// File signature
pub const FILE_MAGIC: [u8; 16] = *b"\0\0COMP5892Mmesh\0";

/// Format variant
pub const FILE_VARIANT: [u8; 16] = *b"default-a12\0\0\0\0\0";

/// Texture id meaning "no texture"
pub const NO_TEXTURE: u32 = 0xFFFF_FFFF;

/// Strings this long (or longer) are rejected
const MAX_STRING: u32 = 32 * 1024;

fn asset_error(message: String) -> Error {
    engine_error!("deferred3d::BakedModel", "{}", message);
    Error::AssetError(message)
}

/// Colour space of a baked texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSpace {
    Unorm = 0,
    Srgb = 1,
}

impl TextureSpace {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(TextureSpace::Unorm),
            1 => Ok(TextureSpace::Srgb),
            other => Err(asset_error(format!("Unknown texture colour space {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BakedTextureInfo {
    /// Path to the image, prefixed with the model directory when loaded from disk
    pub path: PathBuf,
    pub space: TextureSpace,
    pub channels: u8,
}

/// Material texture ids; optional maps hold [`NO_TEXTURE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakedMaterialInfo {
    pub base_color_texture_id: u32,
    pub roughness_texture_id: u32,
    pub metalness_texture_id: u32,
    pub alpha_mask_texture_id: u32,
    pub normal_map_texture_id: u32,
    pub emissive_texture_id: u32,
}

impl BakedMaterialInfo {
    /// Opaque materials have no alpha mask
    pub fn is_alpha_masked(&self) -> bool {
        self.alpha_mask_texture_id != NO_TEXTURE
    }

    fn ids(&self) -> [u32; 6] {
        [
            self.base_color_texture_id,
            self.roughness_texture_id,
            self.metalness_texture_id,
            self.alpha_mask_texture_id,
            self.normal_map_texture_id,
            self.emissive_texture_id,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakedMeshData {
    pub material_id: u32,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    /// Packed tangent-frame quaternion per vertex
    pub tbn: Vec<[u8; 3]>,
    pub indices: Vec<u32>,
}

impl BakedMeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Interleave the attribute streams into GPU vertices
    pub fn vertices(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex::new(self.positions[i], self.texcoords[i], self.normals[i], self.tbn[i]))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakedModel {
    pub textures: Vec<BakedTextureInfo>,
    pub materials: Vec<BakedMaterialInfo>,
    pub meshes: Vec<BakedMeshData>,
}

impl BakedModel {
    /// Check every cross reference: mesh materials, material texture ids and
    /// the per-vertex stream lengths
    ///
    /// # Errors
    ///
    /// `AssetError` naming the first offending material or mesh.
    pub fn validate(&self) -> Result<()> {
        for (index, material) in self.materials.iter().enumerate() {
            if let Some(id) = material
                .ids()
                .into_iter()
                .find(|&id| id != NO_TEXTURE && id as usize >= self.textures.len())
            {
                return Err(asset_error(format!(
                    "Material {} references texture {} of {}", index, id, self.textures.len()
                )));
            }
        }
        for (index, mesh) in self.meshes.iter().enumerate() {
            if mesh.material_id as usize >= self.materials.len() {
                return Err(asset_error(format!(
                    "Mesh {} references material {} of {}", index, mesh.material_id, self.materials.len()
                )));
            }
            let vertices = mesh.vertex_count();
            if mesh.normals.len() != vertices || mesh.texcoords.len() != vertices || mesh.tbn.len() != vertices {
                return Err(asset_error(format!("Mesh {} has vertex streams of different lengths", index)));
            }
        }
        Ok(())
    }
}

// ===== READ =====

struct BakedReader<R: Read> {
    inner: R,
}

impl<R: Read> BakedReader<R> {
    fn read_bytes(&mut self, len: usize, what: &str) -> Result<Vec<u8>> {
        // Bounded read: a corrupt count cannot trigger a huge allocation up front
        let mut buffer = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buffer)?;
        if buffer.len() != len {
            return Err(asset_error(format!(
                "Truncated baked model reading {}: expected {} bytes, got {}",
                what, len, buffer.len()
            )));
        }
        Ok(buffer)
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    fn read_u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.read_array::<1>(what)?[0])
    }

    fn read_u32(&mut self, what: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>(what)?))
    }

    fn read_string(&mut self, what: &str) -> Result<String> {
        let length = self.read_u32(what)?;
        if length >= MAX_STRING {
            return Err(asset_error(format!("Unexpectedly long string ({} bytes) in {}", length, what)));
        }
        let mut bytes = self.read_bytes(length as usize, what)?;
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        String::from_utf8(bytes).map_err(|_| asset_error(format!("Invalid UTF-8 in {}", what)))
    }

    fn read_f32s(&mut self, count: usize, what: &str) -> Result<Vec<f32>> {
        let bytes = self.read_bytes(count * 4, what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn read_vec3s(&mut self, count: usize, what: &str) -> Result<Vec<Vec3>> {
        Ok(self.read_f32s(count * 3, what)?.chunks_exact(3).map(Vec3::from_slice).collect())
    }

    fn read_vec2s(&mut self, count: usize, what: &str) -> Result<Vec<Vec2>> {
        Ok(self.read_f32s(count * 2, what)?.chunks_exact(2).map(Vec2::from_slice).collect())
    }

    fn has_trailing_bytes(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.inner.read(&mut byte), Ok(n) if n > 0)
    }
}

/// Parse a baked model from `reader`
///
/// Texture paths are joined onto `base_dir`.
///
/// # Errors
///
/// Bad magic or variant, truncated data, an oversized string, an unknown
/// colour space, or a texture or material id out of range.
pub fn read_baked_model<R: Read>(reader: R, base_dir: &Path) -> Result<BakedModel> {
    let mut reader = BakedReader { inner: reader };

    let magic = reader.read_array::<16>("file magic")?;
    if magic != FILE_MAGIC {
        return Err(asset_error("Invalid baked model file signature".to_string()));
    }
    let variant = reader.read_array::<16>("file variant")?;
    if variant != FILE_VARIANT {
        let found = String::from_utf8_lossy(&variant).trim_end_matches('\0').to_string();
        return Err(asset_error(format!("Baked model variant is '{}', expected 'default-a12'", found)));
    }

    let mut model = BakedModel::default();

    let texture_count = reader.read_u32("texture count")?;
    for _ in 0..texture_count {
        let path = base_dir.join(reader.read_string("texture path")?);
        let space = TextureSpace::from_u8(reader.read_u8("texture colour space")?)?;
        let channels = reader.read_u8("texture channels")?;
        model.textures.push(BakedTextureInfo { path, space, channels });
    }

    let material_count = reader.read_u32("material count")?;
    for _ in 0..material_count {
        let mut ids = [0u32; 6];
        for id in ids.iter_mut() {
            *id = reader.read_u32("material texture id")?;
        }
        model.materials.push(BakedMaterialInfo {
            base_color_texture_id: ids[0],
            roughness_texture_id: ids[1],
            metalness_texture_id: ids[2],
            alpha_mask_texture_id: ids[3],
            normal_map_texture_id: ids[4],
            emissive_texture_id: ids[5],
        });
    }

    let mesh_count = reader.read_u32("mesh count")?;
    for _ in 0..mesh_count {
        let material_id = reader.read_u32("mesh material")?;
        if material_id as usize >= model.materials.len() {
            return Err(asset_error(format!(
                "Mesh references material {} of {}", material_id, model.materials.len()
            )));
        }
        let vertex_count = reader.read_u32("vertex count")? as usize;
        let index_count = reader.read_u32("index count")? as usize;

        let positions = reader.read_vec3s(vertex_count, "positions")?;
        let normals = reader.read_vec3s(vertex_count, "normals")?;
        let texcoords = reader.read_vec2s(vertex_count, "texcoords")?;
        let tbn = reader
            .read_bytes(vertex_count * 3, "tangent frames")?
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let indices = reader
            .read_bytes(index_count * 4, "indices")?
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        model.meshes.push(BakedMeshData { material_id, positions, normals, texcoords, tbn, indices });
    }

    if reader.has_trailing_bytes() {
        engine_warn!("deferred3d::BakedModel", "Baked model contains trailing bytes");
    }

    model.validate()?;
    Ok(model)
}

/// Load a baked model from disk
///
/// Texture paths are relative to the model's directory.
pub fn load_baked_model(path: &Path) -> Result<BakedModel> {
    let file = File::open(path).map_err(|e| {
        asset_error(format!("Unable to open '{}' for reading: {}", path.display(), e))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let model = read_baked_model(BufReader::new(file), base_dir)?;
    engine_info!("deferred3d::BakedModel",
        "Loaded '{}': {} textures, {} materials, {} meshes",
        path.display(), model.textures.len(), model.materials.len(), model.meshes.len());
    Ok(model)
}

// ===== WRITE =====

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    let length = value.len() as u32 + 1;
    if length >= MAX_STRING {
        return Err(asset_error(format!("String too long for baked model ({} bytes)", length)));
    }
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(value.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Serialize `model`; texture paths are written as given
pub fn write_baked_model<W: Write>(writer: W, model: &BakedModel) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    writer.write_all(&FILE_MAGIC)?;
    writer.write_all(&FILE_VARIANT)?;

    writer.write_all(&(model.textures.len() as u32).to_le_bytes())?;
    for texture in &model.textures {
        write_string(&mut writer, &texture.path.to_string_lossy())?;
        writer.write_all(&[texture.space as u8, texture.channels])?;
    }

    writer.write_all(&(model.materials.len() as u32).to_le_bytes())?;
    for material in &model.materials {
        for id in material.ids() {
            writer.write_all(&id.to_le_bytes())?;
        }
    }

    writer.write_all(&(model.meshes.len() as u32).to_le_bytes())?;
    for mesh in &model.meshes {
        let vertex_count = mesh.vertex_count();
        if mesh.normals.len() != vertex_count || mesh.texcoords.len() != vertex_count || mesh.tbn.len() != vertex_count {
            return Err(asset_error("Mesh attribute streams differ in length".to_string()));
        }
        writer.write_all(&mesh.material_id.to_le_bytes())?;
        writer.write_all(&(vertex_count as u32).to_le_bytes())?;
        writer.write_all(&(mesh.indices.len() as u32).to_le_bytes())?;
        for p in &mesh.positions {
            write_f32s(&mut writer, &p.to_array())?;
        }
        for n in &mesh.normals {
            write_f32s(&mut writer, &n.to_array())?;
        }
        for t in &mesh.texcoords {
            write_f32s(&mut writer, &t.to_array())?;
        }
        for q in &mesh.tbn {
            writer.write_all(q)?;
        }
        for index in &mesh.indices {
            writer.write_all(&index.to_le_bytes())?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "baked_model_tests.rs"]
mod tests;
