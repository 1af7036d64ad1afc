/// Tests for the baked model reader and writer

use super::*;
use std::io::Cursor;

fn material(alpha_mask: u32) -> BakedMaterialInfo {
    BakedMaterialInfo {
        base_color_texture_id: 0,
        roughness_texture_id: 1,
        metalness_texture_id: 1,
        alpha_mask_texture_id: alpha_mask,
        normal_map_texture_id: NO_TEXTURE,
        emissive_texture_id: 0,
    }
}

fn triangle(material_id: u32, z: f32) -> BakedMeshData {
    BakedMeshData {
        material_id,
        positions: vec![Vec3::new(0.0, 0.0, z), Vec3::new(1.0, 0.0, z), Vec3::new(0.0, 1.0, z)],
        normals: vec![Vec3::Z; 3],
        texcoords: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        tbn: vec![[1, 2, 3], [4, 5, 6], [7, 8, 9]],
        indices: vec![0, 1, 2],
    }
}

fn sample_model() -> BakedModel {
    BakedModel {
        textures: vec![
            BakedTextureInfo { path: PathBuf::from("textures/albedo.png"), space: TextureSpace::Srgb, channels: 4 },
            BakedTextureInfo { path: PathBuf::from("textures/rough.png"), space: TextureSpace::Unorm, channels: 1 },
        ],
        materials: vec![material(NO_TEXTURE), material(1)],
        meshes: vec![triangle(0, 0.0), triangle(1, -1.0)],
    }
}

fn encode(model: &BakedModel) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_baked_model(&mut bytes, model).unwrap();
    bytes
}

#[test]
fn test_round_trip_preserves_geometry_and_sentinels() {
    let model = sample_model();
    let decoded = read_baked_model(Cursor::new(encode(&model)), Path::new("")).unwrap();

    assert_eq!(decoded, model);
    assert_eq!(decoded.materials[0].alpha_mask_texture_id, NO_TEXTURE);
    assert_eq!(decoded.materials[0].normal_map_texture_id, NO_TEXTURE);
    assert!(decoded.materials[1].is_alpha_masked());
}

#[test]
fn test_texture_paths_prefixed_with_base_dir() {
    let decoded = read_baked_model(Cursor::new(encode(&sample_model())), Path::new("assets/a12")).unwrap();
    assert_eq!(decoded.textures[0].path, PathBuf::from("assets/a12/textures/albedo.png"));
}

#[test]
fn test_header_layout() {
    let bytes = encode(&BakedModel::default());
    assert_eq!(&bytes[..16], &FILE_MAGIC);
    assert_eq!(&bytes[16..27], b"default-a12");
    // Three empty tables
    assert_eq!(bytes.len(), 32 + 12);
}

#[test]
fn test_string_length_includes_nul() {
    let model = BakedModel {
        textures: vec![BakedTextureInfo { path: PathBuf::from("ab"), space: TextureSpace::Unorm, channels: 3 }],
        ..Default::default()
    };
    let bytes = encode(&model);
    assert_eq!(u32::from_le_bytes([bytes[36], bytes[37], bytes[38], bytes[39]]), 3);
    assert_eq!(&bytes[40..43], b"ab\0");
}

#[test]
fn test_bad_magic_rejected() {
    let mut bytes = encode(&sample_model());
    bytes[2] = b'X';
    let result = read_baked_model(Cursor::new(bytes), Path::new(""));
    assert!(matches!(result, Err(Error::AssetError(_))));
}

#[test]
fn test_bad_variant_rejected() {
    let mut bytes = encode(&sample_model());
    bytes[16..27].copy_from_slice(b"default-a13");
    let result = read_baked_model(Cursor::new(bytes), Path::new(""));
    assert!(matches!(result, Err(Error::AssetError(msg)) if msg.contains("default-a13")));
}

#[test]
fn test_truncated_file_rejected() {
    let bytes = encode(&sample_model());
    for cut in [10, 40, bytes.len() - 1] {
        let result = read_baked_model(Cursor::new(bytes[..cut].to_vec()), Path::new(""));
        assert!(matches!(result, Err(Error::AssetError(_))), "cut at {}", cut);
    }
}

#[test]
fn test_trailing_bytes_tolerated() {
    let mut bytes = encode(&sample_model());
    bytes.extend_from_slice(&[0xAB, 0xCD]);
    let decoded = read_baked_model(Cursor::new(bytes), Path::new("")).unwrap();
    assert_eq!(decoded.meshes.len(), 2);
}

#[test]
fn test_oversized_string_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&FILE_MAGIC);
    bytes.extend_from_slice(&FILE_VARIANT);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&(32u32 * 1024).to_le_bytes());
    let result = read_baked_model(Cursor::new(bytes), Path::new(""));
    assert!(matches!(result, Err(Error::AssetError(msg)) if msg.contains("long string")));
}

#[test]
fn test_material_index_out_of_range_rejected() {
    let mut model = sample_model();
    model.meshes[1].material_id = 7;
    let result = read_baked_model(Cursor::new(encode(&model)), Path::new(""));
    assert!(result.is_err());
}

#[test]
fn test_texture_id_out_of_range_rejected() {
    let mut model = sample_model();
    model.materials[0].base_color_texture_id = 99;
    let result = read_baked_model(Cursor::new(encode(&model)), Path::new(""));
    assert!(matches!(result, Err(Error::AssetError(msg)) if msg.contains("texture 99 of 2")));
}

#[test]
fn test_validate_checks_every_material_map() {
    let model = sample_model();
    assert!(model.validate().is_ok());

    let setters: [fn(&mut BakedMaterialInfo); 6] = [
        |m| m.base_color_texture_id = 2,
        |m| m.roughness_texture_id = 2,
        |m| m.metalness_texture_id = 2,
        |m| m.alpha_mask_texture_id = 2,
        |m| m.normal_map_texture_id = 2,
        |m| m.emissive_texture_id = 2,
    ];
    for set in setters {
        let mut broken = model.clone();
        set(&mut broken.materials[1]);
        assert!(matches!(broken.validate(), Err(Error::AssetError(_))));
    }
}

#[test]
fn test_validate_rejects_mismatched_streams() {
    let mut model = sample_model();
    model.meshes[0].texcoords.pop();
    assert!(matches!(model.validate(), Err(Error::AssetError(msg)) if msg.contains("Mesh 0")));
}

#[test]
fn test_vertices_interleave_streams() {
    let mesh = triangle(0, 2.0);
    let vertices = mesh.vertices();
    assert_eq!(vertices.len(), 3);
    assert_eq!(vertices[1].position, [1.0, 0.0, 2.0]);
    assert_eq!(vertices[2].texcoord, [0.0, 1.0]);
    assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    assert_eq!(vertices[1].tbn, [4, 5, 6, 0]);
    assert_eq!(Vertex::STRIDE, 36);
}
