/// Engine configuration
///
/// Static settings fixed at startup. Runtime-mutable state lives in
/// `frame::FrameSettings`.

use std::path::PathBuf;
use glam::Vec3;

/// Startup configuration of the deferred renderer
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for scene and skybox assets
    pub asset_root: PathBuf,
    /// Directory holding compiled SPIR-V (`*.vert.spv`, `*.frag.spv`, `*.geom.spv`)
    pub shader_dir: PathBuf,
    /// Baked scene, relative to `asset_root`
    pub scene_path: PathBuf,
    /// Cubemap faces in +X, -X, +Y, -Y, +Z, -Z order, relative to `asset_root`
    pub skybox_faces: [PathBuf; 6],
    /// Edge length of the cubemap faces
    pub skybox_face_size: u32,
    /// Shadow map edge length; independent of the window size
    pub shadow_map_size: u32,
    /// Camera start position
    pub camera_position: Vec3,
    /// Camera start direction (need not be normalized)
    pub camera_direction: Vec3,
    /// Bloom kernel width (odd)
    pub gaussian_kernel_size: usize,
    /// Bloom kernel standard deviation
    pub gaussian_sigma: f32,
    pub ssr: SsrSettings,
    pub ssao: SsaoSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let face = |name: &str| PathBuf::from("Skybox").join(format!("{}.jpg", name));
        Self {
            asset_root: PathBuf::from("assets"),
            shader_dir: PathBuf::from("shaders"),
            scene_path: PathBuf::from("a12").join("suntemple.comp5892mesh_new_packed"),
            skybox_faces: [
                face("right"),
                face("left"),
                face("top"),
                face("bottom"),
                face("front"),
                face("back"),
            ],
            skybox_face_size: 2048,
            shadow_map_size: 1024,
            camera_position: Vec3::new(1.0, 2.0, -24.0),
            camera_direction: Vec3::new(1.0, 1.0, -1.0),
            gaussian_kernel_size: 43,
            gaussian_sigma: 9.0,
            ssr: SsrSettings::default(),
            ssao: SsaoSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn scene_file(&self) -> PathBuf {
        self.asset_root.join(&self.scene_path)
    }

    pub fn skybox_files(&self) -> Vec<PathBuf> {
        self.skybox_faces.iter().map(|f| self.asset_root.join(f)).collect()
    }
}

/// Screen-space reflection parameters, uploaded as a std140 block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsrSettings {
    pub max_steps: i32,
    pub binary_search_iterations: i32,
    pub max_distance: f32,
    pub thickness: f32,
    pub step_size: f32,
    _pad: [f32; 3],
}

impl SsrSettings {
    pub fn new(max_steps: i32, binary_search_iterations: i32, max_distance: f32, thickness: f32, step_size: f32) -> Self {
        Self { max_steps, binary_search_iterations, max_distance, thickness, step_size, _pad: [0.0; 3] }
    }
}

impl Default for SsrSettings {
    fn default() -> Self {
        Self::new(20, 1, 1.0, 0.001, 0.001)
    }
}

/// Ambient occlusion parameters; `time` is rewritten every frame
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoSettings {
    pub radius: f32,
    pub bias: f32,
    pub intensity: f32,
    pub time: f32,
}

impl Default for SsaoSettings {
    fn default() -> Self {
        Self { radius: 0.5, bias: 0.025, intensity: 1.0, time: 0.0 }
    }
}
