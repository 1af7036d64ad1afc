/// Shared fixture for pass tests: a mock renderer, a one-model scene and
/// everything a `PassContext` borrows.

use std::path::PathBuf;
use std::sync::Arc;
use glam::{Vec2, Vec3};
use crate::builder::ShaderLibrary;
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::frame::FrameSettings;
use crate::renderer::mock_renderer::{MockBuffer, MockRenderer, MockSwapchain};
use crate::renderer::{Buffer, Renderer, Swapchain, Texture};
use crate::resource::{BakedMaterialInfo, BakedMeshData, BakedModel, BakedTextureInfo, TextureSpace, NO_TEXTURE};
use crate::scene::{Light, Scene, StubTextureLoader};
use crate::target::RenderTargetRegistry;
use super::{FrameContext, Pass, PassContext};

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 240;

fn material(alpha_mask: u32) -> BakedMaterialInfo {
    BakedMaterialInfo {
        base_color_texture_id: 0,
        roughness_texture_id: 1,
        metalness_texture_id: 1,
        alpha_mask_texture_id: alpha_mask,
        normal_map_texture_id: NO_TEXTURE,
        emissive_texture_id: NO_TEXTURE,
    }
}

fn triangle(material_id: u32, index_count: u32) -> BakedMeshData {
    BakedMeshData {
        material_id,
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        normals: vec![Vec3::Z; 3],
        texcoords: vec![Vec2::ZERO; 3],
        tbn: vec![[0, 0, 0]; 3],
        indices: (0..index_count).map(|i| i % 3).collect(),
    }
}

/// One opaque mesh of 6 indices and one alpha-masked mesh of 3 indices
pub fn two_mesh_model() -> BakedModel {
    BakedModel {
        textures: vec![
            BakedTextureInfo { path: PathBuf::from("albedo.png"), space: TextureSpace::Srgb, channels: 4 },
            BakedTextureInfo { path: PathBuf::from("mask.png"), space: TextureSpace::Unorm, channels: 1 },
        ],
        materials: vec![material(NO_TEXTURE), material(1)],
        meshes: vec![triangle(0, 6), triangle(1, 3)],
    }
}

pub struct PassFixture {
    pub renderer: MockRenderer,
    pub registry: RenderTargetRegistry,
    pub shaders: ShaderLibrary,
    pub scene: Scene,
    pub camera: Camera,
    pub config: EngineConfig,
    pub loader: StubTextureLoader,
    pub swapchain: MockSwapchain,
    pub settings: FrameSettings,
}

impl PassFixture {
    pub fn new() -> Self {
        let mut renderer = MockRenderer::new();
        let loader = StubTextureLoader { size: 4 };
        let config = EngineConfig {
            skybox_face_size: 4,
            shadow_map_size: 256,
            ..EngineConfig::default()
        };
        let mut scene = Scene::new(&mut renderer).unwrap();
        scene.add_model(&mut renderer, &two_mesh_model(), &loader).unwrap();
        scene.add_light(Light::directional(Vec3::new(0.0, 10.0, 0.0), Vec3::ONE)).unwrap();
        let camera = Camera::new(&mut renderer, config.camera_position, config.camera_direction).unwrap();
        let swapchain = MockSwapchain::new(&renderer, WIDTH, HEIGHT, 3);
        let settings = FrameSettings::from_config(&config);
        Self {
            renderer,
            registry: RenderTargetRegistry::new(),
            shaders: ShaderLibrary::stub(),
            scene,
            camera,
            config,
            loader,
            swapchain,
            settings,
        }
    }

    pub fn ctx(&mut self) -> PassContext<'_> {
        PassContext {
            renderer: &mut self.renderer,
            registry: &mut self.registry,
            shaders: &self.shaders,
            scene: &self.scene,
            camera: &self.camera,
            config: &self.config,
            texture_loader: &self.loader,
            width: self.swapchain.width(),
            height: self.swapchain.height(),
            swapchain_format: self.swapchain.format(),
            swapchain_images: self.swapchain.images(),
        }
    }

    pub fn frame(&self, frame_slot: usize) -> FrameContext<'_> {
        FrameContext {
            frame_slot,
            image_index: 0,
            settings: &self.settings,
            scene: &self.scene,
            camera: &self.camera,
            time: 1.5,
        }
    }

    /// Shadow map, G-buffer and deferred lighting, the producers of every
    /// screen-space pass
    pub fn lighting_chain(&mut self) -> Vec<Box<dyn Pass>> {
        vec![
            Box::new(super::ShadowMapPass::new(&mut self.ctx()).unwrap()),
            Box::new(super::GBufferPass::new(&mut self.ctx()).unwrap()),
            Box::new(super::DeferredLightingPass::new(&mut self.ctx()).unwrap()),
        ]
    }

    /// Recreate the swapchain at a new extent (passes are not touched)
    pub fn resize_swapchain(&mut self, width: u32, height: u32) {
        self.swapchain.recreate(width, height).unwrap();
    }

    /// Commands recorded by one `execute` of `pass` for `frame_slot`
    pub fn record(&mut self, pass: &dyn Pass, frame_slot: usize) -> Vec<String> {
        let mut cmd = self.renderer.create_command_list().unwrap();
        self.renderer.clear_commands();
        pass.execute(cmd.as_mut(), &self.frame(frame_slot)).unwrap();
        self.renderer.commands()
    }

    /// Texture currently published under `name`
    pub fn target(&self, name: &str) -> Arc<dyn Texture> {
        self.registry.get(self.registry.key_by_name(name).unwrap()).unwrap()
    }

    /// Texture ids referenced by a binding group
    pub fn group_textures(&self, group_id: u64) -> Vec<u64> {
        self.renderer.state.lock().unwrap().binding_group_textures[&group_id].clone()
    }

    /// Buffer ids referenced by a binding group
    pub fn group_buffers(&self, group_id: u64) -> Vec<u64> {
        self.renderer.state.lock().unwrap().binding_group_buffers[&group_id].clone()
    }

    /// Id of a buffer created by the mock renderer
    pub fn buffer_id(buffer: &Arc<dyn Buffer>) -> u64 {
        let buffer = buffer.as_ref() as *const dyn Buffer as *const MockBuffer;
        // Every buffer handed out by MockRenderer is a MockBuffer
        unsafe { &*buffer }.id
    }

    /// Current contents of a mock buffer
    pub fn buffer_contents(buffer: &Arc<dyn Buffer>) -> Vec<u8> {
        let buffer = buffer.as_ref() as *const dyn Buffer as *const MockBuffer;
        // Every buffer handed out by MockRenderer is a MockBuffer
        unsafe { &*buffer }.contents()
    }

    /// Ids of the binding groups bound in a command log
    pub fn bound_groups(commands: &[String]) -> Vec<u64> {
        commands
            .iter()
            .filter_map(|c| c.strip_prefix("bind_binding_group:"))
            .map(|id| id.parse().unwrap())
            .collect()
    }

    /// Every referenced texture id in every binding group is still alive
    pub fn all_group_textures_live(&self) -> bool {
        let state = self.renderer.state.lock().unwrap();
        state
            .binding_group_textures
            .values()
            .flatten()
            .all(|id| self.renderer.is_texture_live(*id))
    }
}
