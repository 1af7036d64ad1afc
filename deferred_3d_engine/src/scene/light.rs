/// Light sources and their uniform layout.

use glam::{Mat4, Vec3, Vec4};

/// Maximum number of lights in the light uniform block
pub const NUM_LIGHTS: usize = 26;

/// Half extent of the orthographic shadow frustum
const SHADOW_EXTENT: f32 = 9.0;
const SHADOW_NEAR: f32 = 0.1;
const SHADOW_FAR: f32 = 105.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    /// World position, w = 1
    pub position: Vec4,
    pub colour: Vec4,
    /// Recomputed by `Scene::update`
    pub light_space_matrix: Mat4,
}

impl Light {
    pub fn new(light_type: LightType, position: Vec3, colour: Vec3) -> Self {
        Self {
            light_type,
            position: position.extend(1.0),
            colour: colour.extend(1.0),
            light_space_matrix: Mat4::IDENTITY,
        }
    }

    pub fn directional(position: Vec3, colour: Vec3) -> Self {
        Self::new(LightType::Directional, position, colour)
    }

    pub fn spot(position: Vec3, colour: Vec3) -> Self {
        Self::new(LightType::Spot, position, colour)
    }

    /// Orthographic projection times a view looking from the light at the origin
    pub fn compute_light_space_matrix(&self) -> Mat4 {
        let eye = self.position.truncate();
        let ortho = Mat4::orthographic_rh(
            -SHADOW_EXTENT, SHADOW_EXTENT,
            -SHADOW_EXTENT, SHADOW_EXTENT,
            SHADOW_NEAR, SHADOW_FAR,
        );
        // +Y is degenerate for a light straight above the origin
        let dir = (Vec3::ZERO - eye).normalize_or_zero();
        let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 { Vec3::Z } else { Vec3::Y };
        ortho * Mat4::look_at_rh(eye, Vec3::ZERO, up)
    }

    pub fn to_gpu(&self) -> GpuLight {
        GpuLight {
            light_type: self.light_type as i32,
            _pad: [0; 3],
            position: self.position,
            colour: self.colour,
            light_space_matrix: self.light_space_matrix,
        }
    }
}

/// One light in the uniform block (std140)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    pub light_type: i32,
    _pad: [i32; 3],
    pub position: Vec4,
    pub colour: Vec4,
    pub light_space_matrix: Mat4,
}

/// Light uniform block; unused entries are zero
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightBuffer {
    pub lights: [GpuLight; NUM_LIGHTS],
}

/// Red brazier lights of the temple scene
const BRAZIER_POSITIONS: [[f32; 3]; 25] = [
    [-5.77367, -0.573576, -12.2166],
    [-7.93594, -0.894144, -15.881],
    [-2.13638, -0.771904, -10.1234],
    [-5.77367, -0.573576, -12.2166],
    [-7.93594, -0.894144, -15.881],
    [-2.13638, -0.771904, -10.1234],
    [2.01896, -0.810065, -10.0543],
    [5.68575, -0.818747, -12.2383],
    [7.99495, -0.842247, -15.983],
    [3.10194, -0.842027, -25.7605],
    [-3.19912, -0.742865, -25.8225],
    [2.45963, -2.85884, -46.4873],
    [-2.51951, -2.86852, -46.545],
    [-0.0964891, -3.64552, -49.5306],
    [-7.53906, -0.704128, -36.1376],
    [-0.142371, 1.18231, -17.2337],
    [-7.29995, -2.83107, -61.3895],
    [7.22173, -2.91155, -61.1362],
    [-2.0948, -2.90848, -66.6499],
    [2.14284, -2.99084, -66.4837],
    [2.16257, -2.90632, -68.9382],
    [-2.03022, -2.82303, -68.8924],
    [-0.0289998, -3.93954, -75.9016],
    [-1.63065, -2.92373, -88.7963],
    [1.33966, -2.90526, -88.7785],
];

/// White sun at index 0 followed by the brazier spot lights
pub fn default_light_rig() -> Vec<Light> {
    let mut lights = vec![Light::directional(Vec3::new(0.0, 1.0, 0.0), Vec3::ONE)];
    lights.extend(
        BRAZIER_POSITIONS
            .iter()
            .map(|p| Light::spot(Vec3::from_array(*p), Vec3::new(1.0, 0.0, 0.0))),
    );
    lights
}
