/// Fly camera driven by keyboard flags and mouse deltas.
///
/// The camera owns one uniform buffer per frame slot. `write_uniform`
/// only touches the buffer of the slot being recorded, so the GPU may still
/// read the other slots.

use std::sync::Arc;
use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3, Vec4};
use crate::error::Result;
use crate::renderer::{Buffer, BufferDesc, Renderer, MAX_FRAMES_IN_FLIGHT};

bitflags! {
    /// Movement keys currently held
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CameraInput: u32 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
        const FAST = 1 << 6;
        const SLOW = 1 << 7;
        /// Mouse look active
        const MOUSING = 1 << 8;
    }
}

/// Camera uniform block (std140)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraTransform {
    pub projection: Mat4,
    pub view: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view: Mat4,
    /// World position, w = 1
    pub position: Vec4,
    /// near, far, viewport width, viewport height
    pub near_far: Vec4,
}

pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// Units per second
const MOVE_SPEED: f32 = 5.0;
const FAST_FACTOR: f32 = 5.0;
const SLOW_FACTOR: f32 = 0.2;
/// Radians per pixel of mouse motion
const MOUSE_SENSITIVITY: f32 = 0.0025;
const MAX_PITCH: f32 = 89.0 * std::f32::consts::PI / 180.0;

pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    input: CameraInput,
    pending_mouse: Vec2,
    last_cursor: Option<Vec2>,
    extent: (u32, u32),
    uniforms: Vec<Arc<dyn Buffer>>,
}

impl Camera {
    /// Create the camera and its per-slot uniform buffers
    ///
    /// # Arguments
    ///
    /// * `position` - Start position
    /// * `direction` - Look direction, need not be normalized
    pub fn new(renderer: &mut dyn Renderer, position: Vec3, direction: Vec3) -> Result<Self> {
        let size = std::mem::size_of::<CameraTransform>() as u64;
        let uniforms = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|slot| renderer.create_buffer(BufferDesc::uniform(format!("camera_{}", slot), size)))
            .collect::<Result<Vec<_>>>()?;

        let dir = direction.try_normalize().unwrap_or(Vec3::NEG_Z);
        Ok(Self {
            position,
            yaw: dir.z.atan2(dir.x),
            pitch: dir.y.clamp(-1.0, 1.0).asin().clamp(-MAX_PITCH, MAX_PITCH),
            input: CameraInput::empty(),
            pending_mouse: Vec2::ZERO,
            last_cursor: None,
            extent: (1, 1),
            uniforms,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn input(&self) -> CameraInput {
        self.input
    }

    /// Unit look direction
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
    }

    pub fn set_input(&mut self, flag: CameraInput, pressed: bool) {
        self.input.set(flag, pressed);
    }

    /// Right mouse button toggles mouse look
    pub fn toggle_mouselook(&mut self) {
        self.input.toggle(CameraInput::MOUSING);
        self.last_cursor = None;
    }

    /// Feed an absolute cursor position; deltas accumulate only while mouse look is on
    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        let cursor = Vec2::new(x, y);
        if self.input.contains(CameraInput::MOUSING) {
            if let Some(last) = self.last_cursor {
                self.pending_mouse += cursor - last;
            }
        }
        self.last_cursor = Some(cursor);
    }

    /// Integrate movement and mouse look over `dt` seconds
    pub fn update(&mut self, dt: f32, width: u32, height: u32) {
        self.extent = (width.max(1), height.max(1));

        if self.input.contains(CameraInput::MOUSING) {
            self.yaw += self.pending_mouse.x * MOUSE_SENSITIVITY;
            self.pitch = (self.pitch - self.pending_mouse.y * MOUSE_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);
        }
        self.pending_mouse = Vec2::ZERO;

        let mut speed = MOVE_SPEED;
        if self.input.contains(CameraInput::FAST) {
            speed *= FAST_FACTOR;
        }
        if self.input.contains(CameraInput::SLOW) {
            speed *= SLOW_FACTOR;
        }

        let forward = self.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let mut motion = Vec3::ZERO;
        if self.input.contains(CameraInput::FORWARD) { motion += forward; }
        if self.input.contains(CameraInput::BACKWARD) { motion -= forward; }
        if self.input.contains(CameraInput::RIGHT) { motion += right; }
        if self.input.contains(CameraInput::LEFT) { motion -= right; }
        if self.input.contains(CameraInput::UP) { motion += Vec3::Y; }
        if self.input.contains(CameraInput::DOWN) { motion -= Vec3::Y; }

        self.position += motion.normalize_or_zero() * speed * dt;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    /// Perspective projection with the Y axis flipped for Vulkan clip space
    pub fn projection(&self) -> Mat4 {
        let aspect = self.extent.0 as f32 / self.extent.1 as f32;
        let mut projection = Mat4::perspective_rh(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
        projection.y_axis.y *= -1.0;
        projection
    }

    pub fn transform(&self) -> CameraTransform {
        let projection = self.projection();
        let view = self.view();
        CameraTransform {
            projection,
            view,
            inverse_projection: projection.inverse(),
            inverse_view: view.inverse(),
            position: self.position.extend(1.0),
            near_far: Vec4::new(NEAR_PLANE, FAR_PLANE, self.extent.0 as f32, self.extent.1 as f32),
        }
    }

    pub fn uniform_buffer(&self, frame_slot: usize) -> &Arc<dyn Buffer> {
        &self.uniforms[frame_slot % self.uniforms.len()]
    }

    /// Upload the current transform into the buffer of `frame_slot`
    pub fn write_uniform(&self, frame_slot: usize) -> Result<()> {
        let transform = self.transform();
        self.uniform_buffer(frame_slot).update(0, bytemuck::bytes_of(&transform))
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
