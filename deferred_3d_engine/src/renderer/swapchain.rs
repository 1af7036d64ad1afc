/// Swapchain trait - window presentation

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::renderer::{Texture, TextureFormat};

/// Result of acquiring a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Index of the image to render into
    Image(u32),
    /// The surface changed; the swapchain must be recreated before rendering
    OutOfDate,
}

/// Result of presenting a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out of date or suboptimal; the swapchain must be recreated
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
///
/// Owns the per-slot image-available semaphores and the per-image
/// render-finished semaphores; the renderer reaches them through `as_any`
/// when submitting a frame.
pub trait Swapchain: Send + Sync {
    /// Acquire the next image, signalling the image-available semaphore of `frame_slot`
    fn acquire_next_image(&mut self, frame_slot: usize) -> Result<AcquireOutcome>;

    /// Present `image_index`, waiting on its render-finished semaphore
    fn present(&mut self, image_index: u32) -> Result<PresentOutcome>;

    /// Recreate the swapchain (e.g., after window resize)
    ///
    /// # Arguments
    ///
    /// * `width` - New width in pixels
    /// * `height` - New height in pixels
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    fn image_count(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;

    /// Non-owning views of the swapchain images, usable as framebuffer attachments
    fn images(&self) -> Vec<Arc<dyn Texture>>;

    fn as_any(&self) -> &dyn Any;
}
