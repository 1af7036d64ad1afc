/// Image decoding for scene and skybox textures.

use std::path::Path;
use crate::error::{Error, Result};
use crate::engine_error;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Source of texture pixels
pub trait TextureLoader {
    /// Decode the image at `path` into tightly packed RGBA8
    fn load_rgba8(&self, path: &Path) -> Result<LoadedImage>;
}

/// Decodes PNG and JPEG files with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl TextureLoader for ImageFileLoader {
    fn load_rgba8(&self, path: &Path) -> Result<LoadedImage> {
        let decoded = image::open(path).map_err(|e| {
            let message = format!("Failed to load image '{}': {}", path.display(), e);
            engine_error!("deferred3d::TextureLoader", "{}", message);
            Error::AssetError(message)
        })?;
        let rgba = decoded.to_rgba8();
        Ok(LoadedImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}

/// Returns a solid image of fixed size for any path
#[cfg(test)]
pub struct StubTextureLoader {
    pub size: u32,
}

#[cfg(test)]
impl TextureLoader for StubTextureLoader {
    fn load_rgba8(&self, _path: &Path) -> Result<LoadedImage> {
        Ok(LoadedImage {
            width: self.size,
            height: self.size,
            rgba: vec![255u8; (self.size * self.size * 4) as usize],
        })
    }
}
