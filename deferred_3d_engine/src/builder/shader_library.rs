/// Shader binary lookup
///
/// Pipelines name their shaders by file (`"gbuffer.frag.spv"`); the library
/// resolves the file under its root directory and caches the bytes, so the
/// dozen debug pipelines that share `default.vert.spv` read it once.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

enum ShaderSource {
    Directory(PathBuf),
    /// Any name resolves to a minimal valid header (tests only)
    #[cfg(test)]
    Stub,
}

pub struct ShaderLibrary {
    source: ShaderSource,
    cache: Mutex<FxHashMap<String, Arc<Vec<u8>>>>,
}

impl ShaderLibrary {
    /// Library reading compiled SPIR-V files from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            source: ShaderSource::Directory(root.into()),
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Library that serves a fake SPIR-V header for every name
    #[cfg(test)]
    pub fn stub() -> Self {
        Self {
            source: ShaderSource::Stub,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Root directory, None for the stub library
    pub fn root(&self) -> Option<&Path> {
        match &self.source {
            ShaderSource::Directory(root) => Some(root),
            #[cfg(test)]
            ShaderSource::Stub => None,
        }
    }

    /// Load (or fetch from cache) the SPIR-V bytes of `name`
    ///
    /// # Errors
    ///
    /// `AssetError` if the file is missing, unreadable, or not SPIR-V.
    pub fn load(&self, name: &str) -> Result<Arc<Vec<u8>>> {
        let mut cache = self.cache.lock()
            .map_err(|_| Error::BackendError("shader cache lock poisoned".to_string()))?;
        if let Some(code) = cache.get(name) {
            return Ok(Arc::clone(code));
        }

        let code = match &self.source {
            ShaderSource::Directory(root) => {
                let path = root.join(name);
                let bytes = std::fs::read(&path).map_err(|err| {
                    let message = format!("Failed to read shader '{}': {}", path.display(), err);
                    engine_error!("deferred3d::ShaderLibrary", "{}", message);
                    Error::AssetError(message)
                })?;
                validate_spirv(name, &bytes)?;
                bytes
            }
            #[cfg(test)]
            ShaderSource::Stub => {
                let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
                bytes.extend_from_slice(&[0u8; 16]);
                bytes
            }
        };

        engine_debug!("deferred3d::ShaderLibrary", "Loaded shader '{}' ({} bytes)", name, code.len());
        let code = Arc::new(code);
        cache.insert(name.to_string(), Arc::clone(&code));
        Ok(code)
    }

    /// Number of cached shader binaries
    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

fn validate_spirv(name: &str, bytes: &[u8]) -> Result<()> {
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        let message = format!("Shader '{}' is not SPIR-V: size {} is not a word multiple", name, bytes.len());
        engine_error!("deferred3d::ShaderLibrary", "{}", message);
        return Err(Error::AssetError(message));
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != SPIRV_MAGIC {
        let message = format!("Shader '{}' has bad SPIR-V magic {:#010x}", name, magic);
        engine_error!("deferred3d::ShaderLibrary", "{}", message);
        return Err(Error::AssetError(message));
    }
    Ok(())
}

#[cfg(test)]
#[path = "shader_library_tests.rs"]
mod tests;
