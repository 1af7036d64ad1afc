/// Registry of render targets shared between passes.
///
/// A pass registers the textures it renders into and receives a stable
/// key. Downstream passes keep only keys and resolve them whenever they
/// (re)build framebuffers or binding groups. After a resize the owner
/// publishes the new texture under the same key and the generation bumps.

use std::sync::Arc;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::error::Result;
use crate::renderer::Texture;
use crate::{engine_bail, engine_err, engine_trace};

new_key_type! {
    /// Stable key of a registered render target
    pub struct RenderTargetKey;
}

struct Entry {
    name: String,
    owner: String,
    texture: Arc<dyn Texture>,
    generation: u64,
}

/// Named render targets owned by passes
pub struct RenderTargetRegistry {
    entries: SlotMap<RenderTargetKey, Entry>,
    by_name: FxHashMap<String, RenderTargetKey>,
}

impl RenderTargetRegistry {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_name: FxHashMap::default(),
        }
    }

    /// Register a new target owned by `owner`
    ///
    /// # Errors
    ///
    /// Returns an error if a target with the same name already exists.
    pub fn register(&mut self, owner: &str, name: &str, texture: Arc<dyn Texture>) -> Result<RenderTargetKey> {
        if self.by_name.contains_key(name) {
            engine_bail!("deferred3d::RenderTargetRegistry",
                "Render target '{}' already registered", name);
        }
        let key = self.entries.insert(Entry {
            name: name.to_string(),
            owner: owner.to_string(),
            texture,
            generation: 0,
        });
        self.by_name.insert(name.to_string(), key);
        engine_trace!("deferred3d::RenderTargetRegistry", "Registered '{}' for {}", name, owner);
        Ok(key)
    }

    /// Replace the texture behind `key` after a resize
    ///
    /// # Errors
    ///
    /// Returns an error if the key is stale or `owner` did not register it.
    pub fn publish(&mut self, owner: &str, key: RenderTargetKey, texture: Arc<dyn Texture>) -> Result<()> {
        let Some(entry) = self.entries.get_mut(key) else {
            engine_bail!("deferred3d::RenderTargetRegistry", "publish: unknown render target key");
        };
        if entry.owner != owner {
            engine_bail!("deferred3d::RenderTargetRegistry",
                "'{}' cannot publish '{}' (owned by {})", owner, entry.name, entry.owner);
        }
        entry.texture = texture;
        entry.generation += 1;
        Ok(())
    }

    /// Current texture behind `key`
    pub fn get(&self, key: RenderTargetKey) -> Result<Arc<dyn Texture>> {
        self.entries
            .get(key)
            .map(|entry| Arc::clone(&entry.texture))
            .ok_or_else(|| engine_err!("deferred3d::RenderTargetRegistry", "Unknown render target key"))
    }

    /// Number of times the target was republished, None for a stale key
    pub fn generation(&self, key: RenderTargetKey) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.generation)
    }

    pub fn key_by_name(&self, name: &str) -> Option<RenderTargetKey> {
        self.by_name.get(name).copied()
    }

    /// Remove a target, returning its texture
    pub fn remove(&mut self, key: RenderTargetKey) -> Option<Arc<dyn Texture>> {
        let entry = self.entries.remove(key)?;
        self.by_name.remove(&entry.name);
        Some(entry.texture)
    }

    /// Ids of every registered texture
    pub fn texture_ids(&self) -> Vec<u64> {
        self.entries.values().map(|entry| entry.texture.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }
}

impl Default for RenderTargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "render_target_registry_tests.rs"]
mod tests;
