/*!
# Deferred 3D Engine

Multi-pass real-time renderer with a deferred and a forward path.

The core crate is backend-agnostic: GPU objects are reached through the
traits of the [`renderer`] module, and a backend crate (Vulkan) implements
them. Everything else in this crate is built on those traits only.

## Architecture

- **Renderer**: factory for textures, buffers, shaders, pipelines, render
  passes, framebuffers and binding groups, plus frame submission
- **PipelineBuilder / RenderPassBuilder**: fluent descriptions validated
  before they reach the backend
- **RenderTargetRegistry**: named render targets, owned by the pass that
  writes them and looked up by the passes that sample them
- **Scene**: baked model geometry, textures and the light list
- **Passes**: shadow map, depth prepass, G-buffer, deferred lighting, SSAO,
  SSR, bloom, composite, forward (with skybox), mesh density, present
- **FrameRenderer**: per-frame wait / acquire / record / submit / present
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod renderer;
pub mod builder;
pub mod target;
pub mod resource;
pub mod scene;
pub mod camera;
pub mod passes;
pub mod frame;

// Main deferred3d namespace module
pub mod deferred3d {
    pub use crate::error::{Error, Result};

    pub use crate::engine::Engine;

    pub use crate::config::{EngineConfig, SsaoSettings, SsrSettings};

    pub use crate::renderer::Renderer;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod render {
        pub use crate::renderer::*;
    }

    pub mod builder {
        pub use crate::builder::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod passes {
        pub use crate::passes::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub use crate::target::{RenderTargetKey, RenderTargetRegistry};
}

// Re-export math library at crate root
pub use glam;
