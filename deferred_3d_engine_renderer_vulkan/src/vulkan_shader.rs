/// Shader - Vulkan implementation of the Shader trait
///
/// Modules are reflected with spirq at creation; pipelines use the reflected
/// bindings to check their declared binding group layouts.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{
        BindingGroupLayoutDesc, BindingType, Shader as RendererShader, ShaderDesc, ShaderStage,
        ShaderStageFlags,
    },
};
use deferred_3d_engine::{engine_bail, engine_bail_warn, engine_err, engine_warn};
use ash::vk;
use std::ffi::CString;
use std::io::Cursor;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

const SOURCE: &str = "deferred3d::vulkan";

/// Descriptor binding used by a shader entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReflectedBinding {
    pub set: u32,
    pub binding: u32,
    pub binding_type: BindingType,
}

/// Vulkan shader implementation
pub struct Shader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStage,
    pub(crate) entry_point: CString,
    pub(crate) name: String,
    pub(crate) bindings: Vec<ReflectedBinding>,
}

impl Shader {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: ShaderDesc) -> Result<Self> {
        if desc.code.len() % 4 != 0 {
            engine_bail_warn!(SOURCE,
                "Shader '{}' is not 4-byte aligned (size: {} bytes)", desc.name, desc.code.len());
        }

        // read_spv copies into u32 words, so the byte slice may be unaligned
        let code = ash::util::read_spv(&mut Cursor::new(desc.code))
            .map_err(|e| engine_err!(SOURCE, "Invalid SPIR-V in shader '{}': {}", desc.name, e))?;
        let bindings = reflect_bindings(&code, desc.entry_point)
            .map_err(|e| engine_err!(SOURCE, "Reflection of shader '{}' failed: {}", desc.name, e))?;
        let entry_point = CString::new(desc.entry_point)
            .map_err(|_| engine_err!(SOURCE, "Entry point of shader '{}' contains a NUL byte", desc.name))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe {
            ctx.device
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create shader module '{}': {:?}", desc.name, e))?
        };
        ctx.set_object_name(module, desc.name);

        Ok(Self {
            ctx,
            module,
            stage: desc.stage,
            entry_point,
            name: desc.name.to_string(),
            bindings,
        })
    }

    pub(crate) fn from_dyn(shader: &dyn RendererShader) -> &Shader {
        unsafe { &*(shader as *const dyn RendererShader as *const Shader) }
    }
}

impl RendererShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Descriptor bindings statically used by `entry_point`
fn reflect_bindings(code: &[u32], entry_point: &str) -> std::result::Result<Vec<ReflectedBinding>, String> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(false)
        .reflect()
        .map_err(|e| format!("{:?}", e))?;

    let entry = entry_points
        .iter()
        .find(|ep| ep.name == entry_point)
        .ok_or_else(|| format!("entry point '{}' not found", entry_point))?;

    let mut bindings = Vec::new();
    for var in entry.vars.iter() {
        if let spirq::var::Variable::Descriptor { desc_bind, desc_ty, .. } = var {
            bindings.push(ReflectedBinding {
                set: desc_bind.set(),
                binding: desc_bind.bind(),
                binding_type: descriptor_type_to_binding_type(desc_ty)?,
            });
        }
    }
    Ok(bindings)
}

fn descriptor_type_to_binding_type(desc_ty: &spirq::ty::DescriptorType) -> std::result::Result<BindingType, String> {
    use spirq::ty::DescriptorType;
    match desc_ty {
        DescriptorType::UniformBuffer() => Ok(BindingType::UniformBuffer),
        DescriptorType::CombinedImageSampler() => Ok(BindingType::CombinedImageSampler),
        DescriptorType::SampledImage() => Ok(BindingType::SampledImage),
        DescriptorType::Sampler() => Ok(BindingType::Sampler),
        other => Err(format!("unsupported descriptor type {:?}", other)),
    }
}

/// Check that every binding a stage uses exists in `layouts` with the same type
///
/// Missing or mistyped bindings are errors; a stage missing from the slot's
/// visibility is only warned about.
pub(crate) fn check_bindings_against_layout(
    pipeline_name: &str,
    shader_name: &str,
    stage: ShaderStage,
    bindings: &[ReflectedBinding],
    layouts: &[BindingGroupLayoutDesc],
) -> Result<()> {
    for reflected in bindings {
        let slot = layouts
            .get(reflected.set as usize)
            .and_then(|layout| layout.entries.iter().find(|e| e.binding == reflected.binding));
        let Some(slot) = slot else {
            engine_bail!(SOURCE,
                "Pipeline '{}': shader '{}' uses set {} binding {} which is not in the layout",
                pipeline_name, shader_name, reflected.set, reflected.binding);
        };
        if slot.binding_type != reflected.binding_type {
            engine_bail!(SOURCE,
                "Pipeline '{}': set {} binding {} declared {:?} but shader '{}' uses {:?}",
                pipeline_name, reflected.set, reflected.binding, slot.binding_type,
                shader_name, reflected.binding_type);
        }
        if !slot.stage_flags.contains(ShaderStageFlags::from(stage)) {
            engine_warn!(SOURCE,
                "Pipeline '{}': set {} binding {} is not visible to the {:?} stage of '{}'",
                pipeline_name, reflected.set, reflected.binding, stage, shader_name);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "vulkan_shader_tests.rs"]
mod tests;
