/// Pipeline - Vulkan implementation of the Pipeline trait
///
/// Owns the graphics pipeline, its layout and one descriptor set layout per
/// binding group. Viewport and scissor are dynamic.

use deferred_3d_engine::deferred3d::{
    Result,
    Error,
    render::{
        BindingGroupLayoutDesc, ColorBlendState, Pipeline as RendererPipeline, PipelineDesc,
        ShaderStageFlags,
    },
};
use deferred_3d_engine::{engine_err, engine_error};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, LiveCounters};
use crate::vulkan_format::{
    binding_type_to_vk, blend_factor_to_vk, blend_op_to_vk, compare_op_to_vk, cull_mode_to_vk,
    format_to_vk, front_face_to_vk, polygon_mode_to_vk, shader_stage_to_vk, stage_flags_to_vk,
    topology_to_vk,
};
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_shader::{check_bindings_against_layout, Shader};

const SOURCE: &str = "deferred3d::vulkan";

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    push_constant_stages: ShaderStageFlags,
    name: String,
}

impl Pipeline {
    pub(crate) fn new(ctx: Arc<GpuContext>, desc: PipelineDesc) -> Result<Self> {
        let color_count = desc.render_pass.color_attachment_count();
        if desc.color_blends.len() != color_count {
            engine_error!(SOURCE, "Pipeline '{}' has {} blend states for {} color attachments",
                desc.name, desc.color_blends.len(), color_count);
            return Err(Error::InvalidResource(format!(
                "pipeline '{}': {} blend states, render pass has {} color attachments",
                desc.name, desc.color_blends.len(), color_count
            )));
        }

        let shaders: Vec<&Shader> = desc.shaders.iter().map(|s| Shader::from_dyn(s.as_ref())).collect();
        for shader in &shaders {
            check_bindings_against_layout(
                &desc.name, &shader.name, shader.stage, &shader.bindings, &desc.binding_group_layouts,
            )?;
        }

        let push_constant_stages = desc
            .push_constant_ranges
            .iter()
            .fold(ShaderStageFlags::empty(), |acc, range| acc | range.stages);

        // Handles are filled in as they are created so Drop cleans up partial work
        let mut pipeline = Self {
            ctx,
            pipeline: vk::Pipeline::null(),
            layout: vk::PipelineLayout::null(),
            set_layouts: Vec::with_capacity(desc.binding_group_layouts.len()),
            binding_group_layouts: desc.binding_group_layouts.clone(),
            push_constant_stages,
            name: desc.name.clone(),
        };
        LiveCounters::created(&pipeline.ctx.counters.pipelines);

        for layout_desc in &desc.binding_group_layouts {
            let set_layout = pipeline.create_set_layout(layout_desc)?;
            pipeline.set_layouts.push(set_layout);
        }
        pipeline.layout = pipeline.create_layout(&desc)?;
        pipeline.pipeline = pipeline.create_pipeline(&desc, &shaders)?;
        pipeline.ctx.set_object_name(pipeline.pipeline, &desc.name);

        Ok(pipeline)
    }

    pub(crate) fn from_dyn(pipeline: &Arc<dyn RendererPipeline>) -> &Pipeline {
        unsafe { &*(Arc::as_ptr(pipeline) as *const Pipeline) }
    }

    fn create_set_layout(&self, layout_desc: &BindingGroupLayoutDesc) -> Result<vk::DescriptorSetLayout> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = layout_desc
            .entries
            .iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(binding_type_to_vk(entry.binding_type))
                    .descriptor_count(entry.count)
                    .stage_flags(stage_flags_to_vk(entry.stage_flags))
            })
            .collect();
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        unsafe {
            self.ctx
                .device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Pipeline '{}': failed to create descriptor set layout: {:?}", self.name, e))
        }
    }

    fn create_layout(&self, desc: &PipelineDesc) -> Result<vk::PipelineLayout> {
        let push_constant_ranges: Vec<vk::PushConstantRange> = desc
            .push_constant_ranges
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: stage_flags_to_vk(range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&self.set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        unsafe {
            self.ctx
                .device
                .create_pipeline_layout(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Pipeline '{}': failed to create pipeline layout: {:?}", self.name, e))
        }
    }

    fn create_pipeline(&self, desc: &PipelineDesc, shaders: &[&Shader]) -> Result<vk::Pipeline> {
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = shaders
            .iter()
            .map(|shader| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(shader.stage))
                    .module(shader.module)
                    .name(&shader.entry_point)
            })
            .collect();

        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
            .vertex_layout
            .bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Counts only, the values are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = &desc.rasterization;
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(rasterization.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(rasterization.cull_mode))
            .front_face(front_face_to_vk(rasterization.front_face))
            .depth_bias_enable(false);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth.test_enable)
            .depth_write_enable(desc.depth.write_enable)
            .depth_compare_op(compare_op_to_vk(desc.depth.compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> =
            desc.color_blends.iter().map(blend_attachment_to_vk).collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(self.layout)
            .render_pass(RenderPass::from_dyn(&desc.render_pass).render_pass)
            .subpass(0);

        let pipelines = unsafe {
            self.ctx
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, e)| engine_err!(SOURCE, "Failed to create graphics pipeline '{}': {:?}", self.name, e))?
        };
        pipelines
            .first()
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Driver returned no pipeline for '{}'", self.name))
    }
}

pub(crate) fn blend_attachment_to_vk(blend: &ColorBlendState) -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(blend.blend_enable)
        .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
        .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
        .color_blend_op(blend_op_to_vk(blend.color_blend_op))
        .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
        .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
        .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op))
}

impl RendererPipeline for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn binding_group_layouts(&self) -> &[BindingGroupLayoutDesc] {
        &self.binding_group_layouts
    }

    fn push_constant_stages(&self) -> ShaderStageFlags {
        self.push_constant_stages
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
            for set_layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
            }
        }
        LiveCounters::dropped(&self.ctx.counters.pipelines);
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
