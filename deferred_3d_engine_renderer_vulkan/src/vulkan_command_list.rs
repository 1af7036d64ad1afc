/// CommandList - Vulkan implementation of the CommandList trait
///
/// Each list owns its own command pool and one primary command buffer, reset
/// at every `begin`.

use deferred_3d_engine::deferred3d::{
    Result,
    render::{
        BindingGroup as RendererBindingGroup, Buffer as RendererBuffer, ClearValue,
        CommandList as RendererCommandList, Framebuffer as RendererFramebuffer, IndexType,
        Pipeline as RendererPipeline, Rect2D, RenderPass as RendererRenderPass, ShaderStageFlags,
        Viewport,
    },
};
use deferred_3d_engine::{engine_bail, engine_err, engine_warn};
use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{index_type_to_vk, stage_flags_to_vk};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;

const SOURCE: &str = "deferred3d::vulkan";

/// Recording state machine shared by every command
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordingState {
    recording: bool,
    in_render_pass: bool,
}

impl RecordingState {
    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!(SOURCE, "Command list already recording");
        }
        self.recording = true;
        Ok(())
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Cannot end command list inside a render pass");
        }
        self.recording = false;
        Ok(())
    }

    pub(crate) fn begin_render_pass(&mut self) -> Result<()> {
        self.require_recording("begin_render_pass")?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Render pass already active");
        }
        self.in_render_pass = true;
        Ok(())
    }

    pub(crate) fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass("end_render_pass")?;
        self.in_render_pass = false;
        Ok(())
    }

    pub(crate) fn require_recording(&self, command: &str) -> Result<()> {
        if !self.recording {
            engine_bail!(SOURCE, "{}: command list not recording", command);
        }
        Ok(())
    }

    pub(crate) fn require_render_pass(&self, command: &str) -> Result<()> {
        self.require_recording(command)?;
        if !self.in_render_pass {
            engine_bail!(SOURCE, "{}: no active render pass", command);
        }
        Ok(())
    }

    /// Recording finished and ready to submit
    pub(crate) fn is_executable(&self) -> bool {
        !self.recording && !self.in_render_pass
    }
}

/// Vulkan command list implementation
pub struct CommandList {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    state: RecordingState,
}

impl CommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let command_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        unsafe {
            let command_pool = ctx
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) if !buffers.is_empty() => buffers[0],
                Ok(_) | Err(_) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    engine_bail!(SOURCE, "Failed to allocate command buffer");
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer,
                state: RecordingState::default(),
            })
        }
    }

    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub(crate) fn is_executable(&self) -> bool {
        self.state.is_executable()
    }
}

fn clear_value_to_vk(clear: &ClearValue) -> vk::ClearValue {
    match *clear {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        self.state.begin()?;
        unsafe {
            let result = self
                .ctx
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .and_then(|_| {
                    let begin_info = vk::CommandBufferBeginInfo::default()
                        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                    self.ctx.device.begin_command_buffer(self.command_buffer, &begin_info)
                });
            if let Err(e) = result {
                self.state = RecordingState::default();
                engine_bail!(SOURCE, "Failed to begin command buffer: {:?}", e);
            }
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.state.end()?;
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))
        }
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RendererRenderPass>,
        framebuffer: &Arc<dyn RendererFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        let attachment_count = render_pass.attachment_formats().len();
        if clear_values.len() != attachment_count {
            engine_bail!(SOURCE, "begin_render_pass: {} clear values for {} attachments",
                clear_values.len(), attachment_count);
        }
        self.state.begin_render_pass()?;

        let vk_render_pass = RenderPass::from_dyn(render_pass);
        let vk_framebuffer = Framebuffer::from_dyn(framebuffer);
        let vk_clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.state.end_render_pass()?;
        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.state.require_recording("set_viewport")?;
        let vk_viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.state.require_recording("set_scissor")?;
        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.state.require_render_pass("bind_pipeline")?;
        let vk_pipeline = Pipeline::from_dyn(pipeline);
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        binding_group: &Arc<dyn RendererBindingGroup>,
    ) -> Result<()> {
        self.state.require_recording("bind_binding_group")?;
        let set_index = binding_group.set_index();
        if set_index as usize >= pipeline.binding_group_layouts().len() {
            engine_bail!(SOURCE, "bind_binding_group: set {} out of range for pipeline '{}'",
                set_index, pipeline.name());
        }
        let vk_pipeline = Pipeline::from_dyn(pipeline);
        let vk_binding_group = BindingGroup::from_dyn(binding_group);
        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.layout,
                set_index,
                &[vk_binding_group.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.state.require_recording("push_constants")?;
        if !pipeline.push_constant_stages().contains(stages) {
            engine_bail!(SOURCE, "push_constants: stages {:?} not declared by pipeline '{}'",
                stages, pipeline.name());
        }
        let vk_pipeline = Pipeline::from_dyn(pipeline);
        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                vk_pipeline.layout,
                stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.state.require_recording("bind_vertex_buffer")?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.state.require_recording("bind_index_buffer")?;
        let vk_buffer = unsafe { &*(Arc::as_ptr(buffer) as *const Buffer) };
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.state.require_render_pass("draw")?;
        unsafe {
            self.ctx.device.cmd_draw(self.command_buffer, vertex_count, 1, first_vertex, 0);
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.state.require_render_pass("draw_indexed")?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(self.command_buffer, index_count, 1, first_index, vertex_offset, 0);
        }
        Ok(())
    }

    fn begin_label(&mut self, name: &str) {
        let Some(debug_utils) = &self.ctx.debug_utils else {
            return;
        };
        let Ok(label_name) = CString::new(name) else {
            engine_warn!(SOURCE, "Debug label '{}' contains a NUL byte", name.escape_debug());
            return;
        };
        let label = vk::DebugUtilsLabelEXT::default().label_name(&label_name);
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(self.command_buffer, &label);
        }
    }

    fn end_label(&mut self) {
        if let Some(debug_utils) = &self.ctx.debug_utils {
            unsafe {
                debug_utils.cmd_end_debug_utils_label(self.command_buffer);
            }
        }
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_command_list_tests.rs"]
mod tests;
