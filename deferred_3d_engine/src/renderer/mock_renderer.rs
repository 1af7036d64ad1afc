/// Mock Renderer for unit tests (no GPU required)
///
/// Every mock object shares one `MockState`, so a test can create passes
/// against a `MockRenderer`, run frames, and then inspect the recorded
/// commands, buffer contents, live textures and binding group references.

#[cfg(test)]
use std::any::Any;
#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use winit::window::Window;

#[cfg(test)]
use crate::renderer::{
    Renderer, Buffer, Texture, Shader, Pipeline, CommandList,
    RenderPass, Swapchain, BindingGroup, Framebuffer,
    BufferDesc, TextureDesc, ShaderDesc, ShaderStage, ShaderStageFlags, PipelineDesc,
    BindingResource, BindingGroupLayoutDesc,
    RenderPassDesc, FramebufferDesc, Viewport, Rect2D,
    ClearValue, IndexType, TextureInfo, TextureFormat, TextureUsage,
    AcquireOutcome, PresentOutcome, RendererStats, SubpassDependency,
    next_texture_id, validate_framebuffer_desc,
};
#[cfg(test)]
use crate::error::Result;
#[cfg(test)]
use crate::engine_bail;

#[cfg(test)]
static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1);

#[cfg(test)]
fn next_mock_id() -> u64 {
    NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Shared state
// ============================================================================

/// Everything the mock objects record
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockState {
    /// Commands recorded by every command list, in order
    pub commands: Vec<String>,
    pub created_textures: Vec<String>,
    pub created_buffers: Vec<String>,
    pub created_shaders: Vec<String>,
    pub created_pipelines: Vec<String>,
    pub created_render_passes: Vec<String>,
    pub created_framebuffers: u32,
    /// Texture ids referenced by each binding group id
    pub binding_group_textures: HashMap<u64, Vec<u64>>,
    /// Buffer ids referenced by each binding group id
    pub binding_group_buffers: HashMap<u64, Vec<u64>>,
    /// (image_index, frame_slot) of every submitted frame
    pub submissions: Vec<(u32, usize)>,
    pub waited_slots: Vec<usize>,
    pub wait_idle_calls: u32,
    /// Number of upcoming acquires that report OutOfDate
    pub out_of_date_acquires: u32,
    /// Number of upcoming presents that report OutOfDate
    pub out_of_date_presents: u32,
    pub swapchain_recreations: Vec<(u32, u32)>,
}

// ============================================================================
// Mock Buffer
// ============================================================================

/// Buffer that keeps its contents in memory
#[cfg(test)]
#[derive(Debug)]
pub struct MockBuffer {
    pub id: u64,
    pub name: String,
    pub contents: Mutex<Vec<u8>>,
}

#[cfg(test)]
impl MockBuffer {
    pub fn new(size: u64, name: String) -> Self {
        Self {
            id: next_mock_id(),
            name,
            contents: Mutex::new(vec![0u8; size as usize]),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.contents.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.contents.lock().unwrap().len() as u64
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut contents = self.contents.lock().unwrap();
        let end = offset as usize + data.len();
        if end > contents.len() {
            engine_bail!("deferred3d::mock",
                "Buffer '{}' update out of range: {} > {}", self.name, end, contents.len());
        }
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

/// Texture registered in the live set until dropped
#[cfg(test)]
pub struct MockTexture {
    pub id: u64,
    pub name: String,
    pub info: TextureInfo,
    live: Arc<Mutex<HashSet<u64>>>,
}

#[cfg(test)]
impl MockTexture {
    pub fn new(name: String, info: TextureInfo, live: Arc<Mutex<HashSet<u64>>>) -> Self {
        let id = next_texture_id();
        live.lock().unwrap().insert(id);
        Self { id, name, info, live }
    }
}

#[cfg(test)]
impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
impl Drop for MockTexture {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&self.id);
        }
    }
}

// ============================================================================
// Mock Shader / Pipeline / RenderPass / Framebuffer / BindingGroup
// ============================================================================

#[cfg(test)]
pub struct MockShader {
    pub name: String,
    pub stage: ShaderStage,
}

#[cfg(test)]
impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

#[cfg(test)]
pub struct MockPipeline {
    pub name: String,
    pub stages: Vec<ShaderStage>,
    pub color_blend_count: usize,
    pub layouts: Vec<BindingGroupLayoutDesc>,
    pub push_stages: ShaderStageFlags,
}

#[cfg(test)]
impl Pipeline for MockPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn binding_group_layouts(&self) -> &[BindingGroupLayoutDesc] {
        &self.layouts
    }

    fn push_constant_stages(&self) -> ShaderStageFlags {
        self.push_stages
    }
}

#[cfg(test)]
pub struct MockRenderPass {
    pub name: String,
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub dependencies: Vec<SubpassDependency>,
}

#[cfg(test)]
impl RenderPass for MockRenderPass {
    fn color_formats(&self) -> &[TextureFormat] {
        &self.color_formats
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        self.depth_format
    }
}

#[cfg(test)]
pub struct MockFramebuffer {
    pub width: u32,
    pub height: u32,
    pub attachments: Vec<Arc<dyn Texture>>,
}

#[cfg(test)]
impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachments(&self) -> &[Arc<dyn Texture>] {
        &self.attachments
    }
}

#[cfg(test)]
pub struct MockBindingGroup {
    pub id: u64,
    pub set_index: u32,
    /// Number of entries in the layout it was allocated from
    pub entry_count: usize,
}

#[cfg(test)]
impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

/// Command list appending a text line per command to the shared log
#[cfg(test)]
pub struct MockCommandList {
    state: Arc<Mutex<MockState>>,
    recording: bool,
}

#[cfg(test)]
impl MockCommandList {
    pub fn new(state: Arc<Mutex<MockState>>) -> Self {
        Self { state, recording: false }
    }

    fn record(&self, command: String) {
        self.state.lock().unwrap().commands.push(command);
    }
}

#[cfg(test)]
impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("deferred3d::mock", "Command list already recording");
        }
        self.recording = true;
        self.record("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            engine_bail!("deferred3d::mock", "Command list not recording");
        }
        self.recording = false;
        self.record("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        if framebuffer.attachment_formats() != render_pass.attachment_formats() {
            engine_bail!("deferred3d::mock", "Framebuffer does not match render pass");
        }
        if clear_values.len() != render_pass.attachment_formats().len() {
            engine_bail!("deferred3d::mock",
                "Expected {} clear values, got {}",
                render_pass.attachment_formats().len(), clear_values.len());
        }
        self.record(format!("begin_render_pass:{}x{}", framebuffer.width(), framebuffer.height()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.record("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.record(format!("set_viewport:{}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.record(format!("set_scissor:{}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.record(format!("bind_pipeline:{}", pipeline.name()));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        let group = binding_group.as_ref() as *const dyn BindingGroup as *const MockBindingGroup;
        // Every binding group handed out by MockRenderer is a MockBindingGroup
        let group = unsafe { &*group };
        self.record(format!("bind_binding_group:{}", group.id));
        Ok(())
    }

    fn push_constants(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.record(format!("push_constants:{:?}:{}:{}", stages.bits(), offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.record(format!("bind_vertex_buffer:{}", buffer.size()));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.record(format!("bind_index_buffer:{}:{:?}", buffer.size(), index_type));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.record(format!("draw:{}", vertex_count));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.record(format!("draw_indexed:{}", index_count));
        Ok(())
    }

    fn begin_label(&mut self, name: &str) {
        self.record(format!("begin_label:{}", name));
    }

    fn end_label(&mut self) {
        self.record("end_label".to_string());
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

#[cfg(test)]
pub struct MockSwapchain {
    state: Arc<Mutex<MockState>>,
    width: u32,
    height: u32,
    images: Vec<Arc<dyn Texture>>,
    next_image: u32,
    live: Arc<Mutex<HashSet<u64>>>,
}

#[cfg(test)]
impl MockSwapchain {
    pub const FORMAT: TextureFormat = TextureFormat::B8G8R8A8_SRGB;

    pub fn new(renderer: &MockRenderer, width: u32, height: u32, image_count: u32) -> Self {
        let mut swapchain = Self {
            state: Arc::clone(&renderer.state),
            width,
            height,
            images: Vec::new(),
            next_image: 0,
            live: Arc::clone(&renderer.live_textures),
        };
        swapchain.create_images(image_count as usize);
        swapchain
    }

    fn create_images(&mut self, count: usize) {
        self.images = (0..count)
            .map(|i| {
                let info = TextureInfo {
                    width: self.width,
                    height: self.height,
                    format: Self::FORMAT,
                    usage: TextureUsage::COLOR_ATTACHMENT,
                    array_layers: 1,
                    mip_levels: 1,
                    cube_compatible: false,
                };
                Arc::new(MockTexture::new(format!("swapchain_{}", i), info, Arc::clone(&self.live)))
                    as Arc<dyn Texture>
            })
            .collect();
    }
}

#[cfg(test)]
impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, _frame_slot: usize) -> Result<AcquireOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.out_of_date_acquires > 0 {
            state.out_of_date_acquires -= 1;
            return Ok(AcquireOutcome::OutOfDate);
        }
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images.len() as u32;
        Ok(AcquireOutcome::Image(index))
    }

    fn present(&mut self, _image_index: u32) -> Result<PresentOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.out_of_date_presents > 0 {
            state.out_of_date_presents -= 1;
            return Ok(PresentOutcome::OutOfDate);
        }
        Ok(PresentOutcome::Presented)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.state.lock().unwrap().swapchain_recreations.push((width, height));
        self.width = width;
        self.height = height;
        let count = self.images.len();
        self.create_images(count);
        self.next_image = 0;
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        Self::FORMAT
    }

    fn images(&self) -> Vec<Arc<dyn Texture>> {
        self.images.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Renderer
// ============================================================================

/// Mock Renderer that tracks created resources without GPU
#[cfg(test)]
pub struct MockRenderer {
    pub state: Arc<Mutex<MockState>>,
    /// Ids of textures not yet dropped
    pub live_textures: Arc<Mutex<HashSet<u64>>>,
    /// Layout entry count of each binding group id
    group_entries: HashMap<u64, usize>,
}

#[cfg(test)]
impl MockRenderer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            live_textures: Arc::new(Mutex::new(HashSet::new())),
            group_entries: HashMap::new(),
        }
    }

    /// Snapshot of the command log
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.lock().unwrap().commands.clear();
    }

    pub fn is_texture_live(&self, id: u64) -> bool {
        self.live_textures.lock().unwrap().contains(&id)
    }

    fn record_group_resources(&self, group_id: u64, resources: &[BindingResource]) {
        let textures = resources.iter().flat_map(|r| r.texture_ids()).collect();
        let buffers = resources
            .iter()
            .filter_map(|r| match r {
                BindingResource::UniformBuffer(buffer) => {
                    let buffer = *buffer as *const dyn Buffer as *const MockBuffer;
                    // Every buffer handed out by MockRenderer is a MockBuffer
                    Some(unsafe { &*buffer }.id)
                }
                _ => None,
            })
            .collect();
        let mut state = self.state.lock().unwrap();
        state.binding_group_textures.insert(group_id, textures);
        state.binding_group_buffers.insert(group_id, buffers);
    }
}

#[cfg(test)]
impl Renderer for MockRenderer {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("deferred3d::mock", "Texture '{}' has a zero extent", desc.name);
        }
        self.state.lock().unwrap().created_textures.push(desc.name.clone());
        let info = TextureInfo::from_desc(&desc);
        Ok(Arc::new(MockTexture::new(desc.name, info, Arc::clone(&self.live_textures))))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.state.lock().unwrap().created_buffers.push(desc.name.clone());
        Ok(Arc::new(MockBuffer::new(desc.size, desc.name)))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        self.state.lock().unwrap().created_shaders.push(desc.name.to_string());
        Ok(Arc::new(MockShader { name: desc.name.to_string(), stage: desc.stage }))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if desc.color_blends.len() != desc.render_pass.color_attachment_count() {
            engine_bail!("deferred3d::mock",
                "Pipeline '{}': {} blend states for {} color attachments",
                desc.name, desc.color_blends.len(), desc.render_pass.color_attachment_count());
        }
        let push_stages = desc
            .push_constant_ranges
            .iter()
            .fold(ShaderStageFlags::empty(), |acc, range| acc | range.stages);
        self.state.lock().unwrap().created_pipelines.push(desc.name.clone());
        Ok(Arc::new(MockPipeline {
            name: desc.name,
            stages: desc.shaders.iter().map(|s| s.stage()).collect(),
            color_blend_count: desc.color_blends.len(),
            layouts: desc.binding_group_layouts,
            push_stages,
        }))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.state.lock().unwrap().created_render_passes.push(desc.name.clone());
        Ok(Arc::new(MockRenderPass {
            name: desc.name.clone(),
            color_formats: desc.color_attachments.iter().map(|a| a.format).collect(),
            depth_format: desc.depth_attachment.as_ref().map(|a| a.format),
            dependencies: desc.dependencies.clone(),
        }))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        validate_framebuffer_desc(desc)?;
        self.state.lock().unwrap().created_framebuffers += 1;
        Ok(Arc::new(MockFramebuffer {
            width: desc.width,
            height: desc.height,
            attachments: desc.attachments.clone(),
        }))
    }

    fn create_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        let Some(layout) = pipeline.binding_group_layouts().get(set_index as usize) else {
            engine_bail!("deferred3d::mock",
                "Pipeline '{}' has no binding group layout for set {}", pipeline.name(), set_index);
        };
        if layout.entries.len() != resources.len() {
            engine_bail!("deferred3d::mock",
                "Pipeline '{}' set {}: {} resources for {} layout entries",
                pipeline.name(), set_index, resources.len(), layout.entries.len());
        }
        let group = MockBindingGroup {
            id: next_mock_id(),
            set_index,
            entry_count: layout.entries.len(),
        };
        self.group_entries.insert(group.id, group.entry_count);
        self.record_group_resources(group.id, resources);
        Ok(Arc::new(group))
    }

    fn update_binding_group(
        &mut self,
        binding_group: &Arc<dyn BindingGroup>,
        resources: &[BindingResource],
    ) -> Result<()> {
        let group = binding_group.as_ref() as *const dyn BindingGroup as *const MockBindingGroup;
        // Every binding group handed out by MockRenderer is a MockBindingGroup
        let group = unsafe { &*group };
        match self.group_entries.get(&group.id) {
            Some(&count) if count == resources.len() => {}
            Some(&count) => {
                engine_bail!("deferred3d::mock",
                    "Binding group update: {} resources for {} entries", resources.len(), count);
            }
            None => engine_bail!("deferred3d::mock", "Unknown binding group {}", group.id),
        }
        self.record_group_resources(group.id, resources);
        Ok(())
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList::new(Arc::clone(&self.state))))
    }

    fn create_swapchain(&mut self, _window: &Window) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(MockSwapchain::new(self, 1280, 720, 3)))
    }

    fn wait_for_frame(&self, frame_slot: usize) -> Result<()> {
        self.state.lock().unwrap().waited_slots.push(frame_slot);
        Ok(())
    }

    fn submit_frame(
        &mut self,
        _commands: &dyn CommandList,
        swapchain: &dyn Swapchain,
        image_index: u32,
        frame_slot: usize,
    ) -> Result<()> {
        if swapchain.as_any().downcast_ref::<MockSwapchain>().is_none() {
            engine_bail!("deferred3d::mock", "submit_frame: foreign swapchain");
        }
        self.state.lock().unwrap().submissions.push((image_index, frame_slot));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.lock().unwrap().wait_idle_calls += 1;
        Ok(())
    }

    fn stats(&self) -> RendererStats {
        let state = self.state.lock().unwrap();
        RendererStats {
            frames_submitted: state.submissions.len() as u64,
            textures: self.live_textures.lock().unwrap().len() as u32,
            buffers: state.created_buffers.len() as u32,
            pipelines: state.created_pipelines.len() as u32,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_renderer_tests.rs"]
mod tests;
