/// Render pass trait and render pass descriptor
///
/// A render pass declares its attachments and, explicitly, every memory
/// dependency with the work recorded before and after it. Nothing else orders
/// a write in one pass against a read in the next.

use bitflags::bitflags;
use crate::renderer::TextureFormat;

/// Render pass trait
pub trait RenderPass: Send + Sync {
    /// Formats of the color attachments, in attachment order
    fn color_formats(&self) -> &[TextureFormat];

    /// Format of the depth attachment, if any
    fn depth_format(&self) -> Option<TextureFormat>;

    /// Color attachment count (pipelines need one blend state per attachment)
    fn color_attachment_count(&self) -> usize {
        self.color_formats().len()
    }

    /// All attachment formats, colors first then depth (framebuffer order)
    fn attachment_formats(&self) -> Vec<TextureFormat> {
        let mut formats = self.color_formats().to_vec();
        formats.extend(self.depth_format());
        formats
    }
}

/// Descriptor for a single attachment
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
    /// Attachment is only read (VK_ATTACHMENT_STORE_OP_NONE)
    None,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}

/// Endpoint of a subpass dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    /// Commands outside the render pass (VK_SUBPASS_EXTERNAL)
    External,
    /// Subpass index
    Index(u32),
}

bitflags! {
    /// Pipeline stages for dependency scopes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 0x0001;
        const VERTEX_SHADER = 0x0008;
        const FRAGMENT_SHADER = 0x0080;
        const EARLY_FRAGMENT_TESTS = 0x0100;
        const LATE_FRAGMENT_TESTS = 0x0200;
        const COLOR_ATTACHMENT_OUTPUT = 0x0400;
        const TRANSFER = 0x1000;
        const BOTTOM_OF_PIPE = 0x2000;
    }

    /// Memory access types for dependency scopes
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 0x0020;
        const COLOR_ATTACHMENT_READ = 0x0080;
        const COLOR_ATTACHMENT_WRITE = 0x0100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x0200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x0400;
        const TRANSFER_READ = 0x0800;
        const TRANSFER_WRITE = 0x1000;
    }

    /// Dependency flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DependencyFlags: u32 {
        const BY_REGION = 0x0001;
    }
}

impl PipelineStages {
    pub const FRAGMENT_TESTS: Self = Self::EARLY_FRAGMENT_TESTS.union(Self::LATE_FRAGMENT_TESTS);
}

/// Execution + memory dependency between a subpass and the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: SubpassRef,
    pub dst_subpass: SubpassRef,
    pub src_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessFlags,
    pub flags: DependencyFlags,
}

/// Descriptor for creating a render pass with a single subpass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Debug name
    pub name: String,
    /// Color attachments in location order
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth attachment (always the last framebuffer attachment)
    pub depth_attachment: Option<AttachmentDesc>,
    /// Declared dependencies, passed to the backend verbatim
    pub dependencies: Vec<SubpassDependency>,
}
