use crate::handle::{BindingLayoutHandle, BufferHandle, ImageHandle, ShaderHandle};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const VERTEX           = 1 << 0;
        const INDEX            = 1 << 1;
        const UNIFORM          = 1 << 2;
        const STORAGE          = 1 << 3;
        const INDIRECT         = 1 << 4;
        const TRANSFER_SRC     = 1 << 5;
        const TRANSFER_DST     = 1 << 6;
        const HOST_READBACK    = 1 << 7;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageUsage: u32 {
        const SAMPLED          = 1 << 0;
        const STORAGE          = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_ATTACHMENT = 1 << 3;
        const TRANSFER_SRC     = 1 << 4;
        const TRANSFER_DST     = 1 << 5;
    }
}

/// Resource state, tracked explicitly by every RHI method
/// (`setBufferState`/`setImageState`) rather than inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Undefined,
    CopyDest,
    CopySource,
    ShaderResource,
    UnorderedAccess,
    IndirectArgument,
    DepthWrite,
    DepthRead,
    RenderTarget,
    Present,
}

impl ResourceState {
    /// `true` for states that write the resource, used by the automatic
    /// barrier tracker to decide whether two accesses conflict.
    pub fn writes(self) -> bool {
        matches!(
            self,
            ResourceState::CopyDest
                | ResourceState::UnorderedAccess
                | ResourceState::DepthWrite
                | ResourceState::RenderTarget
        )
    }
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub size: u64,
    pub stride: u32,
    pub usage: BufferUsage,
    pub initial_state: ResourceState,
    /// If set, the backend must not transition the resource away from
    /// `initial_state` automatically; the owner manages it explicitly.
    pub keep_initial_state: bool,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    R32Float,
    Rg32Uint,
    D32Float,
    Rgba16Float,
}

#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    /// Array layers (cube faces, CSM cascades, shadow-atlas tile layers).
    pub layers: u32,
    pub mip_levels: u32,
    pub format: ImageFormat,
    pub usage: ImageUsage,
    pub initial_state: ResourceState,
    pub keep_initial_state: bool,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer,
    SampledImage,
    StorageImage,
    /// Dynamically-sized bindless texture array, visible to vertex and
    /// fragment stages.
    BindlessTextureArray,
}

#[derive(Debug, Clone, Copy)]
pub struct BindingSlot {
    pub slot: u32,
    pub kind: BindingKind,
}

#[derive(Debug, Clone)]
pub struct BindingLayoutDesc {
    pub slots: Vec<BindingSlot>,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum BoundResource {
    Buffer(BufferHandle),
    Image(ImageHandle),
    /// Backing images of a bindless texture array; empty slots are left
    /// unbound until populated by the Resource Manager.
    TextureArray,
}

#[derive(Debug, Clone)]
pub struct BindingSetDesc {
    pub layout: BindingLayoutHandle,
    pub bindings: Vec<(u32, BoundResource)>,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub shader: ShaderHandle,
    pub layouts: Vec<BindingLayoutHandle>,
    pub push_constant_bytes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Equal,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    LineList,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DepthBias {
    pub constant: f32,
    pub slope: f32,
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub vertex_shader: ShaderHandle,
    pub fragment_shader: Option<ShaderHandle>,
    pub layouts: Vec<BindingLayoutHandle>,
    pub push_constant_bytes: u32,
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub depth_compare: Option<CompareOp>,
    pub depth_write: bool,
    pub depth_bias: DepthBias,
    pub wireframe: bool,
    /// Bit `i` set means the draw targets array layer `i` in this pass, e.g.
    /// `0b111111` for a 6-face cube shadow pass or `(1<<NumCascades)-1` for
    /// CSM.
    pub view_mask: u32,
}
