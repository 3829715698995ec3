#![warn(clippy::all)]

//! A thin RHI (render hardware interface) abstraction.
//!
//! This crate defines the contract the render core needs from a modern
//! explicit graphics API without committing to one: buffers, images,
//! binding layouts/sets, bindless descriptor tables, pipelines, and a
//! command list with explicit resource-state tracking. `scene_core` is
//! generic over `&dyn Rhi`; a concrete backend (Vulkan, or the [`mock`]
//! backend used in tests) implements these traits.

pub mod access;
pub mod command;
pub mod error;
pub mod handle;
pub mod mock;
pub mod resource;

pub use access::{Access, BufferBarrier, ImageBarrier, ResourceTracker};
pub use command::{CommandList, RenderPassDesc, RenderTarget};
pub use error::RhiError;
pub use handle::{
    BindingLayoutHandle, BindingSetHandle, BufferHandle, ImageHandle, PipelineHandle,
    ShaderHandle,
};
pub use resource::{
    BindingKind, BindingLayoutDesc, BindingSetDesc, BindingSlot, BoundResource, BufferDesc,
    BufferUsage, ComputePipelineDesc, GraphicsPipelineDesc, ImageDesc, ImageUsage, ResourceState,
};

/// Create and cache RHI resources.
///
/// Pipeline creation is expected to be keyed internally by the full
/// descriptor hash, so callers may call `create_*_pipeline` repeatedly with
/// an identical descriptor in tight loops without fear of duplicate work.
pub trait Rhi {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle, RhiError>;
    fn resize_buffer(&self, buffer: BufferHandle, new_size: u64) -> Result<BufferHandle, RhiError>;
    fn destroy_buffer(&self, buffer: BufferHandle);

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle, RhiError>;
    fn destroy_image(&self, image: ImageHandle);

    fn create_binding_layout(
        &self,
        desc: &BindingLayoutDesc,
    ) -> Result<BindingLayoutHandle, RhiError>;

    fn create_binding_set(&self, desc: &BindingSetDesc) -> Result<BindingSetHandle, RhiError>;

    fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<PipelineHandle, RhiError>;

    fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineHandle, RhiError>;

    /// Compile (or fetch from cache) the shader at `path` with the given
    /// preprocessor macro set. Returns `Ok(None)` while compilation is
    /// still in flight on the shader library's worker pool.
    fn load_shader(&self, path: &str, macros: &[&str]) -> Result<Option<ShaderHandle>, RhiError>;

    /// `true` if any shader load is still pending on the worker pool.
    fn has_pending_shader_compiles(&self) -> bool;

    fn command_list(&self) -> Box<dyn CommandList>;

    /// Submit a command list and block until it retires. Called once at the
    /// end of every frame (the frame-end fence wait) and, separately, by the
    /// Readback Service's one-shot staging copy -- those are the only two
    /// blocking operations on the CPU side.
    fn submit_wait_idle(&self, commands: Box<dyn CommandList>) -> Result<(), RhiError>;
}
