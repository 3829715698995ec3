use crate::access::{BufferBarrier, ImageBarrier};
use crate::handle::{BindingSetHandle, BufferHandle, ImageHandle, PipelineHandle};
use crate::resource::ResourceState;

#[derive(Debug, Clone, Copy)]
pub enum LoadOp {
    Load,
    Clear,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub image: ImageHandle,
    pub load_op: LoadOp,
}

#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub color_targets: Vec<RenderTarget>,
    pub depth_target: Option<RenderTarget>,
    /// See [`crate::resource::GraphicsPipelineDesc::view_mask`].
    pub view_mask: u32,
    pub viewport: (u32, u32, u32, u32),
}

/// A recorded sequence of GPU commands with explicit resource-state
/// tracking.
///
/// Implementations are expected to batch barriers: `disable_automatic_barriers`
/// followed later by `enable_automatic_barriers` brackets a run of
/// `write_buffer`/`write_image` calls that should commit as one barrier set
/// rather than one per call (the Write Scene Buffers pass), and
/// `set_enable_uav_barriers_for_image` brackets the depth-pyramid's
/// per-mip reduction loop, where every mip barrier can be collapsed into
/// one pair at the loop's boundary.
pub trait CommandList {
    fn open(&mut self);
    fn close(&mut self);

    fn set_buffer_state(&mut self, buffer: BufferHandle, state: ResourceState);
    fn set_image_state(&mut self, image: ImageHandle, state: ResourceState);
    fn commit_barriers(&mut self);

    /// Barriers `set_image_state`/`set_buffer_state` derived since the list
    /// was opened, for test introspection. Backends that don't need this
    /// (every real backend) can keep the default no-op; only
    /// [`crate::mock::MockCommandList`] overrides it.
    fn emitted_image_barriers(&self) -> Vec<ImageBarrier> {
        Vec::new()
    }
    fn emitted_buffer_barriers(&self) -> Vec<BufferBarrier> {
        Vec::new()
    }

    fn enable_automatic_barriers(&mut self, enabled: bool);
    fn set_enable_uav_barriers_for_image(&mut self, image: ImageHandle, enabled: bool);

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);
    fn write_image(&mut self, image: ImageHandle, mip: u32, data: &[u8]);
    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle);
    /// Copy a buffer range to a host-readable staging buffer; used by the
    /// Readback Service and by the cull pass's phase count readback.
    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64);
    /// Map a host-visible buffer and read its bytes back. Only valid after
    /// the command list that wrote it has retired.
    fn read_buffer(&self, buffer: BufferHandle, offset: u64, len: u64) -> Vec<u8>;
    fn read_image(&self, image: ImageHandle) -> Vec<u8>;

    fn set_compute_state(&mut self, pipeline: PipelineHandle, binding_sets: &[BindingSetHandle]);
    fn set_graphics_state(
        &mut self,
        pipeline: PipelineHandle,
        binding_sets: &[BindingSetHandle],
        pass: &RenderPassDesc,
    );
    fn end_render_pass(&mut self);

    fn set_push_constants(&mut self, data: &[u8]);

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32);

    fn draw(&mut self, vertex_count: u32, instance_count: u32);
    fn draw_indexed_indirect(&mut self, args: BufferHandle, offset: u64, draw_count: u32, stride: u32);
    /// Draw using a count sourced from the GPU itself (the cull pass's
    /// atomically-incremented `DrawCount`), capped at `max_draw_count`.
    fn draw_indexed_indirect_count(
        &mut self,
        args: BufferHandle,
        offset: u64,
        count_buffer: BufferHandle,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    );
}
