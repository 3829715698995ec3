//! An in-memory software implementation of [`crate::Rhi`], used by
//! `scene_core`'s test suite and by the `headless_frame` demo. It performs
//! every write/copy/readback operation against plain `Vec<u8>` storage on
//! the CPU and records draw/dispatch calls for assertions; it never touches
//! a real graphics device.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::access::{Access, BufferBarrier, ImageBarrier, ResourceTracker};
use crate::command::{CommandList, RenderPassDesc};
use crate::error::RhiError;
use crate::handle::{
    BindingLayoutHandle, BindingSetHandle, BufferHandle, ImageHandle, PipelineHandle, ShaderHandle,
};
use crate::resource::{
    BindingLayoutDesc, BindingSetDesc, BufferDesc, ComputePipelineDesc, GraphicsPipelineDesc,
    ImageDesc, ImageFormat, ResourceState,
};
use crate::Rhi;

/// Bytes per texel for each format, so the mock's flat `Vec<u8>` backing
/// store is actually large enough for a full mip's worth of real data
/// (the readback tests write/read whole `Rg32Uint` texels, 8 bytes each).
fn bytes_per_texel(format: ImageFormat) -> usize {
    match format {
        ImageFormat::R32Float => 4,
        ImageFormat::Rg32Uint => 8,
        ImageFormat::D32Float => 4,
        ImageFormat::Rgba16Float => 8,
    }
}

struct MockBuffer {
    bytes: Vec<u8>,
}

struct MockImage {
    bytes: Vec<u8>,
}

#[derive(Default)]
struct State {
    buffers: HashMap<u32, MockBuffer>,
    images: HashMap<u32, MockImage>,
    next_buffer: u32,
    next_image: u32,
    next_layout: u32,
    next_set: u32,
    next_pipeline: u32,
    next_shader: u32,
}

/// A software [`Rhi`] backend for tests and the headless demo.
pub struct MockRhi {
    state: Rc<RefCell<State>>,
    /// Shader names reported as still compiling; `load_shader` returns
    /// `Ok(None)` for these until removed via [`MockRhi::finish_compile`].
    pub pending_shaders: RefCell<Vec<String>>,
    /// Barriers the last submitted command list derived via
    /// `set_image_state`/`set_buffer_state`, captured in
    /// [`Rhi::submit_wait_idle`] before the list is dropped. Test-only
    /// introspection -- a real backend has no equivalent of "the last
    /// submission".
    last_image_barriers: RefCell<Vec<ImageBarrier>>,
    last_buffer_barriers: RefCell<Vec<BufferBarrier>>,
}

impl Default for MockRhi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRhi {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            pending_shaders: RefCell::new(Vec::new()),
            last_image_barriers: RefCell::new(Vec::new()),
            last_buffer_barriers: RefCell::new(Vec::new()),
        }
    }

    pub fn finish_compile(&self, path: &str) {
        self.pending_shaders.borrow_mut().retain(|pending| pending != path);
    }

    pub fn buffer_bytes(&self, handle: BufferHandle) -> Vec<u8> {
        self.state.borrow().buffers[&handle.0].bytes.clone()
    }

    pub fn image_bytes(&self, handle: ImageHandle) -> Vec<u8> {
        self.state.borrow().images[&handle.0].bytes.clone()
    }

    /// Barriers the most recently submitted command list derived for
    /// images, in emission order.
    pub fn last_image_barriers(&self) -> Vec<ImageBarrier> {
        self.last_image_barriers.borrow().clone()
    }

    /// Barriers the most recently submitted command list derived for
    /// buffers, in emission order.
    pub fn last_buffer_barriers(&self) -> Vec<BufferBarrier> {
        self.last_buffer_barriers.borrow().clone()
    }
}

impl Rhi for MockRhi {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<BufferHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_buffer;
        state.next_buffer += 1;
        state.buffers.insert(id, MockBuffer { bytes: vec![0u8; desc.size as usize] });
        Ok(BufferHandle(id))
    }

    fn resize_buffer(&self, buffer: BufferHandle, new_size: u64) -> Result<BufferHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_buffer;
        state.next_buffer += 1;
        state.buffers.insert(id, MockBuffer { bytes: vec![0u8; new_size as usize] });
        state.buffers.remove(&buffer.0);
        Ok(BufferHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.borrow_mut().buffers.remove(&buffer.0);
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_image;
        state.next_image += 1;
        let texel_count = (desc.width * desc.height * desc.layers.max(1)) as usize;
        state.images.insert(id, MockImage { bytes: vec![0u8; texel_count * bytes_per_texel(desc.format)] });
        Ok(ImageHandle(id))
    }

    fn destroy_image(&self, image: ImageHandle) {
        self.state.borrow_mut().images.remove(&image.0);
    }

    fn create_binding_layout(
        &self,
        _desc: &BindingLayoutDesc,
    ) -> Result<BindingLayoutHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_layout;
        state.next_layout += 1;
        Ok(BindingLayoutHandle(id))
    }

    fn create_binding_set(&self, _desc: &BindingSetDesc) -> Result<BindingSetHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_set;
        state.next_set += 1;
        Ok(BindingSetHandle(id))
    }

    fn create_compute_pipeline(
        &self,
        _desc: &ComputePipelineDesc,
    ) -> Result<PipelineHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_pipeline;
        state.next_pipeline += 1;
        Ok(PipelineHandle(id))
    }

    fn create_graphics_pipeline(
        &self,
        _desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineHandle, RhiError> {
        let mut state = self.state.borrow_mut();
        let id = state.next_pipeline;
        state.next_pipeline += 1;
        Ok(PipelineHandle(id))
    }

    fn load_shader(&self, path: &str, _macros: &[&str]) -> Result<Option<ShaderHandle>, RhiError> {
        if self.pending_shaders.borrow().iter().any(|pending| pending == path) {
            return Ok(None);
        }
        let mut state = self.state.borrow_mut();
        let id = state.next_shader;
        state.next_shader += 1;
        Ok(Some(ShaderHandle(id)))
    }

    fn has_pending_shader_compiles(&self) -> bool {
        !self.pending_shaders.borrow().is_empty()
    }

    fn command_list(&self) -> Box<dyn CommandList> {
        Box::new(MockCommandList { state: self.state.clone(), ..MockCommandList::empty() })
    }

    fn submit_wait_idle(&self, mut commands: Box<dyn CommandList>) -> Result<(), RhiError> {
        *self.last_image_barriers.borrow_mut() = commands.emitted_image_barriers();
        *self.last_buffer_barriers.borrow_mut() = commands.emitted_buffer_barriers();
        commands.close();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedDispatch {
    pub groups: (u32, u32, u32),
}

#[derive(Debug, Clone)]
pub struct RecordedDraw {
    pub draw_count: u32,
}

/// A command list that applies every write/copy/draw synchronously against
/// the shared storage of the [`MockRhi`] that issued it.
pub struct MockCommandList {
    state: Rc<RefCell<State>>,
    pub automatic_barriers: bool,
    pub dispatches: Vec<RecordedDispatch>,
    pub draws: Vec<RecordedDraw>,
    /// Drives `set_image_state`/`set_buffer_state`: records each access and
    /// derives the barrier needed to bridge it with the previous one, per
    /// spec.md §5's automatic-barrier-insertion ordering guarantees.
    tracker: ResourceTracker,
    emitted_image_barriers: Vec<ImageBarrier>,
    emitted_buffer_barriers: Vec<BufferBarrier>,
}

impl MockCommandList {
    fn empty() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            automatic_barriers: true,
            dispatches: Vec::new(),
            draws: Vec::new(),
            tracker: ResourceTracker::new(),
            emitted_image_barriers: Vec::new(),
            emitted_buffer_barriers: Vec::new(),
        }
    }
}

impl CommandList for MockCommandList {
    fn open(&mut self) {}
    fn close(&mut self) {}

    fn set_buffer_state(&mut self, buffer: BufferHandle, state: ResourceState) {
        self.tracker.automatic_barriers_enabled = self.automatic_barriers;
        if let Some(barrier) = self.tracker.access_buffer(buffer, Access { state }) {
            self.emitted_buffer_barriers.push(barrier);
        }
    }

    fn set_image_state(&mut self, image: ImageHandle, state: ResourceState) {
        self.tracker.automatic_barriers_enabled = self.automatic_barriers;
        if let Some(barrier) = self.tracker.access_image(image, Access { state }) {
            self.emitted_image_barriers.push(barrier);
        }
    }

    fn commit_barriers(&mut self) {}

    fn emitted_image_barriers(&self) -> Vec<ImageBarrier> {
        self.emitted_image_barriers.clone()
    }

    fn emitted_buffer_barriers(&self) -> Vec<BufferBarrier> {
        self.emitted_buffer_barriers.clone()
    }

    fn enable_automatic_barriers(&mut self, enabled: bool) {
        self.automatic_barriers = enabled;
    }

    fn set_enable_uav_barriers_for_image(&mut self, _image: ImageHandle, _enabled: bool) {}

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let storage = &mut state.buffers.get_mut(&buffer.0).expect("write to unknown buffer").bytes;
        let start = offset as usize;
        storage[start..start + data.len()].copy_from_slice(data);
    }

    fn write_image(&mut self, image: ImageHandle, _mip: u32, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let storage = &mut state.images.get_mut(&image.0).expect("write to unknown image").bytes;
        storage[..data.len()].copy_from_slice(data);
    }

    fn copy_image(&mut self, src: ImageHandle, dst: ImageHandle) {
        let mut state = self.state.borrow_mut();
        let data = state.images[&src.0].bytes.clone();
        state.images.get_mut(&dst.0).expect("copy to unknown image").bytes = data;
    }

    fn copy_buffer(&mut self, src: BufferHandle, dst: BufferHandle, size: u64) {
        let mut state = self.state.borrow_mut();
        let data = state.buffers[&src.0].bytes[..size as usize].to_vec();
        state.buffers.get_mut(&dst.0).expect("copy to unknown buffer").bytes[..size as usize]
            .copy_from_slice(&data);
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, len: u64) -> Vec<u8> {
        let state = self.state.borrow();
        let storage = &state.buffers[&buffer.0].bytes;
        let start = offset as usize;
        storage[start..start + len as usize].to_vec()
    }

    fn read_image(&self, image: ImageHandle) -> Vec<u8> {
        self.state.borrow().images[&image.0].bytes.clone()
    }

    fn set_compute_state(&mut self, _pipeline: PipelineHandle, _binding_sets: &[BindingSetHandle]) {}

    fn set_graphics_state(
        &mut self,
        _pipeline: PipelineHandle,
        _binding_sets: &[BindingSetHandle],
        _pass: &RenderPassDesc,
    ) {
    }

    fn end_render_pass(&mut self) {}

    fn set_push_constants(&mut self, _data: &[u8]) {}

    fn dispatch(&mut self, groups_x: u32, groups_y: u32, groups_z: u32) {
        self.dispatches.push(RecordedDispatch { groups: (groups_x, groups_y, groups_z) });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.draws.push(RecordedDraw { draw_count: vertex_count * instance_count });
    }

    fn draw_indexed_indirect(&mut self, _args: BufferHandle, _offset: u64, draw_count: u32, _stride: u32) {
        self.draws.push(RecordedDraw { draw_count });
    }

    fn draw_indexed_indirect_count(
        &mut self,
        _args: BufferHandle,
        _offset: u64,
        _count_buffer: BufferHandle,
        _count_offset: u64,
        max_draw_count: u32,
        _stride: u32,
    ) {
        self.draws.push(RecordedDraw { draw_count: max_draw_count });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{BufferUsage, ResourceState as State};

    #[test]
    fn write_then_read_round_trips() {
        let rhi = MockRhi::new();
        let buffer = rhi
            .create_buffer(&BufferDesc {
                size: 16,
                stride: 4,
                usage: BufferUsage::STORAGE,
                initial_state: State::Undefined,
                keep_initial_state: false,
                debug_name: "test",
            })
            .unwrap();

        let mut commands = rhi.command_list();
        commands.write_buffer(buffer, 0, &[1, 2, 3, 4]);
        assert_eq!(commands.read_buffer(buffer, 0, 4), vec![1, 2, 3, 4]);
        assert_eq!(&rhi.buffer_bytes(buffer)[0..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn conflicting_image_states_emit_a_barrier_surfaced_through_submit() {
        let rhi = MockRhi::new();
        let image = rhi
            .create_image(&ImageDesc {
                width: 4,
                height: 4,
                layers: 1,
                mip_levels: 1,
                format: ImageFormat::D32Float,
                usage: crate::resource::ImageUsage::DEPTH_ATTACHMENT,
                initial_state: State::Undefined,
                keep_initial_state: false,
                debug_name: "depth",
            })
            .unwrap();

        let mut commands = rhi.command_list();
        commands.set_image_state(image, State::DepthWrite);
        commands.set_image_state(image, State::ShaderResource);
        commands.commit_barriers();
        rhi.submit_wait_idle(commands).unwrap();

        let barriers = rhi.last_image_barriers();
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].image, image);
        assert_eq!(barriers[0].before, State::DepthWrite);
        assert_eq!(barriers[0].after, State::ShaderResource);
    }
}
