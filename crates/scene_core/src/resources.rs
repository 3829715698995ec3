//! Owns every per-scene GPU buffer and image, resizes them on demand, and
//! rebuilds binding sets when backing storage changes. This is the whole
//! of the Resource Manager (spec.md §4.4).
//!
//! Grounded on the teacher's `ResourcePool`/`Res<T>` ownership model
//! (`src/resource.rs`) and the ash-generation `Scene::handle_resize`
//! (`src/scene.rs`), generalized from Vulkan descriptor sets to this
//! workspace's `scene_rhi::Rhi` trait.

use scene_rhi::{
    BindingKind, BindingLayoutDesc, BindingLayoutHandle, BindingSetDesc, BindingSetHandle,
    BindingSlot, BoundResource, BufferDesc, BufferHandle, BufferUsage, ImageDesc, ImageFormat,
    ImageHandle, ImageUsage, ResourceState, Rhi, RhiError,
};

use crate::depth_pyramid::DepthPyramid;

/// One CPU-sized buffer request against a possibly-undersized backing
/// buffer. [`ResourceManager::ensure_buffer`] reallocates at `required * 2`
/// when the backing buffer is too small, per spec.md §4.4's resize contract.
pub(crate) struct TrackedBuffer {
    handle: BufferHandle,
    capacity: u64,
    usage: BufferUsage,
    debug_name: &'static str,
}

impl TrackedBuffer {
    fn create(rhi: &dyn Rhi, usage: BufferUsage, debug_name: &'static str, initial_capacity: u64) -> Result<Self, RhiError> {
        let handle = rhi.create_buffer(&BufferDesc {
            size: initial_capacity,
            stride: 0,
            usage,
            initial_state: ResourceState::Undefined,
            keep_initial_state: false,
            debug_name,
        })?;
        Ok(Self { handle, capacity: initial_capacity, usage, debug_name })
    }

    /// Returns `true` if the buffer was reallocated (i.e. bindings need
    /// rebuilding).
    fn ensure(&mut self, rhi: &dyn Rhi, required: u64) -> Result<bool, RhiError> {
        if required <= self.capacity {
            return Ok(false);
        }
        let new_capacity = (required * 2).max(1);
        self.handle = rhi.resize_buffer(self.handle, new_capacity)?;
        self.capacity = new_capacity;
        log::debug!(
            "reallocated scene buffer '{}' ({:?}) to {new_capacity} bytes",
            self.debug_name,
            self.usage,
        );
        Ok(true)
    }
}

/// Every per-scene buffer the scene layout binds, per spec.md §4.4.
pub struct SceneBuffers {
    pub(crate) scene_globals: TrackedBuffer,
    pub(crate) light_data: TrackedBuffer,
    pub(crate) instances: TrackedBuffer,
    pub(crate) instance_mapping: TrackedBuffer,
    pub(crate) indirect: TrackedBuffer,
    pub(crate) bones: TrackedBuffer,
    pub(crate) clusters: TrackedBuffer,
    pub(crate) materials: TrackedBuffer,
    pub(crate) simple_vertices: TrackedBuffer,
}

macro_rules! buffer_accessor {
    ($name:ident) => {
        pub fn $name(&self) -> BufferHandle {
            self.$name.handle
        }
    };
}

impl SceneBuffers {
    fn create(rhi: &dyn Rhi) -> Result<Self, RhiError> {
        const INITIAL: u64 = 256;
        Ok(Self {
            scene_globals: TrackedBuffer::create(rhi, BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST, "scene_globals", INITIAL)?,
            light_data: TrackedBuffer::create(rhi, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST, "light_data", INITIAL)?,
            instances: TrackedBuffer::create(rhi, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST, "instances", INITIAL)?,
            instance_mapping: TrackedBuffer::create(rhi, BufferUsage::STORAGE, "instance_mapping", INITIAL)?,
            indirect: TrackedBuffer::create(
                rhi,
                BufferUsage::STORAGE | BufferUsage::INDIRECT | BufferUsage::TRANSFER_DST,
                "indirect_args",
                INITIAL,
            )?,
            bones: TrackedBuffer::create(rhi, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST, "bones", INITIAL)?,
            clusters: TrackedBuffer::create(rhi, BufferUsage::STORAGE, "clusters", INITIAL)?,
            materials: TrackedBuffer::create(rhi, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST, "materials", INITIAL)?,
            simple_vertices: TrackedBuffer::create(rhi, BufferUsage::VERTEX | BufferUsage::TRANSFER_DST, "simple_vertices", INITIAL)?,
        })
    }

    buffer_accessor!(scene_globals);
    buffer_accessor!(light_data);
    buffer_accessor!(instances);
    buffer_accessor!(instance_mapping);
    buffer_accessor!(indirect);
    buffer_accessor!(bones);
    buffer_accessor!(clusters);
    buffer_accessor!(materials);
    buffer_accessor!(simple_vertices);
}

/// Every per-scene image. `shadow_atlas` is config-driven and outlives
/// window resizes; the rest are recreated to the new extent.
pub struct SceneImages {
    pub hdr: ImageHandle,
    pub depth: ImageHandle,
    pub depth_pyramid: DepthPyramid,
    pub picker: ImageHandle,
    pub shadow_atlas: ImageHandle,
    pub csm: ImageHandle,
}

fn create_extent_images(rhi: &dyn Rhi, width: u32, height: u32, csm_resolution: u32, num_cascades: u32) -> Result<(ImageHandle, ImageHandle, DepthPyramid, ImageHandle, ImageHandle), RhiError> {
    let hdr = rhi.create_image(&ImageDesc {
        width,
        height,
        layers: 1,
        mip_levels: 1,
        format: ImageFormat::Rgba16Float,
        usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
        initial_state: ResourceState::Undefined,
        keep_initial_state: false,
        debug_name: "hdr",
    })?;

    let depth = rhi.create_image(&ImageDesc {
        width,
        height,
        layers: 1,
        mip_levels: 1,
        format: ImageFormat::D32Float,
        usage: ImageUsage::DEPTH_ATTACHMENT | ImageUsage::SAMPLED,
        initial_state: ResourceState::Undefined,
        keep_initial_state: false,
        debug_name: "depth",
    })?;

    let depth_pyramid = DepthPyramid::create(rhi, width, height)?;

    let picker = rhi.create_image(&ImageDesc {
        width,
        height,
        layers: 1,
        mip_levels: 1,
        format: ImageFormat::Rg32Uint,
        usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED | ImageUsage::TRANSFER_SRC,
        initial_state: ResourceState::Undefined,
        keep_initial_state: false,
        debug_name: "picker",
    })?;

    let csm = rhi.create_image(&ImageDesc {
        width: csm_resolution,
        height: csm_resolution,
        layers: num_cascades,
        mip_levels: 1,
        format: ImageFormat::D32Float,
        usage: ImageUsage::DEPTH_ATTACHMENT | ImageUsage::SAMPLED,
        initial_state: ResourceState::Undefined,
        keep_initial_state: false,
        debug_name: "csm_array",
    })?;

    Ok((hdr, depth, depth_pyramid, picker, csm))
}

/// Fixed set of slots the "scene" binding layout exposes, per spec.md §4.4
/// (12-15 slots: scene globals, light data, instances, ..., HDR SRV).
fn scene_layout_desc() -> BindingLayoutDesc {
    BindingLayoutDesc {
        debug_name: "scene_layout",
        slots: vec![
            BindingSlot { slot: 0, kind: BindingKind::UniformBuffer },
            BindingSlot { slot: 1, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 2, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 3, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 4, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 5, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 6, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 7, kind: BindingKind::StorageBuffer },
            BindingSlot { slot: 8, kind: BindingKind::SampledImage },
            BindingSlot { slot: 9, kind: BindingKind::SampledImage },
            BindingSlot { slot: 10, kind: BindingKind::SampledImage },
            BindingSlot { slot: 11, kind: BindingKind::SampledImage },
            BindingSlot { slot: 12, kind: BindingKind::SampledImage },
        ],
    }
}

fn bindless_layout_desc() -> BindingLayoutDesc {
    BindingLayoutDesc {
        debug_name: "bindless_textures",
        slots: vec![BindingSlot { slot: 0, kind: BindingKind::BindlessTextureArray }],
    }
}

/// Owns every per-scene GPU resource: all buffers and images in
/// [`SceneBuffers`]/[`SceneImages`], plus the two binding layouts from
/// spec.md §4.4 and the binding set built from them. Rebuilds the binding
/// set whenever a buffer/image reallocation made the old set's captured
/// handles stale.
pub struct ResourceManager {
    pub buffers: SceneBuffers,
    pub images: SceneImages,
    pub scene_layout: BindingLayoutHandle,
    pub bindless_layout: BindingLayoutHandle,
    pub scene_binding_set: BindingSetHandle,
    bindings_dirty: bool,
    csm_resolution: u32,
    num_cascades: u32,
}

impl ResourceManager {
    pub fn create(rhi: &dyn Rhi, width: u32, height: u32, shadow_atlas_resolution: u32, csm_resolution: u32, num_cascades: u32) -> Result<Self, RhiError> {
        let buffers = SceneBuffers::create(rhi)?;

        let (hdr, depth, depth_pyramid, picker, csm) = create_extent_images(rhi, width, height, csm_resolution, num_cascades)?;

        let shadow_atlas = rhi.create_image(&ImageDesc {
            width: shadow_atlas_resolution,
            height: shadow_atlas_resolution,
            layers: crate::shadow_atlas::LAYERS_PER_TILE,
            mip_levels: 1,
            format: ImageFormat::D32Float,
            usage: ImageUsage::DEPTH_ATTACHMENT | ImageUsage::SAMPLED,
            initial_state: ResourceState::Undefined,
            keep_initial_state: false,
            debug_name: "shadow_atlas",
        })?;

        let images = SceneImages { hdr, depth, depth_pyramid, picker, shadow_atlas, csm };

        let scene_layout = rhi.create_binding_layout(&scene_layout_desc())?;
        let bindless_layout = rhi.create_binding_layout(&bindless_layout_desc())?;
        let scene_binding_set = Self::build_binding_set(rhi, scene_layout, &buffers, &images)?;

        Ok(Self {
            buffers,
            images,
            scene_layout,
            bindless_layout,
            scene_binding_set,
            bindings_dirty: false,
            csm_resolution,
            num_cascades,
        })
    }

    fn build_binding_set(rhi: &dyn Rhi, layout: BindingLayoutHandle, buffers: &SceneBuffers, images: &SceneImages) -> Result<BindingSetHandle, RhiError> {
        rhi.create_binding_set(&BindingSetDesc {
            layout,
            bindings: vec![
                (0, BoundResource::Buffer(buffers.scene_globals())),
                (1, BoundResource::Buffer(buffers.light_data())),
                (2, BoundResource::Buffer(buffers.instances())),
                (3, BoundResource::Buffer(buffers.instance_mapping())),
                (4, BoundResource::Buffer(buffers.indirect())),
                (5, BoundResource::Buffer(buffers.bones())),
                (6, BoundResource::Buffer(buffers.clusters())),
                (7, BoundResource::Buffer(buffers.materials())),
                (8, BoundResource::Image(images.csm)),
                (9, BoundResource::Image(images.shadow_atlas)),
                (10, BoundResource::Image(images.picker)),
                (11, BoundResource::Image(images.depth_pyramid.image)),
                (12, BoundResource::Image(images.hdr)),
            ],
        })
    }

    /// Resize a CPU-sized array's backing buffer if it outgrew the current
    /// capacity, per spec.md §4.4: reallocate at `required * 2` and flag
    /// bindings dirty.
    pub(crate) fn ensure_capacity(&mut self, rhi: &dyn Rhi, select: impl Fn(&mut SceneBuffers) -> &mut TrackedBuffer, required_bytes: u64) -> Result<(), RhiError> {
        let buffer = select(&mut self.buffers);
        if buffer.ensure(rhi, required_bytes)? {
            self.bindings_dirty = true;
        }
        Ok(())
    }

    /// Called once per frame before uploads: rebuilds the scene binding set
    /// (and, transitively, the bindless table) if any buffer reallocated
    /// this frame, since binding sets capture the backing handle.
    pub fn rebuild_bindings_if_dirty(&mut self, rhi: &dyn Rhi) -> Result<(), RhiError> {
        if !self.bindings_dirty {
            return Ok(());
        }
        self.scene_binding_set = Self::build_binding_set(rhi, self.scene_layout, &self.buffers, &self.images)?;
        self.bindings_dirty = false;
        Ok(())
    }

    /// Recreate the HDR target, depth, depth pyramid, picker, and CSM array
    /// to the new extent; the shadow atlas is left unchanged, per spec.md
    /// §4.4's window-resize handler.
    pub fn notify_resize(&mut self, rhi: &dyn Rhi, width: u32, height: u32) -> Result<(), RhiError> {
        rhi.destroy_image(self.images.hdr);
        rhi.destroy_image(self.images.depth);
        rhi.destroy_image(self.images.depth_pyramid.image);
        rhi.destroy_image(self.images.picker);
        rhi.destroy_image(self.images.csm);

        let (hdr, depth, depth_pyramid, picker, csm) = create_extent_images(rhi, width, height, self.csm_resolution, self.num_cascades)?;
        self.images.hdr = hdr;
        self.images.depth = depth;
        self.images.depth_pyramid = depth_pyramid;
        self.images.picker = picker;
        self.images.csm = csm;

        self.bindings_dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use scene_rhi::mock::MockRhi;

    #[test]
    fn resource_manager_creates_every_buffer_and_image() {
        let rhi = MockRhi::new();
        let manager = ResourceManager::create(&rhi, 1920, 1080, 4096, 2048, 3).unwrap();
        assert_ne!(manager.buffers.scene_globals(), manager.buffers.light_data());
        assert_ne!(manager.images.hdr, manager.images.depth);
    }

    #[test]
    fn ensure_capacity_doubles_and_marks_bindings_dirty() {
        let rhi = MockRhi::new();
        let mut manager = ResourceManager::create(&rhi, 1920, 1080, 4096, 2048, 3).unwrap();
        let previous_set = manager.scene_binding_set;

        manager.ensure_capacity(&rhi, |buffers| &mut buffers.instances, 10_000).unwrap();
        manager.rebuild_bindings_if_dirty(&rhi).unwrap();

        assert_ne!(manager.scene_binding_set, previous_set, "reallocation must rebuild the binding set");
        assert!(manager.buffers.instances.capacity >= 10_000);
    }

    #[test]
    fn resize_preserves_shadow_atlas() {
        let rhi = MockRhi::new();
        let mut manager = ResourceManager::create(&rhi, 1920, 1080, 4096, 2048, 3).unwrap();
        let atlas = manager.images.shadow_atlas;
        manager.notify_resize(&rhi, 2560, 1440).unwrap();
        assert_eq!(manager.images.shadow_atlas, atlas, "window resize must not touch the config-driven atlas");
    }
}
