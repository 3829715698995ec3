use std::collections::HashMap;

use crate::handle::{BufferHandle, ImageHandle};
use crate::resource::ResourceState;

/// A single resource access, recorded per pass.
#[derive(Debug, Clone, Copy)]
pub struct Access {
    pub state: ResourceState,
}

/// A barrier the scheduler must insert before a pass runs.
#[derive(Debug, Clone, Copy)]
pub struct BufferBarrier {
    pub buffer: BufferHandle,
    pub before: ResourceState,
    pub after: ResourceState,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub before: ResourceState,
    pub after: ResourceState,
}

/// Tracks the last-known state of every buffer and image touched so far in
/// the frame and emits barriers when a pass's declared accesses conflict
/// with the previous pass's.
///
/// This is the mechanism behind automatic barrier insertion between passes:
/// the depth pre-pass declares `DepthWrite` on the depth image, the
/// depth-pyramid pass declares `ShaderResource` on the same image, and
/// `ResourceTracker::access` returns the one barrier needed to bridge them.
#[derive(Default)]
pub struct ResourceTracker {
    buffers: HashMap<BufferHandle, ResourceState>,
    images: HashMap<ImageHandle, ResourceState>,
    /// While `true`, `access_buffer`/`access_image` record state but never
    /// emit a barrier — used for the "write scene buffers" pass, which
    /// disables automatic barriers for its batch of uploads and commits one
    /// barrier set at the end instead of one per write.
    pub automatic_barriers_enabled: bool,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self { buffers: HashMap::new(), images: HashMap::new(), automatic_barriers_enabled: true }
    }

    /// Record a pass's access to `buffer`, returning a barrier if the new
    /// state conflicts with the previously tracked one.
    pub fn access_buffer(
        &mut self,
        buffer: BufferHandle,
        access: Access,
    ) -> Option<BufferBarrier> {
        let previous = self.buffers.insert(buffer, access.state);
        if !self.automatic_barriers_enabled {
            return None;
        }
        match previous {
            Some(before) if before != access.state || access.state.writes() => {
                Some(BufferBarrier { buffer, before, after: access.state })
            }
            _ => None,
        }
    }

    pub fn access_image(&mut self, image: ImageHandle, access: Access) -> Option<ImageBarrier> {
        let previous = self.images.insert(image, access.state);
        if !self.automatic_barriers_enabled {
            return None;
        }
        match previous {
            Some(before) if before != access.state || access.state.writes() => {
                Some(ImageBarrier { image, before, after: access.state })
            }
            _ => None,
        }
    }

    /// Seed the tracker's view of `image`'s state without emitting a
    /// barrier, e.g. after a window resize recreates the resource.
    pub fn set_image_state(&mut self, image: ImageHandle, state: ResourceState) {
        self.images.insert(image, state);
    }

    pub fn set_buffer_state(&mut self, buffer: BufferHandle, state: ResourceState) {
        self.buffers.insert(buffer, state);
    }

    pub fn image_state(&self, image: ImageHandle) -> Option<ResourceState> {
        self.images.get(&image).copied()
    }

    pub fn buffer_state(&self, buffer: BufferHandle) -> Option<ResourceState> {
        self.buffers.get(&buffer).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn depth_write_to_shader_resource_emits_barrier() {
        let mut tracker = ResourceTracker::new();
        let depth = ImageHandle(0);

        let first = tracker.access_image(depth, Access { state: ResourceState::DepthWrite });
        assert!(first.is_none(), "first access has nothing to transition from");

        let second = tracker.access_image(depth, Access { state: ResourceState::ShaderResource });
        let barrier = second.expect("conflicting access must emit a barrier");
        assert_eq!(barrier.before, ResourceState::DepthWrite);
        assert_eq!(barrier.after, ResourceState::ShaderResource);
    }

    #[test]
    fn disabled_automatic_barriers_suppress_emission() {
        let mut tracker = ResourceTracker::new();
        let buffer = BufferHandle(0);
        tracker.automatic_barriers_enabled = false;

        tracker.access_buffer(buffer, Access { state: ResourceState::CopyDest });
        let barrier = tracker.access_buffer(buffer, Access { state: ResourceState::ShaderResource });
        assert!(barrier.is_none());
        assert_eq!(tracker.buffer_state(buffer), Some(ResourceState::ShaderResource));
    }
}
