use scene_math::prelude::*;
use scene_res::Handle;
use scene_rhi::{BindingLayoutHandle, BindingSetHandle, BufferHandle, ShaderHandle};

/// One contiguous index range of a [`Mesh`], drawn with a single material.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub start_index: u32,
    pub index_count: u32,
    pub material_index: usize,
}

/// Plain geometry data plus a readiness flag -- no `std::visit`-style
/// dispatch over a vertex-format variant; skinned meshes are just a second
/// concrete struct selected by [`Mesh::is_skinned`].
#[derive(Debug, Clone)]
pub struct Mesh {
    pub local_aabb: Aabb,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub surfaces: Vec<Surface>,
    /// The mesh's own material per slot; `Surface::material_index` indexes
    /// into this. A `StaticMeshComponent`/`SkeletalMeshComponent` override
    /// at the same slot takes precedence: "override slot -> mesh slot ->
    /// engine default" is the fallback chain draw compilation follows.
    pub material_slots: Vec<Handle<Material>>,
    pub ready_for_render: bool,
    pub skinned: bool,
}

impl Mesh {
    pub fn aabb(&self) -> Aabb {
        self.local_aabb
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    pub fn geometry_surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn material_at_slot(&self, slot: usize) -> Option<Handle<Material>> {
        self.material_slots.get(slot).copied()
    }

    pub fn is_ready_for_render(&self) -> bool {
        self.ready_for_render
    }

    pub fn is_skinned(&self) -> bool {
        self.skinned
    }
}

/// A bound shader program plus its binding layout/set, extended with the
/// "ready" flag draw compilation consults when resolving the
/// material-fallback chain.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub vertex_shader: ShaderHandle,
    pub vertex_shader_skinned: ShaderHandle,
    pub pixel_shader: ShaderHandle,
    pub binding_set: BindingSetHandle,
    pub binding_layout: BindingLayoutHandle,
    pub ready_for_render: bool,
}

impl Material {
    pub fn vertex_shader(&self, skinned: bool) -> ShaderHandle {
        if skinned {
            self.vertex_shader_skinned
        } else {
            self.vertex_shader
        }
    }

    pub fn pixel_shader(&self) -> ShaderHandle {
        self.pixel_shader
    }

    pub fn binding_set(&self) -> BindingSetHandle {
        self.binding_set
    }

    pub fn binding_layout(&self) -> BindingLayoutHandle {
        self.binding_layout
    }

    pub fn is_ready_for_render(&self) -> bool {
        self.ready_for_render
    }
}
