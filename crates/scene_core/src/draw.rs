use std::collections::HashMap;

use scene_math::prelude::*;
use scene_res::Handle;
use scene_rhi::BufferHandle;
use scene_world::{Entity, Material, StaticMeshComponent, TransformComponent, World};

use crate::error::SceneError;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    pub struct InstanceFlags: u32 {
        const SELECTED        = 1 << 0;
        const CASTS_SHADOW    = 1 << 1;
        const RECEIVES_SHADOW = 1 << 2;
    }
}

/// One per surface-instance emitted by the compiler, per spec.md §3.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct InstanceRecord {
    pub world_transform: Mat4,
    pub bounding_sphere_center: Vec3,
    pub bounding_sphere_radius: f32,
    pub entity: u32,
    pub draw_command_index: u32,
    pub flags: InstanceFlags,
    /// Offset into the bone-palette buffer; `0` for static meshes.
    pub bone_offset: u32,
    /// Split `u64` device address for bindless vertex fetch; see
    /// [`split_address`].
    pub vertex_buffer_address: [u32; 2],
    pub index_buffer_address: [u32; 2],
}

/// The exact on-GPU draw-indirect struct, per spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct IndirectArgs {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// One unique `(material, vertex buffer, first index)` batch.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand {
    pub material: Handle<Material>,
    pub vertex_buffer: BufferHandle,
    pub first_index: u32,
    pub indirect_index: u32,
    pub skinned: bool,
}

/// Groups instances into one indirect draw. Deliberately excludes the
/// transform so identical surface+material combinations on different
/// entities fuse into one batch, per spec.md §4.2's batching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DrawKey {
    material: Handle<Material>,
    vertex_buffer: BufferHandle,
    first_index: u32,
}

/// Output of one `renderScene()` invocation's geometry pass: tightly packed
/// per-frame arrays plus the running bone-palette table for skinned meshes.
#[derive(Debug, Default)]
pub struct CompiledDraws {
    pub draw_commands: Vec<DrawCommand>,
    pub indirect_args: Vec<IndirectArgs>,
    pub instance_data: Vec<InstanceRecord>,
    pub bones_data: Vec<Mat4>,
}

impl CompiledDraws {
    pub fn clear(&mut self) {
        self.draw_commands.clear();
        self.indirect_args.clear();
        self.instance_data.clear();
        self.bones_data.clear();
    }
}

fn instance_flags(world: &dyn World, entity: Entity, casts_shadow: bool, receives_shadow: bool) -> InstanceFlags {
    let mut flags = InstanceFlags::empty();
    if world.is_selected(entity) {
        flags |= InstanceFlags::SELECTED;
    }
    if casts_shadow {
        flags |= InstanceFlags::CASTS_SHADOW;
    }
    if receives_shadow {
        flags |= InstanceFlags::RECEIVES_SHADOW;
    }
    flags
}

/// Resolves the material for one surface following spec.md §4.2's fallback
/// chain: per-instance override slot, then the mesh's own material slot,
/// then the engine default. A material that fails `is_ready_for_render` is
/// treated as absent and the chain continues.
fn resolve_material(
    world: &dyn World,
    mesh_slot: Option<Handle<Material>>,
    override_slot: Option<Handle<Material>>,
) -> Result<Handle<Material>, SceneError> {
    let ready = |handle: Handle<Material>| {
        world.materials().get(handle).map(Material::is_ready_for_render).unwrap_or(false)
    };

    if let Some(handle) = override_slot {
        if ready(handle) {
            return Ok(handle);
        }
    }

    if let Some(handle) = mesh_slot {
        if ready(handle) {
            return Ok(handle);
        }
    }

    let default = world.default_material();
    if !ready(default) {
        return Err(SceneError::InvariantViolation(
            "engine default material failed to resolve".into(),
        ));
    }
    Ok(default)
}

fn split_address(address: u64) -> [u32; 2] {
    [(address & 0xffff_ffff) as u32, (address >> 32) as u32]
}

/// Walks the world, batching visible primitives into draw commands and
/// per-instance records. This is the whole of the Draw Compiler
/// (spec.md §4.2).
///
/// Single traversal per mesh type: static meshes first, then skeletal. A
/// `DrawKey` lookup in a scratch hashmap decides whether an entity's
/// surface fuses into an existing [`DrawCommand`] or starts a new one;
/// after the traversal, `firstInstance` is assigned as the running prefix
/// sum of each command's `instanceCount`, which is then reset to 0 for the
/// GPU cull shader to atomically rebuild.
pub fn compile_draws(world: &dyn World, out: &mut CompiledDraws) -> Result<(), SceneError> {
    out.clear();

    let mut keys: HashMap<DrawKey, usize> = HashMap::new();

    let mut emit_static = |entity: Entity, mesh_component: &StaticMeshComponent, transform: &TransformComponent| -> Result<(), SceneError> {
        let Some(mesh) = world.meshes().get(mesh_component.mesh) else { return Ok(()) };
        if !mesh.is_ready_for_render() {
            return Ok(());
        }

        let world_aabb = mesh.aabb().transform(transform.world);
        let (center, radius) = world_aabb.bounding_sphere();
        let flags = instance_flags(world, entity, mesh_component.casts_shadow, mesh_component.receives_shadow);

        for (surface_index, surface) in mesh.geometry_surfaces().iter().enumerate() {
            let override_slot = mesh_component.material_overrides.get(surface_index).copied().flatten();
            let mesh_slot = mesh.material_at_slot(surface.material_index);
            let material = resolve_material(world, mesh_slot, override_slot)?;

            let key = DrawKey {
                material,
                vertex_buffer: mesh.vertex_buffer(),
                first_index: surface.start_index,
            };

            let command_index = *keys.entry(key).or_insert_with(|| {
                out.draw_commands.push(DrawCommand {
                    material,
                    vertex_buffer: mesh.vertex_buffer(),
                    first_index: surface.start_index,
                    indirect_index: out.indirect_args.len() as u32,
                    skinned: false,
                });
                out.indirect_args.push(IndirectArgs {
                    vertex_count: surface.index_count,
                    instance_count: 0,
                    first_vertex: surface.start_index,
                    first_instance: 0,
                });
                out.draw_commands.len() - 1
            });

            out.indirect_args[command_index].instance_count += 1;
            out.instance_data.push(InstanceRecord {
                world_transform: transform.world,
                bounding_sphere_center: center,
                bounding_sphere_radius: radius,
                entity,
                draw_command_index: command_index as u32,
                flags,
                bone_offset: 0,
                vertex_buffer_address: split_address(mesh.vertex_buffer().0 as u64),
                index_buffer_address: split_address(mesh.index_buffer().0 as u64),
            });
        }

        Ok(())
    };

    for (entity, mesh_component, transform) in world.static_meshes() {
        emit_static(entity, mesh_component, transform)?;
    }

    for (entity, mesh_component, transform) in world.skeletal_meshes() {
        let Some(mesh) = world.meshes().get(mesh_component.mesh) else { continue };
        if !mesh.is_ready_for_render() {
            continue;
        }

        let bone_offset = out.bones_data.len() as u32;
        out.bones_data.extend_from_slice(&mesh_component.bone_palette);

        let world_aabb = mesh.aabb().transform(transform.world);
        let (center, radius) = world_aabb.bounding_sphere();
        let flags = instance_flags(world, entity, mesh_component.casts_shadow, mesh_component.receives_shadow);

        for (surface_index, surface) in mesh.geometry_surfaces().iter().enumerate() {
            let override_slot = mesh_component.material_overrides.get(surface_index).copied().flatten();
            let mesh_slot = mesh.material_at_slot(surface.material_index);
            let material = resolve_material(world, mesh_slot, override_slot)?;

            let key = DrawKey {
                material,
                vertex_buffer: mesh.vertex_buffer(),
                first_index: surface.start_index,
            };

            let command_index = *keys.entry(key).or_insert_with(|| {
                out.draw_commands.push(DrawCommand {
                    material,
                    vertex_buffer: mesh.vertex_buffer(),
                    first_index: surface.start_index,
                    indirect_index: out.indirect_args.len() as u32,
                    skinned: true,
                });
                out.indirect_args.push(IndirectArgs {
                    vertex_count: surface.index_count,
                    instance_count: 0,
                    first_vertex: surface.start_index,
                    first_instance: 0,
                });
                out.draw_commands.len() - 1
            });

            out.indirect_args[command_index].instance_count += 1;
            out.instance_data.push(InstanceRecord {
                world_transform: transform.world,
                bounding_sphere_center: center,
                bounding_sphere_radius: radius,
                entity,
                draw_command_index: command_index as u32,
                flags,
                bone_offset,
                vertex_buffer_address: split_address(mesh.vertex_buffer().0 as u64),
                index_buffer_address: split_address(mesh.index_buffer().0 as u64),
            });
        }
    }

    // Prefix-sum `firstInstance`, then reset `instanceCount` to 0 -- the GPU
    // cull shader atomically rebuilds it per spec.md §4.2 step 2.
    let mut cumulative = 0u32;
    for args in &mut out.indirect_args {
        args.first_instance = cumulative;
        cumulative += args.instance_count;
        args.instance_count = 0;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::FakeWorld;

    #[test]
    fn empty_world_compiles_nothing() {
        let world = FakeWorld::new();
        let mut draws = CompiledDraws::default();
        compile_draws(&world, &mut draws).unwrap();
        assert!(draws.draw_commands.is_empty());
        assert!(draws.indirect_args.is_empty());
        assert!(draws.instance_data.is_empty());
    }

    #[test]
    fn shared_mesh_and_material_batches_into_one_draw_per_surface() {
        let mut world = FakeWorld::new();
        let mesh = world.add_mesh_two_surfaces();
        world.add_static_instance(mesh, Mat4::IDENTITY);
        world.add_static_instance(mesh, Mat4::from_translation(Vec3::X));

        let mut draws = CompiledDraws::default();
        compile_draws(&world, &mut draws).unwrap();

        assert_eq!(draws.draw_commands.len(), 2);
        assert_eq!(draws.instance_data.len(), 4);
        for args in &draws.indirect_args {
            assert_eq!(args.instance_count, 0, "instanceCount must be reset after CPU assembly");
        }
    }

    #[test]
    fn prefix_sum_matches_pre_reset_counts() {
        let mut world = FakeWorld::new();
        let mesh = world.add_mesh_two_surfaces();
        world.add_static_instance(mesh, Mat4::IDENTITY);
        world.add_static_instance(mesh, Mat4::IDENTITY);
        world.add_static_instance(mesh, Mat4::IDENTITY);

        let mut draws = CompiledDraws::default();
        compile_draws(&world, &mut draws).unwrap();

        // Surface 0 got 3 instances, surface 1 got 3 instances.
        assert_eq!(draws.indirect_args[0].first_instance, 0);
        assert_eq!(draws.indirect_args[1].first_instance, 3);
        let total: u32 = draws.instance_data.len() as u32;
        assert_eq!(total, 6);
    }

    #[test]
    fn single_surface_single_instance_matches_scenario_six() {
        let mut world = FakeWorld::new();
        let mesh = world.add_mesh_single_surface(36, 0);
        world.add_static_instance(mesh, Mat4::IDENTITY);

        let mut draws = CompiledDraws::default();
        compile_draws(&world, &mut draws).unwrap();

        assert_eq!(
            draws.indirect_args[0],
            IndirectArgs { vertex_count: 36, instance_count: 0, first_vertex: 0, first_instance: 0 }
        );
    }
}
