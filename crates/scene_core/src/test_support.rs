//! Minimal in-memory [`World`] fixture used by this crate's own tests.
//! Grounded on the teacher's tendency to build small in-crate test doubles
//! (`rendi_res::dummy::DummyRes`) rather than pull in a mocking framework.

use scene_math::prelude::*;
use scene_res::{Arena, Handle};
use scene_rhi::{BufferHandle, ShaderHandle};
use scene_world::{
    DirectionalLightComponent, Entity, EnvironmentComponent, LineBatchComponent, Material, Mesh,
    PointLightComponent, SkeletalMeshComponent, SpotLightComponent, StaticMeshComponent, Surface,
    TransformComponent, World,
};

#[derive(Default)]
pub struct FakeWorld {
    meshes: Arena<Mesh>,
    materials: Arena<Material>,
    default_material: Option<Handle<Material>>,
    static_meshes: Vec<(Entity, StaticMeshComponent, TransformComponent)>,
    skeletal_meshes: Vec<(Entity, SkeletalMeshComponent, TransformComponent)>,
    directional_lights: Vec<(Entity, DirectionalLightComponent)>,
    point_lights: Vec<(Entity, PointLightComponent, TransformComponent)>,
    spot_lights: Vec<(Entity, SpotLightComponent, TransformComponent)>,
    environment: Option<EnvironmentComponent>,
    line_batches: Vec<LineBatchComponent>,
    selected: Vec<Entity>,
    next_entity: Entity,
    next_buffer: u32,
    pub time_since_creation: f64,
    pub delta_time: f64,
}

impl FakeWorld {
    pub fn new() -> Self {
        let mut world = Self::default();
        let default_material = world.materials.insert(Material {
            vertex_shader: ShaderHandle(0),
            vertex_shader_skinned: ShaderHandle(1),
            pixel_shader: ShaderHandle(2),
            binding_set: scene_rhi::BindingSetHandle(0),
            binding_layout: scene_rhi::BindingLayoutHandle(0),
            ready_for_render: true,
        });
        world.default_material = Some(default_material);
        world
    }

    fn next_entity(&mut self) -> Entity {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }

    fn next_buffer_handle(&mut self) -> BufferHandle {
        let id = self.next_buffer;
        self.next_buffer += 1;
        BufferHandle(id)
    }

    /// A mesh with a single surface of `index_count` indices starting at
    /// `start_index`, using the default material.
    pub fn add_mesh_single_surface(&mut self, index_count: u32, start_index: u32) -> Handle<Mesh> {
        let default = self.default_material.unwrap();
        let vertex_buffer = self.next_buffer_handle();
        let index_buffer = self.next_buffer_handle();
        self.meshes.insert(Mesh {
            local_aabb: Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0)),
            vertex_buffer,
            index_buffer,
            surfaces: vec![Surface { start_index, index_count, material_index: 0 }],
            material_slots: vec![default],
            ready_for_render: true,
            skinned: false,
        })
    }

    /// A mesh with two surfaces, both using the default material.
    pub fn add_mesh_two_surfaces(&mut self) -> Handle<Mesh> {
        let default = self.default_material.unwrap();
        let vertex_buffer = self.next_buffer_handle();
        let index_buffer = self.next_buffer_handle();
        self.meshes.insert(Mesh {
            local_aabb: Aabb::from_corners(Vec3::splat(-1.0), Vec3::splat(1.0)),
            vertex_buffer,
            index_buffer,
            surfaces: vec![
                Surface { start_index: 0, index_count: 36, material_index: 0 },
                Surface { start_index: 36, index_count: 36, material_index: 0 },
            ],
            material_slots: vec![default],
            ready_for_render: true,
            skinned: false,
        })
    }

    pub fn add_static_instance(&mut self, mesh: Handle<Mesh>, transform: Mat4) -> Entity {
        let entity = self.next_entity();
        self.static_meshes.push((
            entity,
            StaticMeshComponent {
                mesh,
                material_overrides: Vec::new(),
                casts_shadow: true,
                receives_shadow: true,
            },
            TransformComponent { world: transform },
        ));
        entity
    }

    pub fn add_directional_light(&mut self, direction: Vec3, casts_shadow: bool) -> Entity {
        let entity = self.next_entity();
        self.directional_lights.push((
            entity,
            DirectionalLightComponent { direction, color: Vec3::ONE, irradiance: 1.0, casts_shadow },
        ));
        entity
    }

    pub fn add_point_light(&mut self, position: Vec3, luminous_power: Vec3, casts_shadow: bool) -> Entity {
        let entity = self.next_entity();
        self.point_lights.push((
            entity,
            PointLightComponent { color: Vec3::ONE, luminous_power, casts_shadow },
            TransformComponent { world: Mat4::from_translation(position) },
        ));
        entity
    }

    pub fn add_spot_light(&mut self, transform: Mat4, casts_shadow: bool) -> Entity {
        let entity = self.next_entity();
        self.spot_lights.push((
            entity,
            SpotLightComponent {
                color: Vec3::ONE,
                intensity: 1.0,
                inner_angle_degrees: 20.0,
                outer_angle_degrees: 30.0,
                attenuation_radius: 20.0,
                casts_shadow,
            },
            TransformComponent { world: transform },
        ));
        entity
    }

    pub fn select(&mut self, entity: Entity) {
        self.selected.push(entity);
    }
}

impl World for FakeWorld {
    fn static_meshes(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &StaticMeshComponent, &TransformComponent)> + '_> {
        Box::new(self.static_meshes.iter().map(|(e, m, t)| (*e, m, t)))
    }

    fn skeletal_meshes(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &SkeletalMeshComponent, &TransformComponent)> + '_> {
        Box::new(self.skeletal_meshes.iter().map(|(e, m, t)| (*e, m, t)))
    }

    fn directional_lights(&self) -> Box<dyn Iterator<Item = (Entity, &DirectionalLightComponent)> + '_> {
        Box::new(self.directional_lights.iter().map(|(e, l)| (*e, l)))
    }

    fn point_lights(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &PointLightComponent, &TransformComponent)> + '_> {
        Box::new(self.point_lights.iter().map(|(e, l, t)| (*e, l, t)))
    }

    fn spot_lights(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &SpotLightComponent, &TransformComponent)> + '_> {
        Box::new(self.spot_lights.iter().map(|(e, l, t)| (*e, l, t)))
    }

    fn environment(&self) -> Option<&EnvironmentComponent> {
        self.environment.as_ref()
    }

    fn line_batches(&self) -> Box<dyn Iterator<Item = &LineBatchComponent> + '_> {
        Box::new(self.line_batches.iter())
    }

    fn is_selected(&self, entity: Entity) -> bool {
        self.selected.contains(&entity)
    }

    fn selected_entities(&self) -> &[Entity] {
        &self.selected
    }

    fn time_since_creation(&self) -> f64 {
        self.time_since_creation
    }

    fn delta_time(&self) -> f64 {
        self.delta_time
    }

    fn is_valid(&self, entity: Entity) -> bool {
        entity < self.next_entity
    }

    fn meshes(&self) -> &Arena<Mesh> {
        &self.meshes
    }

    fn materials(&self) -> &Arena<Material> {
        &self.materials
    }

    fn default_material(&self) -> Handle<Material> {
        self.default_material.expect("FakeWorld::new always installs a default material")
    }
}
