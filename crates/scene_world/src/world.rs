use scene_math::prelude::*;
use scene_res::{Arena, Handle};

use crate::asset::{Material, Mesh};

/// Opaque entity identifier, stable for the lifetime of the entity.
pub type Entity = u32;

#[derive(Debug, Clone, Copy)]
pub struct TransformComponent {
    pub world: Mat4,
}

#[derive(Debug, Clone)]
pub struct StaticMeshComponent {
    pub mesh: Handle<Mesh>,
    /// Per-surface material override; `None` falls through to the mesh's
    /// own material slot, which itself falls through to the engine default.
    pub material_overrides: Vec<Option<Handle<Material>>>,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

#[derive(Debug, Clone)]
pub struct SkeletalMeshComponent {
    pub mesh: Handle<Mesh>,
    pub material_overrides: Vec<Option<Handle<Material>>>,
    pub bone_palette: Vec<Mat4>,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLightComponent {
    pub direction: Vec3,
    pub color: Vec3,
    pub irradiance: f32,
    pub casts_shadow: bool,
}

/// Position comes from the entity's [`TransformComponent`].
#[derive(Debug, Clone, Copy)]
pub struct PointLightComponent {
    pub color: Vec3,
    /// Luminous power per channel; the Light Packer derives the light's
    /// effective radius from this via the same cutoff-attenuation formula
    /// the teacher uses in `PointLight::new`.
    pub luminous_power: Vec3,
    pub casts_shadow: bool,
}

/// Position and facing come from the entity's [`TransformComponent`].
#[derive(Debug, Clone, Copy)]
pub struct SpotLightComponent {
    pub color: Vec3,
    pub intensity: f32,
    pub inner_angle_degrees: f32,
    pub outer_angle_degrees: f32,
    pub attenuation_radius: f32,
    pub casts_shadow: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvironmentComponent {
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct LineVertex {
    pub position: Vec3,
    pub color: [u8; 4],
}

#[derive(Debug, Clone)]
pub struct LineBatchComponent {
    pub vertices: Vec<LineVertex>,
    pub thickness: f32,
    pub depth_tested: bool,
}

/// Read-only view over the world's drawable entities and the asset arenas
/// they reference, borrowed for the duration of one `renderScene()` call.
///
/// Grounded on spec.md §6's `viewEntities<T...>`/`isSelected`/`timeSinceCreation`
/// contract; iterators are boxed rather than expressed as a GAT so the trait
/// stays object-safe and usable as `&dyn World` from `scene_core`.
pub trait World {
    fn static_meshes(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &StaticMeshComponent, &TransformComponent)> + '_>;

    fn skeletal_meshes(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &SkeletalMeshComponent, &TransformComponent)> + '_>;

    /// At most one is expected to be present; a second is a caller contract
    /// breach the Light Packer does not attempt to validate.
    fn directional_lights(&self) -> Box<dyn Iterator<Item = (Entity, &DirectionalLightComponent)> + '_>;

    fn point_lights(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &PointLightComponent, &TransformComponent)> + '_>;

    fn spot_lights(
        &self,
    ) -> Box<dyn Iterator<Item = (Entity, &SpotLightComponent, &TransformComponent)> + '_>;

    fn environment(&self) -> Option<&EnvironmentComponent>;

    fn line_batches(&self) -> Box<dyn Iterator<Item = &LineBatchComponent> + '_>;

    fn is_selected(&self, entity: Entity) -> bool;
    fn selected_entities(&self) -> &[Entity];

    fn time_since_creation(&self) -> f64;
    fn delta_time(&self) -> f64;

    fn is_valid(&self, entity: Entity) -> bool;

    fn meshes(&self) -> &Arena<Mesh>;
    fn materials(&self) -> &Arena<Material>;

    /// Never absent; failing to resolve this is a hard fatal for the Draw
    /// Compiler per spec.md §4.2's material-fallback rule.
    fn default_material(&self) -> Handle<Material>;
}
