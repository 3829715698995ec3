//! Packs directional/point/spot lights into `SceneLightData`, allocates
//! shadow-atlas tiles, and fits CSM cascades. This is the whole of the
//! Light Packer (spec.md §4.3).

use smallvec::SmallVec;

use scene_math::prelude::*;
use scene_world::World;

use crate::error::SceneError;
use crate::shadow::{
    self, CascadeSplitMode, NUM_CASCADES,
};
use crate::shadow_atlas::{ShadowAtlas, SPOT_LAYER};
use crate::view::ViewVolume;

/// Mirrors the teacher's `MAX_LIGHT_COUNT` (`src/light.rs`). `numLights`
/// is clamped to this; callers exceeding it get a `log::warn!` and the
/// excess lights are dropped for this frame.
pub const MAX_LIGHTS: usize = 256;

/// Sub-record for one shadow-casting face/view of a light, per spec.md §3.
/// `atlas_tile_index = -1` (i.e. [`crate::shadow_atlas::NO_TILE`]) means the
/// light is unshadowed this frame.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ShadowSlot {
    pub atlas_tile_index: i32,
    pub atlas_layer: u32,
    pub uv_offset: Vec2,
    pub uv_scale: Vec2,
    pub owner_light_index: u32,
}

impl ShadowSlot {
    pub const UNSHADOWED: Self = Self {
        atlas_tile_index: crate::shadow_atlas::NO_TILE,
        atlas_layer: 0,
        uv_offset: Vec2::ZERO,
        uv_scale: Vec2::ZERO,
        owner_light_index: 0,
    };
}

/// Tagged union over {directional, point, spot}, per spec.md §3. Shared
/// fields (packed color, intensity) live on [`Light`]; variant-specific
/// fields live here.
#[derive(Debug, Clone, Copy)]
pub enum LightVariant {
    Directional { direction: Vec3 },
    Point { position: Vec3, radius: f32 },
    Spot { position: Vec3, direction: Vec3, inner_cos: f32, outer_cos: f32, radius: f32 },
}

/// One packed light. `view_projections`/`shadow_slots` hold 6 entries for a
/// point light (one per cube face, sharing one tile across all six), up to
/// [`NUM_CASCADES`] for the sun, or 1 for a spot light -- a `SmallVec` rather
/// than a fixed `[T; 6]` so each kind only carries the entries it uses.
#[derive(Debug, Clone)]
pub struct Light {
    pub variant: LightVariant,
    pub color: [u8; 4],
    pub intensity: f32,
    pub falloff: f32,
    pub view_projections: SmallVec<[Mat4; 6]>,
    pub shadow_slots: SmallVec<[ShadowSlot; 6]>,
}

impl Light {
    pub fn is_shadowed(&self) -> bool {
        self.shadow_slots.iter().any(|slot| slot.atlas_tile_index != crate::shadow_atlas::NO_TILE)
    }
}

/// Per-frame CPU collections of allocated shadow slots, split by light kind
/// so the Pass Scheduler can iterate "every packed point shadow" / "every
/// packed spot shadow" directly rather than re-filtering `lights`.
#[derive(Debug, Default)]
pub struct PackedShadows {
    pub point: Vec<ShadowSlot>,
    pub spot: Vec<ShadowSlot>,
}

impl PackedShadows {
    pub fn clear(&mut self) {
        self.point.clear();
        self.spot.clear();
    }
}

/// Header plus packed `Light[]`, uploaded each frame as one contiguous
/// block (`header + numLights * sizeof(Light)`), per spec.md §3.
#[derive(Debug, Default)]
pub struct SceneLightData {
    pub ambient: Vec3,
    pub num_lights: u32,
    pub has_sun: bool,
    pub sun_direction: Vec3,
    pub cascade_splits: [f32; NUM_CASCADES],
    pub lights: Vec<Light>,
}

impl SceneLightData {
    pub fn clear(&mut self) {
        self.num_lights = 0;
        self.has_sun = false;
        self.sun_direction = Vec3::ZERO;
        self.cascade_splits = [0.0; NUM_CASCADES];
        self.lights.clear();
    }

    /// Serializes `header + numLights * sizeof(GpuLight)` for the upload in
    /// spec.md §3's `SceneLightData` layout. `header` and `GpuLight` are
    /// both `#[repr(C)]`/`bytemuck::Pod`, so this is a straight `bytes_of`
    /// concatenation -- no per-field packing at the call site.
    pub fn upload_bytes(&self) -> Vec<u8> {
        let header = GpuSceneLightHeader {
            ambient: self.ambient,
            num_lights: self.num_lights,
            has_sun: self.has_sun as u32,
            sun_direction: self.sun_direction,
            cascade_splits: self.cascade_splits,
            _pad: 0.0,
        };

        let mut bytes = Vec::with_capacity(
            std::mem::size_of::<GpuSceneLightHeader>() + self.lights.len() * std::mem::size_of::<GpuLight>(),
        );
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        for light in &self.lights {
            bytes.extend_from_slice(bytemuck::bytes_of(&GpuLight::pack(light)));
        }
        bytes
    }
}

/// Fixed-layout header matching spec.md §3's `SceneLightData` header:
/// `ambient`, `numLights`, `hasSun`, `sunDirection`, `cascadeSplits[NumCascades]`.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuSceneLightHeader {
    pub ambient: Vec3,
    pub num_lights: u32,
    pub has_sun: u32,
    pub sun_direction: Vec3,
    pub cascade_splits: [f32; NUM_CASCADES],
    pub _pad: f32,
}

/// Variant tag for [`GpuLight::kind`], mirroring [`LightVariant`] without
/// needing an `unsafe impl Pod` on a Rust enum.
pub const GPU_LIGHT_KIND_DIRECTIONAL: u32 = 0;
pub const GPU_LIGHT_KIND_POINT: u32 = 1;
pub const GPU_LIGHT_KIND_SPOT: u32 = 2;

/// On-GPU `Light`, per spec.md §3: a fixed-size record regardless of
/// variant (no tagged-union size savings on a GPU buffer), carrying up to
/// 6 view-projections/shadow-slots -- the maximum a point light's six cube
/// faces need; directional cascades (≤ [`NUM_CASCADES`]) and the single
/// spot view use a prefix of the same arrays.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuLight {
    pub kind: u32,
    pub color: [u8; 4],
    pub intensity: f32,
    pub falloff: f32,
    pub position: Vec3,
    pub radius: f32,
    pub direction: Vec3,
    pub inner_cos: f32,
    pub outer_cos: f32,
    pub view_projection_count: u32,
    pub _pad: [u32; 2],
    pub view_projections: [Mat4; 6],
    pub shadow_slots: [ShadowSlot; 6],
}

impl GpuLight {
    fn pack(light: &Light) -> Self {
        let (position, direction, radius, inner_cos, outer_cos) = match light.variant {
            LightVariant::Directional { direction } => (Vec3::ZERO, direction, 0.0, 0.0, 0.0),
            LightVariant::Point { position, radius } => (position, Vec3::ZERO, radius, 0.0, 0.0),
            LightVariant::Spot { position, direction, inner_cos, outer_cos, radius } => {
                (position, direction, radius, inner_cos, outer_cos)
            }
        };

        let kind = match light.variant {
            LightVariant::Directional { .. } => GPU_LIGHT_KIND_DIRECTIONAL,
            LightVariant::Point { .. } => GPU_LIGHT_KIND_POINT,
            LightVariant::Spot { .. } => GPU_LIGHT_KIND_SPOT,
        };

        let mut view_projections = [Mat4::ZERO; 6];
        for (slot, vp) in view_projections.iter_mut().zip(light.view_projections.iter()) {
            *slot = *vp;
        }

        let mut shadow_slots = [ShadowSlot::UNSHADOWED; 6];
        for (slot, s) in shadow_slots.iter_mut().zip(light.shadow_slots.iter()) {
            *slot = *s;
        }

        Self {
            kind,
            color: light.color,
            intensity: light.intensity,
            falloff: light.falloff,
            position,
            radius,
            direction,
            inner_cos,
            outer_cos,
            view_projection_count: light.view_projections.len() as u32,
            _pad: [0; 2],
            view_projections,
            shadow_slots,
        }
    }
}

/// Packs every light in `world` into `out`/`packed_shadows`, allocating
/// shadow-atlas tiles as it goes. This is the whole of the Light Packer.
///
/// At most one directional light is honored (the "sun"); a second is a
/// caller contract breach the packer does not validate, per
/// [`scene_world::World::directional_lights`]'s doc comment.
pub fn pack_lights(
    world: &dyn World,
    view: &ViewVolume,
    cascade_mode: CascadeSplitMode,
    ambient: Vec3,
    atlas: &mut ShadowAtlas,
    out: &mut SceneLightData,
    packed_shadows: &mut PackedShadows,
) -> Result<(), SceneError> {
    out.clear();
    packed_shadows.clear();
    out.ambient = ambient;

    if let Some((_, sun)) = world.directional_lights().next() {
        out.has_sun = true;
        out.sun_direction = sun.direction.normalize();
        out.cascade_splits = shadow::cascade_split_distances(cascade_mode, view.near.min(view.far), view.near.max(view.far));

        let mut view_projections: SmallVec<[Mat4; 6]> = SmallVec::new();
        if sun.casts_shadow {
            let mut split_near = view.near;
            for &split_far in &out.cascade_splits {
                view_projections.push(shadow::fit_cascade(view, split_near, split_far, out.sun_direction));
                split_near = split_far;
            }
        }

        push_light(
            out,
            Light {
                variant: LightVariant::Directional { direction: out.sun_direction },
                color: pack_color(sun.color),
                intensity: sun.irradiance,
                falloff: 0.0,
                view_projections,
                shadow_slots: SmallVec::<[ShadowSlot; 6]>::new(),
            },
        );
    }

    for (_, point, transform) in world.point_lights() {
        let position = transform.world.transform_point3(Vec3::ZERO);
        let radius = shadow::point_light_radius(point.luminous_power);
        let view_projections: SmallVec<[Mat4; 6]> =
            shadow::point_light_view_projections(position, radius).into_iter().collect();

        let light_index = out.lights.len() as u32;
        let shadow_slots: SmallVec<[ShadowSlot; 6]> = if point.casts_shadow {
            match atlas.allocate_tile() {
                Some((tile_index, uv_offset, uv_scale)) => {
                    let slots: SmallVec<[ShadowSlot; 6]> = (0..6)
                        .map(|layer| ShadowSlot {
                            atlas_tile_index: tile_index as i32,
                            atlas_layer: layer,
                            uv_offset,
                            uv_scale,
                            owner_light_index: light_index,
                        })
                        .collect();
                    packed_shadows.point.push(slots[0]);
                    slots
                }
                None => {
                    log::warn!("shadow atlas exhausted, point light {light_index} is unshadowed this frame");
                    std::iter::repeat(ShadowSlot::UNSHADOWED).take(6).collect()
                }
            }
        } else {
            SmallVec::new()
        };

        push_light(
            out,
            Light {
                variant: LightVariant::Point { position, radius },
                color: pack_color(point.color),
                intensity: point.luminous_power.max_element(),
                falloff: 1.0,
                view_projections,
                shadow_slots,
            },
        );
    }

    for (_, spot, transform) in world.spot_lights() {
        let position = transform.world.transform_point3(Vec3::ZERO);
        let direction = transform.world.transform_vector3(Vec3::NEG_Z).normalize();
        let inner_cos = spot.inner_angle_degrees.to_radians().cos();
        let outer_cos = spot.outer_angle_degrees.to_radians().cos();
        let view_projections: SmallVec<[Mat4; 6]> = std::iter::once(shadow::spot_light_view_projection(
            transform.world,
            spot.outer_angle_degrees,
            spot.attenuation_radius,
        ))
        .collect();

        let light_index = out.lights.len() as u32;
        let shadow_slots: SmallVec<[ShadowSlot; 6]> = if spot.casts_shadow {
            match atlas.allocate_tile() {
                Some((tile_index, uv_offset, uv_scale)) => {
                    let slot = ShadowSlot {
                        atlas_tile_index: tile_index as i32,
                        atlas_layer: SPOT_LAYER,
                        uv_offset,
                        uv_scale,
                        owner_light_index: light_index,
                    };
                    packed_shadows.spot.push(slot);
                    std::iter::once(slot).collect()
                }
                None => {
                    log::warn!("shadow atlas exhausted, spot light {light_index} is unshadowed this frame");
                    std::iter::once(ShadowSlot::UNSHADOWED).collect()
                }
            }
        } else {
            SmallVec::new()
        };

        push_light(
            out,
            Light {
                variant: LightVariant::Spot { position, direction, inner_cos, outer_cos, radius: spot.attenuation_radius },
                color: pack_color(spot.color),
                intensity: spot.intensity,
                falloff: 1.0,
                view_projections,
                shadow_slots,
            },
        );
    }

    Ok(())
}

fn push_light(out: &mut SceneLightData, light: Light) {
    if out.lights.len() >= MAX_LIGHTS {
        log::warn!("dropping light past MaxLights ({MAX_LIGHTS}) for this frame");
        return;
    }
    out.lights.push(light);
    out.num_lights = out.lights.len() as u32;
}

fn pack_color(color: Vec3) -> [u8; 4] {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::FakeWorld;

    fn test_view() -> ViewVolume {
        ViewVolume {
            position: Vec3::ZERO,
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::NEG_Z,
            fov_y_radians: 1.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 300.0,
        }
    }

    #[test]
    fn empty_world_with_sun_reports_one_light() {
        let mut world = FakeWorld::new();
        world.add_directional_light(Vec3::new(0.0, -1.0, 0.0), false);

        let mut atlas = ShadowAtlas::new(4);
        let mut light_data = SceneLightData::default();
        let mut packed = PackedShadows::default();
        pack_lights(&world, &test_view(), CascadeSplitMode::default(), Vec3::ZERO, &mut atlas, &mut light_data, &mut packed).unwrap();

        assert_eq!(light_data.num_lights, 1);
        assert!(light_data.has_sun);
    }

    #[test]
    fn point_light_with_capacity_shares_one_tile_across_six_faces() {
        let mut world = FakeWorld::new();
        world.add_point_light(Vec3::ZERO, Vec3::splat(10.0), true);

        let mut atlas = ShadowAtlas::new(4);
        let mut light_data = SceneLightData::default();
        let mut packed = PackedShadows::default();
        pack_lights(&world, &test_view(), CascadeSplitMode::default(), Vec3::ZERO, &mut atlas, &mut light_data, &mut packed).unwrap();

        assert_eq!(packed.point.len(), 1);
        let light = &light_data.lights[0];
        assert_eq!(light.shadow_slots.len(), 6);
        let tile = light.shadow_slots[0].atlas_tile_index;
        assert!(tile >= 0);
        for (layer, slot) in light.shadow_slots.iter().enumerate() {
            assert_eq!(slot.atlas_tile_index, tile);
            assert_eq!(slot.atlas_layer, layer as u32);
        }
    }

    #[test]
    fn point_light_with_exhausted_atlas_is_unshadowed_but_still_lit() {
        let mut world = FakeWorld::new();
        world.add_point_light(Vec3::ZERO, Vec3::splat(10.0), true);

        let mut atlas = ShadowAtlas::new(1);
        atlas.allocate_tile().expect("prime the atlas to exhaustion");

        let mut light_data = SceneLightData::default();
        let mut packed = PackedShadows::default();
        pack_lights(&world, &test_view(), CascadeSplitMode::default(), Vec3::ZERO, &mut atlas, &mut light_data, &mut packed).unwrap();

        assert_eq!(packed.point.len(), 0);
        assert_eq!(light_data.num_lights, 1);
        assert!(!light_data.lights[0].is_shadowed());
    }

    #[test]
    fn uv_rects_for_every_shadowed_slot_fit_in_unit_square() {
        let mut world = FakeWorld::new();
        world.add_point_light(Vec3::ZERO, Vec3::splat(10.0), true);
        world.add_spot_light(Mat4::from_translation(Vec3::new(5.0, 5.0, 0.0)), true);

        let mut atlas = ShadowAtlas::new(4);
        let mut light_data = SceneLightData::default();
        let mut packed = PackedShadows::default();
        pack_lights(&world, &test_view(), CascadeSplitMode::default(), Vec3::ZERO, &mut atlas, &mut light_data, &mut packed).unwrap();

        for light in &light_data.lights {
            for slot in &light.shadow_slots {
                if slot.atlas_tile_index < 0 {
                    continue;
                }
                assert!(slot.uv_offset.x >= 0.0 && slot.uv_offset.y >= 0.0);
                assert!(slot.uv_scale.x > 0.0 && slot.uv_scale.y > 0.0);
                assert!(slot.uv_offset.x + slot.uv_scale.x <= 1.0 + f32::EPSILON);
                assert!(slot.uv_offset.y + slot.uv_scale.y <= 1.0 + f32::EPSILON);
            }
        }
    }
}
