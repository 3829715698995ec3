use scene_math::prelude::*;

use crate::view::ViewVolume;

pub const NUM_CASCADES: usize = 3;

/// How the sun's cascade split distances are derived. See `DESIGN.md` for
/// why `Fixed` is the default rather than [`CascadeSplitMode::Practical`].
#[derive(Debug, Clone, Copy)]
pub enum CascadeSplitMode {
    Fixed([f32; NUM_CASCADES]),
    /// `λ·log + (1−λ)·uniform`.
    Practical { lambda: f32 },
}

impl Default for CascadeSplitMode {
    fn default() -> Self {
        CascadeSplitMode::Fixed([15.0, 50.0, 200.0])
    }
}

/// Distances from the camera at which each cascade ends.
pub fn cascade_split_distances(mode: CascadeSplitMode, near: f32, far: f32) -> [f32; NUM_CASCADES] {
    match mode {
        CascadeSplitMode::Fixed(splits) => splits,
        CascadeSplitMode::Practical { lambda } => {
            let mut splits = [0.0; NUM_CASCADES];
            for (i, split) in splits.iter_mut().enumerate() {
                let fraction = (i + 1) as f32 / NUM_CASCADES as f32;
                let log_split = near * (far / near).powf(fraction);
                let uniform_split = near + (far - near) * fraction;
                *split = lambda * log_split + (1.0 - lambda) * uniform_split;
            }
            splits
        }
    }
}

/// Asymmetric Z-range padding: each bound is pushed away from zero by a
/// factor of `z_mult` rather than by a flat additive pad, so casters just
/// outside the tight AABB (e.g. a tall object standing just past the fitted
/// frustum) are still captured.
fn pad_z_range(min_z: f32, max_z: f32, z_mult: f32) -> (f32, f32) {
    let min_z = if min_z < 0.0 { min_z * z_mult } else { min_z / z_mult };
    let max_z = if max_z < 0.0 { max_z / z_mult } else { max_z * z_mult };
    (min_z, max_z)
}

fn frustum_corners(view: &ViewVolume, split_near: f32, split_far: f32) -> [Vec3; 8] {
    let proj = Mat4::perspective_rh(view.fov_y_radians, view.aspect, split_near, split_far);
    let inverse_view_proj = (proj * view.view_matrix()).inverse();

    [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
    ]
    .map(|ndc| inverse_view_proj.project_point3(ndc))
}

fn stable_up_vector(direction: Vec3) -> Vec3 {
    if direction.normalize().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Fit a tight orthographic projection around the view sub-frustum spanning
/// `[split_near, split_far]`, as seen from the sun.
pub fn fit_cascade(view: &ViewVolume, split_near: f32, split_far: f32, sun_direction: Vec3) -> Mat4 {
    const Z_MULT: f32 = 10.0;

    let corners = frustum_corners(view, split_near, split_far);
    let center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;
    let radius = corners.iter().map(|corner| corner.distance(center)).fold(0.0_f32, f32::max);

    let direction = sun_direction.normalize();
    let light_position = center - direction * radius;
    let light_view = Mat4::look_at_rh(light_position, center, stable_up_vector(direction));

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in corners {
        let local = light_view.transform_point3(corner);
        min = min.min(local);
        max = max.max(local);
    }

    let (min_z, max_z) = pad_z_range(min.z, max.z, Z_MULT);
    let light_proj = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max_z, -min_z);
    light_proj * light_view
}

/// Forward/up pairs for the six faces of a cube shadow map, one render pass
/// per face selected by `gl_ViewIndex` via a `0b111111` view mask.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// Six 90°-FOV, 1:1-aspect view-projections, one per cube face.
pub fn point_light_view_projections(position: Vec3, radius: f32) -> [Mat4; 6] {
    CUBE_FACES.map(|(forward, up)| {
        let view = Mat4::look_to_rh(position, forward, up);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.01, radius.max(0.01));
        proj * view
    })
}

/// A single perspective view-projection built from the entity's transform.
pub fn spot_light_view_projection(transform: Mat4, outer_angle_degrees: f32, radius: f32) -> Mat4 {
    let position = transform.transform_point3(Vec3::ZERO);
    let forward = transform.transform_vector3(Vec3::NEG_Z).normalize();
    let up = transform.transform_vector3(Vec3::Y).normalize();

    let fov_y = (outer_angle_degrees * 2.0).to_radians();
    let view = Mat4::look_to_rh(position, forward, up);
    let proj = Mat4::perspective_rh(fov_y, 1.0, 0.01, radius.max(0.01));
    proj * view
}

/// Physically-derived cutoff radius: the distance at which a point light's
/// attenuation falls below `POW_CUTOFF`.
pub fn point_light_radius(luminous_power: Vec3) -> f32 {
    const POW_CUTOFF: f32 = 0.6;
    (2.820_95 * luminous_power.max_element().sqrt()) / POW_CUTOFF.sqrt()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_split_mode_matches_shipped_default() {
        let splits = cascade_split_distances(CascadeSplitMode::default(), 0.1, 300.0);
        assert_eq!(splits, [15.0, 50.0, 200.0]);
    }

    #[test]
    fn practical_splits_are_monotonic() {
        let splits = cascade_split_distances(CascadeSplitMode::Practical { lambda: 0.95 }, 0.1, 300.0);
        assert!(splits[0] < splits[1]);
        assert!(splits[1] < splits[2]);
    }

    #[test]
    fn point_light_faces_share_tight_fov() {
        let matrices = point_light_view_projections(Vec3::ZERO, 10.0);
        assert_eq!(matrices.len(), 6);
        for matrix in matrices {
            assert!(matrix.is_finite());
        }
    }

    #[test]
    fn cutoff_radius_grows_with_luminous_power() {
        let dim = point_light_radius(Vec3::splat(1.0));
        let bright = point_light_radius(Vec3::splat(100.0));
        assert!(bright > dim);
    }
}
