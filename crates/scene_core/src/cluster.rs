//! Fixed 3D grid of view-space AABB clusters used for clustered light
//! culling: screen-space tile subdivision in X/Y, logarithmic depth
//! slicing in Z.

use scene_math::prelude::*;

#[derive(Debug, Clone, Copy)]
pub struct ClusterGridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Default for ClusterGridDims {
    fn default() -> Self {
        Self { x: 16, y: 9, z: 24 }
    }
}

impl ClusterGridDims {
    pub fn cluster_count(&self) -> u32 {
        self.x * self.y * self.z
    }

    pub fn as_uvec4(&self) -> UVec4 {
        UVec4::new(self.x, self.y, self.z, self.cluster_count())
    }
}

/// One cluster's view-space bounding box, matching the on-GPU layout the
/// light-cull compute shader reads (`vec4` min/max so the struct stays
/// 16-byte aligned without manual padding).
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClusterAabb {
    pub min: Vec4,
    pub max: Vec4,
}

/// Logarithmic Z-slice factors: cluster `z` bounds follow
/// `near * (far/near)^(z/numSlices)` rather than a linear split, so
/// near-camera clusters (where depth precision matters most) stay thin.
fn slice_depth(near: f32, far: f32, num_slices: u32, slice: u32) -> f32 {
    near * (far / near).powf(slice as f32 / num_slices as f32)
}

/// Build one view-space AABB per cluster cell from the inverse projection
/// and screen-space tile bounds. A pure CPU function standing in for the
/// compute-shader dispatch: one thread group per cell there, one loop
/// iteration per cell here.
pub fn build_cluster_aabbs(
    dims: ClusterGridDims,
    inverse_proj: Mat4,
    near: f32,
    far: f32,
) -> Vec<ClusterAabb> {
    let mut clusters = Vec::with_capacity(dims.cluster_count() as usize);

    let unproject = |ndc_x: f32, ndc_y: f32, view_z: f32| -> Vec3 {
        let clip = Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let view = inverse_proj * clip;
        let view = view.truncate() / view.w;
        view * (view_z / view.z)
    };

    for z in 0..dims.z {
        let slice_near = slice_depth(near, far, dims.z, z);
        let slice_far = slice_depth(near, far, dims.z, z + 1);

        for y in 0..dims.y {
            let ndc_y_min = (y as f32 / dims.y as f32) * 2.0 - 1.0;
            let ndc_y_max = ((y + 1) as f32 / dims.y as f32) * 2.0 - 1.0;

            for x in 0..dims.x {
                let ndc_x_min = (x as f32 / dims.x as f32) * 2.0 - 1.0;
                let ndc_x_max = ((x + 1) as f32 / dims.x as f32) * 2.0 - 1.0;

                let corners = [
                    unproject(ndc_x_min, ndc_y_min, -slice_near),
                    unproject(ndc_x_max, ndc_y_max, -slice_near),
                    unproject(ndc_x_min, ndc_y_min, -slice_far),
                    unproject(ndc_x_max, ndc_y_max, -slice_far),
                ];

                let min = corners.iter().copied().reduce(Vec3::min).unwrap();
                let max = corners.iter().copied().reduce(Vec3::max).unwrap();
                clusters.push(ClusterAabb { min: min.extend(1.0), max: max.extend(1.0) });
            }
        }
    }

    clusters
}

/// `true` if a light's view-space bounding sphere intersects a cluster's
/// AABB. A CPU stand-in for the compute shader's per-cluster intersection
/// test.
pub fn sphere_intersects_cluster(cluster: &ClusterAabb, center_view: Vec3, radius: f32) -> bool {
    let min = cluster.min.truncate();
    let max = cluster.max.truncate();
    let closest = center_view.clamp(min, max);
    closest.distance_squared(center_view) <= radius * radius
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_grid_matches_spec_dimensions() {
        let dims = ClusterGridDims::default();
        assert_eq!((dims.x, dims.y, dims.z), (16, 9, 24));
        assert_eq!(dims.cluster_count(), 16 * 9 * 24);
    }

    #[test]
    fn builds_one_aabb_per_cluster() {
        let dims = ClusterGridDims { x: 2, y: 2, z: 2 };
        let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
        let aabbs = build_cluster_aabbs(dims, proj.inverse(), 0.1, 100.0);
        assert_eq!(aabbs.len(), dims.cluster_count() as usize);
    }

    #[test]
    fn near_slice_is_thinner_than_far_slice() {
        let near_depth = slice_depth(0.1, 100.0, 24, 1) - slice_depth(0.1, 100.0, 24, 0);
        let far_depth = slice_depth(0.1, 100.0, 24, 24) - slice_depth(0.1, 100.0, 24, 23);
        assert!(near_depth < far_depth, "logarithmic z-slicing keeps near clusters thin");
    }

    #[test]
    fn sphere_at_cluster_center_intersects() {
        let cluster = ClusterAabb { min: Vec4::new(-1.0, -1.0, -1.0, 1.0), max: Vec4::new(1.0, 1.0, 1.0, 1.0) };
        assert!(sphere_intersects_cluster(&cluster, Vec3::ZERO, 0.1));
        assert!(!sphere_intersects_cluster(&cluster, Vec3::splat(10.0), 0.1));
    }
}
