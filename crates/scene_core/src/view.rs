use scene_math::prelude::*;

/// Smallest aspect ratio [`ViewVolume::proj_matrix`] will divide by, keeping
/// a zero-area aspect finite instead of blowing up to infinity.
const MIN_ASPECT: f32 = 1e-6;

/// Camera state handed to the core each frame. Produced by the caller; the
/// View Driver only reads it. `near`/`far` may have `near > far` when the
/// caller uses reverse-Z, per spec.md §3.
#[derive(Debug, Clone, Copy)]
pub struct ViewVolume {
    pub position: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl ViewVolume {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Reverse-Z infinite-far-safe perspective: callers passing `near > far`
    /// get a `GREATER`-compare-friendly matrix. The View Driver has no error
    /// conditions, so a degenerate (zero-area) `aspect` is clamped rather
    /// than divided through raw -- `glam`'s perspective matrix scales the
    /// horizontal axis by `1.0 / aspect`, which would otherwise produce an
    /// infinite entry.
    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect.max(MIN_ASPECT), self.near, self.far)
    }

    pub fn view_proj_matrix(&self) -> Mat4 {
        self.proj_matrix() * self.view_matrix()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_proj_matrix())
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
    #[repr(C)]
    pub struct CullFlags: u32 {
        const FRUSTUM_CULL   = 1 << 0;
        const OCCLUSION_CULL = 1 << 1;
    }
}

/// The cull compute shader's per-frame constant block: frustum planes plus
/// everything needed to project a sphere to screen space and sample the
/// matching Hi-Z mip. Grounded on `CullInfo` in the teacher's `src/scene.rs`.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct CullData {
    pub frustum_planes: [Plane; 6],
    /// Projection scaling factors (`proj[0][0]`, `proj[1][1]`) used to
    /// project a view-space sphere radius to a screen-space footprint.
    pub p00: f32,
    pub p11: f32,
    pub pyramid_width: u32,
    pub pyramid_height: u32,
    pub instance_count: u32,
    pub flags: CullFlags,
}

/// The single per-frame uniform block every pass binds, per spec.md §3.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SceneGlobals {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inverse_view_proj: Mat4,
    pub camera_position: Vec4,
    pub screen_size: Vec2,
    pub cluster_grid_size: UVec4,
    pub world_time: f32,
    pub delta_time: f32,
    pub near: f32,
    pub far: f32,
    pub cull: CullData,
}

/// Pure function of a [`ViewVolume`] plus the two world clocks -- no GPU
/// work happens here. This is the whole of the View Driver.
pub fn build_scene_globals(
    view: &ViewVolume,
    screen_size: Vec2,
    cluster_grid_size: UVec4,
    world_time: f32,
    delta_time: f32,
    pyramid_extent: (u32, u32),
    instance_count: u32,
    cull_flags: CullFlags,
) -> SceneGlobals {
    let proj = view.proj_matrix();
    let view_mat = view.view_matrix();
    let view_proj = proj * view_mat;

    SceneGlobals {
        view: view_mat,
        proj,
        view_proj,
        inverse_view_proj: view_proj.inverse(),
        camera_position: view.position.extend(1.0),
        screen_size,
        cluster_grid_size,
        world_time,
        delta_time,
        near: view.near,
        far: view.far,
        cull: CullData {
            frustum_planes: view.frustum().as_array(),
            p00: proj.x_axis.x,
            p11: proj.y_axis.y,
            pyramid_width: pyramid_extent.0,
            pyramid_height: pyramid_extent.1,
            instance_count,
            flags: cull_flags,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn degenerate_aspect_produces_finite_matrices() {
        let view = ViewVolume {
            position: Vec3::ZERO,
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::NEG_Z,
            fov_y_radians: 1.0,
            aspect: 0.0,
            near: 1000.0,
            far: 0.1,
        };
        let globals = build_scene_globals(
            &view,
            Vec2::new(1920.0, 1080.0),
            UVec4::new(16, 9, 24, 16 * 9 * 24),
            1.0,
            1.0 / 60.0,
            (1024, 1024),
            0,
            CullFlags::FRUSTUM_CULL,
        );
        assert!(globals.view_proj.is_finite());
        assert!(globals.proj.is_finite());
        assert!(globals.inverse_view_proj.is_finite());
    }
}
