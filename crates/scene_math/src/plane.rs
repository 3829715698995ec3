use crate::prelude::*;

/// A plane in `ax + by + cz + d = 0` form, stored as `(a, b, c, d)`.
///
/// `normal` (the `xyz` part) points towards the half-space considered
/// "inside" the frustum.
#[derive(Debug, Default, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Plane(pub Vec4);

impl Plane {
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.0.xyz()
    }

    /// Signed distance from `point` to the plane, positive on the inside.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal().dot(point) + self.0.w
    }

    /// `true` if the sphere is entirely outside the plane's half-space.
    #[inline]
    pub fn sphere_outside(&self, center: Vec3, radius: f32) -> bool {
        self.distance_to_point(center) < -radius
    }

    fn normalize(self) -> Self {
        let len = self.normal().length();
        if len > 0.0 {
            Plane(self.0 / len)
        } else {
            self
        }
    }
}

/// The six planes of a view frustum, extracted from a combined
/// view-projection matrix.
#[derive(Debug, Default, Clone, Copy)]
pub struct Frustum {
    pub left: Plane,
    pub right: Plane,
    pub top: Plane,
    pub bottom: Plane,
    pub near: Plane,
    pub far: Plane,
}

impl Frustum {
    /// Extract the frustum planes from `proj_view` using the standard
    /// Gribb/Hartmann row-combination method.
    pub fn from_matrix(proj_view: Mat4) -> Self {
        let rows = proj_view.transpose();
        let row0 = rows.x_axis;
        let row1 = rows.y_axis;
        let row2 = rows.z_axis;
        let row3 = rows.w_axis;

        Self {
            left: Plane(row3 + row0).normalize(),
            right: Plane(row3 - row0).normalize(),
            bottom: Plane(row3 + row1).normalize(),
            top: Plane(row3 - row1).normalize(),
            near: Plane(row3 + row2).normalize(),
            far: Plane(row3 - row2).normalize(),
        }
    }

    pub fn as_array(&self) -> [Plane; 6] {
        [self.left, self.right, self.top, self.bottom, self.near, self.far]
    }

    /// `true` if the sphere is entirely outside any one plane, i.e. culled.
    pub fn cull_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.as_array().iter().any(|plane| plane.sphere_outside(center, radius))
    }
}
