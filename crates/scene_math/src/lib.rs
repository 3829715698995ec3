pub mod aabb;
pub mod plane;

pub mod prelude {
    pub use glam::{Mat3, Mat4, Quat, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};
    pub use glam::swizzles::{Vec2Swizzles, Vec3Swizzles, Vec4Swizzles};

    pub use crate::aabb::Aabb;
    pub use crate::plane::{Frustum, Plane};
}
