use crate::prelude::*;

/// Axis aligned bounding box in 3D space.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Min corner of the box.
    pub min: Vec3,

    /// Max corner of the box.
    pub max: Vec3,
}

impl Aabb {
    /// [`Aabb`] where both corners are [`Vec3::ZERO`].
    pub const ZERO: Self = Self::from_corners(Vec3::ZERO, Vec3::ZERO);

    #[inline]
    pub const fn from_corners(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Build the tightest box containing `points`.
    ///
    /// Panics if `points` is empty.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = points[0];
        let mut max = points[0];

        for &point in &points[1..] {
            min = min.min(point);
            max = max.max(point);
        }

        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The 8 corners of the box, in no particular winding order.
    pub fn corners(&self) -> [Vec3; 8] {
        let Self { min, max } = *self;
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Transform the box by `transform`, returning the new axis-aligned box
    /// that contains the transformed corners.
    pub fn transform(&self, transform: Mat4) -> Self {
        let corners = self.corners().map(|corner| transform.transform_point3(corner));
        Self::from_points(&corners)
    }

    /// The smallest sphere that contains this box, centered at the box center.
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.center(), self.extents().length())
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}
