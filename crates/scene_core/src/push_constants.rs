//! Push-constant layouts matching the byte budgets in spec.md §6. Each
//! struct's size is asserted at compile time against the documented budget,
//! mirroring the teacher's tendency to `assert_eq!`/`static_assert` GPU
//! struct layouts near their definition rather than trust `repr(C)` alone.

use scene_math::prelude::*;

/// See Design Notes/Open Questions: treated as a shader push-constant
/// register budget artifact -- `(128 - 12) / 4`, a 3-word header (color,
/// thickness+count packed, reserved) followed by one `u32` per id.
pub const MAX_SELECTION_IDS: usize = 29;

macro_rules! assert_push_constant_size {
    ($ty:ty, $bytes:expr) => {
        const _: () = assert!(std::mem::size_of::<$ty>() == $bytes, "push constant size mismatch");
    };
}

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct DepthPyramidPushConstants {
    pub mip_width: u32,
    pub mip_height: u32,
}
assert_push_constant_size!(DepthPyramidPushConstants, 8);

/// The projection's inverse is carried as its two diagonal scaling factors
/// (mirroring `CullData`'s `P00`/`P11` in spec.md §3) rather than a full
/// `Mat4`, since a whole matrix alone would consume the entire 64-byte
/// budget and leave no room for `near`/`far`/`grid`/`screen`.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClusterBuildPushConstants {
    pub inverse_proj_diag: Vec2,
    pub near: f32,
    pub far: f32,
    pub grid: UVec3,
    pub screen: Vec2,
    pub _pad: [u32; 7],
}
assert_push_constant_size!(ClusterBuildPushConstants, 64);

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct LightCullPushConstants {
    pub view: Mat4,
}
assert_push_constant_size!(LightCullPushConstants, 64);

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ShadowPassPushConstants {
    pub light_index: u32,
}
assert_push_constant_size!(ShadowPassPushConstants, 4);

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct SelectionPushConstants {
    pub outline_color: [u8; 4],
    pub thickness: f32,
    pub count: u32,
    pub ids: [u32; MAX_SELECTION_IDS],
}
assert_push_constant_size!(SelectionPushConstants, 128);

#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ToneMapPushConstants {
    pub exposure: f32,
    pub time: f32,
}
assert_push_constant_size!(ToneMapPushConstants, 8);

/// Truncates `ids` to [`MAX_SELECTION_IDS`], logging once per frame when it
/// had to drop entries -- spec.md §4.5 pass 15's push-constant cap.
pub fn build_selection_push_constants(outline_color: [u8; 4], thickness: f32, ids: &[u32]) -> SelectionPushConstants {
    let count = ids.len().min(MAX_SELECTION_IDS);
    if ids.len() > MAX_SELECTION_IDS {
        log::warn!(
            "selection pass truncating {} selected ids to MAX_SELECTION_IDS ({})",
            ids.len(),
            MAX_SELECTION_IDS
        );
    }

    let mut packed = [0u32; MAX_SELECTION_IDS];
    packed[..count].copy_from_slice(&ids[..count]);

    SelectionPushConstants { outline_color, thickness, count: count as u32, ids: packed }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selection_ids_beyond_cap_are_truncated() {
        let ids: Vec<u32> = (0..40).collect();
        let pc = build_selection_push_constants([255, 255, 255, 255], 2.0, &ids);
        assert_eq!(pc.count, MAX_SELECTION_IDS as u32);
        assert_eq!(pc.ids[0], 0);
        assert_eq!(pc.ids[MAX_SELECTION_IDS - 1], (MAX_SELECTION_IDS - 1) as u32);
    }
}
