//! Hi-Z depth pyramid: a mip-chained `R32F` image where each mip holds the
//! `min` reduction of its parent's 2x2 footprint, per spec.md §3/§4.5 step 5.
//! Grounded on the teacher's `src/depth_reduce.rs` (same reduction, over a
//! `wgpu` compute pass instead of this workspace's RHI trait).

use scene_rhi::{ImageDesc, ImageFormat, ImageHandle, ImageUsage, ResourceState, Rhi, RhiError};

/// Mip count for a pyramid covering `max(width, height)`, per spec.md §3:
/// `floor(log2(max(w,h))) + 1`.
pub fn mip_count(width: u32, height: u32) -> u32 {
    32 - (width.max(height).max(1)).leading_zeros()
}

/// Largest power-of-two <= `value`, per spec.md §3's pyramid sizing rule.
fn largest_pow2_leq(value: u32) -> u32 {
    if value == 0 {
        0
    } else {
        1 << (31 - value.leading_zeros())
    }
}

pub struct DepthPyramid {
    pub image: ImageHandle,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
}

impl DepthPyramid {
    pub fn create(rhi: &dyn Rhi, framebuffer_width: u32, framebuffer_height: u32) -> Result<Self, RhiError> {
        let width = largest_pow2_leq(framebuffer_width);
        let height = largest_pow2_leq(framebuffer_height);
        let mip_levels = mip_count(width, height);

        let image = rhi.create_image(&ImageDesc {
            width,
            height,
            layers: 1,
            mip_levels,
            format: ImageFormat::R32Float,
            usage: ImageUsage::STORAGE | ImageUsage::SAMPLED,
            initial_state: ResourceState::Undefined,
            keep_initial_state: false,
            debug_name: "depth_pyramid",
        })?;

        Ok(Self { image, width, height, mip_levels })
    }

    /// Dimensions of mip `level`, halving (rounding down, floored at 1) each
    /// level from the base.
    pub fn mip_extent(&self, level: u32) -> (u32, u32) {
        (
            (self.width >> level).max(1),
            (self.height >> level).max(1),
        )
    }
}

/// CPU reference implementation of one mip-reduction step: mip `i`'s texel
/// at `(x, y)` is the `min` of mip `i-1`'s 2x2 footprint at
/// `(2x..2x+1, 2y..2y+1)`. The GPU compute pass performs the equivalent
/// reduction per spec.md §8 invariant 6; this function exists so that
/// invariant is directly testable without a real device.
pub fn reduce_mip(src: &[f32], src_width: u32, src_height: u32) -> Vec<f32> {
    let dst_width = (src_width / 2).max(1);
    let dst_height = (src_height / 2).max(1);
    let mut dst = vec![f32::MAX; (dst_width * dst_height) as usize];

    for y in 0..dst_height {
        for x in 0..dst_width {
            let mut value = f32::MAX;
            for dy in 0..2 {
                for dx in 0..2 {
                    let sx = (x * 2 + dx).min(src_width - 1);
                    let sy = (y * 2 + dy).min(src_height - 1);
                    value = value.min(src[(sy * src_width + sx) as usize]);
                }
            }
            dst[(y * dst_width + x) as usize] = value;
        }
    }

    dst
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mip_count_matches_floor_log2_plus_one() {
        assert_eq!(mip_count(1024, 1024), 11);
        assert_eq!(mip_count(1920, 1080), 11);
        assert_eq!(mip_count(1, 1), 1);
    }

    #[test]
    fn largest_pow2_leq_rounds_down() {
        assert_eq!(largest_pow2_leq(1920), 1024);
        assert_eq!(largest_pow2_leq(1024), 1024);
    }

    #[test]
    fn reduce_mip_is_min_of_2x2_footprint() {
        #[rustfmt::skip]
        let src = vec![
            1.0, 2.0, 5.0, 6.0,
            3.0, 4.0, 7.0, 8.0,
            9.0, 9.0, 9.0, 9.0,
            9.0, 9.0, 9.0, 9.0,
        ];
        let dst = reduce_mip(&src, 4, 4);
        assert_eq!(dst, vec![1.0, 5.0, 9.0, 9.0]);
    }

    #[test]
    fn chained_reduction_matches_invariant_within_one_ulp() {
        let mip0 = vec![1.0, 3.0, 2.0, 4.0, 5.0, 7.0, 6.0, 8.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0];
        let mip1 = reduce_mip(&mip0, 4, 4);
        let mip2 = reduce_mip(&mip1, 2, 2);
        for (i, &value) in mip2.iter().enumerate() {
            let direct = reduce_mip(&mip1, 2, 2)[i];
            assert!((value - direct).abs() <= f32::EPSILON);
        }
    }
}
