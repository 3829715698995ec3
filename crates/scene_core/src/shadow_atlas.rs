use scene_math::prelude::*;

/// Array layer reserved for spot-light shadows; layers `0..6` are the six
/// cube faces a point light's shadow occupies within its one allocated
/// tile.
pub const SPOT_LAYER: u32 = 6;
pub const LAYERS_PER_TILE: u32 = 7;

/// Sentinel returned by [`ShadowAtlas::allocate_tile`] on exhaustion.
pub const NO_TILE: i32 = -1;

/// A single 2D image-array divided into `tiles_per_row * tiles_per_row`
/// power-of-two tiles, per spec.md §3/§6. Tiles are allocated at most once
/// per frame and freed en masse at frame start; no tile index is reused
/// within a frame.
pub struct ShadowAtlas {
    tiles_per_row: u32,
    next_free: u32,
}

impl ShadowAtlas {
    pub fn new(tiles_per_row: u32) -> Self {
        Self { tiles_per_row, next_free: 0 }
    }

    pub fn tile_capacity(&self) -> u32 {
        self.tiles_per_row * self.tiles_per_row
    }

    /// Free every tile allocated this frame. Called by the Reset pass at
    /// frame start.
    pub fn free_all(&mut self) {
        self.next_free = 0;
    }

    /// Returns a tile index and its `[0,1]^2` UV rect within one array
    /// layer, or `None` on exhaustion -- the caller maps this to
    /// `ShadowSlot.tileIndex = -1` and the light stays unshadowed this
    /// frame (spec.md §4.3's tile-allocation contract).
    pub fn allocate_tile(&mut self) -> Option<(u32, Vec2, Vec2)> {
        if self.next_free >= self.tile_capacity() {
            return None;
        }
        let index = self.next_free;
        self.next_free += 1;

        let scale = 1.0 / self.tiles_per_row as f32;
        let x = (index % self.tiles_per_row) as f32;
        let y = (index / self.tiles_per_row) as f32;
        Some((index, Vec2::new(x * scale, y * scale), Vec2::splat(scale)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exhaustion_returns_none() {
        let mut atlas = ShadowAtlas::new(1);
        assert!(atlas.allocate_tile().is_some());
        assert!(atlas.allocate_tile().is_none(), "single-tile atlas must be exhausted after one alloc");
    }

    #[test]
    fn allocate_free_all_allocate_is_deterministic() {
        let mut atlas = ShadowAtlas::new(2);
        let first_round: Vec<_> = std::iter::from_fn(|| atlas.allocate_tile()).map(|(i, ..)| i).collect();
        atlas.free_all();
        let second_round: Vec<_> = std::iter::from_fn(|| atlas.allocate_tile()).map(|(i, ..)| i).collect();
        assert_eq!(first_round, second_round);
    }

    #[test]
    fn uv_rect_is_within_unit_square() {
        let mut atlas = ShadowAtlas::new(4);
        while let Some((_, offset, scale)) = atlas.allocate_tile() {
            assert!(offset.x >= 0.0 && offset.y >= 0.0);
            assert!(offset.x + scale.x <= 1.0 + f32::EPSILON);
            assert!(offset.y + scale.y <= 1.0 + f32::EPSILON);
        }
    }
}
