//! The Readback Service (spec.md §4.6): reads the picker image back to host
//! memory on demand for interactive entity picking. Both operations flush a
//! synchronous one-shot command list and are meant for mouse-driven picking,
//! never per-frame use.

use std::collections::{HashMap, HashSet};

use scene_rhi::{ImageHandle, ResourceState, Rhi};

use crate::error::SceneError;

pub type Entity = u32;

/// Reads the `R` channel of the RG32_UINT picker image back to the CPU.
/// Pixel value `0` is the "no entity" sentinel, per spec.md §4.6.
pub struct ReadbackService;

impl ReadbackService {
    /// Flush a one-shot command list that transitions the picker image to a
    /// copy source and submits synchronously, then read its raw `u32`
    /// texels back in row-major order, `width * height` long.
    fn read_picker_texels(rhi: &dyn Rhi, picker: ImageHandle, width: u32, height: u32) -> Result<Vec<u32>, SceneError> {
        let mut commands = rhi.command_list();
        commands.open();
        commands.set_image_state(picker, ResourceState::CopySource);
        commands.commit_barriers();
        commands.close();
        rhi.submit_wait_idle(commands)?;

        let read_commands = rhi.command_list();
        let bytes = read_commands.read_image(picker);

        let mut texels = Vec::with_capacity((width * height) as usize);
        for chunk in bytes.chunks_exact(8) {
            let r = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            texels.push(r);
        }
        texels.resize((width * height) as usize, 0);
        Ok(texels)
    }

    /// `pickEntityAt`: bounds-checks `(x, y)`, flushes a readback, and
    /// returns the entity id at that pixel, or `None` for background /
    /// out-of-range coordinates. Per spec.md §7, `ReadbackOutOfRange` is
    /// swallowed at this boundary: out-of-range coordinates return `None`
    /// without touching GPU memory, they are not propagated as an error.
    pub fn pick_entity_at(rhi: &dyn Rhi, picker: ImageHandle, width: u32, height: u32, x: u32, y: u32) -> Result<Option<Entity>, SceneError> {
        if x >= width || y >= height {
            log::debug!("{:?}", SceneError::ReadbackOutOfRange(x, y));
            return Ok(None);
        }

        let texels = Self::read_picker_texels(rhi, picker, width, height)?;
        let value = texels[(y * width + x) as usize];
        Ok(if value == 0 { None } else { Some(value) })
    }

    /// `pickEntitiesInRect`: scans every pixel, accumulates each non-zero
    /// id's observed bounding rectangle, then returns ids whose bounds lie
    /// fully inside `[min, max]` -- tight containment, not intersection,
    /// per spec.md §4.6.
    pub fn pick_entities_in_rect(
        rhi: &dyn Rhi,
        picker: ImageHandle,
        width: u32,
        height: u32,
        min: (u32, u32),
        max: (u32, u32),
    ) -> Result<HashSet<Entity>, SceneError> {
        let texels = Self::read_picker_texels(rhi, picker, width, height)?;

        let mut bounds: HashMap<Entity, (u32, u32, u32, u32)> = HashMap::new();
        for y in 0..height {
            for x in 0..width {
                let id = texels[(y * width + x) as usize];
                if id == 0 {
                    continue;
                }
                let entry = bounds.entry(id).or_insert((x, y, x, y));
                entry.0 = entry.0.min(x);
                entry.1 = entry.1.min(y);
                entry.2 = entry.2.max(x);
                entry.3 = entry.3.max(y);
            }
        }

        Ok(bounds
            .into_iter()
            .filter(|&(_, (min_x, min_y, max_x, max_y))| {
                min_x >= min.0 && min_y >= min.1 && max_x <= max.0 && max_y <= max.1
            })
            .map(|(id, _)| id)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use scene_rhi::{ImageDesc, ImageFormat, ImageUsage};
    use scene_rhi::mock::MockRhi;

    fn picker_with_pixels(rhi: &MockRhi, width: u32, height: u32, pixels: &[(u32, u32, u32)]) -> ImageHandle {
        let image = rhi
            .create_image(&ImageDesc {
                width,
                height,
                layers: 1,
                mip_levels: 1,
                format: ImageFormat::Rg32Uint,
                usage: ImageUsage::COLOR_ATTACHMENT | ImageUsage::TRANSFER_SRC,
                initial_state: ResourceState::Undefined,
                keep_initial_state: false,
                debug_name: "test_picker",
            })
            .unwrap();

        let mut bytes = vec![0u8; (width * height * 8) as usize];
        for &(x, y, id) in pixels {
            let offset = ((y * width + x) * 8) as usize;
            bytes[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
        }
        let mut commands = rhi.command_list();
        commands.write_image(image, 0, &bytes);
        image
    }

    #[test]
    fn pick_entity_at_single_pixel_matches_drawn_entity() {
        let rhi = MockRhi::new();
        let picker = picker_with_pixels(&rhi, 4, 4, &[(2, 1, 42)]);
        let result = ReadbackService::pick_entity_at(&rhi, picker, 4, 4, 2, 1).unwrap();
        assert_eq!(result, Some(42));
    }

    #[test]
    fn pick_entity_at_background_pixel_is_none() {
        let rhi = MockRhi::new();
        let picker = picker_with_pixels(&rhi, 4, 4, &[(2, 1, 42)]);
        let result = ReadbackService::pick_entity_at(&rhi, picker, 4, 4, 0, 0).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn pick_entity_at_out_of_range_returns_none_without_querying() {
        let rhi = MockRhi::new();
        let picker = picker_with_pixels(&rhi, 4, 4, &[]);
        let result = ReadbackService::pick_entity_at(&rhi, picker, 4, 4, 10, 10).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn pick_entities_in_rect_uses_tight_containment() {
        let rhi = MockRhi::new();
        // Entity 1 occupies (0,0)-(1,1); entity 2 occupies (5,5) -- outside the query rect.
        let picker = picker_with_pixels(&rhi, 8, 8, &[(0, 0, 1), (1, 1, 1), (5, 5, 2)]);
        let found = ReadbackService::pick_entities_in_rect(&rhi, picker, 8, 8, (0, 0), (2, 2)).unwrap();
        assert_eq!(found, HashSet::from([1]));
    }
}
