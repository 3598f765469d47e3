//! Stage compositing.
//!
//! The stage is always the base layer (source after global adjustments)
//! with every region's blurred patch painted on top in creation order.
//!
//! ## Caching
//!
//! - The base layer is rebuilt only when the global adjustments change.
//! - Each region's patch is blurred only over the region's bounds and cached
//!   by region id. A patch is reused while its rectangle, strength and base
//!   revision all match.

use std::collections::HashMap;

use image::RgbImage;

use crate::adjustments::render_base_layer;
use crate::blur::{blur_rect, BlurBackend};
use crate::geometry::PixelRect;
use crate::region::RegionId;
use crate::GlobalAdjustments;

/// A region as the compositor sees it: display-space bounds and radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayer {
    pub id: RegionId,
    pub rect: PixelRect,
    pub strength: u32,
}

#[derive(Debug, Clone)]
struct Patch {
    /// Region bounds the patch was blurred for
    layer_rect: PixelRect,
    /// Bounds after clipping to the stage
    rect: PixelRect,
    strength: u32,
    base_revision: u64,
    pixels: RgbImage,
}

impl Patch {
    fn is_current(&self, layer: &RegionLayer, base_revision: u64) -> bool {
        self.layer_rect == layer.rect
            && self.strength == layer.strength
            && self.base_revision == base_revision
    }
}

/// Keeps the base layer, the composed stage and the per-region patches.
#[derive(Debug, Clone)]
pub struct Compositor {
    backend: BlurBackend,
    base: RgbImage,
    base_revision: u64,
    stage: RgbImage,
    patches: HashMap<RegionId, Patch>,
}

impl Compositor {
    /// Build the base layer for `source` and an initial stage with no regions.
    pub fn new(source: &RgbImage, adjustments: &GlobalAdjustments, backend: BlurBackend) -> Self {
        let base = render_base_layer(source, adjustments, backend);
        let stage = base.clone();
        Self {
            backend,
            base,
            base_revision: 0,
            stage,
            patches: HashMap::new(),
        }
    }

    /// Re-render the base layer after an adjustment change.
    ///
    /// Every cached patch becomes stale. Call [`Compositor::render`] to
    /// refresh the stage afterwards.
    pub fn rebuild_base(&mut self, source: &RgbImage, adjustments: &GlobalAdjustments) {
        self.base = render_base_layer(source, adjustments, self.backend);
        self.base_revision += 1;
        self.patches.clear();
    }

    /// Recompose the whole stage from the base layer and `layers`.
    ///
    /// Layers are painted in slice order. Patches of regions not in `layers`
    /// are evicted.
    pub fn render(&mut self, layers: &[RegionLayer]) -> &RgbImage {
        self.patches
            .retain(|id, _| layers.iter().any(|layer| layer.id == *id));

        let stage: &mut [u8] = &mut self.stage;
        stage.copy_from_slice(&self.base);

        let full = PixelRect::full(self.stage.width(), self.stage.height());
        for layer in layers {
            self.paint(layer, full);
        }
        &self.stage
    }

    /// Recompose only the `dirty` area of the stage.
    ///
    /// Produces the same pixels a full [`Compositor::render`] would, since
    /// patches do not depend on which area is being repainted.
    pub fn render_dirty(&mut self, layers: &[RegionLayer], dirty: PixelRect) -> &RgbImage {
        let full = PixelRect::full(self.stage.width(), self.stage.height());
        let Some(dirty) = dirty.intersect(&full) else {
            return &self.stage;
        };

        blit(&mut self.stage, &self.base, full, dirty);
        for layer in layers {
            self.paint(layer, dirty);
        }
        &self.stage
    }

    /// The composed stage.
    pub fn stage(&self) -> &RgbImage {
        &self.stage
    }

    /// The base layer (source after global adjustments).
    pub fn base(&self) -> &RgbImage {
        &self.base
    }

    /// Number of region patches currently cached.
    pub fn cached_patches(&self) -> usize {
        self.patches.len()
    }

    /// Take the stage, discarding the caches.
    pub fn into_stage(self) -> RgbImage {
        self.stage
    }

    /// Paint one layer's patch onto the stage, limited to `area`.
    fn paint(&mut self, layer: &RegionLayer, area: PixelRect) {
        let (width, height) = self.stage.dimensions();
        let Some(target) = clip(layer.rect, width, height, area) else {
            return;
        };

        let base_revision = self.base_revision;
        let stale = self
            .patches
            .get(&layer.id)
            .map_or(true, |patch| !patch.is_current(layer, base_revision));
        if stale {
            let rect = layer.rect.intersect(&PixelRect::full(width, height));
            let Some(rect) = rect else {
                return;
            };
            let pixels = blur_rect(&self.base, rect, layer.strength as f32, self.backend);
            self.patches.insert(
                layer.id,
                Patch {
                    layer_rect: layer.rect,
                    rect,
                    strength: layer.strength,
                    base_revision,
                    pixels,
                },
            );
        }

        if let Some(patch) = self.patches.get(&layer.id) {
            blit(&mut self.stage, &patch.pixels, patch.rect, target);
        }
    }
}

/// Compose a stage in one shot, without keeping any cache around.
pub fn compose(
    source: &RgbImage,
    adjustments: &GlobalAdjustments,
    layers: &[RegionLayer],
    backend: BlurBackend,
) -> RgbImage {
    let mut compositor = Compositor::new(source, adjustments, backend);
    compositor.render(layers);
    compositor.into_stage()
}

/// `rect` clipped to a `width x height` stage and to `area`.
fn clip(rect: PixelRect, width: u32, height: u32, area: PixelRect) -> Option<PixelRect> {
    rect.intersect(&PixelRect::full(width, height))?
        .intersect(&area)
}

/// Copy `area` (in `dst` coordinates) from `src`, whose top-left pixel sits
/// at `src_rect`'s origin in `dst` coordinates.
fn blit(dst: &mut RgbImage, src: &RgbImage, src_rect: PixelRect, area: PixelRect) {
    let dst_stride = dst.width() as usize * 3;
    let src_stride = src.width() as usize * 3;
    let len = area.width as usize * 3;
    let src_x = (area.x - src_rect.x) as usize;
    let src_y = (area.y - src_rect.y) as usize;

    let src: &[u8] = src;
    let dst: &mut [u8] = dst;
    for row in 0..area.height as usize {
        let s = (src_y + row) * src_stride + src_x * 3;
        let d = (area.y as usize + row) * dst_stride + area.x as usize * 3;
        dst[d..d + len].copy_from_slice(&src[s..s + len]);
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
