//! Box blur with clamp-to-edge sampling.
//!
//! Each output pixel is the unweighted mean of the `(2r+1) x (2r+1)`
//! neighborhood around it. Neighbors outside the image reuse the nearest
//! edge pixel; nothing is ever read outside the source bounds.
//!
//! The mean is computed separably with exact integer sums (a row pass that
//! keeps the raw sums, then a column pass over those sums), so the result is
//! bit-identical to the direct `(2r+1)²` average rounded half up.

use image::RgbImage;

use super::crop_copy;
use crate::geometry::PixelRect;

/// Box blur the `rect` area of `source` with the given radius.
///
/// `rect` must lie inside the source. Returns a `rect`-sized image.
pub fn box_blur_rect(source: &RgbImage, rect: PixelRect, radius: u32) -> RgbImage {
    if radius == 0 || rect.is_empty() {
        return crop_copy(source, rect);
    }

    let (src_w, src_h) = source.dimensions();
    let raw = source.as_raw();
    let r = radius as i64;
    let out_w = rect.width as usize;

    // Source rows the column pass can touch, after clamping.
    let row_first = (i64::from(rect.y) - r).max(0) as u32;
    let row_last = (i64::from(rect.bottom()) - 1 + r).min(i64::from(src_h) - 1) as u32;
    let row_count = (row_last - row_first + 1) as usize;

    // Row pass: horizontal window sums for every needed source row.
    let mut row_sums = vec![0u32; row_count * out_w * 3];
    for (ri, sy) in (row_first..=row_last).enumerate() {
        let row_start = (sy * src_w * 3) as usize;
        for ox in 0..out_w {
            let cx = i64::from(rect.x) + ox as i64;
            let mut acc = [0u32; 3];
            for dx in -r..=r {
                let sx = clamp_index(cx + dx, src_w);
                let idx = row_start + sx * 3;
                acc[0] += u32::from(raw[idx]);
                acc[1] += u32::from(raw[idx + 1]);
                acc[2] += u32::from(raw[idx + 2]);
            }
            let dst = (ri * out_w + ox) * 3;
            row_sums[dst..dst + 3].copy_from_slice(&acc);
        }
    }

    // Column pass over the row sums.
    let count = (2 * radius + 1) * (2 * radius + 1);
    let half = count / 2;
    let mut output = RgbImage::new(rect.width, rect.height);
    let out: &mut [u8] = &mut output;

    for oy in 0..rect.height as usize {
        let cy = i64::from(rect.y) + oy as i64;
        for ox in 0..out_w {
            let mut acc = [0u32; 3];
            for dy in -r..=r {
                let sy = clamp_index(cy + dy, src_h) as u32;
                let ri = (sy - row_first) as usize;
                let idx = (ri * out_w + ox) * 3;
                acc[0] += row_sums[idx];
                acc[1] += row_sums[idx + 1];
                acc[2] += row_sums[idx + 2];
            }
            let dst = (oy * out_w + ox) * 3;
            out[dst] = ((acc[0] + half) / count) as u8;
            out[dst + 1] = ((acc[1] + half) / count) as u8;
            out[dst + 2] = ((acc[2] + half) / count) as u8;
        }
    }

    output
}

/// Clamp a signed coordinate onto `0..len`.
#[inline]
fn clamp_index(value: i64, len: u32) -> usize {
    value.clamp(0, i64::from(len) - 1) as usize
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for a small image with random content.
    fn image_strategy() -> impl Strategy<Value = RgbImage> {
        (1u32..=12, 1u32..=12).prop_flat_map(|(w, h)| {
            let size = (w * h * 3) as usize;
            prop::collection::vec(any::<u8>(), size..=size)
                .prop_map(move |pixels| RgbImage::from_raw(w, h, pixels).unwrap())
        })
    }

    proptest! {
        /// Property: output stays within the min/max of the source channel,
        /// which holds only if every sample comes from inside the image.
        #[test]
        fn prop_output_within_source_range(
            img in image_strategy(),
            radius in 0u32..=6,
        ) {
            let blurred = box_blur_rect(&img, PixelRect::full(img.width(), img.height()), radius);
            for c in 0..3 {
                let min = img.pixels().map(|p| p.0[c]).min().unwrap();
                let max = img.pixels().map(|p| p.0[c]).max().unwrap();
                for p in blurred.pixels() {
                    prop_assert!(p.0[c] >= min && p.0[c] <= max);
                }
            }
        }

        /// Property: dimensions always match the requested rectangle.
        #[test]
        fn prop_patch_dimensions(
            img in image_strategy(),
            radius in 0u32..=6,
            fx in 0.0f64..1.0, fy in 0.0f64..1.0,
        ) {
            let x = (fx * f64::from(img.width())) as u32;
            let y = (fy * f64::from(img.height())) as u32;
            let rect = PixelRect::new(x, y, img.width() - x, img.height() - y);
            let patch = box_blur_rect(&img, rect, radius);
            prop_assert_eq!(patch.dimensions(), (rect.width, rect.height));
        }
    }
}
