//! Global adjustment algorithms
//!
//! Applies the global adjustments to RGB pixel data to produce the base
//! layer the region overlays are composited onto.
//!
//! ## Adjustment Order
//! 1. Brightness (additive offset)
//! 2. Contrast (gain around mid-gray)
//! 3. Global blur (isotropic radius handed to the blur engine)

use image::RgbImage;

use crate::blur::{blur_image, BlurBackend};
use crate::GlobalAdjustments;

/// Apply brightness and contrast to an image's pixel data in place.
///
/// # Arguments
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `adjustments` - The adjustment values to apply
pub fn apply_tone(pixels: &mut [u8], adjustments: &GlobalAdjustments) {
    let brightness = adjustments.brightness();
    let contrast = adjustments.contrast();

    // Early exit if no tonal change
    if brightness == 0.0 && contrast == 0.0 {
        return;
    }

    for chunk in pixels.chunks_exact_mut(3) {
        let mut r = chunk[0] as f32 / 255.0;
        let mut g = chunk[1] as f32 / 255.0;
        let mut b = chunk[2] as f32 / 255.0;

        (r, g, b) = apply_brightness(r, g, b, brightness);
        (r, g, b) = apply_contrast(r, g, b, contrast);

        chunk[0] = to_channel(r);
        chunk[1] = to_channel(g);
        chunk[2] = to_channel(b);
    }
}

/// Render the base layer: brighten, then contrast, then blur.
pub fn render_base_layer(
    source: &RgbImage,
    adjustments: &GlobalAdjustments,
    backend: BlurBackend,
) -> RgbImage {
    let mut toned = source.clone();
    apply_tone(&mut toned, adjustments);

    if adjustments.global_blur_radius() > 0.0 {
        blur_image(&toned, adjustments.global_blur_radius(), backend)
    } else {
        toned
    }
}

/// Apply brightness adjustment.
///
/// Brightness ranges from -100 to +100 and is added as a normalized offset.
///
/// Formula: `output = input + brightness/100`
#[inline]
fn apply_brightness(r: f32, g: f32, b: f32, brightness: f32) -> (f32, f32, f32) {
    if brightness == 0.0 {
        return (r, g, b);
    }
    let offset = brightness / 100.0;
    (r + offset, g + offset, b + offset)
}

/// Apply contrast adjustment.
///
/// Contrast ranges from -100 to +100.
/// Positive values increase contrast, negative values decrease it.
///
/// Formula: `output = (input - 0.5) * (1 + contrast/100) + 0.5`
#[inline]
fn apply_contrast(r: f32, g: f32, b: f32, contrast: f32) -> (f32, f32, f32) {
    if contrast == 0.0 {
        return (r, g, b);
    }
    let factor = 1.0 + (contrast / 100.0);
    let midpoint = 0.5;
    (
        (r - midpoint) * factor + midpoint,
        (g - midpoint) * factor + midpoint,
        (b - midpoint) * factor + midpoint,
    )
}

#[inline]
fn to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
