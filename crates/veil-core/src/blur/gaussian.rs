//! Gaussian blur backed by the `image` crate.

use image::RgbImage;

use super::crop_copy;
use crate::geometry::PixelRect;

/// Gaussian blur the `rect` area of `source`, with `sigma` as the standard
/// deviation.
///
/// Only a window around `rect` (grown by four standard deviations and
/// clipped to the image) is blurred, then trimmed back to `rect`. Samples
/// near the image border are clamped by the underlying filter.
///
/// Non-positive or non-finite sigma values return an unblurred copy, since
/// the underlying filter substitutes its own default for them.
pub fn gaussian_blur_rect(source: &RgbImage, rect: PixelRect, sigma: f32) -> RgbImage {
    if !sigma.is_finite() || sigma <= 0.0 || rect.is_empty() {
        return crop_copy(source, rect);
    }

    let margin = (sigma * 4.0).ceil() as u32;
    let window = rect.expand(margin, source.width(), source.height());
    let windowed = crop_copy(source, window);
    let blurred = image::imageops::blur(&windowed, sigma);

    crop_copy(
        &blurred,
        PixelRect::new(
            rect.x - window.x,
            rect.y - window.y,
            rect.width,
            rect.height,
        ),
    )
}
