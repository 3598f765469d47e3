//! Blur primitives for the base layer and region patches.
//!
//! Two backends are available:
//!
//! - **Native**: the `image` crate's separable Gaussian blur, with the
//!   radius used as the standard deviation.
//! - **Box**: a neighborhood-mean blur with clamp-to-edge boundaries, kept
//!   as a dependency-free fallback with exact, predictable output.
//!
//! ## Region-Restricted Blurring
//!
//! Both backends can blur only a sub-rectangle of an image. The output of
//! [`blur_rect`] is identical to cropping a full-frame blur to the same
//! rectangle, because samples are always taken from the whole source with
//! the image border (not the rectangle border) as the clamping edge.

mod box_blur;
mod gaussian;

pub use box_blur::box_blur_rect;
pub use gaussian::gaussian_blur_rect;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::geometry::PixelRect;

/// Blur implementation used by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurBackend {
    /// Gaussian blur provided by the `image` crate.
    #[default]
    Native,
    /// Manual box blur with clamp-to-edge sampling.
    Box,
}

/// Blur the pixels inside `rect`, returning a `rect`-sized image.
///
/// `rect` is clipped to the source bounds first. A radius of zero (or
/// below) returns an unblurred copy of the area.
pub fn blur_rect(source: &RgbImage, rect: PixelRect, radius: f32, backend: BlurBackend) -> RgbImage {
    let Some(rect) = rect.intersect(&PixelRect::full(source.width(), source.height())) else {
        return RgbImage::new(0, 0);
    };

    match backend {
        BlurBackend::Native => gaussian_blur_rect(source, rect, radius),
        BlurBackend::Box => box_blur_rect(source, rect, box_radius(radius)),
    }
}

/// Blur a whole image.
pub fn blur_image(source: &RgbImage, radius: f32, backend: BlurBackend) -> RgbImage {
    blur_rect(
        source,
        PixelRect::full(source.width(), source.height()),
        radius,
        backend,
    )
}

/// Integer radius used by the box backend.
#[inline]
fn box_radius(radius: f32) -> u32 {
    if radius.is_finite() && radius > 0.0 {
        radius.round() as u32
    } else {
        0
    }
}

/// Copy of the `rect` area of `source`.
pub(crate) fn crop_copy(source: &RgbImage, rect: PixelRect) -> RgbImage {
    image::imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) * 3 % 256) as u8])
        })
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let img = gradient(20, 10);
        for backend in [BlurBackend::Native, BlurBackend::Box] {
            assert_eq!(blur_image(&img, 0.0, backend), img);
        }
    }

    #[test]
    fn test_rect_clipped_to_source() {
        let img = gradient(20, 10);
        let patch = blur_rect(&img, PixelRect::new(15, 5, 20, 20), 2.0, BlurBackend::Box);
        assert_eq!(patch.dimensions(), (5, 5));
    }

    #[test]
    fn test_rect_outside_source_is_empty() {
        let img = gradient(20, 10);
        let patch = blur_rect(&img, PixelRect::new(30, 30, 5, 5), 2.0, BlurBackend::Native);
        assert_eq!(patch.dimensions(), (0, 0));
    }

    #[test]
    fn test_region_blur_matches_full_frame_crop() {
        let img = gradient(40, 30);
        let rect = PixelRect::new(3, 4, 15, 12);
        for backend in [BlurBackend::Native, BlurBackend::Box] {
            let full = blur_image(&img, 4.0, backend);
            let patch = blur_rect(&img, rect, 4.0, backend);
            let expected = crop_copy(&full, rect);
            if backend == BlurBackend::Box {
                assert_eq!(patch, expected);
            } else {
                // Gaussian kernels are truncated differently at the window
                // border, so allow rounding noise.
                for (a, b) in patch.pixels().zip(expected.pixels()) {
                    for c in 0..3 {
                        let diff = (i16::from(a.0[c]) - i16::from(b.0[c])).abs();
                        assert!(diff <= 2, "Native patch differs by {diff}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_box_radius_conversion() {
        assert_eq!(box_radius(0.0), 0);
        assert_eq!(box_radius(-3.0), 0);
        assert_eq!(box_radius(f32::NAN), 0);
        assert_eq!(box_radius(2.4), 2);
        assert_eq!(box_radius(2.6), 3);
    }

    #[test]
    fn test_backend_serde_names() {
        use serde::de::value::{Error, StrDeserializer};
        use serde::de::IntoDeserializer;

        let de: StrDeserializer<'_, Error> = "box".into_deserializer();
        assert_eq!(BlurBackend::deserialize(de).unwrap(), BlurBackend::Box);
    }
}
