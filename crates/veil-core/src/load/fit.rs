//! Fit-to-viewport sizing for the editing surface.

use super::Viewport;
use crate::EditorConfig;

/// Largest display size allowed for a viewport, before aspect fitting.
///
/// Each axis is the configured fraction of the viewport, capped by the
/// configured maximum (by default `min(0.6 * width, 800)` and
/// `min(0.6 * height, 500)`).
pub fn display_bounds(viewport: Viewport, config: &EditorConfig) -> (f64, f64) {
    let fraction = config.viewport_fraction.clamp(0.0, 1.0);
    let max_w = (f64::from(viewport.width) * fraction).min(f64::from(config.max_display_width));
    let max_h =
        (f64::from(viewport.height) * fraction).min(f64::from(config.max_display_height));
    (max_w, max_h)
}

/// Calculate the display size of a `width x height` image.
///
/// The image is scaled (up or down) by a single factor so it fits inside
/// [`display_bounds`] on both axes, preserving the aspect ratio.
///
/// # Returns
///
/// `(display_width, display_height, scale)`, or `None` when the viewport
/// leaves less than one pixel on either axis or the image is empty.
pub fn fit_to_viewport(
    width: u32,
    height: u32,
    viewport: Viewport,
    config: &EditorConfig,
) -> Option<(u32, u32, f64)> {
    if width == 0 || height == 0 {
        return None;
    }

    let (max_w, max_h) = display_bounds(viewport, config);
    if max_w < 1.0 || max_h < 1.0 {
        return None;
    }

    let scale = (max_w / f64::from(width)).min(max_h / f64::from(height));
    let display_w = fit_axis(width, scale, max_w);
    let display_h = fit_axis(height, scale, max_h);

    Some((display_w, display_h, scale))
}

fn fit_axis(size: u32, scale: f64, bound: f64) -> u32 {
    let scaled = (f64::from(size) * scale).round();
    scaled.min(bound.floor()).max(1.0) as u32
}
