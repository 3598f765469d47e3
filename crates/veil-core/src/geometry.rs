//! Points and rectangles shared by the region manager and compositor.
//!
//! # Coordinate Systems
//!
//! - **Display space**: integer pixels of the scaled-to-fit editing surface.
//!   Pointer input and on-screen rendering happen here.
//! - **Normalized space**: 0.0 to 1.0 relative to the image, independent of
//!   any surface size. Region geometry is stored here so it can be projected
//!   onto the display surface or onto the full-resolution source at export.

use serde::{Deserialize, Serialize};

/// A pointer position in display-space pixels.
///
/// Signed because pointer events can land outside the surface while a drag
/// is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Clamp the point onto a `width x height` surface.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let max_x = i32::try_from(width).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x: self.x.clamp(0, max_x),
            y: self.y.clamp(0, max_y),
        }
    }
}

/// An axis-aligned rectangle in pixel coordinates.
///
/// `x`/`y` is the top-left corner; the rectangle covers the half-open ranges
/// `x..x + width` and `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Normalize a drag gesture into a rectangle.
    ///
    /// The origin is the minimum of the two corners and the size is the
    /// absolute difference, so dragging up or left still yields a positive
    /// width and height. Negative coordinates are clamped to zero.
    pub fn from_drag(start: Point, end: Point) -> Self {
        let left = i64::from(start.x.min(end.x)).max(0);
        let top = i64::from(start.y.min(end.y)).max(0);
        let right = i64::from(start.x.max(end.x)).max(0);
        let bottom = i64::from(start.y.max(end.y)).max(0);

        Self {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the point lies inside the rectangle.
    pub fn contains(&self, point: Point) -> bool {
        let (px, py) = (i64::from(point.x), i64::from(point.y));
        px >= i64::from(self.x)
            && py >= i64::from(self.y)
            && px < i64::from(self.right())
            && py < i64::from(self.bottom())
    }

    /// Overlapping area of two rectangles, or `None` if they do not overlap.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }
        Some(PixelRect::new(left, top, right - left, bottom - top))
    }

    /// Smallest rectangle covering both rectangles.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        PixelRect::new(left, top, right - left, bottom - top)
    }

    /// Grow the rectangle by `margin` on every side, staying inside a
    /// `width x height` image.
    pub fn expand(&self, margin: u32, width: u32, height: u32) -> PixelRect {
        let left = self.x.saturating_sub(margin);
        let top = self.y.saturating_sub(margin);
        let right = self.right().saturating_add(margin).min(width);
        let bottom = self.bottom().saturating_add(margin).min(height);
        PixelRect::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }
}

/// A rectangle in normalized image coordinates (0.0 to 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    /// Convert a pixel rectangle on a `surface_width x surface_height`
    /// surface into normalized coordinates.
    pub fn from_pixels(rect: PixelRect, surface_width: u32, surface_height: u32) -> Self {
        let w = f64::from(surface_width.max(1));
        let h = f64::from(surface_height.max(1));
        Self {
            x: f64::from(rect.x) / w,
            y: f64::from(rect.y) / h,
            width: f64::from(rect.width) / w,
            height: f64::from(rect.height) / h,
        }
    }

    /// Project onto a `surface_width x surface_height` surface.
    ///
    /// Position and size are rounded independently so a moved rectangle
    /// keeps its exact pixel size. The result always lies inside the surface
    /// and is at least 1x1 for a non-empty surface.
    pub fn to_pixels(&self, surface_width: u32, surface_height: u32) -> PixelRect {
        let (x, width) = project_axis(self.x, self.width, surface_width);
        let (y, height) = project_axis(self.y, self.height, surface_height);
        PixelRect::new(x, y, width, height)
    }

    /// Move the rectangle so its top-left corner sits at a display-space
    /// position, keeping the normalized size untouched.
    pub fn with_origin(&self, rect: PixelRect, surface_width: u32, surface_height: u32) -> Self {
        Self {
            x: f64::from(rect.x) / f64::from(surface_width.max(1)),
            y: f64::from(rect.y) / f64::from(surface_height.max(1)),
            width: self.width,
            height: self.height,
        }
    }
}

fn project_axis(origin: f64, extent: f64, surface: u32) -> (u32, u32) {
    if surface == 0 {
        return (0, 0);
    }
    let scale = f64::from(surface);
    let size = ((extent * scale).round().max(1.0) as u32).min(surface);
    let start = ((origin * scale).round().max(0.0) as u32).min(surface - size);
    (start, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_drag_down_right() {
        let rect = PixelRect::from_drag(Point::new(10, 20), Point::new(50, 70));
        assert_eq!(rect, PixelRect::new(10, 20, 40, 50));
    }

    #[test]
    fn test_from_drag_up_left_flips_origin() {
        let rect = PixelRect::from_drag(Point::new(50, 50), Point::new(10, 10));
        assert_eq!(rect, PixelRect::new(10, 10, 40, 40));
    }

    #[test]
    fn test_from_drag_negative_clamped() {
        let rect = PixelRect::from_drag(Point::new(-10, -5), Point::new(20, 20));
        assert_eq!(rect, PixelRect::new(0, 0, 20, 20));
    }

    #[test]
    fn test_contains_is_half_open() {
        let rect = PixelRect::new(10, 10, 5, 5);
        assert!(rect.contains(Point::new(10, 10)));
        assert!(rect.contains(Point::new(14, 14)));
        assert!(!rect.contains(Point::new(15, 14)));
        assert!(!rect.contains(Point::new(9, 12)));
        assert!(!rect.contains(Point::new(-1, -1)));
    }

    #[test]
    fn test_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(5, 5, 5, 5)));

        let c = PixelRect::new(10, 0, 5, 5);
        assert_eq!(a.intersect(&c), None, "Touching edges do not overlap");
    }

    #[test]
    fn test_union() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(20, 5, 5, 10);
        assert_eq!(a.union(&b), PixelRect::new(0, 0, 25, 15));
        assert_eq!(PixelRect::default().union(&b), b);
    }

    #[test]
    fn test_expand_clamps_to_image() {
        let rect = PixelRect::new(2, 3, 4, 4);
        assert_eq!(rect.expand(5, 10, 9), PixelRect::new(0, 0, 10, 9));
        assert_eq!(rect.expand(1, 100, 100), PixelRect::new(1, 2, 6, 6));
    }

    #[test]
    fn test_point_clamp() {
        assert_eq!(Point::new(-3, 900).clamp_to(800, 500), Point::new(0, 500));
    }

    #[test]
    fn test_normalized_round_trip_display() {
        let rect = PixelRect::new(10, 10, 40, 40);
        let norm = NormalizedRect::from_pixels(rect, 800, 533);
        assert_eq!(norm.to_pixels(800, 533), rect);
    }

    #[test]
    fn test_normalized_scales_to_other_surface() {
        let norm = NormalizedRect::from_pixels(PixelRect::new(100, 50, 200, 100), 800, 400);
        assert_eq!(norm.to_pixels(1600, 800), PixelRect::new(200, 100, 400, 200));
    }

    #[test]
    fn test_with_origin_keeps_size() {
        let norm = NormalizedRect::from_pixels(PixelRect::new(0, 0, 33, 17), 777, 333);
        let moved = norm.with_origin(PixelRect::new(101, 57, 33, 17), 777, 333);
        let projected = moved.to_pixels(777, 333);
        assert_eq!(projected, PixelRect::new(101, 57, 33, 17));
    }

    #[test]
    fn test_to_pixels_stays_inside_surface() {
        let norm = NormalizedRect {
            x: 0.95,
            y: 0.95,
            width: 0.2,
            height: 0.2,
        };
        let rect = norm.to_pixels(100, 100);
        assert!(rect.right() <= 100);
        assert!(rect.bottom() <= 100);
        assert_eq!(rect.width, 20);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: drag normalization yields min origin and absolute size.
        #[test]
        fn prop_drag_normalization(
            x1 in 0i32..2000, y1 in 0i32..2000,
            x2 in 0i32..2000, y2 in 0i32..2000,
        ) {
            let rect = PixelRect::from_drag(Point::new(x1, y1), Point::new(x2, y2));
            prop_assert_eq!(rect.x as i32, x1.min(x2));
            prop_assert_eq!(rect.y as i32, y1.min(y2));
            prop_assert_eq!(rect.width as i32, (x2 - x1).abs());
            prop_assert_eq!(rect.height as i32, (y2 - y1).abs());
        }

        /// Property: display rectangles survive the trip through normalized space.
        #[test]
        fn prop_normalized_round_trip(
            (sw, sh) in (1u32..=800, 1u32..=500),
            fx in 0.0f64..1.0, fy in 0.0f64..1.0,
            fw in 0.0f64..1.0, fh in 0.0f64..1.0,
        ) {
            let width = ((fw * f64::from(sw)) as u32).max(1);
            let height = ((fh * f64::from(sh)) as u32).max(1);
            let x = ((fx * f64::from(sw - width)) as u32).min(sw - width);
            let y = ((fy * f64::from(sh - height)) as u32).min(sh - height);
            let rect = PixelRect::new(x, y, width, height);

            let norm = NormalizedRect::from_pixels(rect, sw, sh);
            prop_assert_eq!(norm.to_pixels(sw, sh), rect);
        }
    }
}
