//! Core types for raster loading.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for raster loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// The image decoded to zero pixels.
    #[error("Image has no pixels")]
    EmptyImage,

    /// The viewport leaves no room for an editing surface.
    #[error("Rendering surface unavailable for a {width}x{height} viewport")]
    SurfaceUnavailable { width: u32, height: u32 },
}

/// Size of the host viewport the editing surface must fit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A loaded image ready for editing.
///
/// Holds the full-resolution bitmap and its fit-to-viewport resample.
/// Immutable once loaded; a session never changes its image.
#[derive(Debug, Clone)]
pub struct EditableImage {
    natural: RgbImage,
    display: RgbImage,
    scale: f64,
}

impl EditableImage {
    pub(crate) fn new(natural: RgbImage, display: RgbImage, scale: f64) -> Self {
        Self {
            natural,
            display,
            scale,
        }
    }

    /// Full-resolution source bitmap.
    pub fn natural(&self) -> &RgbImage {
        &self.natural
    }

    /// Bitmap resampled to the display surface.
    pub fn display(&self) -> &RgbImage {
        &self.display
    }

    pub fn natural_width(&self) -> u32 {
        self.natural.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.natural.height()
    }

    pub fn display_width(&self) -> u32 {
        self.display.width()
    }

    pub fn display_height(&self) -> u32 {
        self.display.height()
    }

    /// Display size divided by natural size.
    pub fn scale(&self) -> f64 {
        self.scale
    }
}
