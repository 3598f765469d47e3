//! Raster loading for the editor.
//!
//! This module provides functionality for:
//! - Decoding an image from bytes (JPEG, PNG, WebP, BMP, GIF)
//! - Applying EXIF orientation so the surface shows the photo upright
//! - Computing the fit-to-viewport display size and resampling to it
//!
//! # Examples
//!
//! ```ignore
//! use veil_core::load::{load_image, Viewport};
//! use veil_core::EditorConfig;
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let image = load_image(&bytes, Viewport::new(1920, 1080), &EditorConfig::default()).unwrap();
//! println!("Display {}x{}", image.display_width(), image.display_height());
//! ```

mod decode;
mod fit;
mod types;

pub use decode::{decode_image, load_bitmap, load_image};
pub use fit::{display_bounds, fit_to_viewport};
pub use types::{EditableImage, LoadError, Orientation, Viewport};
