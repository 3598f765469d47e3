//! Image decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader, RgbImage};

use super::fit::fit_to_viewport;
use super::{EditableImage, LoadError, Orientation, Viewport};
use crate::EditorConfig;

/// Decode an image from bytes, applying EXIF orientation correction.
///
/// The format is guessed from the content. Alpha is discarded.
///
/// # Errors
///
/// Returns `LoadError::Decode` if the bytes are not a decodable image and
/// `LoadError::EmptyImage` if it has no pixels.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::Decode("no image data".to_string()));
    }

    let orientation = extract_orientation(bytes);

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    let rgb = apply_orientation(img, orientation).into_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(LoadError::EmptyImage);
    }
    Ok(rgb)
}

/// Decode bytes and prepare them for editing on the given viewport.
pub fn load_image(
    bytes: &[u8],
    viewport: Viewport,
    config: &EditorConfig,
) -> Result<EditableImage, LoadError> {
    let natural = decode_image(bytes)?;
    load_bitmap(natural, viewport, config)
}

/// Prepare an already-decoded bitmap for editing on the given viewport.
///
/// # Errors
///
/// Returns `LoadError::EmptyImage` for a zero-sized bitmap and
/// `LoadError::SurfaceUnavailable` if the viewport cannot host a surface.
pub fn load_bitmap(
    natural: RgbImage,
    viewport: Viewport,
    config: &EditorConfig,
) -> Result<EditableImage, LoadError> {
    let (width, height) = natural.dimensions();
    if width == 0 || height == 0 {
        return Err(LoadError::EmptyImage);
    }

    let Some((display_w, display_h, scale)) = fit_to_viewport(width, height, viewport, config)
    else {
        log::warn!(
            "no editing surface fits a {}x{} viewport",
            viewport.width,
            viewport.height
        );
        return Err(LoadError::SurfaceUnavailable {
            width: viewport.width,
            height: viewport.height,
        });
    };

    // Fast path: if dimensions match, just clone
    let display = if (display_w, display_h) == (width, height) {
        natural.clone()
    } else {
        image::imageops::resize(
            &natural,
            display_w,
            display_h,
            image::imageops::FilterType::Triangle,
        )
    };

    log::debug!(
        "loaded {}x{} image onto a {}x{} surface (scale {:.4})",
        width,
        height,
        display_w,
        display_h,
        scale
    );

    Ok(EditableImage::new(natural, display, scale))
}

/// Extract EXIF orientation from image bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
