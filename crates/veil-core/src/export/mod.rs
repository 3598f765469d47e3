//! Flattened image export.
//!
//! The composed stage is encoded into a single raster file and handed to a
//! caller-supplied [`ImageSink`]. Whether the file replaces an existing
//! slot or is uploaded as a new image depends on the session's
//! [`EditTarget`].

mod encode;
mod sink;

pub use encode::{encode, encode_jpeg, encode_png, EncodeError};
pub use sink::{deliver, EditTarget, ImageSink, PersistError};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Encoding of the exported raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg {
        /// 1-100, clamped when encoding
        quality: u8,
    },
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// Pixel dimensions of the exported raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportResolution {
    /// The stage exactly as displayed.
    #[default]
    Display,
    /// Re-rendered from the full-resolution source.
    Natural,
}

/// An encoded, flattened image ready for persistence.
///
/// Cloning is cheap: the encoded bytes are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub bytes: Arc<[u8]>,
    pub mime: &'static str,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl ExportedFile {
    pub fn new(bytes: Vec<u8>, format: ExportFormat, stem: &str, width: u32, height: u32) -> Self {
        Self {
            bytes: Arc::from(bytes),
            mime: format.mime(),
            file_name: format!("{}.{}", stem, format.extension()),
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::Png.mime(), "image/png");
        assert_eq!(ExportFormat::Jpeg { quality: 90 }.mime(), "image/jpeg");
        assert_eq!(ExportFormat::Jpeg { quality: 90 }.extension(), "jpg");
    }

    #[test]
    fn test_exported_file_name() {
        let file = ExportedFile::new(vec![1, 2, 3], ExportFormat::Png, "edited-image", 4, 2);
        assert_eq!(file.file_name, "edited-image.png");
        assert_eq!(file.mime, "image/png");
        assert_eq!(file.len(), 3);
    }

    #[test]
    fn test_clone_shares_bytes() {
        let file = ExportedFile::new(vec![0; 16], ExportFormat::Png, "a", 1, 1);
        let copy = file.clone();
        assert!(Arc::ptr_eq(&file.bytes, &copy.bytes));
    }
}
