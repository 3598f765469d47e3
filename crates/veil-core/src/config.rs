//! Editor configuration.
//!
//! Every field has a default, so hosts only need to supply the values they
//! want to change. The configuration is fixed for the life of a session.

use serde::{Deserialize, Serialize};

use crate::blur::BlurBackend;
use crate::export::{ExportFormat, ExportResolution};

/// Tunables for loading, region drawing, rendering and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Fraction of the viewport the editing surface may occupy (0.0 to 1.0)
    pub viewport_fraction: f64,
    /// Upper bound for the display width in pixels
    pub max_display_width: u32,
    /// Upper bound for the display height in pixels
    pub max_display_height: u32,
    /// Drags must be strictly larger than this on both axes to create a region
    pub min_region_size: u32,
    /// Region blur strength = brush strength * multiplier
    pub strength_multiplier: u32,
    /// Brush strength selected when a session opens
    pub default_brush_strength: u32,
    /// Largest selectable brush strength (the smallest is 1)
    pub max_brush_strength: u32,
    /// Blur primitive used for the base layer and region patches
    pub blur_backend: BlurBackend,
    /// Encoding of the exported raster
    pub export_format: ExportFormat,
    /// Pixel dimensions of the exported raster
    pub export_resolution: ExportResolution,
    /// File name (without extension) handed to the persistence sink
    pub export_file_stem: String,
    /// Maximum number of undo steps kept per session
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            viewport_fraction: 0.6,
            max_display_width: 800,
            max_display_height: 500,
            min_region_size: 5,
            strength_multiplier: 2,
            default_brush_strength: 10,
            max_brush_strength: 20,
            blur_backend: BlurBackend::default(),
            export_format: ExportFormat::default(),
            export_resolution: ExportResolution::default(),
            export_file_stem: "edited-image".to_string(),
            history_limit: 100,
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brush strength clamped to the configured range.
    pub fn clamp_brush_strength(&self, strength: u32) -> u32 {
        strength.clamp(1, self.max_brush_strength.max(1))
    }
}
