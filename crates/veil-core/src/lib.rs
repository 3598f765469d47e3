//! Veil Core - Region blur editing engine
//!
//! This crate provides the image editing engine behind Veil: loading an
//! image onto a fit-to-viewport surface, global brightness/contrast/blur,
//! user-drawn blur regions for redaction, compositing, and flattening the
//! result into a single exported raster.

pub mod adjustments;
pub mod blur;
pub mod compositor;
pub mod config;
pub mod export;
pub mod geometry;
pub mod history;
pub mod load;
pub mod region;
pub mod session;

pub use blur::BlurBackend;
pub use compositor::Compositor;
pub use config::EditorConfig;
pub use export::{EditTarget, ExportedFile, ImageSink, PersistError};
pub use geometry::{NormalizedRect, PixelRect, Point};
pub use load::{EditableImage, LoadError, Viewport};
pub use region::{BlurRegion, InteractionMode, RegionId, RegionSnapshot};
pub use session::{
    Editor, EditorSession, ExportError, ExportPhase, ExportTicket, Redraw, SessionError,
};

use serde::Serialize;

/// Range of the brightness and contrast sliders
pub const TONE_RANGE: (f32, f32) = (-100.0, 100.0);

/// Range of the global blur radius in pixels
pub const GLOBAL_BLUR_RANGE: (f32, f32) = (0.0, 40.0);

/// Global adjustments applied to the whole base layer.
///
/// Values can only be changed through the setters, which clamp to the
/// documented ranges instead of rejecting out-of-range input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GlobalAdjustments {
    /// Brightness (-100 to 100, 0 = unchanged)
    brightness: f32,
    /// Contrast (-100 to 100, 0 = unchanged)
    contrast: f32,
    /// Global blur radius in pixels (0 to 40)
    global_blur_radius: f32,
}

/// One of the three global adjustment values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentField {
    Brightness,
    Contrast,
    GlobalBlur,
}

impl GlobalAdjustments {
    /// Create a new GlobalAdjustments with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if all values are at their defaults
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn global_blur_radius(&self) -> f32 {
        self.global_blur_radius
    }

    /// Set brightness, returning the effective (clamped) value.
    pub fn set_brightness(&mut self, value: f32) -> f32 {
        self.set(AdjustmentField::Brightness, value)
    }

    /// Set contrast, returning the effective (clamped) value.
    pub fn set_contrast(&mut self, value: f32) -> f32 {
        self.set(AdjustmentField::Contrast, value)
    }

    /// Set the global blur radius, returning the effective (clamped) value.
    pub fn set_global_blur(&mut self, value: f32) -> f32 {
        self.set(AdjustmentField::GlobalBlur, value)
    }

    /// Read a value by field.
    pub fn get(&self, field: AdjustmentField) -> f32 {
        match field {
            AdjustmentField::Brightness => self.brightness,
            AdjustmentField::Contrast => self.contrast,
            AdjustmentField::GlobalBlur => self.global_blur_radius,
        }
    }

    /// Write a value by field, clamped to the field's range.
    ///
    /// NaN is treated as the neutral value 0.
    pub fn set(&mut self, field: AdjustmentField, value: f32) -> f32 {
        let (min, max) = field.range();
        let value = if value.is_nan() { 0.0 } else { value.clamp(min, max) };
        match field {
            AdjustmentField::Brightness => self.brightness = value,
            AdjustmentField::Contrast => self.contrast = value,
            AdjustmentField::GlobalBlur => self.global_blur_radius = value,
        }
        value
    }

    /// Copy with the blur radius multiplied by `factor`, for rendering the
    /// same look on a surface of a different size. The result may exceed
    /// the slider range.
    pub(crate) fn with_blur_scaled(&self, factor: f64) -> Self {
        Self {
            global_blur_radius: (f64::from(self.global_blur_radius) * factor) as f32,
            ..*self
        }
    }
}

impl AdjustmentField {
    /// Inclusive range accepted by the field.
    pub fn range(self) -> (f32, f32) {
        match self {
            AdjustmentField::Brightness | AdjustmentField::Contrast => TONE_RANGE,
            AdjustmentField::GlobalBlur => GLOBAL_BLUR_RANGE,
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
