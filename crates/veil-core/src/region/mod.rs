//! Blur regions and the gesture state machine that creates, moves and
//! deletes them.
//!
//! ## Interaction Modes
//!
//! - **Select**: dragging a region moves it; double activation deletes it.
//! - **Draw**: dragging on the surface previews a rectangle and commits it
//!   as a new region on release, if it is large enough.
//!
//! Only one gesture can be in flight. The gesture is a tagged variant, so a
//! move and a draw can never be active at the same time.

mod manager;

pub use manager::{RegionEvent, RegionManager};

use serde::{Deserialize, Serialize};

use crate::geometry::{NormalizedRect, PixelRect, Point};

/// Stable identifier of a region within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u64);

/// Pointer interpretation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    #[default]
    Select,
    Draw,
}

impl InteractionMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            InteractionMode::Select => InteractionMode::Draw,
            InteractionMode::Draw => InteractionMode::Select,
        }
    }
}

/// Gesture currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Draw mode drag; `current` is the live preview corner.
    Drawing { start: Point, current: Point },
    /// Select mode drag of a region.
    Moving {
        id: RegionId,
        /// Pointer position when the drag began
        grab: Point,
        /// Region bounds when the drag began
        origin: NormalizedRect,
    },
}

/// A rectangle that receives its own, stronger blur.
///
/// Geometry is stored normalized to the image so it can be projected onto
/// any surface; width and height never change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlurRegion {
    id: RegionId,
    creation_index: u64,
    bounds: NormalizedRect,
    blur_strength: u32,
}

impl BlurRegion {
    pub(crate) fn new(
        id: RegionId,
        creation_index: u64,
        bounds: NormalizedRect,
        blur_strength: u32,
    ) -> Self {
        Self {
            id,
            creation_index,
            bounds,
            blur_strength,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Z-order: regions with a higher index paint over lower ones.
    pub fn creation_index(&self) -> u64 {
        self.creation_index
    }

    /// Blur radius in display-space pixels.
    pub fn blur_strength(&self) -> u32 {
        self.blur_strength
    }

    pub fn bounds(&self) -> NormalizedRect {
        self.bounds
    }

    /// Bounds projected onto a `width x height` surface.
    pub fn rect_on(&self, width: u32, height: u32) -> PixelRect {
        self.bounds.to_pixels(width, height)
    }

    pub(crate) fn set_bounds(&mut self, bounds: NormalizedRect) {
        self.bounds = bounds;
    }
}

/// Display-space view of a region, for hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub id: u64,
    pub creation_index: u64,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub blur_strength: u32,
}
