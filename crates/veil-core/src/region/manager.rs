//! Region collection and pointer gesture handling.

use super::{BlurRegion, Gesture, InteractionMode, RegionId, RegionSnapshot};
use crate::geometry::{NormalizedRect, PixelRect, Point};
use crate::EditorConfig;

/// Upper bound on a region's blur strength, whatever the brush and
/// multiplier settings.
pub const MAX_REGION_STRENGTH: u32 = 200;

/// Outcome of a pointer event or region operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    /// Nothing changed.
    None,
    /// The draw preview rectangle changed; the stage itself did not.
    Preview,
    /// A drag was released but was too small to become a region.
    Discarded,
    /// A new region was appended.
    Created { region: BlurRegion, position: usize },
    /// A region moved mid-drag; `dirty` covers its old and new bounds.
    Moving { id: RegionId, dirty: PixelRect },
    /// A move drag was released at a different position.
    Moved {
        id: RegionId,
        from: NormalizedRect,
        to: NormalizedRect,
    },
    /// A region was removed from `position`.
    Deleted { region: BlurRegion, position: usize },
}

/// Ordered collection of blur regions plus the gesture state machine.
///
/// Regions are kept in creation order, which is also paint order.
#[derive(Debug, Clone)]
pub struct RegionManager {
    surface_width: u32,
    surface_height: u32,
    regions: Vec<BlurRegion>,
    mode: InteractionMode,
    gesture: Gesture,
    brush_strength: u32,
    min_size: u32,
    strength_multiplier: u32,
    max_brush_strength: u32,
    next_id: u64,
    next_creation_index: u64,
}

impl RegionManager {
    /// Create an empty manager for a `width x height` display surface.
    pub fn new(width: u32, height: u32, config: &EditorConfig) -> Self {
        Self {
            surface_width: width,
            surface_height: height,
            regions: Vec::new(),
            mode: InteractionMode::default(),
            gesture: Gesture::Idle,
            brush_strength: config.clamp_brush_strength(config.default_brush_strength),
            min_size: config.min_region_size,
            strength_multiplier: config.strength_multiplier,
            max_brush_strength: config.max_brush_strength.max(1),
            next_id: 1,
            next_creation_index: 0,
        }
    }

    pub fn surface(&self) -> (u32, u32) {
        (self.surface_width, self.surface_height)
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn brush_strength(&self) -> u32 {
        self.brush_strength
    }

    /// Regions in creation (paint) order.
    pub fn regions(&self) -> &[BlurRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, id: RegionId) -> Option<&BlurRegion> {
        self.regions.iter().find(|r| r.id() == id)
    }

    /// Display-space bounds of a region.
    pub fn rect(&self, id: RegionId) -> Option<PixelRect> {
        self.get(id).map(|r| self.project(r))
    }

    /// Display-space view of every region, in paint order.
    pub fn snapshots(&self) -> Vec<RegionSnapshot> {
        self.regions
            .iter()
            .map(|r| {
                let rect = self.project(r);
                RegionSnapshot {
                    id: r.id().0,
                    creation_index: r.creation_index(),
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    blur_strength: r.blur_strength(),
                }
            })
            .collect()
    }

    /// Topmost region under the point, if any.
    pub fn hit_test(&self, point: Point) -> Option<RegionId> {
        self.regions
            .iter()
            .rev()
            .find(|r| self.project(r).contains(point))
            .map(|r| r.id())
    }

    /// Live draw preview, normalized like a committed region would be.
    pub fn preview_rect(&self) -> Option<PixelRect> {
        match self.gesture {
            Gesture::Drawing { start, current } => Some(PixelRect::from_drag(start, current)),
            _ => None,
        }
    }

    /// Set the brush strength used for new regions, returning the clamped value.
    pub fn set_brush_strength(&mut self, strength: u32) -> u32 {
        self.brush_strength = strength.clamp(1, self.max_brush_strength);
        self.brush_strength
    }

    /// Switch interaction mode.
    ///
    /// Any gesture in flight is cancelled; returns the area that needs
    /// repainting if a move had to be reverted.
    pub fn set_mode(&mut self, mode: InteractionMode) -> Option<PixelRect> {
        if mode == self.mode {
            return None;
        }
        let dirty = self.cancel_gesture();
        self.mode = mode;
        log::debug!("interaction mode -> {:?}", mode);
        dirty
    }

    /// Abandon the current gesture.
    ///
    /// A draw preview is dropped; a move is reverted to where it started.
    pub fn cancel_gesture(&mut self) -> Option<PixelRect> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Moving { id, origin, .. } => self.set_bounds(id, origin),
            Gesture::Drawing { .. } | Gesture::Idle => None,
        }
    }

    pub fn pointer_down(&mut self, point: Point) -> RegionEvent {
        if self.gesture != Gesture::Idle {
            return RegionEvent::None;
        }

        match self.mode {
            InteractionMode::Draw => {
                let start = self.clamp_point(point);
                self.gesture = Gesture::Drawing {
                    start,
                    current: start,
                };
                RegionEvent::Preview
            }
            InteractionMode::Select => {
                let Some(id) = self.hit_test(point) else {
                    return RegionEvent::None;
                };
                let Some(origin) = self.get(id).map(|r| r.bounds()) else {
                    return RegionEvent::None;
                };
                self.gesture = Gesture::Moving {
                    id,
                    grab: point,
                    origin,
                };
                RegionEvent::None
            }
        }
    }

    pub fn pointer_move(&mut self, point: Point) -> RegionEvent {
        match self.gesture {
            Gesture::Idle => RegionEvent::None,
            Gesture::Drawing { start, current } => {
                let next = self.clamp_point(point);
                if next == current {
                    return RegionEvent::None;
                }
                self.gesture = Gesture::Drawing {
                    start,
                    current: next,
                };
                RegionEvent::Preview
            }
            Gesture::Moving { id, grab, origin } => self.drag_region(id, grab, origin, point),
        }
    }

    /// Finish the current gesture.
    ///
    /// A draw commits a region when the normalized rectangle is larger than
    /// the minimum size on both axes. A move commits the position reached by
    /// the last `pointer_move`.
    pub fn pointer_up(&mut self, point: Point) -> RegionEvent {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => RegionEvent::None,
            Gesture::Drawing { start, .. } => {
                let end = self.clamp_point(point);
                let rect = PixelRect::from_drag(start, end);
                if rect.width > self.min_size && rect.height > self.min_size {
                    self.create(rect)
                } else {
                    log::debug!(
                        "discarding {}x{} drag below the {}px minimum",
                        rect.width,
                        rect.height,
                        self.min_size
                    );
                    RegionEvent::Discarded
                }
            }
            Gesture::Moving { id, origin, .. } => {
                let Some(region) = self.get(id) else {
                    return RegionEvent::None;
                };
                let to = region.bounds();
                let (w, h) = self.surface();
                if to.to_pixels(w, h) == origin.to_pixels(w, h) {
                    self.set_bounds(id, origin);
                    return RegionEvent::None;
                }
                RegionEvent::Moved {
                    id,
                    from: origin,
                    to,
                }
            }
        }
    }

    /// Delete the topmost region under the point (select mode only).
    pub fn double_activate(&mut self, point: Point) -> RegionEvent {
        if self.mode != InteractionMode::Select || self.gesture != Gesture::Idle {
            return RegionEvent::None;
        }
        let Some(id) = self.hit_test(point) else {
            return RegionEvent::None;
        };
        match self.remove(id) {
            Some((region, position)) => RegionEvent::Deleted { region, position },
            None => RegionEvent::None,
        }
    }

    /// Remove every region, returning them in paint order.
    pub fn clear(&mut self) -> Vec<BlurRegion> {
        self.gesture = Gesture::Idle;
        std::mem::take(&mut self.regions)
    }

    /// Insert a region at a position in the paint order.
    pub(crate) fn insert(&mut self, region: BlurRegion, position: usize) {
        let position = position.min(self.regions.len());
        self.regions.insert(position, region);
    }

    /// Remove a region, returning it with its former position.
    pub(crate) fn remove(&mut self, id: RegionId) -> Option<(BlurRegion, usize)> {
        let position = self.regions.iter().position(|r| r.id() == id)?;
        if matches!(self.gesture, Gesture::Moving { id: moving, .. } if moving == id) {
            self.gesture = Gesture::Idle;
        }
        Some((self.regions.remove(position), position))
    }

    /// Replace every region (used to undo a clear).
    pub(crate) fn restore(&mut self, regions: Vec<BlurRegion>) {
        self.gesture = Gesture::Idle;
        self.regions = regions;
    }

    /// Move a region to new bounds, returning the repaint area if it changed.
    pub(crate) fn set_bounds(&mut self, id: RegionId, bounds: NormalizedRect) -> Option<PixelRect> {
        let (w, h) = self.surface();
        let region = self.regions.iter_mut().find(|r| r.id() == id)?;
        let before = region.rect_on(w, h);
        region.set_bounds(bounds);
        let after = region.rect_on(w, h);
        (before != after).then(|| before.union(&after))
    }

    fn create(&mut self, rect: PixelRect) -> RegionEvent {
        let (w, h) = self.surface();
        let region = BlurRegion::new(
            RegionId(self.next_id),
            self.next_creation_index,
            NormalizedRect::from_pixels(rect, w, h),
            self.brush_strength
                .saturating_mul(self.strength_multiplier)
                .min(MAX_REGION_STRENGTH),
        );
        self.next_id += 1;
        self.next_creation_index += 1;

        let position = self.regions.len();
        self.regions.push(region);
        log::debug!(
            "created region {:?} at {:?} with strength {}",
            region.id(),
            rect,
            region.blur_strength()
        );
        RegionEvent::Created { region, position }
    }

    fn drag_region(
        &mut self,
        id: RegionId,
        grab: Point,
        origin: NormalizedRect,
        point: Point,
    ) -> RegionEvent {
        let (w, h) = self.surface();
        let start = origin.to_pixels(w, h);

        let dx = i64::from(point.x) - i64::from(grab.x);
        let dy = i64::from(point.y) - i64::from(grab.y);
        let max_x = i64::from(w.saturating_sub(start.width));
        let max_y = i64::from(h.saturating_sub(start.height));
        let target = PixelRect::new(
            (i64::from(start.x) + dx).clamp(0, max_x) as u32,
            (i64::from(start.y) + dy).clamp(0, max_y) as u32,
            start.width,
            start.height,
        );

        match self.set_bounds(id, origin.with_origin(target, w, h)) {
            Some(dirty) => RegionEvent::Moving { id, dirty },
            None => RegionEvent::None,
        }
    }

    fn project(&self, region: &BlurRegion) -> PixelRect {
        region.rect_on(self.surface_width, self.surface_height)
    }

    fn clamp_point(&self, point: Point) -> Point {
        point.clamp_to(self.surface_width, self.surface_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RegionManager {
        RegionManager::new(800, 533, &EditorConfig::default())
    }

    /// Draw a region in draw mode and return the event from pointer-up.
    fn draw(m: &mut RegionManager, from: (i32, i32), to: (i32, i32)) -> RegionEvent {
        m.set_mode(InteractionMode::Draw);
        m.pointer_down(Point::new(from.0, from.1));
        m.pointer_move(Point::new(to.0, to.1));
        m.pointer_up(Point::new(to.0, to.1))
    }

    fn created_id(event: RegionEvent) -> RegionId {
        match event {
            RegionEvent::Created { region, .. } => region.id(),
            other => panic!("Expected Created, got {:?}", other),
        }
    }

    #[test]
    fn test_draw_up_left_normalizes() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (50, 50), (10, 10)));
        assert_eq!(m.rect(id), Some(PixelRect::new(10, 10, 40, 40)));
    }

    #[test]
    fn test_draw_small_is_discarded() {
        let mut m = manager();
        assert_eq!(draw(&mut m, (10, 10), (13, 13)), RegionEvent::Discarded);
        assert!(m.is_empty());
    }

    #[test]
    fn test_draw_threshold_is_strict() {
        let mut m = manager();
        assert_eq!(draw(&mut m, (0, 0), (5, 40)), RegionEvent::Discarded);
        assert_eq!(draw(&mut m, (0, 0), (40, 5)), RegionEvent::Discarded);
        created_id(draw(&mut m, (0, 0), (6, 6)));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_strength_is_brush_times_multiplier() {
        let mut m = manager();
        m.set_brush_strength(7);
        let id = created_id(draw(&mut m, (0, 0), (30, 30)));
        assert_eq!(m.get(id).unwrap().blur_strength(), 14);
    }

    #[test]
    fn test_huge_multiplier_is_capped() {
        let config = EditorConfig {
            strength_multiplier: u32::MAX,
            ..EditorConfig::default()
        };
        let mut m = RegionManager::new(800, 533, &config);
        let id = created_id(draw(&mut m, (0, 0), (30, 30)));
        assert_eq!(m.get(id).unwrap().blur_strength(), MAX_REGION_STRENGTH);
    }

    #[test]
    fn test_brush_strength_clamped() {
        let mut m = manager();
        assert_eq!(m.set_brush_strength(0), 1);
        assert_eq!(m.set_brush_strength(99), 20);
    }

    #[test]
    fn test_creation_index_increases() {
        let mut m = manager();
        let a = created_id(draw(&mut m, (0, 0), (30, 30)));
        let b = created_id(draw(&mut m, (10, 10), (50, 50)));
        let a_index = m.get(a).unwrap().creation_index();
        let b_index = m.get(b).unwrap().creation_index();
        assert!(b_index > a_index);
    }

    #[test]
    fn test_creation_index_monotonic_after_delete() {
        let mut m = manager();
        let a = created_id(draw(&mut m, (0, 0), (30, 30)));
        let b = created_id(draw(&mut m, (100, 100), (150, 150)));
        m.remove(a);
        let c = created_id(draw(&mut m, (200, 200), (250, 250)));
        assert!(m.get(c).unwrap().creation_index() > m.get(b).unwrap().creation_index());
    }

    #[test]
    fn test_preview_tracks_pointer() {
        let mut m = manager();
        m.set_mode(InteractionMode::Draw);
        assert_eq!(m.pointer_down(Point::new(100, 100)), RegionEvent::Preview);
        assert_eq!(m.pointer_move(Point::new(60, 140)), RegionEvent::Preview);
        assert_eq!(m.preview_rect(), Some(PixelRect::new(60, 100, 40, 40)));
        m.pointer_up(Point::new(60, 140));
        assert_eq!(m.preview_rect(), None);
    }

    #[test]
    fn test_draw_clamps_to_surface() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (780, 500), (900, 700)));
        assert_eq!(m.rect(id), Some(PixelRect::new(780, 500, 20, 33)));
    }

    #[test]
    fn test_select_mode_does_not_draw() {
        let mut m = manager();
        assert_eq!(m.pointer_down(Point::new(10, 10)), RegionEvent::None);
        assert_eq!(m.pointer_move(Point::new(60, 60)), RegionEvent::None);
        assert_eq!(m.pointer_up(Point::new(60, 60)), RegionEvent::None);
        assert!(m.is_empty());
    }

    #[test]
    fn test_move_region() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (10, 10), (50, 50)));
        m.set_mode(InteractionMode::Select);

        m.pointer_down(Point::new(20, 20));
        match m.pointer_move(Point::new(120, 70)) {
            RegionEvent::Moving { id: moved, dirty } => {
                assert_eq!(moved, id);
                assert_eq!(dirty, PixelRect::new(10, 10, 140, 90));
            }
            other => panic!("Expected Moving, got {:?}", other),
        }
        assert!(matches!(m.pointer_up(Point::new(120, 70)), RegionEvent::Moved { .. }));
        assert_eq!(m.rect(id), Some(PixelRect::new(110, 60, 40, 40)));
    }

    #[test]
    fn test_move_keeps_size_and_stays_on_surface() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (10, 10), (50, 30)));
        m.set_mode(InteractionMode::Select);

        m.pointer_down(Point::new(15, 15));
        m.pointer_move(Point::new(5000, -5000));
        m.pointer_up(Point::new(5000, -5000));
        assert_eq!(m.rect(id), Some(PixelRect::new(760, 0, 40, 20)));
    }

    #[test]
    fn test_move_back_to_start_is_not_a_move() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (10, 10), (50, 50)));
        m.set_mode(InteractionMode::Select);

        m.pointer_down(Point::new(20, 20));
        m.pointer_move(Point::new(40, 40));
        m.pointer_move(Point::new(20, 20));
        assert_eq!(m.pointer_up(Point::new(20, 20)), RegionEvent::None);
        assert_eq!(m.rect(id), Some(PixelRect::new(10, 10, 40, 40)));
    }

    #[test]
    fn test_move_picks_topmost() {
        let mut m = manager();
        let _under = created_id(draw(&mut m, (0, 0), (100, 100)));
        let over = created_id(draw(&mut m, (50, 50), (150, 150)));
        m.set_mode(InteractionMode::Select);

        assert_eq!(m.hit_test(Point::new(75, 75)), Some(over));
        m.pointer_down(Point::new(75, 75));
        assert!(matches!(m.gesture(), Gesture::Moving { id, .. } if id == over));
    }

    #[test]
    fn test_draw_mode_never_moves() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (10, 10), (50, 50)));
        // Still in draw mode: dragging over the region draws instead.
        m.pointer_down(Point::new(20, 20));
        assert!(matches!(m.gesture(), Gesture::Drawing { .. }));
        m.pointer_move(Point::new(22, 22));
        m.pointer_up(Point::new(22, 22));
        assert_eq!(m.rect(id), Some(PixelRect::new(10, 10, 40, 40)));
    }

    #[test]
    fn test_mode_switch_reverts_move() {
        let mut m = manager();
        let id = created_id(draw(&mut m, (10, 10), (50, 50)));
        m.set_mode(InteractionMode::Select);

        m.pointer_down(Point::new(20, 20));
        m.pointer_move(Point::new(220, 20));
        let dirty = m.set_mode(InteractionMode::Draw);
        assert_eq!(dirty, Some(PixelRect::new(10, 10, 240, 40)));
        assert_eq!(m.rect(id), Some(PixelRect::new(10, 10, 40, 40)));
        assert_eq!(m.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_double_activate_deletes_topmost() {
        let mut m = manager();
        let under = created_id(draw(&mut m, (0, 0), (100, 100)));
        let over = created_id(draw(&mut m, (50, 50), (150, 150)));
        m.set_mode(InteractionMode::Select);

        match m.double_activate(Point::new(75, 75)) {
            RegionEvent::Deleted { region, position } => {
                assert_eq!(region.id(), over);
                assert_eq!(position, 1);
            }
            other => panic!("Expected Deleted, got {:?}", other),
        }
        assert_eq!(m.len(), 1);
        assert!(m.get(under).is_some());
    }

    #[test]
    fn test_double_activate_ignored_in_draw_mode() {
        let mut m = manager();
        created_id(draw(&mut m, (0, 0), (100, 100)));
        assert_eq!(m.double_activate(Point::new(50, 50)), RegionEvent::None);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_double_activate_on_empty_space() {
        let mut m = manager();
        created_id(draw(&mut m, (0, 0), (100, 100)));
        m.set_mode(InteractionMode::Select);
        assert_eq!(m.double_activate(Point::new(300, 300)), RegionEvent::None);
    }

    #[test]
    fn test_clear_and_restore() {
        let mut m = manager();
        created_id(draw(&mut m, (0, 0), (100, 100)));
        created_id(draw(&mut m, (200, 200), (300, 300)));

        let removed = m.clear();
        assert_eq!(removed.len(), 2);
        assert!(m.is_empty());

        m.restore(removed);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_insert_at_position() {
        let mut m = manager();
        let a = created_id(draw(&mut m, (0, 0), (100, 100)));
        let b = created_id(draw(&mut m, (200, 200), (300, 300)));
        let (region, position) = m.remove(a).unwrap();
        assert_eq!(position, 0);
        m.insert(region, position);
        let ids: Vec<_> = m.regions().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_snapshots_are_display_space() {
        let mut m = manager();
        created_id(draw(&mut m, (50, 50), (10, 10)));
        let snapshots = m.snapshots();
        assert_eq!(snapshots.len(), 1);
        let s = snapshots[0];
        assert_eq!((s.x, s.y, s.width, s.height), (10, 10, 40, 40));
        assert_eq!(s.blur_strength, 20);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
