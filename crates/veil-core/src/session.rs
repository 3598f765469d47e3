//! Editing sessions.
//!
//! An [`EditorSession`] owns everything needed to edit one image: the loaded
//! bitmap, the global adjustments, the regions, the compositor caches and
//! the undo log. Every mutating call renders synchronously before it
//! returns, so the stage always reflects the latest mutation.
//!
//! [`Editor`] is the host: it keeps at most one session alive and drives
//! the export handshake with an [`ImageSink`].

use image::RgbImage;
use thiserror::Error;

use crate::compositor::{compose, RegionLayer};
use crate::export::{deliver, encode, EncodeError, ExportResolution, PersistError};
use crate::geometry::{PixelRect, Point};
use crate::history::{EditCommand, EditHistory};
use crate::load::{load_bitmap, load_image};
use crate::region::{RegionEvent, RegionManager, RegionSnapshot};
use crate::{
    AdjustmentField, Compositor, EditTarget, EditableImage, EditorConfig, ExportedFile,
    GlobalAdjustments, ImageSink, InteractionMode, LoadError, Viewport,
};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A save is in flight; the session is frozen until it settles
    #[error("A save is in progress; edits are disabled until it completes")]
    SavePending,

    /// No session is open
    #[error("The editing session is closed")]
    Closed,

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors from [`Editor::export`].
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The sink failed; the session is kept so the export can be retried
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Identifies the session an export was started on.
///
/// Returned by [`Editor::begin_export`] and handed back to
/// [`Editor::finish_export`], so a save that settles after its session was
/// replaced cannot touch the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTicket(u64);

/// Whether the session is accepting edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Editing,
    Saving,
}

/// What the host has to repaint after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// Nothing visible changed.
    None,
    /// Only the draw preview outline changed.
    Preview,
    /// The stage pixels changed.
    Stage,
}

/// State of one edit invocation.
#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    image: EditableImage,
    adjustments: GlobalAdjustments,
    regions: RegionManager,
    compositor: Compositor,
    history: EditHistory,
    target: EditTarget,
    phase: ExportPhase,
    /// Bumped whenever the stage pixels change
    revision: u64,
    /// Last flattened export, keyed by the revision it was made from
    flattened: Option<(u64, ExportedFile)>,
}

impl EditorSession {
    /// Start a session on an already-loaded image.
    pub fn new(image: EditableImage, target: EditTarget, config: EditorConfig) -> Self {
        let adjustments = GlobalAdjustments::default();
        let compositor = Compositor::new(image.display(), &adjustments, config.blur_backend);
        let regions = RegionManager::new(image.display_width(), image.display_height(), &config);
        let history = EditHistory::new(config.history_limit);

        log::info!(
            "editing {}x{} image at {}x{} (scale {:.3})",
            image.natural_width(),
            image.natural_height(),
            image.display_width(),
            image.display_height(),
            image.scale()
        );

        Self {
            config,
            image,
            adjustments,
            regions,
            compositor,
            history,
            target,
            phase: ExportPhase::Editing,
            revision: 0,
            flattened: None,
        }
    }

    /// Decode `bytes` and start a session on them.
    pub fn open(
        bytes: &[u8],
        viewport: Viewport,
        target: EditTarget,
        config: EditorConfig,
    ) -> Result<Self, LoadError> {
        let image = load_image(bytes, viewport, &config)?;
        Ok(Self::new(image, target, config))
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn image(&self) -> &EditableImage {
        &self.image
    }

    pub fn adjustments(&self) -> &GlobalAdjustments {
        &self.adjustments
    }

    pub fn regions(&self) -> &RegionManager {
        &self.regions
    }

    /// Display-space view of every region, in paint order.
    pub fn region_snapshots(&self) -> Vec<RegionSnapshot> {
        self.regions.snapshots()
    }

    /// Live draw preview, for the host to outline.
    pub fn preview_rect(&self) -> Option<PixelRect> {
        self.regions.preview_rect()
    }

    pub fn mode(&self) -> InteractionMode {
        self.regions.mode()
    }

    pub fn brush_strength(&self) -> u32 {
        self.regions.brush_strength()
    }

    pub fn target(&self) -> EditTarget {
        self.target
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn is_saving(&self) -> bool {
        self.phase == ExportPhase::Saving
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The composed stage at display size.
    pub fn stage(&self) -> &RgbImage {
        self.compositor.stage()
    }

    /// Recompose the whole stage. Idempotent without intervening edits.
    pub fn render(&mut self) -> &RgbImage {
        let layers = self.layers();
        self.compositor.render(&layers)
    }

    // ------------------------------------------------------------------
    // Global adjustments
    // ------------------------------------------------------------------

    /// Set brightness, returning the effective (clamped) value.
    pub fn set_brightness(&mut self, value: f32) -> Result<f32, SessionError> {
        self.set_adjustment(AdjustmentField::Brightness, value)
    }

    /// Set contrast, returning the effective (clamped) value.
    pub fn set_contrast(&mut self, value: f32) -> Result<f32, SessionError> {
        self.set_adjustment(AdjustmentField::Contrast, value)
    }

    /// Set the global blur radius, returning the effective (clamped) value.
    pub fn set_global_blur(&mut self, value: f32) -> Result<f32, SessionError> {
        self.set_adjustment(AdjustmentField::GlobalBlur, value)
    }

    /// Set any adjustment. Re-renders the base layer unless the clamped
    /// value equals the current one.
    pub fn set_adjustment(&mut self, field: AdjustmentField, value: f32) -> Result<f32, SessionError> {
        self.ensure_editing()?;

        let before = self.adjustments.get(field);
        let after = self.adjustments.set(field, value);
        if after == before {
            return Ok(after);
        }

        self.history.record(EditCommand::Adjust {
            field,
            before,
            after,
        });
        self.rebuild();
        Ok(after)
    }

    /// Mark the end of a slider drag; the next change starts a new undo step.
    pub fn finish_adjustment(&mut self) {
        self.history.seal();
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    pub fn set_mode(&mut self, mode: InteractionMode) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        let had_preview = self.regions.preview_rect().is_some();
        match self.regions.set_mode(mode) {
            Some(dirty) => Ok(self.redraw_area(dirty)),
            None if had_preview => Ok(Redraw::Preview),
            None => Ok(Redraw::None),
        }
    }

    pub fn toggle_mode(&mut self) -> Result<Redraw, SessionError> {
        self.set_mode(self.regions.mode().toggled())
    }

    /// Set the brush strength for new regions, returning the clamped value.
    pub fn set_brush_strength(&mut self, strength: u32) -> Result<u32, SessionError> {
        self.ensure_editing()?;
        Ok(self.regions.set_brush_strength(strength))
    }

    pub fn pointer_down(&mut self, point: Point) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        let event = self.regions.pointer_down(point);
        Ok(self.apply_event(event))
    }

    pub fn pointer_move(&mut self, point: Point) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        let event = self.regions.pointer_move(point);
        Ok(self.apply_event(event))
    }

    pub fn pointer_up(&mut self, point: Point) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        let event = self.regions.pointer_up(point);
        Ok(self.apply_event(event))
    }

    /// Double click / double tap: deletes the topmost region under the
    /// point in select mode.
    pub fn double_activate(&mut self, point: Point) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        let event = self.regions.double_activate(point);
        Ok(self.apply_event(event))
    }

    /// Remove every region. Global adjustments are kept.
    pub fn clear_regions(&mut self) -> Result<Redraw, SessionError> {
        self.ensure_editing()?;
        if self.regions.is_empty() {
            return Ok(Redraw::None);
        }

        let regions = self.regions.clear();
        log::debug!("cleared {} regions", regions.len());
        self.history.record(EditCommand::ClearRegions { regions });
        self.history.seal();
        Ok(self.redraw_all())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Revert the last committed edit. Returns `false` if there was none.
    ///
    /// A gesture in flight is cancelled either way, so the stage may have
    /// changed even when this returns `false`.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        self.interrupt_gesture();
        let Some(command) = self.history.undo() else {
            return Ok(false);
        };

        match command {
            EditCommand::Adjust { field, before, .. } => {
                self.adjustments.set(field, before);
                self.rebuild();
                return Ok(true);
            }
            EditCommand::CreateRegion { region, .. } => {
                self.regions.remove(region.id());
            }
            EditCommand::MoveRegion { id, from, .. } => {
                self.regions.set_bounds(id, from);
            }
            EditCommand::DeleteRegion { region, position } => {
                self.regions.insert(region, position);
            }
            EditCommand::ClearRegions { regions } => {
                self.regions.restore(regions);
            }
        }
        self.redraw_all();
        Ok(true)
    }

    /// Re-apply the last undone edit. Returns `false` if there was none.
    ///
    /// Like [`EditorSession::undo`], this cancels any gesture in flight.
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        self.interrupt_gesture();
        let Some(command) = self.history.redo() else {
            return Ok(false);
        };

        match command {
            EditCommand::Adjust { field, after, .. } => {
                self.adjustments.set(field, after);
                self.rebuild();
                return Ok(true);
            }
            EditCommand::CreateRegion { region, position } => {
                self.regions.insert(region, position);
            }
            EditCommand::MoveRegion { id, to, .. } => {
                self.regions.set_bounds(id, to);
            }
            EditCommand::DeleteRegion { region, .. } => {
                self.regions.remove(region.id());
            }
            EditCommand::ClearRegions { .. } => {
                self.regions.clear();
            }
        }
        self.redraw_all();
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Encode the composed stage.
    ///
    /// The result is cached until the next edit, so repeated calls return
    /// the same shared bytes.
    pub fn flatten(&mut self) -> Result<ExportedFile, SessionError> {
        if let Some((revision, file)) = &self.flattened {
            if *revision == self.revision {
                return Ok(file.clone());
            }
        }

        let file = match self.config.export_resolution {
            ExportResolution::Display => self.encode_stage(self.compositor.stage())?,
            ExportResolution::Natural => {
                let stage = self.natural_stage();
                self.encode_stage(&stage)?
            }
        };
        log::debug!(
            "flattened revision {} to {} bytes of {}",
            self.revision,
            file.len(),
            file.mime
        );
        self.flattened = Some((self.revision, file.clone()));
        Ok(file)
    }

    /// Freeze the session and produce the file to persist.
    ///
    /// Any gesture in flight is cancelled first. Until
    /// [`EditorSession::abort_export`] is called (or the session is
    /// dropped) every mutation fails with [`SessionError::SavePending`].
    pub fn begin_export(&mut self) -> Result<(EditTarget, ExportedFile), SessionError> {
        self.ensure_editing()?;
        self.interrupt_gesture();
        let file = self.flatten()?;
        self.phase = ExportPhase::Saving;
        Ok((self.target, file))
    }

    /// Unfreeze after a failed save. Nothing else changes.
    pub fn abort_export(&mut self) {
        self.phase = ExportPhase::Editing;
    }

    /// Cancel any gesture in flight, repainting a reverted move.
    fn interrupt_gesture(&mut self) {
        if let Some(dirty) = self.regions.cancel_gesture() {
            self.redraw_area(dirty);
        }
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        match self.phase {
            ExportPhase::Editing => Ok(()),
            ExportPhase::Saving => Err(SessionError::SavePending),
        }
    }

    fn apply_event(&mut self, event: RegionEvent) -> Redraw {
        match event {
            RegionEvent::None => Redraw::None,
            RegionEvent::Preview | RegionEvent::Discarded => Redraw::Preview,
            RegionEvent::Created { region, position } => {
                let (w, h) = self.regions.surface();
                self.history
                    .record(EditCommand::CreateRegion { region, position });
                self.history.seal();
                self.redraw_area(region.rect_on(w, h))
            }
            RegionEvent::Moving { dirty, .. } => self.redraw_area(dirty),
            RegionEvent::Moved { id, from, to } => {
                self.history.record(EditCommand::MoveRegion { id, from, to });
                self.history.seal();
                Redraw::None
            }
            RegionEvent::Deleted { region, position } => {
                self.history
                    .record(EditCommand::DeleteRegion { region, position });
                self.history.seal();
                self.redraw_all()
            }
        }
    }

    /// Rebuild the base layer and recompose everything.
    fn rebuild(&mut self) {
        self.compositor
            .rebuild_base(self.image.display(), &self.adjustments);
        self.redraw_all();
    }

    fn redraw_all(&mut self) -> Redraw {
        let layers = self.layers();
        self.compositor.render(&layers);
        self.revision += 1;
        Redraw::Stage
    }

    fn redraw_area(&mut self, dirty: PixelRect) -> Redraw {
        let layers = self.layers();
        self.compositor.render_dirty(&layers, dirty);
        self.revision += 1;
        Redraw::Stage
    }

    fn layers(&self) -> Vec<RegionLayer> {
        let (w, h) = self.regions.surface();
        self.regions
            .regions()
            .iter()
            .map(|region| RegionLayer {
                id: region.id(),
                rect: region.rect_on(w, h),
                strength: region.blur_strength(),
            })
            .collect()
    }

    /// The stage rendered again from the full-resolution source, with every
    /// radius scaled to match.
    fn natural_stage(&self) -> RgbImage {
        let natural = self.image.natural();
        let (w, h) = natural.dimensions();
        let factor = 1.0 / self.image.scale();

        let layers: Vec<RegionLayer> = self
            .regions
            .regions()
            .iter()
            .map(|region| RegionLayer {
                id: region.id(),
                rect: region.rect_on(w, h),
                strength: (f64::from(region.blur_strength()) * factor).round() as u32,
            })
            .collect();

        compose(
            natural,
            &self.adjustments.with_blur_scaled(factor),
            &layers,
            self.config.blur_backend,
        )
    }

    fn encode_stage(&self, stage: &RgbImage) -> Result<ExportedFile, SessionError> {
        let format = self.config.export_format;
        let bytes = encode(stage, format)?;
        Ok(ExportedFile::new(
            bytes,
            format,
            &self.config.export_file_stem,
            stage.width(),
            stage.height(),
        ))
    }
}

/// Host that keeps at most one session alive.
#[derive(Debug, Default)]
pub struct Editor {
    config: EditorConfig,
    session: Option<EditorSession>,
    /// Bumped every time a session is installed
    generation: u64,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            session: None,
            generation: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Open an encoded image for editing.
    ///
    /// Any previous session is discarded first, even if loading fails.
    pub fn open(
        &mut self,
        bytes: &[u8],
        viewport: Viewport,
        target: EditTarget,
    ) -> Result<&mut EditorSession, LoadError> {
        self.close();
        let image = load_image(bytes, viewport, &self.config).inspect_err(|e| {
            log::warn!("failed to open image: {}", e);
        })?;
        Ok(self.install(image, target))
    }

    /// Open an already-decoded bitmap for editing.
    pub fn open_bitmap(
        &mut self,
        natural: RgbImage,
        viewport: Viewport,
        target: EditTarget,
    ) -> Result<&mut EditorSession, LoadError> {
        self.close();
        let image = load_bitmap(natural, viewport, &self.config)?;
        Ok(self.install(image, target))
    }

    /// Discard the session without persisting anything.
    ///
    /// Returns whether a session was open.
    pub fn close(&mut self) -> bool {
        let closed = self.session.take().is_some();
        if closed {
            log::info!("editing session discarded");
        }
        closed
    }

    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        self.session.as_mut()
    }

    /// The open session, or [`SessionError::Closed`].
    pub fn active(&mut self) -> Result<&mut EditorSession, SessionError> {
        self.session.as_mut().ok_or(SessionError::Closed)
    }

    /// Flatten the session and hand it to `sink`.
    ///
    /// On success the session is discarded. On failure it is kept as it
    /// was, so the export can be retried with the same flattened file.
    pub async fn export<S: ImageSink>(&mut self, sink: &mut S) -> Result<(), ExportError> {
        let (ticket, target, file) = self.begin_export()?;
        let outcome = deliver(sink, target, file).await;
        self.finish_export(ticket, outcome)
    }

    /// First half of [`Editor::export`], for hosts that cannot keep the
    /// editor borrowed while the sink runs: freeze the session and return
    /// the file with its destination.
    pub fn begin_export(
        &mut self,
    ) -> Result<(ExportTicket, EditTarget, ExportedFile), SessionError> {
        let ticket = ExportTicket(self.generation);
        let (target, file) = self.active()?.begin_export()?;
        Ok((ticket, target, file))
    }

    /// Second half of [`Editor::export`]: settle the session with the
    /// sink's outcome.
    ///
    /// If the session the ticket was issued for has since been closed or
    /// replaced, the outcome is only reported back and the current session
    /// is left alone.
    pub fn finish_export(
        &mut self,
        ticket: ExportTicket,
        outcome: Result<(), PersistError>,
    ) -> Result<(), ExportError> {
        let current = ticket.0 == self.generation && self.session.is_some();
        if !current {
            log::warn!("export settled after its session was closed");
            return outcome.map_err(ExportError::Persist);
        }

        match outcome {
            Ok(()) => {
                if let Some(session) = self.session.take() {
                    log::info!(
                        "exported revision {} to {:?}",
                        session.revision(),
                        session.target()
                    );
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("export failed, keeping session: {}", e);
                if let Some(session) = self.session.as_mut() {
                    session.abort_export();
                }
                Err(ExportError::Persist(e))
            }
        }
    }

    fn install(&mut self, image: EditableImage, target: EditTarget) -> &mut EditorSession {
        self.generation += 1;
        self.session
            .insert(EditorSession::new(image, target, self.config.clone()))
    }
}
