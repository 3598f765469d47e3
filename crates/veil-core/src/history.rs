//! Edit history bookkeeping (undo/redo).
//!
//! Commands carry enough state to be applied in either direction, so undo
//! never has to replay the session from the start.

use crate::geometry::NormalizedRect;
use crate::region::{BlurRegion, RegionId};
use crate::AdjustmentField;

/// A committed, invertible session mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    Adjust {
        field: AdjustmentField,
        before: f32,
        after: f32,
    },
    CreateRegion {
        region: BlurRegion,
        position: usize,
    },
    MoveRegion {
        id: RegionId,
        from: NormalizedRect,
        to: NormalizedRect,
    },
    DeleteRegion {
        region: BlurRegion,
        position: usize,
    },
    ClearRegions {
        regions: Vec<BlurRegion>,
    },
}

/// Linear undo/redo log with a size cap.
#[derive(Debug, Clone)]
pub struct EditHistory {
    commands: Vec<EditCommand>,
    /// Number of commands currently applied
    index: usize,
    limit: usize,
    /// When set, the next adjustment starts a new entry instead of merging
    sealed: bool,
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            limit,
            sealed: true,
        }
    }

    /// Whether an undo operation is currently possible.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a redo operation is currently possible.
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Record a command, discarding anything that could still be redone.
    ///
    /// Consecutive changes of the same adjustment merge into one entry until
    /// [`EditHistory::seal`] is called; a merge that ends where it started
    /// removes the entry.
    pub fn record(&mut self, command: EditCommand) {
        if self.limit == 0 {
            return;
        }
        if let EditCommand::Adjust { before, after, .. } = command {
            if before == after {
                return;
            }
        }
        if self.try_merge(&command) {
            return;
        }

        self.commands.truncate(self.index);
        self.commands.push(command);
        if self.commands.len() > self.limit {
            let excess = self.commands.len() - self.limit;
            self.commands.drain(..excess);
        }
        self.index = self.commands.len();
        self.sealed = false;
    }

    /// Close the current entry so the next adjustment is recorded separately.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Step back, returning the command to revert.
    pub fn undo(&mut self) -> Option<EditCommand> {
        if !self.can_undo() {
            return None;
        }
        self.sealed = true;
        self.index -= 1;
        self.commands.get(self.index).cloned()
    }

    /// Step forward, returning the command to re-apply.
    pub fn redo(&mut self) -> Option<EditCommand> {
        if !self.can_redo() {
            return None;
        }
        self.sealed = true;
        let command = self.commands.get(self.index).cloned();
        self.index += 1;
        command
    }

    fn try_merge(&mut self, command: &EditCommand) -> bool {
        if self.sealed || self.index != self.commands.len() {
            return false;
        }
        let EditCommand::Adjust {
            field, after: next, ..
        } = *command
        else {
            return false;
        };
        let Some(EditCommand::Adjust {
            field: last_field,
            before,
            after,
        }) = self.commands.last_mut()
        else {
            return false;
        };
        if *last_field != field {
            return false;
        }

        *after = next;
        if *before == *after {
            self.commands.pop();
            self.index = self.commands.len();
            self.sealed = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjust(field: AdjustmentField, before: f32, after: f32) -> EditCommand {
        EditCommand::Adjust {
            field,
            before,
            after,
        }
    }

    fn clear() -> EditCommand {
        EditCommand::ClearRegions {
            regions: Vec::new(),
        }
    }

    #[test]
    fn test_undo_redo_walks_the_log() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.seal();
        history.record(adjust(AdjustmentField::Contrast, 0.0, 5.0));

        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(
            history.undo(),
            Some(adjust(AdjustmentField::Contrast, 0.0, 5.0))
        );
        assert_eq!(
            history.undo(),
            Some(adjust(AdjustmentField::Brightness, 0.0, 10.0))
        );
        assert_eq!(history.undo(), None);
        assert_eq!(
            history.redo(),
            Some(adjust(AdjustmentField::Brightness, 0.0, 10.0))
        );
    }

    #[test]
    fn test_recording_after_undo_discards_redo_tail() {
        let mut history = EditHistory::new(10);
        history.record(clear());
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.undo();

        history.record(adjust(AdjustmentField::Contrast, 0.0, 20.0));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_same_field_adjustments_coalesce() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.record(adjust(AdjustmentField::Brightness, 10.0, 25.0));
        history.record(adjust(AdjustmentField::Brightness, 25.0, 40.0));

        assert_eq!(history.len(), 1);
        assert_eq!(
            history.undo(),
            Some(adjust(AdjustmentField::Brightness, 0.0, 40.0))
        );
    }

    #[test]
    fn test_seal_stops_coalescing() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.seal();
        history.record(adjust(AdjustmentField::Brightness, 10.0, 20.0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_different_fields_do_not_coalesce() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.record(adjust(AdjustmentField::Contrast, 0.0, 10.0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_drag_back_to_start_drops_entry() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::GlobalBlur, 0.0, 3.0));
        history.record(adjust(AdjustmentField::GlobalBlur, 3.0, 0.0));
        assert!(history.is_empty());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_noop_adjustment_ignored() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Contrast, 5.0, 5.0));
        assert!(history.is_empty());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = EditHistory::new(3);
        for i in 0..5 {
            history.record(adjust(AdjustmentField::Brightness, i as f32, i as f32 + 1.0));
            history.seal();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.undo(),
            Some(adjust(AdjustmentField::Brightness, 4.0, 5.0))
        );
        history.undo();
        assert_eq!(
            history.undo(),
            Some(adjust(AdjustmentField::Brightness, 2.0, 3.0))
        );
        assert!(!history.can_undo());
    }

    #[test]
    fn test_zero_limit_disables_history() {
        let mut history = EditHistory::new(0);
        history.record(clear());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_seals() {
        let mut history = EditHistory::new(10);
        history.record(adjust(AdjustmentField::Brightness, 0.0, 10.0));
        history.undo();
        history.redo();
        history.record(adjust(AdjustmentField::Brightness, 10.0, 20.0));
        assert_eq!(history.len(), 2);
    }
}
