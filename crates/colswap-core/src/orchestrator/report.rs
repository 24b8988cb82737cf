//! What a migration run did.

use super::{MigrationPhase, Step};
use crate::copier::CopyResult;
use crate::descriptor::CollectionDescriptor;

/// What became of the temp collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TempDisposition {
    /// The run stopped before the temp collection was created.
    NeverCreated,
    /// Created and not yet cleaned up.
    Present,
    /// Deleted at the end of the run.
    Deleted,
    /// Kept for manual recovery after the original was deleted.
    Retained,
    /// Deletion was attempted and failed; the collection may still exist.
    CleanupFailed(String),
}

/// Progress record of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// Collection being migrated.
    pub source: CollectionDescriptor,
    /// Temp collection, once derived.
    pub temp: Option<CollectionDescriptor>,
    /// Current phase.
    pub phase: MigrationPhase,
    /// Every phase entered, in order, starting with `Idle`.
    pub history: Vec<MigrationPhase>,
    /// Steps that succeeded.
    pub completed_steps: Vec<Step>,
    /// Step that failed, if any.
    pub failed_step: Option<Step>,
    /// Source to temp copy.
    pub staging: Option<CopyResult>,
    /// Temp to source copy.
    pub restore: Option<CopyResult>,
    /// Temp collection outcome.
    pub temp_disposition: TempDisposition,
}

impl MigrationReport {
    pub(crate) fn new(source: CollectionDescriptor) -> Self {
        Self {
            source,
            temp: None,
            phase: MigrationPhase::Idle,
            history: vec![MigrationPhase::Idle],
            completed_steps: Vec::new(),
            failed_step: None,
            staging: None,
            restore: None,
            temp_disposition: TempDisposition::NeverCreated,
        }
    }

    pub(crate) fn advance(&mut self, next: MigrationPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
        self.history.push(next);
    }

    pub(crate) fn complete(&mut self, step: Step) {
        self.completed_steps.push(step);
        self.advance(step.completes());
    }

    pub(crate) fn fail(&mut self, step: Step) {
        self.failed_step = Some(step);
        self.advance(MigrationPhase::Failed);
    }

    /// Check if the run completed.
    pub fn is_success(&self) -> bool {
        self.phase == MigrationPhase::Done
    }

    /// Whether the original collection was deleted during the run.
    pub fn original_deleted(&self) -> bool {
        self.history.contains(&MigrationPhase::OriginalDeleted)
    }
}
