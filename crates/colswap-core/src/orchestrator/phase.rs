//! Phases and steps of the swap protocol.

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationPhase {
    /// Nothing created yet.
    Idle,
    /// Temp collection exists and is empty.
    TempCreated,
    /// Source documents staged in the temp collection.
    Staged,
    /// Original collection deleted. Past this point the temp collection
    /// holds the only copy of the documents.
    OriginalDeleted,
    /// Original collection recreated with the new schema.
    OriginalRecreated,
    /// Documents copied back into the recreated original.
    Restored,
    /// Removing the temp collection.
    TempCleanup,
    /// Run completed.
    Done,
    /// Run stopped on an error.
    Failed,
}

impl MigrationPhase {
    /// Check if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrationPhase::Done | MigrationPhase::Failed)
    }

    /// Whether the protocol allows moving from `self` to `next`.
    ///
    /// Forward progress is strictly linear (with `Staged` allowed to jump to
    /// cleanup when the original is kept). Cleanup is reachable from every
    /// phase once the temp collection exists, and `Failed` from every
    /// non-terminal phase.
    pub fn can_transition_to(&self, next: MigrationPhase) -> bool {
        use MigrationPhase::*;

        match (self, next) {
            (Idle, TempCreated)
            | (TempCreated, Staged)
            | (Staged, OriginalDeleted)
            | (OriginalDeleted, OriginalRecreated)
            | (OriginalRecreated, Restored)
            | (TempCleanup, Done) => true,
            (from, TempCleanup) => *from >= TempCreated && *from < TempCleanup,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationPhase::Idle => write!(f, "idle"),
            MigrationPhase::TempCreated => write!(f, "temp_created"),
            MigrationPhase::Staged => write!(f, "staged"),
            MigrationPhase::OriginalDeleted => write!(f, "original_deleted"),
            MigrationPhase::OriginalRecreated => write!(f, "original_recreated"),
            MigrationPhase::Restored => write!(f, "restored"),
            MigrationPhase::TempCleanup => write!(f, "temp_cleanup"),
            MigrationPhase::Done => write!(f, "done"),
            MigrationPhase::Failed => write!(f, "failed"),
        }
    }
}

/// A store-mutating step of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Create the temp collection.
    CreateTemp,
    /// Copy source documents into the temp collection.
    StageCopy,
    /// Delete the original collection.
    DeleteOriginal,
    /// Recreate the original collection with the new schema.
    RecreateOriginal,
    /// Copy documents from the temp collection back into the original.
    RestoreCopy,
    /// Delete the temp collection.
    CleanupTemp,
}

impl Step {
    /// The phase reached when this step succeeds.
    pub fn completes(&self) -> MigrationPhase {
        match self {
            Step::CreateTemp => MigrationPhase::TempCreated,
            Step::StageCopy => MigrationPhase::Staged,
            Step::DeleteOriginal => MigrationPhase::OriginalDeleted,
            Step::RecreateOriginal => MigrationPhase::OriginalRecreated,
            Step::RestoreCopy => MigrationPhase::Restored,
            Step::CleanupTemp => MigrationPhase::Done,
        }
    }

    /// Short description for operator output.
    pub fn describe(&self) -> &'static str {
        match self {
            Step::CreateTemp => "create the temp collection",
            Step::StageCopy => "copy documents from the original into the temp collection",
            Step::DeleteOriginal => "delete the original collection",
            Step::RecreateOriginal => "recreate the original collection with the new schema",
            Step::RestoreCopy => "copy documents from the temp collection into the original",
            Step::CleanupTemp => "delete the temp collection",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::CreateTemp => write!(f, "create-temp"),
            Step::StageCopy => write!(f, "stage-copy"),
            Step::DeleteOriginal => write!(f, "delete-original"),
            Step::RecreateOriginal => write!(f, "recreate-original"),
            Step::RestoreCopy => write!(f, "restore-copy"),
            Step::CleanupTemp => write!(f, "cleanup-temp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MigrationPhase::*;

    #[test]
    fn test_linear_transitions() {
        assert!(Idle.can_transition_to(TempCreated));
        assert!(TempCreated.can_transition_to(Staged));
        assert!(Staged.can_transition_to(OriginalDeleted));
        assert!(OriginalDeleted.can_transition_to(OriginalRecreated));
        assert!(OriginalRecreated.can_transition_to(Restored));
        assert!(Restored.can_transition_to(TempCleanup));
        assert!(TempCleanup.can_transition_to(Done));

        assert!(!Idle.can_transition_to(Staged));
        assert!(!TempCreated.can_transition_to(OriginalDeleted));
        assert!(!Restored.can_transition_to(Done));
    }

    #[test]
    fn test_cleanup_reachable_once_temp_exists() {
        assert!(!Idle.can_transition_to(TempCleanup));
        for phase in [TempCreated, Staged, OriginalDeleted, OriginalRecreated, Restored] {
            assert!(phase.can_transition_to(TempCleanup), "{phase}");
        }
        assert!(!Done.can_transition_to(TempCleanup));
    }

    #[test]
    fn test_failed_from_non_terminal() {
        for phase in [Idle, TempCreated, Staged, OriginalDeleted, TempCleanup] {
            assert!(phase.can_transition_to(Failed));
        }
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::StageCopy.to_string(), "stage-copy");
        assert_eq!(Step::RestoreCopy.completes(), Restored);
    }
}
