//! Migration plans.

use crate::config::MigrationConfig;
use crate::descriptor::CollectionDescriptor;
use crate::error::ProvisionError;
use crate::orchestrator::Step;

/// The source and temp descriptors of a run and the steps it will take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    source: CollectionDescriptor,
    temp: CollectionDescriptor,
    steps: Vec<Step>,
}

impl MigrationPlan {
    /// Derive the plan for migrating `source` under `config`.
    ///
    /// `source` holds the desired target schema; the temp collection shares
    /// it with only the name changed.
    pub fn new(source: &CollectionDescriptor, config: &MigrationConfig) -> Result<Self, ProvisionError> {
        source.validate()?;
        let temp = source.temp_descriptor(&config.temp_suffix)?;

        let mut steps = vec![Step::CreateTemp, Step::StageCopy];
        if config.delete_original {
            steps.extend([Step::DeleteOriginal, Step::RecreateOriginal, Step::RestoreCopy]);
        }
        steps.push(Step::CleanupTemp);

        Ok(Self {
            source: source.clone(),
            temp,
            steps,
        })
    }

    pub fn source(&self) -> &CollectionDescriptor {
        &self.source
    }

    pub fn temp(&self) -> &CollectionDescriptor {
        &self.temp
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Whether the plan deletes the original collection.
    pub fn is_destructive(&self) -> bool {
        self.steps.contains(&Step::DeleteOriginal)
    }
}
