//! Collection swap orchestration.
//!
//! Sequences the protocol:
//!
//! 1. create the temp collection
//! 2. copy the original into it
//! 3. delete the original
//! 4. recreate the original with the new schema
//! 5. copy the temp collection back into the original
//! 6. delete the temp collection
//!
//! Steps 3-5 only run when the original is to be replaced and step 2
//! succeeded. Step 6 runs on every exit path once step 1 succeeded, except
//! when a step fails after the original was deleted and
//! [`MigrationConfig::retain_temp_on_restore_failure`] is set: the temp
//! collection then holds the only copy of the documents and is kept.

mod phase;
mod report;

pub use phase::{MigrationPhase, Step};
pub use report::{MigrationReport, TempDisposition};

use tracing::{error, info, warn};

use crate::config::MigrationConfig;
use crate::copier::{CopyOptions, DocumentCopier};
use crate::descriptor::CollectionDescriptor;
use crate::error::{MigrationError, ProvisionError, StageError};
use crate::plan::MigrationPlan;
use crate::provisioner::CollectionProvisioner;
use crate::store::DocumentStore;

type StepFailure = (Step, StageError);

/// Runs the collection swap protocol against a store.
pub struct Orchestrator<'a, S: ?Sized> {
    store: &'a S,
    config: &'a MigrationConfig,
}

impl<'a, S: DocumentStore + ?Sized> Orchestrator<'a, S> {
    pub fn new(store: &'a S, config: &'a MigrationConfig) -> Self {
        Self { store, config }
    }

    /// Derive the plan a run would follow, without touching the store.
    pub fn plan(&self, source: &CollectionDescriptor) -> Result<MigrationPlan, ProvisionError> {
        MigrationPlan::new(source, self.config)
    }

    /// Migrate `source` to the schema it describes.
    ///
    /// On failure the returned error names the failed step and carries the
    /// report, including what happened to the temp collection.
    pub async fn run(&self, source: &CollectionDescriptor) -> Result<MigrationReport, MigrationError> {
        let mut report = MigrationReport::new(source.clone());
        let provisioner = CollectionProvisioner::new(self.store);

        let plan = match self.plan(source) {
            Ok(plan) => plan,
            Err(err) => return Err(failure(report, Step::CreateTemp, err.into())),
        };
        report.temp = Some(plan.temp().clone());

        info!(
            source = %plan.source().qualified_name(),
            temp = %plan.temp().qualified_name(),
            destructive = plan.is_destructive(),
            "starting collection swap"
        );

        // Nothing exists yet, so nothing to clean up.
        if let Err(err) = provisioner.create(plan.temp()).await {
            error!(step = %Step::CreateTemp, error = %err, "step failed");
            return Err(failure(report, Step::CreateTemp, err.into()));
        }
        report.temp_disposition = TempDisposition::Present;
        report.complete(Step::CreateTemp);

        let outcome = self.swap(&plan, &mut report).await;
        if let Err((step, err)) = &outcome {
            error!(step = %step, error = %err, "step failed");
            if !report.original_deleted() {
                info!(source = %plan.source().qualified_name(), "original collection left untouched");
            }
        }

        let retain = outcome.is_err()
            && report.original_deleted()
            && self.config.retain_temp_on_restore_failure;
        let cleanup = if retain {
            warn!(
                temp = %plan.temp().qualified_name(),
                "original collection was deleted, keeping temp collection for manual restore"
            );
            report.temp_disposition = TempDisposition::Retained;
            None
        } else {
            report.advance(MigrationPhase::TempCleanup);
            Some(provisioner.delete(plan.temp()).await)
        };

        match (outcome, cleanup) {
            (Ok(()), Some(Ok(()))) => {
                report.temp_disposition = TempDisposition::Deleted;
                report.complete(Step::CleanupTemp);
                info!(source = %plan.source().qualified_name(), "collection swap complete");
                Ok(report)
            }
            (Ok(()), Some(Err(err))) => {
                error!(step = %Step::CleanupTemp, error = %err, "step failed");
                report.temp_disposition = TempDisposition::CleanupFailed(err.to_string());
                Err(failure(report, Step::CleanupTemp, err.into()))
            }
            (Err((step, cause)), cleanup) => {
                match cleanup {
                    Some(Ok(())) => {
                        report.temp_disposition = TempDisposition::Deleted;
                        report.completed_steps.push(Step::CleanupTemp);
                    }
                    Some(Err(err)) => {
                        error!(step = %Step::CleanupTemp, error = %err, "temp cleanup failed after earlier failure");
                        report.temp_disposition = TempDisposition::CleanupFailed(err.to_string());
                    }
                    None => {}
                }
                Err(failure(report, step, cause))
            }
            // cleanup is only skipped after a failure
            (Ok(()), None) => Ok(report),
        }
    }

    /// Steps 2-5.
    async fn swap(&self, plan: &MigrationPlan, report: &mut MigrationReport) -> Result<(), StepFailure> {
        let provisioner = CollectionProvisioner::new(self.store);
        let copier = DocumentCopier::new(self.store);

        let staging_options = CopyOptions {
            skip_duplicates: self.config.skip_duplicates,
            on_mismatch: self.config.on_mismatch,
        };
        let staged = copier
            .copy(plan.source(), plan.temp(), staging_options)
            .await
            .map_err(|err| (Step::StageCopy, StageError::from(err)))?;
        report.staging = Some(staged);
        report.complete(Step::StageCopy);

        if !plan.is_destructive() {
            info!(source = %plan.source().qualified_name(), "keeping original collection, restore skipped");
            return Ok(());
        }

        provisioner
            .delete(plan.source())
            .await
            .map_err(|err| (Step::DeleteOriginal, StageError::from(err)))?;
        report.complete(Step::DeleteOriginal);

        provisioner
            .create(plan.source())
            .await
            .map_err(|err| (Step::RecreateOriginal, StageError::from(err)))?;
        report.complete(Step::RecreateOriginal);

        // Documents were deduplicated on the way in.
        let restore_options = CopyOptions {
            skip_duplicates: false,
            on_mismatch: self.config.on_mismatch,
        };
        let restored = copier
            .copy(plan.temp(), plan.source(), restore_options)
            .await
            .map_err(|err| (Step::RestoreCopy, StageError::from(err)))?;
        report.restore = Some(restored);
        report.complete(Step::RestoreCopy);

        Ok(())
    }
}

fn failure(mut report: MigrationReport, step: Step, cause: StageError) -> MigrationError {
    report.fail(step);
    MigrationError {
        step,
        cause,
        report: Box::new(report),
    }
}
