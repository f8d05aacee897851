use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{
    BatchId, BatchRecord, ExecutionMode, JobHandle, JobRunner, OrchestratorConfig, VariantRecord,
};
use qorch_store::Store;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::pause::Pause;

/// Expands variants into the submitted circuit list, each repeated `runs` times in
/// variant-major order.
pub fn expand_runs(variants: &[VariantRecord], runs: u32) -> Vec<String> {
    variants
        .iter()
        .flat_map(|variant| std::iter::repeat(variant.circuit.clone()).take(runs as usize))
        .collect()
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DispatchReport {
    pub dispatched: Vec<(BatchId, JobHandle)>,
    /// Batches another process moved out of `unsubmitted` first.
    pub skipped: Vec<BatchId>,
}

/// Turns unsubmitted batches into external submissions.
pub struct Dispatcher<'a> {
    config: &'a OrchestratorConfig,
    runner: &'a dyn JobRunner,
    pause: &'a dyn Pause,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &'a OrchestratorConfig,
        runner: &'a dyn JobRunner,
        pause: &'a dyn Pause,
    ) -> Self {
        Self {
            config,
            runner,
            pause,
        }
    }

    /// Dispatches every batch awaiting submission, in id order.
    pub fn dispatch_pending(&self, store: &Store) -> Result<DispatchReport, QorchError> {
        let mut report = DispatchReport::default();
        for batch in store.batches_awaiting_submission()? {
            if self.pause.is_cancelled() {
                info!(batch_id = batch.id.as_raw(), "shutdown requested, dispatch stopped");
                break;
            }
            match self.dispatch_batch(store, &batch) {
                Ok(handle) => report.dispatched.push((batch.id, handle)),
                Err(err) if err.is_stale_transition() => {
                    warn!(
                        batch_id = batch.id.as_raw(),
                        error = %err,
                        "batch already dispatched elsewhere"
                    );
                    report.skipped.push(batch.id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    pub fn dispatch_batch(
        &self,
        store: &Store,
        batch: &BatchRecord,
    ) -> Result<JobHandle, QorchError> {
        if batch.mode == ExecutionMode::Local {
            let handle = JobHandle::local();
            store.mark_submitted(batch.id, &handle)?;
            info!(batch_id = batch.id.as_raw(), handle = %handle, "local batch queued");
            return Ok(handle);
        }
        let variants = store.variants_for_batch(batch.id)?;
        let circuits = expand_runs(&variants, batch.runs);
        let handle = self.submit_with_retry(batch.id, &circuits, batch.shots)?;
        if let Err(err) = store.mark_submitted(batch.id, &handle) {
            // No batch points at this job; the handle is only in the log.
            error!(
                batch_id = batch.id.as_raw(),
                handle = %handle,
                error = %err,
                "submission accepted but not recorded"
            );
            return Err(err);
        }
        info!(
            batch_id = batch.id.as_raw(),
            handle = %handle,
            circuits = circuits.len(),
            "batch submitted"
        );
        Ok(handle)
    }

    /// Submits until the runner accepts, pausing the configured cool-down between
    /// attempts. Only a cancelled pause ends the loop without a handle.
    pub fn submit_with_retry(
        &self,
        batch_id: BatchId,
        circuits: &[String],
        shots: u32,
    ) -> Result<JobHandle, QorchError> {
        let cool_down = self.config.retry.cool_down();
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.runner.submit(circuits, shots) {
                Ok(handle) => return Ok(handle),
                Err(err) => {
                    warn!(
                        batch_id = batch_id.as_raw(),
                        attempt,
                        error = %err,
                        cool_down_secs = cool_down.as_secs(),
                        "submission failed, retrying"
                    );
                    if self.pause.pause(cool_down) {
                        return Err(QorchError::Cancelled(
                            ErrorInfo::new("qorch_exec.dispatch_cancelled", "submission retry cancelled")
                                .with_context("batch_id", batch_id)
                                .with_context("attempts", attempt),
                        ));
                    }
                }
            }
        }
    }
}
