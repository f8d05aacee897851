use qorch_core::errors::QorchError;
use qorch_core::{
    BatchId, BatchRecord, BatchStatus, ExecutionMode, JobHandle, JobRunner, JobState,
    LocalExecutor, OrchestratorConfig, RawResultRecord, RunOutcome, VariantRecord,
};
use qorch_store::Store;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::aggregate::aggregate_runs;
use crate::circuit::measure_mapping;
use crate::keys::canonicalize_counts;
use crate::partition::partition_runs;
use crate::simulate::execute_locally;

/// What one poll observed for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The job has not finished; nothing changed.
    StillPending,
    /// The job errored or was cancelled and the batch moved to `error`.
    Failed { state: String },
    /// Results for every variant were written and the batch moved to `executed`.
    Executed { variants: usize },
    /// A local batch ran its outstanding variants and moved to `executed`.
    LocalExecuted { written: usize, failed: usize },
    /// Another process already moved the batch on.
    Superseded,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PollReport {
    pub outcomes: Vec<(BatchId, PollOutcome)>,
    pub failures: Vec<(BatchId, QorchError)>,
}

/// Inspects pending batches and pulls their results when ready.
pub struct PollingEngine<'a> {
    config: &'a OrchestratorConfig,
    runner: &'a dyn JobRunner,
    local: &'a dyn LocalExecutor,
}

impl<'a> PollingEngine<'a> {
    pub fn new(
        config: &'a OrchestratorConfig,
        runner: &'a dyn JobRunner,
        local: &'a dyn LocalExecutor,
    ) -> Self {
        Self {
            config,
            runner,
            local,
        }
    }

    /// Polls every pending batch. A failing batch is logged and the pass moves on.
    pub fn poll_pending(&self, store: &mut Store) -> Result<PollReport, QorchError> {
        let batches = store.pending_batches()?;
        Ok(self.poll_all(store, batches))
    }

    /// Polls only the pending batches submitted under `handle`.
    pub fn poll_handle(
        &self,
        store: &mut Store,
        handle: &JobHandle,
    ) -> Result<PollReport, QorchError> {
        let batches = store.pending_batches_for_handle(handle)?;
        Ok(self.poll_all(store, batches))
    }

    fn poll_all(&self, store: &mut Store, batches: Vec<BatchRecord>) -> PollReport {
        let mut report = PollReport::default();
        for batch in batches {
            match self.poll_batch(store, &batch) {
                Ok(outcome) => report.outcomes.push((batch.id, outcome)),
                Err(err) if err.is_stale_transition() => {
                    info!(batch_id = batch.id.as_raw(), "batch already advanced");
                    report.outcomes.push((batch.id, PollOutcome::Superseded));
                }
                Err(err) => {
                    error!(
                        batch_id = batch.id.as_raw(),
                        handle = batch.handle.as_ref().map(JobHandle::as_str).unwrap_or(""),
                        error = %err,
                        "polling failed"
                    );
                    report.failures.push((batch.id, err));
                }
            }
        }
        report
    }

    pub fn poll_batch(
        &self,
        store: &mut Store,
        batch: &BatchRecord,
    ) -> Result<PollOutcome, QorchError> {
        if batch.mode == ExecutionMode::Local {
            let run = execute_locally(store, self.local, self.config.keys, batch)?;
            store.transition(batch.id, BatchStatus::Pending, BatchStatus::Executed)?;
            info!(
                batch_id = batch.id.as_raw(),
                written = run.written,
                failed = run.failed,
                "local batch executed"
            );
            return Ok(PollOutcome::LocalExecuted {
                written: run.written,
                failed: run.failed,
            });
        }
        let Some(handle) = batch.handle.as_ref() else {
            warn!(batch_id = batch.id.as_raw(), "pending batch has no handle");
            return Ok(PollOutcome::StillPending);
        };
        match self.runner.status(handle)? {
            JobState::Pending => Ok(PollOutcome::StillPending),
            state @ (JobState::Errored | JobState::Cancelled) => {
                store.transition(batch.id, BatchStatus::Pending, BatchStatus::Error)?;
                warn!(
                    batch_id = batch.id.as_raw(),
                    handle = %handle,
                    state = ?state,
                    "job failed, batch marked error"
                );
                Ok(PollOutcome::Failed {
                    state: format!("{state:?}").to_lowercase(),
                })
            }
            JobState::Done => {
                let outcomes = self.runner.fetch_results(handle)?;
                let variants = store.variants_for_batch(batch.id)?;
                let records = self.build_records(batch, &variants, outcomes)?;
                store.record_batch_results(batch.id, &records)?;
                info!(
                    batch_id = batch.id.as_raw(),
                    handle = %handle,
                    variants = records.len(),
                    "results retrieved"
                );
                Ok(PollOutcome::Executed {
                    variants: records.len(),
                })
            }
        }
    }

    /// Partitions the flat outcome list and aggregates one raw result per variant.
    pub fn build_records(
        &self,
        batch: &BatchRecord,
        variants: &[VariantRecord],
        outcomes: Vec<RunOutcome>,
    ) -> Result<Vec<RawResultRecord>, QorchError> {
        let groups = partition_runs(outcomes, variants.len(), batch.runs as usize)?;
        let mut records = Vec::with_capacity(variants.len());
        for (variant, group) in variants.iter().zip(groups) {
            let counts: Vec<_> = group
                .iter()
                .map(|outcome| canonicalize_counts(&outcome.counts, self.config.keys))
                .collect();
            let aggregate = aggregate_runs(&counts, batch.shots)?;
            // The backend reports the circuit it ran; the last run of the group stands for all.
            let circuit = group
                .into_iter()
                .rev()
                .find_map(|outcome| outcome.circuit)
                .unwrap_or_else(|| variant.circuit.clone());
            records.push(RawResultRecord {
                variant_id: variant.id,
                mean: aggregate.mean,
                std_dev: aggregate.std_dev,
                measure_mapping: measure_mapping(&circuit),
                circuit,
                shots: batch.shots,
            });
        }
        Ok(records)
    }
}
