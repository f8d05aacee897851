use qorch_core::errors::QorchError;
use qorch_core::{BatchRecord, KeyFormat, LocalExecutor, RawResultRecord, VariantRecord};
use qorch_store::Store;
use tracing::{debug, warn};

use crate::aggregate::aggregate_runs;
use crate::circuit::measure_mapping;
use crate::keys::canonicalize_counts;

/// Variants written and skipped by one local execution pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LocalRun {
    pub written: usize,
    pub failed: usize,
}

fn run_variant(
    executor: &dyn LocalExecutor,
    format: KeyFormat,
    shots: u32,
    variant: &VariantRecord,
) -> Result<RawResultRecord, QorchError> {
    let noise_level = if variant.is_noiseless() {
        None
    } else {
        variant.noise_level
    };
    let outcome = executor.execute(&variant.circuit, shots, noise_level)?;
    let counts = canonicalize_counts(&outcome.counts, format);
    let aggregate = aggregate_runs(std::slice::from_ref(&counts), shots)?;
    let circuit = outcome.circuit.unwrap_or_else(|| variant.circuit.clone());
    Ok(RawResultRecord {
        variant_id: variant.id,
        mean: aggregate.mean,
        std_dev: aggregate.std_dev,
        measure_mapping: measure_mapping(&circuit),
        circuit,
        shots,
    })
}

/// Executes every variant of `batch` still missing a raw result, writing each result as
/// soon as it exists. Per-variant failures are logged and skipped.
pub fn execute_locally(
    store: &Store,
    executor: &dyn LocalExecutor,
    format: KeyFormat,
    batch: &BatchRecord,
) -> Result<LocalRun, QorchError> {
    let mut run = LocalRun::default();
    for variant in store.variants_awaiting_results(batch.id)? {
        let record = match run_variant(executor, format, batch.shots, &variant) {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    batch_id = batch.id.as_raw(),
                    variant_id = variant.id.as_raw(),
                    error = %err,
                    "local execution failed"
                );
                run.failed += 1;
                continue;
            }
        };
        store.upsert_raw_result(&record)?;
        debug!(
            batch_id = batch.id.as_raw(),
            variant_id = variant.id.as_raw(),
            "local result written"
        );
        run.written += 1;
    }
    Ok(run)
}
