use qorch_core::errors::QorchError;
use qorch_core::{
    BatchId, BatchRecord, BatchStatus, Compiler, DecodeFailurePolicy, Decoder, MetricRecord,
    OrchestratorConfig, RawResultRecord, VariantId, VariantRecord,
};
use qorch_store::Store;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::circuit::analyze;
use crate::family::{CodeFamily, CodeSpec};
use crate::keys::{counts_from_probabilities, reverse_keys, to_fixed_width};

#[derive(Debug, Default, Clone, Serialize)]
pub struct MetricsReport {
    pub written: usize,
    pub decode_failures: usize,
    /// Variants left without a metric row by a non-decode failure.
    pub skipped: Vec<(VariantId, QorchError)>,
    pub done: Vec<BatchId>,
    pub failures: Vec<(BatchId, QorchError)>,
}

/// Computes structural and decoding metrics for executed batches.
pub struct MetricsStage<'a> {
    config: &'a OrchestratorConfig,
    compiler: &'a dyn Compiler,
    decoder: &'a dyn Decoder,
}

impl<'a> MetricsStage<'a> {
    pub fn new(
        config: &'a OrchestratorConfig,
        compiler: &'a dyn Compiler,
        decoder: &'a dyn Decoder,
    ) -> Self {
        Self {
            config,
            compiler,
            decoder,
        }
    }

    pub fn run(&self, store: &Store) -> Result<MetricsReport, QorchError> {
        let mut report = MetricsReport::default();
        for batch in store.executed_batches()? {
            if let Err(err) = self.process_batch(store, &batch, &mut report) {
                if err.is_stale_transition() {
                    info!(batch_id = batch.id.as_raw(), "batch already completed");
                    continue;
                }
                error!(batch_id = batch.id.as_raw(), error = %err, "metrics pass failed");
                report.failures.push((batch.id, err));
            }
        }
        Ok(report)
    }

    fn process_batch(
        &self,
        store: &Store,
        batch: &BatchRecord,
        report: &mut MetricsReport,
    ) -> Result<(), QorchError> {
        let mut skipped = 0usize;
        for variant in store.variants_pending_metrics(batch.id)? {
            let Some(raw) = store.raw_result(variant.id)? else {
                continue;
            };
            match self.compute(&variant, &raw) {
                Ok(metric) => {
                    if let Some(reason) = &metric.decode_error {
                        warn!(
                            batch_id = batch.id.as_raw(),
                            variant_id = variant.id.as_raw(),
                            error = %reason,
                            "decode failed, structural metrics kept"
                        );
                        report.decode_failures += 1;
                    }
                    store.upsert_metric(&metric)?;
                    report.written += 1;
                }
                Err(err) => {
                    warn!(
                        batch_id = batch.id.as_raw(),
                        variant_id = variant.id.as_raw(),
                        error = %err,
                        "metrics skipped for variant"
                    );
                    skipped += 1;
                    report.skipped.push((variant.id, err));
                }
            }
        }
        if skipped > 0 {
            return Ok(());
        }
        if self.config.metrics.decode_failure == DecodeFailurePolicy::HoldExecuted
            && store.decode_failures(batch.id)? > 0
        {
            debug!(batch_id = batch.id.as_raw(), "held in executed until decodes succeed");
            return Ok(());
        }
        store.transition(batch.id, BatchStatus::Executed, BatchStatus::Done)?;
        info!(batch_id = batch.id.as_raw(), "batch done");
        report.done.push(batch.id);
        Ok(())
    }

    /// Structural metrics for the executed circuit plus, for code-family circuits, the
    /// decoder's verdict. A decoding failure is carried in `decode_error`; any other
    /// failure is returned.
    pub fn compute(
        &self,
        variant: &VariantRecord,
        raw: &RawResultRecord,
    ) -> Result<MetricRecord, QorchError> {
        let source = if raw.circuit.trim().is_empty() {
            &variant.circuit
        } else {
            &raw.circuit
        };
        let basis_circuit = self.compiler.to_basis(source)?;
        let stats = analyze(&basis_circuit)?;
        let mut metric = MetricRecord {
            variant_id: variant.id,
            total_gates: stats.total_gates,
            one_qubit_gates: stats.one_qubit_gates,
            two_qubit_gates: stats.two_qubit_gates,
            depth: stats.depth,
            success_rate: None,
            accepted: None,
            logical_errors: None,
            undecided: None,
            detection_seconds: None,
            decoding_seconds: None,
            decode_error: None,
        };
        if let Err(err) = self.decode_into(&variant.circuit_name, raw, &mut metric) {
            metric.decode_error = Some(err.to_string());
        }
        Ok(metric)
    }

    fn decode_into(
        &self,
        circuit_name: &str,
        raw: &RawResultRecord,
        metric: &mut MetricRecord,
    ) -> Result<(), QorchError> {
        let Some(spec) = CodeSpec::parse(circuit_name)? else {
            return Ok(());
        };
        let width = spec.width()?;
        let fixed = to_fixed_width(&raw.mean, width, self.config.keys)?;
        match spec.family {
            CodeFamily::AllMeasurement => {
                let counts = counts_from_probabilities(&fixed, raw.shots);
                let outcome = self.decoder.decode(spec.n, spec.basis, &counts)?;
                metric.success_rate = Some(outcome.success_rate);
                metric.accepted = Some(outcome.accepted);
                metric.logical_errors = Some(outcome.logical_errors);
                metric.undecided = Some(outcome.undecided);
                metric.detection_seconds = Some(outcome.detection_seconds);
                metric.decoding_seconds = Some(outcome.decoding_seconds);
            }
            CodeFamily::Preparation => {
                let reversed = reverse_keys(&fixed);
                metric.success_rate = Some(self.decoder.score(spec.n, spec.basis, &reversed)?);
            }
        }
        Ok(())
    }
}
