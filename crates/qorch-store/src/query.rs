use qorch_core::errors::QorchError;
use qorch_core::{BatchId, BatchStatus, BatchSummary, ExecutionMode, JobHandle};
use serde::{Deserialize, Serialize};

use crate::gateway::{store_error, Store};

/// One metric row joined with its variant and batch, as exported to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricExportRow {
    pub batch_id: i64,
    pub variant_id: i64,
    pub ordinal: u32,
    pub circuit_name: String,
    pub technique: String,
    pub noise_level: Option<f64>,
    pub backend: String,
    pub total_gates: u64,
    pub one_qubit_gates: u64,
    pub two_qubit_gates: u64,
    pub depth: u64,
    pub success_rate: Option<f64>,
    pub accepted: Option<u64>,
    pub logical_errors: Option<u64>,
    pub undecided: Option<u64>,
    pub detection_seconds: Option<f64>,
    pub decoding_seconds: Option<f64>,
    pub decode_error: Option<String>,
}

impl Store {
    /// Status report: one row per batch with variant, raw result and metric counts.
    pub fn batch_summaries(&self) -> Result<Vec<BatchSummary>, QorchError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT b.id, b.backend, b.mode, b.status, b.job_handle, b.updated_at,
                    COUNT(v.id), COUNT(r.variant_id), COUNT(m.variant_id)
                 FROM batches b
                 LEFT JOIN variants v ON v.batch_id = b.id
                 LEFT JOIN raw_results r ON r.variant_id = v.id
                 LEFT JOIN metrics m ON m.variant_id = v.id
                 GROUP BY b.id
                 ORDER BY b.id",
            )
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, i64>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })
            .map_err(|err| store_error("qorch_store.query", err))?;
        let mut summaries = Vec::new();
        for row in rows {
            let (id, backend, mode, status, handle, updated_at, variants, raw, metrics) =
                row.map_err(|err| store_error("qorch_store.query", err))?;
            summaries.push(BatchSummary {
                id: BatchId::from_raw(id),
                backend,
                mode: mode.parse::<ExecutionMode>()?,
                status: status.parse::<BatchStatus>()?,
                handle: handle.map(JobHandle::new),
                variants: variants as u64,
                raw_results: raw as u64,
                metrics: metrics as u64,
                updated_at,
            });
        }
        Ok(summaries)
    }

    /// Metric rows in batch then ordinal order, optionally limited to one batch.
    pub fn metric_rows(&self, batch: Option<BatchId>) -> Result<Vec<MetricExportRow>, QorchError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT b.id, v.id, v.ordinal, v.circuit_name, v.technique, v.noise_level, b.backend,
                    m.total_gates, m.one_qubit_gates, m.two_qubit_gates, m.depth, m.success_rate,
                    m.accepted, m.logical_errors, m.undecided, m.detection_seconds,
                    m.decoding_seconds, m.decode_error
                 FROM metrics m
                 INNER JOIN variants v ON v.id = m.variant_id
                 INNER JOIN batches b ON b.id = v.batch_id
                 WHERE ?1 IS NULL OR b.id = ?1
                 ORDER BY b.id, v.ordinal",
            )
            .map_err(|err| store_error("qorch_store.query", err))?;
        let rows = stmt
            .query_map([batch.map(|id| id.as_raw())], |row| {
                Ok(MetricExportRow {
                    batch_id: row.get(0)?,
                    variant_id: row.get(1)?,
                    ordinal: row.get::<_, i64>(2)? as u32,
                    circuit_name: row.get(3)?,
                    technique: row.get(4)?,
                    noise_level: row.get(5)?,
                    backend: row.get(6)?,
                    total_gates: row.get::<_, i64>(7)? as u64,
                    one_qubit_gates: row.get::<_, i64>(8)? as u64,
                    two_qubit_gates: row.get::<_, i64>(9)? as u64,
                    depth: row.get::<_, i64>(10)? as u64,
                    success_rate: row.get(11)?,
                    accepted: row.get::<_, Option<i64>>(12)?.map(|v| v as u64),
                    logical_errors: row.get::<_, Option<i64>>(13)?.map(|v| v as u64),
                    undecided: row.get::<_, Option<i64>>(14)?.map(|v| v as u64),
                    detection_seconds: row.get(15)?,
                    decoding_seconds: row.get(16)?,
                    decode_error: row.get(17)?,
                })
            })
            .map_err(|err| store_error("qorch_store.query", err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| store_error("qorch_store.query", err))
    }
}
