use std::fs;
use std::path::Path;

use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::BatchId;

use crate::gateway::Store;

const CSV_HEADER: [&str; 18] = [
    "batch_id",
    "variant_id",
    "ordinal",
    "circuit_name",
    "technique",
    "noise_level",
    "backend",
    "total_gates",
    "one_qubit_gates",
    "two_qubit_gates",
    "depth",
    "success_rate",
    "accepted",
    "logical_errors",
    "undecided",
    "detection_seconds",
    "decoding_seconds",
    "decode_error",
];

fn export_error(err: impl ToString, path: &Path) -> QorchError {
    QorchError::Serde(
        ErrorInfo::new("qorch_store.export", err.to_string())
            .with_context("path", path.display()),
    )
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

pub fn export_metrics_json(
    store: &Store,
    batch: Option<BatchId>,
    out_path: &Path,
) -> Result<(), QorchError> {
    let rows = store.metric_rows(batch)?;
    let bytes = serde_json::to_vec_pretty(&rows).map_err(|err| export_error(err, out_path))?;
    fs::write(out_path, bytes).map_err(|err| export_error(err, out_path))
}

pub fn export_metrics_csv(
    store: &Store,
    batch: Option<BatchId>,
    out_path: &Path,
) -> Result<(), QorchError> {
    let mut wtr = csv::Writer::from_path(out_path).map_err(|err| export_error(err, out_path))?;
    wtr.write_record(CSV_HEADER)
        .map_err(|err| export_error(err, out_path))?;
    for row in store.metric_rows(batch)? {
        wtr.write_record([
            row.batch_id.to_string(),
            row.variant_id.to_string(),
            row.ordinal.to_string(),
            row.circuit_name,
            row.technique,
            opt(&row.noise_level),
            row.backend,
            row.total_gates.to_string(),
            row.one_qubit_gates.to_string(),
            row.two_qubit_gates.to_string(),
            row.depth.to_string(),
            opt(&row.success_rate),
            opt(&row.accepted),
            opt(&row.logical_errors),
            opt(&row.undecided),
            opt(&row.detection_seconds),
            opt(&row.decoding_seconds),
            row.decode_error.unwrap_or_default(),
        ])
        .map_err(|err| export_error(err, out_path))?;
    }
    wtr.flush().map_err(|err| export_error(err, out_path))
}
