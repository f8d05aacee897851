//! Reduction of repeated runs into a mean distribution and population deviation.

use std::collections::BTreeSet;

use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{Distribution, OutcomeCounts};
use serde::{Deserialize, Serialize};

/// Mean and per-key population standard deviation over repeated runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub mean: Distribution,
    pub std_dev: Distribution,
}

/// Normalizes every run by `shots`, unions the keys and reduces each key over all runs,
/// counting a key absent from a run as zero.
pub fn aggregate_runs(runs: &[OutcomeCounts], shots: u32) -> Result<Aggregate, QorchError> {
    if runs.is_empty() {
        return Err(QorchError::Aggregate(ErrorInfo::new(
            "qorch_exec.no_runs",
            "cannot aggregate an empty run list",
        )));
    }
    if shots == 0 {
        return Err(QorchError::Aggregate(
            ErrorInfo::new("qorch_exec.zero_shots", "shots must be positive")
                .with_context("runs", runs.len()),
        ));
    }
    let shots = f64::from(shots);
    let keys: BTreeSet<&String> = runs.iter().flat_map(|run| run.keys()).collect();
    let n = runs.len() as f64;
    let mut mean = Distribution::new();
    let mut std_dev = Distribution::new();
    for key in keys {
        let series: Vec<f64> = runs
            .iter()
            .map(|run| run.get(key).copied().unwrap_or(0) as f64 / shots)
            .collect();
        let mu = series.iter().sum::<f64>() / n;
        let variance = series.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / n;
        mean.insert(key.clone(), mu);
        std_dev.insert(key.clone(), variance.sqrt());
    }
    Ok(Aggregate { mean, std_dev })
}
