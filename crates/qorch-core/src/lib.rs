#![deny(missing_docs)]
#![doc = "Core records, capability traits and configuration shared by the qorch orchestrator."]

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod errors;
pub mod status;
mod types;

pub use config::{DecodeFailurePolicy, KeyFormat, OrchestratorConfig, RetryConfig, RunDefaults};
pub use errors::{ErrorInfo, QorchError};
pub use status::{BatchStatus, ExecutionMode, JobState, LEGAL_TRANSITIONS};
pub use types::{
    BatchId, BatchRecord, BatchSummary, Distribution, JobHandle, MetricRecord, NewBatch,
    NewVariant, OutcomeCounts, RawResultRecord, VariantId, VariantRecord,
};

/// Output of a [`Compiler`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledCircuit {
    /// Compiled OpenQASM text.
    pub circuit: String,
    /// Initial layout: logical qubit index to physical qubit.
    pub mapping: Vec<u32>,
    /// Wall-clock compilation time in seconds.
    pub duration_seconds: f64,
}

/// One execution of one circuit as reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Measured-state occurrence counts.
    pub counts: OutcomeCounts,
    /// Circuit as the backend actually ran it, when reported.
    #[serde(default)]
    pub circuit: Option<String>,
}

impl RunOutcome {
    /// Outcome without a backend-reported circuit.
    pub fn from_counts(counts: OutcomeCounts) -> Self {
        Self {
            counts,
            circuit: None,
        }
    }
}

/// Logical basis label encoded in code-family circuit names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    /// Logical X basis.
    X,
    /// Logical Z basis.
    Z,
}

impl Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::X => f.write_str("X"),
            Basis::Z => f.write_str("Z"),
        }
    }
}

impl FromStr for Basis {
    type Err = QorchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "X" => Ok(Basis::X),
            "Z" => Ok(Basis::Z),
            other => Err(QorchError::Decode(
                ErrorInfo::new("qorch_core.basis_parse", "unknown logical basis")
                    .with_context("value", other),
            )),
        }
    }
}

/// Full decode of an error-correction experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOutcome {
    /// Shots whose syndrome was accepted.
    pub accepted: u64,
    /// Accepted shots decoded to the wrong logical state.
    pub logical_errors: u64,
    /// Shots the decoder could not classify.
    pub undecided: u64,
    /// Fraction of accepted shots decoded correctly.
    pub success_rate: f64,
    /// Time spent in syndrome detection, seconds.
    pub detection_seconds: f64,
    /// Time spent decoding, seconds.
    pub decoding_seconds: f64,
}

/// Circuit compilation capability.
pub trait Compiler: Send + Sync {
    /// Compiles `circuit` for `target` with the named technique.
    fn compile(
        &self,
        circuit: &str,
        target: &str,
        technique: &str,
        noise_level: Option<f64>,
    ) -> Result<CompiledCircuit, QorchError>;

    /// Rewrites `circuit` into the canonical basis used for gate counting.
    fn to_basis(&self, circuit: &str) -> Result<String, QorchError> {
        Ok(circuit.to_string())
    }
}

/// Asynchronous execution backend.
pub trait JobRunner: Send + Sync {
    /// Submits the ordered circuits as a single job.
    fn submit(&self, circuits: &[String], shots: u32) -> Result<JobHandle, QorchError>;

    /// Reports the state of a submitted job.
    fn status(&self, handle: &JobHandle) -> Result<JobState, QorchError>;

    /// Returns one outcome per submitted circuit, in submission order.
    fn fetch_results(&self, handle: &JobHandle) -> Result<Vec<RunOutcome>, QorchError>;
}

/// Synchronous simulator used for local-mode batches.
pub trait LocalExecutor: Send + Sync {
    /// Runs one circuit for `shots` shots at the given noise level.
    fn execute(
        &self,
        circuit: &str,
        shots: u32,
        noise_level: Option<f64>,
    ) -> Result<RunOutcome, QorchError>;
}

/// Error-correction decoding capability.
pub trait Decoder: Send + Sync {
    /// Decodes fixed-width bitstring counts of an all-measurement experiment.
    fn decode(
        &self,
        n: u32,
        basis: Basis,
        counts: &OutcomeCounts,
    ) -> Result<DecodeOutcome, QorchError>;

    /// Scores a state-preparation experiment from its distribution.
    fn score(&self, n: u32, basis: Basis, distribution: &Distribution) -> Result<f64, QorchError>;
}
