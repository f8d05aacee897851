use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::status::{BatchStatus, ExecutionMode};

/// Measured-state key to normalized probability.
pub type Distribution = BTreeMap<String, f64>;

/// Measured-state key to number of observed occurrences in one execution.
pub type OutcomeCounts = BTreeMap<String, u64>;

/// Identifier of a batch header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(i64);

impl BatchId {
    /// Creates an identifier from its raw row id.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    pub fn as_raw(&self) -> i64 {
        self.0
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a variant row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantId(i64);

impl VariantId {
    /// Creates an identifier from its raw row id.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw row id.
    pub fn as_raw(&self) -> i64 {
        self.0
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle returned by a job runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    /// Reserved handle stored for batches executed by a local simulator.
    pub const LOCAL: &'static str = "local";

    /// Wraps a backend-issued handle.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The handle recorded for local-mode batches.
    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    /// Borrow the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for a new batch header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    /// Owner of the batch.
    pub user: String,
    /// Target backend name.
    pub backend: String,
    /// Remote submission or local execution.
    pub mode: ExecutionMode,
    /// Shots per run.
    pub shots: u32,
    /// Repeated runs per variant.
    pub runs: u32,
}

/// Persisted batch header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Row identifier.
    pub id: BatchId,
    /// Owner of the batch.
    pub user: String,
    /// Target backend name.
    pub backend: String,
    /// Remote submission or local execution.
    pub mode: ExecutionMode,
    /// Shots per run.
    pub shots: u32,
    /// Repeated runs per variant.
    pub runs: u32,
    /// Job handle, set once the batch was submitted.
    pub handle: Option<JobHandle>,
    /// Lifecycle state.
    pub status: BatchStatus,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last status change.
    pub updated_at: String,
}

/// A compiled circuit ready to be attached to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVariant {
    /// Source circuit name, usually the file stem.
    pub circuit_name: String,
    /// Compiled OpenQASM text.
    pub circuit: String,
    /// Compilation technique that produced the circuit.
    pub technique: String,
    /// Simulated noise level, if any.
    pub noise_level: Option<f64>,
    /// Initial layout: logical qubit index to physical qubit.
    pub mapping: Vec<u32>,
    /// Wall time spent compiling.
    pub compile_seconds: f64,
}

/// Persisted variant. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Row identifier.
    pub id: VariantId,
    /// Owning batch.
    pub batch_id: BatchId,
    /// Position in submission order, fixed at registration.
    pub ordinal: u32,
    /// Source circuit name.
    pub circuit_name: String,
    /// Compiled OpenQASM text as submitted.
    pub circuit: String,
    /// Compilation technique.
    pub technique: String,
    /// Simulated noise level, if any.
    pub noise_level: Option<f64>,
    /// Initial layout from compilation.
    pub mapping: Vec<u32>,
    /// Wall time spent compiling.
    pub compile_seconds: f64,
}

impl VariantRecord {
    /// `None` and `0.0` both denote an ideal run.
    pub fn is_noiseless(&self) -> bool {
        self.noise_level.map_or(true, |level| level == 0.0)
    }
}

/// Aggregated per-variant outcome, at most one per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResultRecord {
    /// Variant the result belongs to.
    pub variant_id: VariantId,
    /// Per-key mean probability over the repeated runs.
    pub mean: Distribution,
    /// Per-key population standard deviation over the repeated runs.
    pub std_dev: Distribution,
    /// Circuit as executed, which may differ from the submitted form.
    pub circuit: String,
    /// Shots per run.
    pub shots: u32,
    /// Classical bit to measured qubit, derived from the executed circuit.
    pub measure_mapping: BTreeMap<u32, u32>,
}

/// Derived metrics, at most one per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Variant the metrics belong to.
    pub variant_id: VariantId,
    /// Every operation, measurements and barriers included.
    pub total_gates: u64,
    /// Operations outside the two-qubit set and `measure`.
    pub one_qubit_gates: u64,
    /// Operations in the two-qubit set.
    pub two_qubit_gates: u64,
    /// Longest dependency chain, barriers excluded.
    pub depth: u64,
    /// Decoder success rate for code-family circuits.
    pub success_rate: Option<f64>,
    /// Shots accepted by post-selection.
    pub accepted: Option<u64>,
    /// Accepted shots decoded to a logical error.
    pub logical_errors: Option<u64>,
    /// Shots the decoder could not resolve.
    pub undecided: Option<u64>,
    /// Time spent in error detection.
    pub detection_seconds: Option<f64>,
    /// Time spent decoding.
    pub decoding_seconds: Option<f64>,
    /// Set when the decoder failed for this variant.
    pub decode_error: Option<String>,
}

/// Row of the status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Batch identifier.
    pub id: BatchId,
    /// Target backend name.
    pub backend: String,
    /// Remote submission or local execution.
    pub mode: ExecutionMode,
    /// Lifecycle state.
    pub status: BatchStatus,
    /// Job handle, if submitted.
    pub handle: Option<JobHandle>,
    /// Number of variants.
    pub variants: u64,
    /// Variants with a stored raw result.
    pub raw_results: u64,
    /// Variants with a stored metric row.
    pub metrics: u64,
    /// RFC 3339 time of the last status change.
    pub updated_at: String,
}
