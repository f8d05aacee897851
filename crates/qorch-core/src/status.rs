//! Batch lifecycle states and the table of legal transitions.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, QorchError};

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Registered, no submission handle yet.
    Unsubmitted,
    /// Submitted, waiting on the backend.
    Pending,
    /// Raw results retrieved for every variant.
    Executed,
    /// Metrics computed.
    Done,
    /// The backend reported the job errored or cancelled.
    Error,
}

/// Every transition the gateway accepts. Anything else is rejected.
pub const LEGAL_TRANSITIONS: [(BatchStatus, BatchStatus); 4] = [
    (BatchStatus::Unsubmitted, BatchStatus::Pending),
    (BatchStatus::Pending, BatchStatus::Executed),
    (BatchStatus::Pending, BatchStatus::Error),
    (BatchStatus::Executed, BatchStatus::Done),
];

impl BatchStatus {
    /// All states in lifecycle order.
    pub const ALL: [BatchStatus; 5] = [
        BatchStatus::Unsubmitted,
        BatchStatus::Pending,
        BatchStatus::Executed,
        BatchStatus::Done,
        BatchStatus::Error,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Unsubmitted => "unsubmitted",
            BatchStatus::Pending => "pending",
            BatchStatus::Executed => "executed",
            BatchStatus::Done => "done",
            BatchStatus::Error => "error",
        }
    }

    /// Whether `self -> next` appears in [`LEGAL_TRANSITIONS`].
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        LEGAL_TRANSITIONS.contains(&(*self, next))
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Done | BatchStatus::Error)
    }

    /// Validates `self -> next`, returning a transition error otherwise.
    pub fn check_transition(&self, next: BatchStatus) -> Result<(), QorchError> {
        if self.can_transition_to(next) {
            return Ok(());
        }
        Err(QorchError::Transition(
            ErrorInfo::new(
                "qorch_core.illegal_transition",
                format!("batch status cannot move from {self} to {next}"),
            )
            .with_context("from", self)
            .with_context("to", next),
        ))
    }
}

impl Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = QorchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BatchStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                QorchError::Store(
                    ErrorInfo::new("qorch_core.status_parse", "unknown batch status")
                        .with_context("value", s),
                )
            })
    }
}

/// Where the circuits of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Queued on an external backend through a [`crate::JobRunner`].
    #[default]
    Remote,
    /// Executed synchronously through a [`crate::LocalExecutor`].
    Local,
}

impl ExecutionMode {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Remote => "remote",
            ExecutionMode::Local => "local",
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = QorchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(ExecutionMode::Remote),
            "local" => Ok(ExecutionMode::Local),
            other => Err(QorchError::Store(
                ErrorInfo::new("qorch_core.mode_parse", "unknown execution mode")
                    .with_context("value", other),
            )),
        }
    }
}

/// State reported by a [`crate::JobRunner`] for a submitted handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued or running.
    Pending,
    /// Failed on the backend.
    Errored,
    /// Cancelled on the backend.
    Cancelled,
    /// Finished; results can be fetched.
    Done,
}
