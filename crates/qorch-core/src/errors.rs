//! Structured error types shared across qorch crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`QorchError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (batch ids, handles, sizes).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum QorchError {
    /// Relational store failures (open, schema, statement, transaction).
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Rejected or lost batch status transitions.
    #[error("transition error: {0}")]
    Transition(ErrorInfo),
    /// Failures raised by the execution backend or compiler.
    #[error("backend error: {0}")]
    Backend(ErrorInfo),
    /// Flat result lists that do not divide into the expected groups.
    #[error("partition error: {0}")]
    Partition(ErrorInfo),
    /// Invalid aggregation input.
    #[error("aggregate error: {0}")]
    Aggregate(ErrorInfo),
    /// Circuit text that could not be analysed.
    #[error("circuit error: {0}")]
    Circuit(ErrorInfo),
    /// Decoder failures and unsupported code parameters.
    #[error("decode error: {0}")]
    Decode(ErrorInfo),
    /// Configuration loading and validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// An operator-triggered shutdown interrupted the operation.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
    /// Serialization errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl QorchError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            QorchError::Store(info)
            | QorchError::Transition(info)
            | QorchError::Backend(info)
            | QorchError::Partition(info)
            | QorchError::Aggregate(info)
            | QorchError::Circuit(info)
            | QorchError::Decode(info)
            | QorchError::Config(info)
            | QorchError::Cancelled(info)
            | QorchError::Serde(info) => info,
        }
    }

    /// Shorthand for a backend failure with a code and message.
    pub fn backend(code: &str, message: impl Into<String>) -> Self {
        QorchError::Backend(ErrorInfo::new(code, message))
    }

    /// Shorthand for a decode failure with a code and message.
    pub fn decode(code: &str, message: impl Into<String>) -> Self {
        QorchError::Decode(ErrorInfo::new(code, message))
    }

    /// True when the error came from a lost compare-and-set on batch status.
    pub fn is_stale_transition(&self) -> bool {
        matches!(self, QorchError::Transition(info) if info.code == STALE_TRANSITION)
    }
}

/// Error code used when a status update matched no row in the expected state.
pub const STALE_TRANSITION: &str = "qorch_store.stale_transition";
