//! File-backed job runner.
//!
//! `submit` writes `<spool>/<handle>/submission.json` and a `status` file reading
//! `pending`. Whoever executes the job rewrites `status` (`pending`, `done`, `errored`,
//! `cancelled`) and, once done, writes `results.json` holding one run outcome per
//! submitted circuit in submission order.
//!
//! Local-mode circuits are looked up in `<spool>/local/<digest>.json`, keyed by the
//! SHA-256 of the circuit text and noise level.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{JobHandle, JobRunner, JobState, LocalExecutor, RunOutcome};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

const SUBMISSION_FILE: &str = "submission.json";
const STATUS_FILE: &str = "status";
const RESULTS_FILE: &str = "results.json";
const LOCAL_DIR: &str = "local";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub handle: String,
    pub shots: u32,
    pub circuits: Vec<String>,
    pub submitted_at: String,
}

pub struct SpoolRunner {
    root: PathBuf,
}

fn spool_error(code: &str, err: impl ToString, path: &Path) -> QorchError {
    QorchError::Backend(ErrorInfo::new(code, err.to_string()).with_context("path", path.display()))
}

impl SpoolRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn job_dir(&self, handle: &JobHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }

    /// Cache path for a local-mode result.
    pub fn local_result_path(&self, circuit: &str, noise_level: Option<f64>) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(circuit.as_bytes());
        hasher.update(format!("{noise_level:?}").as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.root.join(LOCAL_DIR).join(format!("{digest}.json"))
    }
}

impl JobRunner for SpoolRunner {
    fn submit(&self, circuits: &[String], shots: u32) -> Result<JobHandle, QorchError> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        for circuit in circuits {
            hasher.update(circuit.as_bytes());
        }
        hasher.update(shots.to_le_bytes());
        hasher.update(nanos.to_le_bytes());
        let handle = JobHandle::new(&hex::encode(hasher.finalize())[..16]);
        let dir = self.job_dir(&handle);
        fs::create_dir_all(&dir).map_err(|err| spool_error("qorch_cli.spool_write", err, &dir))?;
        let submission = Submission {
            handle: handle.to_string(),
            shots,
            circuits: circuits.to_vec(),
            submitted_at: Utc::now().to_rfc3339(),
        };
        let path = dir.join(SUBMISSION_FILE);
        let bytes = serde_json::to_vec_pretty(&submission)
            .map_err(|err| spool_error("qorch_cli.spool_write", err, &path))?;
        fs::write(&path, bytes).map_err(|err| spool_error("qorch_cli.spool_write", err, &path))?;
        let status = dir.join(STATUS_FILE);
        fs::write(&status, "pending\n")
            .map_err(|err| spool_error("qorch_cli.spool_write", err, &status))?;
        debug!(handle = %handle, circuits = circuits.len(), "submission spooled");
        Ok(handle)
    }

    fn status(&self, handle: &JobHandle) -> Result<JobState, QorchError> {
        let path = self.job_dir(handle).join(STATUS_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|err| spool_error("qorch_cli.spool_status", err, &path))?;
        match text.trim() {
            "pending" | "queued" | "running" => Ok(JobState::Pending),
            "done" => Ok(JobState::Done),
            "errored" | "error" => Ok(JobState::Errored),
            "cancelled" => Ok(JobState::Cancelled),
            other => Err(spool_error(
                "qorch_cli.spool_status",
                format!("unknown job status {other:?}"),
                &path,
            )),
        }
    }

    fn fetch_results(&self, handle: &JobHandle) -> Result<Vec<RunOutcome>, QorchError> {
        let path = self.job_dir(handle).join(RESULTS_FILE);
        let bytes =
            fs::read(&path).map_err(|err| spool_error("qorch_cli.spool_results", err, &path))?;
        serde_json::from_slice(&bytes).map_err(|err| spool_error("qorch_cli.spool_results", err, &path))
    }
}

impl LocalExecutor for SpoolRunner {
    fn execute(
        &self,
        circuit: &str,
        _shots: u32,
        noise_level: Option<f64>,
    ) -> Result<RunOutcome, QorchError> {
        let path = self.local_result_path(circuit, noise_level);
        let bytes =
            fs::read(&path).map_err(|err| spool_error("qorch_cli.local_missing", err, &path))?;
        serde_json::from_slice(&bytes).map_err(|err| spool_error("qorch_cli.local_results", err, &path))
    }
}
