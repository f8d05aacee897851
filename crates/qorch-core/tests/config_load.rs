use std::fs;

use qorch_core::{DecodeFailurePolicy, ExecutionMode, KeyFormat, OrchestratorConfig};
use tempfile::tempdir;

#[test]
fn empty_document_uses_defaults() {
    let config: OrchestratorConfig = serde_yaml::from_str("{}").expect("parse");
    assert_eq!(config, OrchestratorConfig::default());
    assert_eq!(config.retry.cool_down_secs, 30);
    assert_eq!(config.keys, KeyFormat::Binary);
    assert_eq!(config.metrics.decode_failure, DecodeFailurePolicy::Complete);
}

#[test]
fn load_reads_overrides() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("qorch.yaml");
    fs::write(
        &path,
        "store: runs.sqlite\nretry:\n  cool_down_secs: 5\nkeys: integer\nmetrics:\n  decode_failure: hold-executed\ndefaults:\n  backend: ibm_brisbane\n  mode: local\n  shots: 1000\n  runs: 4\n",
    )
    .expect("write");
    let config = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(config.store.to_str(), Some("runs.sqlite"));
    assert_eq!(config.retry.cool_down().as_secs(), 5);
    assert_eq!(config.keys, KeyFormat::Integer);
    assert_eq!(config.metrics.decode_failure, DecodeFailurePolicy::HoldExecuted);
    assert_eq!(config.defaults.mode, ExecutionMode::Local);
    assert_eq!(config.defaults.runs, 4);
    assert_eq!(config.defaults.user, "operator");
}

#[test]
fn load_rejects_zero_runs() {
    let dir = tempdir().expect("dir");
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "defaults:\n  runs: 0\n").expect("write");
    let err = OrchestratorConfig::load(&path).expect_err("zero runs");
    assert_eq!(err.info().code, "qorch_core.config_runs");
}

#[test]
fn load_reports_missing_file() {
    let dir = tempdir().expect("dir");
    let err = OrchestratorConfig::load(&dir.path().join("absent.yaml")).expect_err("missing");
    assert_eq!(err.info().code, "qorch_core.config_read");
}
