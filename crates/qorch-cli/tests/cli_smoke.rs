use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

const BELL: &str = "OPENQASM 2.0;
include \"qelib1.inc\";
qreg q[2];
creg c[2];
h q[0];
cx q[0],q[1];
measure q[0] -> c[0];
measure q[1] -> c[1];
";

fn qorch(root: &Path, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_qorch"))
        .arg("--store")
        .arg(root.join("qorch.sqlite"))
        .arg("--spool")
        .arg(root.join("spool"))
        .args(args)
        .output()
        .expect("run qorch");
    assert!(
        output.status.success(),
        "qorch {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn spooled_batch_reaches_done() {
    let root = tempdir().expect("root");
    let circuits = root.path().join("circuits");
    fs::create_dir_all(&circuits).expect("circuits");
    fs::write(circuits.join("bell.qasm"), BELL).expect("write circuit");

    qorch(root.path(), &["init"]);
    let registered = json(&qorch(
        root.path(),
        &["register", "--circuits", circuits.to_str().expect("utf8"), "--shots", "1000", "--runs", "2"],
    ));
    assert_eq!(registered["variants"], 1);

    let dispatched = json(&qorch(root.path(), &["dispatch"]));
    let handle = dispatched["dispatched"][0][1]
        .as_str()
        .expect("handle")
        .to_string();
    let job = root.path().join("spool").join(&handle);
    let submission: Value =
        serde_json::from_slice(&fs::read(job.join("submission.json")).expect("submission"))
            .expect("parse submission");
    assert_eq!(submission["circuits"].as_array().expect("circuits").len(), 2);

    let pending = json(&qorch(root.path(), &["poll", "--handle", &handle]));
    assert_eq!(pending["outcomes"][0][1]["outcome"], "still_pending");

    fs::write(job.join("status"), "done\n").expect("status");
    fs::write(
        job.join("results.json"),
        r#"[{"counts":{"00":900,"11":100}},{"counts":{"00":700,"11":300}}]"#,
    )
    .expect("results");
    let polled = json(&qorch(root.path(), &["poll"]));
    assert_eq!(polled["outcomes"][0][1]["outcome"], "executed");

    let metrics = json(&qorch(root.path(), &["metrics"]));
    assert_eq!(metrics["written"], 1);

    let status = json(&qorch(root.path(), &["status"]));
    assert_eq!(status[0]["status"], "done");
    assert_eq!(status[0]["metrics"], 1);

    let out = root.path().join("metrics.json");
    qorch(
        root.path(),
        &["export", "--format", "json", "--out", out.to_str().expect("utf8")],
    );
    let rows: Value = serde_json::from_slice(&fs::read(&out).expect("export")).expect("rows");
    assert_eq!(rows[0]["circuit_name"], "bell");
    assert_eq!(rows[0]["two_qubit_gates"], 1);
}
