#![allow(dead_code)]

use qorch_core::{ExecutionMode, NewBatch, NewVariant};

pub fn batch(mode: ExecutionMode, runs: u32) -> NewBatch {
    NewBatch {
        user: "tester".into(),
        backend: "fake_backend".into(),
        mode,
        shots: 100,
        runs,
    }
}

pub fn variant(name: &str) -> NewVariant {
    NewVariant {
        circuit_name: name.into(),
        circuit: "OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\ncx q[0],q[1];\nmeasure q[0] -> c[0];\nmeasure q[1] -> c[1];\n".into(),
        technique: "passthrough".into(),
        noise_level: None,
        mapping: vec![0, 1],
        compile_seconds: 0.01,
    }
}
