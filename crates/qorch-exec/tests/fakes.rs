#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use qorch_core::{
    Basis, CompiledCircuit, Compiler, DecodeOutcome, Decoder, Distribution, ExecutionMode,
    JobHandle, JobRunner, JobState, LocalExecutor, NewBatch, NewVariant, OutcomeCounts,
    QorchError, RunOutcome,
};
use qorch_exec::Pause;

pub const BELL: &str = "OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nh q[0];\ncx q[0],q[1];\nmeasure q[0] -> c[0];\nmeasure q[1] -> c[1];\n";

pub fn counts(entries: &[(&str, u64)]) -> OutcomeCounts {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn new_batch(mode: ExecutionMode, shots: u32, runs: u32) -> NewBatch {
    NewBatch {
        user: "tester".into(),
        backend: "fake".into(),
        mode,
        shots,
        runs,
    }
}

pub fn new_variant(name: &str, circuit: &str) -> NewVariant {
    NewVariant {
        circuit_name: name.into(),
        circuit: circuit.into(),
        technique: "passthrough".into(),
        noise_level: None,
        mapping: vec![0, 1],
        compile_seconds: 0.0,
    }
}

/// Scripted job runner: queued submit results, a fixed status and fixed outcomes.
#[derive(Default)]
pub struct FakeRunner {
    pub submit_script: Mutex<VecDeque<Result<JobHandle, QorchError>>>,
    pub submissions: Mutex<Vec<Vec<String>>>,
    pub submit_calls: Mutex<u32>,
    pub state: Mutex<Option<JobState>>,
    pub outcomes: Mutex<Vec<RunOutcome>>,
}

impl FakeRunner {
    pub fn accepting(handle: &str) -> Self {
        let runner = Self::default();
        runner
            .submit_script
            .lock()
            .push_back(Ok(JobHandle::new(handle)));
        runner
    }

    pub fn finished(state: JobState, outcomes: Vec<RunOutcome>) -> Self {
        let runner = Self::default();
        *runner.state.lock() = Some(state);
        *runner.outcomes.lock() = outcomes;
        runner
    }
}

impl JobRunner for FakeRunner {
    fn submit(&self, circuits: &[String], _shots: u32) -> Result<JobHandle, QorchError> {
        *self.submit_calls.lock() += 1;
        self.submissions.lock().push(circuits.to_vec());
        self.submit_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(QorchError::backend("fake.unavailable", "no scripted reply")))
    }

    fn status(&self, _handle: &JobHandle) -> Result<JobState, QorchError> {
        Ok((*self.state.lock()).unwrap_or(JobState::Pending))
    }

    fn fetch_results(&self, _handle: &JobHandle) -> Result<Vec<RunOutcome>, QorchError> {
        Ok(self.outcomes.lock().clone())
    }
}

/// Records every pause and never cancels unless told to.
#[derive(Default)]
pub struct CountingPause {
    pub calls: Mutex<Vec<Duration>>,
    pub cancel: bool,
}

impl Pause for CountingPause {
    fn pause(&self, duration: Duration) -> bool {
        self.calls.lock().push(duration);
        self.cancel
    }
}

/// Local executor returning fixed counts, failing for circuits containing `fail`.
pub struct FakeExecutor {
    pub counts: OutcomeCounts,
}

impl LocalExecutor for FakeExecutor {
    fn execute(
        &self,
        circuit: &str,
        _shots: u32,
        _noise_level: Option<f64>,
    ) -> Result<RunOutcome, QorchError> {
        if circuit.contains("fail") {
            return Err(QorchError::backend("fake.simulator", "simulator crashed"));
        }
        Ok(RunOutcome::from_counts(self.counts.clone()))
    }
}

pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(
        &self,
        circuit: &str,
        _target: &str,
        technique: &str,
        _noise_level: Option<f64>,
    ) -> Result<CompiledCircuit, QorchError> {
        if technique == "broken" {
            return Err(QorchError::backend("fake.compile", "technique unavailable"));
        }
        Ok(CompiledCircuit {
            circuit: circuit.to_string(),
            mapping: vec![0, 1],
            duration_seconds: 0.5,
        })
    }
}

/// Decoder that accepts everything, or fails every call.
pub struct FakeDecoder {
    pub fail: bool,
    pub seen: Mutex<Vec<BTreeMap<String, u64>>>,
    pub scored: Mutex<Vec<Distribution>>,
}

impl FakeDecoder {
    pub fn new(fail: bool) -> Self {
        Self {
            fail,
            seen: Mutex::new(Vec::new()),
            scored: Mutex::new(Vec::new()),
        }
    }
}

impl Decoder for FakeDecoder {
    fn decode(
        &self,
        _n: u32,
        _basis: Basis,
        counts: &OutcomeCounts,
    ) -> Result<DecodeOutcome, QorchError> {
        if self.fail {
            return Err(QorchError::decode("fake.decode", "decoder rejected input"));
        }
        self.seen.lock().push(counts.clone());
        let accepted = counts.values().sum();
        Ok(DecodeOutcome {
            accepted,
            logical_errors: 0,
            undecided: 0,
            success_rate: 1.0,
            detection_seconds: 0.1,
            decoding_seconds: 0.2,
        })
    }

    fn score(&self, _n: u32, _basis: Basis, distribution: &Distribution) -> Result<f64, QorchError> {
        if self.fail {
            return Err(QorchError::decode("fake.score", "decoder rejected input"));
        }
        self.scored.lock().push(distribution.clone());
        Ok(0.5)
    }
}
