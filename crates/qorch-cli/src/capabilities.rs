use std::time::Instant;

use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{
    Basis, CompiledCircuit, Compiler, DecodeOutcome, Decoder, Distribution, OutcomeCounts,
};
use qorch_exec::measure_mapping;

/// Registers circuits unchanged. The layout is read from the measurement lines.
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(
        &self,
        circuit: &str,
        _target: &str,
        technique: &str,
        _noise_level: Option<f64>,
    ) -> Result<CompiledCircuit, QorchError> {
        if technique != "passthrough" {
            return Err(QorchError::Backend(
                ErrorInfo::new("qorch_cli.unknown_technique", "technique not available")
                    .with_context("technique", technique)
                    .with_hint("only `passthrough` is built in"),
            ));
        }
        let start = Instant::now();
        let mapping = measure_mapping(circuit).into_values().collect();
        Ok(CompiledCircuit {
            circuit: circuit.to_string(),
            mapping,
            duration_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

/// Stands in when no decoder is installed; every decode is recorded as failed.
pub struct NoDecoder;

fn unavailable() -> QorchError {
    QorchError::decode("qorch_cli.no_decoder", "no decoder is configured")
}

impl Decoder for NoDecoder {
    fn decode(
        &self,
        _n: u32,
        _basis: Basis,
        _counts: &OutcomeCounts,
    ) -> Result<DecodeOutcome, QorchError> {
        Err(unavailable())
    }

    fn score(
        &self,
        _n: u32,
        _basis: Basis,
        _distribution: &Distribution,
    ) -> Result<f64, QorchError> {
        Err(unavailable())
    }
}
