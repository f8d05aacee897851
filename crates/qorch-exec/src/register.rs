use qorch_core::errors::{ErrorInfo, QorchError};
use qorch_core::{BatchId, Compiler, NewBatch, NewVariant};
use qorch_store::Store;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A named source circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCircuit {
    pub name: String,
    pub source: String,
}

/// Everything needed to compile and register one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPlan {
    pub batch: NewBatch,
    pub circuits: Vec<SourceCircuit>,
    pub techniques: Vec<String>,
    /// Empty means a single noiseless variant per circuit and technique.
    #[serde(default)]
    pub noise_levels: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub batch_id: BatchId,
    pub variants: usize,
    pub skipped: Vec<(String, QorchError)>,
}

/// Compiles circuit x technique x noise level in that order and inserts the batch with
/// every variant that compiled. Nothing is written when no variant survives.
pub fn register_batch(
    store: &mut Store,
    compiler: &dyn Compiler,
    plan: &RegistrationPlan,
) -> Result<Registration, QorchError> {
    let noise_levels = if plan.noise_levels.is_empty() {
        vec![None]
    } else {
        plan.noise_levels.clone()
    };
    let mut variants = Vec::new();
    let mut skipped = Vec::new();
    for circuit in &plan.circuits {
        for technique in &plan.techniques {
            for noise_level in &noise_levels {
                match compiler.compile(&circuit.source, &plan.batch.backend, technique, *noise_level) {
                    Ok(compiled) => variants.push(NewVariant {
                        circuit_name: circuit.name.clone(),
                        circuit: compiled.circuit,
                        technique: technique.clone(),
                        noise_level: *noise_level,
                        mapping: compiled.mapping,
                        compile_seconds: compiled.duration_seconds,
                    }),
                    Err(err) => {
                        warn!(
                            circuit = %circuit.name,
                            technique = %technique,
                            noise_level = ?noise_level,
                            error = %err,
                            "compilation failed, variant skipped"
                        );
                        skipped.push((circuit.name.clone(), err));
                    }
                }
            }
        }
    }
    if variants.is_empty() {
        return Err(QorchError::Circuit(
            ErrorInfo::new("qorch_exec.no_variants", "no variant compiled for this plan")
                .with_context("circuits", plan.circuits.len())
                .with_context("techniques", plan.techniques.len())
                .with_hint("check the compiler output for each circuit"),
        ));
    }
    let batch_id = store.insert_batch(&plan.batch, &variants)?;
    info!(
        batch_id = batch_id.as_raw(),
        variants = variants.len(),
        skipped = skipped.len(),
        "batch registered"
    );
    Ok(Registration {
        batch_id,
        variants: variants.len(),
        skipped,
    })
}
