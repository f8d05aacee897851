use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use qorch_core::{ExecutionMode, NewBatch};
use qorch_exec::{register_batch, RegistrationPlan, SourceCircuit};

use super::print_json;
use crate::capabilities::PassthroughCompiler;
use crate::Context;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Directory searched for `*.qasm` files.
    #[arg(long)]
    pub circuits: PathBuf,
    /// Compilation techniques, applied to every circuit.
    #[arg(long = "technique", default_value = "passthrough")]
    pub techniques: Vec<String>,
    /// Noise levels; omit for a single noiseless variant.
    #[arg(long = "noise")]
    pub noise_levels: Vec<f64>,
    /// Target backend name.
    #[arg(long)]
    pub backend: Option<String>,
    /// Run through the local simulator path instead of the job runner.
    #[arg(long)]
    pub local: bool,
    #[arg(long)]
    pub shots: Option<u32>,
    /// Repeated runs per variant.
    #[arg(long)]
    pub runs: Option<u32>,
    #[arg(long)]
    pub user: Option<String>,
}

fn load_circuits(dir: &Path) -> Result<Vec<SourceCircuit>, Box<dyn Error>> {
    let pattern = dir.join("*.qasm");
    let pattern = pattern.to_str().ok_or("circuit directory is not valid UTF-8")?;
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.collect::<Result<_, _>>()?;
    paths.sort();
    let mut circuits = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or("circuit file name is not valid UTF-8")?
            .to_string();
        circuits.push(SourceCircuit {
            name,
            source: fs::read_to_string(&path)?,
        });
    }
    Ok(circuits)
}

pub fn run(ctx: &Context, args: &RegisterArgs) -> Result<(), Box<dyn Error>> {
    let circuits = load_circuits(&args.circuits)?;
    if circuits.is_empty() {
        return Err(format!("no .qasm files under {}", args.circuits.display()).into());
    }
    let defaults = &ctx.config.defaults;
    let plan = RegistrationPlan {
        batch: NewBatch {
            user: args.user.clone().unwrap_or_else(|| defaults.user.clone()),
            backend: args.backend.clone().unwrap_or_else(|| defaults.backend.clone()),
            mode: if args.local {
                ExecutionMode::Local
            } else {
                defaults.mode
            },
            shots: args.shots.unwrap_or(defaults.shots),
            runs: args.runs.unwrap_or(defaults.runs),
        },
        circuits,
        techniques: args.techniques.clone(),
        noise_levels: args.noise_levels.iter().copied().map(Some).collect(),
    };
    if plan.batch.shots == 0 || plan.batch.runs == 0 {
        return Err("shots and runs must be positive".into());
    }
    let mut store = ctx.open_store()?;
    let registration = register_batch(&mut store, &PassthroughCompiler, &plan)?;
    print_json(&registration)
}
