use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qorch_core::OrchestratorConfig;
use qorch_store::Store;
use tracing_subscriber::EnvFilter;

mod capabilities;
mod commands;
mod spool;

use commands::{
    cycle, dispatch,
    export::{self, ExportArgs},
    init, metrics,
    poll::{self, PollArgs},
    register::{self, RegisterArgs},
    status,
};

#[derive(Parser, Debug)]
#[command(name = "qorch", about = "Experiment batch orchestrator")]
struct Cli {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite store path, overriding the configuration.
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Spool directory, overriding the configuration.
    #[arg(long, global = true)]
    spool: Option<PathBuf>,
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store and its schema.
    Init,
    /// Compile circuits from a directory and register them as one batch.
    Register(RegisterArgs),
    /// Submit every batch awaiting submission.
    Dispatch,
    /// Check pending batches and retrieve finished results.
    Poll(PollArgs),
    /// Compute metrics for executed batches.
    Metrics,
    /// Dispatch, poll and compute metrics in one pass.
    Cycle,
    /// Print a JSON summary of every batch.
    Status,
    /// Export metric rows as CSV or JSON.
    Export(ExportArgs),
}

/// Settings and handles shared by every subcommand.
pub struct Context {
    pub config: OrchestratorConfig,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let mut config = match &cli.config {
            Some(path) => OrchestratorConfig::load(path)?,
            None => OrchestratorConfig::default(),
        };
        if let Some(store) = &cli.store {
            config.store = store.clone();
        }
        if let Some(spool) = &cli.spool {
            config.spool = spool.clone();
        }
        Ok(Self { config })
    }

    pub fn open_store(&self) -> Result<Store, Box<dyn Error>> {
        if let Some(parent) = self.config.store.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Store::open(&self.config.store)?)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "qorch=debug" } else { "qorch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ctx = Context::load(&cli)?;
    match &cli.command {
        Command::Init => init::run(&ctx),
        Command::Register(args) => register::run(&ctx, args),
        Command::Dispatch => dispatch::run(&ctx),
        Command::Poll(args) => poll::run(&ctx, args),
        Command::Metrics => metrics::run(&ctx),
        Command::Cycle => cycle::run(&ctx),
        Command::Status => status::run(&ctx),
        Command::Export(args) => export::run(&ctx, args),
    }
}
