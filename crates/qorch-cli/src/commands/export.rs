use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use qorch_core::BatchId;
use qorch_store::{export_metrics_csv, export_metrics_json};

use crate::Context;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file.
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,
    /// Restrict the export to one batch.
    #[arg(long)]
    pub batch: Option<i64>,
}

pub fn run(ctx: &Context, args: &ExportArgs) -> Result<(), Box<dyn Error>> {
    let store = ctx.open_store()?;
    let batch = args.batch.map(BatchId::from_raw);
    match args.format {
        ExportFormat::Csv => export_metrics_csv(&store, batch, &args.out)?,
        ExportFormat::Json => export_metrics_json(&store, batch, &args.out)?,
    }
    println!("wrote {}", args.out.display());
    Ok(())
}
