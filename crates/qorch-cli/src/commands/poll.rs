use std::error::Error;

use clap::Args;
use qorch_core::JobHandle;
use qorch_exec::PollingEngine;

use super::print_json;
use crate::spool::SpoolRunner;
use crate::Context;

#[derive(Args, Debug)]
pub struct PollArgs {
    /// Only poll batches submitted under this handle.
    #[arg(long)]
    pub handle: Option<String>,
}

pub fn run(ctx: &Context, args: &PollArgs) -> Result<(), Box<dyn Error>> {
    let mut store = ctx.open_store()?;
    let runner = SpoolRunner::new(&ctx.config.spool);
    let engine = PollingEngine::new(&ctx.config, &runner, &runner);
    let report = match &args.handle {
        Some(handle) => engine.poll_handle(&mut store, &JobHandle::new(handle.as_str()))?,
        None => engine.poll_pending(&mut store)?,
    };
    print_json(&report)
}
