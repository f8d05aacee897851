use std::error::Error;

use qorch_exec::{Dispatcher, ShutdownSignal};

use super::print_json;
use crate::spool::SpoolRunner;
use crate::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let store = ctx.open_store()?;
    let runner = SpoolRunner::new(&ctx.config.spool);
    let signal = ShutdownSignal::new();
    let dispatcher = Dispatcher::new(&ctx.config, &runner, &signal);
    let report = dispatcher.dispatch_pending(&store)?;
    print_json(&report)
}
