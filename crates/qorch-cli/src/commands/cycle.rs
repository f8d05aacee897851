use std::error::Error;

use qorch_exec::{run_cycle, Dispatcher, MetricsStage, PollingEngine, ShutdownSignal};

use super::print_json;
use crate::capabilities::{NoDecoder, PassthroughCompiler};
use crate::spool::SpoolRunner;
use crate::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let mut store = ctx.open_store()?;
    let runner = SpoolRunner::new(&ctx.config.spool);
    let signal = ShutdownSignal::new();
    let dispatcher = Dispatcher::new(&ctx.config, &runner, &signal);
    let poller = PollingEngine::new(&ctx.config, &runner, &runner);
    let metrics = MetricsStage::new(&ctx.config, &PassthroughCompiler, &NoDecoder);
    let report = run_cycle(&mut store, &dispatcher, &poller, &metrics)?;
    print_json(&report)
}
