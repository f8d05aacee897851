use std::error::Error;

use qorch_exec::MetricsStage;

use super::print_json;
use crate::capabilities::{NoDecoder, PassthroughCompiler};
use crate::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let store = ctx.open_store()?;
    let stage = MetricsStage::new(&ctx.config, &PassthroughCompiler, &NoDecoder);
    let report = stage.run(&store)?;
    print_json(&report)
}
