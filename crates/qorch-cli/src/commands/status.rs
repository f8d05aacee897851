use std::error::Error;

use super::print_json;
use crate::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    let store = ctx.open_store()?;
    print_json(&store.batch_summaries()?)
}
