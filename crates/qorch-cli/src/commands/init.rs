use std::error::Error;

use tracing::info;

use crate::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn Error>> {
    ctx.open_store()?;
    std::fs::create_dir_all(&ctx.config.spool)?;
    info!(store = %ctx.config.store.display(), "store ready");
    println!("initialised {}", ctx.config.store.display());
    Ok(())
}
