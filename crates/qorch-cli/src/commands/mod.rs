pub mod cycle;
pub mod dispatch;
pub mod export;
pub mod init;
pub mod metrics;
pub mod poll;
pub mod register;
pub mod status;

use std::error::Error;

use serde::Serialize;

/// Prints a report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
