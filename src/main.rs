use std::io;
use anyhow::Result;
use log::{info, warn};
use crate::initialization::init;
use crate::worker::{verify, EXPECTED_CITY, EXPECTED_TEMPERATURE, QUERY};

mod config;
mod initialization;
mod logging;
mod manager_crynux;
pub mod models;
mod worker;
#[cfg(test)]
mod test_support;

fn main() -> Result<()> {
    // Only startup problems end the process with an error, the check itself always terminates normally
    let (config, chat) = init()?;

    println!("Testing ChatCrynux structured output...");
    println!("Invoking with query: '{}'", QUERY);

    let outcome = verify(&chat, config.crynux.method, QUERY);
    outcome.report(&mut io::stdout().lock())?;

    if outcome.matches(EXPECTED_CITY, EXPECTED_TEMPERATURE) {
        info!("check passed: {} at {} degrees", EXPECTED_CITY, EXPECTED_TEMPERATURE);
    } else {
        warn!("check did not yield {} at {} degrees", EXPECTED_CITY, EXPECTED_TEMPERATURE);
    }

    Ok(())
}
