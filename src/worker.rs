use std::io;
use std::io::Write;
use log::{error, info, warn};
use serde_json::Value;
use crate::config::StructuredMethod;
use crate::manager_crynux::ChatCrynux;
use crate::manager_crynux::structured::StructuredResponse;
use crate::models::Weather;

pub const QUERY: &str = "The weather in Tokyo is 25.5 degrees celsius.";
pub const EXPECTED_CITY: &str = "Tokyo";
pub const EXPECTED_TEMPERATURE: f64 = 25.5;

const TEMPERATURE_TOLERANCE: f64 = 1e-6;

/// Outcome of one structured output check
#[derive(Debug)]
pub enum CheckOutcome {
    Parsed(Weather),
    Mismatch {
        actual: String,
        raw: Value,
    },
    Failed(String),
}

impl CheckOutcome {
    /// Returns true if the outcome is a parsed weather record holding the given city and temperature
    ///
    /// # Arguments
    ///
    /// * 'city' - expected city, compared case-insensitively
    /// * 'temperature' - expected temperature
    pub fn matches(&self, city: &str, temperature: f64) -> bool {
        match self {
            CheckOutcome::Parsed(w) => {
                w.city.trim().eq_ignore_ascii_case(city.trim()) &&
                    (w.temperature - temperature).abs() < TEMPERATURE_TOLERANCE
            },
            _ => false,
        }
    }

    /// Writes the diagnostic report for this outcome
    ///
    /// # Arguments
    ///
    /// * 'out' - where to write the report
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            CheckOutcome::Parsed(w) => {
                writeln!(out, "Response received:")?;
                writeln!(out, "{}", w)?;
                writeln!(out, "Successfully parsed structured output:")?;
                writeln!(out, "City: {}", w.city)?;
                writeln!(out, "Temperature: {:?}", w.temperature)?;
            },
            CheckOutcome::Mismatch { actual, raw } => {
                writeln!(out, "Response received:")?;
                writeln!(out, "{}", raw)?;
                writeln!(out, "Response is not of expected type Weather.")?;
                writeln!(out, "Actual type: {}", actual)?;
            },
            CheckOutcome::Failed(message) => {
                writeln!(out, "An error occurred: {}", message)?;
            },
        }

        Ok(())
    }
}

/// Runs one structured output check. Every failure is caught and returned as an outcome.
///
/// # Arguments
///
/// * 'chat' - configured chat client
/// * 'method' - how the Weather schema is bound to the client
/// * 'query' - prompt to send
pub fn verify(chat: &ChatCrynux, method: StructuredMethod, query: &str) -> CheckOutcome {
    let structured = match chat.with_structured_output::<Weather>(method) {
        Ok(s) => s,
        Err(e) => {
            error!("binding Weather schema failed: {}", e);
            return CheckOutcome::Failed(e.to_string());
        }
    };

    info!("invoking structured output with method {:?}", method);
    match structured.invoke(query) {
        Ok(StructuredResponse::Parsed(weather)) => {
            info!("parsed structured output: {}", weather);
            CheckOutcome::Parsed(weather)
        },
        Ok(StructuredResponse::Unparsed { actual_type, raw }) => {
            warn!("response is not a Weather record but {}", actual_type);
            CheckOutcome::Mismatch { actual: actual_type.to_string(), raw }
        },
        Err(e) => {
            error!("structured output call failed: {}", e);
            CheckOutcome::Failed(e.to_string())
        },
    }
}
