use std::io;
use std::io::Write;
use log::{info, warn};
use thiserror::Error;
use crate::config::{load_config, Config, LoadConfigurationError, ENV_API_KEY};
use crate::logging::{setup_logger, LoggerError};
use crate::manager_crynux::{ChatCrynux, CrynuxError};

/// Initializes and returns configuration and a chat client ready for the check
///
pub fn init() -> Result<(Config, ChatCrynux), InitializationError> {
    // Load configuration
    let config = load_config()?;

    // Setup logging
    let _ = setup_logger(config.general.log_path.as_deref(), config.general.log_level, config.general.log_to_console)?;

    // Print version
    info!("starting crynux structured output check version: {}", env!("CARGO_PKG_VERSION"));

    report_missing_api_key(config.crynux.api_key.as_deref(), &mut io::stdout().lock())?;

    info!("endpoint: {}, model: {}, temperature: {}, timeout: {}s",
        config.crynux.base_url, config.crynux.model, config.crynux.temperature, config.crynux.timeout_secs);

    let chat = ChatCrynux::new(&config.crynux)?;

    Ok((config, chat))
}

/// Prints a notice if no API key is present in the environment. Only presence is checked,
/// an empty key is present but leads to requests without authorization.
/// Returns true if the notice was printed.
///
/// # Arguments
///
/// * 'api_key' - the API key as read from the environment
/// * 'out' - where to print the notice
fn report_missing_api_key<W: Write>(api_key: Option<&str>, out: &mut W) -> io::Result<bool> {
    match api_key {
        Some(key) => {
            if key.is_empty() {
                warn!("{} is empty, requests are sent without authorization", ENV_API_KEY);
            }
            Ok(false)
        },
        None => {
            writeln!(out, "{} not found in environment.", ENV_API_KEY)?;
            warn!("{} not set, requests are sent without authorization", ENV_API_KEY);
            Ok(true)
        },
    }
}

/// Error depicting errors that occur while initializing the check
///
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("ConfigurationError: {0}")]
    ConfigurationError(#[from] LoadConfigurationError),
    #[error("SetupLoggerError: {0}")]
    SetupLoggerError(#[from] LoggerError),
    #[error("ClientSetupError: {0}")]
    ClientSetupError(#[from] CrynuxError),
    #[error("OutputError: {0}")]
    OutputError(#[from] io::Error),
}
