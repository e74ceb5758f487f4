use log::{LevelFilter, SetLoggerError};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::config::runtime::ConfigErrors;
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use thiserror::Error;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}";

/// Sets up the logger. Console output goes to stderr so it never mixes with the check report.
///
/// # Arguments
///
/// * 'log_path' - optional path to a log file
/// * 'log_level' - the maximum level to log
/// * 'log_to_console' - whether to also log to stderr
pub fn setup_logger(log_path: Option<&str>, log_level: LevelFilter, log_to_console: bool) -> Result<Handle, LoggerError> {
    let config = build_config(log_path, log_level, log_to_console)?;
    let handle = log4rs::init_config(config)?;

    Ok(handle)
}

/// Builds the log4rs configuration
///
/// # Arguments
///
/// * 'log_path' - optional path to a log file
/// * 'log_level' - the maximum level to log
/// * 'log_to_console' - whether to also log to stderr
fn build_config(log_path: Option<&str>, log_level: LevelFilter, log_to_console: bool) -> Result<Config, LoggerError> {
    let mut builder = Config::builder();
    let mut root = Root::builder();

    if log_to_console {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();

        builder = builder.appender(Appender::builder().build("stderr", Box::new(stderr)));
        root = root.appender("stderr");
    }

    if let Some(path) = log_path {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(path)
            .map_err(|e| LoggerError::FileError(format!("{}: {}", path, e)))?;

        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    let config = builder.build(root.build(log_level))?;

    Ok(config)
}

/// Error depicting errors that occur while setting up the logger
///
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("FileError: {0}")]
    FileError(String),
    #[error("ConfigError: {0}")]
    ConfigError(#[from] ConfigErrors),
    #[error("SetLoggerError: {0}")]
    SetLoggerError(#[from] SetLoggerError),
}
