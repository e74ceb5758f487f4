use std::{env, fs};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://bridge.crynux-as.xyz/v1/llm";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

const ENV_CONFIG: &str = "CRYNUX_CONFIG";
const ENV_BASE_URL: &str = "CRYNUX_BASE_URL";
const ENV_MODEL: &str = "CRYNUX_MODEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// How the target schema is conveyed to the chat endpoint
///
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StructuredMethod {
    #[default]
    JsonSchema,
    JsonMode,
    FunctionCalling,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct CrynuxParameters {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub method: StructuredMethod,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CrynuxParameters {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout_secs: 60,
            method: StructuredMethod::default(),
            api_key: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct General {
    pub log_path: Option<String>,
    pub log_level: LevelFilter,
    pub log_to_console: bool,
}

impl Default for General {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LevelFilter::Info,
            log_to_console: true,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub crynux: CrynuxParameters,
}

/// Loads configuration and returns a struct with all configuration items.
/// Defaults are overridden by the optional TOML file named in CRYNUX_CONFIG,
/// which in turn is overridden by the CRYNUX_* environment variables.
///
pub fn load_config() -> Result<Config, LoadConfigurationError> {
    let mut config = match env::var(ENV_CONFIG) {
        Ok(path) => load_config_file(&path)?,
        Err(_) => Config::default(),
    };

    apply_env(&mut config, |key| env::var(key).ok());

    Ok(config)
}

/// Loads the configuration file
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
fn load_config_file(config_path: &str) -> Result<Config, LoadConfigurationError> {
    let toml = fs::read_to_string(config_path)
        .map_err(|e| LoadConfigurationError::FileError(format!("{}: {}", config_path, e)))?;

    parse_config(&toml)
}

/// Parses a TOML configuration document
///
/// # Arguments
///
/// * 'toml' - the configuration document
fn parse_config(toml: &str) -> Result<Config, LoadConfigurationError> {
    let config: Config = toml::from_str(toml)?;

    Ok(config)
}

/// Overlays environment values on top of the given configuration
///
/// # Arguments
///
/// * 'config' - configuration to update
/// * 'lookup' - resolves an environment variable name to its value, if set
fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base_url) = lookup(ENV_BASE_URL) {
        config.crynux.base_url = base_url;
    }
    if let Some(model) = lookup(ENV_MODEL) {
        config.crynux.model = model;
    }
    config.crynux.api_key = lookup(ENV_API_KEY);
}

/// Error depicting errors that occur while loading configuration
///
#[derive(Debug, Error)]
pub enum LoadConfigurationError {
    #[error("FileError: {0}")]
    FileError(String),
    #[error("ParseError: {0}")]
    ParseError(#[from] toml::de::Error),
}
