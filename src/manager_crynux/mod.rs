mod models;
pub mod structured;

use std::time::Duration;
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use thiserror::Error;
use crate::config::{CrynuxParameters, StructuredMethod};
use crate::manager_crynux::models::{AssistantMessage, ChatCompletion, ChatRequest};
use crate::manager_crynux::structured::{SchemaBinding, StructuredChat};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Chat client for the Crynux bridge (or any OpenAI compatible chat completion endpoint)
pub struct ChatCrynux {
    client: Client,
    url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
}

impl ChatCrynux {
    /// Returns a chat client ready for sending completion requests
    ///
    /// # Arguments
    ///
    /// * 'config' - endpoint, model, sampling and timeout parameters
    pub fn new(config: &CrynuxParameters) -> Result<ChatCrynux, CrynuxError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(ChatCrynux {
            client,
            url: format!("{}{}", config.base_url.trim_end_matches('/'), COMPLETIONS_PATH),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    /// Returns a wrapper around this client that coerces all responses into `T`
    ///
    /// # Arguments
    ///
    /// * 'method' - how the schema of `T` is conveyed to the endpoint
    pub fn with_structured_output<T>(&self, method: StructuredMethod) -> Result<StructuredChat<'_, T>, CrynuxError>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let binding = SchemaBinding::for_type::<T>()?;

        Ok(StructuredChat::new(self, method, binding))
    }

    /// Sends a chat completion request and returns the message of the first choice
    ///
    /// # Arguments
    ///
    /// * 'request' - the request to send
    fn complete(&self, request: &ChatRequest) -> Result<AssistantMessage, CrynuxError> {
        let body = serde_json::to_string(request)?;
        debug!("posting chat completion to {} for model {}", self.url, self.model);

        let mut req = self.client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(CrynuxError::StatusError { status, body: text });
        }

        let completion: ChatCompletion = serde_json::from_str(&text)?;
        debug!("completion id: {:?}, model: {:?}, created: {:?}",
            completion.id, completion.model, completion.created);
        if let Some(usage) = &completion.usage {
            debug!("tokens prompt: {:?}, completion: {:?}, total: {:?}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
        }

        let choice = completion.choices
            .into_iter()
            .next()
            .ok_or(CrynuxError::EmptyResponseError("no choices in completion".to_string()))?;
        debug!("finish reason: {:?}", choice.finish_reason);

        Ok(choice.message)
    }
}

/// Error depicting errors that occur while talking to the chat endpoint
///
#[derive(Error, Debug)]
pub enum CrynuxError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("StatusError: {status}: {body}")]
    StatusError { status: StatusCode, body: String },
    #[error("DocumentError: {0}")]
    DocumentError(#[from] serde_json::Error),
    #[error("EmptyResponseError: {0}")]
    EmptyResponseError(String),
    #[error("RefusalError: {0}")]
    RefusalError(String),
    #[error("ContentError: {0}")]
    ContentError(String),
}
