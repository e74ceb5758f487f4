use std::marker::PhantomData;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::config::StructuredMethod;
use crate::manager_crynux::{ChatCrynux, CrynuxError};
use crate::manager_crynux::models::{
    AssistantMessage, ChatMessage, ChatRequest, FunctionDefinition, JsonSchemaSpec,
    ResponseFormat, ToolChoice, ToolChoiceFunction, ToolDefinition,
};

/// Result of a structured invocation
#[derive(Debug)]
pub enum StructuredResponse<T> {
    /// The response decoded into the bound type
    Parsed(T),
    /// The response carried no object, e.g. a bare JSON array or no tool call at all
    Unparsed {
        actual_type: &'static str,
        raw: Value,
    },
}

/// Schema generated for a bound type
pub struct SchemaBinding {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
}

impl SchemaBinding {
    /// Generates the JSON schema for `T` in a form chat endpoints accept, i.e. without the
    /// `$schema` meta field, without number formats on the properties and with additional
    /// properties disallowed on the root object
    pub fn for_type<T: JsonSchema>() -> Result<SchemaBinding, CrynuxError> {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root)?;

        let mut description = None;
        if let Value::Object(map) = &mut schema {
            map.remove("$schema");
            description = map.get("description").and_then(Value::as_str).map(str::to_string);
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }
        }
        strip_property_formats(&mut schema);

        Ok(SchemaBinding {
            name: T::schema_name().into_owned(),
            description,
            schema,
        })
    }
}

/// Chat client wrapper bound to the output type `T`
pub struct StructuredChat<'a, T> {
    chat: &'a ChatCrynux,
    method: StructuredMethod,
    binding: SchemaBinding,
    target: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> StructuredChat<'a, T> {
    pub(super) fn new(chat: &'a ChatCrynux, method: StructuredMethod, binding: SchemaBinding) -> Self {
        Self { chat, method, binding, target: PhantomData }
    }

    /// Sends the query and decodes the answer into `T`
    ///
    /// # Arguments
    ///
    /// * 'query' - natural language prompt
    pub fn invoke(&self, query: &str) -> Result<StructuredResponse<T>, CrynuxError> {
        let request = self.build_request(query);
        let message = self.chat.complete(&request)?;

        if let Some(refusal) = message.refusal {
            return Err(CrynuxError::RefusalError(refusal));
        }

        let Some(payload) = self.extract_payload(message)? else {
            warn!("no call to {} in response", self.binding.name);
            return Ok(StructuredResponse::Unparsed { actual_type: json_type_name(&Value::Null), raw: Value::Null });
        };
        let value: Value = serde_json::from_str(&payload)
            .map_err(|e| CrynuxError::ContentError(format!("response is not JSON ({}): {}", e, payload)))?;

        decode(value, &self.binding.name)
    }

    /// Builds the chat request for the configured binding method
    ///
    /// # Arguments
    ///
    /// * 'query' - natural language prompt
    fn build_request(&self, query: &str) -> ChatRequest {
        let mut request = ChatRequest {
            model: self.chat.model.clone(),
            messages: Vec::new(),
            temperature: self.chat.temperature,
            response_format: None,
            tools: None,
            tool_choice: None,
        };

        match self.method {
            StructuredMethod::JsonSchema => {
                request.response_format = Some(ResponseFormat::JsonSchema {
                    json_schema: JsonSchemaSpec {
                        name: self.binding.name.clone(),
                        description: self.binding.description.clone(),
                        schema: self.binding.schema.clone(),
                        strict: Some(true),
                    },
                });
            },
            StructuredMethod::JsonMode => {
                request.response_format = Some(ResponseFormat::JsonObject);
                request.messages.push(ChatMessage::system(format!(
                    "Respond only with a JSON object named {} that conforms to this JSON schema:\n{}",
                    self.binding.name, self.binding.schema)));
            },
            StructuredMethod::FunctionCalling => {
                request.tools = Some(vec![ToolDefinition {
                    r#type: "function",
                    function: FunctionDefinition {
                        name: self.binding.name.clone(),
                        description: self.binding.description.clone(),
                        parameters: self.binding.schema.clone(),
                    },
                }]);
                request.tool_choice = Some(ToolChoice {
                    r#type: "function",
                    function: ToolChoiceFunction { name: self.binding.name.clone() },
                });
            },
        }

        request.messages.push(ChatMessage::user(query.to_string()));

        request
    }

    /// Returns the JSON text carrying the structured answer, or None if the model made no tool call
    ///
    /// # Arguments
    ///
    /// * 'message' - assistant message from the first choice
    fn extract_payload(&self, message: AssistantMessage) -> Result<Option<String>, CrynuxError> {
        match self.method {
            StructuredMethod::JsonSchema | StructuredMethod::JsonMode => {
                let content = message.content.unwrap_or_default();
                let json = strip_code_fences(&content);
                if json.is_empty() {
                    return Err(CrynuxError::EmptyResponseError("no content in response".to_string()));
                }

                Ok(Some(json.to_string()))
            },
            StructuredMethod::FunctionCalling => {
                let mut calls = message.tool_calls.unwrap_or_default();
                let pos = calls.iter().position(|c| c.function.name == self.binding.name);
                let call = match pos {
                    Some(pos) => calls.swap_remove(pos),
                    None if !calls.is_empty() => {
                        warn!("no call to {}, using {} instead", self.binding.name, calls[0].function.name);
                        calls.swap_remove(0)
                    },
                    None => return Ok(None),
                };
                debug!("tool call id: {:?}", call.id);

                Ok(Some(call.function.arguments))
            },
        }
    }
}

/// Decodes a JSON value into `T`. Only objects are decoded; serde would otherwise read a
/// struct positionally out of an array. An object that fails to decode is an error.
///
/// # Arguments
///
/// * 'value' - JSON value from the response
/// * 'name' - schema name of `T`
fn decode<T: DeserializeOwned>(value: Value, name: &str) -> Result<StructuredResponse<T>, CrynuxError> {
    if !value.is_object() {
        return Ok(StructuredResponse::Unparsed { actual_type: json_type_name(&value), raw: value });
    }

    let parsed = serde_json::from_value::<T>(value.clone())
        .map_err(|e| CrynuxError::ContentError(format!("response is not a valid {} ({}): {}", name, e, value)))?;

    Ok(StructuredResponse::Parsed(parsed))
}

/// Removes `format` annotations (e.g. "double") from property schemas, strict endpoints
/// only accept plain JSON types there
///
/// # Arguments
///
/// * 'schema' - schema to clean up in place
fn strip_property_formats(schema: &mut Value) {
    match schema {
        Value::Object(map) => {
            if let Some(Value::Object(properties)) = map.get_mut("properties") {
                for property in properties.values_mut() {
                    if let Value::Object(p) = property {
                        p.remove("format");
                    }
                }
            }
            map.values_mut().for_each(strip_property_formats);
        },
        Value::Array(items) => items.iter_mut().for_each(strip_property_formats),
        _ => {},
    }
}

/// Returns the JSON type name of a value
///
/// # Arguments
///
/// * 'value' - the value to name
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Removes surrounding whitespace and Markdown code fences, which some models put around
/// JSON even in JSON mode
///
/// # Arguments
///
/// * 'content' - message content
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);

    // Drop an info string such as "json" after the opening fence, with or without a line break
    let body = inner.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    if body.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
        body.trim()
    } else {
        inner.trim()
    }
}
