use serde::Serialize;
use serde_json::{Map, Value};

use super::options::{GenerationSettings, ReasoningConfig};
use super::prompt::build_user_content;
use super::schema::{normalize_response_format, ResponseFormat};
use super::types::ReasoningEffort;
use super::CodingError;

/// Model name prefixes of reasoning-capable families that get a default effort.
pub const REASONING_MODEL_PREFIXES: &[&str] = &["gpt-5"];

/// One content part of an input message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// One conversation turn in Responses-API input form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputMessage {
    pub role: String,
    pub content: Vec<InputContent>,
}

impl InputMessage {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: "user".into(),
            content: vec![InputContent {
                kind: "input_text".into(),
                text: text.to_string(),
            }],
        }
    }
}

/// The `text` block: response format and nested output limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
}

impl TextConfig {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.max_output_tokens.is_none()
    }
}

/// Outbound request body for the provider's `/responses` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
}

impl ResponsesRequest {
    /// Everything except `model` and `input`, for request logging.
    pub fn extras(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("model");
                map.remove("input");
                Value::Object(map)
            }
            _ => Value::Null,
        }
    }
}

/// Values applied when the caller leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    /// Effort injected for reasoning-capable families.
    pub reasoning_effort: ReasoningEffort,
    /// Output budget used when no `max_output_tokens` (or alias) is given.
    pub max_output_tokens: Option<u64>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            reasoning_effort: ReasoningEffort::Minimal,
            max_output_tokens: None,
        }
    }
}

pub fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODEL_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

/// Assemble the provider request. Never touches the network.
///
/// Only a malformed `response_format` can fail; unknown or misshapen
/// generation options are dropped.
pub fn build_request(
    prompt: &str,
    note: &str,
    model: &str,
    options: &Map<String, Value>,
    response_format: Option<&Value>,
    defaults: &RequestDefaults,
) -> Result<ResponsesRequest, CodingError> {
    let input = vec![InputMessage::user_text(&build_user_content(prompt, note))];

    let settings = GenerationSettings::from_raw(options);

    let reasoning = match settings.reasoning {
        Some(reasoning) => Some(reasoning),
        None if is_reasoning_model(model) => {
            Some(ReasoningConfig::with_effort(defaults.reasoning_effort))
        }
        None => None,
    };

    let format = match response_format {
        Some(raw) => Some(normalize_response_format(raw)?).filter(|format| !format.is_empty()),
        None => None,
    };

    let text = TextConfig {
        format,
        max_output_tokens: settings.text_max_output_tokens,
    };

    Ok(ResponsesRequest {
        model: model.to_string(),
        input,
        max_output_tokens: settings.max_output_tokens.or(defaults.max_output_tokens),
        reasoning,
        text: (!text.is_empty()).then_some(text),
    })
}
