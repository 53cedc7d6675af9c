use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use super::request::ResponsesRequest;
use super::types::{LlmClient, RawModelReply, ReplyPart};
use super::CodingError;
use crate::config::CodingConfig;

/// HTTP client for an OpenAI-compatible Responses API.
///
/// Construct once and reuse; it holds no per-request state.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, CodingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CodingError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &CodingConfig) -> Result<Self, CodingError> {
        Self::new(
            &config.api_base_url,
            config.api_key.as_deref(),
            config.timeout_secs,
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> CodingError {
        if e.is_connect() {
            CodingError::ProviderConnection(self.base_url.clone())
        } else if e.is_timeout() {
            CodingError::HttpClient(format!(
                "Request timed out after {}s",
                self.timeout_secs
            ))
        } else {
            CodingError::HttpClient(e.to_string())
        }
    }
}

impl LlmClient for OpenAiClient {
    fn create_response(&self, request: &ResponsesRequest) -> Result<RawModelReply, CodingError> {
        let url = format!("{}/responses", self.base_url);

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CodingError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| CodingError::ResponseParsing(e.to_string()))?;

        Ok(reply_from_responses_json(&body))
    }
}

/// Convert a Responses API body into a [`RawModelReply`].
///
/// Content parts carrying a `parsed` object become [`ReplyPart::Parsed`] (their
/// `text` is kept for the aggregate); parts carrying only `text` become
/// [`ReplyPart::Text`].
pub fn reply_from_responses_json(body: &Value) -> RawModelReply {
    let parts = body
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| {
            let text = part.get("text").and_then(Value::as_str).map(str::to_string);
            match part.get("parsed") {
                Some(parsed) if !parsed.is_null() => Some(ReplyPart::Parsed {
                    value: parsed.clone(),
                    text,
                }),
                _ => text.map(ReplyPart::Text),
            }
        })
        .collect();

    RawModelReply {
        parsed: body.get("output_parsed").filter(|v| !v.is_null()).cloned(),
        parts,
        output_text: body
            .get("output_text")
            .and_then(Value::as_str)
            .map(str::to_string),
        usage: body.get("usage").filter(|v| !v.is_null()).cloned(),
    }
}

/// Mock LLM client for testing — returns a configured reply or failure.
pub struct MockLlmClient {
    reply: Result<RawModelReply, String>,
    last_request: Mutex<Option<ResponsesRequest>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Reply with a single text part.
    pub fn new(response: &str) -> Self {
        Self::with_reply(RawModelReply::from_text(response))
    }

    pub fn with_reply(reply: RawModelReply) -> Self {
        Self {
            reply: Ok(reply),
            last_request: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with an HTTP client error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            last_request: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn last_request(&self) -> Option<ResponsesRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmClient for MockLlmClient {
    fn create_response(&self, request: &ResponsesRequest) -> Result<RawModelReply, CodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(message) => Err(CodingError::HttpClient(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::coding::request::{build_request, RequestDefaults};
    use serde_json::json;

    fn sample_request() -> ResponsesRequest {
        build_request(
            "PROMPT",
            "note",
            "gpt-4o",
            &serde_json::Map::new(),
            None,
            &RequestDefaults::default(),
        )
        .unwrap()
    }

    #[test]
    fn converts_output_text_parts() {
        let body = json!({
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "{\"reasoning\": \"ok\"}", "annotations": []}
                ]}
            ],
            "usage": {"input_tokens": 120, "output_tokens": 40, "total_tokens": 160}
        });
        let reply = reply_from_responses_json(&body);
        assert_eq!(reply.parsed, None);
        assert_eq!(reply.parts, vec![ReplyPart::Text("{\"reasoning\": \"ok\"}".into())]);
        assert_eq!(reply.output_text, None);
        assert_eq!(reply.usage.unwrap()["total_tokens"], json!(160));
    }

    #[test]
    fn converts_parsed_parts_and_output_parsed() {
        let body = json!({
            "output_parsed": {"reasoning": "top"},
            "output_text": "{\"reasoning\": \"top\"}",
            "output": [{"content": [
                {"type": "output_text", "text": "ignored", "parsed": {"reasoning": "part"}}
            ]}],
            "usage": null
        });
        let reply = reply_from_responses_json(&body);
        assert_eq!(reply.parsed, Some(json!({"reasoning": "top"})));
        assert_eq!(
            reply.parts,
            vec![ReplyPart::Parsed {
                value: json!({"reasoning": "part"}),
                text: Some("ignored".into()),
            }]
        );
        assert_eq!(reply.output_text.as_deref(), Some("{\"reasoning\": \"top\"}"));
        assert_eq!(reply.usage, None);
    }

    #[test]
    fn empty_body_converts_to_empty_reply() {
        let reply = reply_from_responses_json(&json!({}));
        assert_eq!(reply, RawModelReply::default());
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenAiClient::new("https://api.openai.com/v1/", Some("sk-test"), 60).unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
        assert_eq!(client.timeout_secs, 60);
        assert_eq!(client.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn client_from_config() {
        let config = CodingConfig::default();
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, config.api_base_url);
        assert_eq!(client.timeout_secs, config.timeout_secs);
    }

    #[test]
    fn mock_returns_configured_reply_and_records_request() {
        let client = MockLlmClient::new("{\"reasoning\": \"mock\"}");
        assert!(client.last_request().is_none());

        let reply = client.create_response(&sample_request()).unwrap();
        assert_eq!(reply.aggregate_text(), "{\"reasoning\": \"mock\"}");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.last_request().unwrap().model, "gpt-4o");
    }

    #[test]
    fn failing_mock_returns_generation_error() {
        let client = MockLlmClient::failing("connection reset");
        let err = client.create_response(&sample_request()).unwrap_err();
        assert!(matches!(err, CodingError::HttpClient(ref m) if m == "connection reset"));
        assert_eq!(client.call_count(), 1);
    }
}
